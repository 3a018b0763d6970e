mod common;

use common::{build_fixtures, load_shader, shader};
use glsc_compiler::Dumps;

#[test]
fn no_dumps_by_default() {
    let outcome = build_fixtures(&["phong.frag"], |_| {});
    assert!(outcome.result.is_ok());
    assert!(outcome.stdout.is_empty());
}

#[test]
fn every_dump_in_pipeline_order() {
    let outcome = build_fixtures(&["phong.vert", "phong.frag"], |config| {
        config.dumps = Dumps {
            ast: true,
            hir: true,
            lir: true,
        };
    });
    assert!(outcome.result.is_ok(), "{}", outcome.stdout);

    let position = |what: &str, name: &str| {
        let label = format!("{what} for {}:", shader(name).display());
        outcome
            .stdout
            .find(&label)
            .unwrap_or_else(|| panic!("missing `{label}'"))
    };
    let order = [
        position("AST", "phong.vert"),
        position("HIR", "phong.vert"),
        position("LIR", "phong.vert"),
        position("AST", "phong.frag"),
        position("HIR", "phong.frag"),
        position("LIR", "phong.frag"),
    ];
    assert!(order.windows(2).all(|w| w[0] < w[1]), "{}", outcome.stdout);
}

#[test]
fn ast_dump_mentions_declarations() {
    let outcome = build_fixtures(&["phong.frag"], |config| config.dumps.ast = true);
    assert!(outcome.result.is_ok());
    for name in ["lightPosition", "shininess", "shade", "main"] {
        assert!(outcome.stdout.contains(name), "{name}");
    }
}

#[test]
fn optimization_folds_constants_in_the_lir() {
    let outcome = build_fixtures(&["blur.frag"], |config| {
        config.dumps.hir = true;
        config.dumps.lir = true;
    });
    assert!(outcome.result.is_ok(), "{}", outcome.stdout);
    let lir = &outcome.stdout[outcome.stdout.find("LIR for").expect("LIR dump")..];
    assert!(lir.contains("0.2"), "{lir}");
}

#[test]
fn ast_dump_survives_a_failed_parse() {
    assert!(load_shader("invalid/syntax.frag").contains("vec4(1.0)\n"));
    let outcome = build_fixtures(&["invalid/syntax.frag"], |config| config.dumps.ast = true);
    assert!(outcome.result.is_err());
    assert!(outcome.stdout.starts_with("AST for"), "{}", outcome.stdout);
    assert!(outcome.stdout.contains("Info log for"));
}
