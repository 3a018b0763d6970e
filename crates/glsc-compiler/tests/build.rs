mod common;

use std::path::PathBuf;

use common::{BROKEN_FRAGMENT, CountingToolchain, MemoryLoader, TRIVIAL_FRAGMENT, TRIVIAL_VERTEX};
use glsc_compiler::{
    BuildConfig, BuildError, CompileStatus, Dumps, LinkStatus, UsageError, build,
};
use glsc_context::{Dialect, ShaderKind};

fn run(
    config: &BuildConfig,
    toolchain: &CountingToolchain,
    loader: &MemoryLoader,
) -> (Result<glsc_compiler::Program, BuildError>, String) {
    let mut out = Vec::new();
    let result = build(config, toolchain, loader, &mut out);
    (result, String::from_utf8(out).expect("utf-8 output"))
}

#[test]
fn trivial_vertex_shader() {
    let loader = MemoryLoader::new([("a.vert", TRIVIAL_VERTEX)]);
    let toolchain = CountingToolchain::new();
    let (result, out) = run(&BuildConfig::new(["a.vert"]), &toolchain, &loader);

    let program = result.expect("build");
    assert!(out.is_empty(), "{out}");
    assert_eq!(program.units().len(), 1);
    assert_eq!(program.units()[0].status(), CompileStatus::Succeeded);
    assert_eq!(program.link_status(), LinkStatus::Pending);
    assert_eq!(toolchain.calls().link, 0);
}

#[test]
fn syntax_error_is_reported_once() {
    let loader = MemoryLoader::new([("bad.frag", BROKEN_FRAGMENT)]);
    let toolchain = CountingToolchain::new();
    let mut config = BuildConfig::new(["bad.frag"]);
    config.link = true;
    let (result, out) = run(&config, &toolchain, &loader);

    assert!(matches!(result, Err(BuildError::CompileFailed { .. })));
    assert!(out.starts_with("Info log for bad.frag:\n0:4("), "{out}");
    assert_eq!(out.matches("Info log for").count(), 1);
    assert_eq!(out.matches("error:").count(), 1);
    assert_eq!(toolchain.calls().lower, 0);
    assert_eq!(toolchain.calls().link, 0);
}

#[test]
fn link_two_valid_shaders() {
    let loader = MemoryLoader::new([("a.vert", TRIVIAL_VERTEX), ("b.frag", TRIVIAL_FRAGMENT)]);
    let toolchain = CountingToolchain::new();
    let mut config = BuildConfig::new(["a.vert", "b.frag"]);
    config.link = true;
    let (result, out) = run(&config, &toolchain, &loader);

    let program = result.expect("build");
    assert!(out.is_empty(), "{out}");
    assert_eq!(program.link_status(), LinkStatus::Linked);
    assert!(program.log().is_empty());
    assert!(program.linked(ShaderKind::Vertex).is_some());
    assert!(program.linked(ShaderKind::Fragment).is_some());
    assert_eq!(toolchain.calls().link, 1);
}

#[test]
fn link_failure_prints_the_link_log() {
    let loader = MemoryLoader::new([
        ("a.vert", "void main() {}\n"),
        ("b.frag", TRIVIAL_FRAGMENT),
    ]);
    let toolchain = CountingToolchain::new();
    let mut config = BuildConfig::new(["a.vert", "b.frag"]);
    config.link = true;
    let (result, out) = run(&config, &toolchain, &loader);

    assert!(matches!(result, Err(BuildError::LinkFailed)));
    assert_eq!(
        out,
        "Info log for linking:\nerror: vertex shader does not write to `gl_Position'\n\n"
    );
}

#[test]
fn unknown_extension_performs_no_io() {
    for path in ["x.txt", "a.vert.txt", ".frag", "shader.glsl"] {
        let loader = MemoryLoader::default();
        let toolchain = CountingToolchain::new();
        let (result, out) = run(&BuildConfig::new(["a.vert", path]), &toolchain, &loader);

        assert!(
            matches!(
                result,
                Err(BuildError::Usage(UsageError::UnknownExtension { .. }))
            ),
            "{path}"
        );
        assert_eq!(loader.loads(), 0, "{path}");
        assert_eq!(toolchain.calls().preprocess, 0);
        assert!(out.is_empty());
    }
}

#[test]
fn no_inputs() {
    let (result, _) = run(
        &BuildConfig::default(),
        &CountingToolchain::new(),
        &MemoryLoader::default(),
    );
    assert!(matches!(result, Err(BuildError::Usage(UsageError::NoInputs))));
}

#[test]
fn loads_stop_at_the_first_failing_file() {
    let files = ["a.vert", "b.frag", "c.frag", "d.frag"];
    for failing in 0..files.len() {
        let sources = files.iter().enumerate().map(|(i, &path)| {
            let text = if i == failing { BROKEN_FRAGMENT } else if i == 0 { TRIVIAL_VERTEX } else { TRIVIAL_FRAGMENT };
            (path, text)
        });
        let loader = MemoryLoader::new(sources);
        let toolchain = CountingToolchain::new();
        let (result, _) = run(&BuildConfig::new(files), &toolchain, &loader);

        assert!(matches!(result, Err(BuildError::CompileFailed { .. })));
        assert_eq!(loader.loads(), failing + 1);
        assert_eq!(
            loader.requested(),
            files[..=failing].iter().map(PathBuf::from).collect::<Vec<_>>()
        );
    }
}

#[test]
fn missing_file_aborts_the_build() {
    let loader = MemoryLoader::new([("a.vert", TRIVIAL_VERTEX), ("c.frag", TRIVIAL_FRAGMENT)]);
    let toolchain = CountingToolchain::new();
    let (result, out) = run(
        &BuildConfig::new(["a.vert", "missing.frag", "c.frag"]),
        &toolchain,
        &loader,
    );

    assert!(matches!(result, Err(BuildError::Load(_))));
    assert_eq!(out, "File \"missing.frag\" does not exist.\n");
    assert_eq!(loader.loads(), 2);
    assert_eq!(toolchain.calls().preprocess, 1);
}

#[test]
fn preprocessing_failure_never_reaches_the_parser() {
    let loader = MemoryLoader::new([("a.vert", TRIVIAL_VERTEX)]);
    let toolchain = CountingToolchain::new().failing_preprocess();
    let mut config = BuildConfig::new(["a.vert"]);
    config.dumps = Dumps {
        ast: true,
        hir: true,
        lir: true,
    };
    let (result, out) = run(&config, &toolchain, &loader);

    assert!(matches!(result, Err(BuildError::CompileFailed { .. })));
    assert_eq!(toolchain.calls().preprocess, 1);
    assert_eq!(toolchain.calls().parse, 0);
    assert!(!out.contains("AST for"), "{out}");
    assert_eq!(out, "Info log for a.vert:\nerror: #error forced failure\n\n");
}

#[test]
fn structural_violation_is_fatal() {
    let loader = MemoryLoader::new([("a.vert", TRIVIAL_VERTEX), ("b.frag", TRIVIAL_FRAGMENT)]);
    let toolchain = CountingToolchain::new().rejecting_ir();
    let (result, out) = run(&BuildConfig::new(["a.vert", "b.frag"]), &toolchain, &loader);

    match result {
        Err(BuildError::Structural { path, .. }) => assert_eq!(path, PathBuf::from("a.vert")),
        other => panic!("expected a structural error, got {other:?}"),
    }
    assert!(out.is_empty());
    assert_eq!(loader.loads(), 1);
}

#[test]
fn embedded_dialect() {
    let loader = MemoryLoader::new([
        ("s.vert", "#version 100\nattribute vec4 p;\nvoid main() { gl_Position = p; }\n"),
        (
            "s.frag",
            "#version 100\nprecision mediump float;\nvoid main() { gl_FragColor = vec4(1.0); }\n",
        ),
    ]);
    let toolchain = CountingToolchain::new();
    let mut config = BuildConfig::new(["s.vert", "s.frag"]);
    config.dialect = Dialect::Embedded;
    config.link = true;
    let (result, out) = run(&config, &toolchain, &loader);

    let program = result.expect("build");
    assert!(out.is_empty(), "{out}");
    assert_eq!(program.link_status(), LinkStatus::Linked);
    assert!(program.units().iter().all(|u| u.version().is_some_and(|v| v.es)));
}

#[test]
fn pass_budget_reaches_every_pass() {
    let loader = MemoryLoader::new([("a.vert", TRIVIAL_VERTEX)]);
    let toolchain = CountingToolchain::new();
    let mut config = BuildConfig::new(["a.vert"]);
    config.pass_budget = 7;
    run(&config, &toolchain, &loader).0.expect("build");

    let budgets = toolchain.budgets();
    assert!(!budgets.is_empty());
    assert!(budgets.iter().all(|&b| b == 7));
}
