//! Runs the standard pipeline over lowered fixture shaders.

use glsc_context::{CapabilityContext, Dialect, ShaderKind};
use glsc_ir::{InfoLog, Literal, Module, dump_module, validate};
use glsc_opt::{DEFAULT_PASS_BUDGET, PassManager};

fn lower(source: &str, kind: ShaderKind, dialect: Dialect) -> Module {
    let ctx = CapabilityContext::new(dialect);
    let mut log = InfoLog::new();
    let pre = glsc_parser::preprocess(source, &ctx, &mut log);
    let unit = glsc_parser::parse(&pre.source, pre.version).expect("fixture should parse");
    let lowered = glsc_parser::lower(&unit, &ctx, kind, pre.version, &mut log);
    assert!(!log.has_errors(), "{log}");
    lowered.module
}

/// Runs the standard passes until an iteration makes no progress.
fn settle(module: &mut Module) -> usize {
    let pm = PassManager::common();
    let mut iterations = 1;
    while pm.run_once(module, DEFAULT_PASS_BUDGET) {
        iterations += 1;
    }
    iterations
}

#[test]
fn optimized_fixtures_stay_valid_and_reach_a_fixed_point() {
    let fixtures = [
        (include_str!("../../../shaders/phong.vert"), ShaderKind::Vertex, Dialect::Desktop),
        (include_str!("../../../shaders/phong.frag"), ShaderKind::Fragment, Dialect::Desktop),
        (include_str!("../../../shaders/fixed.vert"), ShaderKind::Vertex, Dialect::Desktop),
        (include_str!("../../../shaders/fixed.frag"), ShaderKind::Fragment, Dialect::Desktop),
        (include_str!("../../../shaders/blur.frag"), ShaderKind::Fragment, Dialect::Desktop),
        (include_str!("../../../shaders/outline.geom"), ShaderKind::Geometry, Dialect::Desktop),
        (include_str!("../../../shaders/es/simple.vert"), ShaderKind::Vertex, Dialect::Embedded),
        (include_str!("../../../shaders/es/simple.frag"), ShaderKind::Fragment, Dialect::Embedded),
    ];

    let pm = PassManager::common();
    for (source, kind, dialect) in fixtures {
        let mut module = lower(source, kind, dialect);
        let iterations = settle(&mut module);
        assert!(iterations >= 1);
        validate(&module).expect("optimized IR should validate");
        assert!(!pm.run_once(&mut module, DEFAULT_PASS_BUDGET));
        assert!(module.entry_point().is_some());
    }
}

#[test]
fn blur_constants_are_folded() {
    let mut module = lower(
        include_str!("../../../shaders/blur.frag"),
        ShaderKind::Fragment,
        Dialect::Desktop,
    );
    settle(&mut module);

    let weight = module.find_global("weight").expect("weight");
    let init = module.global_variables[weight].init.expect("initializer");
    assert_eq!(
        module.global_expressions[init].as_literal(),
        Some(Literal::Float(0.2))
    );
    let dump = dump_module(&module);
    assert!(dump.contains("loop {"), "{dump}");
}

#[test]
fn dead_branch_disappears() {
    let source = "\
void main()
{
    if (1 > 2) {
        discard;
    }
    gl_FragColor = vec4(1.0);
}
";
    let mut module = lower(source, ShaderKind::Fragment, Dialect::Desktop);
    assert!(dump_module(&module).contains("discard"));
    settle(&mut module);
    let dump = dump_module(&module);
    assert!(!dump.contains("discard"), "{dump}");
    validate(&module).expect("optimized IR should validate");
}
