mod common;

use common::{CountingToolchain, TRIVIAL_FRAGMENT, TRIVIAL_VERTEX};
use glsc_compiler::{
    CompileError, CompileOptions, CompileStatus, GlslToolchain, LinkError, LinkStatus,
    MAX_BUILTIN_REFS, Program, ShaderUnit, SourceBuffer, Toolchain, optimize,
};
use glsc_context::{CapabilityContext, Dialect, ShaderKind};

fn ctx() -> CapabilityContext {
    CapabilityContext::new(Dialect::Desktop)
}

fn compile(unit: &mut ShaderUnit, toolchain: &dyn Toolchain) -> Result<bool, CompileError> {
    unit.compile(&ctx(), toolchain, &CompileOptions::default(), &mut std::io::sink())
}

fn unit(path: &str, source: &str, kind: ShaderKind) -> ShaderUnit {
    ShaderUnit::new(SourceBuffer::new(path, source), kind)
}

#[test]
fn optimization_runs_until_no_progress() {
    let toolchain = CountingToolchain::new().progressing(3);
    let mut u = unit("a.vert", TRIVIAL_VERTEX, ShaderKind::Vertex);
    assert!(compile(&mut u, &toolchain).expect("compile"));

    // three passes with progress, one without
    assert_eq!(toolchain.calls().optimize_pass, 4);
    // once after lowering, once after the fixed point
    assert_eq!(toolchain.calls().validate_ir, 2);
}

#[test]
fn optimized_module_is_a_fixed_point() {
    let source = "uniform float k;\n\
                  const float scale = 2.0 * 3.0;\n\
                  void main() {\n\
                      float unused = k;\n\
                      if (scale > 5.0) { gl_FragColor = vec4(k * scale); } else { discard; }\n\
                  }\n";
    let mut u = unit("f.frag", source, ShaderKind::Fragment);
    assert!(compile(&mut u, &GlslToolchain::new()).expect("compile"));

    let toolchain = GlslToolchain::new();
    let mut module = u.module().expect("compiled module").clone();
    let summary = optimize(&toolchain, &mut module, glsc_compiler::DEFAULT_PASS_BUDGET)
        .expect("valid IR");
    assert_eq!(summary.passes, 1);
    assert!(!toolchain.optimize_pass(&mut module, 1));
}

#[test]
fn empty_module_skips_optimization() {
    let toolchain = CountingToolchain::new();
    let mut u = unit("e.frag", "// empty\n", ShaderKind::Fragment);
    assert!(compile(&mut u, &toolchain).expect("compile"));
    assert_eq!(toolchain.calls().lower, 0);
    assert_eq!(toolchain.calls().optimize_pass, 0);
}

#[test]
fn builtin_references_are_capped() {
    let at_limit = CountingToolchain::new().with_extra_builtins(MAX_BUILTIN_REFS);
    let mut u = unit("a.vert", TRIVIAL_VERTEX, ShaderKind::Vertex);
    assert!(compile(&mut u, &at_limit).expect("compile"));
    assert_eq!(u.builtins().len(), MAX_BUILTIN_REFS);

    let over = CountingToolchain::new().with_extra_builtins(MAX_BUILTIN_REFS + 1);
    let mut u = unit("a.vert", TRIVIAL_VERTEX, ShaderKind::Vertex);
    assert!(!compile(&mut u, &over).expect("compile"));
    assert_eq!(u.status(), CompileStatus::Failed);
    assert_eq!(u.builtins().len(), MAX_BUILTIN_REFS);
    assert!(u.module().is_none());
    assert!(
        u.log()
            .to_string()
            .contains("too many built-in function references"),
        "{}",
        u.log()
    );
}

#[test]
fn units_compile_once() {
    let toolchain = CountingToolchain::new();
    let mut u = unit("a.vert", "void main() { gl_Position = x; }", ShaderKind::Vertex);
    assert!(!compile(&mut u, &toolchain).expect("compile"));
    let log = u.log().to_string();

    assert!(matches!(
        compile(&mut u, &toolchain),
        Err(CompileError::AlreadyCompiled { .. })
    ));
    assert_eq!(toolchain.calls().preprocess, 1);
    assert_eq!(u.log().to_string(), log);
    assert_eq!(u.status(), CompileStatus::Failed);
}

#[test]
fn link_requires_compiled_units() {
    let toolchain = CountingToolchain::new();
    let mut good = unit("a.vert", TRIVIAL_VERTEX, ShaderKind::Vertex);
    assert!(compile(&mut good, &toolchain).expect("compile"));
    let mut bad = unit("b.frag", "void main() { gl_FragColor = y; }", ShaderKind::Fragment);
    assert!(!compile(&mut bad, &toolchain).expect("compile"));

    let mut program = Program::new();
    program.add(good);
    program.add(bad);
    match program.link(&ctx(), &toolchain) {
        Err(LinkError::UnitNotCompiled { name, status }) => {
            assert_eq!(name, "b.frag");
            assert_eq!(status, CompileStatus::Failed);
        }
        other => panic!("expected UnitNotCompiled, got {other:?}"),
    }
    assert_eq!(toolchain.calls().link, 0);
    assert_eq!(program.link_status(), LinkStatus::Pending);
    assert!(program.log().is_empty());
}

#[test]
fn programs_link_once() {
    let toolchain = CountingToolchain::new();
    let mut program = Program::new();
    for (path, source, kind) in [
        ("a.vert", TRIVIAL_VERTEX, ShaderKind::Vertex),
        ("b.frag", TRIVIAL_FRAGMENT, ShaderKind::Fragment),
    ] {
        let mut u = unit(path, source, kind);
        assert!(compile(&mut u, &toolchain).expect("compile"));
        program.add(u);
    }

    assert!(program.link(&ctx(), &toolchain).expect("link"));
    assert!(matches!(
        program.link(&ctx(), &toolchain),
        Err(LinkError::AlreadyLinked)
    ));
    assert_eq!(toolchain.calls().link, 1);
    assert_eq!(program.link_status(), LinkStatus::Linked);
}

#[test]
fn link_failure_leaves_units_alone() {
    let toolchain = CountingToolchain::new();
    let mut program = Program::new();
    let mut u = unit("g.geom", "void main() {}", ShaderKind::Geometry);
    assert!(compile(&mut u, &toolchain).expect("compile"));
    program.add(u);

    assert!(!program.link(&ctx(), &toolchain).expect("link"));
    assert_eq!(program.link_status(), LinkStatus::Failed);
    assert!(!program.log().is_empty());
    assert_eq!(program.units()[0].status(), CompileStatus::Succeeded);
    assert!(program.linked(ShaderKind::Geometry).is_none());
}

#[test]
fn silent_link_failure_still_logs_an_error() {
    let toolchain = CountingToolchain::new().failing_link_silently();
    let mut program = Program::new();
    let mut u = unit("a.vert", TRIVIAL_VERTEX, ShaderKind::Vertex);
    assert!(compile(&mut u, &toolchain).expect("compile"));
    program.add(u);

    assert!(!program.link(&ctx(), &toolchain).expect("link"));
    assert_eq!(program.link_status(), LinkStatus::Failed);
    assert_eq!(program.log().to_string(), "error: link failed
");
    assert!(program.linked(ShaderKind::Vertex).is_none());
}
