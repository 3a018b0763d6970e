//! Integration tests for the GLSL front end: preprocess, parse, lower.

use glsc_context::{CapabilityContext, Dialect, ShaderKind};
use glsc_ir::{AddressSpace, InfoLog, dump_module, validate};
use glsc_parser::{Lowered, lower, parse, preprocess};

fn compile(source: &str, kind: ShaderKind, dialect: Dialect) -> (Lowered, InfoLog) {
    let ctx = CapabilityContext::new(dialect);
    let mut log = InfoLog::new();
    let pre = preprocess(source, &ctx, &mut log);
    assert!(!log.has_errors(), "preprocessing failed:\n{log}");
    let unit = parse(&pre.source, pre.version).expect("fixture should parse");
    let lowered = lower(&unit, &ctx, kind, pre.version, &mut log);
    (lowered, log)
}

fn compile_ok(source: &str, kind: ShaderKind, dialect: Dialect) -> Lowered {
    let (lowered, log) = compile(source, kind, dialect);
    assert!(!log.has_errors(), "lowering failed:\n{log}");
    validate(&lowered.module).expect("lowered IR should validate");
    lowered
}

#[test]
fn lower_phong_vertex() {
    let source = include_str!("../../../shaders/phong.vert");
    let lowered = compile_ok(source, ShaderKind::Vertex, Dialect::Desktop);
    let module = &lowered.module;

    assert!(module.entry_point().is_some());
    let space = |name| {
        module
            .find_global(name)
            .map(|h| module.global_variables[h].space)
    };
    assert_eq!(space("position"), Some(AddressSpace::Input));
    assert_eq!(space("eyeNormal"), Some(AddressSpace::Output));
    assert_eq!(space("modelView"), Some(AddressSpace::Uniform));
    assert_eq!(space("gl_Position"), Some(AddressSpace::Output));
    assert_eq!(lowered.builtins, ["normalize"]);

    let gl_position = module.find_global("gl_Position").expect("gl_Position");
    assert!(module.writes_global(gl_position));
}

#[test]
fn lower_phong_fragment_with_forward_declaration() {
    let source = include_str!("../../../shaders/phong.frag");
    let lowered = compile_ok(source, ShaderKind::Fragment, Dialect::Desktop);
    let module = &lowered.module;

    let shade: Vec<_> = module
        .functions
        .iter()
        .filter(|(_, f)| f.name == "shade")
        .collect();
    assert_eq!(shade.len(), 1, "prototype and definition share one function");
    assert!(shade[0].1.defined);
    assert_eq!(
        lowered.builtins,
        ["normalize", "texture2D", "dot", "max", "pow"]
    );

    let dump = dump_module(module);
    assert!(dump.contains("uniform sampler2D albedo"), "{dump}");
    assert!(dump.contains("call shade("), "{dump}");
}

#[test]
fn lower_compatibility_builtins() {
    let vert = compile_ok(
        include_str!("../../../shaders/fixed.vert"),
        ShaderKind::Vertex,
        Dialect::Desktop,
    );
    for name in [
        "gl_TexCoord",
        "gl_MultiTexCoord0",
        "gl_FrontColor",
        "gl_Color",
        "gl_Position",
        "gl_ModelViewProjectionMatrix",
        "gl_Vertex",
    ] {
        assert!(vert.module.find_global(name).is_some(), "missing {name}");
    }

    let frag = compile_ok(
        include_str!("../../../shaders/fixed.frag"),
        ShaderKind::Fragment,
        Dialect::Desktop,
    );
    let dump = dump_module(&frag.module);
    assert!(dump.contains("discard"), "{dump}");
}

#[test]
fn lower_loop_with_macros_and_constants() {
    let lowered = compile_ok(
        include_str!("../../../shaders/blur.frag"),
        ShaderKind::Fragment,
        Dialect::Desktop,
    );
    let dump = dump_module(&lowered.module);
    assert!(dump.contains("loop {"), "{dump}");
    assert!(dump.contains("continuing {"), "{dump}");
    assert!(dump.contains("const float weight"), "{dump}");
}

#[test]
fn lower_geometry_shader() {
    let lowered = compile_ok(
        include_str!("../../../shaders/outline.geom"),
        ShaderKind::Geometry,
        Dialect::Desktop,
    );
    assert!(lowered.module.find_global("gl_PrimitiveIDIn").is_some());
}

#[test]
fn lower_es_pair() {
    let vert = compile_ok(
        include_str!("../../../shaders/es/simple.vert"),
        ShaderKind::Vertex,
        Dialect::Embedded,
    );
    assert!(vert.module.find_global("v_color").is_some());

    let frag = compile_ok(
        include_str!("../../../shaders/es/simple.frag"),
        ShaderKind::Fragment,
        Dialect::Embedded,
    );
    assert!(frag.module.find_global("gl_FragColor").is_some());
}

#[test]
fn syntax_error_is_located() {
    let ctx = CapabilityContext::new(Dialect::Desktop);
    let mut log = InfoLog::new();
    let pre = preprocess(
        include_str!("../../../shaders/invalid/syntax.frag"),
        &ctx,
        &mut log,
    );
    let err = parse(&pre.source, pre.version).expect_err("missing semicolon");
    assert_eq!(err.location.line, 4);
    assert!(err.to_string().starts_with("syntax error, unexpected `}'"), "{err}");
}

#[test]
fn semantic_errors_accumulate() {
    let (_, log) = compile(
        include_str!("../../../shaders/invalid/types.frag"),
        ShaderKind::Fragment,
        Dialect::Desktop,
    );
    assert_eq!(log.error_count(), 2, "{log}");
    let text = log.to_string();
    assert!(text.contains("0:5("), "{text}");
    assert!(text.contains("`undefinedValue' undeclared"), "{text}");
}

#[test]
fn desktop_shader_rejected_by_es_front_end() {
    let (_, log) = compile(
        include_str!("../../../shaders/fixed.vert").replace("#version 110\n", "").as_str(),
        ShaderKind::Vertex,
        Dialect::Embedded,
    );
    assert!(log.has_errors());
    assert!(log.to_string().contains("`gl_TexCoord' undeclared"), "{log}");
}
