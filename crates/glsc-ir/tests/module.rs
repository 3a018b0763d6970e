//! Integration test: build a fragment shader module by hand, then validate
//! and dump it.

use glsc_ir::*;

/// ```glsl
/// uniform vec4 tint;
/// void main() {
///     if (tint.x > 0.5)
///         gl_FragColor = tint;
///     else
///         discard;
/// }
/// ```
fn tinted_fragment() -> (Module, Handle<GlobalVariable>, Handle<GlobalVariable>) {
    let mut module = Module::default();
    let vec4 = module.types.insert(Type::VEC4);
    let tint = module
        .global_variables
        .append(GlobalVariable::new("tint", vec4, AddressSpace::Uniform));
    let mut color = GlobalVariable::new("gl_FragColor", vec4, AddressSpace::Output);
    color.builtin = true;
    let color = module.global_variables.append(color);

    let mut main = Function::new("main");
    let e = &mut main.expressions;
    let tint_ptr = e.append(Expression::GlobalVariable(tint));
    let tint_x = e.append(Expression::AccessIndex {
        base: tint_ptr,
        index: 0,
    });
    let x = e.append(Expression::Load { pointer: tint_x });
    let half = e.append(Expression::Literal(Literal::Float(0.5)));
    let bright = e.append(Expression::Binary {
        op: BinaryOp::Greater,
        left: x,
        right: half,
    });
    let value = e.append(Expression::Load { pointer: tint_ptr });
    let color_ptr = e.append(Expression::GlobalVariable(color));
    main.body.push(Statement::If {
        condition: bright,
        accept: vec![Statement::Store {
            pointer: color_ptr,
            value,
        }],
        reject: vec![Statement::Kill],
    });
    module.functions.append(main);
    (module, tint, color)
}

#[test]
fn hand_built_module_validates() {
    let (module, tint, color) = tinted_fragment();
    validate(&module).expect("valid module");

    assert!(!module.is_empty());
    assert!(module.entry_point().is_some());
    assert_eq!(module.find_global("tint"), Some(tint));
    assert_eq!(module.find_global("gl_FragColor"), Some(color));
    assert!(module.writes_global(color));
    assert!(!module.writes_global(tint));
}

#[test]
fn dump_lists_globals_and_body() {
    let (module, _, _) = tinted_fragment();
    let text = dump_module(&module);

    assert!(text.starts_with("globals:\n"), "{text}");
    assert!(text.contains("uniform vec4 tint"), "{text}");
    assert!(text.contains("out vec4 gl_FragColor"), "{text}");
    assert!(text.contains("0.5"), "{text}");
    assert!(text.contains("discard"), "{text}");
}

#[test]
fn store_to_uniform_is_rejected() {
    let (mut module, tint, _) = tinted_fragment();
    let main = module.entry_point().expect("main");
    let func = &mut module.functions[main];
    let ptr = func.expressions.append(Expression::GlobalVariable(tint));
    let zero = func.expressions.append(Expression::Literal(Literal::Float(0.0)));
    let vec4 = module.global_variables[tint].ty;
    let value = func.expressions.append(Expression::Compose {
        ty: vec4,
        components: vec![zero],
    });
    func.body.push(Statement::Store {
        pointer: ptr,
        value,
    });

    let err = validate(&module).expect_err("uniforms are read-only");
    assert!(matches!(err, IrError::ReadOnlyStore { ref name, .. } if name == "tint"));
}

#[test]
fn break_outside_loop_is_rejected() {
    let (mut module, _, _) = tinted_fragment();
    let main = module.entry_point().expect("main");
    module.functions[main].body.push(Statement::Break);
    assert!(matches!(
        validate(&module),
        Err(IrError::MisplacedJump {
            statement: "break",
            ..
        })
    ));

    let func = &mut module.functions[main];
    func.body.pop();
    func.body.push(Statement::Loop {
        body: vec![Statement::Break],
        continuing: Vec::new(),
        break_if: None,
    });
    validate(&module).expect("break inside a loop");
}
