//! Structural consistency checks.
//!
//! [`validate`] is run after lowering and again after optimization. It only
//! looks at the shape of the IR (handles, operand order, pointer-ness,
//! jump placement); type correctness is the job of the producing stage.

use crate::arena::{Arena, Handle};
use crate::expr::Expression;
use crate::func::{Function, LocalVariable};
use crate::global::GlobalVariable;
use crate::stmt::Statement;
use crate::types::Type;
use crate::{IrError, Module};

/// The variable a pointer expression ultimately addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerRoot {
    /// A module-scope variable.
    Global(Handle<GlobalVariable>),
    /// A function-local variable.
    Local(Handle<LocalVariable>),
}

/// Follows `Access`/`AccessIndex`/`Swizzle` chains down to the variable a
/// pointer expression addresses. Returns `None` for non-pointer values.
pub fn pointer_root(exprs: &Arena<Expression>, handle: Handle<Expression>) -> Option<PointerRoot> {
    let mut current = handle;
    loop {
        match exprs.get(current)? {
            Expression::GlobalVariable(g) => return Some(PointerRoot::Global(*g)),
            Expression::LocalVariable(l) => return Some(PointerRoot::Local(*l)),
            Expression::Access { base, .. } | Expression::AccessIndex { base, .. } => {
                current = *base;
            }
            Expression::Swizzle { vector, .. } => current = *vector,
            _ => return None,
        }
    }
}

/// Checks the structural invariants of `module`.
pub fn validate(module: &Module) -> Result<(), IrError> {
    for (handle, ty) in module.types.iter() {
        if let Type::Array { base, .. } = *ty {
            if base >= handle {
                return Err(IrError::BadHandle {
                    context: format!("type {handle:?}"),
                    what: "type",
                    index: base.index(),
                    size: handle.index(),
                });
            }
        }
    }

    for (handle, var) in module.global_variables.iter() {
        let context = format!("global `{}' ({handle:?})", var.name);
        check_type(module, var.ty, &context)?;
        if let Some(init) = var.init {
            check_bounds(&module.global_expressions, init, "expression", &context)?;
        }
    }

    let checker = Checker {
        module,
        function: None,
        context: "global expressions".into(),
    };
    checker.expressions(&module.global_expressions)?;

    for (handle, func) in module.functions.iter() {
        let context = format!("function `{}' ({handle:?})", func.name);
        for arg in &func.arguments {
            check_type(module, arg.ty, &context)?;
        }
        if let Some(ty) = func.result {
            check_type(module, ty, &context)?;
        }
        for (_, local) in func.local_variables.iter() {
            check_type(module, local.ty, &context)?;
        }
        if !func.defined && !func.body.is_empty() {
            return Err(IrError::PrototypeWithBody { context });
        }

        let checker = Checker {
            module,
            function: Some(func),
            context,
        };
        checker.expressions(&func.expressions)?;
        checker.block(&func.body, 0)?;
    }

    Ok(())
}

fn check_type(module: &Module, ty: Handle<Type>, context: &str) -> Result<(), IrError> {
    if module.types.contains(ty) {
        Ok(())
    } else {
        Err(IrError::BadHandle {
            context: context.to_string(),
            what: "type",
            index: ty.index(),
            size: module.types.len(),
        })
    }
}

fn check_bounds<T>(
    arena: &Arena<T>,
    handle: Handle<T>,
    what: &'static str,
    context: &str,
) -> Result<(), IrError> {
    if arena.contains(handle) {
        Ok(())
    } else {
        Err(IrError::BadHandle {
            context: context.to_string(),
            what,
            index: handle.index(),
            size: arena.len(),
        })
    }
}

struct Checker<'a> {
    module: &'a Module,
    function: Option<&'a Function>,
    context: String,
}

impl Checker<'_> {
    fn exprs(&self) -> &Arena<Expression> {
        match self.function {
            Some(func) => &func.expressions,
            None => &self.module.global_expressions,
        }
    }

    fn expressions(&self, exprs: &Arena<Expression>) -> Result<(), IrError> {
        for (handle, expr) in exprs.iter() {
            for operand in expr.operands() {
                check_bounds(exprs, operand, "expression", &self.context)?;
                if operand >= handle {
                    return Err(IrError::ForwardReference {
                        context: self.context.clone(),
                        expr: handle.index(),
                        operand: operand.index(),
                    });
                }
            }
            match *expr {
                Expression::GlobalVariable(var) => {
                    check_bounds(
                        &self.module.global_variables,
                        var,
                        "global variable",
                        &self.context,
                    )?;
                }
                Expression::LocalVariable(local) => {
                    let size = self.function.map_or(0, |f| f.local_variables.len());
                    if local.index() >= size {
                        return Err(IrError::BadHandle {
                            context: self.context.clone(),
                            what: "local variable",
                            index: local.index(),
                            size,
                        });
                    }
                }
                Expression::FunctionArgument(index) => {
                    let count = self.function.map_or(0, |f| f.arguments.len());
                    if index as usize >= count {
                        return Err(IrError::BadArgument {
                            context: self.context.clone(),
                            index,
                            count,
                        });
                    }
                }
                Expression::Compose { ty, .. } => check_type(self.module, ty, &self.context)?,
                Expression::CallResult(function) => {
                    check_bounds(&self.module.functions, function, "function", &self.context)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn expr(&self, handle: Handle<Expression>) -> Result<(), IrError> {
        check_bounds(self.exprs(), handle, "expression", &self.context)
    }

    fn block(&self, block: &[Statement], loop_depth: usize) -> Result<(), IrError> {
        for stmt in block {
            self.statement(stmt, loop_depth)?;
        }
        Ok(())
    }

    fn statement(&self, stmt: &Statement, loop_depth: usize) -> Result<(), IrError> {
        match stmt {
            Statement::Store { pointer, value } => {
                self.expr(*pointer)?;
                self.expr(*value)?;
                match pointer_root(self.exprs(), *pointer) {
                    None => {
                        return Err(IrError::NotAPointer {
                            context: self.context.clone(),
                            expr: pointer.index(),
                        });
                    }
                    Some(PointerRoot::Global(var)) => {
                        let var = &self.module.global_variables[var];
                        if var.space.is_read_only() {
                            return Err(IrError::ReadOnlyStore {
                                context: self.context.clone(),
                                name: var.name.clone(),
                            });
                        }
                    }
                    Some(PointerRoot::Local(_)) => {}
                }
            }
            Statement::If {
                condition,
                accept,
                reject,
            } => {
                self.expr(*condition)?;
                self.block(accept, loop_depth)?;
                self.block(reject, loop_depth)?;
            }
            Statement::Loop {
                body,
                continuing,
                break_if,
            } => {
                self.block(body, loop_depth + 1)?;
                self.block(continuing, loop_depth + 1)?;
                if let Some(cond) = break_if {
                    self.expr(*cond)?;
                }
            }
            Statement::Call {
                function,
                arguments,
                result,
            } => {
                check_bounds(&self.module.functions, *function, "function", &self.context)?;
                for arg in arguments {
                    self.expr(*arg)?;
                }
                if let Some(result) = result {
                    self.expr(*result)?;
                    match self.exprs()[*result] {
                        Expression::CallResult(f) if f == *function => {}
                        _ => {
                            return Err(IrError::UnboundCallResult {
                                context: self.context.clone(),
                                expr: result.index(),
                            });
                        }
                    }
                }
            }
            Statement::Break | Statement::Continue if loop_depth == 0 => {
                return Err(IrError::MisplacedJump {
                    context: self.context.clone(),
                    statement: if matches!(stmt, Statement::Break) {
                        "break"
                    } else {
                        "continue"
                    },
                });
            }
            Statement::Return { value: Some(value) } => self.expr(*value)?,
            Statement::Break
            | Statement::Continue
            | Statement::Return { value: None }
            | Statement::Kill => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Literal;
    use crate::global::AddressSpace;

    fn module_with_main(build: impl FnOnce(&mut Module, &mut Function)) -> Module {
        let mut module = Module::default();
        let mut main = Function::new("main");
        build(&mut module, &mut main);
        module.functions.append(main);
        module
    }

    #[test]
    fn empty_module_is_valid() {
        assert!(validate(&Module::default()).is_ok());
    }

    #[test]
    fn store_to_output_is_valid() {
        let module = module_with_main(|module, main| {
            let vec4 = module.types.insert(Type::VEC4);
            let pos = module.global_variables.append(GlobalVariable::new(
                "gl_Position",
                vec4,
                AddressSpace::Output,
            ));
            let one = main.expressions.append(Expression::Literal(Literal::Float(1.0)));
            let value = main.expressions.append(Expression::Compose {
                ty: vec4,
                components: vec![one, one, one, one],
            });
            let ptr = main.expressions.append(Expression::GlobalVariable(pos));
            main.body.push(Statement::Store {
                pointer: ptr,
                value,
            });
        });
        validate(&module).expect("valid module");
    }

    #[test]
    fn forward_operand_is_rejected() {
        let module = module_with_main(|_, main| {
            main.expressions.append(Expression::Unary {
                op: crate::UnaryOp::Negate,
                expr: Handle::new(1),
            });
            main.expressions.append(Expression::Literal(Literal::Float(1.0)));
        });
        assert!(matches!(
            validate(&module),
            Err(IrError::ForwardReference { expr: 0, operand: 1, .. })
        ));
    }

    #[test]
    fn store_through_value_is_rejected() {
        let module = module_with_main(|_, main| {
            let lit = main.expressions.append(Expression::Literal(Literal::Float(1.0)));
            main.body.push(Statement::Store {
                pointer: lit,
                value: lit,
            });
        });
        assert!(matches!(validate(&module), Err(IrError::NotAPointer { .. })));
    }

    #[test]
    fn store_to_uniform_is_rejected() {
        let module = module_with_main(|module, main| {
            let float = module.types.insert(Type::FLOAT);
            let u = module.global_variables.append(GlobalVariable::new(
                "scale",
                float,
                AddressSpace::Uniform,
            ));
            let ptr = main.expressions.append(Expression::GlobalVariable(u));
            let lit = main.expressions.append(Expression::Literal(Literal::Float(1.0)));
            main.body.push(Statement::Store {
                pointer: ptr,
                value: lit,
            });
        });
        let err = validate(&module).unwrap_err();
        assert!(err.to_string().contains("read-only global `scale'"));
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        let module = module_with_main(|_, main| main.body.push(Statement::Break));
        assert!(matches!(
            validate(&module),
            Err(IrError::MisplacedJump {
                statement: "break",
                ..
            })
        ));

        let module = module_with_main(|_, main| {
            main.body.push(Statement::Loop {
                body: vec![Statement::Break],
                continuing: vec![],
                break_if: None,
            })
        });
        assert!(validate(&module).is_ok());
    }

    #[test]
    fn call_result_must_match_callee() {
        let mut module = Module::default();
        let helper = module.functions.append(Function::new("helper"));
        let other = module.functions.append(Function::new("other"));
        let mut main = Function::new("main");
        let result = main.expressions.append(Expression::CallResult(other));
        main.body.push(Statement::Call {
            function: helper,
            arguments: vec![],
            result: Some(result),
        });
        module.functions.append(main);
        assert!(matches!(
            validate(&module),
            Err(IrError::UnboundCallResult { .. })
        ));
    }

    #[test]
    fn pointer_root_follows_access_chain() {
        let mut exprs = Arena::new();
        let mut locals = Arena::new();
        let mut types = crate::UniqueArena::new();
        let ty = types.insert(Type::VEC4);
        let local = locals.append(LocalVariable {
            name: Some("c".into()),
            ty,
        });
        let var = exprs.append(Expression::LocalVariable(local));
        let swz = exprs.append(Expression::Swizzle {
            size: 1,
            vector: var,
            pattern: [crate::SwizzleComponent::X; 4],
        });
        assert_eq!(pointer_root(&exprs, swz), Some(PointerRoot::Local(local)));
        let lit = exprs.append(Expression::Literal(Literal::Int(0)));
        assert_eq!(pointer_root(&exprs, lit), None);
    }
}
