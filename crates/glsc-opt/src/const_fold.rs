//! Constant folding pass.
//!
//! Evaluates operations whose operands are all literals at compile time,
//! replacing them with the resulting literal in the expression arena. Loads
//! of `const` globals with a literal initializer fold to that literal.

use glsc_ir::{
    AddressSpace, Arena, BuiltinFunction, Expression, Handle, Literal, Module, Type, UniqueArena,
};

use crate::Pass;

/// Folds constant expressions (literal operands) at compile time.
#[derive(Debug)]
pub struct ConstantFolding;

impl Pass for ConstantFolding {
    fn name(&self) -> &str {
        "const-fold"
    }

    fn run(&self, module: &mut Module, budget: u32) -> bool {
        let mut remaining = budget;
        let globals = GlobalConstants::collect(module);

        let Module {
            types,
            global_expressions,
            functions,
            ..
        } = module;

        let mut changed = fold_arena(global_expressions, types, &globals, &mut remaining);
        for (_, func) in functions.iter_mut() {
            if remaining == 0 {
                break;
            }
            changed |= fold_arena(&mut func.expressions, types, &globals, &mut remaining);
        }
        changed
    }
}

/// Literal values of `const` globals, indexed by global handle.
struct GlobalConstants(Vec<Option<Literal>>);

impl GlobalConstants {
    fn collect(module: &Module) -> Self {
        Self(
            module
                .global_variables
                .iter()
                .map(|(_, var)| {
                    if var.space != AddressSpace::Constant {
                        return None;
                    }
                    var.init
                        .and_then(|init| module.global_expressions.get(init))
                        .and_then(Expression::as_literal)
                })
                .collect(),
        )
    }

    fn get(&self, exprs: &Arena<Expression>, pointer: Handle<Expression>) -> Option<Literal> {
        match exprs.get(pointer)? {
            Expression::GlobalVariable(var) => self.0.get(var.index()).copied().flatten(),
            _ => None,
        }
    }
}

fn fold_arena(
    exprs: &mut Arena<Expression>,
    types: &UniqueArena<Type>,
    globals: &GlobalConstants,
    remaining: &mut u32,
) -> bool {
    let mut changed = false;

    // Handles are visited in allocation order, so operands are folded
    // before their users within one invocation.
    for handle in exprs.handles() {
        if *remaining == 0 {
            break;
        }
        let literal = |h: Handle<Expression>| exprs.get(h).and_then(Expression::as_literal);
        let folded = match &exprs[handle] {
            Expression::Binary { op, left, right } => {
                literal(*left).zip(literal(*right)).and_then(|(l, r)| op.eval(l, r))
            }
            Expression::Unary { op, expr } => literal(*expr).and_then(|v| op.eval(v)),
            Expression::Select {
                condition,
                accept,
                reject,
            } => match literal(*condition) {
                Some(Literal::Bool(true)) => literal(*accept),
                Some(Literal::Bool(false)) => literal(*reject),
                _ => None,
            },
            Expression::Compose { ty, components } => match (types.get(*ty), &components[..]) {
                (Some(Type::Scalar(kind)), [value]) => literal(*value).map(|v| v.convert(*kind)),
                _ => None,
            },
            Expression::Builtin { fun, arguments } => {
                let args: Option<Vec<f32>> = arguments
                    .iter()
                    .map(|&a| match literal(a) {
                        Some(Literal::Float(v)) => Some(v),
                        _ => None,
                    })
                    .collect();
                args.and_then(|args| fold_builtin(*fun, &args))
                    .map(Literal::Float)
            }
            Expression::Load { pointer } => globals.get(exprs, *pointer),
            _ => None,
        };

        if let Some(lit) = folded {
            exprs[handle] = Expression::Literal(lit);
            *remaining -= 1;
            changed = true;
        }
    }

    changed
}

/// Evaluates a scalar float built-in. Results that are not finite are left
/// to run time.
fn fold_builtin(fun: BuiltinFunction, args: &[f32]) -> Option<f32> {
    use BuiltinFunction as F;
    let value = match (fun, args) {
        (F::Radians, &[x]) => x.to_radians(),
        (F::Degrees, &[x]) => x.to_degrees(),
        (F::Sin, &[x]) => x.sin(),
        (F::Cos, &[x]) => x.cos(),
        (F::Tan, &[x]) => x.tan(),
        (F::Asin, &[x]) => x.asin(),
        (F::Acos, &[x]) => x.acos(),
        (F::Atan, &[x]) => x.atan(),
        (F::Atan, &[y, x]) => y.atan2(x),
        (F::Pow, &[x, y]) => x.powf(y),
        (F::Exp, &[x]) => x.exp(),
        (F::Log, &[x]) => x.ln(),
        (F::Exp2, &[x]) => x.exp2(),
        (F::Log2, &[x]) => x.log2(),
        (F::Sqrt, &[x]) => x.sqrt(),
        (F::InverseSqrt, &[x]) => x.sqrt().recip(),
        (F::Abs, &[x]) => x.abs(),
        (F::Sign, &[x]) => {
            if x > 0.0 {
                1.0
            } else if x < 0.0 {
                -1.0
            } else {
                0.0
            }
        }
        (F::Floor, &[x]) => x.floor(),
        (F::Ceil, &[x]) => x.ceil(),
        (F::Fract, &[x]) => x - x.floor(),
        (F::Mod, &[x, y]) => x - y * (x / y).floor(),
        (F::Min, &[x, y]) => x.min(y),
        (F::Max, &[x, y]) => x.max(y),
        (F::Clamp, &[x, lo, hi]) => x.max(lo).min(hi),
        (F::Mix, &[x, y, a]) => x * (1.0 - a) + y * a,
        (F::Step, &[edge, x]) => {
            if x < edge {
                0.0
            } else {
                1.0
            }
        }
        (F::SmoothStep, &[e0, e1, x]) => {
            let t = ((x - e0) / (e1 - e0)).clamp(0.0, 1.0);
            t * t * (3.0 - 2.0 * t)
        }
        (F::Length, &[x]) => x.abs(),
        (F::Distance, &[x, y]) => (x - y).abs(),
        (F::Dot, &[x, y]) => x * y,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glsc_ir::{BinaryOp, Function, GlobalVariable, ScalarKind, UnaryOp};

    fn run(module: &mut Module) -> bool {
        ConstantFolding.run(module, crate::DEFAULT_PASS_BUDGET)
    }

    fn single_function(module: &mut Module, func: Function) -> Handle<Function> {
        module.functions.append(func)
    }

    #[test]
    fn fold_float_add() {
        let mut module = Module::default();
        let mut func = Function::new("test");
        let one = func.expressions.append(Expression::Literal(Literal::Float(1.0)));
        let two = func.expressions.append(Expression::Literal(Literal::Float(2.0)));
        let add = func.expressions.append(Expression::Binary {
            op: BinaryOp::Add,
            left: one,
            right: two,
        });
        let f = single_function(&mut module, func);

        assert!(run(&mut module));
        match &module.functions[f].expressions[add] {
            Expression::Literal(Literal::Float(v)) => assert_eq!(*v, 3.0),
            other => panic!("expected Literal(Float(3.0)), got {other:?}"),
        }
        assert!(!run(&mut module));
    }

    #[test]
    fn fold_unary_chain() {
        let mut module = Module::default();
        let mut func = Function::new("test");
        let t = func.expressions.append(Expression::Literal(Literal::Bool(true)));
        let not = func.expressions.append(Expression::Unary {
            op: UnaryOp::LogicalNot,
            expr: t,
        });
        let not_not = func.expressions.append(Expression::Unary {
            op: UnaryOp::LogicalNot,
            expr: not,
        });
        let f = single_function(&mut module, func);

        assert!(run(&mut module));
        let exprs = &module.functions[f].expressions;
        assert_eq!(exprs[not].as_literal(), Some(Literal::Bool(false)));
        assert_eq!(exprs[not_not].as_literal(), Some(Literal::Bool(true)));
    }

    #[test]
    fn integer_division_by_zero_is_kept() {
        let mut module = Module::default();
        let mut func = Function::new("test");
        let one = func.expressions.append(Expression::Literal(Literal::Int(1)));
        let zero = func.expressions.append(Expression::Literal(Literal::Int(0)));
        let div = func.expressions.append(Expression::Binary {
            op: BinaryOp::Divide,
            left: one,
            right: zero,
        });
        let f = single_function(&mut module, func);

        assert!(!run(&mut module));
        assert!(matches!(
            module.functions[f].expressions[div],
            Expression::Binary { .. }
        ));
    }

    #[test]
    fn fold_scalar_conversion_and_select() {
        let mut module = Module::default();
        let float = module.types.insert(Type::FLOAT);
        let mut func = Function::new("test");
        let three = func.expressions.append(Expression::Literal(Literal::Int(3)));
        let conv = func.expressions.append(Expression::Compose {
            ty: float,
            components: vec![three],
        });
        let cond = func.expressions.append(Expression::Literal(Literal::Bool(false)));
        let half = func.expressions.append(Expression::Literal(Literal::Float(0.5)));
        let select = func.expressions.append(Expression::Select {
            condition: cond,
            accept: conv,
            reject: half,
        });
        let f = single_function(&mut module, func);

        assert!(run(&mut module));
        let exprs = &module.functions[f].expressions;
        assert_eq!(exprs[conv].as_literal(), Some(Literal::Float(3.0)));
        assert_eq!(exprs[select].as_literal(), Some(Literal::Float(0.5)));
        assert_eq!(
            exprs[conv].as_literal().map(|l| l.kind()),
            Some(ScalarKind::Float)
        );
    }

    #[test]
    fn fold_builtins() {
        assert_eq!(fold_builtin(BuiltinFunction::Max, &[1.0, 2.0]), Some(2.0));
        assert_eq!(fold_builtin(BuiltinFunction::Clamp, &[5.0, 0.0, 1.0]), Some(1.0));
        assert_eq!(fold_builtin(BuiltinFunction::Sqrt, &[-1.0]), None);
        assert_eq!(fold_builtin(BuiltinFunction::Fract, &[1.25]), Some(0.25));
        assert_eq!(fold_builtin(BuiltinFunction::Texture2D, &[0.0]), None);
    }

    #[test]
    fn fold_load_of_const_global() {
        let mut module = Module::default();
        let float = module.types.insert(Type::FLOAT);
        let init = module
            .global_expressions
            .append(Expression::Literal(Literal::Float(0.25)));
        let mut weight = GlobalVariable::new("weight", float, AddressSpace::Constant);
        weight.init = Some(init);
        let weight = module.global_variables.append(weight);
        let scale = module.global_variables.append(GlobalVariable::new(
            "scale",
            float,
            AddressSpace::Uniform,
        ));

        let mut func = Function::new("test");
        let wp = func.expressions.append(Expression::GlobalVariable(weight));
        let wl = func.expressions.append(Expression::Load { pointer: wp });
        let sp = func.expressions.append(Expression::GlobalVariable(scale));
        let sl = func.expressions.append(Expression::Load { pointer: sp });
        let f = single_function(&mut module, func);

        assert!(run(&mut module));
        let exprs = &module.functions[f].expressions;
        assert_eq!(exprs[wl].as_literal(), Some(Literal::Float(0.25)));
        assert!(matches!(exprs[sl], Expression::Load { .. }));
    }

    #[test]
    fn budget_limits_rewrites() {
        let mut module = Module::default();
        let mut func = Function::new("test");
        let mut negations = Vec::new();
        for v in 0..4 {
            let lit = func.expressions.append(Expression::Literal(Literal::Int(v)));
            negations.push(func.expressions.append(Expression::Unary {
                op: UnaryOp::Negate,
                expr: lit,
            }));
        }
        let f = single_function(&mut module, func);

        assert!(ConstantFolding.run(&mut module, 3));
        let folded = negations
            .iter()
            .filter(|&&h| module.functions[f].expressions[h].as_literal().is_some())
            .count();
        assert_eq!(folded, 3);

        assert!(!ConstantFolding.run(&mut module, 0));
        assert!(ConstantFolding.run(&mut module, 3));
        assert!(!ConstantFolding.run(&mut module, 3));
    }
}
