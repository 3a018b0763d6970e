//! Branch simplification pass.
//!
//! Replaces an `if` whose condition is a literal by the branch it always
//! takes, and drops an `if` whose branches are both empty. Conditions are
//! side-effect free, so nothing observable is lost.

use glsc_ir::{Arena, Block, Expression, Literal, Module, Statement};

use crate::Pass;

/// Resolves branches on literal conditions.
#[derive(Debug)]
pub struct BranchSimplification;

impl Pass for BranchSimplification {
    fn name(&self) -> &str {
        "branch-simplify"
    }

    fn run(&self, module: &mut Module, budget: u32) -> bool {
        let mut remaining = budget;
        let mut changed = false;
        for (_, func) in module.functions.iter_mut() {
            changed |= simplify_block(&mut func.body, &func.expressions, &mut remaining);
        }
        changed
    }
}

fn simplify_block(block: &mut Block, exprs: &Arena<Expression>, remaining: &mut u32) -> bool {
    let mut changed = false;
    let mut out = Vec::with_capacity(block.len());

    for mut stmt in block.drain(..) {
        match &mut stmt {
            Statement::If {
                accept, reject, ..
            } => {
                changed |= simplify_block(accept, exprs, remaining);
                changed |= simplify_block(reject, exprs, remaining);
            }
            Statement::Loop {
                body, continuing, ..
            } => {
                changed |= simplify_block(body, exprs, remaining);
                changed |= simplify_block(continuing, exprs, remaining);
            }
            _ => {}
        }

        if *remaining > 0 {
            if let Statement::If {
                condition,
                accept,
                reject,
            } = stmt
            {
                let taken = match exprs.get(condition).and_then(Expression::as_literal) {
                    Some(Literal::Bool(true)) => Ok(accept),
                    Some(Literal::Bool(false)) => Ok(reject),
                    _ if accept.is_empty() && reject.is_empty() => Ok(Vec::new()),
                    _ => Err((accept, reject)),
                };
                match taken {
                    Ok(taken) => {
                        out.extend(taken);
                        *remaining -= 1;
                        changed = true;
                    }
                    Err((accept, reject)) => out.push(Statement::If {
                        condition,
                        accept,
                        reject,
                    }),
                }
                continue;
            }
        }
        out.push(stmt);
    }

    *block = out;
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use glsc_ir::{Function, Handle};

    fn function_with(
        build: impl FnOnce(&mut Function) -> Block,
    ) -> (Module, Handle<Function>) {
        let mut module = Module::default();
        let mut func = Function::new("main");
        func.body = build(&mut func);
        let f = module.functions.append(func);
        (module, f)
    }

    #[test]
    fn literal_condition_selects_branch() {
        let (mut module, f) = function_with(|func| {
            let t = func.expressions.append(Expression::Literal(Literal::Bool(true)));
            vec![Statement::If {
                condition: t,
                accept: vec![Statement::Kill],
                reject: vec![Statement::Return { value: None }],
            }]
        });

        assert!(BranchSimplification.run(&mut module, crate::DEFAULT_PASS_BUDGET));
        assert!(matches!(module.functions[f].body[..], [Statement::Kill]));
        assert!(!BranchSimplification.run(&mut module, crate::DEFAULT_PASS_BUDGET));
    }

    #[test]
    fn nested_branches_inside_loops() {
        let (mut module, f) = function_with(|func| {
            let no = func.expressions.append(Expression::Literal(Literal::Bool(false)));
            vec![Statement::Loop {
                body: vec![Statement::If {
                    condition: no,
                    accept: vec![],
                    reject: vec![Statement::Break],
                }],
                continuing: vec![],
                break_if: None,
            }]
        });

        assert!(BranchSimplification.run(&mut module, crate::DEFAULT_PASS_BUDGET));
        match &module.functions[f].body[..] {
            [Statement::Loop { body, .. }] => assert!(matches!(body[..], [Statement::Break])),
            other => panic!("expected a loop, got {other:?}"),
        }
    }

    #[test]
    fn empty_branches_are_dropped() {
        let (mut module, f) = function_with(|func| {
            let ptr = func.expressions.append(Expression::FunctionArgument(0));
            vec![Statement::If {
                condition: ptr,
                accept: vec![],
                reject: vec![],
            }]
        });

        assert!(BranchSimplification.run(&mut module, crate::DEFAULT_PASS_BUDGET));
        assert!(module.functions[f].body.is_empty());
    }

    #[test]
    fn dynamic_condition_is_kept() {
        let (mut module, f) = function_with(|func| {
            let arg = func.expressions.append(Expression::FunctionArgument(0));
            vec![Statement::If {
                condition: arg,
                accept: vec![Statement::Kill],
                reject: vec![],
            }]
        });

        assert!(!BranchSimplification.run(&mut module, crate::DEFAULT_PASS_BUDGET));
        assert_eq!(module.functions[f].body.len(), 1);
    }

    #[test]
    fn zero_budget_changes_nothing() {
        let (mut module, f) = function_with(|func| {
            let t = func.expressions.append(Expression::Literal(Literal::Bool(true)));
            vec![Statement::If {
                condition: t,
                accept: vec![],
                reject: vec![],
            }]
        });

        assert!(!BranchSimplification.run(&mut module, 0));
        assert_eq!(module.functions[f].body.len(), 1);
    }
}
