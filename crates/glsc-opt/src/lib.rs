//! IR optimization passes for glsc.
//!
//! Provides a [`Pass`] trait, a [`PassManager`] that runs one full
//! iteration of its passes, and the built-in passes (constant folding,
//! branch simplification, dead code elimination). Iterating to a fixed
//! point is left to the caller.
//!
//! Every pass is monotone: it only ever replaces expressions by literals or
//! removes statements, so repeating full passes always reaches a point where
//! nothing changes.

mod branch;
mod const_fold;
mod dce;

pub use branch::BranchSimplification;
pub use const_fold::ConstantFolding;
pub use dce::DeadCodeElimination;

use std::fmt::Debug;

use glsc_ir::Module;

/// Rewrites a single pass invocation may perform unless configured otherwise.
pub const DEFAULT_PASS_BUDGET: u32 = 32;

/// An optimization pass that transforms an IR module.
pub trait Pass: Debug {
    /// Human-readable name of the pass.
    fn name(&self) -> &str;

    /// Run the pass on a module, performing at most `budget` rewrites.
    /// Returns `true` if anything was modified.
    fn run(&self, module: &mut Module, budget: u32) -> bool;
}

/// Runs passes in sequence.
#[derive(Debug)]
pub struct PassManager {
    passes: Vec<Box<dyn Pass>>,
}

impl Default for PassManager {
    fn default() -> Self {
        Self::common()
    }
}

impl PassManager {
    /// Creates an empty pass manager with no passes.
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// Creates a pass manager with the standard pass pipeline.
    pub fn common() -> Self {
        let mut pm = Self::new();
        pm.add_pass(Box::new(ConstantFolding));
        pm.add_pass(Box::new(BranchSimplification));
        pm.add_pass(Box::new(DeadCodeElimination));
        pm
    }

    /// Adds a pass to the pipeline.
    pub fn add_pass(&mut self, pass: Box<dyn Pass>) {
        self.passes.push(pass);
    }

    /// Runs every pass once, in order. Returns `true` if any pass made
    /// progress.
    pub fn run_once(&self, module: &mut Module, budget: u32) -> bool {
        let mut changed = false;
        for pass in &self.passes {
            if pass.run(module, budget) {
                log::debug!("pass `{}' made progress", pass.name());
                changed = true;
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glsc_ir::{BinaryOp, Expression, Function, Literal, LocalVariable, Statement, Type};

    /// Repeats full iterations until one makes no progress; returns the
    /// number of iterations, the last one included.
    fn settle(pm: &PassManager, module: &mut Module, budget: u32) -> usize {
        let mut iterations = 1;
        while pm.run_once(module, budget) {
            iterations += 1;
        }
        iterations
    }

    #[test]
    fn common_passes_leave_empty_module_alone() {
        let mut module = Module::default();
        assert!(!PassManager::common().run_once(&mut module, DEFAULT_PASS_BUDGET));
        assert!(module.is_empty());
    }

    #[test]
    fn empty_pass_manager_is_noop() {
        let pm = PassManager::new();
        let mut module = Module::default();
        assert!(!pm.run_once(&mut module, DEFAULT_PASS_BUDGET));
    }

    #[test]
    fn small_budget_needs_more_iterations() {
        // x = ((1 + 2) + 3) + 4: each level only folds once its operands have.
        let build = || {
            let mut module = Module::default();
            let int = module.types.insert(Type::INT);
            let mut main = Function::new("main");
            let x = main.local_variables.append(LocalVariable {
                name: Some("x".into()),
                ty: int,
            });
            let mut acc = main.expressions.append(Expression::Literal(Literal::Int(1)));
            for v in 2..=4 {
                let lit = main.expressions.append(Expression::Literal(Literal::Int(v)));
                acc = main.expressions.append(Expression::Binary {
                    op: BinaryOp::Add,
                    left: acc,
                    right: lit,
                });
            }
            let ptr = main.expressions.append(Expression::LocalVariable(x));
            let load = main.expressions.append(Expression::Load { pointer: ptr });
            main.body.push(Statement::Store {
                pointer: ptr,
                value: acc,
            });
            main.body.push(Statement::Store {
                pointer: ptr,
                value: load,
            });
            module.functions.append(main);
            (module, acc)
        };

        let (mut wide, acc) = build();
        let wide_iterations = settle(&PassManager::common(), &mut wide, DEFAULT_PASS_BUDGET);
        let (mut narrow, _) = build();
        let narrow_iterations = settle(&PassManager::common(), &mut narrow, 1);

        assert!(narrow_iterations > wide_iterations);
        for module in [&wide, &narrow] {
            let (_, main) = module.functions.iter().next().expect("main");
            assert_eq!(main.expressions[acc].as_literal(), Some(Literal::Int(10)));
        }
    }

    #[test]
    fn fixed_point_is_idempotent() {
        let mut module = Module::default();
        let mut main = Function::new("main");
        let cond = main.expressions.append(Expression::Literal(Literal::Bool(true)));
        let not = main.expressions.append(Expression::Unary {
            op: glsc_ir::UnaryOp::LogicalNot,
            expr: cond,
        });
        main.body.push(Statement::If {
            condition: not,
            accept: vec![Statement::Kill],
            reject: vec![Statement::Return { value: None }, Statement::Kill],
        });
        module.functions.append(main);

        let pm = PassManager::common();
        settle(&pm, &mut module, DEFAULT_PASS_BUDGET);
        assert!(!pm.run_once(&mut module, DEFAULT_PASS_BUDGET));
        let (_, main) = module.functions.iter().next().expect("main");
        assert!(matches!(main.body[..], [Statement::Return { value: None }]));
    }
}
