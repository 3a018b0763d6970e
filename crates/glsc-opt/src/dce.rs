//! Dead code elimination pass.
//!
//! Removes statements that follow an unconditional `return`, `discard`,
//! `break`, or `continue` in the same block, and stores to local variables
//! that nothing ever loads from.

use std::collections::HashSet;

use glsc_ir::{
    Arena, Block, Expression, Function, Handle, LocalVariable, Module, PointerRoot, Statement,
    pointer_root,
};

use crate::Pass;

/// Removes unreachable statements and dead local stores.
#[derive(Debug)]
pub struct DeadCodeElimination;

impl Pass for DeadCodeElimination {
    fn name(&self) -> &str {
        "dce"
    }

    fn run(&self, module: &mut Module, budget: u32) -> bool {
        let mut remaining = budget;
        let mut changed = false;
        for (_, func) in module.functions.iter_mut() {
            if remaining == 0 {
                break;
            }
            changed |= run_on_function(func, &mut remaining);
        }
        changed
    }
}

fn run_on_function(func: &mut Function, remaining: &mut u32) -> bool {
    let loaded = loaded_locals(&func.expressions);
    let mut cx = Sweep {
        exprs: &func.expressions,
        loaded: &loaded,
        remaining,
    };
    cx.block(&mut func.body)
}

/// Locals read by any `Load` in the arena. Loads that no statement reaches
/// any more still count, which keeps the analysis conservative.
fn loaded_locals(exprs: &Arena<Expression>) -> HashSet<Handle<LocalVariable>> {
    exprs
        .iter()
        .filter_map(|(_, expr)| match *expr {
            Expression::Load { pointer } => match pointer_root(exprs, pointer) {
                Some(PointerRoot::Local(local)) => Some(local),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

struct Sweep<'a> {
    exprs: &'a Arena<Expression>,
    loaded: &'a HashSet<Handle<LocalVariable>>,
    remaining: &'a mut u32,
}

impl Sweep<'_> {
    fn spend(&mut self) -> bool {
        if *self.remaining == 0 {
            return false;
        }
        *self.remaining -= 1;
        true
    }

    fn is_dead_store(&self, stmt: &Statement) -> bool {
        match *stmt {
            Statement::Store { pointer, .. } => matches!(
                pointer_root(self.exprs, pointer),
                Some(PointerRoot::Local(local)) if !self.loaded.contains(&local)
            ),
            _ => false,
        }
    }

    fn block(&mut self, block: &mut Block) -> bool {
        let mut changed = false;

        if let Some(pos) = block.iter().position(Statement::is_terminator) {
            if pos + 1 < block.len() && self.spend() {
                block.truncate(pos + 1);
                changed = true;
            }
        }

        let mut i = 0;
        while i < block.len() {
            if self.is_dead_store(&block[i]) && self.spend() {
                block.remove(i);
                changed = true;
                continue;
            }
            match &mut block[i] {
                Statement::If { accept, reject, .. } => {
                    changed |= self.block(accept);
                    changed |= self.block(reject);
                }
                Statement::Loop {
                    body, continuing, ..
                } => {
                    changed |= self.block(body);
                    changed |= self.block(continuing);
                }
                _ => {}
            }
            i += 1;
        }

        changed
    }
}
