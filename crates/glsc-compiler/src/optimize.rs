//! The optimization fixed-point loop.

use glsc_ir::{IrError, Module};

use crate::stages::Toolchain;

/// What [`optimize`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OptimizeSummary {
    /// Full passes executed, including the last one that made no progress.
    pub passes: usize,
}

/// Applies [`Toolchain::optimize_pass`] until a pass makes no progress,
/// then validates the result.
///
/// There is no iteration cap: every pass must be monotone. `budget` is
/// handed unchanged to every pass invocation.
pub fn optimize(
    toolchain: &dyn Toolchain,
    module: &mut Module,
    budget: u32,
) -> Result<OptimizeSummary, IrError> {
    let mut passes = 0;
    loop {
        passes += 1;
        let progress = toolchain.optimize_pass(module, budget);
        log::debug!("optimization pass {passes}: progress = {progress}");
        if !progress {
            break;
        }
    }
    toolchain.validate_ir(module)?;
    Ok(OptimizeSummary { passes })
}
