//! Reference program linker for glsc.
//!
//! [`link`] takes the compiled shaders of a program, merges the shaders of
//! each [`ShaderKind`] into one [`LinkedStage`], and checks the rules that
//! only hold for the program as a whole: compatible language versions,
//! agreeing uniform declarations, matching stage interfaces, a written
//! `gl_Position`, and the resource limits of the [`CapabilityContext`].
//!
//! Problems with the shaders are reported in [`LinkOutput::log`]; the linker
//! itself never fails.

mod interface;
mod merge;

use glsc_context::{CapabilityContext, ShaderKind, Version};
use glsc_ir::{InfoLog, Module};

/// One compiled shader handed to the linker.
#[derive(Clone, Copy, Debug)]
pub struct LinkInput<'a> {
    /// Pipeline stage of the shader.
    pub kind: ShaderKind,
    /// Language version the shader was compiled with.
    pub version: Version,
    /// The shader's IR.
    pub module: &'a Module,
    /// Built-in functions the shader references.
    pub builtins: &'a [String],
}

/// The merged IR of every shader of one kind.
#[derive(Clone, Debug)]
pub struct LinkedStage {
    /// Pipeline stage.
    pub kind: ShaderKind,
    /// Freshly built IR, independent of the input modules.
    pub module: Module,
    /// Highest version among the merged shaders.
    pub version: Version,
    /// Union of the referenced built-in functions, in first-use order.
    pub builtins: Vec<String>,
}

/// Result of a link.
#[derive(Clone, Debug, Default)]
pub struct LinkOutput {
    /// One stage per kind present, in pipeline order. Empty on failure.
    pub stages: Vec<LinkedStage>,
    /// `true` if the program linked.
    pub status: bool,
    /// Diagnostics; empty on a clean link.
    pub log: InfoLog,
}

/// Links `inputs` into one stage per shader kind.
pub fn link(inputs: &[LinkInput<'_>], ctx: &CapabilityContext) -> LinkOutput {
    let mut log = InfoLog::new();

    if inputs.is_empty() {
        log.error(None, "no shaders attached to the program");
        return LinkOutput {
            log,
            ..LinkOutput::default()
        };
    }

    check_versions(inputs, &mut log);

    let mut stages = Vec::new();
    for kind in ShaderKind::ALL {
        let group: Vec<_> = inputs.iter().filter(|i| i.kind == kind).collect();
        if group.is_empty() {
            continue;
        }
        log::debug!("linking {kind} stage from {} shader(s)", group.len());
        if let Some(stage) = merge::merge_stage(kind, &group, &mut log) {
            stages.push(stage);
        }
    }

    if !log.has_errors() {
        interface::check_program(&stages, ctx, &mut log);
    }

    let status = !log.has_errors();
    if !status {
        stages.clear();
    }
    log::info!("link {}", if status { "succeeded" } else { "failed" });
    LinkOutput {
        stages,
        status,
        log,
    }
}

/// ES shaders link only with the same version; desktop 1.10 and 1.20 mix
/// freely but 1.30 links only with 1.30.
fn check_versions(inputs: &[LinkInput<'_>], log: &mut InfoLog) {
    let first = inputs[0].version;
    for input in &inputs[1..] {
        let v = input.version;
        let compatible = v == first
            || (!v.es && !first.es && v.number < 130 && first.number < 130);
        if !compatible {
            log.error(
                None,
                format!("cannot link a {first} shader with a {v} shader"),
            );
            return;
        }
    }
}
