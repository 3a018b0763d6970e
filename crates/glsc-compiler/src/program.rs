//! A program: compiled shader units and their link result.

use std::collections::BTreeMap;

use glsc_context::{CapabilityContext, ShaderKind};
use glsc_ir::InfoLog;
use glsc_link::{LinkInput, LinkedStage};

use crate::error::LinkError;
use crate::stages::Toolchain;
use crate::unit::{CompileStatus, ShaderUnit};

/// Outcome of linking a program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkStatus {
    /// Not linked yet.
    Pending,
    /// Every stage linked.
    Linked,
    /// The link logged at least one error.
    Failed,
}

/// Compiled units plus, after [`Program::link`], one linked IR per stage.
#[derive(Debug)]
pub struct Program {
    units: Vec<ShaderUnit>,
    log: InfoLog,
    status: LinkStatus,
    linked: BTreeMap<ShaderKind, LinkedStage>,
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl Program {
    pub fn new() -> Self {
        Self {
            units: Vec::new(),
            log: InfoLog::new(),
            status: LinkStatus::Pending,
            linked: BTreeMap::new(),
        }
    }

    /// Takes ownership of a unit. Units are linked in the order they were
    /// added.
    pub fn add(&mut self, unit: ShaderUnit) {
        self.units.push(unit);
    }

    pub fn units(&self) -> &[ShaderUnit] {
        &self.units
    }

    /// Diagnostics of the link; empty before linking and after a clean link.
    pub fn log(&self) -> &InfoLog {
        &self.log
    }

    pub fn link_status(&self) -> LinkStatus {
        self.status
    }

    /// The linked IR for `kind`, if the program linked and has that stage.
    pub fn linked(&self, kind: ShaderKind) -> Option<&LinkedStage> {
        self.linked.get(&kind)
    }

    /// Links every unit. Returns `true` if the program linked.
    ///
    /// Preconditions are checked before anything changes: a program that
    /// was already linked, has no units, or holds a unit that did not
    /// compile is rejected with the program untouched.
    pub fn link(
        &mut self,
        ctx: &CapabilityContext,
        toolchain: &dyn Toolchain,
    ) -> Result<bool, LinkError> {
        if self.status != LinkStatus::Pending {
            return Err(LinkError::AlreadyLinked);
        }
        if self.units.is_empty() {
            return Err(LinkError::NoShaders);
        }

        let mut inputs = Vec::with_capacity(self.units.len());
        for unit in &self.units {
            let (CompileStatus::Succeeded, Some(module), Some(version)) =
                (unit.status(), unit.module(), unit.version())
            else {
                return Err(LinkError::UnitNotCompiled {
                    name: unit.name().to_owned(),
                    status: unit.status(),
                });
            };
            inputs.push(LinkInput {
                kind: unit.kind(),
                version,
                module,
                builtins: unit.builtins(),
            });
        }

        let output = toolchain.link(&inputs, ctx);
        for stage in &output.stages {
            toolchain.validate_ir(&stage.module)?;
        }

        let linked = output.status && !output.log.has_errors();
        self.log = output.log;
        if !linked && !self.log.has_errors() {
            self.log.error(None, "link failed");
        }
        self.status = if linked {
            LinkStatus::Linked
        } else {
            LinkStatus::Failed
        };
        if linked {
            self.linked = output
                .stages
                .into_iter()
                .map(|stage| (stage.kind, stage))
                .collect();
        }
        log::debug!(
            "linked {} units: {:?}, {} stages",
            self.units.len(),
            self.status,
            self.linked.len()
        );
        Ok(linked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::SourceBuffer;
    use crate::stages::GlslToolchain;
    use crate::unit::CompileOptions;
    use glsc_context::Dialect;

    fn compiled(path: &str, source: &str, kind: ShaderKind) -> ShaderUnit {
        let ctx = CapabilityContext::new(Dialect::Desktop);
        let mut unit = ShaderUnit::new(SourceBuffer::new(path, source), kind);
        unit.compile(
            &ctx,
            &GlslToolchain::new(),
            &CompileOptions::default(),
            &mut std::io::sink(),
        )
        .expect("compile");
        unit
    }

    fn link(program: &mut Program) -> Result<bool, LinkError> {
        program.link(
            &CapabilityContext::new(Dialect::Desktop),
            &GlslToolchain::new(),
        )
    }

    #[test]
    fn link_vertex_and_fragment() {
        let mut program = Program::new();
        program.add(compiled(
            "a.vert",
            "varying vec4 c;\nvoid main() { c = vec4(1.0); gl_Position = vec4(0.0); }",
            ShaderKind::Vertex,
        ));
        program.add(compiled(
            "b.frag",
            "varying vec4 c;\nvoid main() { gl_FragColor = c; }",
            ShaderKind::Fragment,
        ));

        assert!(link(&mut program).expect("link"));
        assert_eq!(program.link_status(), LinkStatus::Linked);
        assert!(program.log().is_empty());
        assert!(program.linked(ShaderKind::Vertex).is_some());
        assert!(program.linked(ShaderKind::Fragment).is_some());
        assert!(program.linked(ShaderKind::Geometry).is_none());

        assert!(matches!(link(&mut program), Err(LinkError::AlreadyLinked)));
    }

    #[test]
    fn empty_program() {
        let mut program = Program::new();
        assert!(matches!(link(&mut program), Err(LinkError::NoShaders)));
        assert_eq!(program.link_status(), LinkStatus::Pending);
    }

    #[test]
    fn uncompiled_unit_leaves_program_untouched() {
        let mut program = Program::new();
        program.add(compiled(
            "a.vert",
            "void main() { gl_Position = vec4(0.0); }",
            ShaderKind::Vertex,
        ));
        program.add(ShaderUnit::new(
            SourceBuffer::new("b.frag", "void main() {}"),
            ShaderKind::Fragment,
        ));

        let err = link(&mut program).expect_err("pending unit");
        assert_eq!(
            err.to_string(),
            "shader `b.frag' is not compiled (status: pending)"
        );
        assert_eq!(program.link_status(), LinkStatus::Pending);
        assert!(program.log().is_empty());
    }

    #[test]
    fn failed_link_keeps_log_and_no_stages() {
        let mut program = Program::new();
        program.add(compiled("a.vert", "void main() {}", ShaderKind::Vertex));

        assert!(!link(&mut program).expect("link"));
        assert_eq!(program.link_status(), LinkStatus::Failed);
        assert_eq!(
            program.log().to_string(),
            "error: vertex shader does not write to `gl_Position'\n"
        );
        assert!(program.linked(ShaderKind::Vertex).is_none());
    }
}
