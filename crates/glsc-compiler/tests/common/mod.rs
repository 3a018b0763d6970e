//! Instrumented loader and toolchain shared by the integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use glsc_compiler::{GlslToolchain, LoadError, Preprocessed, SourceBuffer, SourceLoader, Toolchain};
use glsc_context::{CapabilityContext, Dialect, ShaderKind, Version};
use glsc_ir::{InfoLog, IrError, Module};
use glsc_link::{LinkInput, LinkOutput};
use glsc_parser::{Lowered, TranslationUnit};

pub const TRIVIAL_VERTEX: &str = "void main() { gl_Position = vec4(0.0); }\n";
pub const TRIVIAL_FRAGMENT: &str = "void main() { gl_FragColor = vec4(1.0); }\n";
pub const BROKEN_FRAGMENT: &str = "void main()\n{\n    gl_FragColor = vec4(1.0)\n}\n";

/// Serves sources from memory and records every path it was asked for.
#[derive(Default)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, String>,
    requests: RefCell<Vec<PathBuf>>,
}

impl MemoryLoader {
    pub fn new<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            files: files
                .into_iter()
                .map(|(path, text)| (PathBuf::from(path), text.to_owned()))
                .collect(),
            requests: RefCell::default(),
        }
    }

    pub fn loads(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn requested(&self) -> Vec<PathBuf> {
        self.requests.borrow().clone()
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&self, path: &Path) -> Result<SourceBuffer, LoadError> {
        self.requests.borrow_mut().push(path.to_path_buf());
        match self.files.get(path) {
            Some(text) => Ok(SourceBuffer::new(path, text.as_bytes())),
            None => Err(LoadError::NotFound {
                path: path.to_path_buf(),
                source: std::io::ErrorKind::NotFound.into(),
            }),
        }
    }
}

/// Per-stage invocation counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Calls {
    pub preprocess: usize,
    pub parse: usize,
    pub lower: usize,
    pub optimize_pass: usize,
    pub validate_ir: usize,
    pub link: usize,
}

/// The reference toolchain behind counters, with knobs to misbehave.
#[derive(Default)]
pub struct CountingToolchain {
    inner: GlslToolchain,
    calls: Cell<Calls>,
    budgets: RefCell<Vec<u32>>,
    fail_preprocess: bool,
    fake_progress: Option<usize>,
    extra_builtins: usize,
    reject_ir: bool,
    silent_link_failure: bool,
}

impl CountingToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a preprocessing failure for every source.
    pub fn failing_preprocess(self) -> Self {
        Self {
            fail_preprocess: true,
            ..self
        }
    }

    /// Replace the real optimizer by one that reports progress `passes`
    /// times before settling.
    pub fn progressing(self, passes: usize) -> Self {
        Self {
            fake_progress: Some(passes),
            ..self
        }
    }

    /// Append `count` extra built-in references to every lowered unit.
    pub fn with_extra_builtins(self, count: usize) -> Self {
        Self {
            extra_builtins: count,
            ..self
        }
    }

    /// Make `validate_ir` reject every module.
    pub fn rejecting_ir(self) -> Self {
        Self {
            reject_ir: true,
            ..self
        }
    }

    /// Make `link` fail without logging anything.
    pub fn failing_link_silently(self) -> Self {
        Self {
            silent_link_failure: true,
            ..self
        }
    }

    pub fn calls(&self) -> Calls {
        self.calls.get()
    }

    pub fn budgets(&self) -> Vec<u32> {
        self.budgets.borrow().clone()
    }

    fn bump(&self, f: impl FnOnce(&mut Calls)) {
        let mut calls = self.calls.get();
        f(&mut calls);
        self.calls.set(calls);
    }
}

impl Toolchain for CountingToolchain {
    fn preprocess(
        &self,
        source: &str,
        ctx: &CapabilityContext,
        dialect: Dialect,
        log: &mut InfoLog,
    ) -> Preprocessed {
        self.bump(|c| c.preprocess += 1);
        if self.fail_preprocess {
            log.error(None, "#error forced failure");
            return Preprocessed {
                source: source.to_owned(),
                version: Version::default_for(dialect),
                error: true,
            };
        }
        self.inner.preprocess(source, ctx, dialect, log)
    }

    fn parse(&self, source: &str, version: Version, log: &mut InfoLog) -> TranslationUnit {
        self.bump(|c| c.parse += 1);
        self.inner.parse(source, version, log)
    }

    fn lower(
        &self,
        ast: &TranslationUnit,
        ctx: &CapabilityContext,
        kind: ShaderKind,
        version: Version,
        log: &mut InfoLog,
    ) -> Lowered {
        self.bump(|c| c.lower += 1);
        let mut lowered = self.inner.lower(ast, ctx, kind, version, log);
        lowered
            .builtins
            .extend((0..self.extra_builtins).map(|i| format!("builtin{i}")));
        lowered
    }

    fn optimize_pass(&self, module: &mut Module, budget: u32) -> bool {
        self.bump(|c| c.optimize_pass += 1);
        self.budgets.borrow_mut().push(budget);
        match self.fake_progress {
            Some(n) => self.budgets.borrow().len() <= n,
            None => self.inner.optimize_pass(module, budget),
        }
    }

    fn validate_ir(&self, module: &Module) -> Result<(), IrError> {
        self.bump(|c| c.validate_ir += 1);
        if self.reject_ir {
            return Err(IrError::PrototypeWithBody {
                context: "rejected by test".into(),
            });
        }
        self.inner.validate_ir(module)
    }

    fn link(&self, inputs: &[LinkInput<'_>], ctx: &CapabilityContext) -> LinkOutput {
        self.bump(|c| c.link += 1);
        if self.silent_link_failure {
            return LinkOutput {
                stages: Vec::new(),
                status: false,
                log: InfoLog::new(),
            };
        }
        self.inner.link(inputs, ctx)
    }
}
