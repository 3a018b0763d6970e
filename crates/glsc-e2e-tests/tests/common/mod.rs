use std::path::{Path, PathBuf};

use glsc_compiler::{BuildConfig, BuildError, FsLoader, GlslToolchain, Program};
use glsc_context::Dialect;

/// Path of a fixture under the workspace `shaders/` directory.
pub fn shader(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../shaders")
        .join(name)
}

/// Load a fixture's text by name.
#[allow(dead_code)]
pub fn load_shader(name: &str) -> String {
    let path = shader(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to load {}: {e}", path.display()))
}

/// What a build printed, and how it ended.
pub struct Outcome {
    pub result: Result<Program, BuildError>,
    pub stdout: String,
}

impl Outcome {
    #[allow(dead_code)]
    pub fn program(self) -> Program {
        match self.result {
            Ok(program) => program,
            Err(err) => panic!("build failed: {err}\n{}", self.stdout),
        }
    }
}

/// Build fixtures through the file system, like the `glsc` binary does.
pub fn build_fixtures(names: &[&str], configure: impl FnOnce(&mut BuildConfig)) -> Outcome {
    let mut config = BuildConfig::new(names.iter().map(|name| shader(name)));
    configure(&mut config);
    build_config(&config)
}

pub fn build_config(config: &BuildConfig) -> Outcome {
    let mut out = Vec::new();
    let result = glsc_compiler::build(config, &GlslToolchain::new(), &FsLoader, &mut out);
    Outcome {
        result,
        stdout: String::from_utf8(out).expect("utf-8 output"),
    }
}

#[allow(dead_code)]
pub fn link(config: &mut BuildConfig) {
    config.link = true;
}

#[allow(dead_code)]
pub fn link_es(config: &mut BuildConfig) {
    config.link = true;
    config.dialect = Dialect::Embedded;
}
