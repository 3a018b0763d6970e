//! The build driver: the library half of the `glsc` binary.

use std::io::Write;
use std::path::Path;

use glsc_context::{CapabilityContext, ShaderKind};

use crate::config::BuildConfig;
use crate::error::{BuildError, CompileError, LinkError, UsageError};
use crate::loader::SourceLoader;
use crate::program::Program;
use crate::stages::Toolchain;
use crate::unit::{CompileOptions, ShaderUnit};

/// Length of every recognized suffix, dot included.
const SUFFIX_LEN: usize = 5;

/// Maps a path to the shader kind named by its last five characters.
///
/// A path needs at least one character before the suffix, so `.vert` on
/// its own is rejected.
pub fn shader_kind(path: &Path) -> Result<ShaderKind, UsageError> {
    let unknown = || UsageError::UnknownExtension {
        path: path.to_path_buf(),
    };
    let name = path.to_str().ok_or_else(unknown)?;
    if name.len() <= SUFFIX_LEN || !name.is_char_boundary(name.len() - SUFFIX_LEN) {
        return Err(unknown());
    }
    ShaderKind::from_extension(&name[name.len() - SUFFIX_LEN..]).ok_or_else(unknown)
}

/// Compiles every input of `config` in order and links them if asked to.
///
/// Diagnostics meant for the user go to `out`: the info log of the first
/// shader that fails to compile, the message of a file that cannot be read,
/// the link log if it is not empty, and any requested dumps. The build stops
/// at the first file that cannot be read or compiled; later files are never
/// loaded.
///
/// All paths are checked before the first file is opened.
pub fn build(
    config: &BuildConfig,
    toolchain: &dyn Toolchain,
    loader: &dyn SourceLoader,
    out: &mut dyn Write,
) -> Result<Program, BuildError> {
    if config.inputs.is_empty() {
        return Err(UsageError::NoInputs.into());
    }
    let kinds = config
        .inputs
        .iter()
        .map(|path| shader_kind(path))
        .collect::<Result<Vec<_>, _>>()?;

    let ctx = CapabilityContext::new(config.dialect);
    let options = CompileOptions {
        dumps: config.dumps,
        pass_budget: config.pass_budget,
    };
    log::info!(
        "building {} shader(s) for {}",
        config.inputs.len(),
        ctx.dialect()
    );

    let mut program = Program::new();
    for (path, kind) in config.inputs.iter().zip(kinds) {
        let source = match loader.load(path) {
            Ok(source) => source,
            Err(err) => {
                writeln!(out, "{err}")?;
                return Err(err.into());
            }
        };

        let mut unit = ShaderUnit::new(source, kind);
        let compiled = unit
            .compile(&ctx, toolchain, &options, out)
            .map_err(|err| match err {
                CompileError::Structural(source) => BuildError::Structural {
                    path: path.clone(),
                    source,
                },
                other => other.into(),
            })?;
        if !compiled {
            writeln!(out, "Info log for {}:\n{}", path.display(), unit.log())?;
            return Err(BuildError::CompileFailed { path: path.clone() });
        }
        log::info!("compiled {} as a {kind} shader", path.display());
        program.add(unit);
    }

    if config.link {
        let linked = program.link(&ctx, toolchain).map_err(|err| match err {
            LinkError::Structural(source) => BuildError::Structural {
                path: "<linked program>".into(),
                source,
            },
            other => other.into(),
        })?;
        if !program.log().is_empty() {
            writeln!(out, "Info log for linking:\n{}", program.log())?;
        }
        if !linked {
            return Err(BuildError::LinkFailed);
        }
        log::info!("linked {} shader(s)", program.units().len());
    }
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_from_suffix() {
        let kind = |p: &str| shader_kind(Path::new(p));
        assert_eq!(kind("a.vert").ok(), Some(ShaderKind::Vertex));
        assert_eq!(kind("dir/b.geom").ok(), Some(ShaderKind::Geometry));
        assert_eq!(kind("c.frag").ok(), Some(ShaderKind::Fragment));
        assert_eq!(kind("shaders/phong.frag").ok(), Some(ShaderKind::Fragment));
    }

    #[test]
    fn rejected_paths() {
        for path in [".vert", "vert", "x.txt", "a.VERT", "a.fragment", "a.vert.bak", ""] {
            let err = shader_kind(Path::new(path)).expect_err(path);
            assert!(matches!(err, UsageError::UnknownExtension { .. }), "{path}");
        }
    }

    #[test]
    fn suffix_only_checks_last_five_characters() {
        assert_eq!(
            shader_kind(Path::new("archive.tar.frag")).ok(),
            Some(ShaderKind::Fragment)
        );
        assert!(shader_kind(Path::new("é.vert")).is_ok());
    }
}
