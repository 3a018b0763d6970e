use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use miette::{Context, IntoDiagnostic};

use glsc_compiler::{BuildConfig, BuildError, Dumps, FsLoader, GlslToolchain};
use glsc_context::Dialect;

const USAGE: &str = "\
usage: glsc [options] <file.vert | file.geom | file.frag>

Possible options are:
    --glsl-es
    --dump-ast
    --dump-hir
    --dump-lir
    --link
";

/// glsc: stand-alone GLSL compiler
#[derive(Parser)]
#[command(name = "glsc", version, about)]
struct Cli {
    /// Shader sources (.vert, .geom or .frag)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Compile for GLSL ES instead of desktop GLSL
    #[arg(long)]
    glsl_es: bool,

    /// Print the syntax tree of each shader
    #[arg(long)]
    dump_ast: bool,

    /// Print the IR of each shader before optimization
    #[arg(long)]
    dump_hir: bool,

    /// Print the IR of each shader after optimization
    #[arg(long)]
    dump_lir: bool,

    /// Link the compiled shaders into a program
    #[arg(long)]
    link: bool,
}

impl Cli {
    fn config(self) -> BuildConfig {
        BuildConfig {
            dialect: if self.glsl_es {
                Dialect::Embedded
            } else {
                Dialect::Desktop
            },
            dumps: Dumps {
                ast: self.dump_ast,
                hir: self.dump_hir,
                lir: self.dump_lir,
            },
            link: self.link,
            ..BuildConfig::new(self.files)
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(_) => {
            print!("{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> miette::Result<ExitCode> {
    let config = cli.config();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let result = glsc_compiler::build(&config, &GlslToolchain::new(), &FsLoader, &mut out);
    out.flush()
        .into_diagnostic()
        .wrap_err("failed to write to stdout")?;

    match result {
        Ok(_) => Ok(ExitCode::SUCCESS),
        // Already reported on stdout.
        Err(BuildError::Load(_) | BuildError::CompileFailed { .. } | BuildError::LinkFailed) => {
            Ok(ExitCode::FAILURE)
        }
        Err(BuildError::Usage(err)) => {
            eprintln!("glsc: {err}");
            print!("{USAGE}");
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(err).into_diagnostic().wrap_err("shader build aborted"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_to_config() {
        let cli = Cli::try_parse_from([
            "glsc",
            "--glsl-es",
            "--dump-lir",
            "--link",
            "a.vert",
            "b.frag",
        ])
        .expect("valid arguments");
        let config = cli.config();
        assert_eq!(config.dialect, Dialect::Embedded);
        assert_eq!(
            config.dumps,
            Dumps {
                lir: true,
                ..Dumps::default()
            }
        );
        assert!(config.link);
        assert_eq!(
            config.inputs,
            [PathBuf::from("a.vert"), PathBuf::from("b.frag")]
        );
        assert_eq!(config.pass_budget, glsc_compiler::DEFAULT_PASS_BUDGET);
    }

    #[test]
    fn defaults_to_desktop() {
        let config = Cli::try_parse_from(["glsc", "x.frag"])
            .expect("valid arguments")
            .config();
        assert_eq!(config.dialect, Dialect::Desktop);
        assert_eq!(config.dumps, Dumps::default());
        assert!(!config.link);
    }

    #[test]
    fn files_are_required() {
        assert!(Cli::try_parse_from(["glsc", "--link"]).is_err());
        assert!(Cli::try_parse_from(["glsc", "--optimize", "a.vert"]).is_err());
    }

    #[test]
    fn usage_lists_every_flag() {
        for flag in ["--glsl-es", "--dump-ast", "--dump-hir", "--dump-lir", "--link"] {
            assert!(USAGE.contains(flag), "{flag}");
        }
    }
}
