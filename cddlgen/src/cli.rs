//! Command line arguments and the generator run.

use crate::error::CliError;
use crate::logging::Logger;
use cddlgen_codegen::generator::DEFAULT_NAMESPACE;
use cddlgen_codegen::{Generator, build_cpp_types, validate_cpp_types};
use cddlgen_schema::{build_symbol_table, parse_schema};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

/// Command line arguments.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "cddlgen",
    version,
    about = "Generate C++ CBOR encoders and decoders from a CDDL schema"
)]
pub struct Args {
    /// Header file to generate, relative to --gen-dir.
    #[arg(long, value_name = "PATH")]
    pub header: PathBuf,

    /// Source file to generate, relative to --gen-dir.
    #[arg(long, value_name = "PATH")]
    pub cc: PathBuf,

    /// Directory the generated files are written to.
    #[arg(long = "gen-dir", value_name = "DIR")]
    pub gen_dir: PathBuf,

    /// C++ namespace of the generated code.
    #[arg(long, value_name = "NS", default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Turn on verbose logging. Repeat for more detail.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// CDDL schema to compile.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
}

/// Settings for one generator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Schema path.
    pub input: PathBuf,
    /// Header output path.
    pub header_path: PathBuf,
    /// Source output path.
    pub source_path: PathBuf,
    /// Path the source uses to include the header.
    pub header_include: String,
    /// C++ namespace.
    pub namespace: String,
}

impl Config {
    /// Builds a run configuration from parsed arguments.
    ///
    /// # Errors
    /// Returns `CliError::Usage` if both outputs name the same file.
    pub fn from_args(args: &Args) -> Result<Self, CliError> {
        for (flag, path) in [("--header", &args.header), ("--cc", &args.cc)] {
            if path.has_root() {
                return Err(CliError::usage(format!(
                    "{flag} '{}' must be relative to --gen-dir",
                    path.display()
                )));
            }
        }
        let header_path = args.gen_dir.join(&args.header);
        let source_path = args.gen_dir.join(&args.cc);
        if header_path == source_path {
            return Err(CliError::usage(format!(
                "--header and --cc both name '{}'",
                header_path.display()
            )));
        }

        Ok(Self {
            input: args.input.clone(),
            header_path,
            source_path,
            header_include: include_path(&args.header),
            namespace: args.namespace.clone(),
        })
    }
}

/// Include path for a header argument, with `/` separators.
fn include_path(header: &Path) -> String {
    let components: Vec<_> = header
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    components.join("/")
}

/// Runs the whole pipeline and writes both output files.
///
/// Nothing is written unless every stage succeeds.
///
/// # Arguments
/// * `config` - Run configuration
/// * `logger` - Sink for progress messages
///
/// # Errors
/// Returns the `CliError` of the first failing stage.
pub fn run(config: &Config, logger: &dyn Logger) -> Result<(), CliError> {
    let cddl = fs::read_to_string(&config.input).map_err(|source| CliError::Read {
        path: config.input.clone(),
        source,
    })?;
    if cddl.trim().is_empty() {
        return Err(CliError::EmptyInput {
            path: config.input.clone(),
        });
    }

    let tree = parse_schema(&cddl)?;
    logger.log(&format!(
        "parsed {} rules from {}",
        tree.rule_count(),
        config.input.display()
    ));

    let symbols = build_symbol_table(&tree)?;
    let table = build_cpp_types(&symbols)?;
    validate_cpp_types(&table).map_err(CliError::Validation)?;
    logger.log(&format!("resolved {} types", table.len()));

    let code = Generator::new(&table)
        .with_namespace(config.namespace.as_str())
        .with_header_include(config.header_include.as_str())
        .generate()?;

    write_output(&config.header_path, &code.header)?;
    logger.log(&format!("wrote {}", config.header_path.display()));
    write_output(&config.source_path, &code.source)?;
    logger.log(&format!("wrote {}", config.source_path.display()));
    Ok(())
}

fn write_output(path: &Path, contents: &str) -> Result<(), CliError> {
    let to_error = |source: std::io::Error| CliError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(to_error)?;
        }
    }
    fs::write(path, contents).map_err(to_error)
}
