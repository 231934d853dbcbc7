//! Rill compiler command-line interface
//!
//! Compiles one source module into one executable container for the Rill
//! virtual machine. With no argument the source is read from standard input
//! and the module is named "stdin".

use anyhow::{Context, Result};
use clap::Parser;
use rill_cli::{compile_to_binary, lower_source, output_name};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

/// The Rill ahead-of-time compiler
#[derive(Parser)]
#[command(name = "rillc")]
#[command(about = "Compile a Rill source module to a VM binary")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Path to the source module; standard input when omitted
    source: Option<PathBuf>,

    /// Where to write the binary (defaults to the input name with .bin)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the IR dump to stdout instead of emitting a binary
    #[arg(long)]
    emit_ir: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress output
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else if cli.quiet {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    // input failures exit 1, before the pipeline starts
    let (source, module_name) = match read_source(cli.source.as_deref()) {
        Ok(input) => input,
        Err(err) => {
            println!("{:#}", err);
            return ExitCode::from(1);
        }
    };

    let output = cli
        .output
        .unwrap_or_else(|| output_name(cli.source.as_deref().unwrap_or(std::path::Path::new("stdin"))));

    let result = if cli.emit_ir {
        lower_source(&source, &module_name).map(|ir| println!("{}", ir))
    } else {
        compile_to_binary(&source, &module_name, &output)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // one diagnostic line, then the error's exit code
            println!("{}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

/// Read the module text: from the given path, or from standard input
fn read_source(path: Option<&std::path::Path>) -> Result<(String, String)> {
    match path {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("Opening input {}", path.display()))?;
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("input").to_string();
            Ok((source, name))
        }
        None => {
            let mut source = String::new();
            std::io::stdin()
                .read_to_string(&mut source)
                .context("Reading from standard input")?;
            Ok((source, "stdin".to_string()))
        }
    }
}
