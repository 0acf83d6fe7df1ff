//! `semantic_pipeline <input.rs>` - run the Riv semantic pipeline over one
//! source file.
//!
//! Exit codes: 0 on success, 1 on a fatal compile error, 2 on I/O or usage
//! problems.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rivc_drv::{run_semantic, CompileOutcome, Options};

/// Semantic front-end of the Riv compiler.
#[derive(Parser, Debug)]
#[command(name = "semantic_pipeline")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Validate a Riv source file and produce its typed HIR")]
struct Cli {
    /// Source file to compile.
    input: PathBuf,

    /// Dump the validated HIR to stdout on success.
    #[arg(long)]
    emit_hir: bool,

    /// Enable verbose pass-level logging (also via RIVC_LOG).
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("RIVC_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let options = Options {
        emit_hir: cli.emit_hir,
    };
    match run_semantic(&cli.input, &options) {
        Ok(CompileOutcome::Success(_)) => ExitCode::SUCCESS,
        Ok(CompileOutcome::Error(rendered)) => {
            eprintln!("{rendered}");
            ExitCode::from(1)
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}
