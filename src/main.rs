//! PE Arch Report CLI
//!
//! Command-line tool that classifies PE binaries by architecture and writes a
//! tabular report.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use pe_arch_report::reporter::{self, Parameters, ReportFormat, SearchMode};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Binary architecture reporter.
///
/// Classifies .exe and .dll files as native 32/64-bit or managed .NET
/// assemblies and saves the results as a report.
#[derive(Parser, Debug)]
#[command(name = "pe-arch-report")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Report on a single file, a directory, or a directory recursively
    #[arg(short, long, value_enum)]
    mode: Mode,

    /// Full path of the file or directory to search
    #[arg(short, long)]
    input: PathBuf,

    /// Directory where the report is written (must exist)
    #[arg(short, long, env = "PE_ARCH_REPORT_OUTPUT")]
    output: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Silent mode (no console output)
    #[arg(short, long)]
    silent: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Search mode options.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// A single file
    File,
    /// Files directly inside a directory
    Directory,
    /// All files below a directory
    #[value(name = "directory-all", alias = "directoryAll")]
    DirectoryAll,
}

impl From<Mode> for SearchMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::File => SearchMode::File,
            Mode::Directory => SearchMode::Directory,
            Mode::DirectoryAll => SearchMode::DirectoryRecurse,
        }
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Text table
    Table,
    /// JSON document
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Table => ReportFormat::Table,
            OutputFormat::Json => ReportFormat::Json,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("pe_arch_report=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !args.silent {
                eprintln!("Error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let say = |message: &str| {
        if !args.silent {
            println!("{message}");
        }
    };

    let mut parameters =
        Parameters::new(&args.input, args.mode.into()).with_format(args.format.into());
    if let Some(output) = &args.output {
        parameters = parameters.with_output_dir(output);
    }

    let validation = reporter::validate(&parameters);
    if !validation.success {
        bail!("Failed to parse: {}", validation.message);
    }

    let result = reporter::run_report(&parameters, &say);
    if !result.validation.success {
        bail!("Failed to generate report: {}", result.validation.message);
    }

    let written = reporter::output_results(&result, &parameters);
    if !written.success {
        bail!("Failed to output results report: {}", written.message);
    }

    say(&format!(
        "Successfully output results report at: {}",
        written.message
    ));
    if !result.failures.is_empty() {
        say(&format!(
            "{} file(s) could not be classified",
            result.failures.len()
        ));
    }

    if matches!(args.format, OutputFormat::Table) && !args.silent {
        let rendered = std::fs::read_to_string(&written.message)
            .with_context(|| format!("reading back {}", written.message))?;
        print!("{rendered}");
    }

    Ok(())
}
