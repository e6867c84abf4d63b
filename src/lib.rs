pub mod cli;
pub mod error;
pub mod model;
pub mod parser;
pub mod processor;
pub mod writer;

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, Format};
use crate::model::{ExecCatalog, Severity};

pub fn run() -> anyhow::Result<ExitCode> {
    let args = cli::Cli::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Validate {
            file,
            catalog,
            format,
        } => validate(&file, catalog.as_deref(), format),
        Command::Parse { file, json } => parse(&file, json),
    }
}

/// Logs go to stderr so stdout stays clean for reports. `RUST_LOG` wins
/// unless `-v` was given.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn validate(file: &Path, catalog: Option<&Path>, format: Format) -> anyhow::Result<ExitCode> {
    // 1. ── Read ───────────────────────────────────────────────────────
    let text = read_script(file)?;
    let catalog = load_catalog_or_empty(file, catalog);

    // 2. ── Check ──────────────────────────────────────────────────────
    let report = processor::check(&text, &catalog);
    info!(
        errors = report.count(Severity::Error),
        warnings = report.count(Severity::Warning),
        "checked {}",
        file.display()
    );

    // 3. ── Report ─────────────────────────────────────────────────────
    let name = file.display().to_string();
    let mut out = std::io::stdout().lock();
    match format {
        Format::Text => writer::report::write_diagnostics(&mut out, &name, &report.diagnostics)
            .with_context(|| "Writing report")?,
        Format::Json => writer::json::write_diagnostics(&mut out, &name, &report.diagnostics)
            .with_context(|| "Writing JSON report")?,
    }
    out.flush()?;

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn parse(file: &Path, json: bool) -> anyhow::Result<ExitCode> {
    let text = read_script(file)?;
    let script = processor::parse_script(&text)
        .with_context(|| format!("Parsing {}", file.display()))?;
    let broken = processor::broken_lines(&script);

    let mut out = std::io::stdout().lock();
    if json {
        writer::json::write_script(&mut out, &script).with_context(|| "Writing JSON")?;
        for b in &broken {
            warn!(line = b.line, page = b.page, "could not parse: {}", b.source);
        }
    } else {
        writer::report::write_parse_summary(&mut out, &file.display().to_string(), &script, &broken)
            .with_context(|| "Writing summary")?;
    }
    out.flush()?;

    Ok(if broken.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn read_script(file: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("Reading {}", file.display()))
}

/// A catalog that cannot be read only weakens the checks; it never stops them.
fn load_catalog_or_empty(file: &Path, explicit: Option<&Path>) -> ExecCatalog {
    let path = explicit.map_or_else(|| parser::default_catalog_path(file), Path::to_path_buf);
    match parser::load_catalog_file(&path) {
        Ok(catalog) => catalog,
        Err(e) => {
            warn!("{e:#}; EXEC commands will not be checked");
            ExecCatalog::default()
        }
    }
}
