use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use crate::model::{Diagnostic, Script, Severity};

#[derive(Serialize)]
struct DiagnosticsDoc<'a> {
    file: &'a str,
    errors: usize,
    warnings: usize,
    diagnostics: &'a [Diagnostic],
}

/// Diagnostics as one pretty-printed JSON document.
pub fn write_diagnostics<W: Write>(
    out: &mut W,
    file: &str,
    diagnostics: &[Diagnostic],
) -> Result<()> {
    let count = |severity: Severity| {
        diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    };
    let doc = DiagnosticsDoc {
        file,
        errors: count(Severity::Error),
        warnings: count(Severity::Warning),
        diagnostics,
    };
    serde_json::to_writer_pretty(&mut *out, &doc)?;
    writeln!(out)?;
    Ok(())
}

/// The parsed script tree.
pub fn write_script<W: Write>(out: &mut W, script: &Script) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, script)?;
    writeln!(out)?;
    Ok(())
}
