//! Plain-text reports, one finding per line.

use std::io::{self, Write};

use crate::model::{Diagnostic, Script, Severity};
use crate::processor::BrokenLine;

/// `file:line:col - Severity: message` for each diagnostic, then a count line.
pub fn write_diagnostics<W: Write>(
    out: &mut W,
    file: &str,
    diagnostics: &[Diagnostic],
) -> io::Result<()> {
    for d in diagnostics {
        writeln!(
            out,
            "{file}:{}:{} - {}: {}",
            d.line,
            d.start_column,
            d.severity.as_str(),
            d.message
        )?;
    }

    let count = |severity: Severity| {
        diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    };
    writeln!(
        out,
        "{} error(s), {} warning(s)",
        count(Severity::Error),
        count(Severity::Warning)
    )
}

/// Short summary of a parsed script followed by the lines the parser
/// could not understand.
pub fn write_parse_summary<W: Write>(
    out: &mut W,
    file: &str,
    script: &Script,
    broken: &[BrokenLine],
) -> io::Result<()> {
    writeln!(
        out,
        "{file}: \"{}\" - {} page(s), {} flag(s)",
        script.name,
        script.pages.len(),
        script.flag_names.len()
    )?;
    for b in broken {
        writeln!(out, "{file}:{} - parse error in @{}: {}", b.line, b.page, b.source)?;
    }
    writeln!(out, "{} parse error(s)", broken.len())
}
