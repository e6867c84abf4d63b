//! The functional core.
//!
//! `rules` is the grammar table, `lexer` turns lines into tokens,
//! `script_parser` builds the page/command tree and `validator` produces
//! diagnostics straight from the raw text.  Nothing in here touches the
//! filesystem.
pub mod lexer;
pub mod rules;
pub mod script_parser;
pub mod validator;

pub use script_parser::parse_script;
pub use validator::{Validator, validate};

use crate::error::StructuralError;
use crate::model::{Command, Diagnostic, ExecCatalog, Script, Severity};

/// Parse result and diagnostics for one script text.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub script: Result<Script, StructuralError>,
    /// Ordered by line, then column.
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// No `Error` diagnostics. Warnings and below do not fail a script.
    pub fn is_success(&self) -> bool {
        self.count(Severity::Error) == 0
    }
}

/// Run both the structural parser and the validator over `text`.
pub fn check(text: &str, catalog: &ExecCatalog) -> Report {
    let mut diagnostics = validate(text, catalog);
    diagnostics.sort_by_key(|d| (d.line, d.start_column));

    Report {
        script: parse_script(text),
        diagnostics,
    }
}

/// A line the structural parser had to give up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokenLine<'a> {
    pub page: &'a str,
    pub line: usize,
    pub source: &'a str,
}

/// Every `ParseError` command in page order.
pub fn broken_lines(script: &Script) -> Vec<BrokenLine<'_>> {
    script
        .pages
        .iter()
        .flat_map(|(page, body)| {
            body.commands.iter().filter_map(move |cmd| match cmd {
                Command::ParseError { line, source } => Some(BrokenLine {
                    page: page.as_str(),
                    line: *line,
                    source: source.as_str(),
                }),
                _ => None,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_reports_both_halves() {
        let src = "DEFINE \"demo\"\nPAGE @start\nTO @missing\nIS \"x\" @start\nRETURN";
        let report = check(src, &ExecCatalog::default());

        assert!(!report.is_success());
        assert_eq!(report.count(Severity::Error), 2);
        assert_eq!(report.diagnostics[0].message, "undefined page: missing");
        assert_eq!(report.diagnostics[1].line, 4);

        let script = report.script.expect("header present");
        assert_eq!(script.name, "demo");
        assert_eq!(broken_lines(&script), vec![]);
    }

    #[test]
    fn test_check_without_header() {
        let report = check("PAGE @a\nRETURN", &ExecCatalog::default());
        assert_eq!(report.script, Err(StructuralError::MissingHeader));
        assert_eq!(report.count(Severity::Error), 1);
    }

    #[test]
    fn test_broken_lines() {
        let src = "DEFINE \"d\"\nPAGE @a\nwhat is this\nPAGE @b\nEXEC\n";
        let script = parse_script(src).expect("header present");
        let test_cases = vec![("a", 3, "what is this"), ("b", 5, "EXEC")];

        let got: Vec<_> = broken_lines(&script)
            .into_iter()
            .map(|b| (b.page, b.line, b.source))
            .collect();
        assert_eq!(got, test_cases);
    }
}
