//! Static checks over raw script text.
//!
//! Works on the lines themselves rather than on the parsed `Script`, so it
//! can point at exact columns and keep going past anything broken.  Two
//! passes: the first collects PAGE and FLAG declarations, the second checks
//! each line's shape and references against them.  Validation never fails;
//! every problem becomes a `Diagnostic`.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::lexer::{MessageLayout, Segment, message_layout, split_args, strip_comment};
use super::rules::{
    ArgType, Arity, CLAUSE_WORD, CONDITION_CLAUSE, CONDITION_CONCAT, EFFECT_CLAUSE, EFFECT_CONCAT,
    EXEC_REF, FLAG_REF, Keyword, META_REF, NEGATE, PAGE_REF, SPECIAL_REF, Special, TIME_REF,
};
use crate::model::{Diagnostic, ExecArgType, ExecCatalog, Severity};

static DECLARED_PAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^@(\w+)").unwrap());

static DECLARED_FLAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\$(\w+)").unwrap());

static EXEC_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#([A-Z0-9_]+)").unwrap());

/// Validate `text` against `catalog` in one go.
pub fn validate(text: &str, catalog: &ExecCatalog) -> Vec<Diagnostic> {
    Validator::new(catalog).validate(text)
}

/// Holds the engine-command catalog so repeated runs (one per edit) do not
/// have to pass it around. An empty catalog turns the unknown-command check
/// off.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'c> {
    catalog: &'c ExecCatalog,
}

impl<'c> Validator<'c> {
    pub fn new(catalog: &'c ExecCatalog) -> Self {
        Self { catalog }
    }

    pub fn validate(&self, text: &str) -> Vec<Diagnostic> {
        let lines: Vec<Line> = text
            .split('\n')
            .enumerate()
            .map(|(i, raw)| Line::new(i + 1, raw))
            .collect();
        let mut sink = Sink::default();

        check_header(&lines, &mut sink);
        let declared = collect_declarations(&lines, &mut sink);

        let mut choice: Option<ChoiceState> = None;
        for (idx, line) in lines.iter().enumerate() {
            self.check_line(&lines[..idx], line, &declared, &mut choice, &mut sink);
        }

        debug!(
            lines = lines.len(),
            pages = declared.pages.len(),
            flags = declared.flags.len(),
            diagnostics = sink.diagnostics.len(),
            "validated script"
        );
        sink.diagnostics
    }

    fn check_line(
        &self,
        before: &[Line],
        line: &Line,
        declared: &Declarations,
        choice: &mut Option<ChoiceState>,
        sink: &mut Sink,
    ) {
        if let Some(keyword) = line.keyword {
            let args = line.args();
            check_previous(before, line, keyword, sink);
            self.check_args(line, keyword, &args, sink);
            track_choice(line, keyword, &args, choice, sink);
        } else if line.is_code() {
            *choice = None;
        }

        if !line.is_code() {
            return;
        }

        let layout = message_layout(line.raw);
        let code = code_portion(line.raw, layout.as_ref());

        self.check_references(line, &code, declared, sink);
        check_concatenation(line, &code, sink);
        check_placement(line, layout.is_some(), &code, sink);
        check_negation(line, &code, sink);
    }

    fn check_args(&self, line: &Line, keyword: Keyword, args: &[Segment], sink: &mut Sink) {
        let specs = match keyword.rule().args {
            Arity::Fixed(specs) => specs,
            Arity::Catalog => return self.check_exec(line, args, sink),
        };
        let name = keyword.as_str();

        if specs.is_empty() {
            if !args.is_empty() {
                sink.push(
                    line,
                    line.keyword_span(),
                    Severity::Warning,
                    format!("{name} takes no arguments"),
                );
            }
            return;
        }

        for (i, spec) in specs.iter().enumerate() {
            if spec.required && args.get(i).is_none() {
                let message = if keyword == Keyword::Define && i == 0 {
                    "DEFINE requires a script name (\"text\")".to_string()
                } else {
                    format!("{name} requires argument {}", i + 1)
                };
                sink.push(line, line.keyword_span(), Severity::Error, message);
            }
        }

        for (i, arg) in args.iter().enumerate() {
            let spec = match (specs.get(i), specs.last()) {
                (Some(spec), _) => spec,
                (None, Some(last)) if last.repeatable => last,
                _ => {
                    sink.push(
                        line,
                        arg.start..arg.end(),
                        Severity::Error,
                        format!("too many arguments for {name}"),
                    );
                    continue;
                }
            };
            if spec.kind.matches(arg.text) {
                continue;
            }

            let n = i + 1;
            let message = match spec.kind {
                ArgType::Page => format!("argument {n} of {name} must be a @page"),
                ArgType::TextOrSpecial => {
                    format!("argument {n} of {name} must be \"text\" or /SAME, /CANCEL, /TIMEUP")
                }
                ArgType::Time => format!("{name} only accepts time:"),
                _ => format!("argument {n} of {name} is malformed"),
            };
            sink.push(line, arg.start..arg.end(), Severity::Error, message);
        }
    }

    /// `EXEC #NAME args…` against the catalog entry for NAME. Unknown names
    /// are left to `check_references`.
    fn check_exec(&self, line: &Line, args: &[Segment], sink: &mut Sink) {
        let Some(first) = args.first() else {
            return;
        };
        let Some(name) = EXEC_NAME
            .captures(first.text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
        else {
            return;
        };
        let Some(def) = self.catalog.get(name) else {
            return;
        };

        let name_span = first.start..first.start + 1 + name.len();
        let values = &args[1..];

        if values.len() > def.args.len() {
            sink.push(
                line,
                name_span.clone(),
                Severity::Warning,
                format!("{name} takes at most {} argument(s)", def.args.len()),
            );
        }

        for (i, arg_def) in def.args.iter().enumerate() {
            let Some(value) = values.get(i) else {
                if arg_def.required {
                    sink.push(
                        line,
                        name_span.clone(),
                        Severity::Warning,
                        format!("{name} requires argument {}", arg_def.name),
                    );
                }
                continue;
            };

            let span = value.start..value.end();
            let text = value.text;
            if !text.starts_with(['@', '$', '"']) {
                sink.push(
                    line,
                    span.clone(),
                    Severity::Warning,
                    "EXEC arguments must be a @page, $flag or \"text\"",
                );
            }

            match arg_def.kind {
                ExecArgType::Flag if !text.starts_with('$') => sink.push(
                    line,
                    span,
                    Severity::Warning,
                    format!("argument {} must be a $flag", arg_def.name),
                ),
                ExecArgType::Text if !text.starts_with('"') => sink.push(
                    line,
                    span,
                    Severity::Warning,
                    format!("argument {} must be \"text\"", arg_def.name),
                ),
                ExecArgType::Page if !text.starts_with('@') => sink.push(
                    line,
                    span,
                    Severity::Warning,
                    format!("argument {} must be a @page", arg_def.name),
                ),
                ExecArgType::Text if !arg_def.presets.is_empty() => {
                    let unquoted = text
                        .strip_prefix('"')
                        .and_then(|t| t.strip_suffix('"'))
                        .unwrap_or(text);
                    if !arg_def.presets.iter().any(|p| p == unquoted) {
                        sink.push(
                            line,
                            span,
                            Severity::Hint,
                            format!("{text} is not a preset for {} ({name})", arg_def.name),
                        );
                    }
                }
                _ => {}
            }
        }
    }

    fn check_references(&self, line: &Line, code: &str, declared: &Declarations, sink: &mut Sink) {
        if line.keyword == Some(Keyword::Page) {
            for m in META_REF.find_iter(code) {
                sink.push(
                    line,
                    m.range(),
                    Severity::Error,
                    format!("{} cannot be used in a PAGE declaration", m.as_str()),
                );
            }
        } else {
            for caps in PAGE_REF.captures_iter(code) {
                let (Some(whole), Some(caret), Some(name)) = (caps.get(0), caps.get(1), caps.get(2))
                else {
                    continue;
                };
                if !caret.is_empty() || declared.pages.contains(name.as_str()) {
                    continue;
                }
                sink.push(
                    line,
                    whole.range(),
                    Severity::Error,
                    format!("undefined page: {}", name.as_str()),
                );
            }
        }

        if line.keyword != Some(Keyword::Flag) {
            for caps in FLAG_REF.captures_iter(code) {
                let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                if !declared.flags.contains(name.as_str()) {
                    sink.push(
                        line,
                        whole.range(),
                        Severity::Error,
                        format!("undefined flag: {}", name.as_str()),
                    );
                }
            }
        }

        if self.catalog.is_empty() {
            return;
        }
        for caps in EXEC_REF.captures_iter(code) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if !self.catalog.contains(name.as_str()) {
                sink.push(
                    line,
                    whole.range(),
                    Severity::Error,
                    format!("undefined command: {}", name.as_str()),
                );
            }
        }
    }
}

/// One source line with the bits every check needs.
#[derive(Debug)]
struct Line<'a> {
    number: usize,
    raw: &'a str,
    trimmed: &'a str,
    indent: usize,
    keyword: Option<Keyword>,
}

impl<'a> Line<'a> {
    fn new(number: usize, raw: &'a str) -> Self {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        let rest = raw.trim_start();
        let trimmed = rest.trim_end();
        Self {
            number,
            raw,
            trimmed,
            indent: raw.len() - rest.len(),
            keyword: Keyword::leading(trimmed),
        }
    }

    /// Neither blank nor a `//` comment line.
    fn is_code(&self) -> bool {
        !self.trimmed.is_empty() && !self.trimmed.starts_with("//")
    }

    fn keyword_span(&self) -> Range<usize> {
        let len = self.keyword.map_or(0, |k| k.as_str().len());
        self.indent..self.indent + len
    }

    /// Arguments after the keyword with the comment cut off; offsets point
    /// into `raw`.
    fn args(&self) -> Vec<Segment<'a>> {
        let Some(keyword) = self.keyword else {
            return Vec::new();
        };
        let trimmed = self.trimmed;
        let skip = keyword.as_str().len();
        let base = self.indent + skip;

        split_args(strip_comment(&trimmed[skip..]))
            .into_iter()
            .map(|seg| Segment {
                start: seg.start + base,
                text: seg.text,
            })
            .collect()
    }
}

#[derive(Debug, Default)]
struct Sink {
    diagnostics: Vec<Diagnostic>,
}

impl Sink {
    /// Byte span in `line.raw` to columns; spans that do not land on
    /// character boundaries or come out empty are dropped.
    fn push(
        &mut self,
        line: &Line,
        span: Range<usize>,
        severity: Severity,
        message: impl Into<String>,
    ) {
        let (Some(before), Some(upto)) = (line.raw.get(..span.start), line.raw.get(..span.end))
        else {
            return;
        };
        let start = before.chars().count() + 1;
        let end = upto.chars().count() + 1;
        self.push_columns(line.number, start..end, severity, message);
    }

    fn push_columns(
        &mut self,
        line: usize,
        columns: Range<usize>,
        severity: Severity,
        message: impl Into<String>,
    ) {
        if line < 1 || columns.start < 1 || columns.end <= columns.start {
            return;
        }
        self.diagnostics.push(Diagnostic {
            line,
            start_column: columns.start,
            end_column: columns.end,
            message: message.into(),
            severity,
        });
    }
}

#[derive(Debug, Default)]
struct Declarations<'a> {
    pages: HashSet<&'a str>,
    flags: HashSet<&'a str>,
}

#[derive(Debug, Clone, Copy)]
struct ChoiceState {
    timed: bool,
    options: usize,
}

fn check_header(lines: &[Line], sink: &mut Sink) {
    let starts_with_define = lines
        .first()
        .is_some_and(|l| l.trimmed.starts_with(Keyword::Define.as_str()));
    if !starts_with_define {
        sink.push_columns(1, 1..2, Severity::Error, "line 1 must start with DEFINE");
    }

    for line in lines
        .iter()
        .filter(|l| l.keyword == Some(Keyword::Define))
        .skip(1)
    {
        sink.push(
            line,
            line.keyword_span(),
            Severity::Error,
            "DEFINE may only appear once",
        );
    }
}

/// Pass 1: every PAGE and FLAG declaration; repeats are errors.
fn collect_declarations<'a>(lines: &[Line<'a>], sink: &mut Sink) -> Declarations<'a> {
    let mut declared = Declarations::default();

    for line in lines {
        let (pattern, names, what): (&Regex, &mut HashSet<&'a str>, &str) = match line.keyword {
            Some(Keyword::Page) => (&*DECLARED_PAGE, &mut declared.pages, "page"),
            Some(Keyword::Flag) => (&*DECLARED_FLAG, &mut declared.flags, "flag"),
            _ => continue,
        };
        let args = line.args();
        // PAGE declares one name, FLAG any number
        let take = if line.keyword == Some(Keyword::Page) { 1 } else { args.len() };

        for arg in args.iter().take(take) {
            let Some(m) = pattern.captures(arg.text).and_then(|caps| caps.get(1)) else {
                continue;
            };
            if !names.insert(m.as_str()) {
                sink.push(
                    line,
                    arg.start..arg.start + m.end(),
                    Severity::Error,
                    format!("duplicate {what} declaration: {}", m.as_str()),
                );
            }
        }
    }
    declared
}

fn check_previous(before: &[Line], line: &Line, keyword: Keyword, sink: &mut Sink) {
    let required = keyword.rule().requires_previous;
    if required.is_empty() {
        return;
    }
    let Some(prev) = before.iter().rev().find(|l| l.is_code()) else {
        return;
    };
    if required.iter().any(|k| k.starts(prev.trimmed)) {
        return;
    }

    let names: Vec<_> = required.iter().map(|k| k.as_str()).collect();
    sink.push(
        line,
        line.keyword_span(),
        Severity::Error,
        format!("{} must follow {}", keyword.as_str(), names.join(" or ")),
    );
}

/// Follow the open CHOICE so `/SAME` and `/TIMEUP` can be judged.
fn track_choice(
    line: &Line,
    keyword: Keyword,
    args: &[Segment],
    choice: &mut Option<ChoiceState>,
    sink: &mut Sink,
) {
    match keyword {
        Keyword::Choice => {
            *choice = Some(ChoiceState {
                timed: args.iter().any(|a| ArgType::Time.matches(a.text)),
                options: 0,
            });
        }
        Keyword::Is => {
            let state = choice.get_or_insert(ChoiceState {
                timed: false,
                options: 0,
            });
            if let Some(label) = args.first() {
                match Special::from_marker(label.text) {
                    Some(Special::Same) if state.options == 0 => sink.push(
                        line,
                        label.start..label.end(),
                        Severity::Info,
                        "/SAME has no preceding option to repeat",
                    ),
                    Some(Special::Timeup) if !state.timed => sink.push(
                        line,
                        label.start..label.end(),
                        Severity::Warning,
                        "/TIMEUP requires a CHOICE with a time: limit",
                    ),
                    _ => {}
                }
            }
            state.options += 1;
        }
        _ => *choice = None,
    }
}

/// The part of a line that may hold references: up to the marker on text
/// lines, otherwise everything before the comment with quoted text blanked.
/// Byte offsets are the same as in `raw`.
fn code_portion(raw: &str, layout: Option<&MessageLayout>) -> String {
    if let Some(layout) = layout {
        return raw[..layout.marker + 1].to_string();
    }

    let code = strip_comment(raw);
    let mut out = String::with_capacity(code.len());
    let mut in_quotes = false;
    for c in code.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
            out.push(c);
        } else if in_quotes {
            out.extend(std::iter::repeat_n(' ', c.len_utf8()));
        } else {
            out.push(c);
        }
    }
    out
}

fn check_concatenation(line: &Line, code: &str, sink: &mut Sink) {
    let checks: [(&Regex, &str); 2] = [
        (
            &*CONDITION_CONCAT,
            "conditions cannot be joined with a comma; separate them with spaces or list several flags in one condition",
        ),
        (
            &*EFFECT_CONCAT,
            "effects cannot be joined with a comma; separate them with spaces or list several flags in one effect",
        ),
    ];

    for (pattern, message) in checks {
        if let Some(m) = pattern.captures(code).and_then(|caps| caps.get(1)) {
            sink.push(line, m.range(), Severity::Error, message);
        }
    }
}

fn check_placement(line: &Line, is_text: bool, code: &str, sink: &mut Sink) {
    if line.keyword != Some(Keyword::Choice) {
        for m in TIME_REF.find_iter(code) {
            sink.push(
                line,
                m.range(),
                Severity::Warning,
                "time: is only valid on CHOICE lines",
            );
        }
    }

    if line.keyword != Some(Keyword::Is) {
        for m in SPECIAL_REF.find_iter(code) {
            sink.push(
                line,
                m.range(),
                Severity::Warning,
                format!("{} is only valid on IS lines", m.as_str()),
            );
        }
    }

    let transition = matches!(line.keyword, Some(Keyword::Is | Keyword::To));
    if !transition && !is_text {
        for m in CONDITION_CLAUSE.captures_iter(code).filter_map(|caps| caps.get(1)) {
            sink.push(
                line,
                m.range(),
                Severity::Warning,
                "conditions are only valid on IS/TO/text lines",
            );
        }
    }
    if !transition {
        for m in EFFECT_CLAUSE.captures_iter(code).filter_map(|caps| caps.get(1)) {
            sink.push(
                line,
                m.range(),
                Severity::Warning,
                "effects are only valid on IS/TO lines",
            );
        }
    }
}

/// `mode:not` has to be followed by the clause it negates.
fn check_negation(line: &Line, code: &str, sink: &mut Sink) {
    let words = split_args(code);
    for (i, word) in words.iter().enumerate() {
        let Some(rest) = word.text.strip_prefix(NEGATE) else {
            continue;
        };
        // `mode:not>` on a text line negates nothing either
        if !(rest.is_empty() || rest == ">" || rest == "-") {
            continue;
        }
        let followed = rest.is_empty()
            && words.get(i + 1).is_some_and(|next| {
                CLAUSE_WORD.is_match(next.text) && !next.text.starts_with(NEGATE)
            });
        if !followed {
            sink.push(
                line,
                word.start..word.start + NEGATE.len(),
                Severity::Warning,
                "mode:not must be followed by a condition or effect",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExecArg, ExecCommand};

    fn run(src: &str) -> Vec<Diagnostic> {
        validate(src, &ExecCatalog::default())
    }

    /// (line, start, end, severity) – messages are checked separately.
    fn spans(diagnostics: &[Diagnostic]) -> Vec<(usize, usize, usize, Severity)> {
        diagnostics
            .iter()
            .map(|d| (d.line, d.start_column, d.end_column, d.severity))
            .collect()
    }

    fn catalog() -> ExecCatalog {
        ExecCatalog::new(vec![
            ExecCommand {
                name: "SET_BG".into(),
                args: vec![ExecArg {
                    name: "image".into(),
                    kind: ExecArgType::Text,
                    required: true,
                    presets: vec!["cave".into(), "forest".into()],
                }],
            },
            ExecCommand {
                name: "TOGGLE".into(),
                args: vec![
                    ExecArg {
                        name: "flag".into(),
                        kind: ExecArgType::Flag,
                        required: true,
                        presets: vec![],
                    },
                    ExecArg {
                        name: "target".into(),
                        kind: ExecArgType::Page,
                        required: false,
                        presets: vec![],
                    },
                ],
            },
        ])
    }

    const HEAD: &str = "DEFINE \"t\"\nFLAG $key $torch\nPAGE @a\n";

    #[test]
    fn test_clean_script() {
        let src = format!(
            "{HEAD}> Hello // greeting\n\
             true:$key> You hold a key.\n\
             CHOICE time:short // hurry\n\
             \x20 IS \"Open\" @b true:$key to-false:$key\n\
             \x20 // thinking it over\n\
             \x20 IS /SAME @^HERE false:$key\n\
             \x20 IS /TIMEUP @^BACK\n\
             EXEC #SET_BG \"cave\"\n\
             TO @b mode:not true-or:$key,$torch\n\
             PAGE @b\n\
             RETURN"
        );
        let diagnostics = validate(&src, &catalog());
        assert_eq!(diagnostics, vec![]);
    }

    #[test]
    fn test_header_rules() {
        let test_cases = vec![
            ("PAGE @a\nRETURN", vec![(1, 1, 2, Severity::Error)]),
            ("", vec![(1, 1, 2, Severity::Error)]),
            (
                "DEFINE \"t\"\n  DEFINE \"u\"",
                vec![(2, 3, 9, Severity::Error)],
            ),
            ("DEFINE", vec![(1, 1, 7, Severity::Error)]),
            ("DEFINE t", vec![(1, 8, 9, Severity::Error)]),
        ];

        for (src, expected) in test_cases {
            assert_eq!(spans(&run(src)), expected, "src: {src:?}");
        }
        assert_eq!(
            run("DEFINE")[0].message,
            "DEFINE requires a script name (\"text\")"
        );
    }

    #[test]
    fn test_duplicate_declarations() {
        let src = "DEFINE \"t\"\nFLAG $x $y $x\nFLAG $y\nPAGE @a\nRETURN\nPAGE @a\nRETURN\nPAGE @a";
        let diagnostics = run(src);
        let got: Vec<_> = diagnostics
            .iter()
            .map(|d| (d.line, d.start_column, d.end_column, d.message.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                (2, 12, 14, "duplicate flag declaration: x"),
                (3, 6, 8, "duplicate flag declaration: y"),
                (6, 6, 8, "duplicate page declaration: a"),
                (8, 6, 8, "duplicate page declaration: a"),
            ]
        );
    }

    #[test]
    fn test_undefined_references() {
        let src = format!("{HEAD}TO @nowhere true:$ghost\nIS \"x\" @a\n> text about @nowhere and $ghost");
        let diagnostics = run(&src);
        let got: Vec<_> = diagnostics
            .iter()
            .map(|d| (d.line, d.start_column, d.end_column, d.message.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                (4, 4, 12, "undefined page: nowhere"),
                (4, 18, 24, "undefined flag: ghost"),
                (5, 1, 3, "IS must follow CHOICE or IS"),
            ]
        );
    }

    #[test]
    fn test_quoted_text_and_comments_are_not_references() {
        let src = format!("{HEAD}CHOICE\nIS \"pay $5 at @shop\" @a // or @elsewhere\nRETURN");
        assert_eq!(run(&src), vec![]);
    }

    #[test]
    fn test_meta_target_on_page_line() {
        let src = "DEFINE \"t\"\nPAGE @^HERE";
        let diagnostics = run(src);
        assert_eq!(spans(&diagnostics), vec![(2, 6, 12, Severity::Error)]);
        assert_eq!(
            diagnostics[0].message,
            "@^HERE cannot be used in a PAGE declaration"
        );
    }

    #[test]
    fn test_argument_shapes() {
        let test_cases = vec![
            ("RETURN now", vec![(4, 1, 7, Severity::Warning)]),
            ("TO", vec![(4, 1, 3, Severity::Error)]),
            ("TO a", vec![(4, 4, 5, Severity::Error)]),
            ("PAGE @b @c", vec![(4, 9, 11, Severity::Error)]),
            ("CHOICE time:forever", vec![(4, 8, 20, Severity::Error)]),
            ("CHOICE\nIS @a", vec![(5, 1, 3, Severity::Error), (5, 4, 6, Severity::Error)]),
            ("TO @a maybe:$key", vec![(4, 7, 17, Severity::Error)]),
        ];

        for (body, expected) in test_cases {
            let src = format!("{HEAD}{body}");
            assert_eq!(spans(&run(&src)), expected, "body: {body:?}");
        }
    }

    #[test]
    fn test_exec_against_catalog() {
        let test_cases = vec![
            ("EXEC #SET_BG \"cave\"", vec![]),
            ("EXEC #SET_BG", vec![(4, 6, 13, Severity::Warning)]),
            (
                "EXEC #SET_BG \"cave\" \"extra\"",
                vec![(4, 6, 13, Severity::Warning)],
            ),
            (
                "EXEC #SET_BG cave",
                vec![(4, 14, 18, Severity::Warning), (4, 14, 18, Severity::Warning)],
            ),
            ("EXEC #SET_BG \"moon\"", vec![(4, 14, 20, Severity::Hint)]),
            ("EXEC #TOGGLE \"key\"", vec![(4, 14, 19, Severity::Warning)]),
            (
                "EXEC #TOGGLE $key torch",
                vec![(4, 19, 24, Severity::Warning), (4, 19, 24, Severity::Warning)],
            ),
            ("EXEC #NOPE", vec![(4, 6, 11, Severity::Error)]),
        ];

        for (body, expected) in test_cases {
            let src = format!("{HEAD}{body}");
            assert_eq!(
                spans(&validate(&src, &catalog())),
                expected,
                "body: {body:?}"
            );
        }
    }

    #[test]
    fn test_exec_without_catalog() {
        let src = format!("{HEAD}EXEC #UNKNOWN_CMD \"x\"");
        assert_eq!(run(&src), vec![]);
    }

    #[test]
    fn test_clause_concatenation() {
        let src = format!("{HEAD}CHOICE\nIS \"x\" @a true:$key,true:$torch\nTO @a to-true:$key,to-false:$torch");
        let diagnostics = run(&src);
        assert_eq!(
            spans(&diagnostics),
            vec![(5, 11, 26, Severity::Error), (6, 7, 29, Severity::Error)]
        );
        assert!(diagnostics[0].message.starts_with("conditions cannot be joined"));
        assert!(diagnostics[1].message.starts_with("effects cannot be joined"));
    }

    #[test]
    fn test_mixed_clause_concatenation() {
        let test_cases = vec![
            (
                "CHOICE\nIS \"x\" @a to-true:$key,true:$torch",
                (5, 11, 29),
                "effects cannot be joined",
            ),
            (
                "TO @a true:$key,to-false:$torch",
                (4, 7, 26),
                "conditions cannot be joined",
            ),
        ];

        for (body, (line, start, end), message) in test_cases {
            let src = format!("{HEAD}{body}");
            let diagnostics = run(&src);
            assert_eq!(diagnostics.len(), 1, "body: {body:?}: {diagnostics:?}");
            let d = &diagnostics[0];
            assert_eq!((d.line, d.start_column, d.end_column), (line, start, end));
            assert_eq!(d.severity, Severity::Error);
            assert!(d.message.starts_with(message), "got {:?}", d.message);
        }
    }

    #[test]
    fn test_uncomputable_spans_are_dropped() {
        let line = Line::new(3, "TO @caf\u{e9}");
        let mut sink = Sink::default();

        // empty, reversed, past the end, inside the two-byte `é`
        sink.push(&line, 3..3, Severity::Error, "empty");
        sink.push(&line, 5..3, Severity::Error, "reversed");
        sink.push(&line, 3..40, Severity::Error, "past the end");
        sink.push(&line, 3..8, Severity::Error, "split char");
        sink.push_columns(0, 1..2, Severity::Error, "line zero");
        sink.push_columns(3, 0..2, Severity::Error, "column zero");
        assert_eq!(sink.diagnostics, vec![]);

        sink.push(&line, 3..9, Severity::Error, "whole reference");
        assert_eq!(spans(&sink.diagnostics), vec![(3, 4, 9, Severity::Error)]);
    }

    #[test]
    fn test_context_placement() {
        let test_cases = vec![
            ("TO @a time:short", "time: is only valid on CHOICE lines", 7),
            ("TO /CANCEL", "/CANCEL is only valid on IS lines", 4),
            ("EXEC #X true:$key", "conditions are only valid on IS/TO/text lines", 9),
            ("to-true:$key> hello", "effects are only valid on IS/TO lines", 1),
            ("TO @a mode:not", "mode:not must be followed by a condition or effect", 7),
        ];

        for (body, message, column) in test_cases {
            let src = format!("{HEAD}{body}");
            let diagnostics = run(&src);
            let found = diagnostics
                .iter()
                .find(|d| d.message == message)
                .unwrap_or_else(|| panic!("no {message:?} for {body:?}: {diagnostics:?}"));
            assert_eq!((found.line, found.start_column), (4, column), "body: {body:?}");
            assert_eq!(found.severity, Severity::Warning);
        }
    }

    #[test]
    fn test_special_markers_in_choice() {
        let src = format!("{HEAD}CHOICE\nIS /SAME @a\nIS /TIMEUP @a\nCHOICE time:long\nIS \"x\" @a\nIS /SAME @a\nIS /TIMEUP @a");
        let diagnostics = run(&src);
        assert_eq!(
            spans(&diagnostics),
            vec![(5, 4, 9, Severity::Info), (6, 4, 11, Severity::Warning)]
        );
    }

    #[test]
    fn test_columns_count_characters() {
        let src = format!("{HEAD}> 鍵を拾う\nTO @a true:$鍵");
        let diagnostics = run(&src);
        assert_eq!(spans(&diagnostics), vec![(5, 12, 14, Severity::Error)]);
        assert_eq!(diagnostics[0].message, "undefined flag: 鍵");
    }

    #[test]
    fn test_deterministic() {
        let src = format!("{HEAD}TO @x\nIS /SAME @y true:$a,true:$b\nEXEC #Z");
        assert_eq!(validate(&src, &catalog()), validate(&src, &catalog()));
    }
}
