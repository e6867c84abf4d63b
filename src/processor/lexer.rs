//! Line tokenizer for gamebook scripts.
//!
//! The structural parser feeds this one trimmed, comment-free line at a
//! time and gets typed tokens back.  Nothing here fails: words we do not
//! understand come out as `Token::Other` and it is up to the validator to
//! say what is wrong with them.
//
//  Lexical items (informal):
//
//      Page     ::= '@' NAME                Meta    ::= '@^' ('HERE' | 'BACK')
//      Flag     ::= '$' NAME                Exec    ::= '#' NAME
//      Special  ::= '/SAME' | '/CANCEL' | '/TIMEUP'
//      Text     ::= '"' … '"'               (spaces inside are kept)
//      Clause   ::= CLAUSE ':' FLAG (',' FLAG)*
//      Negate   ::= 'mode:not'
//      Time     ::= 'time:' TIME
//      Message  ::= (Clause | Negate)* ('>' | '-') ' '? REST-OF-LINE

use indexmap::IndexSet;

use super::rules::{CLAUSE_WORD, ClauseKind, Keyword, MetaTarget, NEGATE, Special};
use crate::model::{MessageKind, TimeOption};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Page(String),
    Meta(MetaTarget),
    Flag(String),
    Special(Special),
    Text(String), // quotes stripped
    Exec(String),
    Keyword(Keyword),
    Clause(Clause),
    Negate,
    Time(TimeOption),
    /// A whole `>` / `-` line; leading clauses are folded in here.
    Message {
        kind: MessageKind,
        clauses: Vec<Token>,
        text: String,
    },
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub kind: ClauseKind,
    pub flags: Vec<String>,
}

/// Names seen while tokenizing, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    pub pages: IndexSet<String>,
    pub flags: IndexSet<String>,
}

/// A whitespace-separated piece of a line with its byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub start: usize,
    pub text: &'a str,
}

impl Segment<'_> {
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// Split on whitespace, keeping `"quoted text"` in one piece.
pub fn split_args(src: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut start: Option<usize> = None;
    let mut in_quotes = false;

    for (i, c) in src.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
            start.get_or_insert(i);
        } else if c.is_whitespace() && !in_quotes {
            if let Some(s) = start.take() {
                segments.push(Segment {
                    start: s,
                    text: &src[s..i],
                });
            }
        } else {
            start.get_or_insert(i);
        }
    }
    if let Some(s) = start {
        segments.push(Segment {
            start: s,
            text: &src[s..],
        });
    }
    segments
}

/// Cut a `//` comment, unless it sits inside a quoted literal.
pub fn strip_comment(src: &str) -> &str {
    let mut in_quotes = false;
    let mut chars = src.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            '/' if !in_quotes && matches!(chars.peek(), Some((_, '/'))) => return &src[..i],
            _ => {}
        }
    }
    src
}

/// Where the pieces of a message line sit, as byte offsets into the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLayout<'a> {
    pub kind: MessageKind,
    pub clauses: Vec<Segment<'a>>,
    pub marker: usize,
    pub text_start: usize,
}

/// Recognise `> text`, `- text` and `true:$a false:$b> text`.
///
/// Leading words must all be clause-shaped; the marker may be glued to the
/// last of them or stand on its own.
pub fn message_layout(line: &str) -> Option<MessageLayout<'_>> {
    let mut clauses = Vec::new();
    let mut pos = 0;

    loop {
        let rest = &line[pos..];
        let trimmed = rest.trim_start();
        pos += rest.len() - trimmed.len();

        let kind = match trimmed.chars().next()? {
            '>' => MessageKind::Open,
            '-' => MessageKind::Append,
            _ => {
                let word = CLAUSE_WORD.find(trimmed)?;
                let end = pos + word.end();
                match line[end..].chars().next() {
                    Some(c) if c.is_whitespace() || c == '>' || c == '-' => {}
                    _ => return None,
                }
                clauses.push(Segment {
                    start: pos,
                    text: &line[pos..end],
                });
                pos = end;
                continue;
            }
        };

        let mut text_start = pos + 1;
        if matches!(line[text_start..].chars().next(), Some(' ' | '\t')) {
            text_start += 1;
        }
        return Some(MessageLayout {
            kind,
            clauses,
            marker: pos,
            text_start,
        });
    }
}

#[derive(Debug, Default)]
pub struct Lexer {
    registry: Registry,
}

impl Lexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_registry(self) -> Registry {
        self.registry
    }

    /// Tokenize one trimmed line with its comment already removed.
    pub fn tokenize(&mut self, line: &str) -> Vec<Token> {
        if let Some(layout) = message_layout(line) {
            let clauses = layout
                .clauses
                .iter()
                .map(|seg| self.classify(seg.text))
                .collect();
            return vec![Token::Message {
                kind: layout.kind,
                clauses,
                text: line[layout.text_start..].to_string(),
            }];
        }

        split_args(line)
            .into_iter()
            .map(|seg| self.classify(seg.text))
            .collect()
    }

    fn classify(&mut self, word: &str) -> Token {
        let other = || Token::Other(word.to_string());

        if let Some(rest) = word.strip_prefix('@') {
            if let Some(meta) = rest.strip_prefix('^') {
                return MetaTarget::from_name(meta).map_or_else(other, Token::Meta);
            }
            if rest.is_empty() {
                return other();
            }
            self.registry.pages.insert(rest.to_string());
            return Token::Page(rest.to_string());
        }
        if let Some(rest) = word.strip_prefix('$') {
            if rest.is_empty() {
                return other();
            }
            self.registry.flags.insert(rest.to_string());
            return Token::Flag(rest.to_string());
        }
        if word.starts_with('/') {
            return Special::from_marker(word).map_or_else(other, Token::Special);
        }
        if let Some(rest) = word.strip_prefix('"') {
            return Token::Text(rest.strip_suffix('"').unwrap_or(rest).to_string());
        }
        if let Some(rest) = word.strip_prefix('#') {
            return Token::Exec(rest.to_string());
        }
        if let Some(keyword) = Keyword::from_word(word) {
            return Token::Keyword(keyword);
        }
        if word == NEGATE {
            return Token::Negate;
        }
        if let Some((name, value)) = word.split_once(':') {
            if name == "time" {
                return TimeOption::from_name(value).map_or_else(other, Token::Time);
            }
            if let Some(kind) = ClauseKind::from_name(name) {
                let flags = value
                    .split(',')
                    .filter(|f| !f.is_empty())
                    .map(|f| f.strip_prefix('$').unwrap_or(f).to_string())
                    .collect();
                return Token::Clause(Clause { kind, flags });
            }
        }
        other()
    }
}
