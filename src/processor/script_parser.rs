//! Parser that groups tokenized lines into a `Script` of pages.

use indexmap::IndexMap;
use tracing::debug;

use super::lexer::{Lexer, Token, split_args, strip_comment};
use super::rules::{ClauseKind, Keyword, MetaTarget, Special};
use crate::error::StructuralError;
use crate::model::{
    ChoiceOption, Command, Condition, Destination, Effect, Page, PageEndMode, Script, TimeOption,
    Transition,
};

/// Parse a whole script.
///
/// Only a missing `DEFINE` header is fatal; anything else that does not fit
/// ends up as `Command::ParseError` so the rest of the page survives.
pub fn parse_script(src: &str) -> Result<Script, StructuralError> {
    let mut lexer = Lexer::new();
    let lines: Vec<TokenLine> = src
        .split('\n')
        .enumerate()
        .filter_map(|(i, raw)| {
            let body = strip_comment(raw.trim()).trim_end();
            if body.is_empty() {
                return None;
            }
            Some(TokenLine {
                number: i + 1,
                source: body.to_string(),
                tokens: lexer.tokenize(body),
            })
        })
        .collect();

    let header = lines
        .iter()
        .find(|l| l.starts_with(Keyword::Define))
        .ok_or(StructuralError::MissingHeader)?;
    let name = header
        .tokens
        .iter()
        .find_map(|t| match t {
            Token::Text(text) => Some(text.clone()),
            _ => None,
        })
        .unwrap_or_default();

    let mut pages = IndexMap::<String, Page>::new();
    let mut current: Option<PageBuilder> = None;

    for line in &lines {
        let opens_page = line.starts_with(Keyword::Page);
        if opens_page || line.starts_with(Keyword::Define) {
            if let Some(done) = current.take() {
                let (name, page) = done.finish();
                pages.insert(name, page);
            }
            if opens_page {
                current = PageBuilder::open(line);
            }
            continue;
        }
        // header region: FLAG declarations and friends
        if let Some(page) = current.as_mut() {
            page.push_line(line);
        }
    }
    if let Some(done) = current.take() {
        let (name, page) = done.finish();
        pages.insert(name, page);
    }

    let registry = lexer.into_registry();
    debug!(
        pages = pages.len(),
        flags = registry.flags.len(),
        "parsed script {name:?}"
    );

    Ok(Script {
        name,
        page_names: registry.pages,
        flag_names: registry.flags,
        pages,
    })
}

#[derive(Debug)]
struct TokenLine {
    number: usize,
    source: String,
    tokens: Vec<Token>,
}

impl TokenLine {
    fn starts_with(&self, keyword: Keyword) -> bool {
        self.tokens.first() == Some(&Token::Keyword(keyword))
    }

    fn parse_error(&self) -> Command {
        Command::ParseError {
            line: self.number,
            source: self.source.clone(),
        }
    }
}

struct PendingChoice<'a> {
    time: Option<TimeOption>,
    options: Vec<&'a TokenLine>,
}

struct PageBuilder<'a> {
    name: String,
    commands: Vec<Command>,
    pending: Option<PendingChoice<'a>>,
}

impl<'a> PageBuilder<'a> {
    fn open(line: &TokenLine) -> Option<Self> {
        match line.tokens.get(1) {
            Some(Token::Page(name)) => Some(Self {
                name: name.clone(),
                commands: Vec::new(),
                pending: None,
            }),
            _ => {
                debug!(line = line.number, "PAGE without a usable name, skipping its body");
                None
            }
        }
    }

    fn push_line(&mut self, line: &'a TokenLine) {
        if line.starts_with(Keyword::Choice) {
            self.flush();
            let time = line.tokens.iter().find_map(|t| match t {
                Token::Time(time) => Some(*time),
                _ => None,
            });
            self.pending = Some(PendingChoice {
                time,
                options: Vec::new(),
            });
            return;
        }
        if line.starts_with(Keyword::Is) {
            // an IS without CHOICE still forms an (untimed) menu
            self.pending
                .get_or_insert_with(|| PendingChoice {
                    time: None,
                    options: Vec::new(),
                })
                .options
                .push(line);
            return;
        }

        self.flush();
        let cmd = parse_cmd(line);
        self.commands.push(cmd);
    }

    /// Emit the open CHOICE, if any, as one command.
    fn flush(&mut self) {
        let Some(choice) = self.pending.take() else {
            return;
        };

        let mut options = Vec::with_capacity(choice.options.len());
        let mut broken = Vec::new();
        // what /SAME repeats; `None` after /CANCEL or /TIMEUP
        let mut previous: Option<String> = Some(String::new());

        for line in choice.options {
            let label = line.tokens.iter().find_map(|t| match t {
                Token::Text(text) => Some(Label::Text(text)),
                Token::Special(special) => Some(Label::Special(*special)),
                _ => None,
            });
            let text = match label {
                Some(Label::Text(text)) => Some(text.to_string()),
                Some(Label::Special(Special::Same)) => previous.clone(),
                Some(Label::Special(Special::Cancel | Special::Timeup)) | None => None,
            };
            previous = text.clone();

            let Some(transition) = parse_transition(&line.tokens) else {
                debug!(line = line.number, "option without destination");
                broken.push(line.parse_error());
                continue;
            };
            options.push(ChoiceOption {
                text,
                is_cancel: label == Some(Label::Special(Special::Cancel)),
                is_timeout: label == Some(Label::Special(Special::Timeup)),
                transition,
            });
        }

        self.commands.push(Command::Choice {
            time: choice.time,
            options,
        });
        self.commands.extend(broken);
    }

    fn finish(mut self) -> (String, Page) {
        self.flush();
        (
            self.name,
            Page {
                commands: self.commands,
            },
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label<'a> {
    Text(&'a str),
    Special(Special),
}

fn parse_cmd(line: &TokenLine) -> Command {
    let cmd = match line.tokens.first() {
        Some(Token::Keyword(Keyword::To)) => parse_transition(&line.tokens).map(Command::Goto),
        Some(Token::Keyword(Keyword::Exec)) => match line.tokens.get(1) {
            Some(Token::Exec(name)) if !name.is_empty() => Some(Command::Exec {
                name: name.clone(),
                args: split_args(&line.source)
                    .into_iter()
                    .skip(2)
                    .map(|seg| seg.text.to_string())
                    .collect(),
            }),
            _ => None,
        },
        Some(Token::Keyword(Keyword::Return)) => Some(Command::PageEnd {
            mode: PageEndMode::Return,
        }),
        Some(Token::Keyword(Keyword::Back)) => Some(Command::PageEnd {
            mode: PageEndMode::Back,
        }),
        Some(Token::Message {
            kind,
            clauses,
            text,
        }) => Some(Command::TextLine {
            kind: *kind,
            conditions: parse_clauses(clauses).0,
            text: text.clone(),
        }),
        _ => None,
    };

    cmd.unwrap_or_else(|| {
        debug!(line = line.number, "unparsable line {:?}", line.source);
        line.parse_error()
    })
}

/// Shared by `TO` and `IS`: destination plus conditions and effects.
fn parse_transition(tokens: &[Token]) -> Option<Transition> {
    let destination = tokens.iter().find_map(|t| match t {
        Token::Page(page) => Some(Destination::Page(page.clone())),
        Token::Meta(MetaTarget::Here) => Some(Destination::StayHere),
        Token::Meta(MetaTarget::Back) => Some(Destination::GoBack),
        _ => None,
    })?;
    let (conditions, effects) = parse_clauses(tokens);

    Some(Transition {
        destination,
        conditions,
        effects,
    })
}

/// Split clause tokens into conditions and effects, keeping source order.
/// `mode:not` inverts only the clause right after it.
fn parse_clauses(tokens: &[Token]) -> (Vec<Condition>, Vec<Effect>) {
    let mut conditions = Vec::new();
    let mut effects = Vec::new();
    let mut negate = false;

    for token in tokens {
        match token {
            Token::Negate => negate = true,
            Token::Clause(clause) => {
                let kind = if negate {
                    clause.kind.negate()
                } else {
                    clause.kind
                };
                negate = false;
                match kind {
                    ClauseKind::Condition(polarity) => conditions.push(Condition {
                        polarity,
                        flags: clause.flags.clone(),
                    }),
                    ClauseKind::Effect(polarity) => effects.push(Effect {
                        polarity,
                        flags: clause.flags.clone(),
                    }),
                }
            }
            _ => {}
        }
    }

    (conditions, effects)
}
