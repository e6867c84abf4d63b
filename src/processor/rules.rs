//! Grammar table for the gamebook language.
//!
//! Everything the lexer and the validator need to know about keywords,
//! argument shapes and clause names lives here, so neither of them carries
//! its own copy of the language.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{ConditionPolarity, EffectPolarity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Define,
    Page,
    Exec,
    Choice,
    Is,
    To,
    Return,
    Back,
    Flag,
}

impl Keyword {
    pub const ALL: [Keyword; 9] = [
        Keyword::Define,
        Keyword::Page,
        Keyword::Exec,
        Keyword::Choice,
        Keyword::Is,
        Keyword::To,
        Keyword::Return,
        Keyword::Back,
        Keyword::Flag,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Define => "DEFINE",
            Keyword::Page => "PAGE",
            Keyword::Exec => "EXEC",
            Keyword::Choice => "CHOICE",
            Keyword::Is => "IS",
            Keyword::To => "TO",
            Keyword::Return => "RETURN",
            Keyword::Back => "BACK",
            Keyword::Flag => "FLAG",
        }
    }

    pub fn from_word(word: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == word)
    }

    /// `true` when the (trimmed) line is this keyword alone or the keyword
    /// followed by whitespace.
    pub fn starts(self, line: &str) -> bool {
        match line.strip_prefix(self.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with(char::is_whitespace),
            None => false,
        }
    }

    /// The keyword a trimmed line opens with, if any.
    pub fn leading(line: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.starts(line))
    }

    pub fn rule(self) -> Rule {
        match self {
            Keyword::Define => Rule::fixed(DEFINE_ARGS),
            Keyword::Page => Rule::fixed(PAGE_ARGS),
            Keyword::Exec => Rule {
                args: Arity::Catalog,
                requires_previous: &[],
            },
            Keyword::Choice => Rule::fixed(CHOICE_ARGS),
            Keyword::Is => Rule {
                args: Arity::Fixed(IS_ARGS),
                requires_previous: &[Keyword::Choice, Keyword::Is],
            },
            Keyword::To => Rule::fixed(TO_ARGS),
            Keyword::Return | Keyword::Back => Rule::fixed(&[]),
            Keyword::Flag => Rule::fixed(FLAG_ARGS),
        }
    }
}

/// Argument shape and placement constraints of one keyword.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub args: Arity,
    /// The nearest preceding code line must open with one of these.
    pub requires_previous: &'static [Keyword],
}

impl Rule {
    const fn fixed(args: &'static [ArgSpec]) -> Self {
        Self {
            args: Arity::Fixed(args),
            requires_previous: &[],
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Arity {
    Fixed(&'static [ArgSpec]),
    /// `EXEC`: shape comes from the engine-command catalog.
    Catalog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSpec {
    pub kind: ArgType,
    pub required: bool,
    pub repeatable: bool,
}

impl ArgSpec {
    const fn new(kind: ArgType, required: bool, repeatable: bool) -> Self {
        Self {
            kind,
            required,
            repeatable,
        }
    }
}

const DEFINE_ARGS: &[ArgSpec] = &[ArgSpec::new(ArgType::Text, true, false)];
const PAGE_ARGS: &[ArgSpec] = &[ArgSpec::new(ArgType::Page, true, false)];
const CHOICE_ARGS: &[ArgSpec] = &[ArgSpec::new(ArgType::Time, false, false)];
const IS_ARGS: &[ArgSpec] = &[
    ArgSpec::new(ArgType::TextOrSpecial, true, false),
    ArgSpec::new(ArgType::Page, true, false),
    ArgSpec::new(ArgType::ConditionsEffects, false, true),
];
const TO_ARGS: &[ArgSpec] = &[
    ArgSpec::new(ArgType::Page, true, false),
    ArgSpec::new(ArgType::ConditionsEffects, false, true),
];
const FLAG_ARGS: &[ArgSpec] = &[ArgSpec::new(ArgType::Flag, true, true)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    Text,
    Page,
    Flag,
    Time,
    TextOrSpecial,
    ConditionsEffects,
}

impl ArgType {
    pub fn matches(self, arg: &str) -> bool {
        let pattern: &Regex = match self {
            ArgType::Text => &*TEXT_ARG,
            ArgType::Page => &*PAGE_ARG,
            ArgType::Flag => &*FLAG_ARG,
            ArgType::Time => &*TIME_ARG,
            ArgType::TextOrSpecial => &*TEXT_OR_SPECIAL_ARG,
            ArgType::ConditionsEffects => &*CONDITIONS_EFFECTS_ARG,
        };
        pattern.is_match(arg)
    }
}

// ─── Argument patterns ──────────────────────────────────────────────────────

static TEXT_ARG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"^".*"$"#).unwrap());

static PAGE_ARG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@(\w+|\^(HERE|BACK))$").unwrap());

static FLAG_ARG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\$\w+$").unwrap());

static TIME_ARG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^time:(too_short|short|normal|long|too_long)$").unwrap());

static TEXT_OR_SPECIAL_ARG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^("|/SAME|/CANCEL|/TIMEUP)"#).unwrap());

static CONDITIONS_EFFECTS_ARG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(mode:not$|true:|false:|true-or:|false-or:|to-true:|to-false:)").unwrap()
});

// ─── Reference patterns (scanned over a whole line) ─────────────────────────

/// `@name`, or `@^NAME` with the caret captured.
pub static PAGE_REF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@(\^?)(\w+)").unwrap());

pub static FLAG_REF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$(\w+)").unwrap());

pub static EXEC_REF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#([A-Z0-9_]+)").unwrap());

pub static META_REF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@\^(HERE|BACK)").unwrap());

pub static TIME_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"time:(too_short|short|normal|long|too_long)").unwrap());

pub static SPECIAL_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(SAME|CANCEL|TIMEUP)\b").unwrap());

/// Condition clause keyword; group 1 is the keyword itself.
pub static CONDITION_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^\w-])((?:true|false)(?:-or)?:)").unwrap());

pub static EFFECT_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^\w-])(to-(?:true|false):)").unwrap());

/// `true:$a,true:$b` – a condition with another clause glued on by a comma.
pub static CONDITION_CONCAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|[^\w-])((?:true|false|true-or|false-or):[$\w,]+,(?:true|false|true-or|false-or|to-true|to-false):)",
    )
    .unwrap()
});

pub static EFFECT_CONCAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|[^\w-])((?:to-true|to-false):[$\w,]+,(?:true|false|true-or|false-or|to-true|to-false):)",
    )
    .unwrap()
});

/// One clause-shaped word at the start of the input.
pub static CLAUSE_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:mode:not|(?:true|false|true-or|false-or|to-true|to-false):[$\w,]*)").unwrap()
});

// ─── Keyword sets ───────────────────────────────────────────────────────────

/// `/SAME`, `/CANCEL`, `/TIMEUP`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Special {
    Same,
    Cancel,
    Timeup,
}

impl Special {
    pub const ALL: [Special; 3] = [Special::Same, Special::Cancel, Special::Timeup];

    pub fn as_str(self) -> &'static str {
        match self {
            Special::Same => "/SAME",
            Special::Cancel => "/CANCEL",
            Special::Timeup => "/TIMEUP",
        }
    }

    pub fn from_marker(word: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == word)
    }
}

/// `@^HERE` / `@^BACK`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaTarget {
    Here,
    Back,
}

impl MetaTarget {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "HERE" => Some(MetaTarget::Here),
            "BACK" => Some(MetaTarget::Back),
            _ => None,
        }
    }
}

/// Negates the clause that follows it.
pub const NEGATE: &str = "mode:not";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseKind {
    Condition(ConditionPolarity),
    Effect(EffectPolarity),
}

impl ClauseKind {
    pub const ALL: [ClauseKind; 6] = [
        ClauseKind::Condition(ConditionPolarity::AllTrue),
        ClauseKind::Condition(ConditionPolarity::AllFalse),
        ClauseKind::Condition(ConditionPolarity::AnyTrue),
        ClauseKind::Condition(ConditionPolarity::AnyFalse),
        ClauseKind::Effect(EffectPolarity::SetTrue),
        ClauseKind::Effect(EffectPolarity::SetFalse),
    ];

    /// Clause name without the trailing colon.
    pub fn as_str(self) -> &'static str {
        match self {
            ClauseKind::Condition(ConditionPolarity::AllTrue) => "true",
            ClauseKind::Condition(ConditionPolarity::AllFalse) => "false",
            ClauseKind::Condition(ConditionPolarity::AnyTrue) => "true-or",
            ClauseKind::Condition(ConditionPolarity::AnyFalse) => "false-or",
            ClauseKind::Effect(EffectPolarity::SetTrue) => "to-true",
            ClauseKind::Effect(EffectPolarity::SetFalse) => "to-false",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    pub fn negate(self) -> Self {
        match self {
            ClauseKind::Condition(p) => ClauseKind::Condition(p.negate()),
            ClauseKind::Effect(p) => ClauseKind::Effect(p.negate()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_starts() {
        let test_cases = vec![
            ("RETURN", Some(Keyword::Return)),
            ("IS \"a\" @b", Some(Keyword::Is)),
            ("CHOICE\ttime:short", Some(Keyword::Choice)),
            ("ISLAND", None),
            ("TOP @a", None),
            ("> TO @a", None),
        ];

        for (line, expected) in test_cases {
            assert_eq!(Keyword::leading(line), expected, "line: {line}");
        }
    }

    #[test]
    fn test_arg_patterns() {
        let test_cases = vec![
            (ArgType::Page, "@cave", true),
            (ArgType::Page, "@^HERE", true),
            (ArgType::Page, "@^THERE", false),
            (ArgType::Page, "cave", false),
            (ArgType::Flag, "$key", true),
            (ArgType::Flag, "key", false),
            (ArgType::Text, "\"hello world\"", true),
            (ArgType::Text, "hello", false),
            (ArgType::Time, "time:too_long", true),
            (ArgType::Time, "time:forever", false),
            (ArgType::TextOrSpecial, "/CANCEL", true),
            (ArgType::TextOrSpecial, "\"go\"", true),
            (ArgType::TextOrSpecial, "@go", false),
            (ArgType::ConditionsEffects, "true-or:$a,$b", true),
            (ArgType::ConditionsEffects, "mode:not", true),
            (ArgType::ConditionsEffects, "maybe:$a", false),
        ];

        for (kind, arg, expected) in test_cases {
            assert_eq!(kind.matches(arg), expected, "{kind:?} vs {arg}");
        }
    }

    #[test]
    fn test_is_requires_choice() {
        let rule = Keyword::Is.rule();
        assert_eq!(rule.requires_previous, &[Keyword::Choice, Keyword::Is]);
        assert!(Keyword::To.rule().requires_previous.is_empty());
    }

    #[test]
    fn test_clause_names() {
        assert_eq!(
            ClauseKind::from_name("false-or"),
            Some(ClauseKind::Condition(ConditionPolarity::AnyFalse))
        );
        assert_eq!(
            ClauseKind::from_name("to-true").map(ClauseKind::negate),
            Some(ClauseKind::Effect(EffectPolarity::SetFalse))
        );
        assert_eq!(ClauseKind::from_name("maybe"), None);
    }
}
