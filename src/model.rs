// shared data model: parsed scripts, diagnostics and the engine-command catalog

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// One parsed gamebook script.
///
/// Built once by `processor::script_parser::parse_script` and never mutated
/// afterwards. `page_names` / `flag_names` hold every name referenced with a
/// bare `@name` / `$name`, in first-seen order, and feed completion lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Script {
    pub name: String,
    pub page_names: IndexSet<String>,
    pub flag_names: IndexSet<String>,
    pub pages: IndexMap<String, Page>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Page {
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Command {
    /// `> text` / `- text`, optionally guarded by leading conditions.
    TextLine {
        kind: MessageKind,
        conditions: Vec<Condition>,
        text: String,
    },

    /// `CHOICE [time:…]` followed by its `IS` lines.
    Choice {
        time: Option<TimeOption>,
        options: Vec<ChoiceOption>,
    },

    /// `TO @page [conditions] [effects]`
    Goto(Transition),

    /// `EXEC #NAME args…` – delegated to the host engine untouched.
    Exec { name: String, args: Vec<String> },

    /// `RETURN` / `BACK`
    PageEnd { mode: PageEndMode },

    /// A line that could not be turned into a command.
    ParseError { line: usize, source: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    /// `>` starts a new message.
    Open,
    /// `-` continues the running one.
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageEndMode {
    Return,
    Back,
}

/// Where a `TO` or an option leads, plus what it requires and changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub destination: Destination,
    pub conditions: Vec<Condition>,
    pub effects: Vec<Effect>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceOption {
    /// `None` for `/CANCEL` and `/TIMEUP` options.
    pub text: Option<String>,
    pub is_cancel: bool,
    pub is_timeout: bool,
    #[serde(flatten)]
    pub transition: Transition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "page", rename_all = "kebab-case")]
pub enum Destination {
    Page(String),
    /// `@^HERE`
    StayHere,
    /// `@^BACK`
    GoBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOption {
    TooShort,
    Short,
    Normal,
    Long,
    TooLong,
}

impl TimeOption {
    pub const ALL: [TimeOption; 5] = [
        TimeOption::TooShort,
        TimeOption::Short,
        TimeOption::Normal,
        TimeOption::Long,
        TimeOption::TooLong,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeOption::TooShort => "too_short",
            TimeOption::Short => "short",
            TimeOption::Normal => "normal",
            TimeOption::Long => "long",
            TimeOption::TooLong => "too_long",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConditionPolarity {
    /// `true:`
    AllTrue,
    /// `false:`
    AllFalse,
    /// `true-or:`
    AnyTrue,
    /// `false-or:`
    AnyFalse,
}

impl ConditionPolarity {
    /// Logical negation of the whole guard.
    pub fn negate(self) -> Self {
        match self {
            ConditionPolarity::AllTrue => ConditionPolarity::AnyFalse,
            ConditionPolarity::AnyFalse => ConditionPolarity::AllTrue,
            ConditionPolarity::AllFalse => ConditionPolarity::AnyTrue,
            ConditionPolarity::AnyTrue => ConditionPolarity::AllFalse,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EffectPolarity {
    /// `to-true:`
    SetTrue,
    /// `to-false:`
    SetFalse,
}

impl EffectPolarity {
    pub fn negate(self) -> Self {
        match self {
            EffectPolarity::SetTrue => EffectPolarity::SetFalse,
            EffectPolarity::SetFalse => EffectPolarity::SetTrue,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Condition {
    pub polarity: ConditionPolarity,
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Effect {
    pub polarity: EffectPolarity,
    pub flags: Vec<String>,
}

/// Diagnostic severity, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
            Severity::Info => "Info",
            Severity::Hint => "Hint",
        }
    }
}

/// One static-analysis finding. Columns are 1-based, `end_column` exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub line: usize,
    pub start_column: usize,
    pub end_column: usize,
    pub message: String,
    pub severity: Severity,
}

// ─────────────────────────────────────────────────────
// Engine-command catalog (`executes.json`)
// ─────────────────────────────────────────────────────

/// Owned by the host engine; we only read it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ExecCatalog {
    pub commands: Vec<ExecCommand>,
}

impl ExecCatalog {
    pub fn new(commands: Vec<ExecCommand>) -> Self {
        Self { commands }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ExecCommand> {
        self.commands.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExecCommand {
    pub name: String,
    #[serde(default)]
    pub args: Vec<ExecArg>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExecArg {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ExecArgType,
    #[serde(default, alias = "require")]
    pub required: bool,
    #[serde(default)]
    pub presets: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecArgType {
    Text,
    Flag,
    Page,
    #[default]
    #[serde(other)]
    Other,
}
