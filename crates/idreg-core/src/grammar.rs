//! `id` command grammar.
//!
//! A command is the verb `id`, the identity name, then any number of
//! options from [`OPTIONS`]. Option names are case-sensitive; the verb is
//! matched case-insensitively because the dispatcher routes on a
//! lower-cased prefix.

use thiserror::Error;

/// Command verb
pub const VERB: &str = "id";

/// Number of values an option consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Flag,
    Value,
}

/// Options accepted after `id <name>`
pub const OPTIONS: &[(&str, Arity)] = &[
    ("enable", Arity::Flag),
    ("disable", Arity::Flag),
    ("destroy", Arity::Flag),
    ("domain", Arity::Value),
    ("admin", Arity::Value),
    ("member", Arity::Value),
    ("remove", Arity::Value),
];

/// One requested change to an existing identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modifier {
    GrantMember(String),
    GrantAdmin(String),
    Remove(String),
    SetDomain(String),
    Enable,
    Disable,
    Destroy,
}

impl Modifier {
    /// Order in which modifiers of one command are applied
    pub fn precedence(&self) -> u8 {
        match self {
            Modifier::GrantMember(_) => 0,
            Modifier::GrantAdmin(_) => 1,
            Modifier::Remove(_) => 2,
            Modifier::SetDomain(_) => 3,
            Modifier::Enable | Modifier::Disable => 4,
            Modifier::Destroy => 5,
        }
    }

    /// Grants and removals, which are checked against the admin invariant
    pub fn is_role_change(&self) -> bool {
        matches!(
            self,
            Modifier::GrantMember(_) | Modifier::GrantAdmin(_) | Modifier::Remove(_)
        )
    }

    fn from_option(option: &str, value: Option<String>) -> Option<Self> {
        let modifier = match (option, value) {
            ("enable", None) => Modifier::Enable,
            ("disable", None) => Modifier::Disable,
            ("destroy", None) => Modifier::Destroy,
            ("domain", Some(v)) => Modifier::SetDomain(v),
            ("admin", Some(v)) => Modifier::GrantAdmin(v),
            ("member", Some(v)) => Modifier::GrantMember(v),
            ("remove", Some(v)) => Modifier::Remove(v),
            _ => return None,
        };
        Some(modifier)
    }
}

impl std::fmt::Display for Modifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Modifier::GrantMember(sender) => write!(f, "member {}", sender),
            Modifier::GrantAdmin(sender) => write!(f, "admin {}", sender),
            Modifier::Remove(sender) => write!(f, "remove {}", sender),
            Modifier::SetDomain(domain) => write!(f, "domain {}", domain),
            Modifier::Enable => write!(f, "enable"),
            Modifier::Disable => write!(f, "disable"),
            Modifier::Destroy => write!(f, "destroy"),
        }
    }
}

/// Parsed `id` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdCommand {
    pub name: String,
    /// Sorted by [`Modifier::precedence`], input order kept within a rank
    pub modifiers: Vec<Modifier>,
}

impl IdCommand {
    /// A bare `id <name>` with nothing to change
    pub fn is_claim(&self) -> bool {
        self.modifiers.is_empty()
    }
}

/// Grammar errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("empty command")]
    Empty,

    #[error("expected `id`, found `{0}`")]
    UnknownVerb(String),

    #[error("`{0}` requires a value")]
    MissingValue(String),

    #[error("unknown option `{0}`")]
    UnknownOption(String),

    #[error("`enable` and `disable` cannot be combined")]
    ConflictingToggles,
}

fn arity_of(option: &str) -> Option<Arity> {
    OPTIONS
        .iter()
        .find(|(name, _)| *name == option)
        .map(|(_, arity)| *arity)
}

/// Parse a raw `id ...` command
pub fn parse_command(input: &str) -> Result<IdCommand, GrammarError> {
    let mut tokens = input.split_whitespace();

    let verb = tokens.next().ok_or(GrammarError::Empty)?;
    if !verb.eq_ignore_ascii_case(VERB) {
        return Err(GrammarError::UnknownVerb(verb.to_string()));
    }

    let name = tokens
        .next()
        .ok_or_else(|| GrammarError::MissingValue(VERB.to_string()))?
        .to_string();

    let mut modifiers = Vec::new();
    while let Some(option) = tokens.next() {
        let arity = arity_of(option)
            .ok_or_else(|| GrammarError::UnknownOption(option.to_string()))?;

        let value = match arity {
            Arity::Flag => None,
            Arity::Value => Some(
                tokens
                    .next()
                    .ok_or_else(|| GrammarError::MissingValue(option.to_string()))?
                    .to_string(),
            ),
        };

        let modifier = Modifier::from_option(option, value)
            .ok_or_else(|| GrammarError::UnknownOption(option.to_string()))?;
        if !modifiers.contains(&modifier) {
            modifiers.push(modifier);
        }
    }

    if modifiers.contains(&Modifier::Enable) && modifiers.contains(&Modifier::Disable) {
        return Err(GrammarError::ConflictingToggles);
    }

    modifiers.sort_by_key(Modifier::precedence);

    Ok(IdCommand { name, modifiers })
}
