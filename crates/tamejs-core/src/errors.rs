//! Setup-time errors.
//!
//! Problems in the program being rewritten are never errors in this sense;
//! they are reported as diagnostics. The types here cover broken templates,
//! broken rule tables and unreadable configuration.

use crate::span::Span;
use thiserror::Error;

/// Lexing or parsing failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at {span}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        ParseError {
            message: message.into(),
            span,
        }
    }
}

/// A template could not be turned into a usable pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("template `{template}` does not parse: {source}")]
    Syntax {
        template: String,
        #[source]
        source: ParseError,
    },

    #[error("template `{0}` is empty")]
    Empty(String),

    /// Matching would need a backtracking search to split the list.
    #[error("template `{template}` places @{first} and @{second} in one sibling list")]
    AmbiguousMultiHoles {
        template: String,
        first: String,
        second: String,
    },
}

/// A rule could not be registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("duplicate rule name: {0}")]
    DuplicateName(String),

    #[error("rule {rule}: {source}")]
    Pattern {
        rule: String,
        #[source]
        source: PatternError,
    },
}

/// Configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported config file extension: {0}")]
    UnsupportedFormat(String),
}

/// Substitution could not produce a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubstitutionError {
    /// A required hole has no binding.
    #[error("no binding for @{0}")]
    MissingBinding(String),

    /// A hole is bound to a list where one node is needed, or a
    /// one-or-more hole is bound to an empty list.
    #[error("binding for @{0} has the wrong number of nodes")]
    Arity(String),
}

impl SubstitutionError {
    pub fn hole(&self) -> &str {
        match self {
            SubstitutionError::MissingBinding(name) | SubstitutionError::Arity(name) => name,
        }
    }
}
