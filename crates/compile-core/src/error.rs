//! Error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::navigator::Direction;

#[derive(Debug, Error)]
/// Errors produced while building or extending a [`RuleSet`](crate::RuleSet).
///
/// These indicate an inconsistent rule table and are fatal for the table being built.
pub enum RuleError {
    #[error("rule '{rule}' references capture group {group}, but its pattern has only {available}")]
    /// A role references a capture group that does not exist in the rule's pattern.
    MalformedRule {
        /// Name of the offending rule.
        rule: String,
        /// The referenced group index.
        group: usize,
        /// Number of explicit capture groups in the pattern.
        available: usize,
    },

    #[error("rule '{rule}' has an invalid pattern: {source}")]
    /// The rule's regular expression failed to compile.
    InvalidPattern {
        /// Name of the offending rule.
        rule: String,
        /// The regex compiler error.
        #[source]
        source: regex::Error,
    },

    #[error("unknown rule '{0}'")]
    /// A rule name was requested that the table does not contain.
    UnknownRule(String),

    #[error("duplicate rule '{0}'")]
    /// Two rules in one table share a name.
    DuplicateRule(String),

    #[error("rule '{rule}' has a filename format without '%s': '{format}'")]
    /// An alternate filename format cannot place the matched name.
    InvalidFormat {
        /// Name of the offending rule.
        rule: String,
        /// The format string.
        format: String,
    },

    #[error("YAML parse error: {0}")]
    /// A YAML rule document could not be parsed.
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Errors produced while resolving a location to a source buffer position.
pub enum LocationError {
    #[error("cannot find '{filename}' (looked for {})", .searched.display())]
    /// No file could be found for the location via any search path/format combination.
    LocationUnresolved {
        /// The file name as written in the tool output.
        filename: String,
        /// The best-effort path that was tried last.
        searched: PathBuf,
    },

    #[error("location belongs to a flushed file")]
    /// The location's file structure was flushed or swept.
    StaleLocation,
}

/// Why a navigation step could not produce a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoMoreMessages {
    /// No eligible message has been recorded at all.
    NoneRecorded,
    /// Messages exist, but none further in the requested direction.
    NoFurther {
        /// Direction of the failed walk.
        direction: Direction,
    },
}

impl std::fmt::Display for NoMoreMessages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoneRecorded => write!(f, "no messages yet"),
            Self::NoFurther {
                direction: Direction::Forward,
            } => write!(f, "moved past last message"),
            Self::NoFurther {
                direction: Direction::Backward,
            } => write!(f, "moved back before first message"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Errors produced by the [`Navigator`](crate::Navigator).
pub enum NavigationError {
    #[error("{0}")]
    /// The walk ran off either end of the message sequence.
    NoMoreMessages(NoMoreMessages),

    #[error("no message starts at offset {0}")]
    /// A message key did not name a live message.
    UnknownMessage(usize),

    #[error(transparent)]
    /// The message's location could not be resolved.
    Location(#[from] LocationError),
}

#[derive(Debug, Error)]
/// Errors produced while loading a [`CompilationConfig`](crate::CompilationConfig).
pub enum ConfigError {
    #[error("I/O error: {0}")]
    /// Reading the configuration file failed.
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    /// The configuration document is not valid.
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid pattern '{pattern}': {source}")]
    /// A configured regular expression failed to compile.
    InvalidPattern {
        /// The pattern source.
        pattern: String,
        /// The regex compiler error.
        #[source]
        source: regex::Error,
    },

    #[error("directory pattern needs a capture group for the directory name")]
    /// The directory pattern lacks the directory capture group.
    MissingDirectoryGroup,

    #[error(transparent)]
    /// The configured rule selection is invalid.
    Rules(#[from] RuleError),
}
