//! Normalized diagnostic records.
//!
//! A [`Message`] is one recognized reference to a source location in the tool output. Messages
//! are owned by the [`ParseDriver`](crate::ParseDriver), keyed by the char offset where their
//! match starts, and point into the [`LocationCache`](crate::LocationCache) by id.

use std::ops::Range;
use std::path::PathBuf;

use serde::Deserialize;

use crate::location::{FileId, LocId};

/// Message severity levels, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational messages (notes, "in file included from", ...).
    Info,
    /// Warnings.
    Warning,
    /// Errors.
    Error,
}

impl Severity {
    /// Lowercase label, as printed by most tools.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "info" | "0" => Ok(Self::Info),
            "warning" | "1" => Ok(Self::Warning),
            "error" | "2" => Ok(Self::Error),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

/// The textual location a match resolved to, before any file lookup.
///
/// This is kept on the message so it can be re-interned after its file was flushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLocation {
    /// File name as written (or inherited).
    pub filename: String,
    /// Directory in effect for the file name, if any.
    pub directory: Option<PathBuf>,
    /// 1-based line.
    pub line: Option<usize>,
    /// 1-based column.
    pub column: Option<usize>,
    /// 1-based end line, for ranges.
    pub end_line: Option<usize>,
    /// 1-based end column, for ranges.
    pub end_column: Option<usize>,
}

/// An extra highlighted sub-span of a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    /// Char range in the output text.
    pub range: Range<usize>,
    /// Host-defined face/role name.
    pub face: String,
}

/// One recognized diagnostic occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Char range of the whole match in the output text.
    pub range: Range<usize>,
    /// Char range that acts as the clickable hyperlink.
    pub hyperlink: Range<usize>,
    /// Resolved severity.
    pub severity: Severity,
    /// Primary location.
    pub loc: LocId,
    /// End location, for ranges.
    pub end_loc: Option<LocId>,
    /// File structure owning `loc`.
    pub file: FileId,
    /// Name of the rule that produced this message.
    pub rule: Option<String>,
    /// Textual location (file name, directory, line/column values).
    pub location: MessageLocation,
    /// Extra highlight directives of the rule that participated in the match.
    pub highlights: Vec<Highlight>,
}

impl Message {
    /// Char offset where the match starts (the message key).
    pub fn start(&self) -> usize {
        self.range.start
    }
}

/// Totals of live messages per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeverityCounts {
    /// Number of errors.
    pub errors: usize,
    /// Number of warnings.
    pub warnings: usize,
    /// Number of informational messages.
    pub infos: usize,
}

impl SeverityCounts {
    /// Count one message of `severity`.
    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Info => self.infos += 1,
        }
    }

    /// Total number of messages.
    pub fn total(&self) -> usize {
        self.errors + self.warnings + self.infos
    }
}
