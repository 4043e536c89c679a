//! Matcher Engine.
//!
//! Turns a span of output text into [`Message`]s. Every rule that can match the span is run
//! over it; matches are ordered by start offset, and when two rules match at the same offset
//! the earlier rule wins. Each surviving match has its roles resolved, its file interned in
//! the [`LocationCache`], and its `Loc`s created.

use regex::{Captures, Regex};
use tracing::trace;

use crate::directory::DirectoryTracker;
use crate::error::ConfigError;
use crate::location::{FileId, FileSpec, LocationCache};
use crate::message::{Highlight, Message, MessageLocation};
use crate::rules::{RoleValue, Rule, RuleSet};
use crate::text::{TextSpan, line_end_after};

/// A rewrite applied to every matched file name, in order.
///
/// A transform without a replacement drops matches whose file name it matches.
#[derive(Debug, Clone)]
pub struct FileTransform {
    regex: Regex,
    replacement: Option<String>,
}

impl FileTransform {
    /// Create a transform. `replacement` uses `regex` replacement syntax (`$1`, `${name}`).
    pub fn new(pattern: &str, replacement: Option<String>) -> Result<Self, ConfigError> {
        let regex = Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { regex, replacement })
    }

    /// Apply the transforms to `filename`; `None` means the match is dropped.
    pub fn apply_all(transforms: &[FileTransform], filename: &str) -> Option<String> {
        let mut name = filename.to_string();
        for transform in transforms {
            if !transform.regex.is_match(&name) {
                continue;
            }
            let replacement = transform.replacement.as_deref()?;
            name = transform
                .regex
                .replace_all(&name, replacement)
                .into_owned();
        }
        Some(name)
    }
}

/// The file a message without a file of its own inherits.
#[derive(Debug, Clone)]
pub(crate) struct Inherited {
    pub(crate) file: FileId,
    pub(crate) filename: String,
    pub(crate) directory: Option<std::path::PathBuf>,
}

impl Inherited {
    pub(crate) fn from_message(message: &Message) -> Self {
        Self {
            file: message.file,
            filename: message.location.filename.clone(),
            directory: message.location.directory.clone(),
        }
    }
}

struct Candidate<'t> {
    start: usize,
    rule: usize,
    caps: Captures<'t>,
}

/// Applies a [`RuleSet`] to output text.
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'a> {
    rules: &'a RuleSet,
    first_column: usize,
    transforms: &'a [FileTransform],
}

impl<'a> Matcher<'a> {
    /// A matcher for 1-based tool columns and no file transforms.
    pub fn new(rules: &'a RuleSet) -> Self {
        Self {
            rules,
            first_column: 1,
            transforms: &[],
        }
    }

    /// Set the column the tool numbers first (0 or 1).
    pub fn with_first_column(mut self, first_column: usize) -> Self {
        self.first_column = first_column;
        self
    }

    /// Set the file-name transforms.
    pub fn with_file_transforms(mut self, transforms: &'a [FileTransform]) -> Self {
        self.transforms = transforms;
        self
    }

    /// Find every message in `text`, whose first char sits at buffer offset `from`.
    ///
    /// `tracker` must already have processed the text up to the end of `text`.
    pub fn parse(
        &self,
        text: &str,
        from: usize,
        tracker: &mut DirectoryTracker,
        cache: &mut LocationCache,
    ) -> Vec<Message> {
        self.parse_span(&TextSpan::new(text, from), tracker, cache, None)
    }

    pub(crate) fn parse_span(
        &self,
        span: &TextSpan<'_>,
        tracker: &mut DirectoryTracker,
        cache: &mut LocationCache,
        inherited: Option<Inherited>,
    ) -> Vec<Message> {
        let text = span.text();
        let mut candidates: Vec<Candidate<'_>> = Vec::new();
        for rule in self.rules.candidates(text) {
            let regex = self.rules.all()[rule].regex();
            candidates.extend(regex.captures_iter(text).filter_map(|caps| {
                let whole = caps.get(0)?;
                (!whole.is_empty()).then(|| Candidate {
                    start: whole.start(),
                    rule,
                    caps,
                })
            }));
        }
        candidates.sort_by_key(|c| (c.start, c.rule));
        candidates.dedup_by_key(|c| c.start);

        let mut previous = inherited;
        let mut claimed = 0;
        let mut messages = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            // A line belongs to the first message that matches on it.
            if candidate.start < claimed {
                continue;
            }
            let rule = &self.rules.all()[candidate.rule];
            if let Some(message) = self.resolve(rule, &candidate.caps, span, tracker, cache, &previous)
            {
                if let Some(whole) = candidate.caps.get(0) {
                    claimed = line_end_after(text, whole.end());
                }
                previous = Some(Inherited::from_message(&message));
                messages.push(message);
            }
        }
        messages
    }

    fn resolve(
        &self,
        rule: &Rule,
        caps: &Captures<'_>,
        span: &TextSpan<'_>,
        tracker: &mut DirectoryTracker,
        cache: &mut LocationCache,
        previous: &Option<Inherited>,
    ) -> Option<Message> {
        let whole = caps.get(0)?;
        let range = span.char_range(whole.range());

        let explicit = Rule::primary(rule.file(), caps).and_then(RoleValue::as_text);
        let (file, filename, directory) = match explicit {
            Some(raw) => {
                let Some(filename) = FileTransform::apply_all(self.transforms, raw.trim()) else {
                    trace!(rule = rule.name(), file = raw, "file name dropped by transform");
                    return None;
                };
                let frame = tracker.frame_at(range.start);
                let spec = FileSpec::bare(filename.clone());
                if rule.flushes_file()
                    && let Some(stale) = cache.lookup(&spec, &frame)
                {
                    cache.flush_file(stale);
                }
                let file = cache.intern(&spec, &frame, rule.formats());
                (file, filename, frame.directory().map(|d| d.to_path_buf()))
            }
            None => {
                let Some(previous) = previous else {
                    trace!(rule = rule.name(), offset = range.start, "match without a file discarded");
                    return None;
                };
                let file = if cache.file(previous.file).is_some() {
                    previous.file
                } else {
                    let spec = FileSpec::new(previous.filename.clone(), previous.directory.clone());
                    cache.intern(&spec, &Default::default(), rule.formats())
                };
                (file, previous.filename.clone(), previous.directory.clone())
            }
        };

        let line = Rule::primary(rule.line(), caps).and_then(number);
        let end_line = Rule::secondary(rule.line(), caps).and_then(number);
        let column = Rule::primary(rule.column(), caps).and_then(|v| self.column(v));
        let end_column = Rule::secondary(rule.column(), caps).and_then(|v| self.column(v));

        let loc = cache.get_or_create_loc(file, line, column).ok()?;
        let end_loc = if end_line.is_some() || end_column.is_some() {
            cache
                .get_or_create_loc(file, end_line.or(line), end_column)
                .ok()
        } else {
            None
        };

        let hyperlink = rule
            .hyperlink()
            .and_then(|group| caps.get(group))
            .map_or_else(|| range.clone(), |m| span.char_range(m.range()));
        let highlights = rule
            .highlights()
            .iter()
            .filter_map(|h| {
                caps.get(h.group).map(|m| Highlight {
                    range: span.char_range(m.range()),
                    face: h.face.clone(),
                })
            })
            .collect();

        cache.retain(file);
        Some(Message {
            range,
            hyperlink,
            severity: rule.severity().resolve(caps),
            loc,
            end_loc,
            file,
            rule: Some(rule.name().to_string()),
            location: MessageLocation {
                filename,
                directory,
                line,
                column,
                end_line,
                end_column,
            },
            highlights,
        })
    }

    /// A column value in 1-based form.
    fn column(&self, value: RoleValue<'_>) -> Option<usize> {
        match value {
            RoleValue::Text(text) => {
                let raw: usize = text.trim().parse().ok()?;
                Some((raw + 1).saturating_sub(self.first_column))
            }
            RoleValue::Number(n) => Some(n),
        }
    }
}

fn number(value: RoleValue<'_>) -> Option<usize> {
    match value {
        RoleValue::Text(text) => text.trim().parse().ok(),
        RoleValue::Number(n) => Some(n),
    }
}
