//! Directory Stack Tracker.
//!
//! Recursive builds announce directory changes (`make[1]: Entering directory '/src/lib'`).
//! The tracker scans the output for those lines and answers, for any offset, which stack of
//! directories was in effect there.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use regex::{Regex, RegexBuilder};
use tracing::{trace, warn};

use crate::error::ConfigError;
use crate::text::TextSpan;

/// Default pattern: GNU make's `Entering directory`/`Leaving directory` lines.
///
/// Custom patterns must have a `dir` group and may have a `leave` group whose participation
/// marks a leave event.
pub const DEFAULT_DIRECTORY_PATTERN: &str =
    r#"(?:Entering|(?P<leave>Leaving)) directory [`'‘"](?P<dir>[^\n]+?)['’"][ \t]*$"#;

#[derive(Debug)]
struct FrameNode {
    directory: PathBuf,
    parent: DirectoryFrame,
}

/// The stack of entered directories in effect at some offset.
///
/// Frames are immutable and shared: every offset between two directory events holds a clone of
/// the same frame, so [`DirectoryFrame::ptr_eq`] is a cheap identity check.
#[derive(Debug, Clone, Default)]
pub struct DirectoryFrame(Option<Rc<FrameNode>>);

impl DirectoryFrame {
    /// The empty stack (no directory entered).
    pub fn root() -> Self {
        Self(None)
    }

    /// The innermost directory, if any.
    ///
    /// A relative directory entered inside another one is already joined onto it.
    pub fn directory(&self) -> Option<&Path> {
        self.0.as_ref().map(|node| node.directory.as_path())
    }

    /// The enclosing frame.
    pub fn parent(&self) -> DirectoryFrame {
        self.0
            .as_ref()
            .map(|node| node.parent.clone())
            .unwrap_or_default()
    }

    /// A new frame with `dir` entered on top of this one.
    pub fn push(&self, dir: &str) -> Self {
        let dir = Path::new(dir);
        let directory = match self.directory() {
            Some(base) if dir.is_relative() => base.join(dir),
            _ => dir.to_path_buf(),
        };
        Self(Some(Rc::new(FrameNode {
            directory,
            parent: self.clone(),
        })))
    }

    /// The enclosing frame; popping the root yields the root.
    pub fn pop(&self) -> Self {
        self.parent()
    }

    /// Whether two frames are the same frame (not merely equal directories).
    pub fn ptr_eq(&self, other: &DirectoryFrame) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Number of entered directories.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut frame = self.0.as_ref();
        while let Some(node) = frame {
            depth += 1;
            frame = node.parent.0.as_ref();
        }
        depth
    }
}

/// A directory change announced in the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryEvent {
    /// A directory was entered.
    Enter(String),
    /// The innermost directory was left.
    Leave,
}

#[derive(Debug, Clone)]
struct FrameMemo {
    offset: usize,
    frame: DirectoryFrame,
    /// Offset of the first event after `offset`, if any.
    next_event: Option<usize>,
}

/// Tracks directory events of one output stream.
#[derive(Debug, Clone)]
pub struct DirectoryTracker {
    /// `None` disables tracking.
    regex: Option<Regex>,
    /// Frame in effect before the first event.
    base: DirectoryFrame,
    /// Frame in effect from each event's offset on.
    events: BTreeMap<usize, DirectoryFrame>,
    memo: Option<FrameMemo>,
}

impl Default for DirectoryTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryTracker {
    /// A tracker for GNU make directory lines.
    pub fn new() -> Self {
        let regex = RegexBuilder::new(DEFAULT_DIRECTORY_PATTERN)
            .multi_line(true)
            .crlf(true)
            .build();
        if let Err(err) = &regex {
            warn!(%err, "directory tracking disabled");
        }
        Self::from_regex(regex.ok())
    }

    /// A tracker for a custom directory pattern with a `dir` group and an optional `leave`
    /// group.
    pub fn with_pattern(pattern: &str) -> Result<Self, ConfigError> {
        let regex = RegexBuilder::new(pattern)
            .multi_line(true)
            .crlf(true)
            .build()
            .map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        if !regex.capture_names().flatten().any(|name| name == "dir") {
            return Err(ConfigError::MissingDirectoryGroup);
        }
        Ok(Self::from_regex(Some(regex)))
    }

    fn from_regex(regex: Option<Regex>) -> Self {
        Self {
            regex,
            base: DirectoryFrame::default(),
            events: BTreeMap::new(),
            memo: None,
        }
    }

    /// Whether directory lines are recognized at all.
    pub fn is_enabled(&self) -> bool {
        self.regex.is_some()
    }

    /// Find the directory events in `text`, whose first char sits at buffer offset `from`.
    ///
    /// Offsets in the result are buffer char offsets of each event's match start.
    pub fn scan(&self, text: &str, from: usize) -> Vec<(usize, DirectoryEvent)> {
        self.scan_span(&TextSpan::new(text, from))
    }

    pub(crate) fn scan_span(&self, span: &TextSpan<'_>) -> Vec<(usize, DirectoryEvent)> {
        let Some(regex) = &self.regex else {
            return Vec::new();
        };
        regex
            .captures_iter(span.text())
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let offset = span.char_offset(whole.start());
                let event = if caps.name("leave").is_some() {
                    DirectoryEvent::Leave
                } else {
                    DirectoryEvent::Enter(caps.name("dir")?.as_str().to_string())
                };
                Some((offset, event))
            })
            .collect()
    }

    /// Record events found by [`DirectoryTracker::scan`].
    ///
    /// Events must come after every event already recorded; callers rewind with
    /// [`DirectoryTracker::truncate_from`] first.
    pub fn apply(&mut self, events: Vec<(usize, DirectoryEvent)>) {
        if events.is_empty() {
            return;
        }
        let mut frame = self
            .events
            .last_key_value()
            .map_or_else(|| self.base.clone(), |(_, frame)| frame.clone());
        for (offset, event) in events {
            frame = match &event {
                DirectoryEvent::Enter(dir) => frame.push(dir),
                DirectoryEvent::Leave => frame.pop(),
            };
            trace!(offset, ?event, depth = frame.depth(), "directory event");
            self.events.insert(offset, frame.clone());
        }
        if self.memo.as_ref().is_some_and(|memo| memo.next_event.is_none()) {
            self.memo = None;
        }
    }

    /// Scan a parsed span and record its events.
    pub(crate) fn process(&mut self, span: &TextSpan<'_>) {
        let events = self.scan_span(span);
        self.apply(events);
    }

    /// The frame in effect at `offset`.
    ///
    /// Queries over increasing offsets between the same two events are answered from a memo.
    pub fn frame_at(&mut self, offset: usize) -> DirectoryFrame {
        if let Some(memo) = &self.memo
            && offset >= memo.offset
            && memo.next_event.is_none_or(|next| offset < next)
        {
            return memo.frame.clone();
        }

        let frame = self
            .events
            .range(..=offset)
            .next_back()
            .map_or_else(|| self.base.clone(), |(_, frame)| frame.clone());
        let next_event = self
            .events
            .range(offset.saturating_add(1)..)
            .next()
            .map(|(at, _)| *at);
        self.memo = Some(FrameMemo {
            offset,
            frame: frame.clone(),
            next_event,
        });
        frame
    }

    /// Drop every event at or after `offset` (the text there will be re-parsed).
    pub fn truncate_from(&mut self, offset: usize) {
        self.events.split_off(&offset);
        if self.memo.as_ref().is_some_and(|memo| {
            offset <= memo.offset || memo.next_event.is_some_and(|next| next >= offset)
        }) {
            self.memo = None;
        }
    }

    /// Renumber events after `delta` chars were removed from the head of the output.
    ///
    /// The frame left in effect by the removed text becomes the base frame, so it survives a
    /// later [`DirectoryTracker::truncate_from`].
    pub fn shift_back(&mut self, delta: usize) {
        let kept = self.events.split_off(&delta);
        let head = std::mem::take(&mut self.events);
        if let Some((_, frame)) = head.into_iter().next_back() {
            self.base = frame;
        }
        self.events
            .extend(kept.into_iter().map(|(offset, frame)| (offset - delta, frame)));
        self.memo = None;
    }

    /// Number of recorded events.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Forget every event.
    pub fn clear(&mut self) {
        self.base = DirectoryFrame::default();
        self.events.clear();
        self.memo = None;
    }
}
