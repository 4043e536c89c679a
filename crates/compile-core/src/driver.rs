//! Incremental Parse Driver.
//!
//! The driver owns the parse cursor of one output buffer: everything before the cursor has
//! been turned into messages, everything after has not. [`ParseDriver::ensure_parsed`] parses
//! on demand up to an offset, never past the last complete line while the producing process
//! is still running. [`ParseDriver::flush_from`] rewinds the cursor after an edit.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::buffer::{Annotation, OutputBuffer};
use crate::directory::DirectoryTracker;
use crate::location::{FileId, LocId, LocationCache};
use crate::matcher::{FileTransform, Inherited, Matcher};
use crate::message::{Message, SeverityCounts};
use crate::rules::RuleSet;
use crate::text::{TextSpan, line_end_after, tail_lines_start, terminated_prefix_len};

/// Parse state of one output buffer.
#[derive(Debug)]
pub struct ParseDriver {
    rules: Arc<RuleSet>,
    tracker: DirectoryTracker,
    first_column: usize,
    file_transforms: Vec<FileTransform>,
    cursor: usize,
    process_finished: bool,
    messages: BTreeMap<usize, Message>,
    /// Mirrored annotations at or after this offset are stale.
    pending_clear: Option<usize>,
    /// Set by a flush; the cursor may sit mid-line even at the end of the buffer.
    rewound: bool,
}

impl ParseDriver {
    /// A driver applying `rules`, with GNU make directory tracking.
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self {
            rules,
            tracker: DirectoryTracker::new(),
            first_column: 1,
            file_transforms: Vec::new(),
            cursor: 0,
            process_finished: false,
            messages: BTreeMap::new(),
            pending_clear: None,
            rewound: false,
        }
    }

    /// Use a custom directory tracker.
    pub fn with_directory_tracker(mut self, tracker: DirectoryTracker) -> Self {
        self.tracker = tracker;
        self
    }

    /// Set the column the tool numbers first (0 or 1).
    pub fn with_first_column(mut self, first_column: usize) -> Self {
        self.first_column = first_column;
        self
    }

    /// Set the file-name transforms.
    pub fn with_file_transforms(mut self, transforms: Vec<FileTransform>) -> Self {
        self.file_transforms = transforms;
        self
    }

    /// The rule table.
    pub fn rules(&self) -> &Arc<RuleSet> {
        &self.rules
    }

    /// The directory tracker.
    pub fn tracker(&self) -> &DirectoryTracker {
        &self.tracker
    }

    /// Start parsing `buffer` from scratch, after any annotated prefix it already carries.
    pub fn attach<B: OutputBuffer + ?Sized>(&mut self, buffer: &B, cache: &mut LocationCache) {
        self.clear(cache);
        self.cursor = buffer.first_unannotated();
    }

    /// Offset up to which the buffer has been parsed.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Tell the driver whether the producing process has exited.
    ///
    /// Once it has, a final line without a newline is parsed too.
    pub fn set_process_finished(&mut self, finished: bool) {
        self.process_finished = finished;
    }

    /// Whether the producing process has exited.
    pub fn process_finished(&self) -> bool {
        self.process_finished
    }

    /// Parse `buffer` up to `upto`; returns the number of new messages.
    ///
    /// Only complete lines are parsed unless the process has finished. While it runs, the last
    /// lines of the parsed text stay provisional: their messages are recorded, but the cursor
    /// stays before them and the next call parses them again, so a multi-line message whose
    /// tail arrives later is still found. Calling this again with the same or a smaller offset
    /// adds no messages.
    pub fn ensure_parsed<B: OutputBuffer + ?Sized>(
        &mut self,
        upto: usize,
        buffer: &mut B,
        cache: &mut LocationCache,
    ) -> usize {
        let len = buffer.len_chars();
        if let Some(from) = self.pending_clear.take() {
            buffer.clear_annotations(from..len.max(from));
        }
        self.cursor = self.cursor.min(len);
        self.snap_to_line_start(buffer, cache);

        let upto = upto.min(len);
        if upto <= self.cursor {
            return 0;
        }

        let start = self.cursor;
        let text = buffer.read(start..upto);
        let parse_chars = if self.process_finished && upto == len {
            text.chars().count()
        } else {
            terminated_prefix_len(&text)
        };
        if parse_chars == 0 {
            return 0;
        }
        let byte_end = text
            .char_indices()
            .nth(parse_chars)
            .map_or(text.len(), |(byte, _)| byte);
        let end = start + parse_chars;

        let provisional = self.messages.range(start..).count();
        self.drop_from(start, cache);
        buffer.clear_annotations(start..len);
        let span = TextSpan::new(&text[..byte_end], start);
        self.tracker.process(&span);

        let inherited = self
            .messages
            .range(..start)
            .next_back()
            .map(|(_, message)| Inherited::from_message(message));
        let produced = Matcher::new(&self.rules)
            .with_first_column(self.first_column)
            .with_file_transforms(&self.file_transforms)
            .parse_span(&span, &mut self.tracker, cache, inherited);

        let held = if self.process_finished && end == len {
            end
        } else {
            let parsed = span.text();
            let tail = tail_lines_start(parsed, self.rules.max_lines() - 1);
            let from = produced
                .iter()
                .rfind(|m| span.byte_offset(m.start()) < tail)
                .map_or(tail, |m| {
                    tail.max(line_end_after(parsed, span.byte_offset(m.range.end)))
                });
            span.char_offset(from)
        };

        let count = produced.len().saturating_sub(provisional);
        for message in produced {
            buffer.annotate(message.hyperlink.clone(), &annotation_for(&message));
            self.messages.insert(message.start(), message);
        }
        self.cursor = held;
        debug!(start, end, held, messages = count, provisional, "parsed output span");
        count
    }

    /// A cursor left mid-line by a flush, or by parsing a final partial line that has since
    /// grown, moves back to the start of that line.
    fn snap_to_line_start<B: OutputBuffer + ?Sized>(
        &mut self,
        buffer: &mut B,
        cache: &mut LocationCache,
    ) {
        let rewound = std::mem::take(&mut self.rewound);
        if self.cursor == 0
            || (self.cursor == buffer.len_chars() && !rewound)
            || buffer.read(self.cursor - 1..self.cursor) == "\n"
        {
            return;
        }
        let prefix = buffer.read(0..self.cursor);
        let line_start = terminated_prefix_len(&prefix);
        buffer.clear_annotations(line_start..self.cursor);
        self.drop_from(line_start, cache);
        self.cursor = line_start;
    }

    /// Rewind the cursor to `offset` after an edit there.
    ///
    /// Messages starting at or after `offset`, and messages whose text extends past it, are
    /// dropped; their annotations are cleared on the next parse. A cursor left mid-line moves
    /// to the start of that line on the next parse.
    pub fn flush_from(&mut self, offset: usize, cache: &mut LocationCache) {
        let mut offset = offset;
        while let Some((&start, message)) = self.messages.range(..offset).next_back()
            && message.range.end > offset
        {
            offset = start;
        }
        if self.messages.range(offset..).next().is_none() && offset >= self.cursor {
            return;
        }
        self.drop_from(offset, cache);
        if offset < self.cursor {
            self.cursor = offset;
            self.rewound = true;
        }
        self.pending_clear = Some(self.pending_clear.map_or(offset, |p| p.min(offset)));
    }

    fn drop_from(&mut self, offset: usize, cache: &mut LocationCache) {
        let dropped = self.messages.split_off(&offset);
        for message in dropped.values() {
            cache.release(message.file);
        }
        self.tracker.truncate_from(offset);
    }

    /// Messages in text order.
    pub fn messages(&self) -> impl DoubleEndedIterator<Item = &Message> {
        self.messages.values()
    }

    /// Number of live messages.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// The message starting at `start`.
    pub fn message(&self, start: usize) -> Option<&Message> {
        self.messages.get(&start)
    }

    /// The message whose text covers `offset`.
    pub fn message_at(&self, offset: usize) -> Option<&Message> {
        self.messages
            .range(..=offset)
            .next_back()
            .map(|(_, message)| message)
            .filter(|message| message.range.contains(&offset))
    }

    pub(crate) fn message_map(&self) -> &BTreeMap<usize, Message> {
        &self.messages
    }

    /// Point a message at new cache entries after its file was flushed.
    pub(crate) fn relocate(&mut self, start: usize, file: FileId, loc: LocId, end_loc: Option<LocId>) {
        if let Some(message) = self.messages.get_mut(&start) {
            message.file = file;
            message.loc = loc;
            message.end_loc = end_loc;
        }
    }

    /// Error/warning/info totals of live messages.
    pub fn counts(&self) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for message in self.messages.values() {
            counts.add(message.severity);
        }
        counts
    }

    /// Drop the messages starting before `offset` and release their files.
    ///
    /// Used before the head of the output is trimmed; see [`ParseDriver::shift_back`].
    pub fn discard_before(&mut self, offset: usize, cache: &mut LocationCache) -> usize {
        let kept = self.messages.split_off(&offset);
        let dropped = std::mem::replace(&mut self.messages, kept);
        for message in dropped.values() {
            cache.release(message.file);
        }
        dropped.len()
    }

    /// Renumber everything after `delta` chars were removed from the head of the output.
    ///
    /// Messages must not start before `delta`; call [`ParseDriver::discard_before`] first.
    pub fn shift_back(&mut self, delta: usize) {
        let messages = std::mem::take(&mut self.messages);
        self.messages = messages
            .into_values()
            .filter(|message| message.range.start >= delta)
            .map(|mut message| {
                message.range = message.range.start - delta..message.range.end - delta;
                message.hyperlink =
                    message.hyperlink.start.saturating_sub(delta)..message.hyperlink.end - delta;
                for highlight in &mut message.highlights {
                    highlight.range = highlight.range.start.saturating_sub(delta)
                        ..highlight.range.end.saturating_sub(delta);
                }
                (message.start(), message)
            })
            .collect();
        self.tracker.shift_back(delta);
        self.cursor = self.cursor.saturating_sub(delta);
        self.pending_clear = self.pending_clear.map(|p| p.saturating_sub(delta));
    }

    /// Forget every message and directory event; the cursor returns to 0.
    pub fn clear(&mut self, cache: &mut LocationCache) {
        for message in self.messages.values() {
            cache.release(message.file);
        }
        self.messages.clear();
        self.tracker.clear();
        self.cursor = 0;
        self.pending_clear = None;
        self.rewound = false;
    }
}

fn annotation_for(message: &Message) -> Annotation {
    Annotation {
        severity: message.severity,
        filename: message.location.filename.clone(),
        line: message.location.line,
        column: message.location.column,
    }
}
