//! In-memory output buffer: rope text plus an interval index of mirrored annotations.

use std::ops::Range;

use ropey::Rope;

use crate::annotations::AnnotationIndex;
use crate::buffer::{Annotation, OutputBuffer};

/// A growable, editable tool-output log.
#[derive(Debug, Clone, Default)]
pub struct OutputLog {
    rope: Rope,
    annotations: AnnotationIndex,
}

impl OutputLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log holding `text`.
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            annotations: AnnotationIndex::new(),
        }
    }

    /// Append `text`; returns the char offset where it starts.
    pub fn append(&mut self, text: &str) -> usize {
        let at = self.rope.len_chars();
        self.rope.insert(at, text);
        at
    }

    /// Insert `text` at char offset `offset` (clamped to the end).
    pub fn insert(&mut self, offset: usize, text: &str) {
        let offset = offset.min(self.rope.len_chars());
        self.rope.insert(offset, text);
        self.annotations
            .update_for_insertion(offset, text.chars().count());
    }

    /// Delete the chars in `range` (clamped to the buffer).
    pub fn delete(&mut self, range: Range<usize>) {
        let len = self.rope.len_chars();
        let start = range.start.min(len);
        let end = range.end.clamp(start, len);
        if start == end {
            return;
        }
        self.rope.remove(start..end);
        self.annotations.update_for_deletion(start, end);
    }

    /// The whole text.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Number of lines (a trailing newline starts an empty last line).
    pub fn len_lines(&self) -> usize {
        self.rope.len_lines()
    }

    /// The annotations mirrored onto this log.
    pub fn annotations(&self) -> &AnnotationIndex {
        &self.annotations
    }

    /// The annotation covering `offset`, if any.
    pub fn annotation_at(&self, offset: usize) -> Option<&Annotation> {
        self.annotations
            .query_point(offset)
            .into_iter()
            .next()
            .map(|span| &span.annotation)
    }
}

impl OutputBuffer for OutputLog {
    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn read(&self, range: Range<usize>) -> String {
        let len = self.rope.len_chars();
        let start = range.start.min(len);
        let end = range.end.clamp(start, len);
        self.rope.slice(start..end).to_string()
    }

    fn annotate(&mut self, range: Range<usize>, annotation: &Annotation) {
        self.annotations
            .insert(range.start, range.end, annotation.clone());
    }

    fn clear_annotations(&mut self, range: Range<usize>) {
        self.annotations.remove_range(range.start, range.end);
    }

    /// Start of the line after the last annotated span.
    fn first_unannotated(&self) -> usize {
        let max_end = self.annotations.max_end().min(self.rope.len_chars());
        if max_end == 0 {
            return 0;
        }
        let line = self.rope.char_to_line(max_end - 1);
        self.rope.line_to_char((line + 1).min(self.rope.len_lines()))
    }
}
