//! Interval index of annotations mirrored onto an output buffer.
//!
//! Uses a sorted vector with binary search.
//! Query complexity: O(log n + k), where k is the number of overlapping spans.

use crate::buffer::Annotation;

/// An annotated span of output text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedSpan {
    /// Start offset (chars).
    pub start: usize,
    /// End offset (exclusive).
    pub end: usize,
    /// The mirrored message data.
    pub annotation: Annotation,
}

impl AnnotatedSpan {
    /// Check if the span contains a specific position.
    pub fn contains(&self, pos: usize) -> bool {
        self.start <= pos && pos < self.end
    }
}

/// Annotated spans, kept sorted by start.
#[derive(Debug, Clone, Default)]
pub struct AnnotationIndex {
    spans: Vec<AnnotatedSpan>,
    /// `prefix_max_end[i] = max(spans[0..=i].end)`, for early pruning in queries.
    prefix_max_end: Vec<usize>,
}

impl AnnotationIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    fn rebuild_prefix_max_end_from(&mut self, start_idx: usize) {
        self.prefix_max_end.resize(self.spans.len(), 0);
        let mut max_end = match start_idx {
            0 => 0,
            idx => self.prefix_max_end[idx - 1],
        };
        for (idx, span) in self.spans.iter().enumerate().skip(start_idx) {
            max_end = max_end.max(span.end);
            self.prefix_max_end[idx] = max_end;
        }
    }

    /// Insert a span.
    pub fn insert(&mut self, start: usize, end: usize, annotation: Annotation) {
        let pos = self.spans.partition_point(|s| s.start <= start);
        self.spans.insert(
            pos,
            AnnotatedSpan {
                start,
                end,
                annotation,
            },
        );
        self.prefix_max_end.insert(pos, 0);
        self.rebuild_prefix_max_end_from(pos);
    }

    /// All spans containing `pos`.
    pub fn query_point(&self, pos: usize) -> Vec<&AnnotatedSpan> {
        let idx = self.spans.partition_point(|s| s.start <= pos);
        let mut result = Vec::new();
        for i in (0..idx).rev() {
            if self.prefix_max_end[i] <= pos {
                break;
            }
            if self.spans[i].contains(pos) {
                result.push(&self.spans[i]);
            }
        }
        result
    }

    /// All spans overlapping `[start, end)`.
    pub fn query_range(&self, start: usize, end: usize) -> Vec<&AnnotatedSpan> {
        if start >= end {
            return Vec::new();
        }
        let search_end = self.spans.partition_point(|s| s.start < end);
        let mut scan_start = self.spans.partition_point(|s| s.start < start).min(search_end);
        while scan_start > 0 && self.prefix_max_end[scan_start - 1] > start {
            scan_start -= 1;
        }
        self.spans[scan_start..search_end]
            .iter()
            .filter(|s| s.start < end && s.end > start)
            .collect()
    }

    /// Remove every span overlapping `[start, end)`; returns how many were removed.
    pub fn remove_range(&mut self, start: usize, end: usize) -> usize {
        let before = self.spans.len();
        self.spans.retain(|s| !(s.start < end && s.end > start));
        let removed = before - self.spans.len();
        if removed > 0 {
            self.rebuild_prefix_max_end_from(0);
        }
        removed
    }

    /// Largest span end, or 0 when empty.
    pub fn max_end(&self) -> usize {
        self.prefix_max_end.last().copied().unwrap_or(0)
    }

    /// Every span, sorted by start.
    pub fn spans(&self) -> &[AnnotatedSpan] {
        &self.spans
    }

    /// Number of spans.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Remove every span.
    pub fn clear(&mut self) {
        self.spans.clear();
        self.prefix_max_end.clear();
    }

    /// Shift spans for `delta` chars inserted at `pos`.
    pub fn update_for_insertion(&mut self, pos: usize, delta: usize) {
        for span in &mut self.spans {
            if span.start >= pos {
                span.start += delta;
                span.end += delta;
            } else if span.end > pos {
                span.end += delta;
            }
        }
        self.rebuild_prefix_max_end_from(0);
    }

    /// Shift spans for the deletion of `[start, end)`; spans inside it are dropped.
    pub fn update_for_deletion(&mut self, start: usize, end: usize) {
        let delta = end - start;
        self.spans.retain_mut(|span| {
            if span.end <= start {
                true
            } else if span.start >= end {
                span.start -= delta;
                span.end -= delta;
                true
            } else if span.start >= start && span.end <= end {
                false
            } else {
                span.start = span.start.min(start);
                span.end = if span.end > end { span.end - delta } else { start };
                true
            }
        });
        self.spans.sort_by_key(|s| s.start);
        self.rebuild_prefix_max_end_from(0);
    }
}
