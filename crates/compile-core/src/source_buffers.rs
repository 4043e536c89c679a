//! In-memory source buffers with edit-resilient markers.
//!
//! Buffers are loaded from disk on first use (or registered with
//! [`SourceBuffers::open_with_text`]). Markers keep their position across
//! [`SourceBuffers::insert`] and [`SourceBuffers::delete`], and die with their buffer.

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};

use ropey::Rope;
use tracing::debug;

use crate::buffer::{BufferHandle, MarkerId, SourceFiles};
use crate::columns::{DEFAULT_TAB_WIDTH, char_index_for_cell};

type PromptFn = Box<dyn FnMut(&str, &Path) -> Option<PathBuf>>;

#[derive(Debug)]
struct SourceBuffer {
    path: PathBuf,
    rope: Rope,
}

#[derive(Debug, Clone, Copy)]
struct Marker {
    buffer: BufferHandle,
    position: usize,
}

/// A set of open source buffers.
pub struct SourceBuffers {
    buffers: HashMap<BufferHandle, SourceBuffer>,
    by_path: HashMap<PathBuf, BufferHandle>,
    markers: HashMap<MarkerId, Marker>,
    next_buffer: u64,
    next_marker: u64,
    tab_width: usize,
    prompt: Option<PromptFn>,
}

impl fmt::Debug for SourceBuffers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceBuffers")
            .field("buffers", &self.buffers.len())
            .field("markers", &self.markers.len())
            .field("tab_width", &self.tab_width)
            .finish()
    }
}

impl Default for SourceBuffers {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceBuffers {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            buffers: HashMap::new(),
            by_path: HashMap::new(),
            markers: HashMap::new(),
            next_buffer: 1,
            next_marker: 1,
            tab_width: DEFAULT_TAB_WIDTH,
            prompt: None,
        }
    }

    /// Set the tab width used for screen columns.
    pub fn with_tab_width(mut self, tab_width: usize) -> Self {
        self.tab_width = tab_width.max(1);
        self
    }

    /// Tab width used for screen columns.
    pub fn tab_width(&self) -> usize {
        self.tab_width
    }

    /// Answer [`SourceFiles::prompt_for_file`] with `prompt`.
    pub fn with_prompt(
        mut self,
        prompt: impl FnMut(&str, &Path) -> Option<PathBuf> + 'static,
    ) -> Self {
        self.prompt = Some(Box::new(prompt));
        self
    }

    /// Register a buffer for `path` with the given contents, without touching the disk.
    pub fn open_with_text(&mut self, path: impl Into<PathBuf>, text: &str) -> BufferHandle {
        let path = path.into();
        if let Some(old) = self.by_path.get(&path).copied() {
            self.kill(old);
        }
        let handle = BufferHandle(self.next_buffer);
        self.next_buffer += 1;
        self.by_path.insert(path.clone(), handle);
        self.buffers.insert(
            handle,
            SourceBuffer {
                path,
                rope: Rope::from_str(&text.replace("\r\n", "\n")),
            },
        );
        handle
    }

    /// Close a buffer; its markers die.
    pub fn kill(&mut self, buffer: BufferHandle) {
        if let Some(closed) = self.buffers.remove(&buffer) {
            self.by_path.remove(&closed.path);
        }
        self.markers.retain(|_, marker| marker.buffer != buffer);
    }

    /// Text of a buffer.
    pub fn text(&self, buffer: BufferHandle) -> Option<String> {
        self.buffers.get(&buffer).map(|b| b.rope.to_string())
    }

    /// Path a buffer visits.
    pub fn path(&self, buffer: BufferHandle) -> Option<&Path> {
        self.buffers.get(&buffer).map(|b| b.path.as_path())
    }

    /// Number of open buffers.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Returns `true` if no buffer is open.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// 1-based line and char column of `offset` in `buffer`.
    pub fn line_column(&self, buffer: BufferHandle, offset: usize) -> Option<(usize, usize)> {
        let rope = &self.buffers.get(&buffer)?.rope;
        let offset = offset.min(rope.len_chars());
        let line = rope.char_to_line(offset);
        Some((line + 1, offset - rope.line_to_char(line) + 1))
    }

    /// Insert `text` at `offset`; markers after `offset` move with the text.
    pub fn insert(&mut self, buffer: BufferHandle, offset: usize, text: &str) {
        let Some(source) = self.buffers.get_mut(&buffer) else {
            return;
        };
        let offset = offset.min(source.rope.len_chars());
        source.rope.insert(offset, text);
        let len = text.chars().count();
        for marker in self.markers.values_mut().filter(|m| m.buffer == buffer) {
            if marker.position > offset {
                marker.position += len;
            }
        }
    }

    /// Delete `range`; markers inside it collapse to its start.
    pub fn delete(&mut self, buffer: BufferHandle, range: Range<usize>) {
        let Some(source) = self.buffers.get_mut(&buffer) else {
            return;
        };
        let len = source.rope.len_chars();
        let start = range.start.min(len);
        let end = range.end.clamp(start, len);
        source.rope.remove(start..end);
        for marker in self.markers.values_mut().filter(|m| m.buffer == buffer) {
            if marker.position >= end {
                marker.position -= end - start;
            } else if marker.position > start {
                marker.position = start;
            }
        }
    }
}

impl SourceFiles for SourceBuffers {
    fn open_or_find(&mut self, path: &Path) -> Option<BufferHandle> {
        if let Some(handle) = self.by_path.get(path) {
            return Some(*handle);
        }
        match std::fs::read_to_string(path) {
            Ok(text) => {
                debug!(path = %path.display(), "opened source buffer");
                Some(self.open_with_text(path, &text))
            }
            Err(err) => {
                debug!(path = %path.display(), error = %err, "cannot open source file");
                None
            }
        }
    }

    fn offset_of(
        &self,
        buffer: BufferHandle,
        line: usize,
        column: Option<usize>,
        screen_columns: bool,
    ) -> Option<usize> {
        let rope = &self.buffers.get(&buffer)?.rope;
        let line_idx = line.saturating_sub(1).min(rope.len_lines().saturating_sub(1));
        let line_start = rope.line_to_char(line_idx);
        let Some(column) = column else {
            return Some(line_start);
        };

        let text = rope.line(line_idx).to_string();
        let text = text.trim_end_matches(['\n', '\r']);
        let cell = column.saturating_sub(1);
        let index = if screen_columns {
            char_index_for_cell(text, cell, self.tab_width)
        } else {
            cell.min(text.chars().count())
        };
        Some(line_start + index)
    }

    fn create_marker(&mut self, buffer: BufferHandle, offset: usize) -> MarkerId {
        let id = MarkerId(self.next_marker);
        self.next_marker += 1;
        self.markers.insert(
            id,
            Marker {
                buffer,
                position: offset,
            },
        );
        id
    }

    fn marker_position(&self, marker: MarkerId) -> Option<usize> {
        let marker = self.markers.get(&marker)?;
        self.buffers
            .contains_key(&marker.buffer)
            .then_some(marker.position)
    }

    fn prompt_for_file(&mut self, filename: &str, searched: &Path) -> Option<PathBuf> {
        self.prompt.as_mut().and_then(|prompt| prompt(filename, searched))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_clamp_and_honor_screen_columns() {
        let mut sources = SourceBuffers::new();
        let buf = sources.open_with_text("/virtual/a.c", "first\n\tx = 1;\nlast");
        assert_eq!(sources.offset_of(buf, 1, None, true), Some(0));
        assert_eq!(sources.offset_of(buf, 2, Some(9), true), Some(7));
        assert_eq!(sources.offset_of(buf, 2, Some(2), false), Some(7));
        assert_eq!(sources.offset_of(buf, 2, Some(99), false), Some(13));
        assert_eq!(sources.offset_of(buf, 99, None, true), Some(14));
    }

    #[test]
    fn markers_follow_edits_and_die_with_the_buffer() {
        let mut sources = SourceBuffers::new();
        let buf = sources.open_with_text("/virtual/b.c", "line one\nline two\n");
        let marker = sources.create_marker(buf, 9);
        sources.insert(buf, 0, "// header\n");
        assert_eq!(sources.marker_position(marker), Some(19));
        sources.delete(buf, 0..10);
        assert_eq!(sources.marker_position(marker), Some(9));
        assert_eq!(sources.line_column(buf, 9), Some((2, 1)));
        sources.kill(buf);
        assert_eq!(sources.marker_position(marker), None);
    }

    #[test]
    fn crlf_is_normalized() {
        let mut sources = SourceBuffers::new();
        let buf = sources.open_with_text("/virtual/c.c", "a\r\nb\r\n");
        assert_eq!(sources.offset_of(buf, 2, Some(1), false), Some(2));
    }
}
