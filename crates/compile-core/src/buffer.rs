//! Collaborator contracts.
//!
//! The core never owns the text surfaces it works on. The embedder provides the output buffer
//! (where tool output accumulates) and the source files (where messages point to) through the
//! traits below. [`OutputLog`](crate::OutputLog) and [`SourceBuffers`](crate::SourceBuffers)
//! are in-memory implementations.

use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::message::Severity;

/// Opaque handle to a source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u64);

/// Opaque handle to a position marker inside a source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u64);

/// Display-relevant data mirrored onto the output buffer for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Message severity.
    pub severity: Severity,
    /// File name as written (or inherited).
    pub filename: String,
    /// 1-based line.
    pub line: Option<usize>,
    /// 1-based column.
    pub column: Option<usize>,
}

/// The text buffer that receives tool output.
///
/// All offsets are char offsets.
pub trait OutputBuffer {
    /// Current length in chars.
    fn len_chars(&self) -> usize;

    /// Text of `range` (clamped to the buffer).
    fn read(&self, range: Range<usize>) -> String;

    /// Mark `range` (a message's hyperlink span) with `annotation`.
    fn annotate(&mut self, range: Range<usize>, annotation: &Annotation);

    /// Remove every annotation overlapping `range`.
    fn clear_annotations(&mut self, range: Range<usize>);

    /// First offset not covered by a pre-existing annotated prefix.
    ///
    /// Parsing starts here when a driver is attached to a buffer that already carries
    /// annotations (for example a restored session).
    fn first_unannotated(&self) -> usize {
        0
    }
}

/// Source buffers and edit-resilient position markers.
pub trait SourceFiles {
    /// Open (or find the already open) buffer visiting `path`.
    fn open_or_find(&mut self, path: &Path) -> Option<BufferHandle>;

    /// Char offset of 1-based `line` and `column` in `buffer`.
    ///
    /// With `screen_columns`, the column counts display cells. Out-of-range lines and columns
    /// clamp to the end of the buffer or line. `None` means the buffer is gone.
    fn offset_of(
        &self,
        buffer: BufferHandle,
        line: usize,
        column: Option<usize>,
        screen_columns: bool,
    ) -> Option<usize>;

    /// Create a marker at `offset`; it follows later edits of the buffer.
    fn create_marker(&mut self, buffer: BufferHandle, offset: usize) -> MarkerId;

    /// Current position of `marker`, or `None` if it died with its buffer.
    fn marker_position(&self, marker: MarkerId) -> Option<usize>;

    /// Ask the user where `filename` is, after a lookup of `searched` failed.
    fn prompt_for_file(&mut self, filename: &str, searched: &Path) -> Option<PathBuf> {
        let _ = (filename, searched);
        None
    }
}
