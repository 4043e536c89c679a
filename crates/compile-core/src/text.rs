//! Char/byte offset bookkeeping for a parsed span of output text.

/// A slice of the output text together with its position in the whole buffer.
///
/// Regex matching works on byte offsets inside `text`; everything outside the core works on
/// char offsets into the whole buffer. [`TextSpan::char_offset`] converts between the two.
#[derive(Debug)]
pub(crate) struct TextSpan<'a> {
    text: &'a str,
    base: usize,
    char_to_byte: Vec<usize>,
}

impl<'a> TextSpan<'a> {
    /// `base` is the char offset of `text`'s first character in the buffer.
    pub(crate) fn new(text: &'a str, base: usize) -> Self {
        let mut char_to_byte: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        char_to_byte.push(text.len());
        Self {
            text,
            base,
            char_to_byte,
        }
    }

    pub(crate) fn text(&self) -> &'a str {
        self.text
    }

    /// Buffer char offset of a byte offset within the span.
    pub(crate) fn char_offset(&self, byte_offset: usize) -> usize {
        let clamped = byte_offset.min(self.text.len());
        let local = match self.char_to_byte.binary_search(&clamped) {
            Ok(idx) | Err(idx) => idx,
        };
        self.base + local
    }

    /// Byte offset within the span of a buffer char offset.
    pub(crate) fn byte_offset(&self, char_offset: usize) -> usize {
        let local = char_offset.saturating_sub(self.base);
        self.char_to_byte
            .get(local)
            .copied()
            .unwrap_or(self.text.len())
    }

    /// Buffer char range of a byte range within the span.
    pub(crate) fn char_range(&self, bytes: std::ops::Range<usize>) -> std::ops::Range<usize> {
        self.char_offset(bytes.start)..self.char_offset(bytes.end)
    }
}

/// Char length of the longest prefix of `text` that ends with a newline.
pub(crate) fn terminated_prefix_len(text: &str) -> usize {
    match text.rfind('\n') {
        Some(byte) => text[..=byte].chars().count(),
        None => 0,
    }
}

/// Byte offset just past the line that contains byte `end - 1`, or `end` itself when the match
/// already stopped at a newline.
pub(crate) fn line_end_after(text: &str, end: usize) -> usize {
    if end == 0 || text[..end].ends_with('\n') {
        return end;
    }
    text[end..].find('\n').map_or(text.len(), |i| end + i + 1)
}

/// Byte offset where the last `lines` lines of a newline-terminated `text` begin.
pub(crate) fn tail_lines_start(text: &str, lines: usize) -> usize {
    let mut start = text.len();
    for _ in 0..lines {
        if start == 0 {
            break;
        }
        start = text[..start - 1].rfind('\n').map_or(0, |i| i + 1);
    }
    start
}
