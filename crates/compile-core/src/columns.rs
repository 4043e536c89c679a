//! Screen-column measurement.
//!
//! Many tools report columns as terminal cells rather than characters: a tab advances to the
//! next tab stop and East Asian wide characters take two cells.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

/// Default tab stop width used for screen columns.
pub const DEFAULT_TAB_WIDTH: usize = 8;

/// Cell width of a single character (UAX #11); control characters count as one cell.
pub fn char_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(1)
}

/// Cell width of `ch` when it starts at cell `x` of its line.
pub fn cell_width_at(ch: char, x: usize, tab_width: usize) -> usize {
    if ch == '\t' {
        let tab_width = tab_width.max(1);
        tab_width - x % tab_width
    } else {
        char_width(ch)
    }
}

/// Total cell width of `text`, assuming it starts at cell 0.
pub fn str_width(text: &str, tab_width: usize) -> usize {
    text.chars()
        .fold(0usize, |x, ch| x.saturating_add(cell_width_at(ch, x, tab_width)))
}

/// Char index within `line` of the grapheme that covers screen cell `cell` (0-based).
///
/// A cell in the middle of a wide character or tab maps to that character. Cells past the end
/// of the line map to the line's char length.
pub fn char_index_for_cell(line: &str, cell: usize, tab_width: usize) -> usize {
    let mut x = 0usize;
    let mut chars = 0usize;
    for grapheme in line.graphemes(true) {
        let width = grapheme
            .chars()
            .next()
            .map_or(0, |ch| cell_width_at(ch, x, tab_width));
        if x + width > cell {
            return chars;
        }
        x += width;
        chars += grapheme.chars().count();
    }
    chars
}
