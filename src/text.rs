/// Offset ↔ position mapping over a `Rope`.
///
/// Offsets are char indices; LSP positions use UTF-16 columns.
use ropey::Rope;
use tower_lsp::lsp_types::{Position, Range, TextDocumentContentChangeEvent};

use crate::scanner::Span;

/// Map a char offset to an LSP position. Offsets past the end clamp to the end.
pub(crate) fn position_at(rope: &Rope, offset: usize) -> Position {
    let offset = offset.min(rope.len_chars());
    let line = rope.char_to_line(offset);
    let line_start = rope.line_to_char(line);
    let column = rope.char_to_utf16_cu(offset) - rope.char_to_utf16_cu(line_start);
    Position::new(line as u32, column as u32)
}

/// Map an LSP position to a char offset, clamping to the line's content.
pub(crate) fn offset_at(rope: &Rope, position: Position) -> usize {
    let line = position.line as usize;
    if line >= rope.len_lines() {
        return rope.len_chars();
    }
    let line_start = rope.line_to_char(line);
    let line_end = line_start + content_len(rope, line);
    let start_cu = rope.char_to_utf16_cu(line_start);
    let end_cu = rope.char_to_utf16_cu(line_end);
    let target = (start_cu + position.character as usize).min(end_cu);
    rope.utf16_cu_to_char(target)
}

pub(crate) fn range_of(rope: &Rope, span: &Span) -> Range {
    Range::new(position_at(rope, span.start), position_at(rope, span.end))
}

/// Apply one `didChange` content change to the rope.
pub(crate) fn apply_change(rope: &mut Rope, change: TextDocumentContentChangeEvent) {
    match change.range {
        Some(range) => {
            let start = offset_at(rope, range.start);
            let end = offset_at(rope, range.end).max(start);
            rope.remove(start..end);
            rope.insert(start, &change.text);
        }
        None => *rope = Rope::from_str(&change.text),
    }
}

/// Char length of a line without its line terminator.
fn content_len(rope: &Rope, line: usize) -> usize {
    let slice = rope.line(line);
    let mut len = slice.len_chars();
    if len > 0 && slice.char(len - 1) == '\n' {
        len -= 1;
    }
    if len > 0 && slice.char(len - 1) == '\r' {
        len -= 1;
    }
    len
}
