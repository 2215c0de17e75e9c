use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Editable text with a byte cursor that always sits on a grapheme boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextField {
    buffer: String,
    cursor: usize,
    multiline: bool,
}

impl TextField {
    pub fn single_line() -> Self {
        Self::default()
    }

    pub fn multi_line() -> Self {
        Self {
            multiline: true,
            ..Self::default()
        }
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Replaces the contents and parks the cursor at the end.
    pub fn reset(&mut self, value: &str) {
        self.buffer = value.to_owned();
        self.cursor = self.buffer.len();
    }

    pub fn insert_char(&mut self, ch: char) -> bool {
        if ch == '\n' && !self.multiline {
            return false;
        }
        let mut scratch = [0u8; 4];
        let encoded = ch.encode_utf8(&mut scratch);
        self.buffer.insert_str(self.cursor, encoded);
        self.cursor += encoded.len();
        true
    }

    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let prev = prev_grapheme_boundary(&self.buffer, self.cursor);
        self.buffer.drain(prev..self.cursor);
        self.cursor = prev;
        true
    }

    pub fn delete(&mut self) -> bool {
        let next = next_grapheme_boundary(&self.buffer, self.cursor);
        if next == self.cursor {
            return false;
        }
        self.buffer.drain(self.cursor..next);
        true
    }

    pub fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor = prev_grapheme_boundary(&self.buffer, self.cursor);
        true
    }

    pub fn move_right(&mut self) -> bool {
        let next = next_grapheme_boundary(&self.buffer, self.cursor);
        if next == self.cursor {
            return false;
        }
        self.cursor = next;
        true
    }

    pub fn move_home(&mut self) -> bool {
        let start = line_start(&self.buffer, self.cursor);
        let moved = start != self.cursor;
        self.cursor = start;
        moved
    }

    pub fn move_end(&mut self) -> bool {
        let end = line_end(&self.buffer, self.cursor);
        let moved = end != self.cursor;
        self.cursor = end;
        moved
    }

    /// Display row and column of the cursor, counting terminal cells.
    pub fn cursor_cell(&self) -> (u16, u16) {
        let before = &self.buffer[..self.cursor];
        let row = before.matches('\n').count();
        let start = line_start(&self.buffer, self.cursor);
        let col = UnicodeWidthStr::width(&self.buffer[start..self.cursor]);
        (row as u16, col as u16)
    }
}

fn prev_grapheme_boundary(text: &str, cursor: usize) -> usize {
    text[..cursor]
        .grapheme_indices(true)
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_grapheme_boundary(text: &str, cursor: usize) -> usize {
    if cursor >= text.len() {
        return text.len();
    }
    match text[cursor..].graphemes(true).next() {
        Some(grapheme) => cursor + grapheme.len(),
        None => text.len(),
    }
}

fn line_start(text: &str, cursor: usize) -> usize {
    text[..cursor].rfind('\n').map(|idx| idx + 1).unwrap_or(0)
}

fn line_end(text: &str, cursor: usize) -> usize {
    text[cursor..]
        .find('\n')
        .map(|idx| cursor + idx)
        .unwrap_or(text.len())
}
