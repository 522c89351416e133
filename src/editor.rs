// ABOUTME: Editor capability interface the upload flows operate through
// ABOUTME: Provides an in-memory editor with cursor, selection and scroll state

/// A cursor position; `ch` is a byte offset within the line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub ch: usize,
}

impl Position {
    pub fn new(line: usize, ch: usize) -> Self {
        Self { line, ch }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollInfo {
    pub left: f64,
    pub top: f64,
}

/// What the host editor exposes to the upload flows
pub trait Editor {
    fn value(&self) -> String;
    /// Replace the whole document; hosts reset cursor and scroll when doing so
    fn set_value(&mut self, value: &str);
    fn cursor(&self) -> Position;
    fn set_cursor(&mut self, pos: Position);
    fn scroll_info(&self) -> ScrollInfo;
    fn scroll_to(&mut self, left: f64, top: f64);
    fn selection(&self) -> String;
    /// Replace the selection (or insert at the cursor) and leave the cursor after the text
    fn replace_selection(&mut self, text: &str);
    fn replace_range(&mut self, text: &str, from: Position, to: Position);
}

/// Editor backed by a string, used by the CLI host and in tests
#[derive(Debug, Clone, Default)]
pub struct MemoryEditor {
    text: String,
    cursor: Position,
    anchor: Option<Position>,
    scroll: ScrollInfo,
}

impl MemoryEditor {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Select the first occurrence of `needle`; returns false if absent
    pub fn select_text(&mut self, needle: &str) -> bool {
        match self.text.find(needle) {
            Some(start) if !needle.is_empty() => {
                self.anchor = Some(offset_to_position(&self.text, start));
                self.cursor = offset_to_position(&self.text, start + needle.len());
                true
            }
            _ => false,
        }
    }

    fn selection_range(&self) -> (usize, usize) {
        let cursor = position_to_offset(&self.text, self.cursor);
        match self.anchor {
            Some(anchor) => {
                let anchor = position_to_offset(&self.text, anchor);
                (anchor.min(cursor), anchor.max(cursor))
            }
            None => (cursor, cursor),
        }
    }
}

impl Editor for MemoryEditor {
    fn value(&self) -> String {
        self.text.clone()
    }

    fn set_value(&mut self, value: &str) {
        self.text = value.to_string();
        self.cursor = Position::default();
        self.anchor = None;
        self.scroll = ScrollInfo::default();
    }

    fn cursor(&self) -> Position {
        self.cursor
    }

    fn set_cursor(&mut self, pos: Position) {
        let offset = position_to_offset(&self.text, pos);
        self.cursor = offset_to_position(&self.text, offset);
        self.anchor = None;
    }

    fn scroll_info(&self) -> ScrollInfo {
        self.scroll
    }

    fn scroll_to(&mut self, left: f64, top: f64) {
        self.scroll = ScrollInfo { left, top };
    }

    fn selection(&self) -> String {
        let (start, end) = self.selection_range();
        self.text[start..end].to_string()
    }

    fn replace_selection(&mut self, text: &str) {
        let (start, end) = self.selection_range();
        self.text.replace_range(start..end, text);
        self.anchor = None;
        self.cursor = offset_to_position(&self.text, start + text.len());
    }

    fn replace_range(&mut self, text: &str, from: Position, to: Position) {
        let start = position_to_offset(&self.text, from);
        let end = position_to_offset(&self.text, to).max(start);
        let cursor = position_to_offset(&self.text, self.cursor);

        self.text.replace_range(start..end, text);

        // Keep the cursor on the same content when the edit happened before it
        let cursor = if cursor >= end {
            cursor - (end - start) + text.len()
        } else if cursor > start {
            start + text.len()
        } else {
            cursor
        };
        self.cursor = offset_to_position(&self.text, cursor);
        self.anchor = None;
    }
}

/// Byte offset of a position, clamped to the document and to char boundaries
pub fn position_to_offset(text: &str, pos: Position) -> usize {
    let mut offset = 0;
    for (i, line) in text.split('\n').enumerate() {
        if i == pos.line {
            let mut ch = pos.ch.min(line.len());
            while !line.is_char_boundary(ch) {
                ch -= 1;
            }
            return offset + ch;
        }
        offset += line.len() + 1;
    }
    text.len()
}

pub fn offset_to_position(text: &str, offset: usize) -> Position {
    let offset = offset.min(text.len());
    let before = &text[..offset];
    let line = before.matches('\n').count();
    let ch = match before.rfind('\n') {
        Some(i) => offset - i - 1,
        None => offset,
    };
    Position { line, ch }
}
