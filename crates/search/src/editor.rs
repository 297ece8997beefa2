//! Token editor
//!
//! Line editor for the search input. Typing whitespace after a token inserts
//! the ` ∧ ` separator instead, so the user sees the AND structure as they
//! type; backspacing over a separator removes the marker together with its
//! leading space in one keystroke.
//!
//! The cursor is a char index and stays where the edit happened.

use crate::query::{Query, CONJUNCTION_MARKER, SEPARATOR};

/// Editable search input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenEditor {
    chars: Vec<char>,
    cursor: usize,
}

impl TokenEditor {
    /// Empty editor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text.
    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    /// Cursor position, in chars from the start.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// True if there is no text.
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// The query the text currently denotes.
    pub fn query(&self) -> Query {
        Query::parse(&self.text())
    }

    fn before_cursor(&self, back: usize) -> Option<char> {
        self.cursor
            .checked_sub(back)
            .and_then(|i| self.chars.get(i))
            .copied()
    }

    /// Type one character. Returns whether the text changed.
    ///
    /// Whitespace right after a token becomes the separator. Whitespace at
    /// the start, after a space or after a marker is ignored.
    pub fn insert_char(&mut self, c: char) -> bool {
        if c.is_whitespace() {
            match self.before_cursor(1) {
                None => false,
                Some(prev) if prev.is_whitespace() || prev == CONJUNCTION_MARKER => false,
                Some(_) => {
                    for (offset, sep) in SEPARATOR.chars().enumerate() {
                        self.chars.insert(self.cursor + offset, sep);
                    }
                    self.cursor += SEPARATOR.chars().count();
                    true
                }
            }
        } else {
            self.chars.insert(self.cursor, c);
            self.cursor += 1;
            true
        }
    }

    /// Type each character of `text` in turn (paste).
    pub fn insert_str(&mut self, text: &str) -> bool {
        let mut changed = false;
        for c in text.chars() {
            changed |= self.insert_char(c);
        }
        changed
    }

    /// Delete backwards from the cursor. Returns the number of chars removed.
    ///
    /// Directly after a marker, the marker and the space before it go. Right
    /// after a full separator (`∧ `, where typing leaves the cursor) the marker
    /// and its leading space go and the trailing space stays.
    pub fn backspace(&mut self) -> usize {
        let Some(prev) = self.before_cursor(1) else {
            return 0;
        };

        let (start, end) = if prev == CONJUNCTION_MARKER {
            let start = if self.before_cursor(2) == Some(' ') {
                self.cursor - 2
            } else {
                self.cursor - 1
            };
            (start, self.cursor)
        } else if prev == ' ' && self.before_cursor(2) == Some(CONJUNCTION_MARKER) {
            let start = if self.before_cursor(3) == Some(' ') {
                self.cursor - 3
            } else {
                self.cursor - 2
            };
            (start, self.cursor - 1)
        } else {
            (self.cursor - 1, self.cursor)
        };

        self.chars.drain(start..end);
        let removed = end - start;
        self.cursor -= removed;
        removed
    }

    /// Delete the char under the cursor. Returns whether anything was removed.
    pub fn delete_forward(&mut self) -> bool {
        if self.cursor < self.chars.len() {
            self.chars.remove(self.cursor);
            true
        } else {
            false
        }
    }

    /// Move one char left.
    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Move one char right.
    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.chars.len());
    }

    /// Move to the start.
    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    /// Move to the end.
    pub fn move_end(&mut self) {
        self.cursor = self.chars.len();
    }

    /// Replace the whole text as if `text` were typed into an empty editor.
    pub fn set_text(&mut self, text: &str) {
        self.clear();
        self.insert_str(text);
    }

    /// Drop all text.
    pub fn clear(&mut self) {
        self.chars.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> TokenEditor {
        let mut editor = TokenEditor::new();
        editor.insert_str(text);
        editor
    }

    #[test]
    fn space_after_token_inserts_separator() {
        let editor = typed("rust server");
        assert_eq!(editor.text(), "rust ∧ server");
        assert_eq!(editor.cursor(), editor.len());
    }

    #[test]
    fn redundant_whitespace_is_ignored() {
        let editor = typed("  rust   server ");
        assert_eq!(editor.text(), "rust ∧ server ∧ ");
    }

    #[test]
    fn backspace_after_separator_keeps_trailing_space() {
        let mut editor = typed("rust ");
        assert_eq!(editor.text(), "rust ∧ ");
        assert_eq!(editor.backspace(), 2);
        assert_eq!(editor.text(), "rust ");
        assert_eq!(editor.cursor(), 5);
        assert_eq!(editor.backspace(), 1);
        assert_eq!(editor.text(), "rust");
    }

    #[test]
    fn backspace_directly_after_marker() {
        let mut editor = typed("rust ");
        editor.move_left();
        assert_eq!(editor.cursor(), 6);
        assert_eq!(editor.backspace(), 2);
        assert_eq!(editor.text(), "rust ");
        assert_eq!(editor.cursor(), 4);
    }

    #[test]
    fn backspace_plain_char() {
        let mut editor = typed("rust");
        assert_eq!(editor.backspace(), 1);
        assert_eq!(editor.text(), "rus");
    }

    #[test]
    fn backspace_at_start_does_nothing() {
        let mut editor = typed("rust");
        editor.move_home();
        assert_eq!(editor.backspace(), 0);
        assert_eq!(editor.text(), "rust");
    }

    #[test]
    fn cursor_stays_at_edit_point() {
        let mut editor = typed("rust server");
        editor.move_home();
        editor.move_right();
        editor.move_right();
        editor.insert_char('x');
        assert_eq!(editor.text(), "ruxst ∧ server");
        assert_eq!(editor.cursor(), 3);
    }

    #[test]
    fn space_in_middle_of_token_splits_it() {
        let mut editor = typed("rustserver");
        for _ in 0..6 {
            editor.move_left();
        }
        editor.insert_char(' ');
        assert_eq!(editor.text(), "rust ∧ server");
        assert_eq!(editor.cursor(), 7);
    }

    #[test]
    fn delete_forward_and_bounds() {
        let mut editor = typed("ab");
        assert!(!editor.delete_forward());
        editor.move_home();
        assert!(editor.delete_forward());
        assert_eq!(editor.text(), "b");
        editor.move_left();
        assert_eq!(editor.cursor(), 0);
        editor.move_end();
        editor.move_right();
        assert_eq!(editor.cursor(), 1);
    }

    #[test]
    fn set_text_normalizes() {
        let mut editor = typed("old");
        editor.set_text("Rust  Server");
        assert_eq!(editor.text(), "Rust ∧ Server");
        assert_eq!(editor.query().module_text(), "rust server");
        editor.clear();
        assert!(editor.is_empty());
        assert_eq!(editor.cursor(), 0);
    }
}
