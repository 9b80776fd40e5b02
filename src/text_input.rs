use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

const CURSOR: char = '|';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputResult {
    Edited,
    Moved,
    Submitted,
    /// Esc: the field lost focus.
    Left,
    Ignored,
}

/// Single- or multi-line text field with a character cursor.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    value: String,
    /// Cursor position in characters.
    cursor: usize,
    multiline: bool,
    masked: bool,
}

impl TextInput {
    pub fn new(value: &str) -> Self {
        TextInput {
            value: value.to_string(),
            cursor: value.chars().count(),
            multiline: false,
            masked: false,
        }
    }

    pub fn multiline(mut self) -> Self {
        self.multiline = true;
        self
    }

    pub fn masked(mut self) -> Self {
        self.masked = true;
        self
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    fn byte_index(&self, chars: usize) -> usize {
        self.value
            .char_indices()
            .nth(chars)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    fn len(&self) -> usize {
        self.value.chars().count()
    }

    fn insert(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> InputResult {
        match key.code {
            KeyCode::Esc => InputResult::Left,
            KeyCode::Enter if self.multiline && !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.insert('\n');
                InputResult::Edited
            }
            KeyCode::Enter => InputResult::Submitted,
            KeyCode::Char(c) => {
                self.insert(c);
                InputResult::Edited
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    let at = self.byte_index(self.cursor - 1);
                    self.value.remove(at);
                    self.cursor -= 1;
                    InputResult::Edited
                } else {
                    InputResult::Ignored
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.len() {
                    let at = self.byte_index(self.cursor);
                    self.value.remove(at);
                    InputResult::Edited
                } else {
                    InputResult::Ignored
                }
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                InputResult::Moved
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.len());
                InputResult::Moved
            }
            KeyCode::Home => {
                self.cursor = 0;
                InputResult::Moved
            }
            KeyCode::End => {
                self.cursor = self.len();
                InputResult::Moved
            }
            _ => InputResult::Ignored,
        }
    }

    /// Text to draw, with the cursor marker when `show_cursor` is set.
    pub fn display(&self, show_cursor: bool) -> String {
        let mut shown = if self.masked {
            "*".repeat(self.len())
        } else {
            self.value.clone()
        };
        if show_cursor {
            let at = shown
                .char_indices()
                .nth(self.cursor)
                .map(|(i, _)| i)
                .unwrap_or(shown.len());
            shown.insert(at, CURSOR);
        }
        shown
    }
}
