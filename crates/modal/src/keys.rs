//! Key events the controller understands

/// A key, independent of any terminal or windowing library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A printable character (including space)
    Char(char),
    /// Delete backwards
    Backspace,
    /// Delete forwards
    Delete,
    /// Cursor left
    Left,
    /// Cursor right
    Right,
    /// Cursor to start
    Home,
    /// Cursor to end
    End,
    /// Select the previous result
    Up,
    /// Select the next result
    Down,
    /// Activate the selected result
    Enter,
    /// Close the modal
    Escape,
}

/// Modifier keys held during a key press.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Control
    pub ctrl: bool,
    /// Command / super
    pub meta: bool,
    /// Alt / option
    pub alt: bool,
}

impl Modifiers {
    /// No modifiers.
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        meta: false,
        alt: false,
    };

    /// Any modifier that turns a character into a command.
    pub fn is_command(&self) -> bool {
        self.ctrl || self.meta || self.alt
    }
}

/// A key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// The key
    pub key: Key,
    /// Held modifiers
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// Key press without modifiers.
    pub fn plain(key: Key) -> Self {
        KeyEvent {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    /// Ctrl + `c`.
    pub fn ctrl(c: char) -> Self {
        KeyEvent {
            key: Key::Char(c),
            modifiers: Modifiers {
                ctrl: true,
                ..Modifiers::NONE
            },
        }
    }

    /// Cmd + `c`.
    pub fn meta(c: char) -> Self {
        KeyEvent {
            key: Key::Char(c),
            modifiers: Modifiers {
                meta: true,
                ..Modifiers::NONE
            },
        }
    }

    /// Ctrl+K or Cmd+K.
    pub fn is_open_shortcut(&self) -> bool {
        matches!(self.key, Key::Char('k') | Key::Char('K'))
            && (self.modifiers.ctrl || self.modifiers.meta)
    }
}

impl From<Key> for KeyEvent {
    fn from(key: Key) -> Self {
        KeyEvent::plain(key)
    }
}

/// What a key press did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Nothing changed
    Ignored,
    /// The modal opened
    Opened,
    /// The modal closed
    Closed,
    /// The input text changed and a search ran
    Edited,
    /// The cursor or selection moved
    Moved,
    /// A result was activated; navigate to this link
    Activated(String),
}
