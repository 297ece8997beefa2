//! Query language
//!
//! A query is a list of tokens combined with AND. Tokens are runs of
//! non-whitespace characters, lowercased. The conjunction marker `∧` is
//! display sugar the token editor inserts between tokens; it never ends up
//! inside a token.
//!
//! The same query has two renderings: the text sent to the module (tokens
//! joined by a single space) and the display text (tokens joined by ` ∧ `).

use std::fmt;

/// Marker shown between tokens.
pub const CONJUNCTION_MARKER: char = '∧';

/// What the editor inserts when a token ends.
pub const SEPARATOR: &str = " ∧ ";

/// A single search term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(String);

impl Token {
    /// Build a token, lowercasing `text`.
    ///
    /// Returns `None` if `text` is empty or contains whitespace or the
    /// conjunction marker.
    pub fn new(text: &str) -> Option<Token> {
        if text.is_empty() || text.chars().any(is_boundary) {
            return None;
        }
        Some(Token(text.to_lowercase()))
    }

    /// The token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_boundary(c: char) -> bool {
    c.is_whitespace() || c == CONJUNCTION_MARKER
}

/// Split text into tokens.
///
/// - Lowercase
/// - Split on whitespace and conjunction markers
/// - Drop empty pieces
///
/// # Example
///
/// ```
/// use sift_search::query::tokenize;
///
/// let tokens = tokenize("Rust ∧ Server");
/// assert_eq!(tokens.len(), 2);
/// assert_eq!(tokens[0].as_str(), "rust");
/// ```
pub fn tokenize(text: &str) -> Vec<Token> {
    text.to_lowercase()
        .split(is_boundary)
        .filter(|s| !s.is_empty())
        .map(|s| Token(s.to_string()))
        .collect()
}

/// Join tokens for display, separated by ` ∧ `.
///
/// # Example
///
/// ```
/// use sift_search::query::{join, tokenize};
///
/// assert_eq!(join(&tokenize("rust  server")), "rust ∧ server");
/// ```
pub fn join(tokens: &[Token]) -> String {
    join_with(tokens, SEPARATOR)
}

fn join_with(tokens: &[Token], separator: &str) -> String {
    tokens
        .iter()
        .map(Token::as_str)
        .collect::<Vec<_>>()
        .join(separator)
}

/// A parsed AND query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    tokens: Vec<Token>,
}

impl Query {
    /// Parse raw input, editor text or display text alike.
    pub fn parse(text: &str) -> Self {
        Query {
            tokens: tokenize(text.trim()),
        }
    }

    /// Build a query from tokens.
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        Query { tokens }
    }

    /// The tokens, in input order.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// True if there is nothing to search for.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Text handed to the module: tokens separated by single spaces.
    pub fn module_text(&self) -> String {
        join_with(&self.tokens, " ")
    }

    /// Text shown to the user: tokens separated by ` ∧ `.
    pub fn display(&self) -> String {
        join(&self.tokens)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}
