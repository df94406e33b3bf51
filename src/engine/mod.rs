//! Text-offset template engine.
//!
//! Every operation works on the raw XML text of a part. Offsets are byte
//! offsets into the current string and are recomputed after each mutation;
//! a [`Span`] is never reused once the text it was computed on has changed.

pub mod blocks;
pub mod locator;
pub mod macros;
pub mod segment;

use crate::error::{Error, Result};

/// Direction in which the enclosing element of a macro is searched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Open tag to the left of the macro, close tag to the right
    #[default]
    Around,
    /// Element starting after the macro
    Right,
    /// Element ending before the macro
    Left,
}

/// Half-open byte range `[start, end)` into a part's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Span from `start` up to, not including, `end`.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Slice of `text` covered by this span.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the span covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Outcome of a locate or mutate operation.
///
/// The two miss variants keep apart "nothing matched" from "the macro is
/// there but not inside a usable element". [`Located::found`] hands the
/// miss back as `None`; [`Located::or_fail`] turns it into an [`Error`].
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located<T> {
    /// The operation found its target
    Found(T),
    /// The macro does not occur in the part
    MacroNotFound(String),
    /// The macro occurs but no enclosing element was found
    TagNotFound { tag: String, needle: String },
}

impl<T> Located<T> {
    /// Whether the target was found.
    pub fn is_found(&self) -> bool {
        matches!(self, Located::Found(_))
    }

    /// Whether the macro is absent from the part.
    pub fn is_macro_missing(&self) -> bool {
        matches!(self, Located::MacroNotFound(_))
    }

    /// Whether the macro is present but has no enclosing element.
    pub fn is_tag_missing(&self) -> bool {
        matches!(self, Located::TagNotFound { .. })
    }

    /// The found value, or `None` on either kind of miss.
    pub fn found(self) -> Option<T> {
        match self {
            Located::Found(value) => Some(value),
            _ => None,
        }
    }

    /// The found value, or an error naming the missing macro or element.
    pub fn or_fail(self) -> Result<T> {
        match self {
            Located::Found(value) => Ok(value),
            Located::MacroNotFound(needle) => Err(Error::MacroNotFound(needle)),
            Located::TagNotFound { tag, needle } => Err(Error::TagNotFound { tag, needle }),
        }
    }

    /// Transform the found value, keeping a miss as it is.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Located<U> {
        match self {
            Located::Found(value) => Located::Found(f(value)),
            Located::MacroNotFound(needle) => Located::MacroNotFound(needle),
            Located::TagNotFound { tag, needle } => Located::TagNotFound { tag, needle },
        }
    }

    /// Chain a follow-up step that only runs when this one found its target.
    pub fn and_then<U, F: FnOnce(T) -> Located<U>>(self, f: F) -> Located<U> {
        match self {
            Located::Found(value) => f(value),
            Located::MacroNotFound(needle) => Located::MacroNotFound(needle),
            Located::TagNotFound { tag, needle } => Located::TagNotFound { tag, needle },
        }
    }
}
