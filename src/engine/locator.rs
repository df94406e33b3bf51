//! Locating the element that encloses a byte offset.
//!
//! All searches are plain substring searches on the tag text. An open tag
//! is either `<T ` (with attributes) or `<T>`; a close tag is `</T>`. This
//! keeps `w:p` from matching `w:pPr` or `w:proofErr`.

use super::{Direction, Span};
use crate::markup::{close_tag, open_tag_bare, open_tag_with_attrs};

/// Largest char boundary not after `offset`.
fn floor_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Start of the nearest open tag `<T ...>` that begins before `offset`.
pub fn find_open_left(text: &str, tag: &str, offset: usize) -> Option<usize> {
    let head = &text[..floor_boundary(text, offset)];
    let with_attrs = head.rfind(&open_tag_with_attrs(tag));
    let bare = head.rfind(&open_tag_bare(tag));
    with_attrs.max(bare)
}

/// Start of the nearest open tag `<T ...>` at or after `offset`.
pub fn find_open_right(text: &str, tag: &str, offset: usize) -> Option<usize> {
    let from = floor_boundary(text, offset);
    let tail = &text[from..];
    let with_attrs = tail.find(&open_tag_with_attrs(tag));
    let bare = tail.find(&open_tag_bare(tag));
    let nearest = match (with_attrs, bare) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    nearest.map(|pos| from + pos)
}

/// Offset just past the nearest `</T>` that ends at or before `offset`.
pub fn find_close_left(text: &str, tag: &str, offset: usize) -> Option<usize> {
    let close = close_tag(tag);
    let head = &text[..floor_boundary(text, offset)];
    head.rfind(&close).map(|pos| pos + close.len())
}

/// Offset just past the nearest `</T>` at or after `offset`.
pub fn find_close_right(text: &str, tag: &str, offset: usize) -> Option<usize> {
    let close = close_tag(tag);
    let from = floor_boundary(text, offset);
    text[from..]
        .find(&close)
        .map(|pos| from + pos + close.len())
}

/// Span of the `<T>...</T>` element around `offset`, searched in `direction`.
///
/// `Around` only accepts an element that really encloses `offset`: no
/// `</T>` may sit between the open tag and the offset. For `Right` and
/// `Left` both boundaries are first searched from `offset`; if the open tag
/// does not come before the close tag, the boundary on the far side is
/// searched again from the other one.
pub fn locate(text: &str, tag: &str, offset: usize, direction: Direction) -> Option<Span> {
    let (start, end) = match direction {
        Direction::Around => return enclosing(text, tag, offset),
        Direction::Right => (
            find_open_right(text, tag, offset),
            find_close_right(text, tag, offset),
        ),
        Direction::Left => (
            find_open_left(text, tag, offset),
            find_close_left(text, tag, offset),
        ),
    };

    match (start, end) {
        (Some(start), Some(end)) if start < end => Some(Span::new(start, end)),
        (Some(start), _) if direction == Direction::Right => {
            find_close_right(text, tag, start).map(|end| Span::new(start, end))
        }
        (_, Some(end)) if direction == Direction::Left => {
            find_open_left(text, tag, end).map(|start| Span::new(start, end))
        }
        _ => None,
    }
}

/// The element whose open tag precedes `offset` and is not closed before it.
fn enclosing(text: &str, tag: &str, offset: usize) -> Option<Span> {
    let start = find_open_left(text, tag, offset)?;
    if find_close_left(text, tag, offset).is_some_and(|closed| closed > start) {
        return None;
    }
    let end = find_close_right(text, tag, offset)?;
    Some(Span::new(start, end))
}
