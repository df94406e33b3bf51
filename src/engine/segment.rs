//! The segment primitive behind every row, block and segment operation.
//!
//! A segment is the element of a given tag that encloses a macro. It is
//! located, optionally adjusted by a hook, and then either returned,
//! deleted, replaced or cloned in place.

use super::locator;
use super::macros::index_cloned_variables;
use super::{Direction, Located, Span};

/// What to do with a located segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Leave the part untouched
    Get,
    /// Remove the segment
    Delete,
    /// Put the given XML in place of the segment
    Replace(String),
    /// Put `count` copies of the segment in its place, renumbering the
    /// macros of copy `i` to `${NAME#i}` when `renumber` is set
    Clone { count: usize, renumber: bool },
}

/// Answer of a segment hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The span was adjusted; call the hook again
    Again,
    /// Apply this action to the current span
    Apply(Action),
}

/// Find `needle` in `text` and the `tag` element enclosing it.
pub fn locate_segment(text: &str, needle: &str, tag: &str, direction: Direction) -> Located<Span> {
    let Some(pos) = (!needle.is_empty()).then(|| text.find(needle)).flatten() else {
        log::warn!("macro {} not found", needle);
        return Located::MacroNotFound(needle.to_string());
    };

    match locator::locate(text, tag, pos, direction) {
        Some(span) => {
            log::debug!("{} in <{}> at {}..{}", needle, tag, span.start, span.end);
            Located::Found(span)
        }
        None => {
            log::warn!("no <{}> element encloses {}", tag, needle);
            Located::TagNotFound {
                tag: tag.to_string(),
                needle: needle.to_string(),
            }
        }
    }
}

/// Locate the segment and apply `action` to it.
///
/// Returns the segment text as it was before the action.
pub fn process(
    part: &mut String,
    needle: &str,
    tag: &str,
    direction: Direction,
    action: Action,
) -> Located<String> {
    process_with(part, needle, tag, direction, |_, _| Step::Apply(action.clone()))
}

/// Locate the segment, let `hook` adjust it, then apply the action the hook
/// settles on.
///
/// The hook receives the whole part and the current span. It is called
/// again for as long as it answers [`Step::Again`], so it must move the span
/// on each such call.
pub fn process_with<F>(
    part: &mut String,
    needle: &str,
    tag: &str,
    direction: Direction,
    mut hook: F,
) -> Located<String>
where
    F: FnMut(&str, &mut Span) -> Step,
{
    let mut span = match locate_segment(part, needle, tag, direction) {
        Located::Found(span) => span,
        miss => return miss.map(|_| String::new()),
    };

    let action = loop {
        match hook(part.as_str(), &mut span) {
            Step::Again => continue,
            Step::Apply(action) => break action,
        }
    };
    debug_assert!(span.start <= span.end && span.end <= part.len());

    Located::Found(apply(part, span, action))
}

/// Apply `action` to `span` of `part`. Returns the original segment text.
pub fn apply(part: &mut String, span: Span, action: Action) -> String {
    let segment = span.slice(part).to_string();
    match action {
        Action::Get => {}
        Action::Delete => part.replace_range(span.start..span.end, ""),
        Action::Replace(xml) => part.replace_range(span.start..span.end, &xml),
        Action::Clone { count, renumber } => {
            let copies = if renumber {
                index_cloned_variables(count, &segment)
            } else {
                vec![segment.clone(); count]
            };
            part.replace_range(span.start..span.end, &copies.concat());
        }
    }
    segment
}
