//! Table-row and named-block operations on top of the segment primitive.

use super::locator;
use super::macros::{block_close_token, ensure_macro_completed, index_cloned_variables, macro_name};
use super::segment::{self, Action, Step};
use super::{Direction, Located, Span};
use crate::markup::{Markup, RowSpanMarker};
use regex::Regex;
use std::sync::LazyLock;

static VMERGE_RESTART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<w:vMerge\s+w:val="restart"\s*/>"#).expect("valid restart pattern")
});

static VMERGE_CONTINUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<w:vMerge\s*/>|<w:vMerge\s+w:val="continue"\s*/>"#)
        .expect("valid continue pattern")
});

static ROWS_SPANNED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"table:number-rows-spanned="(\d+)""#).expect("valid rows-spanned pattern")
});

/// How far a located row extends into its following siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpanRule {
    /// Single row
    None,
    /// Fold in following rows while they carry a continue marker
    WhileContinued,
    /// Fold in this many following rows
    Rows(usize),
}

fn span_rule(markup: &Markup, row: &str) -> SpanRule {
    match markup.row_span {
        RowSpanMarker::VerticalMerge => {
            if VMERGE_RESTART.is_match(row) {
                SpanRule::WhileContinued
            } else {
                SpanRule::None
            }
        }
        RowSpanMarker::RowsSpanned => {
            let spanned = ROWS_SPANNED
                .captures_iter(row)
                .filter_map(|caps| caps[1].parse::<usize>().ok())
                .max()
                .unwrap_or(1);
            if spanned > 1 {
                SpanRule::Rows(spanned - 1)
            } else {
                SpanRule::None
            }
        }
    }
}

/// The next sibling row after `from`, if one follows inside the same table.
fn next_row(text: &str, markup: &Markup, from: usize) -> Option<Span> {
    let start = locator::find_open_right(text, markup.row, from)?;
    if text[from..start].contains(&markup.table_close()) {
        return None;
    }
    let end = locator::find_close_right(text, markup.row, start)?;
    Some(Span::new(start, end))
}

/// Row-span extension state, decided from the first located row.
struct RowSpanner<'m> {
    markup: &'m Markup,
    rule: Option<SpanRule>,
}

impl<'m> RowSpanner<'m> {
    fn new(markup: &'m Markup) -> Self {
        Self { markup, rule: None }
    }

    /// Fold one more row into `span`. Returns false once the span is complete.
    fn extend(&mut self, text: &str, span: &mut Span) -> bool {
        let markup = self.markup;
        let rule = *self
            .rule
            .get_or_insert_with(|| span_rule(markup, span.slice(text)));

        let next = match rule {
            SpanRule::None | SpanRule::Rows(0) => None,
            SpanRule::WhileContinued => next_row(text, markup, span.end)
                .filter(|row| VMERGE_CONTINUE.is_match(row.slice(text))),
            SpanRule::Rows(remaining) => {
                let next = next_row(text, markup, span.end);
                self.rule = Some(SpanRule::Rows(remaining - 1));
                next
            }
        };

        match next {
            Some(row) => {
                span.end = row.end;
                true
            }
            None => false,
        }
    }
}

/// Locate the row holding `needle`, extended over any rows its cells span.
pub fn locate_row(text: &str, markup: &Markup, needle: &str) -> Located<Span> {
    segment::locate_segment(text, needle, markup.row, Direction::Around).map(|mut span| {
        let mut spanner = RowSpanner::new(markup);
        while spanner.extend(text, &mut span) {}
        span
    })
}

/// Apply `action` to the row holding `needle`, extended over spanned rows.
/// Returns the row XML as it was before the action.
pub fn process_row(part: &mut String, markup: &Markup, needle: &str, action: Action) -> Located<String> {
    let mut spanner = RowSpanner::new(markup);
    segment::process_with(part, needle, markup.row, Direction::Around, |text, span| {
        if spanner.extend(text, span) {
            Step::Again
        } else {
            Step::Apply(action.clone())
        }
    })
}

/// Spans of a named block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpans {
    /// Everything the block occupies, delimiters included
    pub outer: Span,
    /// Content between the delimiters
    pub inner: Span,
    /// Both delimiters sit in one paragraph
    pub inline: bool,
}

/// Locate the block delimited by `${NAME}` and `${/NAME}`.
///
/// When the delimiters are in different paragraphs, the block is
/// paragraph-level: the outer span runs from the start of the opening
/// macro's paragraph to the end of the closing macro's paragraph, and the
/// content is the paragraphs strictly between. When both are in the same
/// paragraph the block is inline: the outer span runs from the opening
/// macro to the end of the closing macro, and the content is the text
/// between them.
pub fn locate_block(text: &str, markup: &Markup, name: &str) -> Located<BlockSpans> {
    let name = macro_name(name);
    let open = ensure_macro_completed(name);
    let close = block_close_token(name);

    let Some(open_pos) = text.find(&open) else {
        log::warn!("block {} not found", open);
        return Located::MacroNotFound(open);
    };
    let after_open = open_pos + open.len();
    let Some(close_pos) = text[after_open..].find(&close).map(|p| after_open + p) else {
        log::warn!("block {} has no closing {}", open, close);
        return Located::MacroNotFound(close);
    };

    let tag_missing = |needle: &str| Located::TagNotFound {
        tag: markup.paragraph.to_string(),
        needle: needle.to_string(),
    };
    let Some(open_para) = locator::locate(text, markup.paragraph, open_pos, Direction::Around)
    else {
        return tag_missing(&open);
    };
    let Some(close_para) = locator::locate(text, markup.paragraph, close_pos, Direction::Around)
    else {
        return tag_missing(&close);
    };

    if open_para == close_para {
        return Located::Found(BlockSpans {
            outer: Span::new(open_pos, close_pos + close.len()),
            inner: Span::new(after_open, close_pos),
            inline: true,
        });
    }
    if open_para.end > close_para.start {
        return tag_missing(&close);
    }

    Located::Found(BlockSpans {
        outer: Span::new(open_para.start, close_para.end),
        inner: Span::new(open_para.end, close_para.start),
        inline: false,
    })
}

/// Apply `action` to the block `name`.
///
/// `Get` returns the content. `Delete` and `Replace` act on the outer span,
/// removing the delimiters. `Clone` puts copies of the content in place of
/// the outer span. Returns the content as it was before the action.
pub fn process_block(part: &mut String, markup: &Markup, name: &str, action: Action) -> Located<String> {
    locate_block(part, markup, name).map(|spans| {
        let content = spans.inner.slice(part).to_string();
        let replacement = match action {
            Action::Get => return content,
            Action::Delete => String::new(),
            Action::Replace(xml) => xml,
            Action::Clone { count, renumber } => {
                if renumber {
                    index_cloned_variables(count, &content).concat()
                } else {
                    content.repeat(count)
                }
            }
        };
        log::debug!(
            "{} block {} at {}..{}",
            if spans.inline { "inline" } else { "paragraph" },
            name,
            spans.outer.start,
            spans.outer.end
        );
        part.replace_range(spans.outer.start..spans.outer.end, &replacement);
        content
    })
}
