//! Macro scanning: finding `${NAME}` tokens, repairing tokens that a word
//! processor split across runs, and renumbering tokens in cloned content.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Opening characters of a macro token.
pub const MACRO_OPEN: &str = "${";

/// Closing character of a macro token.
pub const MACRO_CLOSE: &str = "}";

/// A `$`, optionally followed by markup, then `{`, then anything but braces
/// up to the closing `}`. Markup inside the match is what gets stripped.
static BROKEN_MACRO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{|[^{$]*?>\{)[^{}$]*\}").expect("valid macro repair pattern")
});

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));

static VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^{}]*)\}").expect("valid variable pattern"));

/// Name and optional `:args` tail of a token.
static TOKEN_PARTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^{}:]*)(:[^{}]*)?\}").expect("valid token pattern")
});

/// Wrap a bare name in `${` `}` unless it already carries either delimiter.
///
/// ```
/// use doctmpl::engine::macros::ensure_macro_completed;
///
/// assert_eq!(ensure_macro_completed("NAME"), "${NAME}");
/// assert_eq!(ensure_macro_completed("${NAME}"), "${NAME}");
/// ```
pub fn ensure_macro_completed(name: &str) -> String {
    if !name.starts_with(MACRO_OPEN) && !name.ends_with(MACRO_CLOSE) {
        format!("{}{}{}", MACRO_OPEN, name, MACRO_CLOSE)
    } else {
        name.to_string()
    }
}

/// Strip the `${` `}` delimiters from a token, if present.
pub fn macro_name(token: &str) -> &str {
    token
        .strip_prefix(MACRO_OPEN)
        .and_then(|t| t.strip_suffix(MACRO_CLOSE))
        .unwrap_or(token)
}

/// Closing token of a block, `${/NAME}`.
pub fn block_close_token(name: &str) -> String {
    format!("{}/{}{}", MACRO_OPEN, name, MACRO_CLOSE)
}

/// Remove every markup tag from `text`.
fn strip_tags(text: &str) -> String {
    TAG.replace_all(text, "").into_owned()
}

/// Rejoin macros that were split across runs.
///
/// The part is processed one paragraph at a time (split after each
/// `paragraph_close`), so markup is never stripped across paragraphs.
/// Running this twice gives the same result as running it once.
pub fn repair(xml: &str, paragraph_close: &str) -> String {
    let mut repaired = 0usize;
    let mut out = String::with_capacity(xml.len());

    for chunk in xml.split_inclusive(paragraph_close) {
        let fixed = BROKEN_MACRO.replace_all(chunk, |caps: &Captures| {
            let clean = strip_tags(&caps[0]);
            if clean.len() != caps[0].len() {
                repaired += 1;
            }
            clean
        });
        out.push_str(&fixed);
    }

    if repaired > 0 {
        log::debug!("repaired {} split macro(s)", repaired);
    }
    out
}

/// All macro interiors in a part, in document order, duplicates kept.
///
/// The full interior is returned, including any `:args` tail and the `/` of
/// block closing tokens.
pub fn find_variables(xml: &str) -> Vec<String> {
    VARIABLE
        .captures_iter(xml)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Produce `count` copies of `block` in which every token `${X}` becomes
/// `${X#i}` (1-based). The suffix goes after the name and before any
/// `:args` tail, so `${/X}` becomes `${/X#i}` and `${IMG:w=10}` becomes
/// `${IMG#i:w=10}`.
pub fn index_cloned_variables(count: usize, block: &str) -> Vec<String> {
    (1..=count)
        .map(|i| {
            TOKEN_PARTS
                .replace_all(block, |caps: &Captures| {
                    let args = caps.get(2).map_or("", |m| m.as_str());
                    format!("{}{}#{}{}{}", MACRO_OPEN, &caps[1], i, args, MACRO_CLOSE)
                })
                .into_owned()
        })
        .collect()
}

/// Replace `search` with `replace`, at most `limit` times when given.
/// Returns the new text and the number of replacements.
pub fn substitute(xml: &str, search: &str, replace: &str, limit: Option<usize>) -> (String, usize) {
    if search.is_empty() {
        return (xml.to_string(), 0);
    }

    let mut out = String::with_capacity(xml.len());
    let mut last = 0;
    let mut count = 0;
    for (pos, _) in xml.match_indices(search) {
        if limit.is_some_and(|l| count >= l) {
            break;
        }
        out.push_str(&xml[last..pos]);
        out.push_str(replace);
        last = pos + search.len();
        count += 1;
    }
    out.push_str(&xml[last..]);
    (out, count)
}
