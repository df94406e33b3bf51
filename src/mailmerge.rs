//! Mail merge over Word `MERGEFIELD` fields.
//!
//! Word stores a merge field either as a complex field, a run sequence of
//! the shape
//!
//! ```text
//! <w:r><w:fldChar w:fldCharType="begin"/></w:r>
//! <w:r><w:instrText> MERGEFIELD Name </w:instrText></w:r>
//! <w:r><w:fldChar w:fldCharType="separate"/></w:r>
//! <w:r><w:t>«Name»</w:t></w:r>
//! <w:r><w:fldChar w:fldCharType="end"/></w:r>
//! ```
//!
//! or as a simple field, `<w:fldSimple w:instr=" MERGEFIELD Name ">`. Both
//! are replaced by a single run holding the merged value, keeping the
//! formatting of the displayed result.

use crate::detect::FormatType;
use crate::error::{Error, Result};
use crate::markup::WORDPROCESSINGML;
use crate::template::TemplateDocument;
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

/// Run open tag, with or without attributes. Does not match `<w:rPr>`.
const RUN_OPEN: &str = r"<w:r(?:\s[^>]*)?>";

/// Run content up to, not including, the next `</w:r>`.
const RUN_BODY: &str = r"(?:[^<]|<[^/]|</[^w]|</w:[^r]|</w:r[^>])*?";

/// Field name after `MERGEFIELD`, quoted or bare.
const FIELD_NAME: &str = r#"(?:"(?P<quoted>[^"<]+)"|(?P<name>[^"\s<\\]+))"#;

/// Instruction text split over several runs.
static INSTR_SPLIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"</w:instrText>\s*</w:r>\s*{RUN_OPEN}\s*(?:<w:rPr>(?:<[^/>][^>]*/>|\s)*</w:rPr>\s*)?<w:instrText[^>]*>"
    ))
    .expect("valid instrText pattern")
});

static COMPLEX_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    let run_with = |inner: &str| format!("{RUN_OPEN}{RUN_BODY}{inner}{RUN_BODY}</w:r>\\s*");
    Regex::new(&format!(
        "(?s){}{}{}(?P<display>.*?){}",
        run_with(r#"<w:fldChar\s+w:fldCharType="begin"[^>]*/>"#),
        run_with(&format!(
            r"<w:instrText[^>]*>\s*MERGEFIELD\s+{FIELD_NAME}[^<]*</w:instrText>"
        )),
        run_with(r#"<w:fldChar\s+w:fldCharType="separate"[^>]*/>"#),
        run_with(r#"<w:fldChar\s+w:fldCharType="end"[^>]*/>"#),
    ))
    .expect("valid complex field pattern")
});

static SIMPLE_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<w:fldSimple(?:\s[^>]*?)?\s+w:instr="\s*MERGEFIELD\s+(?:&quot;)?(?P<name>[^"&\s\\]+)[^"]*"[^>]*?(?:/>|>(?P<display>.*?)</w:fldSimple>)"#,
    )
    .expect("valid simple field pattern")
});

static RUN_PROPERTIES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<w:rPr>.*?</w:rPr>").expect("valid rPr pattern"));

/// Outcome of a merge, keyed by `section/FIELD` (for example
/// `main/FIRSTNAME` or `header1/DATE`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Fields replaced with a value
    pub merged: BTreeMap<String, usize>,
    /// Fields with no value; their name was written instead
    pub unmatched: BTreeMap<String, usize>,
}

impl MergeReport {
    /// Total number of merge fields replaced.
    pub fn success_count(&self) -> usize {
        self.merged.values().sum()
    }

    /// Total number of merge fields that had no value.
    pub fn failure_count(&self) -> usize {
        self.unmatched.values().sum()
    }

    /// Serialize the report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Merge values, looked up by upper-cased field name.
///
/// # Example
///
/// ```no_run
/// use doctmpl::{MailMerge, TemplateDocument};
///
/// let mut doc = TemplateDocument::open("letter.docx")?;
/// let report = MailMerge::new()
///     .with_value("FirstName", "Ada")
///     .with_value("City", "London")
///     .apply(&mut doc)?;
/// println!("{}", report.to_json()?);
/// doc.save_as("letter-ada.docx")?;
/// # Ok::<(), doctmpl::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct MailMerge {
    values: HashMap<String, String>,
}

impl MailMerge {
    /// An empty merge with no values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value for `field`, builder style.
    pub fn with_value(mut self, field: &str, value: &str) -> Self {
        self.set(field, value);
        self
    }

    /// Set the value for `field`, replacing any earlier one.
    pub fn set(&mut self, field: &str, value: &str) {
        self.values.insert(field.to_uppercase(), value.to_string());
    }

    /// Value stored for `field`, matched case-insensitively.
    pub fn value(&self, field: &str) -> Option<&str> {
        self.values.get(&field.to_uppercase()).map(String::as_str)
    }

    /// Replace every merge field in the headers, body and footers of `doc`.
    pub fn apply(&self, doc: &mut TemplateDocument) -> Result<MergeReport> {
        ensure_word(doc)?;

        let mut report = MergeReport::default();
        for part in doc.parts_mut().text_parts_mut() {
            let section = part.kind.to_string();
            let mut out = String::with_capacity(part.xml.len());
            for chunk in part.xml.split_inclusive(&WORDPROCESSINGML.paragraph_close()) {
                out.push_str(&self.merge_chunk(chunk, &section, &mut report));
            }
            part.xml = out;
        }

        log::debug!(
            "mail merge: {} merged, {} unmatched",
            report.success_count(),
            report.failure_count()
        );
        Ok(report)
    }

    fn merge_chunk(&self, chunk: &str, section: &str, report: &mut MergeReport) -> String {
        let chunk = INSTR_SPLIT.replace_all(chunk, "");
        let chunk = COMPLEX_FIELD.replace_all(&chunk, |caps: &Captures| {
            self.field_run(caps, section, report)
        });
        SIMPLE_FIELD
            .replace_all(&chunk, |caps: &Captures| self.field_run(caps, section, report))
            .into_owned()
    }

    /// Single run replacing one matched field.
    fn field_run(&self, caps: &Captures, section: &str, report: &mut MergeReport) -> String {
        let name = field_name(caps);
        let key = format!("{}/{}", section, name.to_uppercase());

        let text = match self.value(name) {
            Some(value) => {
                *report.merged.entry(key).or_insert(0) += 1;
                quick_xml::escape::escape(value).into_owned()
            }
            None => {
                log::warn!("no value for merge field {}", key);
                *report.unmatched.entry(key).or_insert(0) += 1;
                name.to_string()
            }
        };

        let properties = caps
            .name("display")
            .and_then(|display| RUN_PROPERTIES.find(display.as_str()))
            .map_or("", |m| m.as_str());
        format!(
            "<w:r>{}<w:t xml:space=\"preserve\">{}</w:t></w:r>",
            properties, text
        )
    }
}

/// Names of all merge fields in the headers, body and footers, without
/// duplicates, in order of first appearance.
pub fn merge_field_names(doc: &TemplateDocument) -> Result<Vec<String>> {
    ensure_word(doc)?;

    let mut names: Vec<String> = Vec::new();
    for part in doc.parts().text_parts() {
        for chunk in part.xml.split_inclusive(&WORDPROCESSINGML.paragraph_close()) {
            let chunk = INSTR_SPLIT.replace_all(chunk, "");
            let found = COMPLEX_FIELD
                .captures_iter(&chunk)
                .chain(SIMPLE_FIELD.captures_iter(&chunk))
                .map(|caps| field_name(&caps).to_string())
                .collect::<Vec<_>>();
            for name in found {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
    }
    Ok(names)
}

fn field_name<'h>(caps: &Captures<'h>) -> &'h str {
    caps.name("quoted")
        .or_else(|| caps.name("name"))
        .map_or("", |m| m.as_str())
}

fn ensure_word(doc: &TemplateDocument) -> Result<()> {
    match doc.format() {
        FormatType::Docx => Ok(()),
        other => Err(Error::UnsupportedFormat(format!("mail merge on {}", other))),
    }
}
