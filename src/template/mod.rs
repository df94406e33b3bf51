//! Template documents: macro substitution, row and block cloning, and
//! segment operations over the text parts of a Word or ODF package.

mod parts;

pub use parts::DocPart;

use crate::container::TemplateContainer;
use crate::detect::FormatType;
use crate::engine::blocks;
use crate::engine::macros::{self, ensure_macro_completed, macro_name, substitute};
use crate::engine::segment::{self, Action};
use crate::engine::{Direction, Located};
use crate::error::{Error, Result};
use crate::markup::Markup;
use crate::options::TemplateOptions;
use parts::{Part, PartSet};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static UPDATE_FIELDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<w:updateFields w:val="(?:true|false|1|0|on|off)"\s*/>"#)
        .expect("valid updateFields pattern")
});

/// A template loaded into memory.
///
/// The document owns the text of every part it processes. Each operation
/// works on the current text and leaves it consistent for the next one;
/// nothing is written to disk until the document is saved, which consumes it.
///
/// # Example
///
/// ```no_run
/// use doctmpl::TemplateDocument;
///
/// let mut doc = TemplateDocument::open("invoice.docx")?;
/// doc.set_value("CUSTOMER", "ACME Corp.");
/// doc.clone_row("ITEM", 3).or_fail()?;
/// doc.set_value("ITEM#1", "Widgets");
/// doc.save_as("invoice-acme.docx")?;
/// # Ok::<(), doctmpl::Error>(())
/// ```
pub struct TemplateDocument {
    container: TemplateContainer,
    format: FormatType,
    markup: &'static Markup,
    options: TemplateOptions,
    parts: PartSet,
}

impl TemplateDocument {
    /// Open a template from a file path with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, TemplateOptions::default())
    }

    /// Open a template from a file path.
    pub fn open_with_options(path: impl AsRef<Path>, options: TemplateOptions) -> Result<Self> {
        let container = TemplateContainer::open(path)?;
        Self::from_container(container, options)
    }

    /// Load a template from bytes with default options.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_bytes_with_options(data, TemplateOptions::default())
    }

    /// Load a template from bytes.
    pub fn from_bytes_with_options(data: Vec<u8>, options: TemplateOptions) -> Result<Self> {
        let container = TemplateContainer::from_bytes(data)?;
        Self::from_container(container, options)
    }

    /// Load a template from an opened container.
    pub fn from_container(container: TemplateContainer, options: TemplateOptions) -> Result<Self> {
        let format = container.format()?;
        let parts = PartSet::load(&container, format, options.repair_macros)?;
        log::debug!("opened {} template", format);
        Ok(Self {
            container,
            format,
            markup: Markup::for_format(format),
            options,
            parts,
        })
    }

    /// Format of the underlying package.
    pub fn format(&self) -> FormatType {
        self.format
    }

    /// Options the template was opened with.
    pub fn options(&self) -> &TemplateOptions {
        &self.options
    }

    /// Current text of a part, if the package has it.
    pub fn part(&self, kind: DocPart) -> Option<&str> {
        self.parts.get(kind).map(|p| p.xml.as_str())
    }

    /// Current text of the document body.
    pub fn main_part(&self) -> &str {
        &self.parts.main().xml
    }

    /// Roles of all loaded parts, in processing order.
    pub fn part_kinds(&self) -> Vec<DocPart> {
        self.parts.iter().map(|p| p.kind).collect()
    }

    pub(crate) fn parts(&self) -> &PartSet {
        &self.parts
    }

    pub(crate) fn parts_mut(&mut self) -> &mut PartSet {
        &mut self.parts
    }

    /// Turn a caller value into the text written into the document.
    fn prepare_value(&self, value: &str) -> String {
        let mut value = if self.options.normalize_values {
            value.nfc().collect::<String>()
        } else {
            value.to_string()
        };
        if self.options.escape_values {
            value = quick_xml::escape::escape(value.as_str()).into_owned();
        }
        if self.options.line_breaks {
            value = value
                .replace("\r\n", "\n")
                .replace('\n', self.markup.line_break);
        }
        value
    }

    // =========================================================================
    // Values
    // =========================================================================

    /// Replace every occurrence of the macro `search` in all text parts.
    ///
    /// `search` may be given bare (`NAME`) or complete (`${NAME}`).
    /// Returns the number of replacements made.
    pub fn set_value(&mut self, search: &str, replace: &str) -> usize {
        self.replace_in_parts(search, replace, None)
    }

    /// Like [`set_value`](Self::set_value), replacing at most `limit`
    /// occurrences in each part.
    pub fn set_value_with_limit(&mut self, search: &str, replace: &str, limit: usize) -> usize {
        self.replace_in_parts(search, replace, Some(limit))
    }

    /// Set several values at once. Returns the total number of replacements.
    pub fn set_values<I, K, V>(&mut self, values: I) -> usize
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        values
            .into_iter()
            .map(|(k, v)| self.set_value(k.as_ref(), v.as_ref()))
            .sum()
    }

    fn replace_in_parts(&mut self, search: &str, replace: &str, limit: Option<usize>) -> usize {
        let token = ensure_macro_completed(search);
        let value = self.prepare_value(replace);

        let mut total = 0;
        for part in self.parts.text_parts_mut() {
            let (xml, count) = substitute(&part.xml, &token, &value, limit);
            if count > 0 {
                part.xml = xml;
                total += count;
            }
        }
        if total == 0 {
            log::debug!("set_value: {} not present", token);
        }
        total
    }

    /// Names of all macros in the text parts, without duplicates, in order
    /// of first appearance (headers, body, footers).
    pub fn get_variables(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.parts
            .text_parts()
            .flat_map(|p| macros::find_variables(&p.xml))
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }

    /// Number of occurrences of each macro across the text parts.
    pub fn variable_count(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for name in self
            .parts
            .text_parts()
            .flat_map(|p| macros::find_variables(&p.xml))
        {
            *counts.entry(name).or_insert(0) += 1;
        }
        counts
    }

    // =========================================================================
    // Table rows
    // =========================================================================

    fn row_action(&mut self, search: &str, action: Action) -> Located<String> {
        let token = ensure_macro_completed(search);
        let markup = self.markup;
        blocks::process_row(&mut self.parts.main_mut().xml, markup, &token, action)
    }

    /// Clone the table row holding `search` `count` times, renumbering the
    /// macros of the i-th copy to `${NAME#i}`. Rows spanned by a merged
    /// cell of that row are cloned with it. Returns the original row XML.
    pub fn clone_row(&mut self, search: &str, count: usize) -> Located<String> {
        self.row_action(
            search,
            Action::Clone {
                count,
                renumber: true,
            },
        )
    }

    /// Clone the row holding `search` once per entry of `rows` and fill
    /// each copy with that entry's values.
    ///
    /// ```no_run
    /// # let mut doc = doctmpl::TemplateDocument::open("t.docx")?;
    /// doc.clone_row_and_set_values(
    ///     "userId",
    ///     [
    ///         [("userId", "1"), ("userName", "Batman")],
    ///         [("userId", "2"), ("userName", "Superman")],
    ///     ],
    /// )
    /// .or_fail()?;
    /// # Ok::<(), doctmpl::Error>(())
    /// ```
    pub fn clone_row_and_set_values<I, R, K, V>(&mut self, search: &str, rows: I) -> Located<()>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let rows = collect_rows(rows);
        self.clone_row(search, rows.len()).map(|_| {
            for (i, row) in rows.iter().enumerate() {
                for (key, value) in row {
                    self.set_value(&format!("{}#{}", macro_name(key), i + 1), value);
                }
            }
        })
    }

    /// Remove the row holding `search`, with any rows its merged cells span.
    pub fn delete_row(&mut self, search: &str) -> Located<()> {
        self.row_action(search, Action::Delete).map(|_| ())
    }

    /// Replace the row holding `search` with `xml`.
    pub fn replace_row(&mut self, search: &str, xml: &str) -> Located<()> {
        self.row_action(search, Action::Replace(xml.to_string()))
            .map(|_| ())
    }

    /// XML of the row holding `search`, with any rows its merged cells span.
    pub fn get_row(&self, search: &str) -> Located<String> {
        let token = ensure_macro_completed(search);
        let text = &self.parts.main().xml;
        blocks::locate_row(text, self.markup, &token).map(|span| span.slice(text).to_string())
    }

    // =========================================================================
    // Named blocks
    // =========================================================================

    fn block_action(&mut self, name: &str, action: Action) -> Located<String> {
        let markup = self.markup;
        blocks::process_block(&mut self.parts.main_mut().xml, markup, name, action)
    }

    /// Repeat the content of block `name` `count` times, dropping the
    /// `${NAME}` / `${/NAME}` delimiters. With `renumber`, macros in the
    /// i-th copy become `${X#i}`. Returns the original block content.
    pub fn clone_block(&mut self, name: &str, count: usize, renumber: bool) -> Located<String> {
        self.block_action(name, Action::Clone { count, renumber })
    }

    /// Repeat block `name` once per entry of `rows`, replacing the macros
    /// of each copy with that entry's values.
    pub fn clone_block_with_values<I, R, K, V>(&mut self, name: &str, rows: I) -> Located<String>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let rows: Vec<Vec<(String, String)>> = collect_rows(rows)
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(k, v)| (ensure_macro_completed(&k), self.prepare_value(&v)))
                    .collect()
            })
            .collect();

        let content = match blocks::locate_block(&self.parts.main().xml, self.markup, name) {
            Located::Found(spans) => spans.inner.slice(&self.parts.main().xml).to_string(),
            miss => return miss.map(|_| String::new()),
        };
        let copies: String = rows
            .iter()
            .map(|row| {
                row.iter().fold(content.clone(), |block, (token, value)| {
                    substitute(&block, token, value, None).0
                })
            })
            .collect();

        self.block_action(name, Action::Replace(copies))
    }

    /// Remove block `name` together with its delimiters.
    pub fn delete_block(&mut self, name: &str) -> Located<()> {
        self.block_action(name, Action::Delete).map(|_| ())
    }

    /// Replace block `name`, delimiters included, with `xml`.
    pub fn replace_block(&mut self, name: &str, xml: &str) -> Located<()> {
        self.block_action(name, Action::Replace(xml.to_string()))
            .map(|_| ())
    }

    /// Content of block `name`, between its delimiters.
    pub fn get_block(&self, name: &str) -> Located<String> {
        let text = &self.parts.main().xml;
        blocks::locate_block(text, self.markup, name)
            .map(|spans| spans.inner.slice(text).to_string())
    }

    // =========================================================================
    // Segments
    // =========================================================================

    fn segment_action(
        &mut self,
        needle: &str,
        tag: &str,
        direction: Direction,
        part: DocPart,
        action: Action,
    ) -> Located<String> {
        let token = ensure_macro_completed(needle);
        match self.parts.get_mut(part) {
            Some(Part { xml, .. }) => segment::process(xml, &token, tag, direction, action),
            None => {
                log::warn!("part {} not present", part);
                Located::MacroNotFound(token)
            }
        }
    }

    /// Clone the `tag` element around `needle` in `part` `count` times.
    /// Returns the original element XML.
    pub fn clone_segment(
        &mut self,
        needle: &str,
        tag: &str,
        direction: Direction,
        count: usize,
        part: DocPart,
        renumber: bool,
    ) -> Located<String> {
        self.segment_action(needle, tag, direction, part, Action::Clone { count, renumber })
    }

    /// Replace the `tag` element around `needle` in `part` with `xml`.
    pub fn replace_segment(
        &mut self,
        needle: &str,
        tag: &str,
        direction: Direction,
        xml: &str,
        part: DocPart,
    ) -> Located<()> {
        self.segment_action(needle, tag, direction, part, Action::Replace(xml.to_string()))
            .map(|_| ())
    }

    /// Remove the `tag` element around `needle` in `part`.
    pub fn delete_segment(
        &mut self,
        needle: &str,
        tag: &str,
        direction: Direction,
        part: DocPart,
    ) -> Located<()> {
        self.segment_action(needle, tag, direction, part, Action::Delete)
            .map(|_| ())
    }

    /// XML of the `tag` element around `needle` in `part`.
    pub fn get_segment(
        &self,
        needle: &str,
        tag: &str,
        direction: Direction,
        part: DocPart,
    ) -> Located<String> {
        let token = ensure_macro_completed(needle);
        let Some(text) = self.part(part) else {
            return Located::MacroNotFound(token);
        };
        segment::locate_segment(text, &token, tag, direction)
            .map(|span| span.slice(text).to_string())
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// Ask Word to update fields (TOC, page references) when the document
    /// is opened.
    pub fn set_update_fields(&mut self, update: bool) -> Result<()> {
        if self.format != FormatType::Docx {
            return Err(Error::UnsupportedFormat(format!(
                "update fields on {}",
                self.format
            )));
        }
        let settings = self
            .parts
            .get_mut(DocPart::Settings)
            .ok_or_else(|| Error::MissingComponent(crate::markup::WORD_SETTINGS_PART.to_string()))?;

        let element = format!("<w:updateFields w:val=\"{}\"/>", update);
        settings.xml = if UPDATE_FIELDS.is_match(&settings.xml) {
            UPDATE_FIELDS
                .replace(&settings.xml, element.as_str())
                .into_owned()
        } else {
            settings
                .xml
                .replace("</w:settings>", &format!("{}</w:settings>", element))
        };
        Ok(())
    }

    // =========================================================================
    // Output
    // =========================================================================

    /// Write modified parts back and return the package.
    pub fn into_container(self) -> TemplateContainer {
        let mut container = self.container;
        self.parts.write_back(&mut container);
        container
    }

    /// Serialize the processed package to bytes.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        self.into_container().to_bytes()
    }

    /// Save the processed package to `path`.
    pub fn save_as(self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.into_container().write_to_file(path)?;
        log::info!("saved template to {}", path.display());
        Ok(())
    }

    /// Save the processed package to a new file in the temporary directory
    /// and return its path. The file is kept after the call.
    pub fn save(self) -> Result<PathBuf> {
        let suffix = format!(".{}", self.format.extension());
        let (file, path) = tempfile::Builder::new()
            .prefix("doctmpl")
            .suffix(&suffix)
            .tempfile()?
            .keep()
            .map_err(|e| Error::Io(e.error))?;

        let mut writer = BufWriter::new(file);
        self.into_container().write_to(&mut writer)?;
        writer.flush()?;
        log::info!("saved template to {}", path.display());
        Ok(path)
    }
}

impl std::fmt::Debug for TemplateDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateDocument")
            .field("format", &self.format)
            .field("parts", &self.part_kinds())
            .finish()
    }
}

fn collect_rows<I, R, K, V>(rows: I) -> Vec<Vec<(String, String)>>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    rows.into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
                .collect()
        })
        .collect()
}
