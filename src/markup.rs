//! Per-format markup vocabulary.
//!
//! The engine never parses XML; it only needs to know which tag names
//! delimit paragraphs, table rows and tables, and where the text parts of
//! a package live. Everything format-specific is collected here.

use crate::detect::FormatType;

/// How a table cell spanning several rows is marked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSpanMarker {
    /// `<w:vMerge w:val="restart"/>` on the first row, `<w:vMerge/>` or
    /// `w:val="continue"` on each following row of the span
    VerticalMerge,
    /// `table:number-rows-spanned="N"` on the first row's cell
    RowsSpanned,
}

/// Markup names for one template format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Markup {
    /// Paragraph element (`w:p`, `text:p`)
    pub paragraph: &'static str,
    /// Table row element (`w:tr`, `table:table-row`)
    pub row: &'static str,
    /// Table element (`w:tbl`, `table:table`)
    pub table: &'static str,
    /// Markup replacing a newline inside a substituted value
    pub line_break: &'static str,
    /// Main body part
    pub main_part: &'static str,
    /// Row-span convention
    pub row_span: RowSpanMarker,
}

/// WordprocessingML (Office Open XML) markup.
pub const WORDPROCESSINGML: Markup = Markup {
    paragraph: "w:p",
    row: "w:tr",
    table: "w:tbl",
    line_break: "</w:t><w:br/><w:t xml:space=\"preserve\">",
    main_part: "word/document.xml",
    row_span: RowSpanMarker::VerticalMerge,
};

/// OpenDocument text markup.
pub const OPENDOCUMENT: Markup = Markup {
    paragraph: "text:p",
    row: "table:table-row",
    table: "table:table",
    line_break: "<text:line-break/>",
    main_part: "content.xml",
    row_span: RowSpanMarker::RowsSpanned,
};

impl Markup {
    /// Markup vocabulary for a format.
    pub fn for_format(format: FormatType) -> &'static Markup {
        match format {
            FormatType::Docx => &WORDPROCESSINGML,
            FormatType::Odt => &OPENDOCUMENT,
        }
    }

    /// Closing tag of the paragraph element.
    pub fn paragraph_close(&self) -> String {
        close_tag(self.paragraph)
    }

    /// Closing tag of the table element.
    pub fn table_close(&self) -> String {
        close_tag(self.table)
    }
}

/// Word header part name (`index` is 1-based).
pub fn word_header_part(index: usize) -> String {
    format!("word/header{}.xml", index)
}

/// Word footer part name (`index` is 1-based).
pub fn word_footer_part(index: usize) -> String {
    format!("word/footer{}.xml", index)
}

/// Word settings part.
pub const WORD_SETTINGS_PART: &str = "word/settings.xml";

/// ODF styles part; headers and footers live in its master pages.
pub const ODT_STYLES_PART: &str = "styles.xml";

/// ODF settings part.
pub const ODT_SETTINGS_PART: &str = "settings.xml";

/// Open tag with attributes, e.g. `<w:p `.
pub fn open_tag_with_attrs(tag: &str) -> String {
    format!("<{} ", tag)
}

/// Open tag without attributes, e.g. `<w:p>`.
pub fn open_tag_bare(tag: &str) -> String {
    format!("<{}>", tag)
}

/// Close tag, e.g. `</w:p>`.
pub fn close_tag(tag: &str) -> String {
    format!("</{}>", tag)
}
