//! Format detection for Word and OpenDocument templates.

use crate::container::decode_xml_bytes;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

/// ZIP file magic bytes: PK\x03\x04
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Content types for the main part of a WordprocessingML package.
/// Covers documents, templates and their macro-enabled variants.
const DOCX_CONTENT_TYPES: [&str; 4] = [
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.template.main+xml",
    "application/vnd.ms-word.document.macroEnabled.main+xml",
    "application/vnd.ms-word.template.macroEnabledTemplate.main+xml",
];

/// MIME type prefix stored in the `mimetype` entry of ODF text documents.
/// Also matches `application/vnd.oasis.opendocument.text-template`.
const ODT_MIMETYPE: &str = "application/vnd.oasis.opendocument.text";

/// Detected template format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatType {
    /// Office Open XML word processing document (.docx, .dotx)
    Docx,
    /// OpenDocument text (.odt, .ott)
    Odt,
}

impl FormatType {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            FormatType::Docx => "docx",
            FormatType::Odt => "odt",
        }
    }

    /// Returns a human-readable name for this format.
    pub fn name(&self) -> &'static str {
        match self {
            FormatType::Docx => "Word Document",
            FormatType::Odt => "OpenDocument Text",
        }
    }
}

impl std::fmt::Display for FormatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Detect the format type from a file path.
///
/// # Example
///
/// ```no_run
/// use doctmpl::detect::detect_format_from_path;
///
/// let format = detect_format_from_path("letter.docx")?;
/// println!("Detected format: {}", format);
/// # Ok::<(), doctmpl::Error>(())
/// ```
pub fn detect_format_from_path(path: impl AsRef<Path>) -> Result<FormatType> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);
    detect_format_from_reader(reader)
}

/// Detect the format type from a byte slice.
pub fn detect_format_from_bytes(data: &[u8]) -> Result<FormatType> {
    if !is_zip_file(data) {
        return Err(Error::UnknownFormat);
    }

    let cursor = std::io::Cursor::new(data);
    detect_format_from_reader(cursor)
}

/// Detect the format type from a reader.
pub fn detect_format_from_reader<R: Read + Seek>(reader: R) -> Result<FormatType> {
    let mut archive = zip::ZipArchive::new(reader)?;
    let names: Vec<String> = archive.file_names().map(String::from).collect();
    detect_format_from_entries(&names, |name| {
        let mut file = archive.by_name(name).ok()?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).ok()?;
        decode_xml_bytes(&bytes).ok()
    })
}

/// Detect the format from an entry listing and an entry reader.
///
/// Shared by the reader-based detection above and by
/// [`TemplateContainer`](crate::container::TemplateContainer), which already
/// holds every entry in memory.
pub(crate) fn detect_format_from_entries<F>(names: &[String], mut read: F) -> Result<FormatType>
where
    F: FnMut(&str) -> Option<String>,
{
    if names.iter().any(|n| n == "mimetype") {
        if let Some(mimetype) = read("mimetype") {
            if mimetype.trim().starts_with(ODT_MIMETYPE) {
                return Ok(FormatType::Odt);
            }
            return Err(Error::UnsupportedFormat(mimetype.trim().to_string()));
        }
    }

    if names.iter().any(|n| n == "[Content_Types].xml") {
        if let Some(content_types) = read("[Content_Types].xml") {
            if DOCX_CONTENT_TYPES.iter().any(|ct| content_types.contains(ct)) {
                return Ok(FormatType::Docx);
            }
        }
    }

    detect_by_folder_structure(names)
}

/// Fallback detection by checking folder structure.
fn detect_by_folder_structure(names: &[String]) -> Result<FormatType> {
    let has_word = names.iter().any(|n| n == "word/document.xml");
    let has_content = names.iter().any(|n| n == "content.xml");

    match (has_word, has_content) {
        (true, false) => Ok(FormatType::Docx),
        (false, true) => Ok(FormatType::Odt),
        _ => Err(Error::UnknownFormat),
    }
}

/// Check if data starts with ZIP magic bytes.
pub fn is_zip_file(data: &[u8]) -> bool {
    data.len() >= 4 && data[..4] == ZIP_MAGIC
}
