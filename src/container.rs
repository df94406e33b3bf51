//! ZIP container holding the entries of a template package.
//!
//! The container is a key-value store of `entry name -> bytes` loaded fully
//! into memory. Entry order and per-entry compression are kept so that a
//! package written back keeps the layout consumers expect (ODF requires the
//! `mimetype` entry first and uncompressed).

use crate::detect::{detect_format_from_entries, FormatType};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

/// A single archive entry.
#[derive(Debug, Clone)]
struct Entry {
    name: String,
    data: Vec<u8>,
    stored: bool,
    is_dir: bool,
}

/// In-memory template package backed by a ZIP archive.
#[derive(Clone)]
pub struct TemplateContainer {
    entries: Vec<Entry>,
}

/// Decode XML bytes handling different encodings (UTF-8, UTF-16 LE/BE).
///
/// Word and LibreOffice write UTF-8, but parts produced by other tools may
/// carry a UTF-16 byte order mark. The result is always a UTF-8 `String`
/// whose XML declaration, if any, says so.
pub fn decode_xml_bytes(bytes: &[u8]) -> Result<String> {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8(rest.to_vec())
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)));
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return decode_utf16(rest, false).map(|s| fix_xml_encoding_declaration(&s));
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16(rest, true).map(|s| fix_xml_encoding_declaration(&s));
    }

    match String::from_utf8(bytes.to_vec()) {
        Ok(s) => Ok(s),
        Err(_) => {
            // BOM-less UTF-16: ASCII markup leaves a zero in every other byte
            if bytes.len() >= 4 && bytes[1] == 0 && bytes[3] == 0 {
                decode_utf16(bytes, false).map(|s| fix_xml_encoding_declaration(&s))
            } else if bytes.len() >= 4 && bytes[0] == 0 && bytes[2] == 0 {
                decode_utf16(bytes, true).map(|s| fix_xml_encoding_declaration(&s))
            } else {
                Ok(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }
}

fn decode_utf16(bytes: &[u8], big_endian: bool) -> Result<String> {
    let units = bytes.chunks_exact(2).map(|pair| {
        if big_endian {
            u16::from_be_bytes([pair[0], pair[1]])
        } else {
            u16::from_le_bytes([pair[0], pair[1]])
        }
    });

    char::decode_utf16(units)
        .collect::<std::result::Result<String, _>>()
        .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Rewrite a UTF-16 encoding declaration to UTF-8 after transcoding.
fn fix_xml_encoding_declaration(content: &str) -> String {
    if !content.starts_with("<?xml") {
        return content.to_string();
    }
    let Some(end_decl) = content.find("?>") else {
        return content.to_string();
    };

    let (decl, rest) = content.split_at(end_decl + 2);
    let mut fixed = decl.to_string();
    for quote in ['"', '\''] {
        for label in ["UTF-16", "utf-16"] {
            fixed = fixed.replace(
                &format!("encoding={quote}{label}{quote}"),
                &format!("encoding={quote}UTF-8{quote}"),
            );
        }
    }
    format!("{}{}", fixed, rest)
}

impl TemplateContainer {
    /// Open a template package from a file path.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use doctmpl::container::TemplateContainer;
    ///
    /// let container = TemplateContainer::open("letter.docx")?;
    /// assert!(container.exists("word/document.xml"));
    /// # Ok::<(), doctmpl::Error>(())
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mut reader = BufReader::new(file);
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(data)
    }

    /// Create a container from a byte vector.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_reader(Cursor::new(data))
    }

    /// Create a container from any reader that implements Read + Seek.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(reader)?;
        let mut entries = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let mut data = Vec::new();
            if !file.is_dir() {
                file.read_to_end(&mut data)?;
            }
            entries.push(Entry {
                name: file.name().to_string(),
                stored: file.compression() == CompressionMethod::Stored,
                is_dir: file.is_dir(),
                data,
            });
        }

        log::debug!("loaded template package with {} entries", entries.len());
        Ok(Self { entries })
    }

    /// Detect the package format from its entries.
    pub fn format(&self) -> Result<FormatType> {
        let names = self.list_files();
        detect_format_from_entries(&names, |name| self.read_xml(name).ok())
    }

    fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| !e.is_dir && e.name == name)
    }

    /// Check if an entry exists in the archive.
    pub fn exists(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    /// Read an XML entry as a UTF-8 string.
    pub fn read_xml(&self, name: &str) -> Result<String> {
        let entry = self
            .entry(name)
            .ok_or_else(|| Error::MissingComponent(name.to_string()))?;
        decode_xml_bytes(&entry.data)
    }

    /// Read a binary entry.
    pub fn read_binary(&self, name: &str) -> Result<&[u8]> {
        self.entry(name)
            .map(|e| e.data.as_slice())
            .ok_or_else(|| Error::MissingComponent(name.to_string()))
    }

    /// Add or replace an entry from a string.
    ///
    /// Replacing keeps the entry's position and compression; new entries are
    /// appended and deflated.
    pub fn put_xml(&mut self, name: &str, content: &str) {
        match self
            .entries
            .iter_mut()
            .find(|e| !e.is_dir && e.name == name)
        {
            Some(entry) => entry.data = content.as_bytes().to_vec(),
            None => self.entries.push(Entry {
                name: name.to_string(),
                data: content.as_bytes().to_vec(),
                stored: false,
                is_dir: false,
            }),
        }
    }

    /// List all file entries in archive order.
    pub fn list_files(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| !e.is_dir)
            .map(|e| e.name.clone())
            .collect()
    }

    /// Write the archive to any writer.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zip = zip::ZipWriter::new(writer);

        for entry in &self.entries {
            let method = if entry.stored {
                CompressionMethod::Stored
            } else {
                CompressionMethod::Deflated
            };
            let options = SimpleFileOptions::default().compression_method(method);

            if entry.is_dir {
                zip.add_directory(entry.name.clone(), options)?;
            } else {
                zip.start_file(entry.name.clone(), options)?;
                zip.write_all(&entry.data)?;
            }
        }

        zip.finish()?;
        Ok(())
    }

    /// Write the archive to a file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Serialize the archive to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.write_to(&mut buffer)?;
        Ok(buffer.into_inner())
    }
}

impl std::fmt::Debug for TemplateContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateContainer")
            .field("files", &self.list_files().len())
            .finish()
    }
}
