//! In-memory template packages for integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const WORD_CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

pub const WORD_STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">  <w:style w:type="paragraph" w:styleId="Normal"/>
</w:styles>"#;

/// Builder for a DOCX package.
#[derive(Default)]
pub struct DocxBuilder {
    body: String,
    headers: Vec<String>,
    footers: Vec<String>,
    settings: Option<String>,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(mut self, xml: &str) -> Self {
        self.body.push_str(xml);
        self
    }

    pub fn header(mut self, xml: &str) -> Self {
        self.headers.push(xml.to_string());
        self
    }

    pub fn footer(mut self, xml: &str) -> Self {
        self.footers.push(xml.to_string());
        self
    }

    pub fn settings(mut self, xml: &str) -> Self {
        self.settings = Some(xml.to_string());
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let deflated = SimpleFileOptions::default();
        let stored = deflated.compression_method(CompressionMethod::Stored);

        add(&mut zip, "[Content_Types].xml", WORD_CONTENT_TYPES, deflated);
        add(
            &mut zip,
            "word/document.xml",
            &format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
                self.body
            ),
            deflated,
        );
        add(&mut zip, "word/styles.xml", WORD_STYLES, stored);
        for (i, header) in self.headers.iter().enumerate() {
            add(
                &mut zip,
                &format!("word/header{}.xml", i + 1),
                &format!("<w:hdr>{}</w:hdr>", header),
                deflated,
            );
        }
        for (i, footer) in self.footers.iter().enumerate() {
            add(
                &mut zip,
                &format!("word/footer{}.xml", i + 1),
                &format!("<w:ftr>{}</w:ftr>", footer),
                deflated,
            );
        }
        if let Some(settings) = &self.settings {
            add(&mut zip, "word/settings.xml", settings, deflated);
        }
        zip.finish().unwrap().into_inner()
    }
}

/// Build an ODT package with the given body and master-page content.
pub fn odt(body: &str, styles: &str) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let deflated = SimpleFileOptions::default();
    let stored = deflated.compression_method(CompressionMethod::Stored);

    add(&mut zip, "mimetype", "application/vnd.oasis.opendocument.text", stored);
    add(
        &mut zip,
        "content.xml",
        &format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0"><office:body><office:text>{}</office:text></office:body></office:document-content>"#,
            body
        ),
        deflated,
    );
    add(
        &mut zip,
        "styles.xml",
        &format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-styles xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0"><office:master-styles>{}</office:master-styles></office:document-styles>"#,
            styles
        ),
        deflated,
    );
    add(
        &mut zip,
        "META-INF/manifest.xml",
        r#"<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0"/>"#,
        deflated,
    );
    zip.finish().unwrap().into_inner()
}

fn add(zip: &mut ZipWriter<Cursor<Vec<u8>>>, name: &str, content: &str, options: SimpleFileOptions) {
    zip.start_file(name, options).unwrap();
    zip.write_all(content.as_bytes()).unwrap();
}

/// Word paragraph with one run.
pub fn para(text: &str) -> String {
    format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", text)
}

/// Word table row with one cell per entry of `cells`.
pub fn row(cells: &[&str]) -> String {
    let cells: String = cells
        .iter()
        .map(|c| format!("<w:tc>{}</w:tc>", para(c)))
        .collect();
    format!("<w:tr>{}</w:tr>", cells)
}

/// Word table holding `rows`.
pub fn table(rows: &[String]) -> String {
    format!("<w:tbl>{}</w:tbl>", rows.concat())
}

/// ODF paragraph.
pub fn text_p(text: &str) -> String {
    format!("<text:p>{}</text:p>", text)
}

/// Entry names of a package, in archive order.
pub fn entry_names(data: &[u8]) -> Vec<String> {
    let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

/// Decompressed content of one entry.
pub fn entry(data: &[u8], name: &str) -> Vec<u8> {
    let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut out = Vec::new();
    file.read_to_end(&mut out).unwrap();
    out
}

/// Compression method of one entry.
pub fn compression(data: &[u8], name: &str) -> CompressionMethod {
    let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
    let method = archive.by_name(name).unwrap().compression();
    method
}
