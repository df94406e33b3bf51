//! The XML parts of a template that the engine reads and rewrites.

use crate::container::TemplateContainer;
use crate::detect::FormatType;
use crate::engine::macros;
use crate::error::{Error, Result};
use crate::markup::{self, Markup};
use serde::Serialize;

/// Logical role of a part within the package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DocPart {
    /// Document body (`word/document.xml`, `content.xml`)
    Main,
    /// Word header, 1-based (`word/header{N}.xml`)
    Header(usize),
    /// Word footer, 1-based (`word/footer{N}.xml`)
    Footer(usize),
    /// ODF styles, holding headers and footers (`styles.xml`)
    Styles,
    /// Settings (`word/settings.xml`, `settings.xml`)
    Settings,
}

impl DocPart {
    /// Whether the part holds document text that macros can appear in.
    pub fn is_text(&self) -> bool {
        !matches!(self, DocPart::Settings)
    }
}

impl std::fmt::Display for DocPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocPart::Main => write!(f, "main"),
            DocPart::Header(i) => write!(f, "header{}", i),
            DocPart::Footer(i) => write!(f, "footer{}", i),
            DocPart::Styles => write!(f, "styles"),
            DocPart::Settings => write!(f, "settings"),
        }
    }
}

/// A loaded part: its archive entry, current text, and the text it was
/// loaded with.
#[derive(Debug, Clone)]
pub(crate) struct Part {
    pub kind: DocPart,
    pub entry: String,
    pub xml: String,
    loaded: String,
}

impl Part {
    fn load(container: &TemplateContainer, kind: DocPart, entry: String) -> Result<Self> {
        let xml = container.read_xml(&entry)?;
        Ok(Self {
            kind,
            entry,
            loaded: xml.clone(),
            xml,
        })
    }

    pub fn is_modified(&self) -> bool {
        self.xml != self.loaded
    }
}

/// All parts of one template, in processing order: headers, body, footers
/// for Word; styles, body for ODF; settings last.
#[derive(Debug, Clone)]
pub(crate) struct PartSet {
    parts: Vec<Part>,
    main: usize,
}

impl PartSet {
    pub fn load(container: &TemplateContainer, format: FormatType, repair: bool) -> Result<Self> {
        let main = Markup::for_format(format).main_part;
        if !container.exists(main) {
            return Err(Error::MissingComponent(main.to_string()));
        }

        let mut parts = Vec::new();
        match format {
            FormatType::Docx => {
                let headers = probe(container, markup::word_header_part);
                let footers = probe(container, markup::word_footer_part);
                for (i, entry) in headers.into_iter().enumerate() {
                    parts.push(Part::load(container, DocPart::Header(i + 1), entry)?);
                }
                parts.push(Part::load(container, DocPart::Main, main.to_string())?);
                for (i, entry) in footers.into_iter().enumerate() {
                    parts.push(Part::load(container, DocPart::Footer(i + 1), entry)?);
                }
                if container.exists(markup::WORD_SETTINGS_PART) {
                    parts.push(Part::load(
                        container,
                        DocPart::Settings,
                        markup::WORD_SETTINGS_PART.to_string(),
                    )?);
                }
            }
            FormatType::Odt => {
                if container.exists(markup::ODT_STYLES_PART) {
                    parts.push(Part::load(
                        container,
                        DocPart::Styles,
                        markup::ODT_STYLES_PART.to_string(),
                    )?);
                }
                parts.push(Part::load(container, DocPart::Main, main.to_string())?);
                if container.exists(markup::ODT_SETTINGS_PART) {
                    parts.push(Part::load(
                        container,
                        DocPart::Settings,
                        markup::ODT_SETTINGS_PART.to_string(),
                    )?);
                }
            }
        }

        if repair {
            let close = Markup::for_format(format).paragraph_close();
            for part in parts.iter_mut().filter(|p| p.kind.is_text()) {
                part.xml = macros::repair(&part.xml, &close);
            }
        }

        log::debug!(
            "loaded parts: {}",
            parts
                .iter()
                .map(|p| p.kind.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        let main = parts
            .iter()
            .position(|p| p.kind == DocPart::Main)
            .ok_or_else(|| Error::MissingComponent(main.to_string()))?;
        Ok(Self { parts, main })
    }

    /// The document body, which every loaded template has.
    pub fn main(&self) -> &Part {
        &self.parts[self.main]
    }

    pub fn main_mut(&mut self) -> &mut Part {
        &mut self.parts[self.main]
    }

    pub fn get(&self, kind: DocPart) -> Option<&Part> {
        self.parts.iter().find(|p| p.kind == kind)
    }

    pub fn get_mut(&mut self, kind: DocPart) -> Option<&mut Part> {
        self.parts.iter_mut().find(|p| p.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter()
    }

    /// Parts holding document text, in processing order.
    pub fn text_parts(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter().filter(|p| p.kind.is_text())
    }

    pub fn text_parts_mut(&mut self) -> impl Iterator<Item = &mut Part> {
        self.parts.iter_mut().filter(|p| p.kind.is_text())
    }

    /// Put every modified part back into the container.
    pub fn write_back(&self, container: &mut TemplateContainer) {
        for part in self.parts.iter().filter(|p| p.is_modified()) {
            log::debug!("writing back {}", part.entry);
            container.put_xml(&part.entry, &part.xml);
        }
    }
}

/// Entry names `name(1)`, `name(2)`, ... up to the first one missing.
fn probe(container: &TemplateContainer, name: fn(usize) -> String) -> Vec<String> {
    (1..)
        .map(name)
        .take_while(|entry| container.exists(entry))
        .collect()
}
