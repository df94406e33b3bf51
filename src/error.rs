//! Error types for the doctmpl library.

use std::io;
use thiserror::Error;

/// Result type alias for doctmpl operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading, processing or saving a template.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format could not be determined.
    #[error("Unknown file format")]
    UnknownFormat,

    /// The file format is recognized but not supported.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Error reading or writing the ZIP archive.
    #[error("ZIP archive error: {0}")]
    ZipArchive(String),

    /// A required document component is missing.
    #[error("Missing component: {0}")]
    MissingComponent(String),

    /// The searched macro does not occur in the targeted part.
    #[error("Can not find macro {0}, template variable not found or variable contains markup")]
    MacroNotFound(String),

    /// The macro was found but no enclosing element of the requested kind.
    #[error("Can not find <{tag}> element enclosing {needle}")]
    TagNotFound {
        /// Tag name that was searched for (e.g. `w:tr`)
        tag: String,
        /// Macro the search started from
        needle: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error reports a missing macro or enclosing element,
    /// as opposed to an I/O or archive failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::MacroNotFound(_) | Error::TagNotFound { .. })
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::ZipArchive(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}
