//! # doctmpl
//!
//! Fill Word (DOCX) and OpenDocument text (ODT) templates without parsing
//! their XML.
//!
//! Templates carry `${NAME}` macros. The library substitutes values, clones
//! and removes the table rows, paragraphs and named blocks that hold them,
//! and runs Word mail merges, all by editing the raw XML text of each part
//! so that whatever the word processor wrote is kept byte for byte.
//!
//! ## Quick Start
//!
//! ```no_run
//! use doctmpl::TemplateDocument;
//!
//! let mut doc = TemplateDocument::open("invoice.docx")?;
//! println!("Variables: {:?}", doc.get_variables());
//!
//! // Simple substitution, in headers, body and footers
//! doc.set_value("CUSTOMER", "ACME Corp.");
//!
//! // One table row per item
//! doc.clone_row_and_set_values(
//!     "ITEM",
//!     [
//!         [("ITEM", "Widgets"), ("PRICE", "10.00")],
//!         [("ITEM", "Gadgets"), ("PRICE", "12.50")],
//!     ],
//! )
//! .or_fail()?;
//!
//! // Drop an optional section
//! doc.delete_block("DISCOUNT").or_fail()?;
//!
//! doc.save_as("invoice-acme.docx")?;
//! # Ok::<(), doctmpl::Error>(())
//! ```
//!
//! ## Missing macros
//!
//! Row, block and segment operations return [`Located`], which keeps apart
//! a macro that does not exist from one that is not inside the requested
//! element. Call [`Located::found`] to treat a miss as `None`, or
//! [`Located::or_fail`] to turn it into an [`Error`].
//!
//! ## Mail merge
//!
//! ```no_run
//! use doctmpl::{MailMerge, TemplateDocument};
//!
//! let mut doc = TemplateDocument::open("letter.docx")?;
//! let report = MailMerge::new().with_value("FirstName", "Ada").apply(&mut doc)?;
//! println!("{} fields merged", report.success_count());
//! # Ok::<(), doctmpl::Error>(())
//! ```

pub mod container;
pub mod detect;
pub mod engine;
pub mod error;
pub mod mailmerge;
pub mod markup;
pub mod options;
pub mod template;

// Re-exports
pub use container::TemplateContainer;
pub use detect::{detect_format_from_bytes, detect_format_from_path, FormatType};
pub use engine::segment::Action;
pub use engine::{Direction, Located, Span};
pub use error::{Error, Result};
pub use mailmerge::{merge_field_names, MailMerge, MergeReport};
pub use options::TemplateOptions;
pub use template::{DocPart, TemplateDocument};

use std::path::Path;

/// Substitute `values` into the template at `template` and save the result
/// to `output`. Returns the number of replacements made.
///
/// # Example
///
/// ```no_run
/// let count = doctmpl::fill_file(
///     "letter.docx",
///     "letter-ada.docx",
///     [("NAME", "Ada"), ("CITY", "London")],
/// )?;
/// println!("{} replacements", count);
/// # Ok::<(), doctmpl::Error>(())
/// ```
pub fn fill_file<I, K, V>(
    template: impl AsRef<Path>,
    output: impl AsRef<Path>,
    values: I,
) -> Result<usize>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut doc = TemplateDocument::open(template)?;
    let count = doc.set_values(values);
    doc.save_as(output)?;
    Ok(count)
}

/// Substitute `values` into a template held in memory and return the
/// resulting package bytes.
pub fn fill_bytes<I, K, V>(data: Vec<u8>, values: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut doc = TemplateDocument::from_bytes(data)?;
    doc.set_values(values);
    doc.into_bytes()
}

/// Names of the macros in a template file.
///
/// # Example
///
/// ```no_run
/// for name in doctmpl::variables("letter.docx")? {
///     println!("{}", name);
/// }
/// # Ok::<(), doctmpl::Error>(())
/// ```
pub fn variables(path: impl AsRef<Path>) -> Result<Vec<String>> {
    Ok(TemplateDocument::open(path)?.get_variables())
}
