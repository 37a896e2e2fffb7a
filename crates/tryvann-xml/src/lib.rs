#![forbid(unsafe_code)]

//! XML document abstraction for the Tryvann XML signature engine.
//!
//! Provides an owned document over `roxmltree`, the `NodeSet` needed by
//! canonicalization and the enveloped-signature transform, and a small
//! writer for building `<ds:Signature>` fragments.

pub mod document;
pub mod nodeset;
pub mod writer;
pub mod xpath;

pub use document::XmlDocument;
pub use nodeset::NodeSet;
pub use writer::XmlWriter;

/// roxmltree parsing options used throughout the crate.
///
/// DTDs are allowed; roxmltree never fetches external entities.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    }
}

/// Parse `text` with [`parsing_options`].
pub fn parse(text: &str) -> Result<roxmltree::Document<'_>, tryvann_core::Error> {
    roxmltree::Document::parse_with_options(text, parsing_options())
        .map_err(|e| tryvann_core::Error::XmlParse(e.to_string()))
}
