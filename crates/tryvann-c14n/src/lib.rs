#![forbid(unsafe_code)]

//! Exclusive XML Canonicalization 1.0 for the Tryvann XML signature engine.
//!
//! Both signed-info canonicalization and the reference transform chain use
//! the exclusive variant, with and without comments.

pub mod exclusive;
pub mod render;

use tryvann_core::{algorithm, Error};
use tryvann_xml::NodeSet;

/// The canonicalization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum C14nMode {
    /// Exclusive Canonical XML 1.0
    Exclusive,
    /// Exclusive Canonical XML 1.0 with comments
    ExclusiveWithComments,
}

impl C14nMode {
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Exclusive => algorithm::EXC_C14N,
            Self::ExclusiveWithComments => algorithm::EXC_C14N_WITH_COMMENTS,
        }
    }

    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            algorithm::EXC_C14N => Some(Self::Exclusive),
            algorithm::EXC_C14N_WITH_COMMENTS => Some(Self::ExclusiveWithComments),
            _ => None,
        }
    }

    pub fn with_comments(&self) -> bool {
        matches!(self, Self::ExclusiveWithComments)
    }
}

/// Canonicalize XML text.
///
/// - `node_set`: restricts output to a document subset
/// - `inclusive_prefixes`: the InclusiveNamespaces PrefixList
pub fn canonicalize(
    xml: &str,
    mode: C14nMode,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let doc = tryvann_xml::parse(xml)?;
    canonicalize_doc(&doc, mode, node_set, inclusive_prefixes)
}

/// Canonicalize a pre-parsed document.
pub fn canonicalize_doc(
    doc: &roxmltree::Document<'_>,
    mode: C14nMode,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    exclusive::canonicalize(doc, mode.with_comments(), node_set, inclusive_prefixes)
}
