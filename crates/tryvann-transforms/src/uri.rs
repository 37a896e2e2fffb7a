#![forbid(unsafe_code)]

//! URI resolution for XML-DSig references.
//!
//! - `""`: the whole document without comments
//! - `#id` and `#xpointer(id('id'))`: the identified subtree
//!
//! External references are rejected.

use std::collections::HashMap;
use tryvann_core::Error;
use tryvann_xml::{xpath, NodeSet};

/// Resolve a reference URI to the node set it selects.
pub fn resolve_uri(
    uri: &str,
    doc: &roxmltree::Document<'_>,
    id_map: &HashMap<String, roxmltree::NodeId>,
) -> Result<NodeSet, Error> {
    if uri.is_empty() {
        return Ok(NodeSet::all_without_comments(doc));
    }
    match xpath::parse_same_document_ref(uri) {
        Some(id) => {
            let node = xpath::resolve_id(doc, id_map, id)?;
            Ok(NodeSet::tree_without_comments(node))
        }
        None => Err(Error::InvalidUri(format!("external URI not supported: {uri}"))),
    }
}
