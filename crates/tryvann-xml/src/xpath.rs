#![forbid(unsafe_code)]

//! Same-document reference handling.
//!
//! Only the forms XML-DSig references use here:
//! - bare fragments: `#id-value`
//! - `#xpointer(id('id-value'))`

use std::collections::HashMap;
use tryvann_core::Error;

/// Parse a same-document reference (`#foo` → `foo`).
///
/// The xpointer form is unwrapped as well. Returns `None` for anything that
/// is not a same-document reference.
pub fn parse_same_document_ref(uri: &str) -> Option<&str> {
    let fragment = uri.strip_prefix('#')?;
    Some(parse_xpointer_id(fragment).unwrap_or(fragment))
}

/// Parse an `xpointer(id('...'))` expression and return the ID value.
pub fn parse_xpointer_id(expr: &str) -> Option<&str> {
    let inner = expr.strip_prefix("xpointer(id(")?.strip_suffix("))")?;
    inner
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
}

/// Resolve an ID value in a parsed document using a pre-built ID map.
pub fn resolve_id<'a, 'input>(
    doc: &'a roxmltree::Document<'input>,
    id_map: &HashMap<String, roxmltree::NodeId>,
    id: &str,
) -> Result<roxmltree::Node<'a, 'input>, Error> {
    id_map
        .get(id)
        .and_then(|nid| doc.get_node(*nid))
        .ok_or_else(|| Error::InvalidUri(format!("no such element: {id}")))
}

/// Check if `ancestor` is an ancestor-or-self of `node`.
pub fn is_ancestor_or_self(ancestor: roxmltree::Node<'_, '_>, node: roxmltree::Node<'_, '_>) -> bool {
    node.ancestors().any(|n| n.id() == ancestor.id())
}
