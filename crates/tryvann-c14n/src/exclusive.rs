#![forbid(unsafe_code)]

//! Exclusive Canonical XML 1.0 (exc-C14N).
//!
//! Algorithm URI: `http://www.w3.org/2001/10/xml-exc-c14n#`
//! With comments: `http://www.w3.org/2001/10/xml-exc-c14n#WithComments`
//!
//! Only "visibly utilized" namespace declarations are output. A namespace
//! is visibly utilized by an element if:
//! 1. its prefix is used by the element's tag name, OR
//! 2. its prefix is used by one of the element's attributes, OR
//! 3. the prefix appears in the InclusiveNamespaces PrefixList.
//!
//! A declaration is emitted only when it differs from the one already in
//! force on the nearest output ancestor.

use crate::render::{self, Attr, NsDecl};
use roxmltree::{Document, Node, NodeType};
use std::collections::{BTreeMap, HashSet};
use tryvann_core::{ns, Error};
use tryvann_xml::document::element_prefix;
use tryvann_xml::NodeSet;

/// Canonicalize using Exclusive C14N 1.0.
pub fn canonicalize(
    doc: &Document<'_>,
    with_comments: bool,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let inclusive_prefixes = inclusive_prefixes
        .iter()
        .map(|p| if p == "#default" { String::new() } else { p.clone() })
        .collect();
    let ctx = ExcC14nContext {
        with_comments,
        node_set,
        inclusive_prefixes,
    };
    let mut output = Vec::new();
    ctx.process_node(doc.root(), &mut output, &BTreeMap::new())?;
    Ok(output)
}

struct ExcC14nContext<'a> {
    with_comments: bool,
    node_set: Option<&'a NodeSet>,
    /// `#default` is stored as "".
    inclusive_prefixes: HashSet<String>,
}

impl<'a> ExcC14nContext<'a> {
    fn is_visible(&self, node: &Node<'_, '_>) -> bool {
        self.node_set.map_or(true, |ns| ns.contains(node))
    }

    fn process_node(
        &self,
        node: Node<'_, '_>,
        output: &mut Vec<u8>,
        rendered_ns: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        match node.node_type() {
            NodeType::Root => {
                for child in node.children() {
                    self.process_node(child, output, rendered_ns)?;
                }
            }
            NodeType::Element => self.process_element(node, output, rendered_ns)?,
            NodeType::Text => {
                if self.is_visible(&node) {
                    render::escape_text(output, node.text().unwrap_or(""));
                }
            }
            NodeType::Comment => {
                if self.with_comments && self.is_visible(&node) {
                    write_top_level(node, output, |out| {
                        out.extend_from_slice(b"<!--");
                        out.extend_from_slice(node.text().unwrap_or("").as_bytes());
                        out.extend_from_slice(b"-->");
                    });
                }
            }
            NodeType::PI => {
                if let (true, Some(pi)) = (self.is_visible(&node), node.pi()) {
                    write_top_level(node, output, |out| {
                        out.extend_from_slice(b"<?");
                        out.extend_from_slice(pi.target.as_bytes());
                        if let Some(value) = pi.value.filter(|v| !v.is_empty()) {
                            out.push(b' ');
                            render::escape_pi(out, value);
                        }
                        out.extend_from_slice(b"?>");
                    });
                }
            }
        }
        Ok(())
    }

    fn process_element(
        &self,
        node: Node<'_, '_>,
        output: &mut Vec<u8>,
        rendered_ns: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        if !self.is_visible(&node) {
            // Invisible elements render nothing themselves and do not
            // change what the nearest output ancestor has declared.
            for child in node.children() {
                self.process_node(child, output, rendered_ns)?;
            }
            return Ok(());
        }

        let inscope = collect_inscope_namespaces(node);

        let elem_prefix = element_prefix(node);
        let mut utilized: HashSet<String> = self.inclusive_prefixes.clone();
        utilized.insert(elem_prefix.to_owned());

        let mut attrs: Vec<Attr> = Vec::new();
        for attr in node.attributes() {
            let ns_uri = attr.namespace().unwrap_or("");
            let qualified_name = match attr_prefix(node, ns_uri)? {
                Some(prefix) => {
                    utilized.insert(prefix.clone());
                    format!("{prefix}:{}", attr.name())
                }
                None => attr.name().to_owned(),
            };
            attrs.push(Attr {
                ns_uri: ns_uri.to_owned(),
                local_name: attr.name().to_owned(),
                qualified_name,
                value: attr.value().to_owned(),
            });
        }
        attrs.sort();

        let mut ns_decls: Vec<NsDecl> = Vec::new();
        for prefix in &utilized {
            if prefix == "xml" {
                continue;
            }
            match inscope.get(prefix) {
                Some(uri) if rendered_ns.get(prefix) != Some(uri) => ns_decls.push(NsDecl {
                    prefix: prefix.clone(),
                    uri: uri.clone(),
                }),
                Some(_) => {}
                None if prefix.is_empty() => {
                    // Undeclare a default namespace an ancestor rendered.
                    if rendered_ns.get("").is_some_and(|uri| !uri.is_empty()) {
                        ns_decls.push(NsDecl {
                            prefix: String::new(),
                            uri: String::new(),
                        });
                    }
                }
                None => {
                    if !self.inclusive_prefixes.contains(prefix) {
                        return Err(Error::Canonicalization(format!(
                            "prefix {prefix} is not bound on <{}>",
                            node.tag_name().name()
                        )));
                    }
                }
            }
        }
        ns_decls.sort();

        let qname = if elem_prefix.is_empty() {
            node.tag_name().name().to_owned()
        } else {
            format!("{elem_prefix}:{}", node.tag_name().name())
        };

        output.push(b'<');
        output.extend_from_slice(qname.as_bytes());
        for decl in &ns_decls {
            decl.write(output);
        }
        for attr in &attrs {
            attr.write(output);
        }
        output.push(b'>');

        let child_rendered_ns = if ns_decls.is_empty() {
            None
        } else {
            let mut next = rendered_ns.clone();
            for decl in ns_decls {
                next.insert(decl.prefix, decl.uri);
            }
            Some(next)
        };
        let child_rendered_ns = child_rendered_ns.as_ref().unwrap_or(rendered_ns);

        for child in node.children() {
            self.process_node(child, output, child_rendered_ns)?;
        }

        output.extend_from_slice(b"</");
        output.extend_from_slice(qname.as_bytes());
        output.push(b'>');
        Ok(())
    }
}

/// Write a comment or PI, adding the line breaks required around nodes
/// that are siblings of the document element.
fn write_top_level(node: Node<'_, '_>, output: &mut Vec<u8>, write: impl FnOnce(&mut Vec<u8>)) {
    let top_level = node
        .parent()
        .is_some_and(|p| p.node_type() == NodeType::Root);
    if top_level && node.prev_siblings().any(|s| s.is_element()) {
        output.push(b'\n');
    }
    write(output);
    if top_level && node.next_siblings().any(|s| s.is_element()) {
        output.push(b'\n');
    }
}

/// In-scope namespace bindings for an element, prefix "" for the default.
fn collect_inscope_namespaces(node: Node<'_, '_>) -> BTreeMap<String, String> {
    node.namespaces()
        .filter(|ns| !ns.uri().is_empty())
        .map(|ns| (ns.name().unwrap_or("").to_owned(), ns.uri().to_owned()))
        .collect()
}

/// The prefix a namespaced attribute was written with.
///
/// Unqualified attributes have no prefix. Qualified ones must be bound to
/// a non-default prefix in scope.
fn attr_prefix(node: Node<'_, '_>, ns_uri: &str) -> Result<Option<String>, Error> {
    if ns_uri.is_empty() {
        return Ok(None);
    }
    if ns_uri == ns::XML {
        return Ok(Some("xml".to_owned()));
    }
    node.namespaces()
        .find_map(|ns| ns.name().filter(|_| ns.uri() == ns_uri))
        .map(|p| Some(p.to_owned()))
        .ok_or_else(|| Error::Canonicalization(format!("no prefix bound to {ns_uri}")))
}
