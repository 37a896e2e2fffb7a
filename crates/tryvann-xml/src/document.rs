#![forbid(unsafe_code)]

//! XML document wrapper over roxmltree with ID attribute registration.

use std::collections::HashMap;
use tryvann_core::Error;

/// Attribute names registered as IDs on every document.
pub const DEFAULT_ID_ATTRS: [&str; 3] = ["Id", "ID", "id"];

/// An owned XML document.  Stores the text and pre-computed metadata.
///
/// To work with the parsed tree, call [`XmlDocument::parse_doc`] which
/// returns a temporary `roxmltree::Document` borrowing from the text.
/// Mutation happens by replacing the text as a whole, so a document is
/// never left half-edited.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    text: String,
    extra_id_attrs: Vec<String>,
}

impl XmlDocument {
    /// Parse and validate XML from a string, taking ownership.
    pub fn parse(text: String) -> Result<Self, Error> {
        let doc = crate::parse(&text)?;
        if !doc.root().children().any(|n| n.is_element()) {
            return Err(Error::XmlStructure("document has no root element".into()));
        }
        drop(doc);
        Ok(Self {
            text,
            extra_id_attrs: Vec::new(),
        })
    }

    /// Parse and validate XML from bytes.
    pub fn parse_bytes(data: &[u8]) -> Result<Self, Error> {
        let text = std::str::from_utf8(data)
            .map_err(|e| Error::XmlParse(format!("invalid UTF-8: {e}")))?
            .to_owned();
        Self::parse(text)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// Register an additional ID attribute name (e.g. `"wsu:Id"`).
    pub fn add_id_attr(&mut self, name: &str) {
        if !self.extra_id_attrs.iter().any(|a| a == name) {
            self.extra_id_attrs.push(name.to_owned());
        }
    }

    pub fn id_attrs(&self) -> impl Iterator<Item = &str> {
        DEFAULT_ID_ATTRS
            .iter()
            .copied()
            .chain(self.extra_id_attrs.iter().map(String::as_str))
    }

    /// Parse the stored text into a temporary `roxmltree::Document`.
    pub fn parse_doc(&self) -> Result<roxmltree::Document<'_>, Error> {
        crate::parse(&self.text)
    }

    /// Build the ID → NodeId mapping for a parsed document.
    ///
    /// Attribute names may be given as `prefix:local`; only the local part
    /// is matched.
    pub fn build_id_map(&self, doc: &roxmltree::Document<'_>) -> HashMap<String, roxmltree::NodeId> {
        let names: Vec<&str> = self
            .id_attrs()
            .map(|n| n.rsplit(':').next().unwrap_or(n))
            .collect();
        let mut map = HashMap::new();
        for node in doc.descendants().filter(|n| n.is_element()) {
            for attr in node.attributes() {
                if names.contains(&attr.name()) {
                    map.insert(attr.value().to_owned(), node.id());
                }
            }
        }
        map
    }

    /// Find an element by its registered ID value in a parsed document.
    pub fn find_by_id<'a, 'input>(
        doc: &'a roxmltree::Document<'input>,
        id_map: &HashMap<String, roxmltree::NodeId>,
        id: &str,
    ) -> Option<roxmltree::Node<'a, 'input>> {
        let node_id = id_map.get(id)?;
        doc.get_node(*node_id)
    }

    /// Text of the document with `fragment` appended as the last child of
    /// the root element. The stored text is not touched.
    pub fn spliced_into_root(&self, fragment: &str) -> Result<String, Error> {
        let doc = self.parse_doc()?;
        let root = doc.root_element();
        let range = root.range();
        let element_text = &self.text[range.clone()];

        let mut out = String::with_capacity(self.text.len() + fragment.len() + 16);
        if element_text.ends_with("/>") {
            // Self-closing root: expand it into a start and end tag.
            let qname = qualified_name(root);
            out.push_str(&self.text[..range.end - 2]);
            out.push('>');
            out.push_str(fragment);
            out.push_str("</");
            out.push_str(&qname);
            out.push('>');
        } else {
            let close = element_text
                .rfind("</")
                .ok_or_else(|| Error::XmlStructure("root element has no end tag".into()))?;
            let at = range.start + close;
            out.push_str(&self.text[..at]);
            out.push_str(fragment);
            out.push_str(&self.text[at..]);
        }
        out.push_str(&self.text[range.end..]);
        Ok(out)
    }

    /// Replace the document text. The new text must parse; on error the
    /// document is unchanged.
    pub fn replace_text(&mut self, text: String) -> Result<(), Error> {
        crate::parse(&text)?;
        self.text = text;
        Ok(())
    }
}

/// Find the first descendant element with the given local name and namespace.
pub fn find_element<'a, 'input>(
    doc: &'a roxmltree::Document<'input>,
    ns: &str,
    local_name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    doc.descendants().find(|n| is_element_named(n, ns, local_name))
}

/// Find the first child element with the given local name and namespace.
pub fn find_child_element<'a, 'input>(
    parent: roxmltree::Node<'a, 'input>,
    ns: &str,
    local_name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    parent.children().find(|n| is_element_named(n, ns, local_name))
}

/// Find all child elements with the given local name and namespace.
pub fn find_child_elements<'a, 'input>(
    parent: roxmltree::Node<'a, 'input>,
    ns: &str,
    local_name: &str,
) -> Vec<roxmltree::Node<'a, 'input>> {
    parent
        .children()
        .filter(|n| is_element_named(n, ns, local_name))
        .collect()
}

fn is_element_named(node: &roxmltree::Node<'_, '_>, ns: &str, local_name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local_name
        && node.tag_name().namespace().unwrap_or("") == ns
}

/// The prefix an element was written with in the source text, or `""`.
///
/// roxmltree resolves names to (namespace, local) pairs; the prefix is
/// recovered from the start tag.
pub fn element_prefix<'input>(node: roxmltree::Node<'_, 'input>) -> &'input str {
    let input = node.document().input_text();
    let start = node.range().start;
    let tag = input.get(start + 1..).unwrap_or("");
    let end = tag
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(tag.len());
    match tag[..end].split_once(':') {
        Some((prefix, _)) => prefix,
        None => "",
    }
}

/// `prefix:local` or `local` for an element.
pub fn qualified_name(node: roxmltree::Node<'_, '_>) -> String {
    let prefix = element_prefix(node);
    let local = node.tag_name().name();
    if prefix.is_empty() {
        local.to_owned()
    } else {
        format!("{prefix}:{local}")
    }
}
