#![forbid(unsafe_code)]

//! Enveloped signature transform.
//!
//! Drops the `<Signature>` element that contains the reference from the
//! node set, so the digest covers the document as it was before signing.

use crate::pipeline::{Transform, TransformData};
use roxmltree::NodeId;
use tryvann_core::{algorithm, Error};
use tryvann_xml::NodeSet;

/// Removes one `<Signature>` subtree from the node set.
///
/// Node ids are positions in document order, so the id taken from one parse
/// of a text names the same element in any later parse of that text.
pub struct EnvelopedSignatureTransform {
    signature: NodeId,
}

impl EnvelopedSignatureTransform {
    pub fn new(signature: NodeId) -> Self {
        Self { signature }
    }
}

impl Transform for EnvelopedSignatureTransform {
    fn uri(&self) -> &str {
        algorithm::ENVELOPED_SIGNATURE
    }

    fn execute(&self, input: TransformData) -> Result<TransformData, Error> {
        match input {
            TransformData::Xml { xml_text, node_set } => {
                let node_set = {
                    let doc = tryvann_xml::parse(&xml_text)?;
                    let signature = doc.get_node(self.signature).ok_or_else(|| {
                        Error::Transform("enveloped signature node not found".into())
                    })?;
                    let mut ns = node_set.unwrap_or_else(|| NodeSet::all(&doc));
                    ns.remove_subtree(signature);
                    ns
                };
                Ok(TransformData::Xml {
                    xml_text,
                    node_set: Some(node_set),
                })
            }
            TransformData::Binary(_) => Err(Error::Transform(
                "enveloped-signature transform requires XML input".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_signature_subtree() {
        let xml = "<doc Id=\"d\"><data>x</data><Signature><v>1</v></Signature></doc>";
        let doc = tryvann_xml::parse(xml).unwrap();
        let sig = doc.root_element().last_element_child().unwrap().id();

        let out = EnvelopedSignatureTransform::new(sig)
            .execute(TransformData::Xml {
                xml_text: xml.into(),
                node_set: None,
            })
            .unwrap()
            .into_binary()
            .unwrap();
        assert_eq!(out, b"<doc Id=\"d\"><data>x</data></doc>");
    }

    #[test]
    fn test_rejects_binary_input() {
        let doc = tryvann_xml::parse("<a/>").unwrap();
        let t = EnvelopedSignatureTransform::new(doc.root_element().id());
        assert!(matches!(
            t.execute(TransformData::Binary(vec![1])),
            Err(Error::Transform(_))
        ));
    }
}
