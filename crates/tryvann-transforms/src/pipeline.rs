#![forbid(unsafe_code)]

//! Transform pipeline and trait definitions.

use crate::enveloped::EnvelopedSignatureTransform;
use tryvann_c14n::C14nMode;
use tryvann_core::{algorithm, Error};
use tryvann_xml::NodeSet;

/// Data flowing through the transform pipeline.
pub enum TransformData {
    /// XML text plus the node subset selected so far.
    Xml {
        xml_text: String,
        node_set: Option<NodeSet>,
    },
    /// Raw octets.
    Binary(Vec<u8>),
}

impl TransformData {
    /// Convert to octets, canonicalizing XML with exclusive C14N.
    pub fn into_binary(self) -> Result<Vec<u8>, Error> {
        match self {
            TransformData::Binary(data) => Ok(data),
            TransformData::Xml { xml_text, node_set } => {
                tryvann_c14n::canonicalize(&xml_text, C14nMode::Exclusive, node_set.as_ref(), &[])
            }
        }
    }
}

/// Trait for individual transforms.
pub trait Transform: Send {
    /// The algorithm URI for this transform.
    fn uri(&self) -> &str;

    /// Execute the transform on the given data.
    fn execute(&self, input: TransformData) -> Result<TransformData, Error>;
}

/// Create a transform from its algorithm URI.
///
/// `signature` is the `<Signature>` element the enveloped transform removes.
pub fn from_uri(
    uri: &str,
    signature: roxmltree::NodeId,
    inclusive_prefixes: Vec<String>,
) -> Result<Box<dyn Transform>, Error> {
    if uri == algorithm::ENVELOPED_SIGNATURE {
        return Ok(Box::new(EnvelopedSignatureTransform::new(signature)));
    }
    match C14nMode::from_uri(uri) {
        Some(mode) => Ok(Box::new(C14nTransform::new(mode, inclusive_prefixes))),
        None => Err(Error::UnsupportedAlgorithm(format!("transform: {uri}"))),
    }
}

/// A pipeline of transforms executed in sequence.
#[derive(Default)]
pub struct TransformPipeline {
    transforms: Vec<Box<dyn Transform>>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, transform: Box<dyn Transform>) {
        self.transforms.push(transform);
    }

    /// Execute all transforms in order.
    pub fn execute(&self, input: TransformData) -> Result<TransformData, Error> {
        let mut data = input;
        for transform in &self.transforms {
            log::debug!("applying transform {}", transform.uri());
            data = transform.execute(data)?;
        }
        Ok(data)
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

// ── C14N Transform ───────────────────────────────────────────────────

/// A canonicalization transform.
pub struct C14nTransform {
    mode: C14nMode,
    inclusive_prefixes: Vec<String>,
}

impl C14nTransform {
    pub fn new(mode: C14nMode, inclusive_prefixes: Vec<String>) -> Self {
        Self {
            mode,
            inclusive_prefixes,
        }
    }
}

impl Transform for C14nTransform {
    fn uri(&self) -> &str {
        self.mode.uri()
    }

    fn execute(&self, input: TransformData) -> Result<TransformData, Error> {
        let bytes = match input {
            TransformData::Xml { xml_text, node_set } => tryvann_c14n::canonicalize(
                &xml_text,
                self.mode,
                node_set.as_ref(),
                &self.inclusive_prefixes,
            )?,
            TransformData::Binary(data) => tryvann_c14n::canonicalize(
                std::str::from_utf8(&data)
                    .map_err(|e| Error::Transform(format!("invalid UTF-8: {e}")))?,
                self.mode,
                None,
                &self.inclusive_prefixes,
            )?,
        };
        Ok(TransformData::Binary(bytes))
    }
}
