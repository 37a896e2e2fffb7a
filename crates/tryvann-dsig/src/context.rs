#![forbid(unsafe_code)]

//! DSig context: configuration shared by the sign and validate paths.

use tryvann_core::ns;

/// Id given to a signature when the caller does not name one.
pub const DEFAULT_SIGNATURE_ID: &str = "coolSignature";

/// Context for XML-DSig operations.
#[derive(Debug, Clone)]
pub struct DsigContext {
    /// Id written on `<Signature>` when a request leaves it empty.
    pub default_signature_id: String,
    /// Prefix bound to the XML-DSig namespace in written signatures.
    pub prefix: String,
    /// Additional ID attribute names to register.
    pub id_attrs: Vec<String>,
    /// Minimum accepted `HMACOutputLength` in bits (0 = use the default floor).
    pub hmac_min_out_len: u32,
}

impl Default for DsigContext {
    fn default() -> Self {
        Self {
            default_signature_id: DEFAULT_SIGNATURE_ID.to_owned(),
            prefix: ns::DSIG_PREFIX.to_owned(),
            id_attrs: Vec::new(),
            hmac_min_out_len: 0,
        }
    }
}

impl DsigContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an ID attribute name to register during processing.
    pub fn add_id_attr(&mut self, name: &str) {
        self.id_attrs.push(name.to_owned());
    }

    /// The signature id to write: `requested` unless it is empty.
    pub fn signature_id<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        match requested {
            Some(id) if !id.is_empty() => id,
            _ => &self.default_signature_id,
        }
    }
}
