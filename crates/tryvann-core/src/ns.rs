#![forbid(unsafe_code)]

//! XML namespace constants used across the library.

/// XML Digital Signature namespace
pub const DSIG: &str = "http://www.w3.org/2000/09/xmldsig#";

/// Exclusive C14N namespace
pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

/// XML namespace
pub const XML: &str = "http://www.w3.org/XML/1998/namespace";

/// Prefix bound to [`DSIG`] on every signature this library writes.
pub const DSIG_PREFIX: &str = "ds";

// ── Element names ────────────────────────────────────────────────────

pub mod node {
    pub const SIGNATURE: &str = "Signature";
    pub const SIGNED_INFO: &str = "SignedInfo";
    pub const CANONICALIZATION_METHOD: &str = "CanonicalizationMethod";
    pub const SIGNATURE_METHOD: &str = "SignatureMethod";
    pub const HMAC_OUTPUT_LENGTH: &str = "HMACOutputLength";
    pub const SIGNATURE_VALUE: &str = "SignatureValue";
    pub const DIGEST_METHOD: &str = "DigestMethod";
    pub const DIGEST_VALUE: &str = "DigestValue";
    pub const REFERENCE: &str = "Reference";
    pub const TRANSFORMS: &str = "Transforms";
    pub const TRANSFORM: &str = "Transform";
    pub const INCLUSIVE_NAMESPACES: &str = "InclusiveNamespaces";

    pub const KEY_INFO: &str = "KeyInfo";
    pub const X509_DATA: &str = "X509Data";
    pub const X509_SUBJECT_NAME: &str = "X509SubjectName";
    pub const X509_CERTIFICATE: &str = "X509Certificate";
}

// ── Attribute names ──────────────────────────────────────────────────

pub mod attr {
    pub const ALGORITHM: &str = "Algorithm";
    pub const URI: &str = "URI";
    pub const ID: &str = "Id";
    pub const PREFIX_LIST: &str = "PrefixList";
}
