#![forbid(unsafe_code)]

//! XML Signature engine.
//!
//! Produces enveloped `<ds:Signature>` elements over a same-document
//! reference, signed with an HMAC key or with an RSA/DSA private key and
//! its certificate, and validates them again.

pub mod context;
pub mod sign;
pub mod template;
pub mod verify;

pub use context::DsigContext;
pub use sign::{sign, sign_by_certificate, sign_by_key, SignatureRequest, SigningMaterial};
pub use verify::{embedded_certificate, find_signature_id, validate_by_certificate, validate_by_key};
