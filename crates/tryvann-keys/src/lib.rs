#![forbid(unsafe_code)]

//! Key management for the Tryvann library.
//!
//! Symmetric keys for HMAC and AES, RSA/DSA/EC key pairs loaded from PEM or
//! DER, and X.509 certificates with expiry checking.

pub mod key;
pub mod keyinfo;
pub mod loader;
pub mod x509;

pub use key::{Key, KeyData};
pub use x509::X509Certificate;
