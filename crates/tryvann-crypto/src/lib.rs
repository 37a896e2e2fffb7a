#![forbid(unsafe_code)]

//! Cryptographic primitives for the Tryvann library.
//!
//! Digests and salted hashing, HMAC, the XML-DSig signature algorithms
//! (HMAC-*, RSA-SHA1, DSA-SHA1) and the AES-CTR stream cipher used by the
//! integrity container.

pub mod cipher;
pub mod digest;
pub mod mac;
pub mod registry;
pub mod sign;

pub use cipher::{AesCtr, CipherAlgorithm};
pub use digest::DigestAlgorithm;
pub use registry::AlgorithmRegistry;
pub use sign::{SignatureAlgorithm, SigningKey};
