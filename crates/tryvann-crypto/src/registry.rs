#![forbid(unsafe_code)]

//! Algorithm registry mapping URIs and registry entries to implementations.

use crate::cipher::{AesCtr, CipherAlgorithm};
use crate::digest::DigestAlgorithm;
use crate::sign::{HmacSign, SignatureAlgorithm};
use tryvann_core::{Error, HashType};

/// Central lookup for all cryptographic algorithms.
pub struct AlgorithmRegistry;

impl AlgorithmRegistry {
    /// Look up a digest algorithm by URI.
    pub fn digest(uri: &str) -> Result<Box<dyn DigestAlgorithm>, Error> {
        crate::digest::from_uri(uri)
    }

    /// Look up a signature algorithm by URI.
    pub fn signature(uri: &str) -> Result<Box<dyn SignatureAlgorithm>, Error> {
        crate::sign::from_uri(uri)
    }

    /// The HMAC signature method for a registry entry.
    ///
    /// Entries without an XML signature URI are rejected.
    pub fn hmac_signature(hash_type: HashType) -> Result<Box<dyn SignatureAlgorithm>, Error> {
        if !hash_type.is_hmac() {
            return Err(Error::UnsupportedAlgorithm(format!(
                "{} has no XML signature method",
                hash_type.native_name()
            )));
        }
        Ok(Box::new(HmacSign::new(hash_type)))
    }

    /// Look up a cipher by registry entry.
    pub fn cipher(hash_type: HashType) -> Result<Box<dyn CipherAlgorithm>, Error> {
        match hash_type {
            HashType::Aes => Ok(Box::new(AesCtr::fixed_iv())),
            other => Err(Error::UnsupportedAlgorithm(format!(
                "cipher: {}",
                other.native_name()
            ))),
        }
    }
}
