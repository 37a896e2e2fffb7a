#![forbid(unsafe_code)]

//! Digest (hash) algorithm implementations and salted hashing.

use digest::Digest;
use tryvann_core::{algorithm, Error, HashType};

/// Trait for digest algorithms.
pub trait DigestAlgorithm: Send {
    /// Feed data into the hash.
    fn update(&mut self, data: &[u8]);
    /// Finalize and return the hash value.
    fn finalize(self: Box<Self>) -> Vec<u8>;
    /// Algorithm URI.
    fn uri(&self) -> &'static str;
}

/// Create a digest algorithm from its URI.
pub fn from_uri(uri: &str) -> Result<Box<dyn DigestAlgorithm>, Error> {
    match uri {
        algorithm::SHA1 => Ok(Box::new(Sha1Digest::new())),
        algorithm::SHA256 => Ok(Box::new(Sha256Digest::new())),
        algorithm::SHA384 => Ok(Box::new(Sha384Digest::new())),
        algorithm::SHA512 => Ok(Box::new(Sha512Digest::new())),
        _ => Err(Error::UnsupportedAlgorithm(format!("digest algorithm: {uri}"))),
    }
}

/// Create a digest algorithm for one of the registry's plain hash entries.
pub fn from_hash_type(hash_type: HashType) -> Result<Box<dyn DigestAlgorithm>, Error> {
    match hash_type {
        HashType::Sha256 => Ok(Box::new(Sha256Digest::new())),
        HashType::Sha384 => Ok(Box::new(Sha384Digest::new())),
        HashType::Sha512 => Ok(Box::new(Sha512Digest::new())),
        other => Err(Error::UnsupportedAlgorithm(format!(
            "{} is not a digest algorithm",
            other.native_name()
        ))),
    }
}

/// Compute a digest in one shot.
pub fn digest(uri: &str, data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut hasher = from_uri(uri)?;
    hasher.update(data);
    Ok(hasher.finalize())
}

/// Hash `salt` followed by the UTF-8 bytes of `input`.
pub fn salted_hash(hash_type: HashType, salt: &[u8], input: &str) -> Result<Vec<u8>, Error> {
    let mut hasher = from_hash_type(hash_type)?;
    hasher.update(salt);
    hasher.update(input.as_bytes());
    Ok(hasher.finalize())
}

/// [`salted_hash`] as lowercase hex.
pub fn salted_hash_hex(hash_type: HashType, salt: &[u8], input: &str) -> Result<String, Error> {
    salted_hash(hash_type, salt, input).map(hex::encode)
}

// ── Concrete implementations ─────────────────────────────────────────

macro_rules! impl_digest {
    ($name:ident, $hasher:ty, $uri:expr) => {
        struct $name {
            inner: $hasher,
        }

        impl $name {
            fn new() -> Self {
                Self {
                    inner: <$hasher>::new(),
                }
            }
        }

        impl DigestAlgorithm for $name {
            fn update(&mut self, data: &[u8]) {
                Digest::update(&mut self.inner, data);
            }

            fn finalize(self: Box<Self>) -> Vec<u8> {
                Digest::finalize(self.inner).to_vec()
            }

            fn uri(&self) -> &'static str {
                $uri
            }
        }
    };
}

impl_digest!(Sha1Digest, sha1::Sha1, algorithm::SHA1);
impl_digest!(Sha256Digest, sha2::Sha256, algorithm::SHA256);
impl_digest!(Sha384Digest, sha2::Sha384, algorithm::SHA384);
impl_digest!(Sha512Digest, sha2::Sha512, algorithm::SHA512);
