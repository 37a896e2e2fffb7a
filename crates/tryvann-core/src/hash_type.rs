#![forbid(unsafe_code)]

//! Hash/algorithm registry.
//!
//! A closed table mapping each supported algorithm to its native name, its
//! XML-DSig signature method URI and its bit length. Pure data; both the
//! integrity container engine and the XML signature engine read from it.

use crate::{algorithm, Error};
use std::fmt;
use std::str::FromStr;

/// Static description of one registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmSpec {
    /// Registry name, e.g. `HMAC_SHA_256`.
    pub logical_name: &'static str,
    /// Name of the underlying cipher or digest, e.g. `HmacSHA256`.
    pub native_name: &'static str,
    /// XML-DSig `SignatureMethod` URI; empty for non-HMAC entries.
    pub xml_signature_uri: &'static str,
    /// Output length in bits (0 for ciphers).
    pub bit_length: u32,
}

/// The closed set of supported algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashType {
    Sha256,
    Sha384,
    Sha512,
    HmacSha1,
    HmacSha256,
    HmacSha384,
    HmacSha512,
    HmacMd5,
    Aes,
    TripleDes,
}

/// The HMAC algorithm used when a caller does not pick one.
pub const DEFAULT_HASH_TYPE: HashType = HashType::HmacSha1;

const ALL: [HashType; 10] = [
    HashType::Sha256,
    HashType::Sha384,
    HashType::Sha512,
    HashType::HmacSha1,
    HashType::HmacSha256,
    HashType::HmacSha384,
    HashType::HmacSha512,
    HashType::HmacMd5,
    HashType::Aes,
    HashType::TripleDes,
];

impl HashType {
    /// Every registry entry, in declaration order.
    pub fn all() -> &'static [HashType] {
        &ALL
    }

    /// The HMAC entries only.
    pub fn hmac_types() -> impl Iterator<Item = HashType> {
        ALL.iter().copied().filter(|h| h.is_hmac())
    }

    pub fn spec(self) -> AlgorithmSpec {
        match self {
            Self::Sha256 => spec("SHA_256", "SHA-256", "", 256),
            Self::Sha384 => spec("SHA_384", "SHA-384", "", 384),
            Self::Sha512 => spec("SHA_512", "SHA-512", "", 512),
            Self::HmacSha1 => spec("HMAC_SHA_1", "HmacSHA1", algorithm::HMAC_SHA1, 160),
            Self::HmacSha256 => spec("HMAC_SHA_256", "HmacSHA256", algorithm::HMAC_SHA256, 256),
            Self::HmacSha384 => spec("HMAC_SHA_384", "HmacSHA384", algorithm::HMAC_SHA384, 384),
            Self::HmacSha512 => spec("HMAC_SHA_512", "HmacSHA512", algorithm::HMAC_SHA512, 512),
            // RFC 6931 lowercase `hmac-md5`; some producers write `hmac-MD5`
            Self::HmacMd5 => spec("HMAC_MD_5", "HmacMD5", algorithm::HMAC_MD5, 128),
            Self::Aes => spec("AES", "AES", "", 0),
            // JCE name of triple DES, not single `DES`
            Self::TripleDes => spec("TRIPLE_DES", "DESede", "", 0),
        }
    }

    pub fn native_name(self) -> &'static str {
        self.spec().native_name
    }

    pub fn xml_signature_uri(self) -> &'static str {
        self.spec().xml_signature_uri
    }

    pub fn bit_length(self) -> u32 {
        self.spec().bit_length
    }

    pub fn is_hmac(self) -> bool {
        !self.spec().xml_signature_uri.is_empty()
    }

    /// MAC length in bytes for HMAC entries, digest length for hashes.
    pub fn mac_len(self) -> usize {
        (self.spec().bit_length / 8) as usize
    }

    /// Look up an HMAC entry by its XML-DSig signature method URI.
    pub fn from_xml_signature_uri(uri: &str) -> Option<HashType> {
        Self::hmac_types().find(|h| h.xml_signature_uri() == uri)
    }
}

const fn spec(
    logical_name: &'static str,
    native_name: &'static str,
    xml_signature_uri: &'static str,
    bit_length: u32,
) -> AlgorithmSpec {
    AlgorithmSpec {
        logical_name,
        native_name,
        xml_signature_uri,
        bit_length,
    }
}

/// Resolve a logical (`HMAC_SHA_256`) or native (`HmacSHA256`) name.
///
/// Matching is case-insensitive. Names outside the closed set fail with
/// [`Error::UnknownAlgorithm`].
pub fn resolve(name: &str) -> Result<AlgorithmSpec, Error> {
    resolve_type(name).map(HashType::spec)
}

/// Like [`resolve`], returning the enum value.
pub fn resolve_type(name: &str) -> Result<HashType, Error> {
    let name = name.trim();
    ALL.iter()
        .copied()
        .find(|h| {
            let s = h.spec();
            s.logical_name.eq_ignore_ascii_case(name) || s.native_name.eq_ignore_ascii_case(name)
        })
        .ok_or_else(|| Error::UnknownAlgorithm(name.to_owned()))
}

impl FromStr for HashType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        resolve_type(s)
    }
}

impl fmt::Display for HashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spec().native_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_logical_and_native_names() {
        assert_eq!(resolve_type("HMAC_SHA_256").unwrap(), HashType::HmacSha256);
        assert_eq!(resolve_type("HmacSHA256").unwrap(), HashType::HmacSha256);
        assert_eq!(resolve_type("hmacsha1").unwrap(), HashType::HmacSha1);
        assert_eq!(resolve("SHA-512").unwrap().bit_length, 512);
    }

    #[test]
    fn test_resolve_unknown() {
        let err = resolve("HmacSHA3-256").unwrap_err();
        assert!(matches!(err, Error::UnknownAlgorithm(name) if name == "HmacSHA3-256"));
        assert!("".parse::<HashType>().is_err());
    }

    #[test]
    fn test_xml_uri_only_for_hmac() {
        for h in HashType::all() {
            assert_eq!(h.is_hmac(), h.native_name().starts_with("Hmac"), "{h:?}");
        }
        assert_eq!(HashType::Aes.xml_signature_uri(), "");
        assert_eq!(HashType::Sha384.xml_signature_uri(), "");
    }

    #[test]
    fn test_md5_uri_and_triple_des_name() {
        assert_eq!(
            HashType::HmacMd5.xml_signature_uri(),
            "http://www.w3.org/2001/04/xmldsig-more#hmac-md5"
        );
        assert_eq!(HashType::TripleDes.native_name(), "DESede");
        assert_eq!(resolve_type("desede").unwrap(), HashType::TripleDes);
        assert!(resolve_type("DES").is_err());
    }

    #[test]
    fn test_mac_lengths() {
        assert_eq!(HashType::HmacSha1.mac_len(), 20);
        assert_eq!(HashType::HmacSha256.mac_len(), 32);
        assert_eq!(HashType::HmacSha384.mac_len(), 48);
        assert_eq!(HashType::HmacSha512.mac_len(), 64);
        assert_eq!(HashType::HmacMd5.mac_len(), 16);
    }

    #[test]
    fn test_from_xml_signature_uri() {
        assert_eq!(
            HashType::from_xml_signature_uri(algorithm::HMAC_SHA384),
            Some(HashType::HmacSha384)
        );
        assert_eq!(HashType::from_xml_signature_uri(algorithm::RSA_SHA1), None);
    }
}
