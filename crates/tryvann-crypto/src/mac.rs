#![forbid(unsafe_code)]

//! HMAC over the registry's HMAC entries.

use hmac::{Hmac, Mac};
use subtle::ConstantTimeEq;
use tryvann_core::{Error, HashType};

/// Compute the full-length HMAC of `data` under `key`.
pub fn hmac(hash_type: HashType, key: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
    macro_rules! hmac_compute {
        ($hasher:ty) => {{
            let mut mac = <Hmac<$hasher>>::new_from_slice(key)
                .map_err(|e| Error::Key(format!("HMAC key: {e}")))?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }};
    }
    match hash_type {
        HashType::HmacSha1 => hmac_compute!(sha1::Sha1),
        HashType::HmacSha256 => hmac_compute!(sha2::Sha256),
        HashType::HmacSha384 => hmac_compute!(sha2::Sha384),
        HashType::HmacSha512 => hmac_compute!(sha2::Sha512),
        HashType::HmacMd5 => hmac_compute!(md5::Md5),
        other => Err(Error::UnsupportedAlgorithm(format!(
            "{} is not an HMAC algorithm",
            other.native_name()
        ))),
    }
}

/// Constant-time comparison of two MAC values.
///
/// Lengths are not secret; unequal lengths compare unequal.
pub fn mac_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Recompute the HMAC and compare it against `expected`.
///
/// `expected` may be a truncated MAC; only its length is compared.
pub fn verify_hmac(hash_type: HashType, key: &[u8], data: &[u8], expected: &[u8]) -> Result<bool, Error> {
    let computed = hmac(hash_type, key, data)?;
    if expected.is_empty() || expected.len() > computed.len() {
        return Ok(false);
    }
    Ok(mac_eq(&computed[..expected.len()], expected))
}
