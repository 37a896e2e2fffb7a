#![forbid(unsafe_code)]

//! AES in CTR mode.
//!
//! The integrity container encrypts with a fixed IV, so the keystream for a
//! given key is the same on every call. Encryption and decryption are the
//! same operation.

use ::cipher::{KeyIvInit, StreamCipher};
use tryvann_core::Error;

/// The IV every integrity container is encrypted under: the ASCII bytes
/// `1234567812345678`.
pub const FIXED_IV: [u8; 16] = *b"1234567812345678";

/// Trait for cipher algorithms.
pub trait CipherAlgorithm: Send + Sync {
    fn name(&self) -> &'static str;
    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error>;
    fn decrypt(&self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, Error>;
}

/// AES-128/192/256 in CTR mode with a 128-bit big-endian counter.
///
/// The key length selects the AES variant.
#[derive(Debug, Clone)]
pub struct AesCtr {
    iv: [u8; 16],
}

impl AesCtr {
    pub fn with_iv(iv: [u8; 16]) -> Self {
        Self { iv }
    }

    /// The cipher used by integrity containers.
    pub fn fixed_iv() -> Self {
        Self::with_iv(FIXED_IV)
    }

    fn apply(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
        let mut buf = data.to_vec();
        macro_rules! do_apply {
            ($aes:ty) => {{
                let mut stream = ctr::Ctr128BE::<$aes>::new_from_slices(key, &self.iv)
                    .map_err(|e| Error::Crypto(format!("AES-CTR init: {e}")))?;
                stream.apply_keystream(&mut buf);
            }};
        }
        match key.len() {
            16 => do_apply!(aes::Aes128),
            24 => do_apply!(aes::Aes192),
            32 => do_apply!(aes::Aes256),
            n => {
                return Err(Error::Key(format!(
                    "AES key must be 16, 24 or 32 bytes, got {n}"
                )))
            }
        }
        Ok(buf)
    }
}

impl CipherAlgorithm for AesCtr {
    fn name(&self) -> &'static str {
        "AES/CTR/NoPadding"
    }

    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        self.apply(key, plaintext)
    }

    fn decrypt(&self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
        self.apply(key, ciphertext)
    }
}

/// AES-128-CTR known-answer test (NIST SP 800-38A, F.5.1, first block).
pub fn known_answer_test() -> Result<(), Error> {
    let key = hex::decode("2b7e151628aed2a6abf7158809cf4f3c")
        .map_err(|e| Error::Crypto(e.to_string()))?;
    let iv: [u8; 16] = hex::decode("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff")
        .map_err(|e| Error::Crypto(e.to_string()))?
        .try_into()
        .map_err(|_| Error::Crypto("IV length".into()))?;
    let plaintext = hex::decode("6bc1bee22e409f96e93d7e117393172a")
        .map_err(|e| Error::Crypto(e.to_string()))?;
    let expected = hex::decode("874d6191b620e3261bef6864990db6ce")
        .map_err(|e| Error::Crypto(e.to_string()))?;

    let ciphertext = AesCtr::with_iv(iv).encrypt(&key, &plaintext)?;
    if ciphertext != expected {
        return Err(Error::Crypto("AES-CTR known-answer test failed".into()));
    }
    log::debug!("AES-CTR known-answer test passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_answer() {
        known_answer_test().unwrap();
    }

    #[test]
    fn test_round_trip_all_key_sizes() {
        let cipher = AesCtr::fixed_iv();
        for len in [16, 24, 32] {
            let key = vec![7u8; len];
            let msg = b"VegardOnTheRocks, not block aligned";
            let ct = cipher.encrypt(&key, msg).unwrap();
            assert_eq!(ct.len(), msg.len());
            assert_ne!(&ct[..], &msg[..]);
            assert_eq!(cipher.decrypt(&key, &ct).unwrap(), msg);
        }
    }

    #[test]
    fn test_fixed_iv_is_deterministic() {
        let cipher = AesCtr::fixed_iv();
        let key = [1u8; 16];
        assert_eq!(
            cipher.encrypt(&key, b"same").unwrap(),
            cipher.encrypt(&key, b"same").unwrap()
        );
    }

    #[test]
    fn test_rejects_bad_key_length() {
        let err = AesCtr::fixed_iv().encrypt(&[0u8; 20], b"x").unwrap_err();
        assert!(matches!(err, Error::Key(_)));
    }
}
