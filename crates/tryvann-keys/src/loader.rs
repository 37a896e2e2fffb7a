#![forbid(unsafe_code)]

//! Key loading from PEM, DER and the portable base64/hex forms.

use crate::key::{Key, KeyData};
use rand::RngCore;
use tryvann_core::{Error, HashType};

/// Load a private key from PEM text.
///
/// Accepts PKCS#8 (`PRIVATE KEY`) for RSA, DSA and EC P-256, and PKCS#1
/// (`RSA PRIVATE KEY`) for RSA.
pub fn load_private_key_pem(pem: &str) -> Result<Key, Error> {
    let (label, der_bytes) = pem_rfc7468::decode_vec(pem.trim().as_bytes())
        .map_err(|e| Error::Key(format!("invalid PEM: {e}")))?;
    match label {
        "PRIVATE KEY" => load_private_key_der(&der_bytes),
        "RSA PRIVATE KEY" => load_rsa_pkcs1_der(&der_bytes),
        other => Err(Error::Key(format!("unsupported PEM label: {other}"))),
    }
}

/// Load a private key from DER bytes (PKCS#8, falling back to PKCS#1 RSA).
pub fn load_private_key_der(der: &[u8]) -> Result<Key, Error> {
    use pkcs8::DecodePrivateKey;

    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_der(der) {
        let public = pk.to_public_key();
        return Ok(Key::new(KeyData::Rsa {
            private: Some(pk),
            public,
        }));
    }

    if let Ok(sk) = p256::ecdsa::SigningKey::from_pkcs8_der(der) {
        let public = *sk.verifying_key();
        return Ok(Key::new(KeyData::EcP256 {
            private: Some(sk),
            public,
        }));
    }

    {
        use pkcs8::der::Decode;
        if let Ok(pki) = pkcs8::PrivateKeyInfo::from_der(der) {
            if let Ok(sk) = dsa::SigningKey::try_from(pki) {
                let public = sk.verifying_key().clone();
                return Ok(Key::new(KeyData::Dsa {
                    private: Some(sk),
                    public,
                }));
            }
        }
    }

    load_rsa_pkcs1_der(der)
        .map_err(|_| Error::Key("unsupported or malformed private key".into()))
}

fn load_rsa_pkcs1_der(der: &[u8]) -> Result<Key, Error> {
    use pkcs1::DecodeRsaPrivateKey;
    let pk = rsa::RsaPrivateKey::from_pkcs1_der(der)
        .map_err(|e| Error::Key(format!("failed to parse RSA private key: {e}")))?;
    let public = pk.to_public_key();
    Ok(Key::new(KeyData::Rsa {
        private: Some(pk),
        public,
    }))
}

/// Load a public key from SubjectPublicKeyInfo DER bytes.
pub fn load_spki_der(spki_der: &[u8]) -> Result<Key, Error> {
    use spki::DecodePublicKey;

    if let Ok(public) = rsa::RsaPublicKey::from_public_key_der(spki_der) {
        return Ok(Key::new(KeyData::Rsa {
            private: None,
            public,
        }));
    }

    if let Ok(public) = p256::ecdsa::VerifyingKey::from_public_key_der(spki_der) {
        return Ok(Key::new(KeyData::EcP256 {
            private: None,
            public,
        }));
    }

    {
        use pkcs8::der::Decode;
        if let Ok(spki_ref) = spki::SubjectPublicKeyInfoRef::from_der(spki_der) {
            if let Ok(public) = dsa::VerifyingKey::try_from(spki_ref) {
                return Ok(Key::new(KeyData::Dsa {
                    private: None,
                    public,
                }));
            }
        }
    }

    Err(Error::Key("unsupported public key algorithm".into()))
}

/// Load a private key from a file, PEM or DER.
pub fn load_key_file(path: &std::path::Path) -> Result<Key, Error> {
    let data = std::fs::read(path)?;
    let key = if data.starts_with(b"-----BEGIN") {
        let pem = std::str::from_utf8(&data)
            .map_err(|e| Error::Key(format!("invalid PEM encoding: {e}")))?;
        load_private_key_pem(pem)?
    } else {
        load_private_key_der(&data)?
    };
    log::debug!("loaded {} key from {}", key.family(), path.display());
    Ok(key)
}

/// A symmetric key from its base64 form.
pub fn symmetric_from_base64(algorithm: HashType, encoded: &str) -> Result<Key, Error> {
    use base64::Engine;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| Error::Base64(format!("symmetric key: {e}")))?;
    symmetric_from_bytes(algorithm, bytes)
}

/// A symmetric key from its hex form.
pub fn symmetric_from_hex(algorithm: HashType, encoded: &str) -> Result<Key, Error> {
    let bytes =
        hex::decode(encoded.trim()).map_err(|e| Error::Key(format!("symmetric key hex: {e}")))?;
    symmetric_from_bytes(algorithm, bytes)
}

/// The base64 form of a symmetric key.
pub fn symmetric_to_base64(key: &Key) -> Result<String, Error> {
    use base64::Engine;
    let bytes = key
        .symmetric_bytes()
        .ok_or_else(|| Error::Key(format!("{} key has no raw bytes", key.family())))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

fn symmetric_from_bytes(algorithm: HashType, bytes: Vec<u8>) -> Result<Key, Error> {
    if bytes.is_empty() {
        return Err(Error::Key("empty symmetric key".into()));
    }
    if algorithm == HashType::Aes && !matches!(bytes.len(), 16 | 24 | 32) {
        return Err(Error::Key(format!(
            "AES key must be 16, 24 or 32 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(Key::symmetric(algorithm, bytes))
}

/// Generate a random AES key of 128, 192 or 256 bits.
pub fn generate_aes_key(bits: usize) -> Result<Key, Error> {
    if !matches!(bits, 128 | 192 | 256) {
        return Err(Error::InvalidArgument(format!(
            "AES key size must be 128, 192 or 256 bits, got {bits}"
        )));
    }
    let mut bytes = zeroize::Zeroizing::new(vec![0u8; bits / 8]);
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    Ok(Key::symmetric(HashType::Aes, bytes.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const RSA_KEY: &str = include_str!("../../../testdata/rsa-key.pem");
    const DSA_KEY: &str = include_str!("../../../testdata/dsa-key.pem");
    const EC_KEY: &str = include_str!("../../../testdata/ec-key.pem");

    #[test]
    fn test_load_pkcs8_pem() {
        let rsa = load_private_key_pem(RSA_KEY).unwrap();
        assert!(matches!(rsa.data, KeyData::Rsa { private: Some(_), .. }));
        let dsa = load_private_key_pem(DSA_KEY).unwrap();
        assert!(matches!(dsa.data, KeyData::Dsa { private: Some(_), .. }));
        let ec = load_private_key_pem(EC_KEY).unwrap();
        assert!(matches!(ec.data, KeyData::EcP256 { private: Some(_), .. }));
    }

    #[test]
    fn test_load_pkcs1_pem() {
        use pkcs1::{EncodeRsaPrivateKey, LineEnding};
        let KeyData::Rsa { private: Some(pk), .. } = load_private_key_pem(RSA_KEY).unwrap().data
        else {
            panic!("expected RSA key");
        };
        let pkcs1 = pk.to_pkcs1_pem(LineEnding::LF).unwrap();
        let key = load_private_key_pem(&pkcs1).unwrap();
        assert_eq!(key.family(), "RSA");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(load_private_key_pem("not a key").is_err());
        assert!(load_private_key_der(&[0x30, 0x03, 0x02, 0x01, 0x00]).is_err());
    }

    #[test]
    fn test_load_key_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(EC_KEY.as_bytes()).unwrap();
        let key = load_key_file(file.path()).unwrap();
        assert_eq!(key.family(), "EC");
        assert!(load_key_file(std::path::Path::new("/nonexistent/key.pem")).is_err());
    }

    #[test]
    fn test_symmetric_forms() {
        let key = symmetric_from_base64(HashType::Aes, "5I3efrQWPlpv9IUegrHcq+QEfmqEP2p+").unwrap();
        assert_eq!(key.symmetric_bytes().unwrap().len(), 24);
        assert_eq!(symmetric_to_base64(&key).unwrap(), "5I3efrQWPlpv9IUegrHcq+QEfmqEP2p+");

        let hex_key = symmetric_from_hex(HashType::HmacSha256, "00112233").unwrap();
        assert_eq!(hex_key.symmetric_bytes().unwrap(), &[0x00, 0x11, 0x22, 0x33]);

        assert!(symmetric_from_base64(HashType::Aes, "AAAA").is_err());
        assert!(matches!(
            symmetric_from_base64(HashType::Aes, "not base64!"),
            Err(Error::Base64(_))
        ));
        assert!(symmetric_from_hex(HashType::HmacSha1, "").is_err());
    }

    #[test]
    fn test_generate_aes_key() {
        for bits in [128, 192, 256] {
            let key = generate_aes_key(bits).unwrap();
            assert_eq!(key.symmetric_bytes().unwrap().len(), bits / 8);
            assert_eq!(key.algorithm(), Some(HashType::Aes));
        }
        assert_ne!(
            generate_aes_key(128).unwrap().symmetric_bytes(),
            generate_aes_key(128).unwrap().symmetric_bytes()
        );
        assert!(matches!(generate_aes_key(64), Err(Error::InvalidArgument(_))));
    }
}
