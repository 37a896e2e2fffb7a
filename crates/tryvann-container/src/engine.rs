#![forbid(unsafe_code)]

//! Sealing and checking integrity containers.
//!
//! `generate` computes `mac = HMAC(key, message)` and encrypts
//! `message || mac` under AES-CTR with the fixed IV. The raw AES key bytes
//! double as the HMAC key. `verify` decrypts, splits the MAC tail off by the
//! algorithm's MAC length and accepts only when the tail, the plaintext
//! prefix and the detached signature value all agree with a freshly
//! computed MAC.

use crate::container::IntegrityContainer;
use base64::Engine;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tryvann_core::{AlgorithmSelector, Error, HashType, DEFAULT_HASH_TYPE};
use tryvann_crypto::cipher::{known_answer_test, AesCtr, CipherAlgorithm};
use tryvann_crypto::mac;
use tryvann_keys::Key;
use zeroize::Zeroizing;

static SHARED_ENGINE: OnceCell<CtrEngine> = OnceCell::new();

/// The process-wide AES-CTR handle used by every container engine.
#[derive(Debug)]
pub struct CtrEngine {
    cipher: AesCtr,
}

impl CtrEngine {
    /// The shared handle, initialised on first use.
    ///
    /// Initialisation runs the AES-CTR known-answer test. A failure is
    /// reported as [`Error::EngineNotReady`] and leaves the handle
    /// uninitialised, so the next caller tries again.
    pub fn shared() -> Result<&'static CtrEngine, Error> {
        SHARED_ENGINE.get_or_try_init(|| {
            known_answer_test().map_err(|e| Error::EngineNotReady(e.to_string()))?;
            let cipher = AesCtr::fixed_iv();
            log::debug!("initialised shared {} engine", cipher.name());
            Ok(CtrEngine { cipher })
        })
    }

    pub fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        self.cipher.encrypt(key, plaintext)
    }

    pub fn decrypt(&self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
        self.cipher.decrypt(key, ciphertext)
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Copy)]
pub struct ContainerConfig {
    /// HMAC algorithm used when the caller does not name one.
    pub default_hash: HashType,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            default_hash: DEFAULT_HASH_TYPE,
        }
    }
}

/// Produces and verifies [`IntegrityContainer`]s.
///
/// The engine itself is stateless apart from its default-algorithm
/// selector; it is `Send + Sync` and may be shared between threads.
#[derive(Debug, Clone)]
pub struct IntegrityContainerEngine {
    selector: Arc<AlgorithmSelector>,
}

impl IntegrityContainerEngine {
    pub fn new(config: ContainerConfig) -> Result<Self, Error> {
        Ok(Self::with_selector(Arc::new(AlgorithmSelector::new(
            config.default_hash,
        )?)))
    }

    /// An engine following a selector shared with other engines.
    pub fn with_selector(selector: Arc<AlgorithmSelector>) -> Self {
        Self { selector }
    }

    pub fn selector(&self) -> &Arc<AlgorithmSelector> {
        &self.selector
    }

    /// Seal `message` under the selector's current default algorithm.
    ///
    /// Returns `Ok(None)` when no key is given.
    pub fn generate(
        &self,
        key: Option<&Key>,
        message: &str,
    ) -> Result<Option<IntegrityContainer>, Error> {
        self.generate_with(self.selector.current_default(), key, message)
    }

    pub fn generate_with(
        &self,
        hash_type: HashType,
        key: Option<&Key>,
        message: &str,
    ) -> Result<Option<IntegrityContainer>, Error> {
        let Some(key) = key else {
            log::debug!("no key supplied, returning an empty container");
            return Ok(None);
        };
        check_hmac(hash_type)?;
        let engine = CtrEngine::shared()?;
        let aes_key = raw_bytes(key)?;
        let mac_key = derive_mac_key(key, hash_type)?;
        let mac = mac::hmac(hash_type, raw_bytes(&mac_key)?, message.as_bytes())
            .map_err(engine_error)?;

        let mut plaintext = Zeroizing::new(Vec::with_capacity(message.len() + mac.len()));
        plaintext.extend_from_slice(message.as_bytes());
        plaintext.extend_from_slice(&mac);
        let ciphertext = engine.encrypt(aes_key, &plaintext).map_err(engine_error)?;
        log::debug!(
            "sealed {} byte message with {hash_type} ({} byte container)",
            message.len(),
            ciphertext.len()
        );

        let b64 = base64::engine::general_purpose::STANDARD;
        Ok(Some(IntegrityContainer {
            digest_value: b64.encode(&ciphertext),
            signature_value: b64.encode(&mac),
            algorithm_used: hash_type.native_name().to_owned(),
        }))
    }

    /// Check `message` against a container's two values under the
    /// selector's current default algorithm.
    ///
    /// Every argument is required; an absent key or an empty value fails
    /// with [`Error::InvalidArgument`] instead of returning `false`.
    pub fn verify(
        &self,
        key: Option<&Key>,
        signature_value: &str,
        digest_value: &str,
        message: &str,
    ) -> Result<bool, Error> {
        self.verify_with(
            self.selector.current_default(),
            key,
            signature_value,
            digest_value,
            message,
        )
    }

    pub fn verify_with(
        &self,
        hash_type: HashType,
        key: Option<&Key>,
        signature_value: &str,
        digest_value: &str,
        message: &str,
    ) -> Result<bool, Error> {
        let key = match key {
            Some(key)
                if !signature_value.is_empty() && !digest_value.is_empty() && !message.is_empty() =>
            {
                key
            }
            _ => {
                return Err(Error::InvalidArgument(
                    "unable to verify integrity with the provided values".into(),
                ))
            }
        };
        check_hmac(hash_type)?;

        let b64 = base64::engine::general_purpose::STANDARD;
        let detached = b64
            .decode(signature_value.trim())
            .map_err(|e| Error::InvalidArgument(format!("signature value is not base64: {e}")))?;
        let ciphertext = b64
            .decode(digest_value.trim())
            .map_err(|e| Error::InvalidArgument(format!("digest value is not base64: {e}")))?;

        let engine = CtrEngine::shared()?;
        let plaintext = Zeroizing::new(
            engine
                .decrypt(raw_bytes(key)?, &ciphertext)
                .map_err(engine_error)?,
        );
        let mac_len = hash_type.mac_len();
        if plaintext.len() < mac_len {
            return Err(Error::InvalidArgument(format!(
                "digest value holds {} bytes, shorter than a {hash_type} MAC",
                plaintext.len()
            )));
        }
        let (recovered, tail) = plaintext.split_at(plaintext.len() - mac_len);

        let mac_key = derive_mac_key(key, hash_type)?;
        let mac = mac::hmac(hash_type, raw_bytes(&mac_key)?, message.as_bytes())
            .map_err(engine_error)?;

        let tail_ok = mac::mac_eq(tail, &mac);
        let message_ok = recovered == message.as_bytes();
        let detached_ok = mac::mac_eq(&detached, &mac);
        log::debug!(
            "container check with {hash_type}: mac={tail_ok} message={message_ok} signature={detached_ok}"
        );
        Ok(tail_ok & message_ok & detached_ok)
    }

    /// Verify against a whole container, using the algorithm it names.
    pub fn verify_container(
        &self,
        key: Option<&Key>,
        container: &IntegrityContainer,
        message: &str,
    ) -> Result<bool, Error> {
        self.verify_with(
            container.hash_type()?,
            key,
            &container.signature_value,
            &container.digest_value,
            message,
        )
    }
}

impl Default for IntegrityContainerEngine {
    fn default() -> Self {
        Self::with_selector(Arc::new(AlgorithmSelector::default()))
    }
}

/// The raw bytes of `base_key` retagged as a key for `hash_type`.
///
/// No derivation takes place; the HMAC key is the AES key.
pub fn derive_mac_key(base_key: &Key, hash_type: HashType) -> Result<Key, Error> {
    base_key.with_algorithm(hash_type).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "cannot derive an HMAC key from a {} key",
            base_key.family()
        ))
    })
}

fn raw_bytes(key: &Key) -> Result<&[u8], Error> {
    match key.symmetric_bytes() {
        Some(bytes) if !bytes.is_empty() => Ok(bytes),
        _ => Err(Error::InvalidArgument(format!(
            "integrity containers need a non-empty symmetric key, got a {} key",
            key.family()
        ))),
    }
}

/// Fold cipher and MAC failures into the container's error kinds.
///
/// A key the cipher cannot use is an argument error; anything else means
/// the engine could not run.
fn engine_error(cause: Error) -> Error {
    match cause {
        Error::InvalidArgument(_) | Error::UnknownAlgorithm(_) | Error::EngineNotReady(_) => cause,
        Error::Key(message) => Error::InvalidArgument(format!("unusable key: {message}")),
        other => Error::EngineNotReady(other.to_string()),
    }
}

fn check_hmac(hash_type: HashType) -> Result<(), Error> {
    if hash_type.is_hmac() {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "{hash_type} is not an HMAC algorithm"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tryvann_keys::loader::symmetric_from_base64;

    const KEY_B64: &str = "5I3efrQWPlpv9IUegrHcq+QEfmqEP2p+";
    const MESSAGE: &str = "VegardOnTheRocks j jsdjdas jiaj ijijsda ijij ";

    fn key() -> Key {
        symmetric_from_base64(HashType::Aes, KEY_B64).unwrap()
    }

    fn engine(hash_type: HashType) -> IntegrityContainerEngine {
        IntegrityContainerEngine::new(ContainerConfig {
            default_hash: hash_type,
        })
        .unwrap()
    }

    #[test]
    fn test_generate_hmac_sha1_golden() {
        let container = engine(HashType::HmacSha1)
            .generate(Some(&key()), MESSAGE)
            .unwrap()
            .unwrap();
        assert_eq!(container.signature_value, "2grsVhsYq9zYwASmfONXnae8Ctg=");
        assert_eq!(
            container.digest_value,
            "bxFbCw6fgEpHTapk/qpvLBccaikKGu5BCgM3viO4hoIPOM3nlswHwQm5q/qd00Kn88TGy0M/dHS6VNkARvAOT9g="
        );
        assert_eq!(container.algorithm_used, "HmacSHA1");
    }

    #[test]
    fn test_generate_hmac_sha256_golden() {
        let container = engine(HashType::HmacSha256)
            .generate(Some(&key()), MESSAGE)
            .unwrap()
            .unwrap();
        assert_eq!(
            container.signature_value,
            "IbxGy5c0x+D0bk9kXZYhMJadUrZbAYgzIk+8EecjsbA="
        );
        assert_eq!(
            container.digest_value,
            "bxFbCw6fgEpHTapk/qpvLBccaikKGu5BCgM3viO4hoIPOM3nlswHwQm5q/qdKPQNbkjqp38T2j94dax268EvF7ZNw5ifl9jWk9ik++0="
        );
    }

    #[test]
    fn test_generate_hmac_md5_golden() {
        let container = IntegrityContainerEngine::default()
            .generate_with(HashType::HmacMd5, Some(&key()), MESSAGE)
            .unwrap()
            .unwrap();
        assert_eq!(container.signature_value, "9aEwG5FbNn6jcflcrEhoyQ==");
        assert_eq!(container.algorithm_used, "HmacMD5");
    }

    #[test]
    fn test_absent_key_gives_empty_container() {
        assert!(IntegrityContainerEngine::default()
            .generate(None, MESSAGE)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_round_trip_every_hmac() {
        let key = key();
        let engine = IntegrityContainerEngine::default();
        for hash_type in HashType::hmac_types() {
            let c = engine
                .generate_with(hash_type, Some(&key), MESSAGE)
                .unwrap()
                .unwrap();
            assert!(engine
                .verify_with(hash_type, Some(&key), &c.signature_value, &c.digest_value, MESSAGE)
                .unwrap());
            assert!(engine.verify_container(Some(&key), &c, MESSAGE).unwrap());
        }
    }

    #[test]
    fn test_verify_follows_selector() {
        let key = key();
        let engine = engine(HashType::HmacSha256);
        let c = engine.generate(Some(&key), MESSAGE).unwrap().unwrap();
        assert!(engine
            .verify(Some(&key), &c.signature_value, &c.digest_value, MESSAGE)
            .unwrap());

        // SHA-512 expects a 64 byte tail; the blob now splits in the wrong place
        engine.selector().set_default(HashType::HmacSha512).unwrap();
        assert!(!engine
            .verify(Some(&key), &c.signature_value, &c.digest_value, MESSAGE)
            .unwrap());
    }

    #[test]
    fn test_tampering_is_detected() {
        let key = key();
        let engine = IntegrityContainerEngine::default();
        let c = engine.generate(Some(&key), MESSAGE).unwrap().unwrap();

        assert!(!engine
            .verify(Some(&key), &c.signature_value, &c.digest_value, "VegardOnTheRocks")
            .unwrap());

        let other = engine.generate(Some(&key), "another message").unwrap().unwrap();
        assert!(!engine
            .verify(Some(&key), &other.signature_value, &c.digest_value, MESSAGE)
            .unwrap());

        let b64 = base64::engine::general_purpose::STANDARD;
        let mut blob = b64.decode(&c.digest_value).unwrap();
        blob[0] ^= 0x01;
        assert!(!engine
            .verify(Some(&key), &c.signature_value, &b64.encode(&blob), MESSAGE)
            .unwrap());

        let wrong = symmetric_from_base64(HashType::Aes, "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA").unwrap();
        assert!(!engine
            .verify(Some(&wrong), &c.signature_value, &c.digest_value, MESSAGE)
            .unwrap());
    }

    #[test]
    fn test_verify_requires_every_argument() {
        let key = key();
        let engine = IntegrityContainerEngine::default();
        let c = engine.generate(Some(&key), MESSAGE).unwrap().unwrap();
        let cases = [
            engine.verify(None, &c.signature_value, &c.digest_value, MESSAGE),
            engine.verify(Some(&key), "", &c.digest_value, MESSAGE),
            engine.verify(Some(&key), &c.signature_value, "", MESSAGE),
            engine.verify(Some(&key), &c.signature_value, &c.digest_value, ""),
            engine.verify(Some(&key), "%%%", &c.digest_value, MESSAGE),
            engine.verify(Some(&key), &c.signature_value, "not base64!", MESSAGE),
        ];
        for result in cases {
            assert!(matches!(result, Err(Error::InvalidArgument(_))));
        }
    }

    #[test]
    fn test_short_blob_is_invalid_argument() {
        let key = key();
        let engine = IntegrityContainerEngine::default();
        let c = engine.generate(Some(&key), MESSAGE).unwrap().unwrap();
        let err = engine
            .verify(Some(&key), &c.signature_value, "AAAA", MESSAGE)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_rejects_unsuitable_keys_and_algorithms() {
        let engine = IntegrityContainerEngine::default();
        let short = Key::symmetric(HashType::Aes, vec![1u8; 20]);
        let err = engine.generate(Some(&short), MESSAGE).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(err.to_string().contains("got 20"));

        let c = engine.generate(Some(&key()), MESSAGE).unwrap().unwrap();
        assert!(matches!(
            engine.verify(Some(&short), &c.signature_value, &c.digest_value, MESSAGE),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.generate_with(HashType::Sha256, Some(&key()), MESSAGE),
            Err(Error::InvalidArgument(_))
        ));
        assert!(IntegrityContainerEngine::new(ContainerConfig {
            default_hash: HashType::Aes
        })
        .is_err());
    }

    #[test]
    fn test_engine_errors_use_container_kinds() {
        assert!(matches!(
            engine_error(Error::Key("bad length".into())),
            Error::InvalidArgument(m) if m.contains("bad length")
        ));
        assert!(matches!(
            engine_error(Error::Crypto("AES-CTR init".into())),
            Error::EngineNotReady(m) if m.contains("AES-CTR init")
        ));
        assert!(matches!(
            engine_error(Error::UnknownAlgorithm("x".into())),
            Error::UnknownAlgorithm(_)
        ));
    }

    #[test]
    fn test_derive_mac_key() {
        let key = key();
        let mac_key = derive_mac_key(&key, HashType::HmacSha384).unwrap();
        assert_eq!(mac_key.algorithm(), Some(HashType::HmacSha384));
        assert_eq!(mac_key.symmetric_bytes(), key.symmetric_bytes());

        let rsa = tryvann_keys::loader::load_private_key_pem(include_str!(
            "../../../testdata/rsa-key.pem"
        ))
        .unwrap();
        assert!(matches!(
            derive_mac_key(&rsa, HashType::HmacSha1),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_shared_engine_is_initialised_once() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| CtrEngine::shared().unwrap() as *const CtrEngine as usize))
            .collect();
        let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(addresses.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_concurrent_use() {
        let engine = Arc::new(IntegrityContainerEngine::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    let key = key();
                    let message = format!("{MESSAGE}{i}");
                    let c = engine
                        .generate_with(HashType::HmacSha256, Some(&key), &message)
                        .unwrap()
                        .unwrap();
                    engine.verify_container(Some(&key), &c, &message).unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
