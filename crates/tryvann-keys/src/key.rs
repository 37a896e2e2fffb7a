#![forbid(unsafe_code)]

//! Key types and data structures.

use tryvann_core::HashType;
use tryvann_crypto::SigningKey;
use zeroize::Zeroizing;

/// The underlying key data.
pub enum KeyData {
    /// Raw symmetric key bytes, tagged with the algorithm they are meant for.
    Symmetric {
        algorithm: HashType,
        bytes: Zeroizing<Vec<u8>>,
    },
    Rsa {
        private: Option<rsa::RsaPrivateKey>,
        public: rsa::RsaPublicKey,
    },
    Dsa {
        private: Option<dsa::SigningKey>,
        public: dsa::VerifyingKey,
    },
    EcP256 {
        private: Option<p256::ecdsa::SigningKey>,
        public: p256::ecdsa::VerifyingKey,
    },
}

impl std::fmt::Debug for KeyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Symmetric { algorithm, bytes } => {
                write!(f, "{algorithm} key ({} bytes)", bytes.len())
            }
            Self::Rsa { private, .. } => pair(f, "RSA", private.is_some()),
            Self::Dsa { private, .. } => pair(f, "DSA", private.is_some()),
            Self::EcP256 { private, .. } => pair(f, "EC P-256", private.is_some()),
        }
    }
}

fn pair(f: &mut std::fmt::Formatter<'_>, family: &str, private: bool) -> std::fmt::Result {
    if private {
        write!(f, "{family} private+public key")
    } else {
        write!(f, "{family} public key")
    }
}

/// A named key with associated data.
#[derive(Debug)]
pub struct Key {
    /// Optional name, used in log and error messages.
    pub name: Option<String>,
    pub data: KeyData,
}

impl Key {
    pub fn new(data: KeyData) -> Self {
        Self { name: None, data }
    }

    /// A symmetric key for `algorithm`.
    pub fn symmetric(algorithm: HashType, bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(KeyData::Symmetric {
            algorithm,
            bytes: Zeroizing::new(bytes.into()),
        })
    }

    /// Set the key name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The same raw bytes reinterpreted as a key for another algorithm.
    ///
    /// Returns `None` for asymmetric keys.
    pub fn with_algorithm(&self, algorithm: HashType) -> Option<Key> {
        let bytes = self.symmetric_bytes()?;
        let mut key = Key::symmetric(algorithm, bytes);
        key.name = self.name.clone();
        Some(key)
    }

    /// Raw symmetric key bytes.
    pub fn symmetric_bytes(&self) -> Option<&[u8]> {
        match &self.data {
            KeyData::Symmetric { bytes, .. } => Some(bytes),
            _ => None,
        }
    }

    /// The algorithm a symmetric key is tagged with.
    pub fn algorithm(&self) -> Option<HashType> {
        match &self.data {
            KeyData::Symmetric { algorithm, .. } => Some(*algorithm),
            _ => None,
        }
    }

    /// Whether the key holds private (or secret) material.
    pub fn is_private(&self) -> bool {
        match &self.data {
            KeyData::Symmetric { .. } => true,
            KeyData::Rsa { private, .. } => private.is_some(),
            KeyData::Dsa { private, .. } => private.is_some(),
            KeyData::EcP256 { private, .. } => private.is_some(),
        }
    }

    /// Human-readable key family name.
    pub fn family(&self) -> &'static str {
        match &self.data {
            KeyData::Symmetric { .. } => "symmetric",
            KeyData::Rsa { .. } => "RSA",
            KeyData::Dsa { .. } => "DSA",
            KeyData::EcP256 { .. } => "EC",
        }
    }

    /// Convert to a `SigningKey` for use with the signature algorithms.
    ///
    /// Private keys convert to their signing form, public-only keys to their
    /// verifying form.
    pub fn to_signing_key(&self) -> SigningKey {
        match &self.data {
            KeyData::Symmetric { bytes, .. } => SigningKey::Hmac(bytes.clone()),
            KeyData::Rsa {
                private: Some(pk), ..
            } => SigningKey::Rsa(pk.clone()),
            KeyData::Rsa { public, .. } => SigningKey::RsaPublic(public.clone()),
            KeyData::Dsa {
                private: Some(sk), ..
            } => SigningKey::Dsa(sk.clone()),
            KeyData::Dsa { public, .. } => SigningKey::DsaPublic(public.clone()),
            KeyData::EcP256 {
                private: Some(sk), ..
            } => SigningKey::EcP256(sk.clone()),
            KeyData::EcP256 { public, .. } => SigningKey::EcP256Public(*public),
        }
    }

    /// The public half of an asymmetric key.
    pub fn to_public(&self) -> Option<Key> {
        let data = match &self.data {
            KeyData::Symmetric { .. } => return None,
            KeyData::Rsa { public, .. } => KeyData::Rsa {
                private: None,
                public: public.clone(),
            },
            KeyData::Dsa { public, .. } => KeyData::Dsa {
                private: None,
                public: public.clone(),
            },
            KeyData::EcP256 { public, .. } => KeyData::EcP256 {
                private: None,
                public: *public,
            },
        };
        Some(Key {
            name: self.name.clone(),
            data,
        })
    }
}
