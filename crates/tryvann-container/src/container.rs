#![forbid(unsafe_code)]

//! The container value and its map/JSON forms.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tryvann_core::hash_type;
use tryvann_core::{Error, HashType};

/// Map key of the base64 ciphertext of `message || mac`.
pub const KEY_DIGEST_VALUE: &str = "key_digestedValue";
/// Map key of the base64 MAC over the plaintext.
pub const KEY_SIGNATURE_VALUE: &str = "key_signValueHmac";
/// Map key of the HMAC algorithm's native name.
pub const KEY_ALGORITHM_USED: &str = "key_algorithmUsed";

/// Output of [`IntegrityContainerEngine::generate`](crate::IntegrityContainerEngine::generate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityContainer {
    #[serde(rename = "key_digestedValue")]
    pub digest_value: String,
    #[serde(rename = "key_signValueHmac")]
    pub signature_value: String,
    #[serde(rename = "key_algorithmUsed")]
    pub algorithm_used: String,
}

impl IntegrityContainer {
    /// The HMAC algorithm named by `algorithm_used`.
    pub fn hash_type(&self) -> Result<HashType, Error> {
        hash_type::resolve_type(&self.algorithm_used)
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (KEY_DIGEST_VALUE.to_owned(), self.digest_value.clone()),
            (KEY_SIGNATURE_VALUE.to_owned(), self.signature_value.clone()),
            (KEY_ALGORITHM_USED.to_owned(), self.algorithm_used.clone()),
        ])
    }

    /// Rebuild a container from its three map entries. Extra entries are ignored.
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, Error> {
        let field = |key: &str| {
            map.get(key)
                .cloned()
                .ok_or_else(|| Error::InvalidArgument(format!("container has no {key} entry")))
        };
        Ok(Self {
            digest_value: field(KEY_DIGEST_VALUE)?,
            signature_value: field(KEY_SIGNATURE_VALUE)?,
            algorithm_used: field(KEY_ALGORITHM_USED)?,
        })
    }

    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::InvalidArgument(format!("container JSON: {e}")))
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json)
            .map_err(|e| Error::InvalidArgument(format!("container JSON: {e}")))
    }
}
