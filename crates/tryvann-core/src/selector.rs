#![forbid(unsafe_code)]

//! The swappable default HMAC algorithm.
//!
//! Engines consult a selector when a caller does not name an algorithm.
//! A selector is an owned value; share it through `Arc` when several engines
//! should follow the same default.

use crate::hash_type::{HashType, DEFAULT_HASH_TYPE};
use crate::Error;
use parking_lot::RwLock;

#[derive(Debug)]
pub struct AlgorithmSelector {
    current: RwLock<HashType>,
    initial: HashType,
}

impl AlgorithmSelector {
    /// Selector starting at `initial`. Fails if `initial` is not an HMAC entry.
    pub fn new(initial: HashType) -> Result<Self, Error> {
        check_hmac(initial)?;
        Ok(Self {
            current: RwLock::new(initial),
            initial,
        })
    }

    pub fn current_default(&self) -> HashType {
        *self.current.read()
    }

    /// Replace the default, returning the previous one.
    pub fn set_default(&self, hash_type: HashType) -> Result<HashType, Error> {
        check_hmac(hash_type)?;
        let mut guard = self.current.write();
        let previous = std::mem::replace(&mut *guard, hash_type);
        log::debug!("default HMAC algorithm {previous} -> {hash_type}");
        Ok(previous)
    }

    /// Restore the value the selector was created with.
    pub fn reset(&self) {
        *self.current.write() = self.initial;
    }
}

impl Default for AlgorithmSelector {
    fn default() -> Self {
        Self {
            current: RwLock::new(DEFAULT_HASH_TYPE),
            initial: DEFAULT_HASH_TYPE,
        }
    }
}

fn check_hmac(hash_type: HashType) -> Result<(), Error> {
    if hash_type.is_hmac() {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "{} is not an HMAC algorithm",
            hash_type.native_name()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_default_is_hmac_sha1() {
        let selector = AlgorithmSelector::default();
        assert_eq!(selector.current_default(), HashType::HmacSha1);
    }

    #[test]
    fn test_set_and_reset() {
        let selector = AlgorithmSelector::new(HashType::HmacSha256).unwrap();
        let previous = selector.set_default(HashType::HmacSha512).unwrap();
        assert_eq!(previous, HashType::HmacSha256);
        assert_eq!(selector.current_default(), HashType::HmacSha512);
        selector.reset();
        assert_eq!(selector.current_default(), HashType::HmacSha256);
    }

    #[test]
    fn test_rejects_non_hmac() {
        let selector = AlgorithmSelector::default();
        let err = selector.set_default(HashType::Aes).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(selector.current_default(), HashType::HmacSha1);
        assert!(AlgorithmSelector::new(HashType::Sha256).is_err());
    }

    #[test]
    fn test_shared_between_threads() {
        let selector = Arc::new(AlgorithmSelector::default());
        let handles: Vec<_> = HashType::hmac_types()
            .map(|h| {
                let selector = Arc::clone(&selector);
                std::thread::spawn(move || {
                    selector.set_default(h).unwrap();
                    selector.current_default().is_hmac()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert!(selector.current_default().is_hmac());
    }
}
