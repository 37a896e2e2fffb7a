#![forbid(unsafe_code)]

//! Core definitions for the Tryvann integrity and XML signature library.
//!
//! Holds the error taxonomy shared by every crate, the algorithm URI and
//! namespace constants, and the hash/algorithm registry together with the
//! swappable default-algorithm selector.

pub mod algorithm;
pub mod error;
pub mod hash_type;
pub mod ns;
pub mod selector;

pub use error::{Error, Result};
pub use hash_type::{AlgorithmSpec, HashType, DEFAULT_HASH_TYPE};
pub use selector::AlgorithmSelector;
