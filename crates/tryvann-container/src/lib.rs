#![forbid(unsafe_code)]

//! Integrity containers.
//!
//! A container carries a message encrypted under AES-CTR together with its
//! HMAC, so that a holder of the key can later check a message against it
//! without the message itself being stored alongside.

pub mod container;
pub mod engine;

pub use container::IntegrityContainer;
pub use engine::{derive_mac_key, ContainerConfig, CtrEngine, IntegrityContainerEngine};
