#![forbid(unsafe_code)]

pub use tryvann_c14n as c14n;
pub use tryvann_container as container;
pub use tryvann_core as core;
pub use tryvann_crypto as crypto;
pub use tryvann_dsig as dsig;
pub use tryvann_keys as keys;
pub use tryvann_transforms as transforms;
pub use tryvann_xml as xml;

pub use tryvann_container::{IntegrityContainer, IntegrityContainerEngine};
pub use tryvann_core::{Error, HashType};
