#![forbid(unsafe_code)]

//! Transform pipeline for the Tryvann XML signature engine.
//!
//! Each reference carries a sequence of transforms applied in order; the
//! engine only ever writes enveloped-signature followed by exclusive C14N.

pub mod enveloped;
pub mod pipeline;
pub mod uri;

pub use enveloped::EnvelopedSignatureTransform;
pub use pipeline::{C14nTransform, Transform, TransformData, TransformPipeline};
