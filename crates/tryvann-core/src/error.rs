#![forbid(unsafe_code)]

/// Errors produced by the Tryvann library.
///
/// The first five variants are the kinds callers are expected to match on.
/// The remaining ones are raised by the support crates (XML, C14N, crypto,
/// keys) and are folded into [`Error::Signature`] by the XML signature
/// engine before they reach a caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("engine not ready: {0}")]
    EngineNotReady(String),

    #[error("signature error: {message}")]
    Signature {
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    #[error("certificate invalid: {0}")]
    CertificateInvalid(String),

    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("invalid XML structure: {0}")]
    XmlStructure(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("canonicalization error: {0}")]
    Canonicalization(String),

    #[error("transform error: {0}")]
    Transform(String),

    #[error("base64 decode error: {0}")]
    Base64(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing required element: {0}")]
    MissingElement(String),

    #[error("missing required attribute: {0}")]
    MissingAttribute(String),

    #[error("invalid URI reference: {0}")]
    InvalidUri(String),

    #[error("certificate error: {0}")]
    Certificate(String),
}

impl Error {
    /// A signature error with no underlying cause.
    pub fn signature(message: impl Into<String>) -> Self {
        Self::Signature {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap `cause` into a signature error.
    ///
    /// Argument and certificate errors keep their kind; everything else
    /// becomes [`Error::Signature`] with `cause` attached.
    pub fn into_signature(self, message: impl Into<String>) -> Self {
        match self {
            Self::InvalidArgument(_) | Self::CertificateInvalid(_) | Self::Signature { .. } => self,
            cause => Self::Signature {
                message: message.into(),
                source: Some(Box::new(cause)),
            },
        }
    }

    pub fn is_signature(&self) -> bool {
        matches!(self, Self::Signature { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
