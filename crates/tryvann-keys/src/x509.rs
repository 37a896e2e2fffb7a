#![forbid(unsafe_code)]

//! X.509 certificates: parsing, subject names and expiry checking.

use crate::key::Key;
use std::time::{SystemTime, UNIX_EPOCH};
use tryvann_core::Error;
use x509_cert::Certificate;

/// A parsed X.509 certificate together with its DER encoding.
#[derive(Clone)]
pub struct X509Certificate {
    cert: Certificate,
    der: Vec<u8>,
}

impl std::fmt::Debug for X509Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("X509Certificate")
            .field("subject", &self.subject_name())
            .finish()
    }
}

impl X509Certificate {
    /// Parse a PEM `CERTIFICATE` block.
    pub fn from_pem(pem: &str) -> Result<Self, Error> {
        let (label, der_bytes) = pem_rfc7468::decode_vec(pem.trim().as_bytes())
            .map_err(|e| Error::Certificate(format!("invalid PEM: {e}")))?;
        if label != "CERTIFICATE" {
            return Err(Error::Certificate(format!(
                "expected CERTIFICATE PEM, got {label}"
            )));
        }
        Self::from_der(&der_bytes)
    }

    pub fn from_der(der: &[u8]) -> Result<Self, Error> {
        use der::Decode;
        let cert = Certificate::from_der(der)
            .map_err(|e| Error::Certificate(format!("failed to parse X.509 certificate: {e}")))?;
        Ok(Self {
            cert,
            der: der.to_vec(),
        })
    }

    /// Load a certificate file, PEM or DER.
    pub fn from_file(path: &std::path::Path) -> Result<Self, Error> {
        let data = std::fs::read(path)?;
        if data.starts_with(b"-----BEGIN") {
            let pem = std::str::from_utf8(&data)
                .map_err(|e| Error::Certificate(format!("invalid PEM encoding: {e}")))?;
            Self::from_pem(pem)
        } else {
            Self::from_der(&data)
        }
    }

    /// The subject distinguished name in RFC 4514 form.
    pub fn subject_name(&self) -> String {
        self.cert.tbs_certificate.subject.to_string()
    }

    pub fn not_after(&self) -> der::DateTime {
        self.cert.tbs_certificate.validity.not_after.to_date_time()
    }

    pub fn not_before(&self) -> der::DateTime {
        self.cert.tbs_certificate.validity.not_before.to_date_time()
    }

    /// Check that the certificate has not expired at `at`.
    ///
    /// Only `notAfter` is enforced; a certificate that is not yet valid
    /// passes.
    pub fn check_validity_at(&self, at: SystemTime) -> Result<(), Error> {
        let since_epoch = at
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::Certificate(format!("system time error: {e}")))?;
        let at = der::DateTime::from_unix_duration(since_epoch)
            .map_err(|e| Error::Certificate(format!("time conversion error: {e}")))?;
        let not_after = self.not_after();
        if at > not_after {
            log::warn!(
                "certificate {} expired (notAfter: {not_after:?})",
                self.subject_name()
            );
            return Err(Error::CertificateInvalid(format!(
                "certificate has expired (notAfter: {not_after:?})"
            )));
        }
        Ok(())
    }

    /// [`check_validity_at`](Self::check_validity_at) against the current time.
    pub fn check_validity(&self) -> Result<(), Error> {
        self.check_validity_at(SystemTime::now())
    }

    /// The certificate's public key.
    pub fn public_key(&self) -> Result<Key, Error> {
        use der::Encode;
        let spki_der = self
            .cert
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| Error::Certificate(format!("failed to encode SPKI: {e}")))?;
        let key = crate::loader::load_spki_der(&spki_der)?;
        Ok(key.with_name(self.subject_name()))
    }

    pub fn to_der(&self) -> &[u8] {
        &self.der
    }

    /// The DER encoding in base64, as embedded in `<X509Certificate>`.
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.der)
    }
}
