#![forbid(unsafe_code)]

//! `<ds:KeyInfo>` construction and reading for X.509 certificates.

use crate::x509::X509Certificate;
use tryvann_core::ns::{self, node};
use tryvann_core::Error;
use tryvann_xml::document::find_child_element;
use tryvann_xml::writer::qname;
use tryvann_xml::XmlWriter;

/// Write `<KeyInfo><X509Data>` carrying the certificate's subject name and
/// the certificate itself.
pub fn write_x509_key_info(w: &mut XmlWriter, cert: &X509Certificate, prefix: &str) {
    let name = |local: &str| qname(prefix, local);
    w.start_element(&name(node::KEY_INFO), &[])
        .start_element(&name(node::X509_DATA), &[])
        .text_element(&name(node::X509_SUBJECT_NAME), &[], &cert.subject_name())
        .text_element(&name(node::X509_CERTIFICATE), &[], &cert.to_base64())
        .end_element()
        .end_element();
}

/// [`write_x509_key_info`] as a standalone fragment.
pub fn x509_key_info(cert: &X509Certificate, prefix: &str) -> String {
    let mut w = XmlWriter::new();
    write_x509_key_info(&mut w, cert, prefix);
    w.into_string()
}

/// The certificate embedded in a `<KeyInfo>` element, if any.
pub fn read_x509_certificate(key_info: roxmltree::Node<'_, '_>) -> Result<Option<X509Certificate>, Error> {
    let Some(data) = find_child_element(key_info, ns::DSIG, node::X509_DATA) else {
        return Ok(None);
    };
    let Some(cert_node) = find_child_element(data, ns::DSIG, node::X509_CERTIFICATE) else {
        return Ok(None);
    };
    use base64::Engine;
    let clean: String = cert_node
        .text()
        .unwrap_or("")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let der = base64::engine::general_purpose::STANDARD
        .decode(clean)
        .map_err(|e| Error::Base64(format!("X509Certificate: {e}")))?;
    X509Certificate::from_der(&der).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_info_round_trip() {
        let cert =
            X509Certificate::from_pem(include_str!("../../../testdata/rsa-cert.pem")).unwrap();
        let fragment = x509_key_info(&cert, "ds");
        assert!(fragment.starts_with("<ds:KeyInfo><ds:X509Data><ds:X509SubjectName>"));
        assert!(fragment.ends_with("</ds:X509Certificate></ds:X509Data></ds:KeyInfo>"));

        let xml = format!(
            "<root xmlns:ds=\"{}\">{fragment}</root>",
            ns::DSIG
        );
        let doc = tryvann_xml::parse(&xml).unwrap();
        let key_info = doc.root_element().first_element_child().unwrap();
        let read = read_x509_certificate(key_info).unwrap().unwrap();
        assert_eq!(read.to_der(), cert.to_der());
    }

    #[test]
    fn test_key_info_without_certificate() {
        let xml = format!("<ds:KeyInfo xmlns:ds=\"{}\"><ds:KeyName>k</ds:KeyName></ds:KeyInfo>", ns::DSIG);
        let doc = tryvann_xml::parse(&xml).unwrap();
        assert!(read_x509_certificate(doc.root_element()).unwrap().is_none());
    }
}
