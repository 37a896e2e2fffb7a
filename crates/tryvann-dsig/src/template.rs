#![forbid(unsafe_code)]

//! Construction of the `<Signature>` element text.
//!
//! Every signature written here has the same shape: exclusive C14N for
//! `SignedInfo`, one reference with the enveloped-signature and exclusive
//! C14N transforms, and a SHA-1 digest.

use tryvann_core::algorithm;
use tryvann_core::ns::{self, attr, node};
use tryvann_keys::keyinfo::write_x509_key_info;
use tryvann_keys::X509Certificate;
use tryvann_xml::writer::qname;
use tryvann_xml::XmlWriter;

/// The fields of one `<Signature>` element.
#[derive(Debug, Clone)]
pub struct SignatureTemplate<'a> {
    pub prefix: &'a str,
    pub id: &'a str,
    pub signature_method: &'a str,
    /// Written as `<HMACOutputLength>` for HMAC methods.
    pub hmac_output_length: Option<u32>,
    pub reference_uri: &'a str,
    pub digest_value: &'a str,
    pub signature_value: &'a str,
    pub certificate: Option<&'a X509Certificate>,
}

impl SignatureTemplate<'_> {
    pub fn render(&self) -> String {
        let name = |local: &str| qname(self.prefix, local);
        let xmlns = if self.prefix.is_empty() {
            "xmlns".to_owned()
        } else {
            format!("xmlns:{}", self.prefix)
        };
        let hmac_output_length = self.hmac_output_length.map(|bits| bits.to_string());

        let mut w = XmlWriter::new();
        w.start_element(&name(node::SIGNATURE), &[(xmlns.as_str(), ns::DSIG), (attr::ID, self.id)])
            .start_element(&name(node::SIGNED_INFO), &[])
            .empty_element(
                &name(node::CANONICALIZATION_METHOD),
                &[(attr::ALGORITHM, algorithm::EXC_C14N)],
            );

        let method_attrs = [(attr::ALGORITHM, self.signature_method)];
        match &hmac_output_length {
            Some(bits) => w
                .start_element(&name(node::SIGNATURE_METHOD), &method_attrs)
                .text_element(&name(node::HMAC_OUTPUT_LENGTH), &[], bits)
                .end_element(),
            None => w.empty_element(&name(node::SIGNATURE_METHOD), &method_attrs),
        };

        w.start_element(&name(node::REFERENCE), &[(attr::URI, self.reference_uri)])
            .start_element(&name(node::TRANSFORMS), &[])
            .empty_element(
                &name(node::TRANSFORM),
                &[(attr::ALGORITHM, algorithm::ENVELOPED_SIGNATURE)],
            )
            .empty_element(&name(node::TRANSFORM), &[(attr::ALGORITHM, algorithm::EXC_C14N)])
            .end_element()
            .empty_element(&name(node::DIGEST_METHOD), &[(attr::ALGORITHM, algorithm::SHA1)])
            .text_element(&name(node::DIGEST_VALUE), &[], self.digest_value)
            .end_element()
            .end_element()
            .text_element(&name(node::SIGNATURE_VALUE), &[], self.signature_value);

        if let Some(cert) = self.certificate {
            write_x509_key_info(&mut w, cert, self.prefix);
        }
        w.into_string()
    }
}
