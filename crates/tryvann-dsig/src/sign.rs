#![forbid(unsafe_code)]

//! XML-DSig signature creation.
//!
//! The signature is built against a copy of the document text in three
//! passes: digest the reference with an empty `<Signature>` in place, sign
//! the canonical `SignedInfo` carrying that digest, then splice the finished
//! element in. The caller's document is only replaced after every step has
//! succeeded, so a failed sign leaves it untouched.

use crate::context::DsigContext;
use crate::template::SignatureTemplate;
use crate::verify::{canonical_signed_info, reference_digest, with_context_ids};
use tryvann_c14n::C14nMode;
use tryvann_core::ns::{self, node};
use tryvann_core::{algorithm, Error, HashType};
use tryvann_crypto::{AlgorithmRegistry, SignatureAlgorithm, SigningKey};
use tryvann_keys::{Key, X509Certificate};
use tryvann_transforms::enveloped::EnvelopedSignatureTransform;
use tryvann_transforms::{C14nTransform, TransformPipeline};
use tryvann_xml::document::find_child_element;
use tryvann_xml::XmlDocument;

/// What a document is signed with.
#[derive(Debug, Clone, Copy)]
pub enum SigningMaterial<'a> {
    /// A secret key and the HMAC algorithm to sign with.
    Symmetric { key: &'a Key, hash_type: HashType },
    /// A private key and the certificate embedded alongside the signature.
    Certificate {
        private_key: &'a Key,
        certificate: &'a X509Certificate,
    },
}

/// One signing call.
#[derive(Debug, Clone, Copy)]
pub struct SignatureRequest<'a> {
    /// Same-document reference, e.g. `#allTheCarsInTheWorld`.
    pub reference_uri: &'a str,
    /// `Id` of the written `<Signature>`; the context default when `None` or empty.
    pub signature_id: Option<&'a str>,
    pub material: SigningMaterial<'a>,
}

/// Sign `document` as described by `request`.
pub fn sign(ctx: &DsigContext, document: &mut XmlDocument, request: &SignatureRequest<'_>) -> Result<(), Error> {
    match request.material {
        SigningMaterial::Symmetric { key, hash_type } => sign_by_key(
            ctx,
            document,
            request.reference_uri,
            request.signature_id,
            key,
            hash_type,
        ),
        SigningMaterial::Certificate {
            private_key,
            certificate,
        } => sign_by_certificate(
            ctx,
            document,
            request.reference_uri,
            request.signature_id,
            private_key,
            certificate,
        ),
    }
}

/// Sign with a symmetric key under the HMAC method for `hash_type`.
///
/// A `hash_type` without an XML signature method fails with
/// [`Error::Signature`]. Any failure leaves `document` exactly as it was,
/// including failures after the signature element has been built.
pub fn sign_by_key(
    ctx: &DsigContext,
    document: &mut XmlDocument,
    reference_uri: &str,
    signature_id: Option<&str>,
    key: &Key,
    hash_type: HashType,
) -> Result<(), Error> {
    if reference_uri.is_empty() {
        return Err(Error::InvalidArgument("reference URI is empty".into()));
    }
    if key.symmetric_bytes().is_some_and(<[u8]>::is_empty) {
        return Err(Error::InvalidArgument("signing key is empty".into()));
    }

    let signed = AlgorithmRegistry::hmac_signature(hash_type).and_then(|method| {
        let params = SigningParams {
            reference_uri,
            signature_id: ctx.signature_id(signature_id),
            method: &*method,
            hmac_output_length: Some(hash_type.bit_length()),
            key: &key.to_signing_key(),
            certificate: None,
        };
        signed_text(ctx, document, &params)
    });
    commit(document, signed)
}

/// Sign with an RSA or DSA private key, embedding `certificate` in
/// `<KeyInfo>`.
///
/// An expired certificate fails with [`Error::CertificateInvalid`] before
/// anything else is attempted. Like [`sign_by_key`], a failure at any later
/// step also leaves `document` unchanged.
pub fn sign_by_certificate(
    ctx: &DsigContext,
    document: &mut XmlDocument,
    reference_uri: &str,
    signature_id: Option<&str>,
    private_key: &Key,
    certificate: &X509Certificate,
) -> Result<(), Error> {
    if reference_uri.is_empty() {
        return Err(Error::InvalidArgument("reference URI is empty".into()));
    }
    certificate.check_validity()?;

    let signing_key = private_key.to_signing_key();
    let signed = signing_key
        .signature_method_uri()
        .and_then(tryvann_crypto::sign::from_uri)
        .and_then(|method| {
            let params = SigningParams {
                reference_uri,
                signature_id: ctx.signature_id(signature_id),
                method: &*method,
                hmac_output_length: None,
                key: &signing_key,
                certificate: Some(certificate),
            };
            signed_text(ctx, document, &params)
        });
    commit(document, signed)
}

fn commit(document: &mut XmlDocument, signed: Result<String, Error>) -> Result<(), Error> {
    signed
        .and_then(|text| document.replace_text(text))
        .map_err(|e| e.into_signature("unable to sign the document"))
}

struct SigningParams<'a> {
    reference_uri: &'a str,
    signature_id: &'a str,
    method: &'a dyn SignatureAlgorithm,
    hmac_output_length: Option<u32>,
    key: &'a SigningKey,
    certificate: Option<&'a X509Certificate>,
}

/// The document text with the finished signature spliced in.
fn signed_text(ctx: &DsigContext, document: &XmlDocument, params: &SigningParams<'_>) -> Result<String, Error> {
    log::debug!(
        "signing {} with {} as {}",
        params.reference_uri,
        params.method.uri(),
        params.signature_id
    );
    let mut template = SignatureTemplate {
        prefix: &ctx.prefix,
        id: params.signature_id,
        signature_method: params.method.uri(),
        hmac_output_length: params.hmac_output_length,
        reference_uri: params.reference_uri,
        digest_value: "",
        signature_value: "",
        certificate: params.certificate,
    };

    // Pass 1: reference digest.
    let mut candidate = with_context_ids(ctx, document);
    candidate.replace_text(document.spliced_into_root(&template.render())?)?;
    let digest_value = {
        let doc = candidate.parse_doc()?;
        let id_map = candidate.build_id_map(&doc);
        let signature = appended_signature(&doc)?;
        let mut pipeline = TransformPipeline::new();
        pipeline.push(Box::new(EnvelopedSignatureTransform::new(signature.id())));
        pipeline.push(Box::new(C14nTransform::new(C14nMode::Exclusive, Vec::new())));
        let digest = reference_digest(
            &candidate,
            &doc,
            &id_map,
            params.reference_uri,
            &pipeline,
            algorithm::SHA1,
        )?;
        encode(&digest)
    };
    log::debug!("reference digest {digest_value}");

    // Pass 2: signature over the canonical SignedInfo.
    template.digest_value = &digest_value;
    candidate.replace_text(document.spliced_into_root(&template.render())?)?;
    let signature_value = {
        let doc = candidate.parse_doc()?;
        let signature = appended_signature(&doc)?;
        let signed_info = find_child_element(signature, ns::DSIG, node::SIGNED_INFO)
            .ok_or_else(|| Error::MissingElement("SignedInfo".into()))?;
        let canonical = canonical_signed_info(&doc, signed_info, C14nMode::Exclusive, &[])?;
        encode(&params.method.sign(params.key, &canonical)?)
    };

    // Pass 3: the finished element.
    template.signature_value = &signature_value;
    document.spliced_into_root(&template.render())
}

/// The `<Signature>` just appended as the root's last element child.
fn appended_signature<'a, 'input>(
    doc: &'a roxmltree::Document<'input>,
) -> Result<roxmltree::Node<'a, 'input>, Error> {
    doc.root_element()
        .last_element_child()
        .filter(|n| n.tag_name().name() == node::SIGNATURE && n.tag_name().namespace() == Some(ns::DSIG))
        .ok_or_else(|| Error::MissingElement("appended Signature".into()))
}

fn encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::{find_signature_id, validate_by_certificate, validate_by_key};
    use tryvann_keys::loader;

    const DOCUMENT: &str = include_str!("../../../testdata/signing-document.xml");
    const KEY_B64: &str = "5I3efrQWPlpv9IUegrHcq+QEfmqEP2p+";
    const REFERENCE: &str = "#allTheCarsInTheWorld";

    fn document() -> XmlDocument {
        XmlDocument::parse(DOCUMENT.to_owned()).unwrap()
    }

    fn hmac_key() -> Key {
        loader::symmetric_from_base64(HashType::HmacSha256, KEY_B64).unwrap()
    }

    fn element_text(doc: &XmlDocument, local: &str) -> String {
        let parsed = doc.parse_doc().unwrap();
        tryvann_xml::document::find_element(&parsed, ns::DSIG, local)
            .and_then(|n| n.text())
            .unwrap_or_default()
            .to_owned()
    }

    #[test]
    fn test_sign_hmac_sha256_golden() {
        let ctx = DsigContext::new();
        let mut doc = document();
        sign_by_key(&ctx, &mut doc, REFERENCE, None, &hmac_key(), HashType::HmacSha256).unwrap();

        assert_eq!(element_text(&doc, node::DIGEST_VALUE), "4cIbhKxONxj24vi5agogiB8hvCE=");
        assert_eq!(
            element_text(&doc, node::SIGNATURE_VALUE),
            "dxEEgkeGMicUB8eNs1+gvt9bGzM/9cLdy1E2h4NJpWg="
        );
        assert_eq!(find_signature_id(&doc).unwrap().as_deref(), Some("coolSignature"));
        assert!(doc.text().contains("<ds:HMACOutputLength>256</ds:HMACOutputLength>"));
    }

    #[test]
    fn test_hash_type_changes_signature_not_digest() {
        let ctx = DsigContext::new();
        let mut sha1 = document();
        sign_by_key(&ctx, &mut sha1, REFERENCE, None, &hmac_key(), HashType::HmacSha1).unwrap();
        let mut sha384 = document();
        sign_by_key(&ctx, &mut sha384, REFERENCE, None, &hmac_key(), HashType::HmacSha384).unwrap();

        assert_eq!(
            element_text(&sha1, node::SIGNATURE_VALUE),
            "qST13nP89waLxoxQHrpl2JAHLv0="
        );
        assert_eq!(
            element_text(&sha384, node::SIGNATURE_VALUE),
            "eVyTMOPLdbSpns4T8TDJcNDXNtGXSrwVeCty3w9bHLLRnG3bZFpwJR1vlQYiTLf2"
        );
        assert_eq!(
            element_text(&sha1, node::DIGEST_VALUE),
            element_text(&sha384, node::DIGEST_VALUE)
        );
        assert!(sha384.text().contains(algorithm::SHA1));
    }

    #[test]
    fn test_signature_is_last_child_of_root() {
        let ctx = DsigContext::new();
        let mut doc = document();
        sign_by_key(&ctx, &mut doc, REFERENCE, Some("mySig"), &hmac_key(), HashType::HmacSha1).unwrap();
        let parsed = doc.parse_doc().unwrap();
        let last = parsed.root_element().last_element_child().unwrap();
        assert_eq!(last.tag_name().name(), node::SIGNATURE);
        assert_eq!(last.attribute("Id"), Some("mySig"));
        assert!(doc.text().trim_end().ends_with("</ds:Signature></garage>"));
    }

    #[test]
    fn test_sign_then_validate_every_hmac() {
        let ctx = DsigContext::new();
        for hash_type in HashType::hmac_types() {
            let mut doc = document();
            let key = hmac_key();
            sign_by_key(&ctx, &mut doc, REFERENCE, None, &key, hash_type).unwrap();
            assert!(validate_by_key(&ctx, &doc, &key).unwrap(), "{hash_type}");

            let other = loader::symmetric_from_hex(hash_type, "00112233445566778899aabbccddeeff").unwrap();
            assert!(!validate_by_key(&ctx, &doc, &other).unwrap(), "{hash_type}");
        }
    }

    #[test]
    fn test_missing_arguments() {
        let ctx = DsigContext::new();
        let mut doc = document();
        let err = sign_by_key(&ctx, &mut doc, "", None, &hmac_key(), HashType::HmacSha1).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        let empty = Key::symmetric(HashType::HmacSha1, Vec::new());
        let err = sign_by_key(&ctx, &mut doc, REFERENCE, None, &empty, HashType::HmacSha1).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(doc.text(), DOCUMENT);
    }

    #[test]
    fn test_non_hmac_hash_type_fails_at_signing() {
        let ctx = DsigContext::new();
        let mut doc = document();
        let err = sign_by_key(&ctx, &mut doc, REFERENCE, None, &hmac_key(), HashType::Sha256).unwrap_err();
        assert!(err.is_signature());
        assert_eq!(doc.text(), DOCUMENT);
    }

    #[test]
    fn test_unknown_reference_fails_and_rolls_back() {
        let ctx = DsigContext::new();
        let mut doc = document();
        let err = sign_by_key(&ctx, &mut doc, "#noSuchCars", None, &hmac_key(), HashType::HmacSha1)
            .unwrap_err();
        assert!(err.is_signature());
        let cause = std::error::Error::source(&err).unwrap().to_string();
        assert!(cause.contains("no such element"), "{cause}");
        assert_eq!(doc.text(), DOCUMENT);
    }

    #[test]
    fn test_sign_by_certificate_rsa() {
        let ctx = DsigContext::new();
        let key = loader::load_private_key_pem(include_str!("../../../testdata/rsa-key.pem")).unwrap();
        let cert = X509Certificate::from_pem(include_str!("../../../testdata/rsa-cert.pem")).unwrap();
        let mut doc = document();
        sign_by_certificate(&ctx, &mut doc, REFERENCE, None, &key, &cert).unwrap();

        assert!(doc.text().contains(algorithm::RSA_SHA1));
        assert!(doc.text().contains("<ds:X509SubjectName>"));
        assert!(!doc.text().contains("HMACOutputLength"));
        assert!(validate_by_certificate(&ctx, &doc, &cert).unwrap());
        assert!(validate_by_key(&ctx, &doc, &cert.public_key().unwrap()).unwrap());
    }

    #[test]
    fn test_sign_by_certificate_dsa() {
        let ctx = DsigContext::new();
        let key = loader::load_private_key_pem(include_str!("../../../testdata/dsa-key.pem")).unwrap();
        let cert = X509Certificate::from_pem(include_str!("../../../testdata/dsa-cert.pem")).unwrap();
        let mut doc = document();
        let request = SignatureRequest {
            reference_uri: REFERENCE,
            signature_id: Some("dsaSignature"),
            material: SigningMaterial::Certificate {
                private_key: &key,
                certificate: &cert,
            },
        };
        sign(&ctx, &mut doc, &request).unwrap();
        assert!(doc.text().contains(algorithm::DSA_SHA1));
        assert!(validate_by_certificate(&ctx, &doc, &cert).unwrap());
    }

    #[test]
    fn test_sign_by_certificate_ec_is_unsupported() {
        let ctx = DsigContext::new();
        let key = loader::load_private_key_pem(include_str!("../../../testdata/ec-key.pem")).unwrap();
        let cert = X509Certificate::from_pem(include_str!("../../../testdata/ec-cert.pem")).unwrap();
        let mut doc = document();
        let err = sign_by_certificate(&ctx, &mut doc, REFERENCE, None, &key, &cert).unwrap_err();
        assert!(err.is_signature());
        assert_eq!(doc.text(), DOCUMENT);
    }

    #[test]
    fn test_expired_certificate_leaves_document_unsigned() {
        let ctx = DsigContext::new();
        let key = loader::load_private_key_pem(include_str!("../../../testdata/rsa-key.pem")).unwrap();
        let cert =
            X509Certificate::from_pem(include_str!("../../../testdata/rsa-cert-expired.pem")).unwrap();
        let mut doc = document();
        let err = sign_by_certificate(&ctx, &mut doc, REFERENCE, None, &key, &cert).unwrap_err();
        assert!(matches!(err, Error::CertificateInvalid(_)));
        assert_eq!(doc.text(), DOCUMENT);
        assert_eq!(find_signature_id(&doc).unwrap(), None);
    }

    #[test]
    fn test_symmetric_request_dispatch() {
        let ctx = DsigContext::new();
        let key = hmac_key();
        let mut doc = document();
        let request = SignatureRequest {
            reference_uri: REFERENCE,
            signature_id: Some(""),
            material: SigningMaterial::Symmetric {
                key: &key,
                hash_type: HashType::HmacSha512,
            },
        };
        sign(&ctx, &mut doc, &request).unwrap();
        assert_eq!(find_signature_id(&doc).unwrap().as_deref(), Some("coolSignature"));
        assert!(validate_by_key(&ctx, &doc, &key).unwrap());
    }
}
