#![forbid(unsafe_code)]

//! XML-DSig signature validation.
//!
//! Processing order:
//! 1. Find the first `<Signature>` in the document
//! 2. Read `<SignedInfo>`: CanonicalizationMethod, SignatureMethod
//! 3. For each `<Reference>`: resolve the URI, run the transforms, compare digests
//! 4. Canonicalize `<SignedInfo>` and check `<SignatureValue>` with the supplied key
//!
//! A digest or signature value that does not match yields `Ok(false)`;
//! anything structurally wrong is an [`Error::Signature`].

use crate::context::DsigContext;
use std::collections::HashMap;
use tryvann_c14n::C14nMode;
use tryvann_core::ns::{self, attr, node};
use tryvann_core::{Error, HashType};
use tryvann_crypto::sign::HmacSign;
use tryvann_crypto::SignatureAlgorithm;
use tryvann_keys::keyinfo::read_x509_certificate;
use tryvann_keys::{Key, X509Certificate};
use tryvann_transforms::{TransformData, TransformPipeline};
use tryvann_xml::document::{find_child_element, find_child_elements, find_element};
use tryvann_xml::{NodeSet, XmlDocument};

/// Validate the document's signature against `key`.
pub fn validate_by_key(ctx: &DsigContext, document: &XmlDocument, key: &Key) -> Result<bool, Error> {
    validate(ctx, document, key).map_err(|e| e.into_signature("signature verification error"))
}

/// Validate the document's signature against a certificate's public key.
///
/// An expired certificate is not an error here: the result is `false`.
pub fn validate_by_certificate(
    ctx: &DsigContext,
    document: &XmlDocument,
    certificate: &X509Certificate,
) -> Result<bool, Error> {
    if let Err(e) = certificate.check_validity() {
        log::debug!("not validating with rejected certificate: {e}");
        return Ok(false);
    }
    let key = certificate
        .public_key()
        .map_err(|e| e.into_signature("signature verification error"))?;
    validate_by_key(ctx, document, &key)
}

/// The `Id` of the first `<Signature>` in the document, if there is one.
pub fn find_signature_id(document: &XmlDocument) -> Result<Option<String>, Error> {
    let doc = document.parse_doc()?;
    Ok(find_element(&doc, ns::DSIG, node::SIGNATURE)
        .and_then(|sig| sig.attribute(attr::ID))
        .map(str::to_owned))
}

/// The certificate embedded in the first signature's `<KeyInfo>`.
pub fn embedded_certificate(document: &XmlDocument) -> Result<Option<X509Certificate>, Error> {
    let doc = document.parse_doc()?;
    let Some(key_info) = find_element(&doc, ns::DSIG, node::SIGNATURE)
        .and_then(|sig| find_child_element(sig, ns::DSIG, node::KEY_INFO))
    else {
        return Ok(None);
    };
    read_x509_certificate(key_info)
}

fn validate(ctx: &DsigContext, document: &XmlDocument, key: &Key) -> Result<bool, Error> {
    let document = with_context_ids(ctx, document);
    let doc = document.parse_doc()?;
    let id_map = document.build_id_map(&doc);

    let sig_node = find_element(&doc, ns::DSIG, node::SIGNATURE)
        .ok_or_else(|| Error::signature("cannot find Signature element"))?;
    let signed_info = find_child_element(sig_node, ns::DSIG, node::SIGNED_INFO)
        .ok_or_else(|| Error::MissingElement("SignedInfo".into()))?;

    let c14n_method = find_child_element(signed_info, ns::DSIG, node::CANONICALIZATION_METHOD)
        .ok_or_else(|| Error::MissingElement("CanonicalizationMethod".into()))?;
    let c14n_uri = required_algorithm(c14n_method)?;
    let c14n_mode = C14nMode::from_uri(c14n_uri)
        .ok_or_else(|| Error::UnsupportedAlgorithm(format!("C14N: {c14n_uri}")))?;
    let inclusive_prefixes = read_inclusive_prefixes(c14n_method);

    let sig_method = find_child_element(signed_info, ns::DSIG, node::SIGNATURE_METHOD)
        .ok_or_else(|| Error::MissingElement("SignatureMethod".into()))?;
    let sig_method_uri = required_algorithm(sig_method)?;
    let algorithm = signature_algorithm(ctx, sig_method_uri, sig_method)?;

    let references = find_child_elements(signed_info, ns::DSIG, node::REFERENCE);
    if references.is_empty() {
        return Err(Error::MissingElement("Reference".into()));
    }
    for reference in references {
        let uri = reference.attribute(attr::URI).unwrap_or("");
        let digest_method = find_child_element(reference, ns::DSIG, node::DIGEST_METHOD)
            .ok_or_else(|| Error::MissingElement("DigestMethod".into()))?;
        let digest_uri = required_algorithm(digest_method)?;
        let expected = decode_child(reference, node::DIGEST_VALUE)?;

        let mut pipeline = TransformPipeline::new();
        if let Some(transforms) = find_child_element(reference, ns::DSIG, node::TRANSFORMS) {
            for t in find_child_elements(transforms, ns::DSIG, node::TRANSFORM) {
                pipeline.push(tryvann_transforms::pipeline::from_uri(
                    required_algorithm(t)?,
                    sig_node.id(),
                    read_inclusive_prefixes(t),
                )?);
            }
        }

        let computed = reference_digest(&document, &doc, &id_map, uri, &pipeline, digest_uri)?;
        if computed != expected {
            log::debug!("reference {uri}: digest mismatch");
            return Ok(false);
        }
    }

    let canonical = canonical_signed_info(&doc, signed_info, c14n_mode, &inclusive_prefixes)?;
    let signature_value = decode_child(sig_node, node::SIGNATURE_VALUE)?;
    let valid = algorithm.verify(&key.to_signing_key(), &canonical, &signature_value)?;
    log::debug!("signature method {sig_method_uri}: valid={valid}");
    Ok(valid)
}

/// The verifier for a `<SignatureMethod>`, honouring `<HMACOutputLength>`.
fn signature_algorithm(
    ctx: &DsigContext,
    uri: &str,
    sig_method: roxmltree::Node<'_, '_>,
) -> Result<Box<dyn SignatureAlgorithm>, Error> {
    let output_length = find_child_element(sig_method, ns::DSIG, node::HMAC_OUTPUT_LENGTH);
    let (Some(hash), Some(length_node)) = (HashType::from_xml_signature_uri(uri), output_length)
    else {
        return tryvann_crypto::sign::from_uri(uri);
    };

    let text = length_node.text().unwrap_or("").trim();
    let bits: u32 = text
        .parse()
        .map_err(|_| Error::signature(format!("invalid HMACOutputLength: {text:?}")))?;
    let floor = (hash.bit_length() / 2).max(80).max(ctx.hmac_min_out_len);
    if bits < floor {
        return Err(Error::signature(format!(
            "HMACOutputLength {bits} is below the minimum of {floor} bits"
        )));
    }
    Ok(Box::new(HmacSign::with_output_length(hash, bits as usize)?))
}

/// Digest the data a reference selects after running its transforms.
pub(crate) fn reference_digest(
    document: &XmlDocument,
    doc: &roxmltree::Document<'_>,
    id_map: &HashMap<String, roxmltree::NodeId>,
    uri: &str,
    pipeline: &TransformPipeline,
    digest_uri: &str,
) -> Result<Vec<u8>, Error> {
    let node_set = tryvann_transforms::uri::resolve_uri(uri, doc, id_map)?;
    let data = pipeline.execute(TransformData::Xml {
        xml_text: document.text().to_owned(),
        node_set: Some(node_set),
    })?;
    tryvann_crypto::digest::digest(digest_uri, &data.into_binary()?)
}

/// Canonical form of a `<SignedInfo>` element in its document context.
pub(crate) fn canonical_signed_info(
    doc: &roxmltree::Document<'_>,
    signed_info: roxmltree::Node<'_, '_>,
    mode: C14nMode,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let subset = NodeSet::tree_without_comments(signed_info);
    tryvann_c14n::canonicalize_doc(doc, mode, Some(&subset), inclusive_prefixes)
}

/// A copy of `document` that also recognizes the context's ID attributes.
pub(crate) fn with_context_ids(ctx: &DsigContext, document: &XmlDocument) -> XmlDocument {
    let mut copy = document.clone();
    for name in &ctx.id_attrs {
        copy.add_id_attr(name);
    }
    copy
}

fn required_algorithm<'a>(element: roxmltree::Node<'a, '_>) -> Result<&'a str, Error> {
    element.attribute(attr::ALGORITHM).ok_or_else(|| {
        Error::MissingAttribute(format!("Algorithm on {}", element.tag_name().name()))
    })
}

fn decode_child(parent: roxmltree::Node<'_, '_>, local: &str) -> Result<Vec<u8>, Error> {
    use base64::Engine;
    let child = find_child_element(parent, ns::DSIG, local)
        .ok_or_else(|| Error::MissingElement(local.to_owned()))?;
    let clean: String = child
        .text()
        .unwrap_or("")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    base64::engine::general_purpose::STANDARD
        .decode(clean)
        .map_err(|e| Error::Base64(format!("{local}: {e}")))
}

fn read_inclusive_prefixes(method: roxmltree::Node<'_, '_>) -> Vec<String> {
    find_child_element(method, ns::EXC_C14N, node::INCLUSIVE_NAMESPACES)
        .and_then(|n| n.attribute(attr::PREFIX_LIST))
        .map(|list| list.split_whitespace().map(str::to_owned).collect())
        .unwrap_or_default()
}
