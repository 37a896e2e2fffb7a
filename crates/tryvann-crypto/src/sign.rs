#![forbid(unsafe_code)]

//! Signature algorithm implementations (HMAC, RSA-SHA1, DSA-SHA1).

use crate::mac;
use tryvann_core::{algorithm, Error, HashType};
use zeroize::Zeroizing;

/// Key material for signature operations.
pub enum SigningKey {
    Hmac(Zeroizing<Vec<u8>>),
    Rsa(rsa::RsaPrivateKey),
    RsaPublic(rsa::RsaPublicKey),
    Dsa(dsa::SigningKey),
    DsaPublic(dsa::VerifyingKey),
    /// No XML signature method is offered for EC keys; they are carried
    /// so that callers get a clear error rather than a type mismatch.
    EcP256(p256::ecdsa::SigningKey),
    EcP256Public(p256::ecdsa::VerifyingKey),
}

impl SigningKey {
    /// Human-readable key family name, used in error messages.
    pub fn family(&self) -> &'static str {
        match self {
            Self::Hmac(_) => "HMAC",
            Self::Rsa(_) | Self::RsaPublic(_) => "RSA",
            Self::Dsa(_) | Self::DsaPublic(_) => "DSA",
            Self::EcP256(_) | Self::EcP256Public(_) => "EC",
        }
    }

    /// The XML-DSig signature method a private key of this family signs with.
    pub fn signature_method_uri(&self) -> Result<&'static str, Error> {
        match self {
            Self::Rsa(_) => Ok(algorithm::RSA_SHA1),
            Self::Dsa(_) => Ok(algorithm::DSA_SHA1),
            other => Err(Error::UnsupportedAlgorithm(format!(
                "no signature method for {} private key",
                other.family()
            ))),
        }
    }
}

/// Trait for signature algorithms.
pub trait SignatureAlgorithm: Send {
    fn uri(&self) -> &'static str;
    fn sign(&self, key: &SigningKey, data: &[u8]) -> Result<Vec<u8>, Error>;
    fn verify(&self, key: &SigningKey, data: &[u8], signature: &[u8]) -> Result<bool, Error>;
}

/// Create a signature algorithm from its URI.
pub fn from_uri(uri: &str) -> Result<Box<dyn SignatureAlgorithm>, Error> {
    match uri {
        algorithm::RSA_SHA1 => Ok(Box::new(RsaSha1)),
        algorithm::DSA_SHA1 => Ok(Box::new(DsaSha1)),
        _ => match HashType::from_xml_signature_uri(uri) {
            Some(hash) => Ok(Box::new(HmacSign::new(hash))),
            None => Err(Error::UnsupportedAlgorithm(format!("signature algorithm: {uri}"))),
        },
    }
}

// ── RSA PKCS#1 v1.5 with SHA-1 ───────────────────────────────────────

struct RsaSha1;

impl SignatureAlgorithm for RsaSha1 {
    fn uri(&self) -> &'static str {
        algorithm::RSA_SHA1
    }

    fn sign(&self, key: &SigningKey, data: &[u8]) -> Result<Vec<u8>, Error> {
        use signature::{SignatureEncoding, Signer};
        let SigningKey::Rsa(private_key) = key else {
            return Err(Error::Key("RSA private key required".into()));
        };
        let sk = rsa::pkcs1v15::SigningKey::<sha1::Sha1>::new(private_key.clone());
        let sig = sk
            .try_sign(data)
            .map_err(|e| Error::Crypto(format!("RSA-SHA1 sign: {e}")))?;
        Ok(sig.to_vec())
    }

    fn verify(&self, key: &SigningKey, data: &[u8], sig_bytes: &[u8]) -> Result<bool, Error> {
        use signature::Verifier;
        let public_key = match key {
            SigningKey::Rsa(pk) => pk.to_public_key(),
            SigningKey::RsaPublic(pk) => pk.clone(),
            _ => return Err(Error::Key("RSA key required".into())),
        };
        let sig = rsa::pkcs1v15::Signature::try_from(sig_bytes)
            .map_err(|e| Error::Crypto(format!("invalid RSA signature: {e}")))?;
        let vk = rsa::pkcs1v15::VerifyingKey::<sha1::Sha1>::new(public_key);
        Ok(vk.verify(data, &sig).is_ok())
    }
}

// ── DSA with SHA-1 ───────────────────────────────────────────────────

/// XML-DSig encodes DSA signatures as `r || s`, each left-padded to the
/// byte length of the subgroup order q.
struct DsaSha1;

fn dsa_q_len(components: &dsa::Components) -> usize {
    (components.q().bits() + 7) / 8
}

fn dsa_to_xmldsig(sig: &dsa::Signature, q_len: usize) -> Vec<u8> {
    let mut out = vec![0u8; 2 * q_len];
    let r = sig.r().to_bytes_be();
    let s = sig.s().to_bytes_be();
    out[q_len - r.len()..q_len].copy_from_slice(&r);
    out[2 * q_len - s.len()..].copy_from_slice(&s);
    out
}

fn xmldsig_to_dsa(rs: &[u8], q_len: usize) -> Result<dsa::Signature, Error> {
    if rs.len() != 2 * q_len {
        return Err(Error::Crypto(format!(
            "DSA signature must be {} bytes, got {}",
            2 * q_len,
            rs.len()
        )));
    }
    let r = dsa::BigUint::from_bytes_be(&rs[..q_len]);
    let s = dsa::BigUint::from_bytes_be(&rs[q_len..]);
    dsa::Signature::from_components(r, s)
        .map_err(|e| Error::Crypto(format!("invalid DSA signature: {e}")))
}

impl SignatureAlgorithm for DsaSha1 {
    fn uri(&self) -> &'static str {
        algorithm::DSA_SHA1
    }

    fn sign(&self, key: &SigningKey, data: &[u8]) -> Result<Vec<u8>, Error> {
        use digest::Digest;
        use signature::DigestSigner;
        let SigningKey::Dsa(sk) = key else {
            return Err(Error::Key("DSA private key required".into()));
        };
        let sig: dsa::Signature = sk
            .try_sign_digest(sha1::Sha1::new_with_prefix(data))
            .map_err(|e| Error::Crypto(format!("DSA-SHA1 sign: {e}")))?;
        Ok(dsa_to_xmldsig(&sig, dsa_q_len(sk.verifying_key().components())))
    }

    fn verify(&self, key: &SigningKey, data: &[u8], sig_bytes: &[u8]) -> Result<bool, Error> {
        use digest::Digest;
        use signature::DigestVerifier;
        let vk = match key {
            SigningKey::Dsa(sk) => sk.verifying_key().clone(),
            SigningKey::DsaPublic(vk) => vk.clone(),
            _ => return Err(Error::Key("DSA key required".into())),
        };
        let sig = xmldsig_to_dsa(sig_bytes, dsa_q_len(vk.components()))?;
        Ok(vk.verify_digest(sha1::Sha1::new_with_prefix(data), &sig).is_ok())
    }
}

// ── HMAC ─────────────────────────────────────────────────────────────

/// HMAC signature method, optionally truncated to `HMACOutputLength` bits.
pub struct HmacSign {
    hash: HashType,
    output_bits: Option<usize>,
}

impl HmacSign {
    pub fn new(hash: HashType) -> Self {
        Self {
            hash,
            output_bits: None,
        }
    }

    /// Truncate (and compare) the MAC to `bits`, which must be a whole
    /// number of bytes no longer than the full MAC.
    pub fn with_output_length(hash: HashType, bits: usize) -> Result<Self, Error> {
        if bits == 0 || bits % 8 != 0 || bits > hash.mac_len() * 8 {
            return Err(Error::Crypto(format!(
                "HMACOutputLength {bits} is not valid for {hash}"
            )));
        }
        Ok(Self {
            hash,
            output_bits: Some(bits),
        })
    }

    fn output_len(&self) -> usize {
        self.output_bits.map_or(self.hash.mac_len(), |bits| bits / 8)
    }
}

impl SignatureAlgorithm for HmacSign {
    fn uri(&self) -> &'static str {
        self.hash.xml_signature_uri()
    }

    fn sign(&self, key: &SigningKey, data: &[u8]) -> Result<Vec<u8>, Error> {
        let SigningKey::Hmac(key_bytes) = key else {
            return Err(Error::Key("HMAC key required".into()));
        };
        let mut mac = mac::hmac(self.hash, key_bytes, data)?;
        mac.truncate(self.output_len());
        Ok(mac)
    }

    fn verify(&self, key: &SigningKey, data: &[u8], sig_bytes: &[u8]) -> Result<bool, Error> {
        let SigningKey::Hmac(key_bytes) = key else {
            return Err(Error::Key("HMAC key required".into()));
        };
        if sig_bytes.len() != self.output_len() {
            return Ok(false);
        }
        mac::verify_hmac(self.hash, key_bytes, data, sig_bytes)
    }
}
