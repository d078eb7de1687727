//! SHA-256 signature verification against the signer's published certificate.

use idtoken_core::pem::pem_to_der;
use log::debug;
use p256::ecdsa::{Signature as EcdsaSignature, VerifyingKey as EcdsaVerifyingKey};
use rsa::pkcs1v15;
use rsa::pkcs8::DecodePublicKey as _;
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use sha2::Sha256;
use x509_parser::prelude::FromDer as _;
use x509_parser::x509::SubjectPublicKeyInfo;

use crate::error::CertificateError;

const OID_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
const OID_EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";

/// Checks a detached signature over a message with the key in a certificate.
pub trait SignatureVerifier: Send + Sync {
    /// Verify `signature` over `message` using the public key of the
    /// PEM-encoded `certificate_pem`.
    ///
    /// Returns `Ok(false)` when the signature does not match.
    ///
    /// # Errors
    ///
    /// Returns [`CertificateError`] if the certificate cannot be decoded or
    /// carries an unsupported key type.
    fn verify(
        &self,
        certificate_pem: &str,
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, CertificateError>;
}

/// [`SignatureVerifier`] for RSA PKCS#1 v1.5 and ECDSA P-256 signatures over SHA-256.
///
/// Accepts an X.509 certificate or a bare `SubjectPublicKeyInfo` inside the PEM.
/// Certificate validity periods and chains are not checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256SignatureVerifier;

impl SignatureVerifier for Sha256SignatureVerifier {
    fn verify(
        &self,
        certificate_pem: &str,
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, CertificateError> {
        let der = pem_to_der(certificate_pem)?;
        let verified = match signer_key(&der)? {
            SignerKey::Rsa(key) => verify_rsa(key, message, signature),
            SignerKey::P256(key) => verify_p256(&key, message, signature),
        };
        if !verified {
            debug!("signature does not match signer key");
        }
        Ok(verified)
    }
}

enum SignerKey {
    Rsa(RsaPublicKey),
    P256(EcdsaVerifyingKey),
}

fn signer_key(der: &[u8]) -> Result<SignerKey, CertificateError> {
    let (spki_der, algorithm) = match x509_parser::parse_x509_certificate(der) {
        Ok((_, cert)) => {
            let spki = &cert.tbs_certificate.subject_pki;
            (spki.raw.to_vec(), spki.algorithm.algorithm.to_id_string())
        }
        Err(cert_err) => {
            let (_, spki) = SubjectPublicKeyInfo::from_der(der).map_err(|_| {
                CertificateError::Der(format!("not a certificate or public key: {cert_err}"))
            })?;
            (spki.raw.to_vec(), spki.algorithm.algorithm.to_id_string())
        }
    };

    match algorithm.as_str() {
        OID_RSA_ENCRYPTION => RsaPublicKey::from_public_key_der(&spki_der)
            .map(SignerKey::Rsa)
            .map_err(|e| CertificateError::Der(format!("bad RSA public key: {e}"))),
        OID_EC_PUBLIC_KEY => p256::PublicKey::from_public_key_der(&spki_der)
            .map(|pk| SignerKey::P256(EcdsaVerifyingKey::from(&pk)))
            .map_err(|e| CertificateError::UnsupportedKey(format!("EC key is not P-256: {e}"))),
        other => Err(CertificateError::UnsupportedKey(other.to_owned())),
    }
}

fn verify_rsa(key: RsaPublicKey, message: &[u8], signature: &[u8]) -> bool {
    let Ok(signature) = pkcs1v15::Signature::try_from(signature) else {
        return false;
    };
    pkcs1v15::VerifyingKey::<Sha256>::new(key)
        .verify(message, &signature)
        .is_ok()
}

// ASN.1 DER is what signers emit; fixed-width r||s is accepted as well.
fn verify_p256(key: &EcdsaVerifyingKey, message: &[u8], signature: &[u8]) -> bool {
    EcdsaSignature::from_der(signature)
        .or_else(|_| EcdsaSignature::from_slice(signature))
        .is_ok_and(|signature| key.verify(message, &signature).is_ok())
}
