use idtoken_core::pem::{base64_to_pem, der_to_pem};
use idtoken_crypto::error::CertificateError;
use idtoken_crypto::verifier::{Sha256SignatureVerifier, SignatureVerifier};
use p256::pkcs8::DecodePrivateKey;
use rsa::pkcs8::EncodePublicKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha2::Sha256;

const MESSAGE: &[u8] = b"G:1111111com.valid.app\x00\x00\x01\x54\x2d\x16\x6a\xf7salt";

fn p256_cert_and_key() -> (String, p256::ecdsa::SigningKey) {
    let certified = rcgen::generate_simple_self_signed(["valid.apple.com".to_owned()]).unwrap();
    let pem = der_to_pem(certified.cert.der());
    let key = p256::ecdsa::SigningKey::from_pkcs8_der(&certified.key_pair.serialize_der()).unwrap();
    (pem, key)
}

#[test]
fn p256_certificate_verifies_der_signature() {
    let (pem, key) = p256_cert_and_key();
    let signature: p256::ecdsa::Signature = key.sign(MESSAGE);

    let verifier = Sha256SignatureVerifier;
    assert!(verifier.verify(&pem, MESSAGE, signature.to_der().as_bytes()).unwrap());
    assert!(verifier.verify(&pem, MESSAGE, &signature.to_bytes()).unwrap());
}

#[test]
fn p256_mismatch_is_false_not_error() {
    let (pem, key) = p256_cert_and_key();
    let signature: p256::ecdsa::Signature = key.sign(MESSAGE);

    let verifier = Sha256SignatureVerifier;
    assert!(!verifier
        .verify(&pem, b"tampered", signature.to_der().as_bytes())
        .unwrap());
    assert!(!verifier.verify(&pem, MESSAGE, b"not a signature").unwrap());
}

#[test]
fn rsa_public_key_verifies_pkcs1v15_signature() {
    let mut rng = rand::thread_rng();
    let private_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
    let spki = private_key.to_public_key().to_public_key_der().unwrap();
    let pem = der_to_pem(spki.as_bytes());

    let signing_key = rsa::pkcs1v15::SigningKey::<Sha256>::new(private_key);
    let signature = signing_key.sign(MESSAGE).to_bytes().to_vec();

    let verifier = Sha256SignatureVerifier;
    assert!(verifier.verify(&pem, MESSAGE, &signature).unwrap());
    assert!(!verifier.verify(&pem, b"tampered", &signature).unwrap());
    assert!(!verifier.verify(&pem, MESSAGE, &signature[..16]).unwrap());
}

#[test]
fn trailing_newline_after_pem_is_accepted() {
    let (pem, key) = p256_cert_and_key();
    let signature: p256::ecdsa::Signature = key.sign(MESSAGE);
    assert!(Sha256SignatureVerifier
        .verify(&format!("{pem}\n"), MESSAGE, signature.to_der().as_bytes())
        .unwrap());
}

#[test]
fn unsupported_key_type_is_an_error() {
    let key_pair = rcgen::KeyPair::generate_for(&rcgen::PKCS_ED25519).unwrap();
    let cert = rcgen::CertificateParams::new(vec!["valid.apple.com".to_owned()])
        .unwrap()
        .self_signed(&key_pair)
        .unwrap();
    let err = Sha256SignatureVerifier
        .verify(&der_to_pem(cert.der()), MESSAGE, &[0; 64])
        .unwrap_err();
    assert!(matches!(err, CertificateError::UnsupportedKey(_)));
}

#[test]
fn garbage_certificate_is_an_error() {
    let err = Sha256SignatureVerifier
        .verify(&base64_to_pem("AAAA"), MESSAGE, &[0; 64])
        .unwrap_err();
    assert!(matches!(err, CertificateError::Der(_)));
}

#[test]
fn missing_pem_markers_is_an_error() {
    let err = Sha256SignatureVerifier
        .verify("MIIB", MESSAGE, &[0; 64])
        .unwrap_err();
    assert!(matches!(err, CertificateError::Pem(_)));
}
