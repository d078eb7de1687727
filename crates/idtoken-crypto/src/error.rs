//! Error types for cryptographic operations.

use idtoken_core::pem::PemError;
use thiserror::Error;

/// Errors that prevent a signature from being checked at all.
///
/// A signature that simply does not match is not an error.
#[derive(Debug, Error)]
pub enum CertificateError {
    /// The PEM wrapper could not be removed.
    #[error("invalid PEM certificate: {0}")]
    Pem(#[from] PemError),
    /// The certificate or public key DER could not be parsed.
    #[error("DER parsing error: {0}")]
    Der(String),
    /// The certificate's key is neither RSA nor ECDSA P-256.
    #[error("unsupported public key type: {0}")]
    UnsupportedKey(String),
}
