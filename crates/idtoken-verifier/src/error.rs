//! Errors that stop a token from being verified.

use idtoken_client::error::FetchError;
use idtoken_core::error::TokenError;
use idtoken_crypto::error::CertificateError;
use thiserror::Error;

/// Reason authenticity could not be determined. The token must be rejected.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The token is malformed or its certificate URL is not trusted.
    #[error(transparent)]
    Token(#[from] TokenError),
    /// The signer certificate could not be retrieved.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The signer certificate could not be used.
    #[error(transparent)]
    Certificate(#[from] CertificateError),
}
