//! The verification pipeline: validate, resolve certificate, encode, verify.

use std::fmt;
use std::sync::Arc;

use idtoken_client::cache::{shared_store, CertificateStore};
use idtoken_client::fetcher::{CertificateFetcher, HttpTransport, ReqwestTransport};
use idtoken_core::canonical::canonical_bytes;
use idtoken_core::token::{IdentityToken, RawIdentityToken, TokenValidator};
use idtoken_crypto::verifier::{Sha256SignatureVerifier, SignatureVerifier};
use log::{debug, warn};

use crate::config::VerifierConfig;
use crate::error::VerifyError;

/// Verifies identity tokens against the certificate their signer publishes.
///
/// The pipeline is fail-closed: validation, certificate retrieval, encoding
/// and key errors all surface as [`VerifyError`], and only a matching
/// signature yields `Ok(true)`. No network request is made for a token whose
/// certificate URL fails validation.
#[derive(Clone)]
pub struct IdentityVerifier {
    validator: TokenValidator,
    fetcher: CertificateFetcher,
    store: Arc<dyn CertificateStore>,
    signature_verifier: Arc<dyn SignatureVerifier>,
}

impl fmt::Debug for IdentityVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityVerifier")
            .field("validator", &self.validator)
            .field("fetcher", &self.fetcher)
            .finish_non_exhaustive()
    }
}

impl IdentityVerifier {
    /// Create a verifier using the process-wide certificate store and
    /// SHA-256 RSA/ECDSA signature verification.
    pub fn new(validator: TokenValidator, fetcher: CertificateFetcher) -> Self {
        let store: Arc<dyn CertificateStore> = shared_store();
        Self {
            validator,
            fetcher,
            store,
            signature_verifier: Arc::new(Sha256SignatureVerifier),
        }
    }

    /// Create a verifier that fetches certificates with `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Fetch`] if the HTTP client cannot be built.
    pub fn from_config(config: &VerifierConfig) -> Result<Self, VerifyError> {
        let transport = ReqwestTransport::new(config.fetch_timeout)?;
        let fetcher = CertificateFetcher::new(Arc::new(transport))
            .with_freshness_margin(config.cache_margin);
        Ok(Self::new(
            TokenValidator::new(config.trusted_domain.clone()),
            fetcher,
        ))
    }

    /// Replace the certificate store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn CertificateStore>) -> Self {
        self.store = store;
        self
    }

    /// Replace the HTTP transport, keeping the configured freshness margin.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.fetcher =
            CertificateFetcher::new(transport).with_freshness_margin(self.fetcher.freshness_margin());
        self
    }

    /// Replace the signature verification primitive.
    #[must_use]
    pub fn with_signature_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.signature_verifier = verifier;
        self
    }

    /// Return the validator applied to incoming tokens.
    #[must_use]
    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    /// Validate `raw` and verify its signature.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError`] if the token is invalid or untrusted, its
    /// certificate cannot be fetched or used, or its salt or signature are
    /// not base64. A signature mismatch is `Ok(false)`.
    pub async fn verify(&self, raw: &RawIdentityToken) -> Result<bool, VerifyError> {
        let token = self.validator.validate(raw).map_err(|e| {
            warn!("rejected identity token: {e}");
            e
        })?;
        self.verify_token(&token).await
    }

    /// Verify the signature of an already validated token.
    ///
    /// The certificate URL is re-checked against this verifier's trusted
    /// domain, since `token` may have been validated elsewhere.
    ///
    /// # Errors
    ///
    /// See [`IdentityVerifier::verify`].
    pub async fn verify_token(&self, token: &IdentityToken) -> Result<bool, VerifyError> {
        let url = self.validator.check_url(token.certificate_url().as_str())?;

        let pem = self.fetcher.fetch_cached(&url, self.store.as_ref()).await?;

        let message = canonical_bytes(token)?;
        let signature = token.decoded_signature()?;

        let verified = self.signature_verifier.verify(&pem, &message, &signature)?;
        if verified {
            debug!(
                "verified identity token for player {} of {}",
                token.player_id(),
                token.bundle_id()
            );
        } else {
            warn!(
                "identity token signature mismatch for player {} of {}",
                token.player_id(),
                token.bundle_id()
            );
        }
        Ok(verified)
    }
}
