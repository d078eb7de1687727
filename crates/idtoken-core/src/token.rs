//! Identity token model and the trust checks applied before any I/O.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::TokenError;

/// Domain suffix certificate URLs must belong to unless configured otherwise.
pub const DEFAULT_TRUSTED_DOMAIN: &str = "apple.com";

/// The only scheme a certificate may be fetched over.
pub const SECURE_SCHEME: &str = "https";

/// Standard-alphabet base64 that tolerates missing padding and non-zero
/// trailing bits, both of which appear in salts produced by real clients.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// An identity token exactly as submitted by a client, before validation.
///
/// Every field is optional so that partially-typed payloads deserialize and
/// are rejected by [`TokenValidator`] with a precise error instead of a
/// generic parse failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawIdentityToken {
    /// Platform player identifier.
    pub player_id: Option<String>,
    /// Application bundle identifier.
    pub bundle_id: Option<String>,
    /// Signing time in milliseconds since the epoch, as a JSON number or numeric string.
    pub timestamp: Option<Value>,
    /// Base64-encoded salt.
    pub salt: Option<String>,
    /// Base64-encoded signature.
    pub signature: Option<String>,
    /// URL of the signer's certificate.
    #[serde(rename = "publicKeyUrl", alias = "publicKey", alias = "certificateUrl")]
    pub public_key_url: Option<String>,
}

/// A structurally valid identity token whose certificate URL is trusted.
///
/// Only [`TokenValidator::validate`] constructs this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityToken {
    player_id: String,
    bundle_id: String,
    timestamp: u64,
    salt: String,
    signature: String,
    certificate_url: Url,
}

impl IdentityToken {
    /// Platform player identifier.
    #[must_use]
    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    /// Application bundle identifier.
    #[must_use]
    pub fn bundle_id(&self) -> &str {
        &self.bundle_id
    }

    /// Signing time in milliseconds since the epoch.
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Base64-encoded salt, as submitted.
    #[must_use]
    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// Base64-encoded signature, as submitted.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Trusted URL of the signer's certificate.
    #[must_use]
    pub fn certificate_url(&self) -> &Url {
        &self.certificate_url
    }

    /// Decode the salt into raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidBase64`] if the salt is not valid base64.
    pub fn decoded_salt(&self) -> Result<Vec<u8>, TokenError> {
        decode_field(&self.salt, "salt")
    }

    /// Decode the signature into raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidBase64`] if the signature is not valid base64.
    pub fn decoded_signature(&self) -> Result<Vec<u8>, TokenError> {
        decode_field(&self.signature, "signature")
    }
}

fn decode_field(value: &str, field: &'static str) -> Result<Vec<u8>, TokenError> {
    LENIENT_BASE64
        .decode(value)
        .map_err(|source| TokenError::InvalidBase64 { field, source })
}

/// Checks the shape of a [`RawIdentityToken`] and the trust of its certificate URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenValidator {
    trusted_domain: String,
}

impl Default for TokenValidator {
    fn default() -> Self {
        Self::new(DEFAULT_TRUSTED_DOMAIN)
    }
}

impl TokenValidator {
    /// Create a validator accepting certificate hosts equal to, or subdomains of,
    /// `trusted_domain`.
    pub fn new(trusted_domain: impl Into<String>) -> Self {
        let domain: String = trusted_domain.into();
        Self {
            trusted_domain: domain.trim_matches('.').to_ascii_lowercase(),
        }
    }

    /// Return the trusted domain suffix.
    #[must_use]
    pub fn trusted_domain(&self) -> &str {
        &self.trusted_domain
    }

    /// Validate `raw`, short-circuiting on the first failed check.
    ///
    /// Fields are checked for presence first, then the certificate URL is
    /// parsed, then its scheme and finally its host are checked.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] describing the first check that failed.
    pub fn validate(&self, raw: &RawIdentityToken) -> Result<IdentityToken, TokenError> {
        let player_id = required(raw.player_id.as_deref(), "playerId")?;
        let bundle_id = required(raw.bundle_id.as_deref(), "bundleId")?;
        let salt = required(raw.salt.as_deref(), "salt")?;
        let signature = required(raw.signature.as_deref(), "signature")?;
        let url = required(raw.public_key_url.as_deref(), "publicKeyUrl")?;
        let timestamp = raw
            .timestamp
            .as_ref()
            .and_then(timestamp_from_json)
            .ok_or(TokenError::InvalidTimestamp)?;

        let certificate_url = self.check_url(url)?;

        Ok(IdentityToken {
            player_id: player_id.to_owned(),
            bundle_id: bundle_id.to_owned(),
            timestamp,
            salt: salt.to_owned(),
            signature: signature.to_owned(),
            certificate_url,
        })
    }

    /// Parse `url` and check that it uses the secure scheme and a trusted host.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidUrl`], [`TokenError::UntrustedTransport`]
    /// or [`TokenError::UntrustedHost`], in that order of precedence.
    pub fn check_url(&self, url: &str) -> Result<Url, TokenError> {
        let parsed = Url::parse(url)?;

        if parsed.scheme() != SECURE_SCHEME {
            return Err(TokenError::UntrustedTransport {
                scheme: parsed.scheme().to_owned(),
            });
        }

        let host = parsed.host_str().unwrap_or_default();
        if !self.is_trusted_host(host) {
            return Err(TokenError::UntrustedHost {
                host: host.to_owned(),
                trusted_domain: self.trusted_domain.clone(),
            });
        }

        Ok(parsed)
    }

    fn is_trusted_host(&self, host: &str) -> bool {
        if self.trusted_domain.is_empty() {
            return false;
        }
        host == self.trusted_domain
            || host
                .strip_suffix(self.trusted_domain.as_str())
                .is_some_and(|prefix| prefix.len() > 1 && prefix.ends_with('.'))
    }
}

fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, TokenError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(TokenError::MissingField(field)),
    }
}

fn timestamp_from_json(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
