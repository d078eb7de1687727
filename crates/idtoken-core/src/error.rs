//! Errors raised while validating or encoding an identity token.

use thiserror::Error;

/// Error returned when an identity token is malformed or not trusted.
#[derive(Debug, Error)]
pub enum TokenError {
    /// A required field is absent or empty.
    #[error("identity token field '{0}' is missing or empty")]
    MissingField(&'static str),
    /// The timestamp is absent, negative, fractional or out of range.
    #[error("identity token timestamp must be a non-negative integer")]
    InvalidTimestamp,
    /// The certificate URL cannot be parsed as an absolute URL.
    #[error("invalid certificate URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The certificate URL does not use the secure scheme.
    #[error("certificate URL scheme '{scheme}' is not supported, expected https")]
    UntrustedTransport {
        /// Scheme found in the URL.
        scheme: String,
    },
    /// The certificate URL host is outside the trusted domain.
    #[error("certificate URL host '{host}' is not within trusted domain '{trusted_domain}'")]
    UntrustedHost {
        /// Host found in the URL (empty if the URL has none).
        host: String,
        /// Domain suffix the host was checked against.
        trusted_domain: String,
    },
    /// A base64 field could not be decoded.
    #[error("identity token field '{field}' is not valid base64: {source}")]
    InvalidBase64 {
        /// Name of the offending field.
        field: &'static str,
        /// Underlying decoder error.
        source: base64::DecodeError,
    },
}

impl TokenError {
    /// Return `true` if the token was well-formed but its certificate URL is not trusted.
    #[must_use]
    pub fn is_untrusted(&self) -> bool {
        matches!(
            self,
            Self::UntrustedTransport { .. } | Self::UntrustedHost { .. }
        )
    }
}
