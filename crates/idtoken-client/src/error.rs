//! Error types for certificate retrieval.

use thiserror::Error;

/// Errors that can occur while fetching a signer certificate.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// A non-reqwest transport failed to complete the request.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The server returned a status other than 200.
    #[error("certificate fetch from {url} responded {status}, expected 200")]
    UnexpectedStatus {
        /// HTTP status code received.
        status: u16,
        /// URL that was requested.
        url: String,
    },
    /// The server returned 200 with no certificate bytes.
    #[error("certificate fetch from {url} returned an empty body")]
    EmptyBody {
        /// URL that was requested.
        url: String,
    },
}

impl FetchError {
    /// Return the HTTP status code associated with this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Transport(_) | Self::EmptyBody { .. } => None,
        }
    }
}
