//! Conversion between raw DER certificates and PEM text.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

/// First line of a PEM certificate.
pub const PEM_HEADER: &str = "-----BEGIN CERTIFICATE-----";
/// Last line of a PEM certificate.
pub const PEM_FOOTER: &str = "-----END CERTIFICATE-----";

const LINE_WIDTH: usize = 64;

/// Error returned when PEM text cannot be turned back into DER.
#[derive(Debug, Error)]
pub enum PemError {
    /// The BEGIN or END marker is missing.
    #[error("PEM certificate markers not found")]
    MissingMarkers,
    /// The body between the markers is not valid base64.
    #[error("PEM body is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Wrap an already base64-encoded certificate as PEM.
///
/// The body is split into 64-character lines, each terminated by a newline,
/// followed by the END marker with no trailing newline.
#[must_use]
pub fn base64_to_pem(b64: &str) -> String {
    let chars: Vec<char> = b64.chars().collect();
    let mut pem = String::with_capacity(b64.len() + b64.len() / LINE_WIDTH + 64);
    pem.push_str(PEM_HEADER);
    pem.push('\n');
    for line in chars.chunks(LINE_WIDTH) {
        pem.extend(line);
        pem.push('\n');
    }
    pem.push_str(PEM_FOOTER);
    pem
}

/// Base64-encode a DER certificate and wrap it as PEM.
#[must_use]
pub fn der_to_pem(der: &[u8]) -> String {
    base64_to_pem(&STANDARD.encode(der))
}

/// Extract the DER bytes from a PEM certificate.
///
/// Whitespace inside the body, CRLF line endings and a trailing newline after
/// the END marker are all accepted.
///
/// # Errors
///
/// Returns [`PemError`] if the markers are missing or the body is not base64.
pub fn pem_to_der(pem: &str) -> Result<Vec<u8>, PemError> {
    let start = pem.find(PEM_HEADER).ok_or(PemError::MissingMarkers)? + PEM_HEADER.len();
    let len = pem[start..].find(PEM_FOOTER).ok_or(PemError::MissingMarkers)?;
    let body: String = pem[start..start + len]
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    Ok(STANDARD.decode(body)?)
}
