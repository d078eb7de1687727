//! Canonical byte encoding of an identity token.
//!
//! The signer computes its signature over
//! `UTF8(playerId) ‖ UTF8(bundleId) ‖ BE64(timestamp) ‖ base64decode(salt)`.
//! Any change to the field order or encoding produces bytes that never verify.

use crate::error::TokenError;
use crate::token::IdentityToken;

/// Encode `timestamp` as an unsigned 64-bit big-endian integer.
///
/// The high 32-bit word is written first, then the low word; both are
/// unsigned so values with the top bit of the low word set encode correctly.
#[must_use]
pub fn timestamp_to_big_endian(timestamp: u64) -> [u8; 8] {
    timestamp.to_be_bytes()
}

/// Produce the exact byte sequence the token's signature was computed over.
///
/// # Errors
///
/// Returns [`TokenError::InvalidBase64`] if the salt is not valid base64.
pub fn canonical_bytes(token: &IdentityToken) -> Result<Vec<u8>, TokenError> {
    let salt = token.decoded_salt()?;
    let mut out =
        Vec::with_capacity(token.player_id().len() + token.bundle_id().len() + 8 + salt.len());
    out.extend_from_slice(token.player_id().as_bytes());
    out.extend_from_slice(token.bundle_id().as_bytes());
    out.extend_from_slice(&timestamp_to_big_endian(token.timestamp()));
    out.extend_from_slice(&salt);
    Ok(out)
}
