//! Signature verification of canonical token bytes against a signer certificate.
#![deny(warnings, clippy::all, clippy::pedantic)]
#![warn(missing_docs)]

pub mod error;
pub mod verifier;
