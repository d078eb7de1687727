//! Fail-closed verification of platform identity tokens.
//!
//! A token is trusted only when [`verifier::IdentityVerifier::verify`] returns
//! `Ok(true)`. Every error means authenticity could not be established and
//! the token must be rejected.
#![deny(warnings, clippy::all, clippy::pedantic)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod verifier;
