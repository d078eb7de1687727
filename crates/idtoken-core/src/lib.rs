//! Identity token model, trust validation and canonical encoding.
#![deny(warnings, clippy::all, clippy::pedantic)]
#![warn(missing_docs)]

pub mod canonical;
pub mod error;
pub mod pem;
pub mod token;
