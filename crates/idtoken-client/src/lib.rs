//! Certificate retrieval over HTTPS and the TTL cache in front of it.
#![deny(warnings, clippy::all, clippy::pedantic)]
#![warn(missing_docs)]

pub mod cache;
pub mod error;
pub mod fetcher;
