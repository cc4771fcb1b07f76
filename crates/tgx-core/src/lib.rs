//! Core domain + application logic for the Telegram channel exporter.
//!
//! This crate is transport-agnostic. The MTProto client lives behind ports
//! (traits) implemented in the `tgx-telegram` adapter crate.

pub mod auth;
pub mod channel;
pub mod config;
pub mod domain;
pub mod errors;
pub mod export;
pub mod filter;
pub mod formatting;
pub mod history;
pub mod logging;
pub mod ports;
pub mod throttled;
pub mod writer;

#[cfg(test)]
mod test_support;

pub use errors::{Error, Result};
