#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

//! Shared wire types for the Cardex settlement server.
//!
//! Everything in here is transport-level: serde DTOs, the HMAC signature
//! scheme used by the identity gateway and notification webhooks, and the
//! argon2-backed admin secret check.

pub mod config;
pub mod objects;
pub mod signature;
