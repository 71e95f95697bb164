//! HTTP API.
//!
//! - `/api/user/*`: authenticated by the identity gateway signature
//! - `/api/admin/*`: authenticated by the arbiter secret

pub mod admin;
pub mod error;
pub mod extractors;
pub mod responses;
pub mod user;
