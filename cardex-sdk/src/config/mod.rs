//! Configuration types shared between the server and its collaborators.
//!
//! These types represent validated runtime configuration. Loading and parsing
//! is handled by the server crate.

mod admin;
mod identity;

pub use admin::AdminConfig;
pub use identity::IdentityConfig;
