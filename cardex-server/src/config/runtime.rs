//! Runtime configuration held by the server.
//!
//! The validated types live in `cardex-sdk::config` and
//! `cardex-core::config`; this module groups the sections that request
//! handlers read behind their own locks.

pub use cardex_core::config::{ListingExpiryConfig, NotificationConfig, WebhookTarget};
pub use cardex_sdk::config::{AdminConfig, IdentityConfig};

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

/// Sections replaced on SIGHUP, each behind its own lock.
#[derive(Debug, Clone)]
pub struct SharedConfig {
    pub admin: Arc<RwLock<AdminConfig>>,
    pub identity: Arc<RwLock<IdentityConfig>>,
}

impl SharedConfig {
    pub fn new(admin: AdminConfig, identity: IdentityConfig) -> Self {
        Self {
            admin: Arc::new(RwLock::new(admin)),
            identity: Arc::new(RwLock::new(identity)),
        }
    }
}
