//! Application state shared across all request handlers.

use crate::config::runtime::{NotificationConfig, SharedConfig};
use cardex_core::config::ConfigStore;
use cardex_core::engine::SettlementEngine;
use tokio::sync::watch;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    pub engine: SettlementEngine,
    /// Admin and identity secrets (can be reloaded via SIGHUP).
    pub config: SharedConfig,
    /// Read by the NotificationDispatcher for every event.
    pub notifications: ConfigStore<NotificationConfig>,
    /// Flips to `true` once shutdown starts. Long-lived connections watch it.
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(
        engine: SettlementEngine,
        config: SharedConfig,
        notifications: ConfigStore<NotificationConfig>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            engine,
            config,
            notifications,
            shutdown,
        }
    }
}
