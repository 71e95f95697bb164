//! WebSocket message types for the settlement event stream.
//!
//! `GET /api/user/events/ws` upgrades to a WebSocket connection and pushes
//! [`WsServerMessage`] JSON frames for every committed transition that
//! involves the authenticated user. Delivery is best effort: a slow client
//! may miss frames and should re-read state over the REST endpoints.

use serde::{Deserialize, Serialize};

use super::notification::NotificationPayload;

/// Server-to-client WebSocket message.
///
/// ```json
/// {"type":"event","notification":{ ... }}
/// {"type":"lagged","skipped":12}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsServerMessage {
    Event { notification: NotificationPayload },
    /// The server dropped `skipped` events for this connection.
    Lagged { skipped: u64 },
}

/// Well-known WebSocket close codes used by the event stream.
pub struct WsCloseCode;

impl WsCloseCode {
    pub const NORMAL: u16 = 1000;

    /// Sent when the server is shutting down or the feed is closed.
    pub const GOING_AWAY: u16 = 1001;
}
