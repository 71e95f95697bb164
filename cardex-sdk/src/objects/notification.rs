//! Notification payloads handed to the notification collaborator.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::signature::Signature;

/// What happened. Serialized as dotted names, e.g. `"trade.completed"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    #[serde(rename = "order.placed")]
    OrderPlaced,
    #[serde(rename = "order.completed")]
    OrderCompleted,
    #[serde(rename = "order.cancelled")]
    OrderCancelled,
    #[serde(rename = "listing.created")]
    ListingCreated,
    #[serde(rename = "listing.cancelled")]
    ListingCancelled,
    #[serde(rename = "listing.sold")]
    ListingSold,
    #[serde(rename = "listing.expired")]
    ListingExpired,
    #[serde(rename = "trade.initiated")]
    TradeInitiated,
    #[serde(rename = "trade.paid")]
    TradePaid,
    #[serde(rename = "trade.completed")]
    TradeCompleted,
    #[serde(rename = "trade.disputed")]
    TradeDisputed,
    #[serde(rename = "trade.cancelled")]
    TradeCancelled,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NotificationKind::OrderPlaced => "order.placed",
            NotificationKind::OrderCompleted => "order.completed",
            NotificationKind::OrderCancelled => "order.cancelled",
            NotificationKind::ListingCreated => "listing.created",
            NotificationKind::ListingCancelled => "listing.cancelled",
            NotificationKind::ListingSold => "listing.sold",
            NotificationKind::ListingExpired => "listing.expired",
            NotificationKind::TradeInitiated => "trade.initiated",
            NotificationKind::TradePaid => "trade.paid",
            NotificationKind::TradeCompleted => "trade.completed",
            NotificationKind::TradeDisputed => "trade.disputed",
            NotificationKind::TradeCancelled => "trade.cancelled",
        };
        f.write_str(name)
    }
}

/// The record a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum NotificationSubject {
    Transaction(Uuid),
    Listing(Uuid),
    Trade(Uuid),
}

/// One notification for one recipient.
///
/// Never carries a redemption code; recipients fetch it through the gated
/// read endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Identifies the originating state transition. Shared by every
    /// recipient of the same transition, so receivers can deduplicate.
    pub event_id: Uuid,
    pub kind: NotificationKind,
    pub recipient: Uuid,
    pub subject: NotificationSubject,
    pub status: String,
    pub timestamp: i64,
}

impl Signature for NotificationPayload {}
