//! Admin (arbiter) API request and response types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::{Direction, ListingStatus, TradeStatus, TransactionStatus};

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Create or replace a card and its default rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertCardRequest {
    pub name: String,
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryRateRequest {
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardResponse {
    pub card_id: Uuid,
    pub name: String,
    pub active: bool,
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
    pub updated_at: i64,
}

// ---------------------------------------------------------------------------
// Arbiter actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachCodeRequest {
    pub code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbiterNotesRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteTradeRequest {
    pub code: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Outcome chosen by the arbiter for a disputed trade.
///
/// ```json
/// {"outcome":"release","code":"XXXX-YYYY"}
/// {"outcome":"refund"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DisputeResolution {
    /// Buyer paid; release the code and complete the trade.
    Release { code: String },
    /// Payment not confirmed; cancel the trade.
    Refund,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveDisputeRequest {
    #[serde(flatten)]
    pub resolution: DisputeResolution,
    #[serde(default)]
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 200;
const MAX_OFFSET: i64 = 100_000;

/// Query parameters for listing house orders.
#[derive(Debug, Clone, Deserialize)]
pub struct ListOrdersQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub status: Option<TransactionStatus>,
    pub direction: Option<Direction>,
    pub user_id: Option<Uuid>,
}

/// Query parameters for listing listings.
#[derive(Debug, Clone, Deserialize)]
pub struct ListListingsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub status: Option<ListingStatus>,
    pub seller_id: Option<Uuid>,
}

/// Query parameters for listing trades.
#[derive(Debug, Clone, Deserialize)]
pub struct ListTradesQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub status: Option<TradeStatus>,
    pub listing_id: Option<Uuid>,
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

/// Clamp limit and offset to safe maximums.
pub fn clamp_pagination(limit: i64, offset: i64) -> (i64, i64) {
    (limit.clamp(1, MAX_LIMIT), offset.clamp(0, MAX_OFFSET))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_is_clamped() {
        assert_eq!(clamp_pagination(0, -5), (1, 0));
        assert_eq!(clamp_pagination(10_000, 5), (MAX_LIMIT, 5));
        assert_eq!(clamp_pagination(20, 1_000_000), (20, MAX_OFFSET));
    }

    #[test]
    fn resolution_wire_format() {
        let release: ResolveDisputeRequest =
            serde_json::from_str(r#"{"outcome":"release","code":"AB-12","notes":"paid"}"#).unwrap();
        assert_eq!(
            release.resolution,
            DisputeResolution::Release {
                code: "AB-12".to_string()
            }
        );
        assert_eq!(release.notes.as_deref(), Some("paid"));

        let refund: ResolveDisputeRequest = serde_json::from_str(r#"{"outcome":"refund"}"#).unwrap();
        assert_eq!(refund.resolution, DisputeResolution::Refund);
        assert!(refund.notes.is_none());
    }
}
