//! House-mediated order types (user buys from / sells to the platform).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::{Direction, TransactionStatus};

/// Query string for `GET /cards/{card_id}/rate`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RateQuery {
    pub country: Option<String>,
}

/// Effective rate for a card, as fractions of face value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateResponse {
    pub card_id: Uuid,
    pub country: Option<String>,
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
    /// `true` when a country-specific override was applied.
    pub is_override: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBuyOrderRequest {
    pub card_id: Uuid,
    pub face_value: Decimal,
    pub quantity: i32,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSellOrderRequest {
    pub card_id: Uuid,
    pub face_value: Decimal,
    pub quantity: i32,
    #[serde(default)]
    pub country: Option<String>,
    /// Redemption code of the card being sold.
    pub code: String,
    pub payment_method: String,
    pub payment_details: String,
    /// Opaque reference to the uploaded proof (screenshot, receipt).
    #[serde(default)]
    pub evidence_ref: Option<String>,
}

/// A house-mediated order as seen by the caller.
///
/// `code` is only populated when the caller is allowed to see it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub transaction_id: Uuid,
    pub user_id: Uuid,
    pub direction: Direction,
    pub card_id: Uuid,
    pub card_name: String,
    /// Face value of a single card.
    pub amount: Decimal,
    pub quantity: i32,
    /// Price to pay (buy) or payout (sell) at the rate in effect when the
    /// order was placed.
    pub quoted_price: Decimal,
    pub country: Option<String>,
    pub status: TransactionStatus,
    pub code: Option<String>,
    pub evidence_ref: Option<String>,
    pub payment_method: Option<String>,
    pub payment_details: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Response of the code read endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeResponse {
    pub code: String,
}
