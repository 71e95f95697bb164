//! Peer-to-peer listing and trade types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::{ListingStatus, TradeStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateListingRequest {
    pub card_name: String,
    /// Face value of the listed card.
    pub amount: Decimal,
    /// Asking price.
    pub price: Decimal,
    pub currency: String,
    #[serde(default)]
    pub country: Option<String>,
    /// Physical or digital card, free form.
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingResponse {
    pub listing_id: Uuid,
    pub seller_id: Uuid,
    pub card_name: String,
    pub amount: Decimal,
    pub price: Decimal,
    pub currency: String,
    pub country: Option<String>,
    pub format: Option<String>,
    pub description: Option<String>,
    pub status: ListingStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiateTradeRequest {
    #[serde(default)]
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitPaymentProofRequest {
    /// Opaque reference to the uploaded payment proof.
    pub proof_ref: String,
}

/// A trade as seen by the caller. `code` is only populated when the
/// caller is allowed to see it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeResponse {
    pub trade_id: Uuid,
    pub listing_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub amount: Decimal,
    pub price: Decimal,
    pub currency: String,
    pub status: TradeStatus,
    pub payment_method: Option<String>,
    pub payment_proof_ref: Option<String>,
    pub code: Option<String>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}
