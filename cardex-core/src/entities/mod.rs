//! Persistent records and their lifecycle rules.
//!
//! Each status enum here is the `sqlx::Type` version stored in PostgreSQL and
//! owns the transition table for its record. For API/DTO use, see
//! `cardex_sdk::objects`.

pub mod gift_card;
pub mod listing;
pub mod trade;
pub mod transaction;

use cardex_sdk::objects::{
    Direction as SdkDirection, ListingStatus as SdkListingStatus, TradeStatus as SdkTradeStatus,
    TransactionStatus as SdkTransactionStatus,
};

/// Offset pagination shared by every list query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    pub(crate) fn bounds(&self) -> (usize, usize) {
        let offset = usize::try_from(self.offset).unwrap_or(0);
        let limit = usize::try_from(self.limit).unwrap_or(0);
        (offset, limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(20, 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "trade_direction")]
pub enum Direction {
    Buy,
    Sell,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        SdkDirection::from(*self).fmt(f)
    }
}

impl From<Direction> for SdkDirection {
    fn from(value: Direction) -> Self {
        match value {
            Direction::Buy => SdkDirection::Buy,
            Direction::Sell => SdkDirection::Sell,
        }
    }
}

impl From<SdkDirection> for Direction {
    fn from(value: SdkDirection) -> Self {
        match value {
            SdkDirection::Buy => Direction::Buy,
            SdkDirection::Sell => Direction::Sell,
        }
    }
}

/// Status of a house-mediated order.
///
/// `Paid` exists in the schema but no operation moves an order into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "transaction_status")]
pub enum TransactionStatus {
    Pending,
    Paid,
    Completed,
    Cancelled,
}

impl TransactionStatus {
    pub fn can_become(self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!((self, next), (Pending, Completed) | (Pending, Cancelled))
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TransactionStatus::Completed | TransactionStatus::Cancelled
        )
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        SdkTransactionStatus::from(*self).fmt(f)
    }
}

impl From<TransactionStatus> for SdkTransactionStatus {
    fn from(value: TransactionStatus) -> Self {
        match value {
            TransactionStatus::Pending => SdkTransactionStatus::Pending,
            TransactionStatus::Paid => SdkTransactionStatus::Paid,
            TransactionStatus::Completed => SdkTransactionStatus::Completed,
            TransactionStatus::Cancelled => SdkTransactionStatus::Cancelled,
        }
    }
}

impl From<SdkTransactionStatus> for TransactionStatus {
    fn from(value: SdkTransactionStatus) -> Self {
        match value {
            SdkTransactionStatus::Pending => TransactionStatus::Pending,
            SdkTransactionStatus::Paid => TransactionStatus::Paid,
            SdkTransactionStatus::Completed => TransactionStatus::Completed,
            SdkTransactionStatus::Cancelled => TransactionStatus::Cancelled,
        }
    }
}

/// Status of a peer-to-peer listing. Only `Active` listings can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "listing_status")]
pub enum ListingStatus {
    Active,
    Sold,
    Cancelled,
    Expired,
}

impl ListingStatus {
    pub fn can_become(self, next: ListingStatus) -> bool {
        use ListingStatus::*;
        matches!(
            (self, next),
            (Active, Sold) | (Active, Cancelled) | (Active, Expired)
        )
    }

    pub fn is_terminal(self) -> bool {
        self != ListingStatus::Active
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        SdkListingStatus::from(*self).fmt(f)
    }
}

impl From<ListingStatus> for SdkListingStatus {
    fn from(value: ListingStatus) -> Self {
        match value {
            ListingStatus::Active => SdkListingStatus::Active,
            ListingStatus::Sold => SdkListingStatus::Sold,
            ListingStatus::Cancelled => SdkListingStatus::Cancelled,
            ListingStatus::Expired => SdkListingStatus::Expired,
        }
    }
}

impl From<SdkListingStatus> for ListingStatus {
    fn from(value: SdkListingStatus) -> Self {
        match value {
            SdkListingStatus::Active => ListingStatus::Active,
            SdkListingStatus::Sold => ListingStatus::Sold,
            SdkListingStatus::Cancelled => ListingStatus::Cancelled,
            SdkListingStatus::Expired => ListingStatus::Expired,
        }
    }
}

/// Status of a peer-to-peer trade.
///
/// ```text
/// pending          -> paid
/// paid             -> completed
/// pending | paid   -> cancelled | disputed
/// disputed         -> completed | cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "trade_status")]
pub enum TradeStatus {
    Pending,
    Paid,
    Completed,
    Cancelled,
    Disputed,
}

impl TradeStatus {
    pub fn can_become(self, next: TradeStatus) -> bool {
        use TradeStatus::*;
        matches!(
            (self, next),
            (Pending, Paid)
                | (Paid, Completed)
                | (Pending, Cancelled)
                | (Paid, Cancelled)
                | (Pending, Disputed)
                | (Paid, Disputed)
                | (Disputed, Completed)
                | (Disputed, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TradeStatus::Completed | TradeStatus::Cancelled)
    }
}

impl std::fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        SdkTradeStatus::from(*self).fmt(f)
    }
}

impl From<TradeStatus> for SdkTradeStatus {
    fn from(value: TradeStatus) -> Self {
        match value {
            TradeStatus::Pending => SdkTradeStatus::Pending,
            TradeStatus::Paid => SdkTradeStatus::Paid,
            TradeStatus::Completed => SdkTradeStatus::Completed,
            TradeStatus::Cancelled => SdkTradeStatus::Cancelled,
            TradeStatus::Disputed => SdkTradeStatus::Disputed,
        }
    }
}

impl From<SdkTradeStatus> for TradeStatus {
    fn from(value: SdkTradeStatus) -> Self {
        match value {
            SdkTradeStatus::Pending => TradeStatus::Pending,
            SdkTradeStatus::Paid => TradeStatus::Paid,
            SdkTradeStatus::Completed => TradeStatus::Completed,
            SdkTradeStatus::Cancelled => TradeStatus::Cancelled,
            SdkTradeStatus::Disputed => TradeStatus::Disputed,
        }
    }
}
