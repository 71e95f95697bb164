//! Persistence behind the settlement engine.
//!
//! Two implementations exist: [`DatabaseProcessor`](crate::framework::DatabaseProcessor)
//! backed by PostgreSQL, and [`MemoryStore`] for tests and ephemeral runs.
//!
//! Status changes go through `modify_*`: the store loads the record under an
//! exclusive lock, lets the engine validate and mutate it, and persists the
//! result only if the engine accepted it. Two concurrent modifications of the
//! same record therefore serialize, and the loser sees the winner's state.

mod memory;
mod postgres;

pub use memory::MemoryStore;

use crate::engine::EngineError;
use crate::entities::Page;
use crate::entities::gift_card::{CountryRate, GiftCard};
use crate::entities::listing::{Listing, ListingFilter};
use crate::entities::trade::{Trade, TradeFilter};
use crate::entities::transaction::{CardTransaction, TransactionFilter};
use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

/// A record before and after a committed modification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition<T> {
    pub previous: T,
    pub current: T,
}

impl<T> Transition<T> {
    pub fn into_current(self) -> T {
        self.current
    }
}

/// Validates and mutates a locked record. Returning `Err` aborts without
/// writing anything.
pub type Mutation<'a, T> = &'a (dyn Fn(&mut T) -> Result<(), EngineError> + Send + Sync);

/// Builds the trade for a locked, still-active listing.
pub type Claim<'a> = &'a (dyn Fn(&Listing) -> Result<Trade, EngineError> + Send + Sync);

/// Catalog write for a card and its default rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardUpsert {
    pub card_id: Uuid,
    pub name: String,
    pub active: bool,
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
}

#[async_trait]
pub trait SettlementStore: Send + Sync {
    async fn find_card(&self, card_id: Uuid) -> Result<Option<GiftCard>, EngineError>;

    async fn find_country_rate(
        &self,
        card_id: Uuid,
        country_code: &str,
    ) -> Result<Option<CountryRate>, EngineError>;

    async fn upsert_card(&self, card: CardUpsert) -> Result<GiftCard, EngineError>;

    /// Fails with `NotFound` if the card does not exist.
    async fn upsert_country_rate(
        &self,
        card_id: Uuid,
        country_code: &str,
        buy_rate: Decimal,
        sell_rate: Decimal,
    ) -> Result<CountryRate, EngineError>;

    /// Returns `true` if an override was removed.
    async fn delete_country_rate(
        &self,
        card_id: Uuid,
        country_code: &str,
    ) -> Result<bool, EngineError>;

    async fn insert_transaction(
        &self,
        record: CardTransaction,
    ) -> Result<CardTransaction, EngineError>;

    async fn find_transaction(
        &self,
        transaction_id: Uuid,
    ) -> Result<Option<CardTransaction>, EngineError>;

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        page: Page,
    ) -> Result<Vec<CardTransaction>, EngineError>;

    async fn modify_transaction(
        &self,
        transaction_id: Uuid,
        mutate: Mutation<'_, CardTransaction>,
    ) -> Result<Transition<CardTransaction>, EngineError>;

    async fn insert_listing(&self, listing: Listing) -> Result<Listing, EngineError>;

    async fn find_listing(&self, listing_id: Uuid) -> Result<Option<Listing>, EngineError>;

    async fn list_listings(
        &self,
        filter: &ListingFilter,
        page: Page,
    ) -> Result<Vec<Listing>, EngineError>;

    async fn modify_listing(
        &self,
        listing_id: Uuid,
        mutate: Mutation<'_, Listing>,
    ) -> Result<Transition<Listing>, EngineError>;

    /// Active listings created before the cutoff, oldest first.
    async fn stale_listings(
        &self,
        created_before: time::PrimitiveDateTime,
        limit: i64,
    ) -> Result<Vec<Uuid>, EngineError>;

    /// Atomically open a trade on a listing and mark the listing sold.
    ///
    /// `claim` sees the listing under lock. At most one claim per listing can
    /// ever succeed; every other caller gets `Conflict` or whatever `claim`
    /// returns for a non-active listing.
    async fn claim_listing(
        &self,
        listing_id: Uuid,
        claim: Claim<'_>,
    ) -> Result<(Trade, Listing), EngineError>;

    async fn find_trade(&self, trade_id: Uuid) -> Result<Option<Trade>, EngineError>;

    async fn list_trades(&self, filter: &TradeFilter, page: Page)
    -> Result<Vec<Trade>, EngineError>;

    async fn modify_trade(
        &self,
        trade_id: Uuid,
        mutate: Mutation<'_, Trade>,
    ) -> Result<Transition<Trade>, EngineError>;
}
