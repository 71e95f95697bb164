use super::{CardUpsert, Claim, Mutation, SettlementStore, Transition};
use crate::engine::EngineError;
use crate::entities::gift_card::{CountryRate, GiftCard};
use crate::entities::listing::{Listing, ListingFilter};
use crate::entities::trade::{Trade, TradeFilter};
use crate::entities::transaction::{CardTransaction, TransactionFilter};
use crate::entities::{ListingStatus, Page};
use crate::utils::utc_now;
use async_trait::async_trait;
use compact_str::CompactString;
use itertools::Itertools;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// In-process store. A single lock guards all tables, so every operation is
/// trivially atomic. State is lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    cards: HashMap<Uuid, GiftCard>,
    country_rates: HashMap<(Uuid, CompactString), CountryRate>,
    transactions: HashMap<Uuid, CardTransaction>,
    listings: HashMap<Uuid, Listing>,
    trades: HashMap<Uuid, Trade>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first, ties broken by id, then paged.
fn page_newest_first<'a, T: Clone + 'a>(
    rows: impl Iterator<Item = &'a T>,
    key: impl Fn(&T) -> (time::PrimitiveDateTime, Uuid),
    page: Page,
) -> Vec<T> {
    let (offset, limit) = page.bounds();
    rows.sorted_by(|a, b| key(b).cmp(&key(a)))
        .skip(offset)
        .take(limit)
        .cloned()
        .collect()
}

fn apply<T: Clone + PartialEq>(
    record: &mut T,
    mutate: Mutation<'_, T>,
    touch: impl FnOnce(&mut T),
) -> Result<Transition<T>, EngineError> {
    let previous = record.clone();
    let mut current = previous.clone();
    mutate(&mut current)?;
    if current != previous {
        touch(&mut current);
        *record = current.clone();
    }
    Ok(Transition { previous, current })
}

#[async_trait]
impl SettlementStore for MemoryStore {
    async fn find_card(&self, card_id: Uuid) -> Result<Option<GiftCard>, EngineError> {
        Ok(self.tables.lock().await.cards.get(&card_id).cloned())
    }

    async fn find_country_rate(
        &self,
        card_id: Uuid,
        country_code: &str,
    ) -> Result<Option<CountryRate>, EngineError> {
        let key = (card_id, CompactString::from(country_code));
        Ok(self.tables.lock().await.country_rates.get(&key).cloned())
    }

    async fn upsert_card(&self, card: CardUpsert) -> Result<GiftCard, EngineError> {
        let now = utc_now();
        let mut tables = self.tables.lock().await;
        let created_at = tables
            .cards
            .get(&card.card_id)
            .map_or(now, |existing| existing.created_at);
        let stored = GiftCard {
            card_id: card.card_id,
            name: card.name,
            active: card.active,
            buy_rate: card.buy_rate,
            sell_rate: card.sell_rate,
            created_at,
            updated_at: now,
        };
        tables.cards.insert(stored.card_id, stored.clone());
        Ok(stored)
    }

    async fn upsert_country_rate(
        &self,
        card_id: Uuid,
        country_code: &str,
        buy_rate: Decimal,
        sell_rate: Decimal,
    ) -> Result<CountryRate, EngineError> {
        let mut tables = self.tables.lock().await;
        if !tables.cards.contains_key(&card_id) {
            return Err(EngineError::NotFound {
                entity: "card",
                id: card_id,
            });
        }
        let rate = CountryRate {
            card_id,
            country_code: CompactString::from(country_code),
            buy_rate,
            sell_rate,
            updated_at: utc_now(),
        };
        tables
            .country_rates
            .insert((card_id, rate.country_code.clone()), rate.clone());
        Ok(rate)
    }

    async fn delete_country_rate(
        &self,
        card_id: Uuid,
        country_code: &str,
    ) -> Result<bool, EngineError> {
        let key = (card_id, CompactString::from(country_code));
        Ok(self.tables.lock().await.country_rates.remove(&key).is_some())
    }

    async fn insert_transaction(
        &self,
        record: CardTransaction,
    ) -> Result<CardTransaction, EngineError> {
        let mut tables = self.tables.lock().await;
        if tables.transactions.contains_key(&record.transaction_id) {
            return Err(EngineError::Conflict(format!(
                "transaction {} already exists",
                record.transaction_id
            )));
        }
        tables
            .transactions
            .insert(record.transaction_id, record.clone());
        Ok(record)
    }

    async fn find_transaction(
        &self,
        transaction_id: Uuid,
    ) -> Result<Option<CardTransaction>, EngineError> {
        Ok(self
            .tables
            .lock()
            .await
            .transactions
            .get(&transaction_id)
            .cloned())
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        page: Page,
    ) -> Result<Vec<CardTransaction>, EngineError> {
        let tables = self.tables.lock().await;
        Ok(page_newest_first(
            tables.transactions.values().filter(|r| filter.matches(r)),
            |r| (r.created_at, r.transaction_id),
            page,
        ))
    }

    async fn modify_transaction(
        &self,
        transaction_id: Uuid,
        mutate: Mutation<'_, CardTransaction>,
    ) -> Result<Transition<CardTransaction>, EngineError> {
        let mut tables = self.tables.lock().await;
        let record = tables
            .transactions
            .get_mut(&transaction_id)
            .ok_or(EngineError::NotFound {
                entity: "transaction",
                id: transaction_id,
            })?;
        apply(record, mutate, |r| r.updated_at = utc_now())
    }

    async fn insert_listing(&self, listing: Listing) -> Result<Listing, EngineError> {
        let mut tables = self.tables.lock().await;
        if tables.listings.contains_key(&listing.listing_id) {
            return Err(EngineError::Conflict(format!(
                "listing {} already exists",
                listing.listing_id
            )));
        }
        tables.listings.insert(listing.listing_id, listing.clone());
        Ok(listing)
    }

    async fn find_listing(&self, listing_id: Uuid) -> Result<Option<Listing>, EngineError> {
        Ok(self.tables.lock().await.listings.get(&listing_id).cloned())
    }

    async fn list_listings(
        &self,
        filter: &ListingFilter,
        page: Page,
    ) -> Result<Vec<Listing>, EngineError> {
        let tables = self.tables.lock().await;
        Ok(page_newest_first(
            tables.listings.values().filter(|l| filter.matches(l)),
            |l| (l.created_at, l.listing_id),
            page,
        ))
    }

    async fn modify_listing(
        &self,
        listing_id: Uuid,
        mutate: Mutation<'_, Listing>,
    ) -> Result<Transition<Listing>, EngineError> {
        let mut tables = self.tables.lock().await;
        let listing = tables
            .listings
            .get_mut(&listing_id)
            .ok_or(EngineError::NotFound {
                entity: "listing",
                id: listing_id,
            })?;
        apply(listing, mutate, |l| l.updated_at = utc_now())
    }

    async fn stale_listings(
        &self,
        created_before: time::PrimitiveDateTime,
        limit: i64,
    ) -> Result<Vec<Uuid>, EngineError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        let tables = self.tables.lock().await;
        Ok(tables
            .listings
            .values()
            .filter(|l| l.status == ListingStatus::Active && l.created_at < created_before)
            .sorted_by_key(|l| (l.created_at, l.listing_id))
            .take(limit)
            .map(|l| l.listing_id)
            .collect())
    }

    async fn claim_listing(
        &self,
        listing_id: Uuid,
        claim: Claim<'_>,
    ) -> Result<(Trade, Listing), EngineError> {
        let mut tables = self.tables.lock().await;
        let Some(listing) = tables.listings.get(&listing_id) else {
            return Err(EngineError::NotFound {
                entity: "listing",
                id: listing_id,
            });
        };

        let trade = claim(listing)?;
        if tables.trades.values().any(|t| t.listing_id == listing_id) {
            return Err(EngineError::Conflict(format!(
                "listing {listing_id} already has a trade"
            )));
        }

        let mut listing = listing.clone();
        listing.status = ListingStatus::Sold;
        listing.updated_at = trade.created_at;
        tables.listings.insert(listing_id, listing.clone());
        tables.trades.insert(trade.trade_id, trade.clone());
        Ok((trade, listing))
    }

    async fn find_trade(&self, trade_id: Uuid) -> Result<Option<Trade>, EngineError> {
        Ok(self.tables.lock().await.trades.get(&trade_id).cloned())
    }

    async fn list_trades(
        &self,
        filter: &TradeFilter,
        page: Page,
    ) -> Result<Vec<Trade>, EngineError> {
        let tables = self.tables.lock().await;
        Ok(page_newest_first(
            tables.trades.values().filter(|t| filter.matches(t)),
            |t| (t.created_at, t.trade_id),
            page,
        ))
    }

    async fn modify_trade(
        &self,
        trade_id: Uuid,
        mutate: Mutation<'_, Trade>,
    ) -> Result<Transition<Trade>, EngineError> {
        let mut tables = self.tables.lock().await;
        let trade = tables
            .trades
            .get_mut(&trade_id)
            .ok_or(EngineError::NotFound {
                entity: "trade",
                id: trade_id,
            })?;
        apply(trade, mutate, |t| t.updated_at = utc_now())
    }
}
