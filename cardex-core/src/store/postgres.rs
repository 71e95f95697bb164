use super::{CardUpsert, Claim, Mutation, SettlementStore, Transition};
use crate::engine::EngineError;
use crate::entities::gift_card::{
    CountryRate, DeleteCountryRate, GetCountryRate, GetGiftCard, GiftCard, UpsertCountryRate,
    UpsertGiftCard,
};
use crate::entities::listing::{
    GetListing, GetStaleListings, InsertListing, ListListings, Listing, ListingFilter,
};
use crate::entities::trade::{GetTrade, ListTrades, Trade, TradeFilter};
use crate::entities::transaction::{
    CardTransaction, GetCardTransaction, InsertCardTransaction, ListCardTransactions,
    TransactionFilter,
};
use crate::entities::{ListingStatus, Page};
use crate::framework::DatabaseProcessor;
use crate::utils::{is_unique_violation, utc_now};
use async_trait::async_trait;
use compact_str::CompactString;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use uuid::Uuid;

#[async_trait]
impl SettlementStore for DatabaseProcessor {
    async fn find_card(&self, card_id: Uuid) -> Result<Option<GiftCard>, EngineError> {
        Ok(self.process(GetGiftCard { card_id }).await?)
    }

    async fn find_country_rate(
        &self,
        card_id: Uuid,
        country_code: &str,
    ) -> Result<Option<CountryRate>, EngineError> {
        Ok(self
            .process(GetCountryRate {
                card_id,
                country_code: CompactString::from(country_code),
            })
            .await?)
    }

    async fn upsert_card(&self, card: CardUpsert) -> Result<GiftCard, EngineError> {
        Ok(self
            .process(UpsertGiftCard {
                card_id: card.card_id,
                name: card.name,
                active: card.active,
                buy_rate: card.buy_rate,
                sell_rate: card.sell_rate,
                now: utc_now(),
            })
            .await?)
    }

    async fn upsert_country_rate(
        &self,
        card_id: Uuid,
        country_code: &str,
        buy_rate: Decimal,
        sell_rate: Decimal,
    ) -> Result<CountryRate, EngineError> {
        if self.process(GetGiftCard { card_id }).await?.is_none() {
            return Err(EngineError::NotFound {
                entity: "card",
                id: card_id,
            });
        }
        Ok(self
            .process(UpsertCountryRate {
                card_id,
                country_code: CompactString::from(country_code),
                buy_rate,
                sell_rate,
                now: utc_now(),
            })
            .await?)
    }

    async fn delete_country_rate(
        &self,
        card_id: Uuid,
        country_code: &str,
    ) -> Result<bool, EngineError> {
        Ok(self
            .process(DeleteCountryRate {
                card_id,
                country_code: CompactString::from(country_code),
            })
            .await?)
    }

    async fn insert_transaction(
        &self,
        record: CardTransaction,
    ) -> Result<CardTransaction, EngineError> {
        Ok(self.process(InsertCardTransaction { record }).await?)
    }

    async fn find_transaction(
        &self,
        transaction_id: Uuid,
    ) -> Result<Option<CardTransaction>, EngineError> {
        Ok(self.process(GetCardTransaction { transaction_id }).await?)
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        page: Page,
    ) -> Result<Vec<CardTransaction>, EngineError> {
        Ok(self
            .process(ListCardTransactions {
                filter: filter.clone(),
                page,
            })
            .await?)
    }

    async fn modify_transaction(
        &self,
        transaction_id: Uuid,
        mutate: Mutation<'_, CardTransaction>,
    ) -> Result<Transition<CardTransaction>, EngineError> {
        let mut tx = self.begin().await?;
        let Some(previous) = CardTransaction::lock_tx(&mut tx, transaction_id).await? else {
            return Err(EngineError::NotFound {
                entity: "transaction",
                id: transaction_id,
            });
        };

        // An Err here drops `tx`, rolling back and releasing the row lock.
        let mut current = previous.clone();
        mutate(&mut current)?;

        if current != previous {
            current.updated_at = utc_now();
            CardTransaction::write_back_tx(&mut tx, &current).await?;
        }
        tx.commit().await?;
        Ok(Transition { previous, current })
    }

    async fn insert_listing(&self, listing: Listing) -> Result<Listing, EngineError> {
        Ok(self.process(InsertListing { listing }).await?)
    }

    async fn find_listing(&self, listing_id: Uuid) -> Result<Option<Listing>, EngineError> {
        Ok(self.process(GetListing { listing_id }).await?)
    }

    async fn list_listings(
        &self,
        filter: &ListingFilter,
        page: Page,
    ) -> Result<Vec<Listing>, EngineError> {
        Ok(self
            .process(ListListings {
                filter: filter.clone(),
                page,
            })
            .await?)
    }

    async fn modify_listing(
        &self,
        listing_id: Uuid,
        mutate: Mutation<'_, Listing>,
    ) -> Result<Transition<Listing>, EngineError> {
        let mut tx = self.begin().await?;
        let Some(previous) = Listing::lock_tx(&mut tx, listing_id).await? else {
            return Err(EngineError::NotFound {
                entity: "listing",
                id: listing_id,
            });
        };

        let mut current = previous.clone();
        mutate(&mut current)?;

        if current != previous {
            current.updated_at = utc_now();
            Listing::write_back_tx(&mut tx, &current).await?;
        }
        tx.commit().await?;
        Ok(Transition { previous, current })
    }

    async fn stale_listings(
        &self,
        created_before: time::PrimitiveDateTime,
        limit: i64,
    ) -> Result<Vec<Uuid>, EngineError> {
        Ok(self
            .process(GetStaleListings {
                created_before,
                limit,
            })
            .await?)
    }

    async fn claim_listing(
        &self,
        listing_id: Uuid,
        claim: Claim<'_>,
    ) -> Result<(Trade, Listing), EngineError> {
        let mut tx = self.begin().await?;
        let Some(mut listing) = Listing::lock_tx(&mut tx, listing_id).await? else {
            return Err(EngineError::NotFound {
                entity: "listing",
                id: listing_id,
            });
        };

        let trade = claim(&listing)?;

        if let Err(e) = Trade::insert_tx(&mut tx, &trade).await {
            if is_unique_violation(&e) {
                return Err(EngineError::Conflict(format!(
                    "listing {listing_id} already has a trade"
                )));
            }
            return Err(e.into());
        }

        if !Listing::mark_sold_tx(&mut tx, listing_id, trade.created_at).await? {
            return Err(EngineError::Conflict(format!(
                "listing {listing_id} is no longer active"
            )));
        }
        listing.status = ListingStatus::Sold;
        listing.updated_at = trade.created_at;

        tx.commit().await?;
        Ok((trade, listing))
    }

    async fn find_trade(&self, trade_id: Uuid) -> Result<Option<Trade>, EngineError> {
        Ok(self.process(GetTrade { trade_id }).await?)
    }

    async fn list_trades(
        &self,
        filter: &TradeFilter,
        page: Page,
    ) -> Result<Vec<Trade>, EngineError> {
        Ok(self
            .process(ListTrades {
                filter: filter.clone(),
                page,
            })
            .await?)
    }

    async fn modify_trade(
        &self,
        trade_id: Uuid,
        mutate: Mutation<'_, Trade>,
    ) -> Result<Transition<Trade>, EngineError> {
        let mut tx = self.begin().await?;
        let Some(previous) = Trade::lock_tx(&mut tx, trade_id).await? else {
            return Err(EngineError::NotFound {
                entity: "trade",
                id: trade_id,
            });
        };

        let mut current = previous.clone();
        mutate(&mut current)?;

        if current != previous {
            current.updated_at = utc_now();
            Trade::write_back_tx(&mut tx, &current).await?;
        }
        tx.commit().await?;
        Ok(Transition { previous, current })
    }
}
