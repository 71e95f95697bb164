use super::auth::AuthorizationContext;
use super::error::EngineError;
use super::input;
use crate::entities::Direction;
use crate::entities::gift_card::{CountryRate, GiftCard};
use crate::store::{CardUpsert, SettlementStore};
use compact_str::CompactString;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::info;
use uuid::Uuid;

/// Buy and sell rates as fractions of face value (0.85 = 85%).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rate {
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
}

impl Rate {
    pub fn new(buy_rate: Decimal, sell_rate: Decimal) -> Result<Self, EngineError> {
        input::rate("buy_rate", buy_rate)?;
        input::rate("sell_rate", sell_rate)?;
        Ok(Self {
            buy_rate,
            sell_rate,
        })
    }

    pub fn for_direction(&self, direction: Direction) -> Decimal {
        match direction {
            Direction::Buy => self.buy_rate,
            Direction::Sell => self.sell_rate,
        }
    }
}

impl From<&GiftCard> for Rate {
    fn from(card: &GiftCard) -> Self {
        Self {
            buy_rate: card.buy_rate,
            sell_rate: card.sell_rate,
        }
    }
}

impl From<&CountryRate> for Rate {
    fn from(rate: &CountryRate) -> Self {
        Self {
            buy_rate: rate.buy_rate,
            sell_rate: rate.sell_rate,
        }
    }
}

/// The rate that applies to a card in a country.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRate {
    pub card: GiftCard,
    pub country: Option<CompactString>,
    pub rate: Rate,
    /// `true` if a country override was found, `false` for the card default.
    pub is_override: bool,
}

/// `face_value * quantity * rate`, rounded half away from zero to cents.
///
/// Overflow, non-positive inputs, sub-cent face values and prices too large
/// to store are `InvalidInput`.
pub fn price_for(
    direction: Direction,
    face_value: Decimal,
    quantity: i32,
    rate: &Rate,
) -> Result<Decimal, EngineError> {
    input::money("face_value", face_value)?;
    if quantity <= 0 {
        return Err(EngineError::invalid_input("quantity must be positive"));
    }
    let rate = input::positive("rate", rate.for_direction(direction))?;

    face_value
        .checked_mul(Decimal::from(quantity))
        .and_then(|total| total.checked_mul(rate))
        .map(|price| price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .ok_or_else(|| EngineError::invalid_input("price overflows"))
        .and_then(|price| input::within_money_range("price", price))
}

pub struct RateResolver<'a> {
    store: &'a dyn SettlementStore,
}

impl<'a> RateResolver<'a> {
    pub(super) fn new(store: &'a dyn SettlementStore) -> Self {
        Self { store }
    }

    /// Country override if one exists for the pair, else the card default.
    /// Missing and inactive cards are both `NotFound`.
    pub async fn resolve(
        &self,
        card_id: Uuid,
        country: Option<&str>,
    ) -> Result<ResolvedRate, EngineError> {
        let country = input::country_code(country)?;
        let card = self
            .store
            .find_card(card_id)
            .await?
            .filter(|card| card.active)
            .ok_or(EngineError::NotFound {
                entity: "card",
                id: card_id,
            })?;

        let override_rate = match &country {
            Some(code) => self.store.find_country_rate(card_id, code).await?,
            None => None,
        };

        let (rate, is_override) = match &override_rate {
            Some(found) => (Rate::from(found), true),
            None => (Rate::from(&card), false),
        };

        Ok(ResolvedRate {
            card,
            country,
            rate,
            is_override,
        })
    }

    pub async fn upsert_card(
        &self,
        ctx: &AuthorizationContext,
        card: CardUpsert,
    ) -> Result<GiftCard, EngineError> {
        ctx.require_admin()?;
        Rate::new(card.buy_rate, card.sell_rate)?;
        let card = CardUpsert {
            name: input::required_text("name", &card.name)?,
            ..card
        };

        let stored = self.store.upsert_card(card).await?;
        info!(
            card_id = %stored.card_id,
            admin_id = %ctx.actor(),
            active = stored.active,
            "Card upserted"
        );
        Ok(stored)
    }

    pub async fn set_country_rate(
        &self,
        ctx: &AuthorizationContext,
        card_id: Uuid,
        country: &str,
        rate: Rate,
    ) -> Result<CountryRate, EngineError> {
        ctx.require_admin()?;
        let rate = Rate::new(rate.buy_rate, rate.sell_rate)?;
        let country = input::country_code(Some(country))?
            .ok_or_else(|| EngineError::invalid_input("country code is required"))?;

        let stored = self
            .store
            .upsert_country_rate(card_id, &country, rate.buy_rate, rate.sell_rate)
            .await?;
        info!(card_id = %card_id, country = %country, admin_id = %ctx.actor(), "Country rate set");
        Ok(stored)
    }

    /// Returns `true` if an override was removed.
    pub async fn remove_country_rate(
        &self,
        ctx: &AuthorizationContext,
        card_id: Uuid,
        country: &str,
    ) -> Result<bool, EngineError> {
        ctx.require_admin()?;
        let country = input::country_code(Some(country))?
            .ok_or_else(|| EngineError::invalid_input("country code is required"))?;

        let removed = self.store.delete_country_rate(card_id, &country).await?;
        info!(card_id = %card_id, country = %country, removed, "Country rate removed");
        Ok(removed)
    }
}
