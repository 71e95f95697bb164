use crate::framework::DatabaseProcessor;
use compact_str::CompactString;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use uuid::Uuid;

/// A card product in the catalog together with its default rate.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct GiftCard {
    pub card_id: Uuid,
    pub name: String,
    pub active: bool,
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
    pub created_at: time::PrimitiveDateTime,
    pub updated_at: time::PrimitiveDateTime,
}

/// Per-country override of a card's default rate.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CountryRate {
    pub card_id: Uuid,
    pub country_code: CompactString,
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
    pub updated_at: time::PrimitiveDateTime,
}

#[derive(Debug, Clone)]
pub struct GetGiftCard {
    pub card_id: Uuid,
}

impl Processor<GetGiftCard> for DatabaseProcessor {
    type Output = Option<GiftCard>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetGiftCard")]
    async fn process(&self, query: GetGiftCard) -> Result<Option<GiftCard>, sqlx::Error> {
        sqlx::query_as::<_, GiftCard>(
            r#"
            SELECT card_id, name, active, buy_rate, sell_rate, created_at, updated_at
            FROM gift_cards
            WHERE card_id = $1
            "#,
        )
        .bind(query.card_id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
pub struct GetCountryRate {
    pub card_id: Uuid,
    pub country_code: CompactString,
}

impl Processor<GetCountryRate> for DatabaseProcessor {
    type Output = Option<CountryRate>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetCountryRate")]
    async fn process(&self, query: GetCountryRate) -> Result<Option<CountryRate>, sqlx::Error> {
        sqlx::query_as::<_, CountryRate>(
            r#"
            SELECT card_id, country_code, buy_rate, sell_rate, updated_at
            FROM gift_card_country_rates
            WHERE card_id = $1 AND country_code = $2
            "#,
        )
        .bind(query.card_id)
        .bind(query.country_code.as_str())
        .fetch_optional(&self.pool)
        .await
    }
}

/// Create the card, or replace its name, default rate and active flag.
#[derive(Debug, Clone)]
pub struct UpsertGiftCard {
    pub card_id: Uuid,
    pub name: String,
    pub active: bool,
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
    pub now: time::PrimitiveDateTime,
}

impl Processor<UpsertGiftCard> for DatabaseProcessor {
    type Output = GiftCard;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpsertGiftCard")]
    async fn process(&self, cmd: UpsertGiftCard) -> Result<GiftCard, sqlx::Error> {
        sqlx::query_as::<_, GiftCard>(
            r#"
            INSERT INTO gift_cards (card_id, name, active, buy_rate, sell_rate, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT (card_id) DO UPDATE
            SET name = EXCLUDED.name,
                active = EXCLUDED.active,
                buy_rate = EXCLUDED.buy_rate,
                sell_rate = EXCLUDED.sell_rate,
                updated_at = EXCLUDED.updated_at
            RETURNING card_id, name, active, buy_rate, sell_rate, created_at, updated_at
            "#,
        )
        .bind(cmd.card_id)
        .bind(cmd.name)
        .bind(cmd.active)
        .bind(cmd.buy_rate)
        .bind(cmd.sell_rate)
        .bind(cmd.now)
        .fetch_one(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
pub struct UpsertCountryRate {
    pub card_id: Uuid,
    pub country_code: CompactString,
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
    pub now: time::PrimitiveDateTime,
}

impl Processor<UpsertCountryRate> for DatabaseProcessor {
    type Output = CountryRate;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpsertCountryRate")]
    async fn process(&self, cmd: UpsertCountryRate) -> Result<CountryRate, sqlx::Error> {
        sqlx::query_as::<_, CountryRate>(
            r#"
            INSERT INTO gift_card_country_rates (card_id, country_code, buy_rate, sell_rate, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (card_id, country_code) DO UPDATE
            SET buy_rate = EXCLUDED.buy_rate,
                sell_rate = EXCLUDED.sell_rate,
                updated_at = EXCLUDED.updated_at
            RETURNING card_id, country_code, buy_rate, sell_rate, updated_at
            "#,
        )
        .bind(cmd.card_id)
        .bind(cmd.country_code.as_str())
        .bind(cmd.buy_rate)
        .bind(cmd.sell_rate)
        .bind(cmd.now)
        .fetch_one(&self.pool)
        .await
    }
}

/// Returns `true` if an override existed.
#[derive(Debug, Clone)]
pub struct DeleteCountryRate {
    pub card_id: Uuid,
    pub country_code: CompactString,
}

impl Processor<DeleteCountryRate> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:DeleteCountryRate")]
    async fn process(&self, cmd: DeleteCountryRate) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM gift_card_country_rates
            WHERE card_id = $1 AND country_code = $2
            "#,
        )
        .bind(cmd.card_id)
        .bind(cmd.country_code.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
