use super::{Page, TradeStatus};
use crate::framework::DatabaseProcessor;
use compact_str::CompactString;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use uuid::Uuid;

const SELECT_TRADE: &str = r#"
    SELECT trade_id, listing_id, buyer_id, seller_id, amount, price, currency, status,
           payment_method, payment_proof_ref, code, notes, created_at, updated_at
    FROM trades
"#;

/// A buyer's claim on a listing, settled off-platform and confirmed by the
/// arbiter.
///
/// `amount`, `price` and `currency` are copied from the listing when the trade
/// is opened and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Trade {
    pub trade_id: Uuid,
    pub listing_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub amount: Decimal,
    pub price: Decimal,
    pub currency: CompactString,
    pub status: TradeStatus,
    pub payment_method: Option<String>,
    pub payment_proof_ref: Option<String>,
    pub code: Option<String>,
    pub notes: Option<String>,
    pub created_at: time::PrimitiveDateTime,
    pub updated_at: time::PrimitiveDateTime,
}

impl Trade {
    pub fn is_party(&self, user_id: Uuid) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradeFilter {
    /// Matches trades where this user is buyer or seller.
    pub party_id: Option<Uuid>,
    pub listing_id: Option<Uuid>,
    pub status: Option<TradeStatus>,
}

impl TradeFilter {
    pub fn matches(&self, trade: &Trade) -> bool {
        self.party_id.is_none_or(|id| trade.is_party(id))
            && self.listing_id.is_none_or(|id| id == trade.listing_id)
            && self.status.is_none_or(|s| s == trade.status)
    }
}

#[derive(Debug, Clone)]
pub struct GetTrade {
    pub trade_id: Uuid,
}

impl Processor<GetTrade> for DatabaseProcessor {
    type Output = Option<Trade>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetTrade")]
    async fn process(&self, query: GetTrade) -> Result<Option<Trade>, sqlx::Error> {
        let sql = format!("{SELECT_TRADE} WHERE trade_id = $1");
        sqlx::query_as::<_, Trade>(&sql)
            .bind(query.trade_id)
            .fetch_optional(&self.pool)
            .await
    }
}

/// Newest first.
#[derive(Debug, Clone)]
pub struct ListTrades {
    pub filter: TradeFilter,
    pub page: Page,
}

impl Processor<ListTrades> for DatabaseProcessor {
    type Output = Vec<Trade>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListTrades")]
    async fn process(&self, query: ListTrades) -> Result<Vec<Trade>, sqlx::Error> {
        let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new(SELECT_TRADE);
        builder.push(" WHERE TRUE");
        if let Some(party_id) = query.filter.party_id {
            builder
                .push(" AND (buyer_id = ")
                .push_bind(party_id)
                .push(" OR seller_id = ")
                .push_bind(party_id)
                .push(")");
        }
        if let Some(listing_id) = query.filter.listing_id {
            builder.push(" AND listing_id = ").push_bind(listing_id);
        }
        if let Some(status) = query.filter.status {
            builder.push(" AND status = ").push_bind(status);
        }
        builder
            .push(" ORDER BY created_at DESC, trade_id DESC LIMIT ")
            .push_bind(query.page.limit)
            .push(" OFFSET ")
            .push_bind(query.page.offset);

        builder
            .build_query_as::<Trade>()
            .fetch_all(&self.pool)
            .await
    }
}

impl Trade {
    pub async fn insert_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        trade: &Trade,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO trades (
                trade_id, listing_id, buyer_id, seller_id, amount, price, currency, status,
                payment_method, payment_proof_ref, code, notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(trade.trade_id)
        .bind(trade.listing_id)
        .bind(trade.buyer_id)
        .bind(trade.seller_id)
        .bind(trade.amount)
        .bind(trade.price)
        .bind(trade.currency.as_str())
        .bind(trade.status)
        .bind(trade.payment_method.as_deref())
        .bind(trade.payment_proof_ref.as_deref())
        .bind(trade.code.as_deref())
        .bind(trade.notes.as_deref())
        .bind(trade.created_at)
        .bind(trade.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Load and row-lock a trade for the rest of the transaction.
    pub async fn lock_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        trade_id: Uuid,
    ) -> Result<Option<Trade>, sqlx::Error> {
        let sql = format!("{SELECT_TRADE} WHERE trade_id = $1 FOR UPDATE");
        sqlx::query_as::<_, Trade>(&sql)
            .bind(trade_id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Persist the mutable columns of a locked trade.
    pub async fn write_back_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        trade: &Trade,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE trades
            SET status = $2,
                payment_proof_ref = $3,
                code = $4,
                notes = $5,
                updated_at = $6
            WHERE trade_id = $1
            "#,
        )
        .bind(trade.trade_id)
        .bind(trade.status)
        .bind(trade.payment_proof_ref.as_deref())
        .bind(trade.code.as_deref())
        .bind(trade.notes.as_deref())
        .bind(trade.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
