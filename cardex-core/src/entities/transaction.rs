use super::{Direction, Page, TransactionStatus};
use crate::framework::DatabaseProcessor;
use compact_str::CompactString;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use uuid::Uuid;

const SELECT_TRANSACTION: &str = r#"
    SELECT transaction_id, user_id, direction, card_id, card_name, amount, quantity,
           quoted_price, country, status, code, evidence_ref, payment_method,
           payment_details, created_at, updated_at
    FROM card_transactions
"#;

/// A house-mediated order: the user buys a card from, or sells a card to, the
/// platform at the resolved rate.
///
/// `code` holds the redemption code. It is supplied by the seller on sell
/// orders and attached by the arbiter on buy orders.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CardTransaction {
    pub transaction_id: Uuid,
    pub user_id: Uuid,
    pub direction: Direction,
    pub card_id: Uuid,
    pub card_name: String,
    pub amount: Decimal,
    pub quantity: i32,
    pub quoted_price: Decimal,
    pub country: Option<CompactString>,
    pub status: TransactionStatus,
    pub code: Option<String>,
    pub evidence_ref: Option<String>,
    pub payment_method: Option<String>,
    pub payment_details: Option<String>,
    pub created_at: time::PrimitiveDateTime,
    pub updated_at: time::PrimitiveDateTime,
}

/// Filters for listing house orders. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<TransactionStatus>,
    pub direction: Option<Direction>,
}

impl TransactionFilter {
    pub fn matches(&self, record: &CardTransaction) -> bool {
        self.user_id.is_none_or(|id| id == record.user_id)
            && self.status.is_none_or(|s| s == record.status)
            && self.direction.is_none_or(|d| d == record.direction)
    }
}

#[derive(Debug, Clone)]
pub struct InsertCardTransaction {
    pub record: CardTransaction,
}

impl Processor<InsertCardTransaction> for DatabaseProcessor {
    type Output = CardTransaction;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertCardTransaction")]
    async fn process(&self, cmd: InsertCardTransaction) -> Result<CardTransaction, sqlx::Error> {
        let record = cmd.record;
        sqlx::query(
            r#"
            INSERT INTO card_transactions (
                transaction_id, user_id, direction, card_id, card_name, amount, quantity,
                quoted_price, country, status, code, evidence_ref, payment_method,
                payment_details, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(record.transaction_id)
        .bind(record.user_id)
        .bind(record.direction)
        .bind(record.card_id)
        .bind(&record.card_name)
        .bind(record.amount)
        .bind(record.quantity)
        .bind(record.quoted_price)
        .bind(record.country.as_deref())
        .bind(record.status)
        .bind(record.code.as_deref())
        .bind(record.evidence_ref.as_deref())
        .bind(record.payment_method.as_deref())
        .bind(record.payment_details.as_deref())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(record)
    }
}

#[derive(Debug, Clone)]
pub struct GetCardTransaction {
    pub transaction_id: Uuid,
}

impl Processor<GetCardTransaction> for DatabaseProcessor {
    type Output = Option<CardTransaction>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetCardTransaction")]
    async fn process(
        &self,
        query: GetCardTransaction,
    ) -> Result<Option<CardTransaction>, sqlx::Error> {
        let sql = format!("{SELECT_TRANSACTION} WHERE transaction_id = $1");
        sqlx::query_as::<_, CardTransaction>(&sql)
            .bind(query.transaction_id)
            .fetch_optional(&self.pool)
            .await
    }
}

/// Newest first.
#[derive(Debug, Clone)]
pub struct ListCardTransactions {
    pub filter: TransactionFilter,
    pub page: Page,
}

impl Processor<ListCardTransactions> for DatabaseProcessor {
    type Output = Vec<CardTransaction>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListCardTransactions")]
    async fn process(
        &self,
        query: ListCardTransactions,
    ) -> Result<Vec<CardTransaction>, sqlx::Error> {
        let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new(SELECT_TRANSACTION);
        builder.push(" WHERE TRUE");
        if let Some(user_id) = query.filter.user_id {
            builder.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(status) = query.filter.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(direction) = query.filter.direction {
            builder.push(" AND direction = ").push_bind(direction);
        }
        builder
            .push(" ORDER BY created_at DESC, transaction_id DESC LIMIT ")
            .push_bind(query.page.limit)
            .push(" OFFSET ")
            .push_bind(query.page.offset);

        builder
            .build_query_as::<CardTransaction>()
            .fetch_all(&self.pool)
            .await
    }
}

impl CardTransaction {
    /// Load and row-lock a record for the rest of the transaction.
    pub async fn lock_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        transaction_id: Uuid,
    ) -> Result<Option<CardTransaction>, sqlx::Error> {
        let sql = format!("{SELECT_TRANSACTION} WHERE transaction_id = $1 FOR UPDATE");
        sqlx::query_as::<_, CardTransaction>(&sql)
            .bind(transaction_id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Persist the mutable columns of a locked record.
    pub async fn write_back_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        record: &CardTransaction,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE card_transactions
            SET status = $2,
                code = $3,
                evidence_ref = $4,
                payment_method = $5,
                payment_details = $6,
                updated_at = $7
            WHERE transaction_id = $1
            "#,
        )
        .bind(record.transaction_id)
        .bind(record.status)
        .bind(record.code.as_deref())
        .bind(record.evidence_ref.as_deref())
        .bind(record.payment_method.as_deref())
        .bind(record.payment_details.as_deref())
        .bind(record.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
