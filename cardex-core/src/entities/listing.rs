use super::{ListingStatus, Page};
use crate::framework::DatabaseProcessor;
use compact_str::CompactString;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use uuid::Uuid;

const SELECT_LISTING: &str = r#"
    SELECT listing_id, seller_id, card_name, amount, price, currency, country, format,
           description, status, created_at, updated_at
    FROM listings
"#;

/// A seller's public offer to sell one gift card to another user.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Listing {
    pub listing_id: Uuid,
    pub seller_id: Uuid,
    pub card_name: String,
    pub amount: Decimal,
    pub price: Decimal,
    pub currency: CompactString,
    pub country: Option<CompactString>,
    pub format: Option<String>,
    pub description: Option<String>,
    pub status: ListingStatus,
    pub created_at: time::PrimitiveDateTime,
    pub updated_at: time::PrimitiveDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingFilter {
    pub seller_id: Option<Uuid>,
    pub status: Option<ListingStatus>,
}

impl ListingFilter {
    pub fn active() -> Self {
        Self {
            seller_id: None,
            status: Some(ListingStatus::Active),
        }
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        self.seller_id.is_none_or(|id| id == listing.seller_id)
            && self.status.is_none_or(|s| s == listing.status)
    }
}

#[derive(Debug, Clone)]
pub struct InsertListing {
    pub listing: Listing,
}

impl Processor<InsertListing> for DatabaseProcessor {
    type Output = Listing;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertListing")]
    async fn process(&self, cmd: InsertListing) -> Result<Listing, sqlx::Error> {
        let listing = cmd.listing;
        sqlx::query(
            r#"
            INSERT INTO listings (
                listing_id, seller_id, card_name, amount, price, currency, country, format,
                description, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(listing.listing_id)
        .bind(listing.seller_id)
        .bind(&listing.card_name)
        .bind(listing.amount)
        .bind(listing.price)
        .bind(listing.currency.as_str())
        .bind(listing.country.as_deref())
        .bind(listing.format.as_deref())
        .bind(listing.description.as_deref())
        .bind(listing.status)
        .bind(listing.created_at)
        .bind(listing.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(listing)
    }
}

#[derive(Debug, Clone)]
pub struct GetListing {
    pub listing_id: Uuid,
}

impl Processor<GetListing> for DatabaseProcessor {
    type Output = Option<Listing>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetListing")]
    async fn process(&self, query: GetListing) -> Result<Option<Listing>, sqlx::Error> {
        let sql = format!("{SELECT_LISTING} WHERE listing_id = $1");
        sqlx::query_as::<_, Listing>(&sql)
            .bind(query.listing_id)
            .fetch_optional(&self.pool)
            .await
    }
}

/// Newest first.
#[derive(Debug, Clone)]
pub struct ListListings {
    pub filter: ListingFilter,
    pub page: Page,
}

impl Processor<ListListings> for DatabaseProcessor {
    type Output = Vec<Listing>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListListings")]
    async fn process(&self, query: ListListings) -> Result<Vec<Listing>, sqlx::Error> {
        let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new(SELECT_LISTING);
        builder.push(" WHERE TRUE");
        if let Some(seller_id) = query.filter.seller_id {
            builder.push(" AND seller_id = ").push_bind(seller_id);
        }
        if let Some(status) = query.filter.status {
            builder.push(" AND status = ").push_bind(status);
        }
        builder
            .push(" ORDER BY created_at DESC, listing_id DESC LIMIT ")
            .push_bind(query.page.limit)
            .push(" OFFSET ")
            .push_bind(query.page.offset);

        builder
            .build_query_as::<Listing>()
            .fetch_all(&self.pool)
            .await
    }
}

/// Ids of active listings created before the cutoff, oldest first.
#[derive(Debug, Clone)]
pub struct GetStaleListings {
    pub created_before: time::PrimitiveDateTime,
    pub limit: i64,
}

impl Processor<GetStaleListings> for DatabaseProcessor {
    type Output = Vec<Uuid>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetStaleListings")]
    async fn process(&self, query: GetStaleListings) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT listing_id
            FROM listings
            WHERE status = 'active' AND created_at < $1
            ORDER BY created_at ASC
            LIMIT $2
            "#,
        )
        .bind(query.created_before)
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await
    }
}

impl Listing {
    /// Load and row-lock a listing for the rest of the transaction.
    pub async fn lock_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        listing_id: Uuid,
    ) -> Result<Option<Listing>, sqlx::Error> {
        let sql = format!("{SELECT_LISTING} WHERE listing_id = $1 FOR UPDATE");
        sqlx::query_as::<_, Listing>(&sql)
            .bind(listing_id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Flip an active listing to sold. Returns `false` if it was no longer
    /// active, in which case nothing is written.
    pub async fn mark_sold_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        listing_id: Uuid,
        at: time::PrimitiveDateTime,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE listings
            SET status = 'sold', updated_at = $2
            WHERE listing_id = $1 AND status = 'active'
            "#,
        )
        .bind(listing_id)
        .bind(at)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Persist the status of a locked listing.
    pub async fn write_back_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        listing: &Listing,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE listings
            SET status = $2, updated_at = $3
            WHERE listing_id = $1
            "#,
        )
        .bind(listing.listing_id)
        .bind(listing.status)
        .bind(listing.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
