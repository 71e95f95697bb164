use super::auth::AuthorizationContext;
use super::error::EngineError;
use super::input;
use crate::entities::listing::{Listing, ListingFilter};
use crate::entities::{ListingStatus, Page};
use crate::events::{EventPublisher, SettlementEvent};
use crate::store::SettlementStore;
use crate::utils::utc_now;
use cardex_sdk::objects::{CreateListingRequest, NotificationKind};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Peer-to-peer listings.
///
/// A listing leaves `active` exactly once: cancelled by its seller, sold by
/// [`TradeCoordinator::initiate`](super::TradeCoordinator::initiate), or
/// expired by a privileged caller.
pub struct ListingRegistry<'a> {
    store: &'a dyn SettlementStore,
    events: &'a EventPublisher,
}

impl<'a> ListingRegistry<'a> {
    pub(super) fn new(store: &'a dyn SettlementStore, events: &'a EventPublisher) -> Self {
        Self { store, events }
    }

    pub async fn create(
        &self,
        ctx: &AuthorizationContext,
        request: CreateListingRequest,
    ) -> Result<Listing, EngineError> {
        let seller_id = ctx.acting_user()?;
        let now = utc_now();
        let listing = Listing {
            listing_id: Uuid::now_v7(),
            seller_id,
            card_name: input::required_text("card_name", &request.card_name)?,
            amount: input::money("amount", request.amount)?,
            price: input::money("price", request.price)?,
            currency: input::currency_code(&request.currency)?,
            country: input::country_code(request.country.as_deref())?,
            format: input::optional_text("format", request.format.as_deref())?,
            description: input::optional_text("description", request.description.as_deref())?,
            status: ListingStatus::Active,
            created_at: now,
            updated_at: now,
        };

        let stored = self.store.insert_listing(listing).await?;
        info!(
            listing_id = %stored.listing_id,
            seller_id = %stored.seller_id,
            price = %stored.price,
            currency = %stored.currency,
            "Listing created"
        );
        self.events.publish(SettlementEvent::for_listing(
            NotificationKind::ListingCreated,
            &stored,
        ));
        Ok(stored)
    }

    /// active → cancelled, by the owning seller only.
    pub async fn cancel(
        &self,
        ctx: &AuthorizationContext,
        listing_id: Uuid,
    ) -> Result<Listing, EngineError> {
        let actor = ctx.acting_user()?;
        let transition = self
            .store
            .modify_listing(listing_id, &|listing: &mut Listing| {
                if listing.seller_id != actor {
                    return Err(EngineError::Forbidden("only the seller may cancel a listing"));
                }
                if !listing.status.can_become(ListingStatus::Cancelled) {
                    return Err(EngineError::invalid_transition(
                        "listing",
                        "cancel",
                        listing.status,
                    ));
                }
                listing.status = ListingStatus::Cancelled;
                Ok(())
            })
            .await?;

        let listing = transition.into_current();
        info!(listing_id = %listing.listing_id, "Listing cancelled");
        self.events.publish(SettlementEvent::for_listing(
            NotificationKind::ListingCancelled,
            &listing,
        ));
        Ok(listing)
    }

    /// active → expired. Expiring a listing that is no longer active is a
    /// no-op that returns it unchanged.
    pub async fn expire(
        &self,
        ctx: &AuthorizationContext,
        listing_id: Uuid,
    ) -> Result<Listing, EngineError> {
        ctx.require_privileged()?;
        let transition = self
            .store
            .modify_listing(listing_id, &|listing: &mut Listing| {
                if listing.status.can_become(ListingStatus::Expired) {
                    listing.status = ListingStatus::Expired;
                }
                Ok(())
            })
            .await?;

        if transition.previous.status == transition.current.status {
            debug!(
                listing_id = %listing_id,
                status = %transition.current.status,
                "Listing not active, expiry skipped"
            );
            return Ok(transition.into_current());
        }

        let listing = transition.into_current();
        info!(listing_id = %listing.listing_id, role = ?ctx.role(), "Listing expired");
        self.events.publish(SettlementEvent::for_listing(
            NotificationKind::ListingExpired,
            &listing,
        ));
        Ok(listing)
    }

    /// Expire up to `limit` active listings created before the cutoff.
    /// Returns how many were expired. Individual failures are logged and
    /// skipped.
    pub async fn expire_stale(
        &self,
        ctx: &AuthorizationContext,
        created_before: time::PrimitiveDateTime,
        limit: i64,
    ) -> Result<usize, EngineError> {
        ctx.require_privileged()?;
        let candidates = self.store.stale_listings(created_before, limit).await?;

        let mut expired = 0;
        for listing_id in candidates {
            match self.expire(ctx, listing_id).await {
                Ok(listing) if listing.status == ListingStatus::Expired => expired += 1,
                Ok(_) => {}
                Err(e) => {
                    warn!(listing_id = %listing_id, error = %e, "Failed to expire listing");
                }
            }
        }
        Ok(expired)
    }

    /// Listings are public.
    pub async fn get(&self, listing_id: Uuid) -> Result<Listing, EngineError> {
        self.store
            .find_listing(listing_id)
            .await?
            .ok_or(EngineError::NotFound {
                entity: "listing",
                id: listing_id,
            })
    }

    pub async fn list_active(&self, page: Page) -> Result<Vec<Listing>, EngineError> {
        self.store.list_listings(&ListingFilter::active(), page).await
    }

    /// Any status. Users are limited to their own listings.
    pub async fn list(
        &self,
        ctx: &AuthorizationContext,
        mut filter: ListingFilter,
        page: Page,
    ) -> Result<Vec<Listing>, EngineError> {
        if !ctx.is_privileged() {
            filter.seller_id = Some(ctx.actor());
        }
        self.store.list_listings(&filter, page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::Harness;
    use rust_decimal_macros::dec;

    fn listing_request() -> CreateListingRequest {
        CreateListingRequest {
            card_name: "Steam Wallet".to_string(),
            amount: dec!(50),
            price: dec!(42.50),
            currency: "usd".to_string(),
            country: Some("us".to_string()),
            format: Some("e-code".to_string()),
            description: None,
        }
    }

    #[tokio::test]
    async fn create_normalizes_and_activates() {
        let mut h = Harness::new();
        let seller = AuthorizationContext::user(Uuid::now_v7());
        let listing = h.engine.listings().create(&seller, listing_request()).await.unwrap();

        assert_eq!(listing.status, ListingStatus::Active);
        assert_eq!(listing.currency, "USD");
        assert_eq!(listing.country.as_deref(), Some("US"));
        assert_eq!(listing.seller_id, seller.actor());
        assert_eq!(h.drain_kinds(), vec![NotificationKind::ListingCreated]);
    }

    #[tokio::test]
    async fn create_rejects_non_positive_amounts() {
        let h = Harness::new();
        let seller = AuthorizationContext::user(Uuid::now_v7());

        let mut request = listing_request();
        request.price = dec!(0);
        assert!(matches!(
            h.engine.listings().create(&seller, request).await,
            Err(EngineError::InvalidInput(_))
        ));

        let mut request = listing_request();
        request.amount = dec!(-10);
        assert!(matches!(
            h.engine.listings().create(&seller, request).await,
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn create_rejects_amounts_finer_than_cents() {
        let mut h = Harness::new();
        let seller = AuthorizationContext::user(Uuid::now_v7());

        let mut request = listing_request();
        request.amount = dec!(0.001);
        request.price = dec!(0.004);
        assert!(matches!(
            h.engine.listings().create(&seller, request).await,
            Err(EngineError::InvalidInput(_))
        ));

        let mut request = listing_request();
        request.price = dec!(10000000000000000);
        assert!(matches!(
            h.engine.listings().create(&seller, request).await,
            Err(EngineError::InvalidInput(_))
        ));

        assert!(h.engine.listings().list_active(Page::default()).await.unwrap().is_empty());
        assert!(h.drain_kinds().is_empty());
    }

    #[tokio::test]
    async fn only_the_seller_cancels_and_only_once() {
        let h = Harness::new();
        let seller = AuthorizationContext::user(Uuid::now_v7());
        let other = AuthorizationContext::user(Uuid::now_v7());
        let listings = h.engine.listings();
        let listing = listings.create(&seller, listing_request()).await.unwrap();

        assert!(matches!(
            listings.cancel(&other, listing.listing_id).await,
            Err(EngineError::Forbidden(_))
        ));
        assert!(matches!(
            listings.cancel(&h.admin, listing.listing_id).await,
            Err(EngineError::Forbidden(_))
        ));

        let cancelled = listings.cancel(&seller, listing.listing_id).await.unwrap();
        assert_eq!(cancelled.status, ListingStatus::Cancelled);

        let again = listings.cancel(&seller, listing.listing_id).await.unwrap_err();
        assert_eq!(again.current_status(), Some("cancelled"));
    }

    #[tokio::test]
    async fn expire_is_privileged_and_idempotent() {
        let mut h = Harness::new();
        let seller = AuthorizationContext::user(Uuid::now_v7());
        let listings = h.engine.listings();
        let listing = listings.create(&seller, listing_request()).await.unwrap();

        assert!(matches!(
            listings.expire(&seller, listing.listing_id).await,
            Err(EngineError::Forbidden(_))
        ));

        let expired = listings
            .expire(&AuthorizationContext::system(), listing.listing_id)
            .await
            .unwrap();
        assert_eq!(expired.status, ListingStatus::Expired);

        let again = listings.expire(&h.admin, listing.listing_id).await.unwrap();
        assert_eq!(again, expired);

        assert_eq!(
            h.drain_kinds(),
            vec![NotificationKind::ListingCreated, NotificationKind::ListingExpired]
        );
    }

    #[tokio::test]
    async fn expire_stale_only_touches_old_active_listings() {
        let h = Harness::new();
        let seller = AuthorizationContext::user(Uuid::now_v7());
        let listings = h.engine.listings();
        let first = listings.create(&seller, listing_request()).await.unwrap();
        let second = listings.create(&seller, listing_request()).await.unwrap();
        listings.cancel(&seller, second.listing_id).await.unwrap();

        let system = AuthorizationContext::system();
        let none = listings
            .expire_stale(&system, first.created_at - time::Duration::seconds(1), 10)
            .await
            .unwrap();
        assert_eq!(none, 0);

        let cutoff = utc_now() + time::Duration::seconds(1);
        assert_eq!(listings.expire_stale(&system, cutoff, 10).await.unwrap(), 1);
        assert_eq!(
            listings.get(first.listing_id).await.unwrap().status,
            ListingStatus::Expired
        );
        assert_eq!(
            listings.get(second.listing_id).await.unwrap().status,
            ListingStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn active_listings_exclude_closed_ones() {
        let h = Harness::new();
        let seller = AuthorizationContext::user(Uuid::now_v7());
        let listings = h.engine.listings();
        let open = listings.create(&seller, listing_request()).await.unwrap();
        let closed = listings.create(&seller, listing_request()).await.unwrap();
        listings.cancel(&seller, closed.listing_id).await.unwrap();

        let active = listings.list_active(Page::default()).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].listing_id, open.listing_id);

        let mine = listings
            .list(&seller, ListingFilter::default(), Page::default())
            .await
            .unwrap();
        assert_eq!(mine.len(), 2);
    }
}
