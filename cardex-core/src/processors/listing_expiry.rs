//! ListingExpiryScheduler processor.
//!
//! Every `sweep_interval`, expires active listings created more than `ttl`
//! ago. Expiry goes through the engine as the system actor, so each expired
//! listing publishes its own `listing.expired` event and a listing sold
//! concurrently is left alone.

use crate::config::ListingExpiryConfig;
use crate::engine::{AuthorizationContext, EngineError, SettlementEngine};
use crate::utils::utc_now;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

pub struct ListingExpiryScheduler {
    engine: SettlementEngine,
    config: ListingExpiryConfig,
}

impl ListingExpiryScheduler {
    pub fn new(engine: SettlementEngine, config: ListingExpiryConfig) -> Self {
        Self { engine, config }
    }

    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            ttl_secs = self.config.ttl.as_secs(),
            interval_secs = self.config.sweep_interval.as_secs(),
            "ListingExpiryScheduler started"
        );

        let mut ticker = tokio::time::interval(self.config.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("ListingExpiryScheduler received shutdown signal");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    match self.sweep().await {
                        Ok(0) => debug!("No stale listings"),
                        Ok(expired) => info!(expired, "Expired stale listings"),
                        Err(e) => error!(error = %e, "Listing expiry sweep failed"),
                    }
                }
            }
        }

        info!("ListingExpiryScheduler shutdown complete");
    }

    /// Run one sweep now. Returns how many listings were expired.
    pub async fn sweep(&self) -> Result<usize, EngineError> {
        let ttl = time::Duration::try_from(self.config.ttl).unwrap_or(time::Duration::MAX);
        let Some(cutoff) = utc_now().checked_sub(ttl) else {
            return Ok(0);
        };
        self.engine
            .listings()
            .expire_stale(&AuthorizationContext::system(), cutoff, self.config.batch_size)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::Harness;
    use crate::entities::ListingStatus;
    use cardex_sdk::objects::{CreateListingRequest, NotificationKind};
    use rust_decimal_macros::dec;
    use std::time::Duration;
    use uuid::Uuid;

    fn request() -> CreateListingRequest {
        CreateListingRequest {
            card_name: "Google Play".to_string(),
            amount: dec!(25),
            price: dec!(21),
            currency: "EUR".to_string(),
            country: None,
            format: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn sweep_expires_only_listings_past_ttl() {
        let mut h = Harness::new();
        let seller = AuthorizationContext::user(Uuid::now_v7());
        let listing = h.engine.listings().create(&seller, request()).await.unwrap();
        h.drain_kinds();

        let patient = ListingExpiryScheduler::new(
            h.engine.clone(),
            ListingExpiryConfig::new(Duration::from_secs(3600), Duration::from_secs(60)),
        );
        assert_eq!(patient.sweep().await.unwrap(), 0);

        std::thread::sleep(Duration::from_millis(5));
        let eager = ListingExpiryScheduler::new(
            h.engine.clone(),
            ListingExpiryConfig::new(Duration::ZERO, Duration::from_secs(60)),
        );
        assert_eq!(eager.sweep().await.unwrap(), 1);

        let stored = h.engine.listings().get(listing.listing_id).await.unwrap();
        assert_eq!(stored.status, ListingStatus::Expired);
        assert_eq!(h.drain_kinds(), vec![NotificationKind::ListingExpired]);

        // Already expired listings are not touched again.
        assert_eq!(eager.sweep().await.unwrap(), 0);
        assert!(h.drain_kinds().is_empty());
    }

    #[tokio::test]
    async fn huge_ttl_is_a_no_op() {
        let h = Harness::new();
        let scheduler = ListingExpiryScheduler::new(
            h.engine.clone(),
            ListingExpiryConfig::new(Duration::MAX, Duration::from_secs(60)),
        );
        assert_eq!(scheduler.sweep().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn stops_on_shutdown() {
        let h = Harness::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let scheduler = ListingExpiryScheduler::new(
            h.engine.clone(),
            ListingExpiryConfig::new(Duration::from_secs(3600), Duration::from_secs(1)),
        );
        let handle = tokio::spawn(scheduler.run(shutdown_rx));
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
