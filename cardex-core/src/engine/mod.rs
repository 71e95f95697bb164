//! The settlement engine.
//!
//! [`SettlementEngine`] owns the store and the event publisher and hands out
//! one borrowed view per component:
//!
//! - [`RateResolver`]: effective rates and pricing, catalog administration
//! - [`OrderLedger`]: house-mediated orders
//! - [`ListingRegistry`]: peer-to-peer listings
//! - [`TradeCoordinator`]: trades against listings
//!
//! Every operation takes an [`AuthorizationContext`], checks the transition
//! table of the record it touches, and publishes one event per committed
//! status change. Every record it returns has already been redacted for the
//! caller by [`CodeDisclosurePolicy`].

mod auth;
mod disclosure;
mod error;
mod input;
mod listings;
mod orders;
mod rates;
mod trades;

pub use auth::{AuthorizationContext, Role};
pub use disclosure::{CodeDisclosurePolicy, Disclosable};
pub use error::EngineError;
pub use listings::ListingRegistry;
pub use orders::OrderLedger;
pub use rates::{Rate, RateResolver, ResolvedRate, price_for};
pub use trades::TradeCoordinator;

use crate::events::EventPublisher;
use crate::store::SettlementStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct SettlementEngine {
    store: Arc<dyn SettlementStore>,
    events: EventPublisher,
}

impl SettlementEngine {
    pub fn new(store: Arc<dyn SettlementStore>, events: EventPublisher) -> Self {
        Self { store, events }
    }

    pub fn rates(&self) -> RateResolver<'_> {
        RateResolver::new(self.store.as_ref())
    }

    pub fn orders(&self) -> OrderLedger<'_> {
        OrderLedger::new(self.store.as_ref(), &self.events)
    }

    pub fn listings(&self) -> ListingRegistry<'_> {
        ListingRegistry::new(self.store.as_ref(), &self.events)
    }

    pub fn trades(&self) -> TradeCoordinator<'_> {
        TradeCoordinator::new(self.store.as_ref(), &self.events)
    }

    pub fn events(&self) -> &EventPublisher {
        &self.events
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::events::{SettlementEventReceiver, settlement_event_channel};
    use crate::store::{CardUpsert, MemoryStore};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    pub struct Harness {
        pub engine: SettlementEngine,
        pub events: SettlementEventReceiver,
        pub admin: AuthorizationContext,
    }

    impl Harness {
        pub fn new() -> Self {
            let (tx, rx) = settlement_event_channel();
            Self {
                engine: SettlementEngine::new(Arc::new(MemoryStore::new()), EventPublisher::new(tx)),
                events: rx,
                admin: AuthorizationContext::admin(Uuid::now_v7()),
            }
        }

        pub async fn card(&self, buy_rate: Decimal, sell_rate: Decimal) -> Uuid {
            let card_id = Uuid::now_v7();
            self.engine
                .rates()
                .upsert_card(
                    &self.admin,
                    CardUpsert {
                        card_id,
                        name: "Amazon".to_string(),
                        active: true,
                        buy_rate,
                        sell_rate,
                    },
                )
                .await
                .unwrap();
            card_id
        }

        /// Kinds of every event published so far, oldest first.
        pub fn drain_kinds(&mut self) -> Vec<cardex_sdk::objects::NotificationKind> {
            let mut kinds = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                kinds.push(event.kind);
            }
            kinds
        }
    }
}
