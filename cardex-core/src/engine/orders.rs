use super::auth::AuthorizationContext;
use super::disclosure::CodeDisclosurePolicy;
use super::error::EngineError;
use super::input;
use super::rates::{RateResolver, ResolvedRate, price_for};
use crate::entities::transaction::{CardTransaction, TransactionFilter};
use crate::entities::{Direction, Page, TransactionStatus};
use crate::events::{EventPublisher, SettlementEvent};
use crate::store::SettlementStore;
use crate::utils::utc_now;
use cardex_sdk::objects::{CreateBuyOrderRequest, CreateSellOrderRequest, NotificationKind};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

/// House-mediated orders.
///
/// ```text
/// pending -(approve)-> completed
/// pending -(reject)--> cancelled
/// ```
pub struct OrderLedger<'a> {
    store: &'a dyn SettlementStore,
    events: &'a EventPublisher,
}

struct OrderTerms {
    resolved: ResolvedRate,
    quoted_price: Decimal,
}

impl<'a> OrderLedger<'a> {
    pub(super) fn new(store: &'a dyn SettlementStore, events: &'a EventPublisher) -> Self {
        Self { store, events }
    }

    async fn quote(
        &self,
        direction: Direction,
        card_id: Uuid,
        face_value: Decimal,
        quantity: i32,
        country: Option<&str>,
    ) -> Result<OrderTerms, EngineError> {
        input::money("face_value", face_value)?;
        if quantity <= 0 {
            return Err(EngineError::invalid_input("quantity must be positive"));
        }
        let resolved = RateResolver::new(self.store)
            .resolve(card_id, country)
            .await
            .map_err(|e| match e {
                EngineError::NotFound { id, .. } => {
                    EngineError::invalid_input(format!("card {id} is not available"))
                }
                other => other,
            })?;
        let quoted_price = price_for(direction, face_value, quantity, &resolved.rate)?;
        Ok(OrderTerms {
            resolved,
            quoted_price,
        })
    }

    fn pending_record(
        user_id: Uuid,
        direction: Direction,
        face_value: Decimal,
        quantity: i32,
        terms: OrderTerms,
    ) -> CardTransaction {
        let now = utc_now();
        CardTransaction {
            transaction_id: Uuid::now_v7(),
            user_id,
            direction,
            card_id: terms.resolved.card.card_id,
            card_name: terms.resolved.card.name,
            amount: face_value,
            quantity,
            quoted_price: terms.quoted_price,
            country: terms.resolved.country,
            status: TransactionStatus::Pending,
            code: None,
            evidence_ref: None,
            payment_method: None,
            payment_details: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn record_new(
        &self,
        ctx: &AuthorizationContext,
        record: CardTransaction,
    ) -> Result<CardTransaction, EngineError> {
        let stored = self.store.insert_transaction(record).await?;
        info!(
            transaction_id = %stored.transaction_id,
            user_id = %stored.user_id,
            direction = %stored.direction,
            amount = %stored.amount,
            quoted_price = %stored.quoted_price,
            "Order placed"
        );
        self.events.publish(SettlementEvent::for_transaction(
            NotificationKind::OrderPlaced,
            &stored,
        ));
        Ok(CodeDisclosurePolicy::redact(ctx, stored))
    }

    /// The user buys a card. `quoted_price` on the result is what they must
    /// pay; `amount` is the face value.
    pub async fn create_buy_order(
        &self,
        ctx: &AuthorizationContext,
        request: CreateBuyOrderRequest,
    ) -> Result<CardTransaction, EngineError> {
        let user_id = ctx.acting_user()?;
        let terms = self
            .quote(
                Direction::Buy,
                request.card_id,
                request.face_value,
                request.quantity,
                request.country.as_deref(),
            )
            .await?;
        let record = Self::pending_record(
            user_id,
            Direction::Buy,
            request.face_value,
            request.quantity,
            terms,
        );
        self.record_new(ctx, record).await
    }

    /// The user sells a card. The code is stored for the arbiter and is not
    /// returned to the seller.
    pub async fn create_sell_order(
        &self,
        ctx: &AuthorizationContext,
        request: CreateSellOrderRequest,
    ) -> Result<CardTransaction, EngineError> {
        let user_id = ctx.acting_user()?;
        let code = input::code(&request.code)?;
        let payment_method = input::required_text("payment_method", &request.payment_method)?;
        let payment_details = input::required_text("payment_details", &request.payment_details)?;
        let evidence_ref = input::optional_text("evidence_ref", request.evidence_ref.as_deref())?;

        let terms = self
            .quote(
                Direction::Sell,
                request.card_id,
                request.face_value,
                request.quantity,
                request.country.as_deref(),
            )
            .await?;
        let record = CardTransaction {
            code: Some(code),
            payment_method: Some(payment_method),
            payment_details: Some(payment_details),
            evidence_ref,
            ..Self::pending_record(
                user_id,
                Direction::Sell,
                request.face_value,
                request.quantity,
                terms,
            )
        };
        self.record_new(ctx, record).await
    }

    /// pending → completed. Buy orders need an attached code.
    pub async fn approve(
        &self,
        ctx: &AuthorizationContext,
        transaction_id: Uuid,
    ) -> Result<CardTransaction, EngineError> {
        ctx.require_admin()?;
        let transition = self
            .store
            .modify_transaction(transaction_id, &|record: &mut CardTransaction| {
                if !record.status.can_become(TransactionStatus::Completed) {
                    return Err(EngineError::invalid_transition(
                        "transaction",
                        "approve",
                        record.status,
                    ));
                }
                if record.direction == Direction::Buy && record.code.is_none() {
                    return Err(EngineError::MissingCode {
                        entity: "transaction",
                        id: record.transaction_id,
                    });
                }
                record.status = TransactionStatus::Completed;
                Ok(())
            })
            .await?;

        let record = transition.into_current();
        info!(
            transaction_id = %record.transaction_id,
            admin_id = %ctx.actor(),
            direction = %record.direction,
            "Order approved"
        );
        self.events.publish(SettlementEvent::for_transaction(
            NotificationKind::OrderCompleted,
            &record,
        ));
        Ok(CodeDisclosurePolicy::redact(ctx, record))
    }

    /// pending → cancelled.
    pub async fn reject(
        &self,
        ctx: &AuthorizationContext,
        transaction_id: Uuid,
    ) -> Result<CardTransaction, EngineError> {
        ctx.require_admin()?;
        let transition = self
            .store
            .modify_transaction(transaction_id, &|record: &mut CardTransaction| {
                if !record.status.can_become(TransactionStatus::Cancelled) {
                    return Err(EngineError::invalid_transition(
                        "transaction",
                        "reject",
                        record.status,
                    ));
                }
                record.status = TransactionStatus::Cancelled;
                Ok(())
            })
            .await?;

        let record = transition.into_current();
        info!(
            transaction_id = %record.transaction_id,
            admin_id = %ctx.actor(),
            "Order rejected"
        );
        self.events.publish(SettlementEvent::for_transaction(
            NotificationKind::OrderCancelled,
            &record,
        ));
        Ok(CodeDisclosurePolicy::redact(ctx, record))
    }

    /// Attach (or replace) the code of a non-terminal buy order. No status
    /// change, so no event.
    pub async fn attach_code(
        &self,
        ctx: &AuthorizationContext,
        transaction_id: Uuid,
        code: &str,
    ) -> Result<CardTransaction, EngineError> {
        ctx.require_admin()?;
        let code = input::code(code)?;
        let transition = self
            .store
            .modify_transaction(transaction_id, &|record: &mut CardTransaction| {
                if record.direction != Direction::Buy {
                    return Err(EngineError::invalid_input(
                        "codes can only be attached to buy orders",
                    ));
                }
                if record.status.is_terminal() {
                    return Err(EngineError::invalid_transition(
                        "transaction",
                        "attach a code to",
                        record.status,
                    ));
                }
                record.code = Some(code.clone());
                Ok(())
            })
            .await?;

        info!(
            transaction_id = %transaction_id,
            admin_id = %ctx.actor(),
            replaced = transition.previous.code.is_some(),
            "Code attached"
        );
        Ok(CodeDisclosurePolicy::redact(ctx, transition.into_current()))
    }

    pub async fn get(
        &self,
        ctx: &AuthorizationContext,
        transaction_id: Uuid,
    ) -> Result<CardTransaction, EngineError> {
        let record = self.load_visible(ctx, transaction_id).await?;
        Ok(CodeDisclosurePolicy::redact(ctx, record))
    }

    /// Users only ever see their own orders, whatever the filter says.
    pub async fn list(
        &self,
        ctx: &AuthorizationContext,
        mut filter: TransactionFilter,
        page: Page,
    ) -> Result<Vec<CardTransaction>, EngineError> {
        if !ctx.is_privileged() {
            filter.user_id = Some(ctx.actor());
        }
        let records = self.store.list_transactions(&filter, page).await?;
        Ok(records
            .into_iter()
            .map(|record| CodeDisclosurePolicy::redact(ctx, record))
            .collect())
    }

    pub async fn read_code(
        &self,
        ctx: &AuthorizationContext,
        transaction_id: Uuid,
    ) -> Result<String, EngineError> {
        let record = self.load_visible(ctx, transaction_id).await?;
        CodeDisclosurePolicy::read_code(ctx, &record)
    }

    async fn load_visible(
        &self,
        ctx: &AuthorizationContext,
        transaction_id: Uuid,
    ) -> Result<CardTransaction, EngineError> {
        let record = self
            .store
            .find_transaction(transaction_id)
            .await?
            .ok_or(EngineError::NotFound {
                entity: "transaction",
                id: transaction_id,
            })?;
        if !ctx.can_view(record.user_id) {
            return Err(EngineError::Forbidden("not the owner of this order"));
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::Harness;
    use rust_decimal_macros::dec;

    fn sell_request(card_id: Uuid, face_value: Decimal) -> CreateSellOrderRequest {
        CreateSellOrderRequest {
            card_id,
            face_value,
            quantity: 1,
            country: None,
            code: "GIFT-1234-5678".to_string(),
            payment_method: "bank_transfer".to_string(),
            payment_details: "ACME Bank 0012345678".to_string(),
            evidence_ref: Some("uploads/receipt.png".to_string()),
        }
    }

    fn buy_request(card_id: Uuid) -> CreateBuyOrderRequest {
        CreateBuyOrderRequest {
            card_id,
            face_value: dec!(100),
            quantity: 2,
            country: None,
        }
    }

    #[tokio::test]
    async fn face_values_finer_than_cents_are_rejected() {
        let mut h = Harness::new();
        let card = h.card(dec!(0.85), dec!(0.47)).await;
        h.drain_kinds();
        let buyer = AuthorizationContext::user(Uuid::now_v7());
        let orders = h.engine.orders();

        let mut request = buy_request(card);
        request.face_value = dec!(10.005);
        request.quantity = 1;
        assert!(matches!(
            orders.create_buy_order(&buyer, request).await,
            Err(EngineError::InvalidInput(_))
        ));

        let placed = orders
            .list(&buyer, TransactionFilter::default(), Page::default())
            .await
            .unwrap();
        assert!(placed.is_empty());
        assert!(h.drain_kinds().is_empty());
    }

    #[tokio::test]
    async fn sell_order_is_quoted_and_approved() {
        let mut h = Harness::new();
        let card = h.card(dec!(0.85), dec!(0.47)).await;
        let seller = AuthorizationContext::user(Uuid::now_v7());
        let orders = h.engine.orders();

        let placed = orders
            .create_sell_order(&seller, sell_request(card, dec!(100)))
            .await
            .unwrap();
        assert_eq!(placed.amount, dec!(100));
        assert_eq!(placed.quoted_price, dec!(47.00));
        assert_eq!(placed.status, TransactionStatus::Pending);
        assert_eq!(placed.code, None, "sellers never get their code back");

        let seen_by_admin = orders.get(&h.admin, placed.transaction_id).await.unwrap();
        assert_eq!(seen_by_admin.code.as_deref(), Some("GIFT-1234-5678"));

        let approved = orders.approve(&h.admin, placed.transaction_id).await.unwrap();
        assert_eq!(approved.status, TransactionStatus::Completed);

        let replay = orders.reject(&h.admin, placed.transaction_id).await.unwrap_err();
        assert_eq!(replay.current_status(), Some("completed"));

        assert_eq!(
            h.drain_kinds(),
            vec![NotificationKind::OrderPlaced, NotificationKind::OrderCompleted]
        );
    }

    #[tokio::test]
    async fn sell_order_can_be_rejected_once() {
        let mut h = Harness::new();
        let card = h.card(dec!(0.85), dec!(0.47)).await;
        let seller = AuthorizationContext::user(Uuid::now_v7());
        let orders = h.engine.orders();

        let placed = orders
            .create_sell_order(&seller, sell_request(card, dec!(100)))
            .await
            .unwrap();
        let rejected = orders.reject(&h.admin, placed.transaction_id).await.unwrap();
        assert_eq!(rejected.status, TransactionStatus::Cancelled);

        let again = orders.approve(&h.admin, placed.transaction_id).await.unwrap_err();
        assert!(matches!(
            again,
            EngineError::InvalidTransition { ref current, .. } if current == "cancelled"
        ));
        assert_eq!(
            h.drain_kinds(),
            vec![NotificationKind::OrderPlaced, NotificationKind::OrderCancelled]
        );
    }

    #[tokio::test]
    async fn sell_order_requires_code_and_payout_details() {
        let h = Harness::new();
        let card = h.card(dec!(0.85), dec!(0.47)).await;
        let seller = AuthorizationContext::user(Uuid::now_v7());

        let mut request = sell_request(card, dec!(100));
        request.code = "  ".to_string();
        let err = h.engine.orders().create_sell_order(&seller, request).await;
        assert!(matches!(err, Err(EngineError::InvalidInput(_))));

        let mut request = sell_request(card, dec!(100));
        request.payment_details = String::new();
        let err = h.engine.orders().create_sell_order(&seller, request).await;
        assert!(matches!(err, Err(EngineError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn buy_order_code_flow() {
        let h = Harness::new();
        let card = h.card(dec!(0.85), dec!(0.47)).await;
        let buyer = AuthorizationContext::user(Uuid::now_v7());
        let orders = h.engine.orders();

        let placed = orders.create_buy_order(&buyer, buy_request(card)).await.unwrap();
        assert_eq!(placed.quoted_price, dec!(170.00));
        assert_eq!(placed.amount, dec!(100));

        let err = orders.approve(&h.admin, placed.transaction_id).await.unwrap_err();
        assert!(matches!(err, EngineError::MissingCode { id, .. } if id == placed.transaction_id));
        let still = orders.get(&buyer, placed.transaction_id).await.unwrap();
        assert_eq!(still.status, TransactionStatus::Pending);

        orders
            .attach_code(&h.admin, placed.transaction_id, "OLD-CODE")
            .await
            .unwrap();
        let attached = orders
            .attach_code(&h.admin, placed.transaction_id, "AMZN-9999")
            .await
            .unwrap();
        assert_eq!(attached.code.as_deref(), Some("AMZN-9999"));

        let before = orders.read_code(&buyer, placed.transaction_id).await;
        assert!(matches!(before, Err(EngineError::Forbidden(_))));
        assert_eq!(orders.get(&buyer, placed.transaction_id).await.unwrap().code, None);

        orders.approve(&h.admin, placed.transaction_id).await.unwrap();
        assert_eq!(
            orders.read_code(&buyer, placed.transaction_id).await.unwrap(),
            "AMZN-9999"
        );
        assert_eq!(
            orders.get(&buyer, placed.transaction_id).await.unwrap().code.as_deref(),
            Some("AMZN-9999")
        );

        let late = orders
            .attach_code(&h.admin, placed.transaction_id, "NEW")
            .await
            .unwrap_err();
        assert!(matches!(late, EngineError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn codes_cannot_be_attached_to_sell_orders() {
        let h = Harness::new();
        let card = h.card(dec!(0.85), dec!(0.47)).await;
        let seller = AuthorizationContext::user(Uuid::now_v7());
        let placed = h
            .engine
            .orders()
            .create_sell_order(&seller, sell_request(card, dec!(25)))
            .await
            .unwrap();

        let err = h
            .engine
            .orders()
            .attach_code(&h.admin, placed.transaction_id, "X")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn arbiter_actions_are_forbidden_to_users() {
        let h = Harness::new();
        let card = h.card(dec!(0.85), dec!(0.47)).await;
        let buyer = AuthorizationContext::user(Uuid::now_v7());
        let placed = h
            .engine
            .orders()
            .create_buy_order(&buyer, buy_request(card))
            .await
            .unwrap();

        let orders = h.engine.orders();
        assert!(matches!(
            orders.approve(&buyer, placed.transaction_id).await,
            Err(EngineError::Forbidden(_))
        ));
        assert!(matches!(
            orders.reject(&buyer, placed.transaction_id).await,
            Err(EngineError::Forbidden(_))
        ));
        assert!(matches!(
            orders.attach_code(&buyer, placed.transaction_id, "X").await,
            Err(EngineError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn invalid_buy_orders_are_rejected() {
        let h = Harness::new();
        let card = h.card(dec!(0.85), dec!(0.47)).await;
        let buyer = AuthorizationContext::user(Uuid::now_v7());
        let orders = h.engine.orders();

        let mut zero_quantity = buy_request(card);
        zero_quantity.quantity = 0;
        assert!(matches!(
            orders.create_buy_order(&buyer, zero_quantity).await,
            Err(EngineError::InvalidInput(_))
        ));

        let unknown_card = buy_request(Uuid::now_v7());
        assert!(matches!(
            orders.create_buy_order(&buyer, unknown_card).await,
            Err(EngineError::InvalidInput(_))
        ));

        let mut bad_country = buy_request(card);
        bad_country.country = Some("Nigeria".to_string());
        assert!(matches!(
            orders.create_buy_order(&buyer, bad_country).await,
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn users_only_see_their_own_orders() {
        let h = Harness::new();
        let card = h.card(dec!(0.85), dec!(0.47)).await;
        let alice = AuthorizationContext::user(Uuid::now_v7());
        let bob = AuthorizationContext::user(Uuid::now_v7());
        let orders = h.engine.orders();

        let mine = orders.create_buy_order(&alice, buy_request(card)).await.unwrap();
        orders.create_buy_order(&bob, buy_request(card)).await.unwrap();

        let listed = orders
            .list(&alice, TransactionFilter::default(), Page::default())
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].transaction_id, mine.transaction_id);

        let all = orders
            .list(&h.admin, TransactionFilter::default(), Page::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        assert!(matches!(
            orders.get(&bob, mine.transaction_id).await,
            Err(EngineError::Forbidden(_))
        ));
    }
}
