use super::auth::AuthorizationContext;
use super::disclosure::CodeDisclosurePolicy;
use super::error::EngineError;
use super::input;
use crate::entities::listing::Listing;
use crate::entities::trade::{Trade, TradeFilter};
use crate::entities::{ListingStatus, Page, TradeStatus};
use crate::events::{EventPublisher, SettlementEvent};
use crate::store::SettlementStore;
use crate::utils::utc_now;
use cardex_sdk::objects::admin::DisputeResolution;
use cardex_sdk::objects::{InitiateTradeRequest, NotificationKind};
use tracing::info;
use uuid::Uuid;

/// Trades against listings.
///
/// Buyers open trades and submit payment proof; everything after that is an
/// arbiter decision. A trade's code is only ever set by the arbiter, when the
/// trade completes.
pub struct TradeCoordinator<'a> {
    store: &'a dyn SettlementStore,
    events: &'a EventPublisher,
}

/// One arbiter decision on a trade.
struct Ruling<'r> {
    action: &'static str,
    from: &'r [TradeStatus],
    to: TradeStatus,
    code: Option<String>,
    notes: Option<String>,
    kind: NotificationKind,
}

impl<'a> TradeCoordinator<'a> {
    pub(super) fn new(store: &'a dyn SettlementStore, events: &'a EventPublisher) -> Self {
        Self { store, events }
    }

    /// Open a pending trade and mark the listing sold, atomically. Of any
    /// number of concurrent calls on one listing, exactly one succeeds and the
    /// rest get `Conflict`.
    pub async fn initiate(
        &self,
        ctx: &AuthorizationContext,
        listing_id: Uuid,
        request: InitiateTradeRequest,
    ) -> Result<Trade, EngineError> {
        let buyer_id = ctx.acting_user()?;
        let payment_method =
            input::optional_text("payment_method", request.payment_method.as_deref())?;

        let (trade, listing) = self
            .store
            .claim_listing(listing_id, &|listing: &Listing| {
                if !listing.status.can_become(ListingStatus::Sold) {
                    return Err(EngineError::Conflict(format!(
                        "listing {} is {}",
                        listing.listing_id, listing.status
                    )));
                }
                if listing.seller_id == buyer_id {
                    return Err(EngineError::Forbidden("sellers cannot buy their own listing"));
                }
                let now = utc_now();
                Ok(Trade {
                    trade_id: Uuid::now_v7(),
                    listing_id: listing.listing_id,
                    buyer_id,
                    seller_id: listing.seller_id,
                    amount: listing.amount,
                    price: listing.price,
                    currency: listing.currency.clone(),
                    status: TradeStatus::Pending,
                    payment_method: payment_method.clone(),
                    payment_proof_ref: None,
                    code: None,
                    notes: None,
                    created_at: now,
                    updated_at: now,
                })
            })
            .await?;

        info!(
            trade_id = %trade.trade_id,
            listing_id = %trade.listing_id,
            buyer_id = %trade.buyer_id,
            seller_id = %trade.seller_id,
            "Trade initiated"
        );
        self.events.publish(SettlementEvent::for_trade(
            NotificationKind::TradeInitiated,
            &trade,
        ));
        self.events.publish(SettlementEvent::for_listing(
            NotificationKind::ListingSold,
            &listing,
        ));
        Ok(CodeDisclosurePolicy::redact(ctx, trade))
    }

    /// pending → paid, by the trade's buyer only.
    pub async fn submit_payment_proof(
        &self,
        ctx: &AuthorizationContext,
        trade_id: Uuid,
        proof_ref: &str,
    ) -> Result<Trade, EngineError> {
        let actor = ctx.acting_user()?;
        let proof_ref = input::required_text("proof_ref", proof_ref)?;
        let transition = self
            .store
            .modify_trade(trade_id, &|trade: &mut Trade| {
                if trade.buyer_id != actor {
                    return Err(EngineError::Forbidden("only the buyer may submit payment proof"));
                }
                if trade.status != TradeStatus::Pending
                    || !trade.status.can_become(TradeStatus::Paid)
                {
                    return Err(EngineError::invalid_transition(
                        "trade",
                        "submit payment proof for",
                        trade.status,
                    ));
                }
                trade.status = TradeStatus::Paid;
                trade.payment_proof_ref = Some(proof_ref.clone());
                Ok(())
            })
            .await?;

        let trade = transition.into_current();
        info!(trade_id = %trade.trade_id, "Payment proof submitted");
        self.events
            .publish(SettlementEvent::for_trade(NotificationKind::TradePaid, &trade));
        Ok(CodeDisclosurePolicy::redact(ctx, trade))
    }

    /// paid → completed, attaching the code the buyer receives.
    pub async fn complete(
        &self,
        ctx: &AuthorizationContext,
        trade_id: Uuid,
        code: &str,
        notes: Option<&str>,
    ) -> Result<Trade, EngineError> {
        self.rule(
            ctx,
            trade_id,
            Ruling {
                action: "complete",
                from: &[TradeStatus::Paid],
                to: TradeStatus::Completed,
                code: Some(input::code(code)?),
                notes: input::optional_text("notes", notes)?,
                kind: NotificationKind::TradeCompleted,
            },
        )
        .await
    }

    /// {pending, paid} → disputed.
    pub async fn dispute(
        &self,
        ctx: &AuthorizationContext,
        trade_id: Uuid,
        notes: Option<&str>,
    ) -> Result<Trade, EngineError> {
        self.rule(
            ctx,
            trade_id,
            Ruling {
                action: "dispute",
                from: &[TradeStatus::Pending, TradeStatus::Paid],
                to: TradeStatus::Disputed,
                code: None,
                notes: input::optional_text("notes", notes)?,
                kind: NotificationKind::TradeDisputed,
            },
        )
        .await
    }

    /// {pending, paid, disputed} → cancelled. The listing stays sold.
    pub async fn cancel(
        &self,
        ctx: &AuthorizationContext,
        trade_id: Uuid,
        notes: Option<&str>,
    ) -> Result<Trade, EngineError> {
        self.rule(
            ctx,
            trade_id,
            Ruling {
                action: "cancel",
                from: &[TradeStatus::Pending, TradeStatus::Paid, TradeStatus::Disputed],
                to: TradeStatus::Cancelled,
                code: None,
                notes: input::optional_text("notes", notes)?,
                kind: NotificationKind::TradeCancelled,
            },
        )
        .await
    }

    /// disputed → completed (release the code) or cancelled (refund).
    pub async fn resolve_dispute(
        &self,
        ctx: &AuthorizationContext,
        trade_id: Uuid,
        resolution: DisputeResolution,
        notes: Option<&str>,
    ) -> Result<Trade, EngineError> {
        let notes = input::optional_text("notes", notes)?;
        let ruling = match resolution {
            DisputeResolution::Release { code } => Ruling {
                action: "release",
                from: &[TradeStatus::Disputed],
                to: TradeStatus::Completed,
                code: Some(input::code(&code)?),
                notes,
                kind: NotificationKind::TradeCompleted,
            },
            DisputeResolution::Refund => Ruling {
                action: "refund",
                from: &[TradeStatus::Disputed],
                to: TradeStatus::Cancelled,
                code: None,
                notes,
                kind: NotificationKind::TradeCancelled,
            },
        };
        self.rule(ctx, trade_id, ruling).await
    }

    async fn rule(
        &self,
        ctx: &AuthorizationContext,
        trade_id: Uuid,
        ruling: Ruling<'_>,
    ) -> Result<Trade, EngineError> {
        ctx.require_admin()?;
        let transition = self
            .store
            .modify_trade(trade_id, &|trade: &mut Trade| {
                if !ruling.from.contains(&trade.status) || !trade.status.can_become(ruling.to) {
                    return Err(EngineError::invalid_transition(
                        "trade",
                        ruling.action,
                        trade.status,
                    ));
                }
                trade.status = ruling.to;
                if let Some(code) = &ruling.code {
                    trade.code = Some(code.clone());
                }
                if let Some(notes) = &ruling.notes {
                    trade.notes = Some(notes.clone());
                }
                Ok(())
            })
            .await?;

        let previous = transition.previous.status;
        let trade = transition.into_current();
        info!(
            trade_id = %trade.trade_id,
            admin_id = %ctx.actor(),
            action = ruling.action,
            from = %previous,
            to = %trade.status,
            "Trade ruled"
        );
        self.events
            .publish(SettlementEvent::for_trade(ruling.kind, &trade));
        Ok(CodeDisclosurePolicy::redact(ctx, trade))
    }

    /// Parties and admins only.
    pub async fn get(&self, ctx: &AuthorizationContext, trade_id: Uuid) -> Result<Trade, EngineError> {
        let trade = self.load_visible(ctx, trade_id).await?;
        Ok(CodeDisclosurePolicy::redact(ctx, trade))
    }

    /// Users only see trades they are a party to.
    pub async fn list(
        &self,
        ctx: &AuthorizationContext,
        mut filter: TradeFilter,
        page: Page,
    ) -> Result<Vec<Trade>, EngineError> {
        if !ctx.is_privileged() {
            filter.party_id = Some(ctx.actor());
        }
        let trades = self.store.list_trades(&filter, page).await?;
        Ok(trades
            .into_iter()
            .map(|trade| CodeDisclosurePolicy::redact(ctx, trade))
            .collect())
    }

    pub async fn read_code(
        &self,
        ctx: &AuthorizationContext,
        trade_id: Uuid,
    ) -> Result<String, EngineError> {
        let trade = self.load_visible(ctx, trade_id).await?;
        CodeDisclosurePolicy::read_code(ctx, &trade)
    }

    async fn load_visible(
        &self,
        ctx: &AuthorizationContext,
        trade_id: Uuid,
    ) -> Result<Trade, EngineError> {
        let trade = self
            .store
            .find_trade(trade_id)
            .await?
            .ok_or(EngineError::NotFound {
                entity: "trade",
                id: trade_id,
            })?;
        if !(ctx.is_privileged() || trade.is_party(ctx.actor())) {
            return Err(EngineError::Forbidden("not a party to this trade"));
        }
        Ok(trade)
    }
}
