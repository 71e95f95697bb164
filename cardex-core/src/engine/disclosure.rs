use super::auth::AuthorizationContext;
use super::error::EngineError;
use crate::entities::trade::Trade;
use crate::entities::transaction::CardTransaction;
use crate::entities::{Direction, TradeStatus, TransactionStatus};
use uuid::Uuid;

/// A record that may carry a plaintext redemption code.
pub trait Disclosable {
    const ENTITY: &'static str;

    fn record_id(&self) -> Uuid;
    fn code(&self) -> Option<&str>;
    fn clear_code(&mut self);
    /// Whether a non-admin user may see the code.
    fn reveals_to(&self, user_id: Uuid) -> bool;
}

impl Disclosable for CardTransaction {
    const ENTITY: &'static str = "transaction";

    fn record_id(&self) -> Uuid {
        self.transaction_id
    }

    fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    fn clear_code(&mut self) {
        self.code = None;
    }

    /// Only the buyer of a completed buy order. Sellers supplied the code
    /// themselves and never get it back.
    fn reveals_to(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
            && self.status == TransactionStatus::Completed
            && self.direction == Direction::Buy
    }
}

impl Disclosable for Trade {
    const ENTITY: &'static str = "trade";

    fn record_id(&self) -> Uuid {
        self.trade_id
    }

    fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    fn clear_code(&mut self) {
        self.code = None;
    }

    fn reveals_to(&self, user_id: Uuid) -> bool {
        self.buyer_id == user_id && self.status == TradeStatus::Completed
    }
}

/// Decides who may see a redemption code. Admins always may.
pub struct CodeDisclosurePolicy;

impl CodeDisclosurePolicy {
    pub fn can_reveal<T: Disclosable>(ctx: &AuthorizationContext, record: &T) -> bool {
        ctx.is_admin() || record.reveals_to(ctx.actor())
    }

    /// Strip the code unless the caller may see it.
    pub fn redact<T: Disclosable>(ctx: &AuthorizationContext, mut record: T) -> T {
        if !Self::can_reveal(ctx, &record) {
            record.clear_code();
        }
        record
    }

    pub fn read_code<T: Disclosable>(
        ctx: &AuthorizationContext,
        record: &T,
    ) -> Result<String, EngineError> {
        if !Self::can_reveal(ctx, record) {
            return Err(EngineError::Forbidden("code is not disclosable to this caller"));
        }
        record
            .code()
            .map(str::to_owned)
            .ok_or(EngineError::MissingCode {
                entity: T::ENTITY,
                id: record.record_id(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::utc_now;
    use compact_str::CompactString;
    use rust_decimal_macros::dec;

    fn transaction(owner: Uuid, direction: Direction, status: TransactionStatus) -> CardTransaction {
        CardTransaction {
            transaction_id: Uuid::now_v7(),
            user_id: owner,
            direction,
            card_id: Uuid::now_v7(),
            card_name: "iTunes".to_string(),
            amount: dec!(100),
            quantity: 1,
            quoted_price: dec!(85),
            country: None,
            status,
            code: Some("SECRET-1".to_string()),
            evidence_ref: None,
            payment_method: None,
            payment_details: None,
            created_at: utc_now(),
            updated_at: utc_now(),
        }
    }

    fn trade(buyer: Uuid, seller: Uuid, status: TradeStatus) -> Trade {
        Trade {
            trade_id: Uuid::now_v7(),
            listing_id: Uuid::now_v7(),
            buyer_id: buyer,
            seller_id: seller,
            amount: dec!(50),
            price: dec!(45),
            currency: CompactString::from("USD"),
            status,
            payment_method: None,
            payment_proof_ref: None,
            code: Some("SECRET-2".to_string()),
            notes: None,
            created_at: utc_now(),
            updated_at: utc_now(),
        }
    }

    #[test]
    fn transaction_code_goes_only_to_the_buyer_after_completion() {
        let owner = Uuid::now_v7();
        let ctx = AuthorizationContext::user(owner);

        let completed_buy = transaction(owner, Direction::Buy, TransactionStatus::Completed);
        assert!(CodeDisclosurePolicy::can_reveal(&ctx, &completed_buy));

        let pending_buy = transaction(owner, Direction::Buy, TransactionStatus::Pending);
        assert!(!CodeDisclosurePolicy::can_reveal(&ctx, &pending_buy));

        let completed_sell = transaction(owner, Direction::Sell, TransactionStatus::Completed);
        assert!(!CodeDisclosurePolicy::can_reveal(&ctx, &completed_sell));

        let stranger = AuthorizationContext::user(Uuid::now_v7());
        assert!(!CodeDisclosurePolicy::can_reveal(&stranger, &completed_buy));
    }

    #[test]
    fn trade_code_goes_only_to_the_buyer_after_completion() {
        let (buyer, seller) = (Uuid::now_v7(), Uuid::now_v7());
        let completed = trade(buyer, seller, TradeStatus::Completed);

        assert!(CodeDisclosurePolicy::can_reveal(&AuthorizationContext::user(buyer), &completed));
        assert!(!CodeDisclosurePolicy::can_reveal(&AuthorizationContext::user(seller), &completed));

        let paid = trade(buyer, seller, TradeStatus::Paid);
        assert!(!CodeDisclosurePolicy::can_reveal(&AuthorizationContext::user(buyer), &paid));
    }

    #[test]
    fn admins_always_see_codes() {
        let admin = AuthorizationContext::admin(Uuid::now_v7());
        let pending_sell = transaction(Uuid::now_v7(), Direction::Sell, TransactionStatus::Pending);
        assert_eq!(
            CodeDisclosurePolicy::read_code(&admin, &pending_sell).unwrap(),
            "SECRET-1"
        );
        let disputed = trade(Uuid::now_v7(), Uuid::now_v7(), TradeStatus::Disputed);
        assert!(CodeDisclosurePolicy::can_reveal(&admin, &disputed));
    }

    #[test]
    fn background_jobs_never_see_codes() {
        let completed = trade(Uuid::now_v7(), Uuid::now_v7(), TradeStatus::Completed);
        assert!(!CodeDisclosurePolicy::can_reveal(&AuthorizationContext::system(), &completed));
    }

    #[test]
    fn redaction_strips_undisclosable_codes() {
        let seller = Uuid::now_v7();
        let ctx = AuthorizationContext::user(seller);
        let sell = transaction(seller, Direction::Sell, TransactionStatus::Pending);

        assert_eq!(CodeDisclosurePolicy::redact(&ctx, sell.clone()).code, None);
        assert!(matches!(
            CodeDisclosurePolicy::read_code(&ctx, &sell),
            Err(EngineError::Forbidden(_))
        ));
    }

    #[test]
    fn reading_an_absent_code_is_missing_code() {
        let owner = Uuid::now_v7();
        let mut record = transaction(owner, Direction::Buy, TransactionStatus::Completed);
        record.code = None;
        assert!(matches!(
            CodeDisclosurePolicy::read_code(&AuthorizationContext::user(owner), &record),
            Err(EngineError::MissingCode { entity: "transaction", id }) if id == record.transaction_id
        ));
    }

    #[test]
    fn missing_trade_code_names_the_trade() {
        let buyer = Uuid::now_v7();
        let mut record = trade(buyer, Uuid::now_v7(), TradeStatus::Completed);
        record.code = None;
        let err = CodeDisclosurePolicy::read_code(&AuthorizationContext::user(buyer), &record)
            .unwrap_err();
        assert!(
            matches!(err, EngineError::MissingCode { entity: "trade", id } if id == record.trade_id)
        );
        assert_eq!(
            err.to_string(),
            format!("trade {} has no redemption code attached", record.trade_id)
        );
    }
}
