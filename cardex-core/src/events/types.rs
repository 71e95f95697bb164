use crate::entities::listing::Listing;
use crate::entities::trade::Trade;
use crate::entities::transaction::CardTransaction;
use cardex_sdk::objects::{NotificationKind, NotificationPayload, NotificationSubject};
use compact_str::{CompactString, ToCompactString};
use smallvec::SmallVec;
use time::OffsetDateTime;
use uuid::Uuid;

/// A committed status change and the users it concerns.
///
/// Events carry identifiers and the new status, not full records. Consumers
/// that need more re-read through the engine, where disclosure rules apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementEvent {
    pub event_id: Uuid,
    pub kind: NotificationKind,
    pub subject: NotificationSubject,
    pub status: CompactString,
    pub recipients: SmallVec<[Uuid; 2]>,
    pub occurred_at: OffsetDateTime,
}

impl SettlementEvent {
    pub fn new(
        kind: NotificationKind,
        subject: NotificationSubject,
        status: impl std::fmt::Display,
        recipients: impl IntoIterator<Item = Uuid>,
    ) -> Self {
        let mut unique: SmallVec<[Uuid; 2]> = SmallVec::new();
        for recipient in recipients {
            if !unique.contains(&recipient) {
                unique.push(recipient);
            }
        }
        Self {
            event_id: Uuid::now_v7(),
            kind,
            subject,
            status: status.to_compact_string(),
            recipients: unique,
            occurred_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn for_transaction(kind: NotificationKind, record: &CardTransaction) -> Self {
        Self::new(
            kind,
            NotificationSubject::Transaction(record.transaction_id),
            record.status,
            [record.user_id],
        )
    }

    pub fn for_listing(kind: NotificationKind, listing: &Listing) -> Self {
        Self::new(
            kind,
            NotificationSubject::Listing(listing.listing_id),
            listing.status,
            [listing.seller_id],
        )
    }

    pub fn for_trade(kind: NotificationKind, trade: &Trade) -> Self {
        Self::new(
            kind,
            NotificationSubject::Trade(trade.trade_id),
            trade.status,
            [trade.buyer_id, trade.seller_id],
        )
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        self.recipients.contains(&user_id)
    }

    /// The wire form delivered to one recipient.
    pub fn payload_for(&self, recipient: Uuid) -> NotificationPayload {
        NotificationPayload {
            event_id: self.event_id,
            kind: self.kind,
            recipient,
            subject: self.subject,
            status: self.status.to_string(),
            timestamp: self.occurred_at.unix_timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipients_are_deduplicated() {
        let user = Uuid::now_v7();
        let event = SettlementEvent::new(
            NotificationKind::TradePaid,
            NotificationSubject::Trade(Uuid::now_v7()),
            "paid",
            [user, user],
        );
        assert_eq!(event.recipients.as_slice(), &[user]);
        assert!(event.involves(user));
        assert!(!event.involves(Uuid::now_v7()));
    }

    #[test]
    fn payload_is_addressed_to_one_recipient() {
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let subject = NotificationSubject::Trade(Uuid::now_v7());
        let event = SettlementEvent::new(NotificationKind::TradeDisputed, subject, "disputed", [a, b]);

        let payload = event.payload_for(b);
        assert_eq!(payload.recipient, b);
        assert_eq!(payload.subject, subject);
        assert_eq!(payload.status, "disputed");
        assert_eq!(payload.event_id, event.event_id);
    }
}
