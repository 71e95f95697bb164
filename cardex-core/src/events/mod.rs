//! Settlement events.
//!
//! Every committed status change (record creation included) produces one
//! [`SettlementEvent`]. The [`EventPublisher`] hands it to two consumers:
//!
//! 1. the `NotificationDispatcher` queue (mpsc), which delivers it to each
//!    affected party;
//! 2. the live feed (broadcast), which backs the user WebSocket stream.
//!
//! Publishing never fails the operation that produced the event.

pub mod channels;
pub mod types;

pub use channels::{
    DEFAULT_CHANNEL_BUFFER, EventPublisher, FEED_BUFFER, SettlementEventReceiver,
    SettlementEventSender, settlement_event_channel,
};
pub use types::SettlementEvent;
