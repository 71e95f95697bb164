//! Background processors.
//!
//! - `NotificationDispatcher`: receives `SettlementEvent`s and delivers one
//!   notification per affected party, retrying in the background
//! - `ListingExpiryScheduler`: periodically expires listings older than the
//!   configured TTL

pub mod listing_expiry;
pub mod notification_dispatcher;

pub use listing_expiry::ListingExpiryScheduler;
pub use notification_dispatcher::{
    DispatchError, LogSink, NotificationDispatcher, NotificationSink, WebhookSink,
    calculate_retry_delay,
};
