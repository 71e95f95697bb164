//! Event channel factories and the publisher handle.

use super::types::SettlementEvent;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

/// Buffer size of the notification queue.
///
/// Enough to absorb bursts while keeping memory bounded.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Buffer size of the live feed. Slow subscribers skip ahead past this.
pub const FEED_BUFFER: usize = 1024;

/// Sender handle for the notification queue.
pub type SettlementEventSender = mpsc::Sender<SettlementEvent>;
/// Receiver handle for the notification queue.
pub type SettlementEventReceiver = mpsc::Receiver<SettlementEvent>;

/// Create the notification queue.
pub fn settlement_event_channel() -> (SettlementEventSender, SettlementEventReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Fans committed events out to the notification queue and the live feed.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    notify: SettlementEventSender,
    feed: broadcast::Sender<SettlementEvent>,
}

impl EventPublisher {
    pub fn new(notify: SettlementEventSender) -> Self {
        let (feed, _) = broadcast::channel(FEED_BUFFER);
        Self { notify, feed }
    }

    /// Best effort. A full or closed queue is logged and the event dropped;
    /// the state change it describes is already committed.
    pub fn publish(&self, event: SettlementEvent) {
        debug!(event_id = %event.event_id, kind = %event.kind, "Publishing settlement event");

        // No live subscribers is the normal case.
        let _ = self.feed.send(event.clone());

        match self.notify.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(
                    event_id = %event.event_id,
                    kind = %event.kind,
                    "Notification queue full, dropping event"
                );
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                warn!(
                    event_id = %event.event_id,
                    kind = %event.kind,
                    "Notification queue closed, dropping event"
                );
            }
        }
    }

    /// Subscribe to the live feed.
    pub fn subscribe(&self) -> broadcast::Receiver<SettlementEvent> {
        self.feed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardex_sdk::objects::{NotificationKind, NotificationSubject};
    use uuid::Uuid;

    fn sample_event() -> SettlementEvent {
        SettlementEvent::new(
            NotificationKind::ListingCreated,
            NotificationSubject::Listing(Uuid::now_v7()),
            "active",
            [Uuid::now_v7()],
        )
    }

    #[tokio::test]
    async fn publish_reaches_queue_and_feed() {
        let (tx, mut rx) = settlement_event_channel();
        let publisher = EventPublisher::new(tx);
        let mut feed = publisher.subscribe();

        let event = sample_event();
        publisher.publish(event.clone());

        assert_eq!(rx.recv().await, Some(event.clone()));
        assert_eq!(feed.recv().await.unwrap(), event);
    }

    #[test]
    fn publish_survives_a_closed_queue() {
        let (tx, rx) = settlement_event_channel();
        drop(rx);
        let publisher = EventPublisher::new(tx);
        publisher.publish(sample_event());
    }

    #[test]
    fn publish_survives_a_full_queue() {
        let (tx, _rx) = mpsc::channel(1);
        let publisher = EventPublisher::new(tx);
        publisher.publish(sample_event());
        publisher.publish(sample_event());
    }
}
