//! Event fan-out to registered subscribers.

use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;

use crate::resilience::journal::BreakerEvent;

/// Receives every event a breaker journals.
///
/// Called while the breaker holds its state lock: implementations must not
/// block and must not call back into the breaker.
pub trait EventSubscriber: Send + Sync {
    fn on_event(&self, breaker: &str, event: &BreakerEvent);
}

/// An event tagged with the breaker that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedEvent {
    pub breaker: String,
    pub event: BreakerEvent,
}

/// Forwards events into an unbounded channel for async consumers.
#[derive(Debug, Clone)]
pub struct ChannelSubscriber {
    tx: mpsc::UnboundedSender<PublishedEvent>,
}

impl ChannelSubscriber {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PublishedEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSubscriber for ChannelSubscriber {
    fn on_event(&self, breaker: &str, event: &BreakerEvent) {
        // Receiver gone means nobody is listening anymore.
        let _ = self.tx.send(PublishedEvent {
            breaker: breaker.to_string(),
            event: event.clone(),
        });
    }
}

/// Holds the subscriber list for one breaker.
#[derive(Default)]
pub struct Publisher {
    subscribers: RwLock<Vec<Arc<dyn EventSubscriber>>>,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, subscriber: Arc<dyn EventSubscriber>) {
        self.subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(subscriber);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn publish(&self, breaker: &str, event: &BreakerEvent) {
        let subscribers = self
            .subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for subscriber in subscribers.iter() {
            subscriber.on_event(breaker, event);
        }
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_subscriber_receives_in_order() {
        let publisher = Publisher::new();
        let (subscriber, mut rx) = ChannelSubscriber::new();
        publisher.subscribe(Arc::new(subscriber));

        for n in 0..3 {
            publisher.publish(
                "ai-worker",
                &BreakerEvent::CallRejected {
                    reason: "open".into(),
                    timestamp: n,
                },
            );
        }

        assert_eq!(publisher.subscriber_count(), 1);
        for n in 0..3 {
            let published = rx.try_recv().unwrap();
            assert_eq!(published.breaker, "ai-worker");
            assert_eq!(published.event.timestamp(), n);
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let publisher = Publisher::new();
        let (subscriber, rx) = ChannelSubscriber::new();
        publisher.subscribe(Arc::new(subscriber));
        drop(rx);

        publisher.publish(
            "ai-worker",
            &BreakerEvent::ManualReset {
                reason: "ops".into(),
                timestamp: 1,
            },
        );
    }
}
