// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Change-notification bus for conversation events.
//!
//! Consumers pull current state through [`crate::ConversationStore`] and use
//! these events only as a wake-up signal. Subscriptions are cancellable
//! handles: dropping an [`EventSubscription`] unsubscribes it.

use tokio::sync::broadcast;

use crate::types::{ConversationStatus, MessageRole};

/// Default buffer size for event subscribers. Slow subscribers that fall
/// further behind than this lose the oldest events, never block publishers.
const DEFAULT_CAPACITY: usize = 256;

/// An event emitted by the conversation engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationEvent {
    /// A new conversation was bootstrapped.
    Created { conversation_id: String },
    /// A conversation's status changed.
    StatusChanged {
        conversation_id: String,
        from: ConversationStatus,
        to: ConversationStatus,
    },
    /// A message was appended to a conversation.
    MessageAppended {
        conversation_id: String,
        role: MessageRole,
    },
    /// A sweep pass completed.
    Swept { ended: usize, deactivated: usize },
}

/// Fan-out publisher for [`ConversationEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ConversationEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Publishing with no subscribers is a no-op, not an error.
    pub fn publish(&self, event: ConversationEvent) {
        let _ = self.tx.send(event);
    }

    /// Subscribe to events from this point forward.
    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A live subscription to the event bus. Drop it to unsubscribe.
pub struct EventSubscription {
    rx: broadcast::Receiver<ConversationEvent>,
}

impl EventSubscription {
    /// Receive the next event.
    ///
    /// Returns `None` when the bus has been dropped. A subscriber that
    /// lagged past the buffer skips ahead to the oldest retained event.
    pub async fn recv(&mut self) -> Option<ConversationEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_events() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();

        bus.publish(ConversationEvent::Created {
            conversation_id: "c-1".into(),
        });

        let event = sub.recv().await.unwrap();
        assert_eq!(
            event,
            ConversationEvent::Created {
                conversation_id: "c-1".into()
            }
        );
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_noop() {
        let bus = EventBus::new();
        // Must not panic or error.
        bus.publish(ConversationEvent::Swept {
            ended: 3,
            deactivated: 1,
        });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn dropping_subscription_unsubscribes() {
        let bus = EventBus::new();
        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn recv_returns_none_when_bus_dropped() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        drop(bus);
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn multiple_subscribers_all_receive() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(ConversationEvent::StatusChanged {
            conversation_id: "c-2".into(),
            from: ConversationStatus::Ai,
            to: ConversationStatus::Pending,
        });

        assert!(a.recv().await.is_some());
        assert!(b.recv().await.is_some());
    }
}
