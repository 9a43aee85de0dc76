//! Event persistence.
//!
//! A snapshot keeps the event's name, its accepted context type names, its
//! settings and the ids and states of tracked subscriptions. Listener
//! callbacks, statistics and held contexts are not persisted: a restored
//! subscription reports `NotListening` until it listens again.

use serde::{Deserialize, Serialize};

use crate::context::ContextType;
use crate::error::{ConfigError, Result};
use crate::event::{Event, EventBuilder};
use crate::subscription::SubscriptionState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSnapshot {
    pub name: String,
    /// Fully qualified context type names, primary first.
    pub contexts: Vec<String>,
    #[serde(default)]
    pub behavior_queue: bool,
    #[serde(default = "default_stats")]
    pub stats: bool,
    pub subscribers: Vec<SubscriptionSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    pub id: String,
    pub state: SubscriptionState,
}

fn default_stats() -> bool {
    true
}

impl EventSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl<R> Event<R> {
    /// Captures the persistable state of this event.
    pub fn snapshot(&self) -> EventSnapshot {
        EventSnapshot {
            name: self.name().to_string(),
            contexts: self.contexts().iter().map(|context| context.name().to_string()).collect(),
            behavior_queue: self.has_behavior_queue(),
            stats: self.stats().is_some(),
            subscribers: self
                .subscribers()
                .map(|subscription| SubscriptionSnapshot {
                    id: subscription.id().to_string(),
                    state: subscription.state(),
                })
                .collect(),
        }
    }

    /// Rebuilds an event from `snapshot`.
    ///
    /// `contexts` must name the same types, in the same order, as the
    /// snapshot recorded. The restored event gets a fresh [`EventId`](crate::EventId)
    /// and the default id strategy.
    pub fn restore(snapshot: EventSnapshot, contexts: impl IntoIterator<Item = ContextType>) -> Result<Self, ConfigError> {
        let mut event: Event<R> = EventBuilder::new(snapshot.name.clone())
            .contexts(contexts)
            .behavior_queue(snapshot.behavior_queue)
            .stats(snapshot.stats)
            .build()?;

        let found: Vec<String> = event.contexts().iter().map(|context| context.name().to_string()).collect();
        if found != snapshot.contexts {
            return Err(ConfigError::SnapshotMismatch {
                event: snapshot.name,
                expected: snapshot.contexts,
                found,
            });
        }

        for subscription in snapshot.subscribers {
            event.restore_subscription(subscription.id, subscription.state)?;
        }
        Ok(event)
    }
}
