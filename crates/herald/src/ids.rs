//! Subscription id strategies.

use uuid::Uuid;

/// Generates ids for [`Event::subscribe`](crate::Event::subscribe).
///
/// Ids must be unique within the event's current subscriber set; a collision
/// surfaces as [`ConfigError::DuplicateSubscription`](crate::ConfigError).
/// Any `FnMut(&str, usize) -> String + Send` closure is a strategy.
pub trait SubscriptionIds: Send {
    /// `current` is the number of subscriptions the event tracks right now.
    fn next_id(&mut self, event: &str, current: usize) -> String;
}

/// `<event>-<current>-<uuid>`. The default.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl SubscriptionIds for UuidIds {
    fn next_id(&mut self, event: &str, current: usize) -> String {
        format!("{event}-{current}-{}", Uuid::new_v4().simple())
    }
}

/// `<event>-<n>` with a per-strategy counter. Deterministic, for tests and demos.
#[derive(Debug, Default, Clone)]
pub struct SequentialIds {
    next: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SubscriptionIds for SequentialIds {
    fn next_id(&mut self, event: &str, _current: usize) -> String {
        let id = format!("{event}-{}", self.next);
        self.next += 1;
        id
    }
}

impl<F> SubscriptionIds for F
where
    F: FnMut(&str, usize) -> String + Send,
{
    fn next_id(&mut self, event: &str, current: usize) -> String {
        self(event, current)
    }
}
