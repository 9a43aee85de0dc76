//! Events: named dispatch points scoped to a family of context types.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::behavior::BehaviorQueue;
use crate::context::{AnyContext, Context, ContextType};
use crate::error::{ConfigError, DeliveryError, RoutingError};
use crate::ids::{SubscriptionIds, UuidIds};
use crate::report::{DispatchReport, SubscriberResult};
use crate::stats::{EventStats, KeyStyle, StatsSnapshot};
use crate::subscription::{ListenOutcome, Listener, Subscription, SubscriptionMut, SubscriptionState};

/// Identity of one [`Event`] instance.
///
/// Subscriptions keep this instead of a reference to their event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Accepted context types: primary first, refinements after.
pub(crate) type ContextSet = SmallVec<[ContextType; 4]>;

/// Configures and builds an [`Event`].
///
/// ```
/// use herald_core::{context, Event, SequentialIds};
///
/// #[derive(Debug)]
/// struct NetworkStatus;
/// #[derive(Debug)]
/// struct ServiceStatusUpdate;
///
/// context!(NetworkStatus);
/// context!(ServiceStatusUpdate: NetworkStatus);
///
/// let event: Event = Event::builder("network-status")
///     .context::<NetworkStatus>()
///     .context::<ServiceStatusUpdate>()
///     .id_strategy(SequentialIds::new())
///     .build()
///     .unwrap();
///
/// assert_eq!(event.contexts().len(), 2);
/// ```
pub struct EventBuilder {
    name: String,
    contexts: Vec<ContextType>,
    behavior_queue: bool,
    stats: bool,
    ids: Box<dyn SubscriptionIds>,
}

impl EventBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contexts: Vec::new(),
            behavior_queue: false,
            stats: true,
            ids: Box::new(UuidIds),
        }
    }

    /// Appends `C` to the accepted types. The first type added is the primary.
    pub fn context<C: Context>(mut self) -> Self {
        self.contexts.push(ContextType::of::<C>());
        self
    }

    pub fn contexts(mut self, contexts: impl IntoIterator<Item = ContextType>) -> Self {
        self.contexts.extend(contexts);
        self
    }

    /// Hold deferrable contexts dispatched with no listeners and replay them
    /// to the first subscription that listens for them.
    pub fn behavior_queue(mut self, enabled: bool) -> Self {
        self.behavior_queue = enabled;
        self
    }

    /// Track emit counts and listener history. On by default.
    pub fn stats(mut self, enabled: bool) -> Self {
        self.stats = enabled;
        self
    }

    pub fn id_strategy(mut self, ids: impl SubscriptionIds + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    /// Validates the context family and builds the event.
    ///
    /// Duplicates are dropped, keeping first occurrences. The remaining list
    /// must be non-empty and every type after the first must refine it.
    pub fn build<R>(self) -> Result<Event<R>, ConfigError> {
        let mut contexts = ContextSet::new();
        for context in self.contexts {
            if !contexts.contains(&context) {
                contexts.push(context);
            }
        }

        let Some(&primary) = contexts.first() else {
            return Err(ConfigError::EmptyContexts { event: self.name });
        };
        if let Some(&context) = contexts[1..].iter().find(|context| !context.refines(primary)) {
            return Err(ConfigError::NotARefinement {
                event: self.name,
                primary,
                context,
            });
        }

        let event = Event {
            id: EventId::new(),
            stats: self.stats.then(|| EventStats::new(&contexts)),
            queue: self.behavior_queue.then(BehaviorQueue::default),
            name: Arc::from(self.name),
            primary,
            contexts,
            subscribers: IndexMap::new(),
            ids: self.ids,
        };
        debug!(
            event = %event.name,
            primary = %primary.short_name(),
            contexts = event.contexts.len(),
            behavior_queue = event.queue.is_some(),
            "event created"
        );
        Ok(event)
    }
}

impl fmt::Debug for EventBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBuilder")
            .field("name", &self.name)
            .field("contexts", &self.contexts)
            .field("behavior_queue", &self.behavior_queue)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// A named dispatch point.
///
/// Owns its subscriptions in registration order and delivers each dispatched
/// context to every one of them, producing a [`DispatchReport`]. `R` is the
/// return type of listener callbacks.
///
/// An event is not internally synchronized. Share it behind one lock per
/// event (e.g. `Mutex<Event<R>>`) if several threads need it.
pub struct Event<R = ()> {
    id: EventId,
    name: Arc<str>,
    primary: ContextType,
    contexts: ContextSet,
    subscribers: IndexMap<String, Subscription<R>>,
    ids: Box<dyn SubscriptionIds>,
    stats: Option<EventStats>,
    queue: Option<BehaviorQueue>,
}

impl Event {
    pub fn builder(name: impl Into<String>) -> EventBuilder {
        EventBuilder::new(name)
    }
}

impl<R> Event<R> {
    /// Builds an event with default settings. See [`EventBuilder::build`].
    pub fn new(name: impl Into<String>, contexts: impl IntoIterator<Item = ContextType>) -> Result<Self, ConfigError> {
        EventBuilder::new(name).contexts(contexts).build()
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The root every accepted context refines.
    pub fn primary(&self) -> ContextType {
        self.primary
    }

    /// Accepted context types, primary first.
    pub fn contexts(&self) -> &[ContextType] {
        &self.contexts
    }

    pub fn accepts(&self, context: ContextType) -> bool {
        self.contexts.contains(&context)
    }

    pub fn has_behavior_queue(&self) -> bool {
        self.queue.is_some()
    }

    pub fn set_id_strategy(&mut self, ids: impl SubscriptionIds + 'static) {
        self.ids = Box::new(ids);
    }

    // ---------------------------------------------------------------------
    // Subscriptions
    // ---------------------------------------------------------------------

    /// Creates a subscription with an id from the event's id strategy.
    pub fn subscribe(&mut self) -> Result<SubscriptionMut<'_, R>, ConfigError> {
        let id = self.ids.next_id(&self.name, self.subscribers.len());
        self.create_subscription(id)
    }

    /// Creates a subscription with a caller-supplied id.
    ///
    /// Fails if the id is already tracked.
    pub fn create_subscription(&mut self, id: impl Into<String>) -> Result<SubscriptionMut<'_, R>, ConfigError> {
        let id = id.into();
        if self.subscribers.contains_key(&id) {
            return Err(ConfigError::DuplicateSubscription {
                event: self.name.to_string(),
                id,
            });
        }

        self.subscribers.insert(id.clone(), Subscription::new(id.clone(), self.id));
        debug!(event = %self.name, subscription = %id, "subscribed");
        Ok(SubscriptionMut::new(self, id))
    }

    /// Removes a subscription. Removing an unknown id is a no-op.
    pub fn unsubscribe(&mut self, id: &str) -> bool {
        match self.subscribers.shift_remove(id) {
            Some(mut subscription) => {
                subscription.mark_removed();
                debug!(event = %self.name, subscription = %id, "unsubscribed");
                true
            }
            None => false,
        }
    }

    /// Soft-closes a subscription. It stays tracked until the next dispatch
    /// or [`purge_inactive`](Self::purge_inactive).
    pub fn disconnect(&mut self, id: &str) -> bool {
        let event = self.id;
        match self.subscribers.get_mut(id) {
            Some(subscription) => subscription.disconnect(event),
            None => false,
        }
    }

    /// Removes every subscription whose status is inactive. Returns how many.
    pub fn purge_inactive(&mut self) -> usize {
        let before = self.subscribers.len();
        self.subscribers.retain(|_, subscription| {
            if subscription.status() {
                return true;
            }
            subscription.mark_removed();
            false
        });

        let purged = before - self.subscribers.len();
        if purged > 0 {
            debug!(event = %self.name, purged, remaining = self.subscribers.len(), "purged inactive subscriptions");
        }
        purged
    }

    /// Number of tracked subscriptions, disconnected ones included.
    pub fn count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Tracked subscriptions in registration order.
    pub fn subscribers(&self) -> impl ExactSizeIterator<Item = &Subscription<R>> + Clone + '_ {
        self.subscribers.values()
    }

    pub fn subscription(&self, id: &str) -> Option<&Subscription<R>> {
        self.subscribers.get(id)
    }

    pub fn subscription_mut(&mut self, id: &str) -> Option<SubscriptionMut<'_, R>> {
        if !self.subscribers.contains_key(id) {
            return None;
        }
        Some(SubscriptionMut::new(self, id.to_string()))
    }

    /// Lookup for [`SubscriptionMut`]. The guard is only built for tracked
    /// ids and nothing reachable through it evicts an active subscription.
    pub(crate) fn tracked(&self, id: &str) -> &Subscription<R> {
        &self.subscribers[id]
    }

    pub(crate) fn tracked_mut(&mut self, id: &str) -> &mut Subscription<R> {
        &mut self.subscribers[id]
    }

    /// Registers a listener on behalf of subscription `id`.
    ///
    /// An inactive subscription is rejected before the context type is
    /// checked.
    pub(crate) fn listen(
        &mut self,
        id: &str,
        context: ContextType,
        listener: Listener<R>,
    ) -> Result<ListenOutcome<R>, RoutingError> {
        let accepted = self.accepts(context);
        let Some(subscription) = self.subscribers.get_mut(id) else {
            return Ok(ListenOutcome::Rejected);
        };
        if !subscription.status() {
            return Ok(ListenOutcome::Rejected);
        }
        if !accepted {
            return Err(RoutingError::UnsupportedContext {
                event: self.name.to_string(),
                context,
            });
        }

        subscription.insert_listener(context, listener);
        trace!(event = %self.name, subscription = %id, context = %context.short_name(), "listening");
        Ok(self.on_listening(id, context))
    }

    /// Records the listener and replays a held context of the same type.
    fn on_listening(&mut self, id: &str, context: ContextType) -> ListenOutcome<R> {
        if let Some(stats) = self.stats.as_mut() {
            stats.record_listener(context, id);
        }

        let Some(held) = self.queue.as_mut().and_then(|queue| queue.take(context)) else {
            return ListenOutcome::Listening;
        };
        info!(event = %self.name, subscription = %id, context = %context.short_name(), "replaying held context");
        ListenOutcome::Replayed(self.deliver_all(held))
    }

    // ---------------------------------------------------------------------
    // Dispatch
    // ---------------------------------------------------------------------

    /// Delivers `context` to every tracked subscription.
    ///
    /// Fails only if the event does not accept the context's type; listener
    /// failures are reported per subscriber.
    pub fn dispatch<C: Context>(&mut self, context: C) -> Result<DispatchReport<R>, RoutingError> {
        self.dispatch_shared(Arc::new(context))
    }

    /// [`dispatch`](Self::dispatch) for an already shared context.
    pub fn dispatch_shared(&mut self, context: Arc<dyn AnyContext>) -> Result<DispatchReport<R>, RoutingError> {
        let context_type = context.context_type();
        if !self.accepts(context_type) {
            return Err(RoutingError::UnsupportedContext {
                event: self.name.to_string(),
                context: context_type,
            });
        }

        let report = self.deliver_all(context);
        if report.listener_count() == 0 {
            if let Some(queue) = self.queue.as_mut() {
                if queue.hold(report.context()) {
                    debug!(event = %self.name, context = %context_type.short_name(), "held context for replay");
                }
            }
        }
        Ok(report)
    }

    /// The dispatch loop. Visits subscriptions in registration order, each
    /// exactly once; closed ones are evicted in the same pass.
    fn deliver_all(&mut self, context: Arc<dyn AnyContext>) -> DispatchReport<R> {
        let context_type = context.context_type();
        if let Some(stats) = self.stats.as_mut() {
            stats.record_emit(context_type);
        }

        debug!(
            event = %self.name,
            context = %context_type.short_name(),
            subscribers = self.subscribers.len(),
            "dispatching"
        );

        let mut results = IndexMap::with_capacity(self.subscribers.len());
        let mut listener_count = 0;
        let mut index = 0;

        while let Some((id, subscription)) = self.subscribers.get_index_mut(index) {
            let id = id.clone();
            let result = match subscription.deliver(self.id, &*context) {
                Ok(value) => {
                    listener_count += 1;
                    SubscriberResult::delivered(id.clone(), value)
                }
                Err(DeliveryError::Closed { .. }) => {
                    if let Some((_, mut evicted)) = self.subscribers.shift_remove_index(index) {
                        evicted.mark_removed();
                    }
                    debug!(event = %self.name, subscription = %id, "evicted closed subscription");
                    results.insert(id.clone(), SubscriberResult::closed(id));
                    continue;
                }
                Err(DeliveryError::NotListening { .. }) => SubscriberResult::not_listening(id.clone()),
                Err(err) => {
                    warn!(
                        event = %self.name,
                        subscription = %id,
                        context = %context_type.short_name(),
                        error = %err,
                        "listener failed"
                    );
                    SubscriberResult::failed(id.clone(), err)
                }
            };
            trace!(event = %self.name, subscription = %id, outcome = result.outcome().as_label(), "delivered");
            results.insert(id, result);
            index += 1;
        }

        DispatchReport::new(Arc::clone(&self.name), self.id, context, results, listener_count)
    }

    // ---------------------------------------------------------------------
    // Monitoring
    // ---------------------------------------------------------------------

    /// Raw counters, if statistics are enabled.
    pub fn stats(&self) -> Option<&EventStats> {
        self.stats.as_ref()
    }

    /// Statistics snapshot, if statistics are enabled.
    pub fn inspect(&self, style: KeyStyle) -> Option<StatsSnapshot> {
        self.stats
            .as_ref()
            .map(|stats| stats.snapshot(self.subscribers.values(), style))
    }

    /// Context types currently held by the behavior queue.
    pub fn held(&self) -> Vec<ContextType> {
        self.queue
            .as_ref()
            .map(|queue| queue.held().collect())
            .unwrap_or_default()
    }

    pub fn has_held(&self, context: ContextType) -> bool {
        self.queue.as_ref().is_some_and(|queue| queue.contains(context))
    }

    // ---------------------------------------------------------------------
    // Restore support
    // ---------------------------------------------------------------------

    /// Re-inserts a persisted subscription with no listeners.
    pub(crate) fn restore_subscription(&mut self, id: String, state: SubscriptionState) -> Result<(), ConfigError> {
        if self.subscribers.contains_key(&id) {
            return Err(ConfigError::DuplicateSubscription {
                event: self.name.to_string(),
                id,
            });
        }
        self.subscribers
            .insert(id.clone(), Subscription::with_state(id, self.id, state));
        Ok(())
    }
}

impl<R> fmt::Debug for Event<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("contexts", &self.contexts)
            .field("subscribers", &self.subscribers.keys().collect::<Vec<_>>())
            .field("behavior_queue", &self.queue.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::report::Outcome;

    #[derive(Debug)]
    struct Status;

    #[derive(Debug)]
    struct Update {
        up: bool,
    }

    #[derive(Debug)]
    struct Notice;

    #[derive(Debug)]
    struct Unrelated;

    crate::context!(Status);
    crate::context!(Update: Status);
    crate::context!(Notice: Status, deferrable);
    crate::context!(Unrelated);

    fn event() -> Event<&'static str> {
        Event::builder("status")
            .context::<Status>()
            .context::<Update>()
            .context::<Notice>()
            .id_strategy(SequentialIds::new())
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_requires_contexts() {
        let err = Event::<()>::new("empty", std::iter::empty()).unwrap_err();
        assert_eq!(err, ConfigError::EmptyContexts { event: "empty".into() });
    }

    #[test]
    fn test_build_rejects_non_refinement() {
        let err = Event::<()>::new("bad", [ContextType::of::<Status>(), ContextType::of::<Unrelated>()]).unwrap_err();
        match err {
            ConfigError::NotARefinement { primary, context, .. } => {
                assert_eq!(primary, ContextType::of::<Status>());
                assert_eq!(context, ContextType::of::<Unrelated>());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_build_dedupes_and_keeps_primary_first() {
        let event = Event::<()>::new(
            "dupes",
            [
                ContextType::of::<Status>(),
                ContextType::of::<Update>(),
                ContextType::of::<Status>(),
                ContextType::of::<Update>(),
            ],
        )
        .unwrap();
        assert_eq!(event.contexts(), &[ContextType::of::<Status>(), ContextType::of::<Update>()]);
        assert_eq!(event.primary(), ContextType::of::<Status>());
    }

    #[test]
    fn test_primary_alone_is_valid() {
        let event = Event::<()>::new("solo", [ContextType::of::<Unrelated>()]).unwrap();
        assert!(event.accepts(ContextType::of::<Unrelated>()));
        assert!(!event.accepts(ContextType::of::<Status>()));
    }

    #[test]
    fn test_duplicate_subscription_id_is_rejected() {
        let mut event = event();
        event.create_subscription("fixed").unwrap();
        let err = event.create_subscription("fixed").unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateSubscription { .. }));
        assert_eq!(event.count(), 1);
    }

    #[test]
    fn test_dispatch_delivers_in_registration_order() {
        let mut event = event();
        for label in ["first", "second", "third"] {
            event
                .subscribe()
                .unwrap()
                .listen(move |_: &Update| Ok(label))
                .unwrap();
        }

        let report = event.dispatch(Update { up: true }).unwrap();
        let values: Vec<_> = report.values().map(|(_, v)| *v).collect();
        assert_eq!(values, vec!["first", "second", "third"]);
        assert_eq!(report.listener_count(), 3);
    }

    #[test]
    fn test_dispatch_unsupported_context_has_no_side_effects() {
        let mut event = event();
        event.subscribe().unwrap();
        let before = event.inspect(KeyStyle::Short).unwrap();

        let err = event.dispatch(Unrelated).unwrap_err();
        assert!(matches!(err, RoutingError::UnsupportedContext { .. }));
        assert_eq!(event.inspect(KeyStyle::Short).unwrap(), before);
        assert_eq!(event.count(), 1);
    }

    #[test]
    fn test_listener_error_does_not_abort_dispatch() {
        let mut event = event();
        event
            .subscribe()
            .unwrap()
            .listen(|_: &Update| Err(anyhow::anyhow!("down")))
            .unwrap();
        event
            .subscribe()
            .unwrap()
            .listen(|update: &Update| Ok(if update.up { "up" } else { "down" }))
            .unwrap();

        let report = event.dispatch(Update { up: false }).unwrap();
        let outcomes: Vec<_> = report.outcomes().map(|(_, o)| o).collect();
        assert_eq!(outcomes, vec![Outcome::Error, Outcome::Uncertain]);
        assert_eq!(report.listener_count(), 1);
        assert_eq!(report.get("status-1").and_then(|r| r.value()), Some(&"down"));
    }

    #[test]
    fn test_closed_subscription_evicted_without_skipping_next() {
        let mut event = event();
        let first = event.subscribe().unwrap().id().to_string();
        event.subscribe().unwrap().listen(|_: &Update| Ok("ok")).unwrap();
        event.disconnect(&first);

        let report = event.dispatch(Update { up: true }).unwrap();
        let outcomes: Vec<_> = report.outcomes().collect();
        assert_eq!(outcomes, vec![(first.as_str(), Outcome::Closed), ("status-1", Outcome::Uncertain)]);
        assert_eq!(event.count(), 1);
        assert!(event.subscription(&first).is_none());
    }

    #[test]
    fn test_listen_on_inactive_is_rejected_before_routing() {
        let mut event = event();
        let mut sub = event.subscribe().unwrap();
        sub.disconnect();

        let outcome = sub.listen(|_: &Unrelated| Ok("never")).unwrap();
        assert!(!outcome.accepted());
        assert_eq!(sub.state(), SubscriptionState::Disconnected);
    }

    #[test]
    fn test_listen_unsupported_context_is_routing_error() {
        let mut event = event();
        let mut sub = event.subscribe().unwrap();
        let err = sub.listen(|_: &Unrelated| Ok("never")).unwrap_err();
        assert!(matches!(err, RoutingError::UnsupportedContext { .. }));
        assert_eq!(sub.listening().count(), 0);
    }

    #[test]
    fn test_purge_inactive_keeps_active() {
        let mut event = event();
        event.subscribe().unwrap();
        let gone = event.subscribe().unwrap().id().to_string();
        event.disconnect(&gone);

        assert_eq!(event.purge_inactive(), 1);
        assert_eq!(event.count(), 1);
        assert_eq!(event.purge_inactive(), 0);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let mut event = event();
        let id = event.subscribe().unwrap().id().to_string();
        assert!(event.unsubscribe(&id));
        assert!(!event.unsubscribe(&id));
        assert!(event.is_empty());
    }

    #[test]
    fn test_stats_disabled() {
        let mut event: Event = Event::builder("quiet").context::<Status>().stats(false).build().unwrap();
        event.dispatch(Status).unwrap();
        assert!(event.stats().is_none());
        assert!(event.inspect(KeyStyle::Qualified).is_none());
    }

    #[test]
    fn test_behavior_queue_off_by_default() {
        let mut event = event();
        event.dispatch(Notice).unwrap();
        assert!(!event.has_behavior_queue());
        assert!(event.held().is_empty());
    }
}
