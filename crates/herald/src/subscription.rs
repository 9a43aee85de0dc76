//! Subscriptions: per-subscriber listener tables owned by an [`Event`].
//!
//! ```text
//!            disconnect(owner)
//!   Active ────────────────────► Disconnected
//!     │                               │
//!     │ unsubscribe()                 │ next delivery → Closed,
//!     ▼                               ▼ evicted by the dispatch loop
//!   Removed ◄─────────────────────────┘ (or by purge_inactive)
//! ```
//!
//! A [`Subscription`] never mutates its event. Operations that must notify the
//! event (`listen`, `unsubscribe`) go through [`SubscriptionMut`], a guard that
//! borrows the event exclusively.

use std::any::type_name;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};

use anyhow::anyhow;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::context::{AnyContext, Context, ContextType};
use crate::error::{DeliveryError, ListenerError, RoutingError};
use crate::event::{Event, EventId};
use crate::report::DispatchReport;

/// Type-erased listener callback.
pub type Listener<R> = Box<dyn FnMut(&dyn AnyContext) -> anyhow::Result<R> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    Active,
    /// Soft-closed by the owning event; still tracked until the next dispatch
    /// or purge observes it.
    Disconnected,
    /// Unsubscribed or evicted.
    Removed,
}

/// A subscriber's listener table plus its lifecycle state.
pub struct Subscription<R> {
    id: String,
    event: EventId,
    listeners: IndexMap<ContextType, Listener<R>>,
    state: SubscriptionState,
}

impl<R> Subscription<R> {
    pub(crate) fn new(id: String, event: EventId) -> Self {
        Self::with_state(id, event, SubscriptionState::Active)
    }

    pub(crate) fn with_state(id: String, event: EventId, state: SubscriptionState) -> Self {
        Self {
            id,
            event,
            listeners: IndexMap::new(),
            state,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The owning event.
    pub fn event(&self) -> EventId {
        self.event
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    /// True only while active and not disconnected.
    pub fn status(&self) -> bool {
        self.state == SubscriptionState::Active
    }

    /// Context types with a registered listener, in registration order.
    pub fn listening(&self) -> impl Iterator<Item = ContextType> + '_ {
        self.listeners.keys().copied()
    }

    pub fn is_listening(&self, context: ContextType) -> bool {
        self.listeners.contains_key(&context)
    }

    /// Fails with [`DeliveryError::Closed`] unless the subscription is active.
    pub fn ping(&self) -> Result<&Self, DeliveryError> {
        if !self.status() {
            return Err(DeliveryError::Closed {
                subscription: self.id.clone(),
            });
        }
        Ok(self)
    }

    /// Soft-closes the subscription if `event` is its owner.
    ///
    /// Returns whether the call came from the owner. A removed subscription
    /// stays removed.
    pub fn disconnect(&mut self, event: EventId) -> bool {
        if event != self.event {
            return false;
        }
        if self.state == SubscriptionState::Active {
            self.state = SubscriptionState::Disconnected;
        }
        true
    }

    /// Hands `context` to the listener registered for its exact type.
    ///
    /// Checks run in a fixed order: owner identity, then closed state, then
    /// listener lookup. Listener errors and panics are wrapped in
    /// [`ListenerError`].
    pub fn deliver(&mut self, event: EventId, context: &dyn AnyContext) -> Result<R, DeliveryError> {
        if event != self.event {
            return Err(DeliveryError::EventMismatch {
                subscription: self.id.clone(),
            });
        }
        if !self.status() {
            return Err(DeliveryError::Closed {
                subscription: self.id.clone(),
            });
        }

        let context_type = context.context_type();
        let Some(listener) = self.listeners.get_mut(&context_type) else {
            return Err(DeliveryError::NotListening {
                subscription: self.id.clone(),
                context: context_type,
            });
        };

        let cause = match panic::catch_unwind(AssertUnwindSafe(|| listener(context))) {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(cause)) => cause,
            Err(payload) => anyhow!("listener panicked: {}", panic_message(payload.as_ref())),
        };
        Err(ListenerError::new(self.id.clone(), context_type, cause).into())
    }

    /// Stores `listener`, replacing any previous one for the same type.
    pub(crate) fn insert_listener(&mut self, context: ContextType, listener: Listener<R>) {
        self.listeners.insert(context, listener);
    }

    pub(crate) fn mark_removed(&mut self) {
        self.state = SubscriptionState::Removed;
    }
}

impl<R> fmt::Debug for Subscription<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("event", &self.event)
            .field("state", &self.state)
            .field("listening", &self.listeners.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// What [`SubscriptionMut::listen`] did.
#[derive(Debug)]
pub enum ListenOutcome<R> {
    /// The subscription is inactive; nothing was registered.
    Rejected,
    /// The listener is registered.
    Listening,
    /// The listener is registered and a held context was re-dispatched.
    Replayed(DispatchReport<R>),
}

impl<R> ListenOutcome<R> {
    /// True unless the listen call was rejected.
    pub fn accepted(&self) -> bool {
        !matches!(self, ListenOutcome::Rejected)
    }

    pub fn replayed(&self) -> Option<&DispatchReport<R>> {
        match self {
            ListenOutcome::Replayed(report) => Some(report),
            _ => None,
        }
    }
}

/// Exclusive handle on one tracked subscription and its event.
///
/// Returned by [`Event::subscribe`], [`Event::create_subscription`] and
/// [`Event::subscription_mut`]. Derefs to [`Subscription`].
pub struct SubscriptionMut<'a, R> {
    event: &'a mut Event<R>,
    id: String,
}

impl<'a, R> SubscriptionMut<'a, R> {
    pub(crate) fn new(event: &'a mut Event<R>, id: String) -> Self {
        Self { event, id }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Registers `listener` for contexts of type `C`.
    ///
    /// Returns [`ListenOutcome::Rejected`] if the subscription is inactive and
    /// a [`RoutingError`] if the event does not accept `C`.
    pub fn listen<C, F>(&mut self, mut listener: F) -> Result<ListenOutcome<R>, RoutingError>
    where
        C: Context,
        R: 'static,
        F: FnMut(&C) -> anyhow::Result<R> + Send + 'static,
    {
        let erased: Listener<R> = Box::new(move |context: &dyn AnyContext| match context.downcast_ref::<C>() {
            Some(context) => listener(context),
            None => Err(anyhow!(
                "listener for {} received {}",
                type_name::<C>(),
                context.context_type()
            )),
        });
        self.listen_type(ContextType::of::<C>(), erased)
    }

    /// Registers an already erased listener.
    pub fn listen_type(&mut self, context: ContextType, listener: Listener<R>) -> Result<ListenOutcome<R>, RoutingError> {
        self.event.listen(&self.id, context, listener)
    }

    /// Removes the subscription from its event.
    pub fn unsubscribe(self) -> bool {
        self.event.unsubscribe(&self.id)
    }

    /// Soft-closes the subscription on behalf of its event.
    pub fn disconnect(&mut self) -> bool {
        let event = self.event.id();
        self.deref_mut().disconnect(event)
    }
}

impl<R> Deref for SubscriptionMut<'_, R> {
    type Target = Subscription<R>;

    fn deref(&self) -> &Subscription<R> {
        self.event.tracked(&self.id)
    }
}

impl<R> DerefMut for SubscriptionMut<'_, R> {
    fn deref_mut(&mut self) -> &mut Subscription<R> {
        self.event.tracked_mut(&self.id)
    }
}

impl<R> fmt::Debug for SubscriptionMut<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.deref(), f)
    }
}
