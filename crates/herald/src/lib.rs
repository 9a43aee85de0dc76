//! # Herald
//!
//! A typed, in-process publish/subscribe engine. Producers declare named
//! events scoped to a family of context types, consumers subscribe and
//! register per-type listeners, and every dispatch returns a structured
//! report of how each subscriber responded.
//!
//! ## Core Concepts
//!
//! - [`Context`] = a payload type. Context types form a declared hierarchy.
//! - [`Event`] = a named dispatch point accepting one primary context type and
//!   any refinements of it.
//! - [`Subscription`] = one subscriber's listener table, keyed by context type.
//! - [`DispatchReport`] = per-subscriber [`Outcome`]s of one dispatch.
//!
//! ## Architecture
//!
//! ```text
//! producer
//!     │
//!     ▼ dispatch(ctx)
//! Event ── accepts(type_of(ctx))? ── no ──► RoutingError
//!     │ yes
//!     ▼ registration order
//!     ├─► Subscription A.deliver() ─► listener(ctx) ─► Uncertain(value)
//!     ├─► Subscription B.deliver() ─► no listener    ─► NotListening
//!     ├─► Subscription C.deliver() ─► disconnected   ─► Closed (evicted)
//!     └─► Subscription D.deliver() ─► listener fails ─► Error(cause)
//!     │
//!     ▼
//! DispatchReport { results, listener_count }
//!     │
//!     └─► listener_count == 0 && deferrable ─► BehaviorQueue (replayed on
//!                                              the next matching listen)
//! ```
//!
//! ## Key Invariants
//!
//! 1. **The context family is closed** - primary first, every other accepted
//!    type refines it, validated once at construction
//! 2. **Registration order** - subscribers are visited in the order they
//!    subscribed, each exactly once per dispatch
//! 3. **Failures are isolated** - a listener error or panic is reported for
//!    that subscriber and delivery continues
//! 4. **Closed is lazy** - a disconnected subscription is evicted by the first
//!    dispatch that reaches it
//! 5. **At most one held context per type** - the newest wins, replayed once
//!
//! ## Guarantees
//!
//! - **Synchronous**: dispatch returns after every listener has run
//! - **No retries**: failures are reported, never retried
//! - **In-memory only**: snapshots persist subscriptions, not listeners
//!
//! ## Example
//!
//! ```
//! use herald_core::{context, Event, Outcome};
//!
//! #[derive(Debug)]
//! struct NetworkStatus;
//!
//! #[derive(Debug)]
//! struct ServiceStatusUpdate {
//!     up: bool,
//! }
//!
//! context!(NetworkStatus);
//! context!(ServiceStatusUpdate: NetworkStatus);
//!
//! # fn main() -> Result<(), herald_core::Error> {
//! let mut event: Event<&'static str> = Event::builder("network-status")
//!     .context::<NetworkStatus>()
//!     .context::<ServiceStatusUpdate>()
//!     .build()?;
//!
//! let id = {
//!     let mut subscription = event.subscribe()?;
//!     subscription.listen(|update: &ServiceStatusUpdate| {
//!         Ok(if update.up { "up" } else { "down" })
//!     })?;
//!     subscription.id().to_string()
//! };
//!
//! let report = event.dispatch(ServiceStatusUpdate { up: true })?;
//! let result = report.get(&id).unwrap();
//! assert_eq!(result.outcome(), Outcome::Uncertain);
//! assert_eq!(result.value(), Some(&"up"));
//! # Ok(())
//! # }
//! ```
//!
//! ## What This Is Not
//!
//! Herald is **not**:
//! - A message broker (no transport, no cross-process delivery)
//! - An async runtime (listeners run inline, on the dispatching thread)
//! - Internally synchronized (wrap an event in one lock to share it)

// Core modules
mod behavior;
mod context;
mod context_macro;
mod error;
mod event;
mod ids;
mod registry;
mod report;
mod snapshot;
mod stats;
mod subscription;

// Randomized lifecycle tests (test-only)
#[cfg(test)]
mod stress_tests;

// Re-export context types
pub use crate::context::{AnyContext, Context, ContextType};

// Re-export event types
pub use crate::event::{Event, EventBuilder, EventId};

// Re-export subscription types
pub use crate::ids::{SequentialIds, SubscriptionIds, UuidIds};
pub use crate::subscription::{ListenOutcome, Listener, Subscription, SubscriptionMut, SubscriptionState};

// Re-export report types
pub use crate::report::{DispatchReport, Outcome, ReportSummary, SubscriberResult};

// Re-export monitoring types
pub use crate::stats::{EventStats, KeyStyle, StatsSnapshot};

// Re-export registry and persistence types
pub use crate::registry::{EventRegistry, RegistryOwner};
pub use crate::snapshot::{EventSnapshot, SubscriptionSnapshot};

// Re-export error types
pub use crate::error::{ConfigError, DeliveryError, Error, ListenerError, RegistryError, Result, RoutingError};
