//! Error types.
//!
//! - [`ConfigError`]: construction-time misconfiguration. Fatal.
//! - [`RoutingError`]: a context type the event does not accept. Caller misuse.
//! - [`DeliveryError`]: what one subscription reports for one delivery. The
//!   dispatch loop folds these into [`Outcome`](crate::Outcome)s; they never
//!   escape [`Event::dispatch`](crate::Event::dispatch).
//! - [`RegistryError`]: lookups and registrations on an
//!   [`EventRegistry`](crate::EventRegistry).
//!
//! [`Error`] wraps all of them for callers that prefer a single type.

use thiserror::Error;

use crate::context::ContextType;

/// Construction-time misconfiguration of an event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("event `{event}` declares no context types")]
    EmptyContexts { event: String },

    #[error("event `{event}` expects refinements of {primary} as context, got {context}")]
    NotARefinement {
        event: String,
        primary: ContextType,
        context: ContextType,
    },

    #[error("event `{event}` already tracks subscription `{id}`")]
    DuplicateSubscription { event: String, id: String },

    #[error("snapshot of `{event}` recorded contexts {expected:?}, restore supplied {found:?}")]
    SnapshotMismatch {
        event: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// A context type outside the event's accepted set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    #[error("event `{event}` does not support context {context}")]
    UnsupportedContext { event: String, context: ContextType },
}

/// A listener callback failed, by returning an error or by panicking.
#[derive(Error, Debug)]
#[error("listener of `{subscription}` failed on {context}: {cause}")]
pub struct ListenerError {
    subscription: String,
    context: ContextType,
    cause: anyhow::Error,
}

impl ListenerError {
    pub(crate) fn new(subscription: impl Into<String>, context: ContextType, cause: anyhow::Error) -> Self {
        Self {
            subscription: subscription.into(),
            context,
            cause,
        }
    }

    pub fn subscription(&self) -> &str {
        &self.subscription
    }

    pub fn context(&self) -> ContextType {
        self.context
    }

    /// The error the listener produced.
    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }

    pub fn into_cause(self) -> anyhow::Error {
        self.cause
    }
}

/// Result of handing one context to one subscription.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// Delivery was attempted on behalf of an event that does not own the subscription.
    #[error("event does not match subscription `{subscription}`")]
    EventMismatch { subscription: String },

    /// The subscription was unsubscribed or disconnected.
    #[error("subscription `{subscription}` closed")]
    Closed { subscription: String },

    /// No listener is registered for the context type.
    #[error("subscription `{subscription}` is not listening for {context}")]
    NotListening {
        subscription: String,
        context: ContextType,
    },

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

impl DeliveryError {
    pub fn as_label(&self) -> &'static str {
        match self {
            DeliveryError::EventMismatch { .. } => "delivery_event_mismatch",
            DeliveryError::Closed { .. } => "delivery_closed",
            DeliveryError::NotListening { .. } => "delivery_not_listening",
            DeliveryError::Listener(_) => "delivery_listener_error",
        }
    }
}

/// Failures of the keyed [`EventRegistry`](crate::EventRegistry).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{kind} for `{key}` already registered")]
    AlreadyRegistered { kind: &'static str, key: String },

    #[error("{kind} for `{key}` not registered")]
    NotRegistered { kind: &'static str, key: String },
}

/// Any error produced by this crate.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("snapshot encoding failed: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl Error {
    /// Short stable label (snake_case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Error::Config(ConfigError::EmptyContexts { .. }) => "config_empty_contexts",
            Error::Config(ConfigError::NotARefinement { .. }) => "config_not_a_refinement",
            Error::Config(ConfigError::DuplicateSubscription { .. }) => "config_duplicate_subscription",
            Error::Config(ConfigError::SnapshotMismatch { .. }) => "config_snapshot_mismatch",
            Error::Routing(RoutingError::UnsupportedContext { .. }) => "routing_unsupported_context",
            Error::Delivery(err) => err.as_label(),
            Error::Registry(RegistryError::AlreadyRegistered { .. }) => "registry_already_registered",
            Error::Registry(RegistryError::NotRegistered { .. }) => "registry_not_registered",
            Error::Snapshot(_) => "snapshot_encoding",
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
