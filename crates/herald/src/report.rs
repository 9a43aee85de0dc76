//! Dispatch reports: what every subscriber did with one dispatched context.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::context::{AnyContext, Context, ContextType};
use crate::error::{DeliveryError, ListenerError};
use crate::event::EventId;

/// How one subscriber responded to one dispatch.
///
/// A successful delivery is reported as [`Outcome::Uncertain`]: the engine
/// does not tell "returned nothing on purpose" from "succeeded". Inspect the
/// value instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Uncertain,
    NotListening,
    Closed,
    Error,
}

impl Outcome {
    pub fn as_label(&self) -> &'static str {
        match self {
            Outcome::Uncertain => "uncertain",
            Outcome::NotListening => "not_listening",
            Outcome::Closed => "closed",
            Outcome::Error => "error",
        }
    }

    /// True if the subscriber had a listener that ran to completion.
    pub fn is_delivered(&self) -> bool {
        matches!(self, Outcome::Uncertain)
    }
}

/// One subscriber's entry in a [`DispatchReport`].
#[derive(Debug)]
pub struct SubscriberResult<R> {
    subscription: String,
    outcome: Outcome,
    value: Option<R>,
    error: Option<DeliveryError>,
}

impl<R> SubscriberResult<R> {
    pub(crate) fn delivered(subscription: String, value: R) -> Self {
        Self {
            subscription,
            outcome: Outcome::Uncertain,
            value: Some(value),
            error: None,
        }
    }

    pub(crate) fn not_listening(subscription: String) -> Self {
        Self::without_value(subscription, Outcome::NotListening)
    }

    pub(crate) fn closed(subscription: String) -> Self {
        Self::without_value(subscription, Outcome::Closed)
    }

    pub(crate) fn failed(subscription: String, error: DeliveryError) -> Self {
        Self {
            subscription,
            outcome: Outcome::Error,
            value: None,
            error: Some(error),
        }
    }

    fn without_value(subscription: String, outcome: Outcome) -> Self {
        Self {
            subscription,
            outcome,
            value: None,
            error: None,
        }
    }

    /// Id of the subscription this entry describes.
    pub fn subscription(&self) -> &str {
        &self.subscription
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// The listener's return value, for [`Outcome::Uncertain`] entries.
    pub fn value(&self) -> Option<&R> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<R> {
        self.value
    }

    /// The captured failure, for [`Outcome::Error`] entries.
    pub fn error(&self) -> Option<&DeliveryError> {
        self.error.as_ref()
    }

    pub fn listener_error(&self) -> Option<&ListenerError> {
        match &self.error {
            Some(DeliveryError::Listener(err)) => Some(err),
            _ => None,
        }
    }
}

/// Immutable summary of one dispatch.
///
/// Entries are keyed by subscription id, in the order subscribers were visited.
#[derive(Debug)]
pub struct DispatchReport<R = ()> {
    event: Arc<str>,
    event_id: EventId,
    context: Arc<dyn AnyContext>,
    results: IndexMap<String, SubscriberResult<R>>,
    listener_count: usize,
}

impl<R> DispatchReport<R> {
    pub(crate) fn new(
        event: Arc<str>,
        event_id: EventId,
        context: Arc<dyn AnyContext>,
        results: IndexMap<String, SubscriberResult<R>>,
        listener_count: usize,
    ) -> Self {
        Self {
            event,
            event_id,
            context,
            results,
            listener_count,
        }
    }

    pub fn event_name(&self) -> &str {
        &self.event
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// The dispatched context.
    pub fn context(&self) -> &Arc<dyn AnyContext> {
        &self.context
    }

    pub fn context_type(&self) -> ContextType {
        self.context.context_type()
    }

    pub fn context_as<C: Context>(&self) -> Option<&C> {
        self.context.downcast_ref::<C>()
    }

    pub fn results(&self) -> &IndexMap<String, SubscriberResult<R>> {
        &self.results
    }

    pub fn into_results(self) -> IndexMap<String, SubscriberResult<R>> {
        self.results
    }

    pub fn get(&self, subscription: &str) -> Option<&SubscriberResult<R>> {
        self.results.get(subscription)
    }

    /// Subscribers whose listener ran to completion.
    pub fn listener_count(&self) -> usize {
        self.listener_count
    }

    /// Number of subscribers visited.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn outcomes(&self) -> impl Iterator<Item = (&str, Outcome)> + '_ {
        self.results.iter().map(|(id, result)| (id.as_str(), result.outcome))
    }

    pub fn errors(&self) -> impl Iterator<Item = (&str, &DeliveryError)> + '_ {
        self.results
            .iter()
            .filter_map(|(id, result)| result.error.as_ref().map(|err| (id.as_str(), err)))
    }

    /// Values returned by listeners, keyed by subscription id.
    pub fn values(&self) -> impl Iterator<Item = (&str, &R)> + '_ {
        self.results
            .iter()
            .filter_map(|(id, result)| result.value.as_ref().map(|value| (id.as_str(), value)))
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            event: self.event.to_string(),
            context: self.context_type().name().to_string(),
            listener_count: self.listener_count,
            results: self
                .results
                .iter()
                .map(|(id, result)| (id.clone(), result.outcome))
                .collect(),
        }
    }
}

/// Serializable view of a [`DispatchReport`], for logs and debug output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub event: String,
    pub context: String,
    pub listener_count: usize,
    pub results: IndexMap<String, Outcome>,
}
