//! Per-event monitoring counters.

use std::collections::BTreeMap;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::context::ContextType;
use crate::subscription::Subscription;

/// Emit counts and listener history per accepted context type.
///
/// The set of subscribers currently listening is not stored; it is recomputed
/// from the live subscriptions by [`Event::inspect`](crate::Event::inspect).
#[derive(Debug, Clone, Default)]
pub struct EventStats {
    emits: IndexMap<ContextType, u64>,
    history: IndexMap<ContextType, IndexSet<String>>,
}

impl EventStats {
    pub(crate) fn new(contexts: &[ContextType]) -> Self {
        Self {
            emits: contexts.iter().map(|context| (*context, 0)).collect(),
            history: contexts.iter().map(|context| (*context, IndexSet::new())).collect(),
        }
    }

    pub(crate) fn record_emit(&mut self, context: ContextType) {
        *self.emits.entry(context).or_default() += 1;
    }

    pub(crate) fn record_listener(&mut self, context: ContextType, subscription: &str) {
        let history = self.history.entry(context).or_default();
        if !history.contains(subscription) {
            history.insert(subscription.to_string());
        }
    }

    pub fn emits(&self, context: ContextType) -> u64 {
        self.emits.get(&context).copied().unwrap_or_default()
    }

    pub fn total_emits(&self) -> u64 {
        self.emits.values().sum()
    }

    /// Every subscription that ever listened for `context`, in first-listen order.
    pub fn history(&self, context: ContextType) -> impl Iterator<Item = &str> + '_ {
        self.history
            .get(&context)
            .into_iter()
            .flat_map(|ids| ids.iter().map(String::as_str))
    }

    pub(crate) fn snapshot<'a, R: 'a>(
        &self,
        subscribers: impl Iterator<Item = &'a Subscription<R>> + Clone,
        style: KeyStyle,
    ) -> StatsSnapshot {
        let key = |context: &ContextType| style.render(*context).to_string();

        let current = self
            .emits
            .keys()
            .map(|context| {
                let ids = subscribers
                    .clone()
                    .filter(|sub| sub.status() && sub.is_listening(*context))
                    .map(|sub| sub.id().to_string())
                    .collect();
                (key(context), ids)
            })
            .collect();

        StatsSnapshot {
            emits: self.emits.iter().map(|(context, count)| (key(context), *count)).collect(),
            history: self
                .history
                .iter()
                .map(|(context, ids)| (key(context), ids.iter().cloned().collect()))
                .collect(),
            current,
        }
    }
}

/// How context types are rendered as keys in a [`StatsSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyStyle {
    /// Fully qualified type names.
    #[default]
    Qualified,
    /// Last path segment only. Distinct types with the same short name collide.
    Short,
}

impl KeyStyle {
    fn render(self, context: ContextType) -> &'static str {
        match self {
            KeyStyle::Qualified => context.name(),
            KeyStyle::Short => context.short_name(),
        }
    }
}

/// Point-in-time statistics of one event.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub emits: BTreeMap<String, u64>,
    pub history: BTreeMap<String, Vec<String>>,
    pub current: BTreeMap<String, Vec<String>>,
}
