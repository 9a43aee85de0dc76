//! Behavior queue: hold deferrable contexts dispatched to nobody.
//!
//! When a dispatch finds zero listeners and the context type is
//! [`deferrable`](crate::Context::deferrable), the instance is held, one slot
//! per type with the newest instance winning. The first subscription that
//! starts listening for that type takes the slot and the event re-dispatches
//! the held instance.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::context::{AnyContext, ContextType};

#[derive(Debug, Default)]
pub(crate) struct BehaviorQueue {
    held: IndexMap<ContextType, Arc<dyn AnyContext>>,
}

impl BehaviorQueue {
    /// Holds `context` if its type is deferrable. Returns whether it was held.
    pub(crate) fn hold(&mut self, context: &Arc<dyn AnyContext>) -> bool {
        let context_type = context.context_type();
        if !context_type.is_deferrable() {
            return false;
        }
        self.held.insert(context_type, Arc::clone(context));
        true
    }

    pub(crate) fn take(&mut self, context: ContextType) -> Option<Arc<dyn AnyContext>> {
        self.held.shift_remove(&context)
    }

    pub(crate) fn contains(&self, context: ContextType) -> bool {
        self.held.contains_key(&context)
    }

    pub(crate) fn held(&self) -> impl Iterator<Item = ContextType> + '_ {
        self.held.keys().copied()
    }
}
