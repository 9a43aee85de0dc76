use std::sync::{Arc, Mutex, MutexGuard};

use herald_core::Context;

/// Shared log of the contexts a listener received.
///
/// Clones share the same log.
#[derive(Debug)]
pub struct Recorder<C> {
    seen: Arc<Mutex<Vec<C>>>,
}

impl<C> Clone for Recorder<C> {
    fn clone(&self) -> Self {
        Self {
            seen: Arc::clone(&self.seen),
        }
    }
}

impl<C> Default for Recorder<C> {
    fn default() -> Self {
        Self {
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<C: Context + Clone> Recorder<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A listener that records each context and returns `value`.
    pub fn listener<R>(&self, value: R) -> impl FnMut(&C) -> anyhow::Result<R> + Send + 'static
    where
        R: Clone + Send + 'static,
    {
        let recorder = self.clone();
        move |context: &C| {
            recorder.lock().push(context.clone());
            Ok(value.clone())
        }
    }

    /// Everything recorded so far, oldest first.
    pub fn seen(&self) -> Vec<C> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn last(&self) -> Option<C> {
        self.lock().last().cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<C>> {
        // A panicking listener must not hide what was recorded before it.
        self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
