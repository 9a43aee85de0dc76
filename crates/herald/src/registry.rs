//! Keyed store of shared events.
//!
//! Modules that own events register them under their own key so that other
//! modules can look them up without a global. Entries are keyed by the stored
//! Rust type and the owner's key; give each event kind its own wrapper type
//! (e.g. `struct NetworkEvents(Mutex<Event>)`) to keep kinds apart.

use std::any::{type_name, Any, TypeId};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::error::RegistryError;

/// Supplies the key an owner registers its events under.
pub trait RegistryOwner {
    fn registry_key(&self) -> Cow<'_, str>;
}

impl RegistryOwner for str {
    fn registry_key(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl RegistryOwner for String {
    fn registry_key(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}

struct Slot {
    kind: &'static str,
    entries: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

/// Thread-safe map of (stored type, owner key) to a shared event.
#[derive(Default)]
pub struct EventRegistry {
    slots: DashMap<TypeId, Slot>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `event` for `owner`.
    ///
    /// Fails if the pair is already registered, unless `replace` is set.
    pub fn register<T, O>(&self, event: Arc<T>, owner: &O, replace: bool) -> Result<(), RegistryError>
    where
        T: Any + Send + Sync,
        O: RegistryOwner + ?Sized,
    {
        let kind = type_name::<T>();
        let key = owner.registry_key().into_owned();

        let mut slot = self.slots.entry(TypeId::of::<T>()).or_insert_with(|| Slot {
            kind,
            entries: HashMap::new(),
        });
        if !replace && slot.entries.contains_key(&key) {
            return Err(RegistryError::AlreadyRegistered { kind, key });
        }

        debug!(kind, key = %key, replace, "event registered");
        slot.entries.insert(key, event);
        Ok(())
    }

    /// Looks up the `T` registered for `owner`.
    pub fn get<T, O>(&self, owner: &O) -> Result<Arc<T>, RegistryError>
    where
        T: Any + Send + Sync,
        O: RegistryOwner + ?Sized,
    {
        let kind = type_name::<T>();
        let key = owner.registry_key();
        let not_registered = || RegistryError::NotRegistered {
            kind,
            key: key.to_string(),
        };

        let entry = self
            .slots
            .get(&TypeId::of::<T>())
            .and_then(|slot| slot.entries.get(key.as_ref()).cloned())
            .ok_or_else(not_registered)?;
        entry.downcast::<T>().map_err(|_| not_registered())
    }

    pub fn contains<T, O>(&self, owner: &O) -> bool
    where
        T: Any + Send + Sync,
        O: RegistryOwner + ?Sized,
    {
        let key = owner.registry_key();
        self.slots
            .get(&TypeId::of::<T>())
            .is_some_and(|slot| slot.entries.contains_key(key.as_ref()))
    }

    /// Removes the `T` registered for `owner`, or every `T` when `owner` is
    /// `None`. Returns how many entries were removed.
    pub fn unregister<T>(&self, owner: Option<&dyn RegistryOwner>) -> usize
    where
        T: Any + Send + Sync,
    {
        let type_id = TypeId::of::<T>();
        let removed = match owner {
            None => self.slots.remove(&type_id).map_or(0, |(_, slot)| slot.entries.len()),
            Some(owner) => {
                let key = owner.registry_key();
                let removed = self
                    .slots
                    .get_mut(&type_id)
                    .map_or(0, |mut slot| usize::from(slot.entries.remove(key.as_ref()).is_some()));
                self.slots.remove_if(&type_id, |_, slot| slot.entries.is_empty());
                removed
            }
        };

        if removed > 0 {
            debug!(kind = type_name::<T>(), removed, "events unregistered");
        }
        removed
    }

    /// Registered keys per stored type name.
    pub fn inspect(&self) -> BTreeMap<String, Vec<String>> {
        self.slots
            .iter()
            .map(|slot| {
                let mut keys: Vec<String> = slot.entries.keys().cloned().collect();
                keys.sort();
                (slot.kind.to_string(), keys)
            })
            .collect()
    }

    /// Total number of registered events.
    pub fn len(&self) -> usize {
        self.slots.iter().map(|slot| slot.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistry").field("events", &self.inspect()).finish()
    }
}
