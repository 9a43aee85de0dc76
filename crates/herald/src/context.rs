//! Context types: the payloads an [`Event`](crate::Event) routes to listeners.
//!
//! Every payload implements [`Context`]. Each context type may declare the
//! type it refines, which builds a closed hierarchy that events validate
//! against at construction. Routing is keyed by the payload's exact type.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Upper bound on the declared parent chain walked by [`ContextType::refines`].
const MAX_HIERARCHY_DEPTH: usize = 64;

/// Capability implemented by every dispatchable payload.
///
/// Use the [`context!`](crate::context) macro for the common cases.
///
/// ```
/// use herald_core::{Context, ContextType};
///
/// #[derive(Debug)]
/// struct Billing;
///
/// #[derive(Debug)]
/// struct InvoicePaid {
///     amount: u64,
/// }
///
/// impl Context for Billing {}
///
/// impl Context for InvoicePaid {
///     fn refines() -> Option<ContextType> {
///         Some(ContextType::of::<Billing>())
///     }
/// }
///
/// assert!(ContextType::of::<InvoicePaid>().refines(ContextType::of::<Billing>()));
/// ```
pub trait Context: Any + fmt::Debug + Send + Sync {
    /// The context type this one refines, if any.
    fn refines() -> Option<ContextType>
    where
        Self: Sized,
    {
        None
    }

    /// Whether a dispatch of this type with no listeners may be held for
    /// replay by events with a behavior queue.
    fn deferrable() -> bool
    where
        Self: Sized,
    {
        false
    }
}

/// Type tag of a [`Context`]. Equality and hashing use the `TypeId` only.
#[derive(Clone, Copy)]
pub struct ContextType {
    id: TypeId,
    name: &'static str,
    parent: fn() -> Option<ContextType>,
    deferrable: fn() -> bool,
}

impl ContextType {
    /// Descriptor for `C`.
    pub fn of<C: Context>() -> Self {
        Self {
            id: TypeId::of::<C>(),
            name: std::any::type_name::<C>(),
            parent: <C as Context>::refines,
            deferrable: <C as Context>::deferrable,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last path segment of the type name, generics stripped.
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        base.rsplit("::").next().unwrap_or(base)
    }

    /// Declared parent, if any.
    pub fn parent(&self) -> Option<ContextType> {
        (self.parent)()
    }

    pub fn is_deferrable(&self) -> bool {
        (self.deferrable)()
    }

    /// True if `ancestor` appears in this type's declared parent chain.
    ///
    /// A type does not refine itself. Chains longer than
    /// `MAX_HIERARCHY_DEPTH` (or cyclic ones) are treated as unrelated.
    pub fn refines(&self, ancestor: ContextType) -> bool {
        let mut cursor = self.parent();
        for _ in 0..MAX_HIERARCHY_DEPTH {
            match cursor {
                Some(parent) if parent == ancestor => return true,
                Some(parent) => cursor = parent.parent(),
                None => return false,
            }
        }
        false
    }
}

impl PartialEq for ContextType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ContextType {}

impl Hash for ContextType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ContextType").field(&self.name).finish()
    }
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Object-safe view of a [`Context`], implemented for every context type.
///
/// Dispatch reports and the behavior queue hold contexts as
/// `Arc<dyn AnyContext>`.
pub trait AnyContext: Any + fmt::Debug + Send + Sync {
    fn context_type(&self) -> ContextType;

    fn as_any(&self) -> &dyn Any;
}

impl<C: Context> AnyContext for C {
    fn context_type(&self) -> ContextType {
        ContextType::of::<C>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn AnyContext {
    pub fn is<C: Context>(&self) -> bool {
        self.as_any().is::<C>()
    }

    pub fn downcast_ref<C: Context>(&self) -> Option<&C> {
        self.as_any().downcast_ref::<C>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Root;

    #[derive(Debug)]
    struct Child;

    #[derive(Debug)]
    struct GrandChild(u8);

    #[derive(Debug)]
    struct Stranger;

    #[derive(Debug)]
    struct Wrapper<T>(T);

    crate::context!(Root);
    crate::context!(Child: Root);
    crate::context!(GrandChild: Child, deferrable);
    crate::context!(Stranger);
    crate::context!(Wrapper<u8>);

    #[derive(Debug)]
    struct Loop;

    impl Context for Loop {
        fn refines() -> Option<ContextType> {
            Some(ContextType::of::<Loop>())
        }
    }

    #[test]
    fn test_equality_is_by_type() {
        assert_eq!(ContextType::of::<Child>(), ContextType::of::<Child>());
        assert_ne!(ContextType::of::<Child>(), ContextType::of::<Root>());
    }

    #[test]
    fn test_refinement_is_transitive_and_strict() {
        let root = ContextType::of::<Root>();
        let child = ContextType::of::<Child>();
        let grand = ContextType::of::<GrandChild>();

        assert!(child.refines(root));
        assert!(grand.refines(root));
        assert!(grand.refines(child));
        assert!(!root.refines(child));
        assert!(!root.refines(root));
        assert!(!ContextType::of::<Stranger>().refines(root));
    }

    #[test]
    fn test_cyclic_declaration_terminates() {
        let looped = ContextType::of::<Loop>();
        assert!(looped.refines(looped));
        assert!(!looped.refines(ContextType::of::<Root>()));
    }

    #[test]
    fn test_deferrable_marker() {
        assert!(ContextType::of::<GrandChild>().is_deferrable());
        assert!(!ContextType::of::<Child>().is_deferrable());
    }

    #[test]
    fn test_short_name_strips_path_and_generics() {
        assert_eq!(ContextType::of::<Child>().short_name(), "Child");
        assert_eq!(ContextType::of::<Wrapper<u8>>().short_name(), "Wrapper");
        assert!(ContextType::of::<Child>().name().ends_with("::Child"));
    }

    #[test]
    fn test_erased_downcast() {
        let boxed: Box<dyn AnyContext> = Box::new(GrandChild(7));
        assert_eq!(boxed.context_type(), ContextType::of::<GrandChild>());
        assert!(boxed.is::<GrandChild>());
        assert_eq!(boxed.downcast_ref::<GrandChild>().map(|c| c.0), Some(7));
        assert!(boxed.downcast_ref::<Child>().is_none());
    }
}
