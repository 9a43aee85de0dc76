//! Macros for reducing context boilerplate.

/// Implement [`Context`](crate::Context) for a type in one line.
///
/// The optional `: Parent` names the context the type refines; a trailing
/// `, deferrable` marks it eligible for behavior-queue replay.
///
/// # Example
///
/// ```
/// use herald_core::{context, ContextType};
///
/// #[derive(Debug)]
/// struct NetworkStatus;
///
/// #[derive(Debug)]
/// struct ServiceStatusUpdate {
///     up: bool,
/// }
///
/// #[derive(Debug)]
/// struct MaintenanceNotice {
///     message: String,
/// }
///
/// context!(NetworkStatus);
/// context!(ServiceStatusUpdate: NetworkStatus);
/// context!(MaintenanceNotice: NetworkStatus, deferrable);
///
/// let notice = ContextType::of::<MaintenanceNotice>();
/// assert!(notice.is_deferrable());
/// assert!(notice.refines(ContextType::of::<NetworkStatus>()));
/// ```
#[macro_export]
macro_rules! context {
    ($ty:ty : $parent:ty, deferrable) => {
        impl $crate::Context for $ty {
            fn refines() -> ::std::option::Option<$crate::ContextType> {
                ::std::option::Option::Some($crate::ContextType::of::<$parent>())
            }

            fn deferrable() -> bool {
                true
            }
        }
    };
    ($ty:ty, deferrable) => {
        impl $crate::Context for $ty {
            fn deferrable() -> bool {
                true
            }
        }
    };
    ($ty:ty : $parent:ty) => {
        impl $crate::Context for $ty {
            fn refines() -> ::std::option::Option<$crate::ContextType> {
                ::std::option::Option::Some($crate::ContextType::of::<$parent>())
            }
        }
    };
    ($ty:ty) => {
        impl $crate::Context for $ty {}
    };
}
