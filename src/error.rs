//! Errors from the library.

/// Errors returned by this library.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, thiserror::Error)]
pub enum RefError {
    /// The value referred to by the `WeakRef`, or the self slot, has already been dropped.
    #[error("dangling weak reference")]
    DanglingWeak,
}
