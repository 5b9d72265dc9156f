//! Values able to obtain a reference to themselves.
//!
//! A self-aware value embeds a `SelfSlot`, which is bound to the value's control block by the self-aware construction
//! functions (`StrongRef::new_self_aware`, `StrongRef::from_box_self_aware`, and `make_shared_self_aware`) before they
//! return. From then on, the value may hand out `StrongRef` and `WeakRef` to itself.
//!
//! ```
//! use endor_shared::{make_shared_self_aware, SelfSlot, SharedFromSelf, StrongRef};
//!
//! struct Node {
//!     slot: SelfSlot<Node>,
//!     name: String,
//! }
//!
//! impl SharedFromSelf for Node {
//!     fn self_slot(&self) -> &SelfSlot<Self> {
//!         &self.slot
//!     }
//! }
//!
//! let node = make_shared_self_aware(Node { slot: SelfSlot::new(), name: String::from("root") });
//!
//! let again = node.shared_from_self();
//!
//! assert_eq!(2, StrongRef::use_count(&node));
//! assert_eq!("root", again.name);
//! ```

use core::{cell::Cell, fmt};

use crate::{RefError, StrongRef, WeakRef};

/// A value able to obtain a reference to itself.
///
/// The self slot is only bound when the value is constructed with one of the self-aware construction functions. A
/// value constructed otherwise, or not shared at all, gets empty references to itself.
pub trait SharedFromSelf: Sized {
    /// Returns the self slot of the value.
    fn self_slot(&self) -> &SelfSlot<Self>;

    /// Returns a `StrongRef` to this value.
    ///
    /// The result is empty if the self slot is unbound, or the value is being dropped.
    fn shared_from_self(&self) -> StrongRef<Self> {
        self.self_slot().lock()
    }

    /// Returns a `StrongRef` to this value.
    ///
    /// Fails if the self slot is unbound, or the value is being dropped.
    fn try_shared_from_self(&self) -> Result<StrongRef<Self>, RefError> {
        let weak = self.self_slot().get();

        StrongRef::try_from(&weak)
    }

    /// Returns a `WeakRef` to this value, possibly expired.
    fn weak_from_self(&self) -> WeakRef<Self> {
        self.self_slot().get()
    }
}

/// The weak reference a self-aware value holds to itself.
///
/// A fresh slot is unbound. Cloning a slot yields an unbound slot, as a clone is a different value.
pub struct SelfSlot<T> {
    weak: Cell<Option<WeakRef<T>>>,
}

impl<T> SelfSlot<T> {
    /// Constructs an unbound slot.
    #[inline(always)]
    pub const fn new() -> Self {
        Self { weak: Cell::new(None) }
    }

    /// Returns whether the slot is bound to a control block.
    pub fn is_bound(&self) -> bool {
        let weak = self.weak.take();
        let is_bound = weak.is_some();

        self.weak.set(weak);

        is_bound
    }

    /// Binds the slot to `weak`, unless already bound.
    pub(crate) fn bind(&self, weak: WeakRef<T>) {
        let previous = self.weak.take();

        debug_assert!(previous.is_none(), "self slot bound twice");

        self.weak.set(Some(previous.unwrap_or(weak)));
    }

    /// Detaches the weak reference, without releasing its unit.
    ///
    /// Returns whether the slot was bound.
    pub(crate) fn detach(&self) -> bool {
        let Some(mut weak) = self.weak.take() else {
            return false;
        };

        weak.detach()
    }

    //  Returns a copy of the weak reference, or an empty one.
    fn get(&self) -> WeakRef<T> {
        let weak = self.weak.take();
        let copy = weak.clone().unwrap_or_default();

        self.weak.set(weak);

        copy
    }

    fn lock(&self) -> StrongRef<T> {
        self.get().lock()
    }
}

impl<T> Clone for SelfSlot<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> Default for SelfSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SelfSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("SelfSlot").field("bound", &self.is_bound()).finish()
    }
}

// mod tests
