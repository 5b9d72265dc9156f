//! Shared, weak, and self-aware reference counted pointers.
//!
//! #   Available pointers
//!
//! -   `StrongRef<T>`: a shared owner of a value, possibly empty, equivalent to `Rc<T>`.
//! -   `WeakRef<T>`: an observer of a shared value, possibly empty, equivalent to `Weak<T>`.
//!
//! A value implementing `SharedFromSelf` may, in addition, obtain either to itself.
//!
//! #   Allocation strategies
//!
//! All handles to a value share a single control block, counting the strong and weak handles. The control block comes
//! in two forms, selected by the construction function:
//!
//! -   In place, with `StrongRef::new` or `make_shared`: the value is constructed within the control block, for a
//!     single allocation. The value is dropped in place when the last strong handle goes away, while the memory is
//!     released with the block.
//! -   Owning, with `StrongRef::from_box`: the control block points to the value, in its own allocation. The value and
//!     its allocation go away with the last strong handle.
//!
//! In either case, the block itself is released once no strong nor weak handle remains.
//!
//! ```txt
//! +--------+------+-----+-------+        +--------+------+-----+-----+        +-------+
//! | strong | weak | ops | value |        | strong | weak | ops | ptr | -----> | value |
//! +--------+------+-----+-------+        +--------+------+-----+-----+        +-------+
//!            in place                                 owning
//! ```
//!
//! #   Self-aware values
//!
//! A self-aware value holds a weak handle to itself, bound by the self-aware construction functions. When the last
//! strong handle goes away while this is the only weak handle left, the value and the block are released together.
//!
//! #   Threads
//!
//! The counts are not atomic: the handles are neither `Send` nor `Sync`.

//  Use only core, with `alloc` for the allocations.
#![cfg_attr(not(test), no_std)]
//  Lints
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(missing_docs)]

//  Non-core must be explicitly depended on in no_std.
extern crate alloc;

mod block;
mod error;
mod in_place;
mod owning;
mod raw;
mod self_aware;
mod strong;
mod weak;

#[cfg(test)]
mod testing;

pub use error::RefError;
pub use self_aware::{SelfSlot, SharedFromSelf};
pub use strong::{make_shared, make_shared_self_aware, make_shared_with, StrongRef};
pub use weak::WeakRef;

pub(crate) use block::{BlockOps, ControlBlock};
pub(crate) use in_place::InPlaceBlock;
pub(crate) use owning::OwningBlock;
pub(crate) use raw::{RawStrong, RawWeak};
