//! The control block: the bookkeeping shared by all the handles to a value.
//!
//! Every allocation strategy places a `ControlBlock` at the start of its own block, so that handles only ever need a
//! `NonNull<ControlBlock>`, regardless of how the value is stored.

use core::{cell::Cell, ptr::NonNull};

/// The operations specific to an allocation strategy.
///
/// Selected once and for all by the factory which allocated the block.
#[derive(Clone, Copy)]
pub(crate) struct BlockOps {
    /// Drops the value, in place or along with its separate allocation.
    pub(crate) drop_value: unsafe fn(NonNull<ControlBlock>),
    /// Releases the memory of the block, the value having been dropped already.
    pub(crate) deallocate: unsafe fn(NonNull<ControlBlock>),
    /// Detaches the weak reference a self-aware value holds to itself, without accounting.
    ///
    /// Returns whether a weak reference was detached. `None` if the value is not self-aware.
    pub(crate) detach_self: Option<unsafe fn(NonNull<ControlBlock>) -> bool>,
}

/// The header of a control block, holding a strong and a weak count.
///
/// The strong count represents the number of strong handles to the value, ie the number of instances of `RawStrong`.
/// The value is dropped (in place or not) when the strong count reaches 0.
///
/// The weak count represents the number of weak handles to the block, ie the number of instances of `RawWeak`,
/// including the one a self-aware value holds to itself. The block is released when both counts are 0.
#[repr(C)]
pub(crate) struct ControlBlock {
    strong: Cell<usize>,
    weak: Cell<usize>,
    ops: BlockOps,
}

impl ControlBlock {
    /// Constructs a header.
    ///
    /// A freshly constructed header has a strong count of exactly 1, and a weak count of exactly 0.
    pub(crate) fn new(ops: BlockOps) -> Self {
        tracking::allocated();

        let strong = Cell::new(1);
        let weak = Cell::new(0);

        Self { strong, weak, ops }
    }

    /// Returns the strong count, ie the number of strong handles.
    #[inline(always)]
    pub(crate) fn strong_count(&self) -> usize {
        self.strong.get()
    }

    /// Returns the weak count, ie the number of weak handles.
    #[inline(always)]
    pub(crate) fn weak_count(&self) -> usize {
        self.weak.get()
    }

    /// Increments the strong count.
    ///
    /// #   Safety
    ///
    /// -   Accounting: the caller guarantees that the incremented count faithfully represents the number of strong
    ///     handles.
    #[inline(always)]
    pub(crate) unsafe fn increment_strong(&self) {
        debug_assert!(self.strong.get() > 0);

        self.strong.set(self.strong.get() + 1);
    }

    /// Tries to increment the strong count, unless it is already zero.
    ///
    /// Returns whether the increment succeeded.
    ///
    /// #   Safety
    ///
    /// -   Accounting: as per `increment_strong`, on success.
    #[inline(always)]
    pub(crate) unsafe fn try_increment_strong(&self) -> bool {
        let strong = self.strong.get();

        if strong == 0 {
            return false;
        }

        self.strong.set(strong + 1);

        true
    }

    /// Increments the weak count.
    ///
    /// #   Safety
    ///
    /// -   Accounting: the caller guarantees that the incremented count faithfully represents the number of weak
    ///     handles.
    #[inline(always)]
    pub(crate) unsafe fn increment_weak(&self) {
        self.weak.set(self.weak.get() + 1);
    }

    /// Decrements the strong count.
    ///
    /// On reaching 0, drops the value, then releases the block if no weak handle remains.
    ///
    /// #   Safety
    ///
    /// -   Accounting: the caller relinquishes one strong handle.
    /// -   EndOfLife: `this` SHALL NOT be used after this call, unless the caller holds another handle.
    #[inline]
    pub(crate) unsafe fn decrement_strong(this: NonNull<Self>) {
        //  Safety:
        //  -   Lifetime: the caller holds a strong handle, hence the block is alive.
        let block = unsafe { this.as_ref() };

        debug_assert!(block.strong.get() > 0);

        let strong = block.strong.get() - 1;
        block.strong.set(strong);

        if strong > 0 {
            return;
        }

        //  Safety:
        //  -   Accounting: strong count reached 0.
        unsafe { Self::teardown(this) };
    }

    /// Decrements the weak count.
    ///
    /// Releases the block if no handle remains.
    ///
    /// #   Safety
    ///
    /// -   Accounting: the caller relinquishes one weak handle.
    /// -   EndOfLife: `this` SHALL NOT be used after this call, unless the caller holds another handle.
    #[inline]
    pub(crate) unsafe fn decrement_weak(this: NonNull<Self>) {
        //  Safety:
        //  -   Lifetime: the caller holds a weak handle, hence the block is alive.
        let block = unsafe { this.as_ref() };

        debug_assert!(block.weak.get() > 0);

        let weak = block.weak.get() - 1;
        block.weak.set(weak);

        if block.strong.get() + weak > 0 {
            return;
        }

        //  Safety:
        //  -   Accounting: both counts reached 0.
        unsafe { Self::deallocate(this) };
    }

    /// Releases the memory of the block.
    ///
    /// #   Safety
    ///
    /// -   EndOfLife: the value is dropped, or was never constructed, and no handle to the block remains.
    #[inline(never)]
    pub(crate) unsafe fn deallocate(this: NonNull<Self>) {
        //  Safety:
        //  -   Lifetime: the block is only released below.
        let deallocate = unsafe { this.as_ref().ops.deallocate };

        log::trace!(target: "endor-shared", "releasing control block {:p}", this);

        tracking::released();

        //  Safety:
        //  -   EndOfLife: as per pre-condition.
        unsafe { deallocate(this) };
    }

    //  Safety:
    //  -   Accounting: should only be invoked when the strong count reaches 0.
    #[inline(never)]
    unsafe fn teardown(this: NonNull<Self>) {
        //  Releases the block, if need be, even if the value panics during its drop.
        struct HoldGuard(NonNull<ControlBlock>);

        impl Drop for HoldGuard {
            fn drop(&mut self) {
                //  Safety:
                //  -   Accounting: releases the weak handle held by `teardown`.
                unsafe { ControlBlock::decrement_weak(self.0) };
            }
        }

        let ops = {
            //  Safety:
            //  -   Lifetime: the weak count cannot reach 0 before the hold is taken.
            let block = unsafe { this.as_ref() };

            if let Some(detach_self) = block.ops.detach_self {
                //  The only weak handle left is the value's own: it goes down with the value.
                //
                //  Safety:
                //  -   Droppable: the value is still alive, only its weak handle is forgotten.
                if block.weak.get() == 1 && unsafe { detach_self(this) } {
                    block.weak.set(0);
                }
            }

            //  Hold the block while the value is dropped, as its destructor may release weak handles.
            block.weak.set(block.weak.get() + 1);

            block.ops
        };

        let _guard = HoldGuard(this);

        log::trace!(target: "endor-shared", "strong count of {:p} reached 0, dropping value", this);

        //  Safety:
        //  -   Droppable: the value has been alive until now, since the strong count was > 0.
        //  -   EndOfLife: the value will no longer be accessed, since this was the last strong handle.
        unsafe { (ops.drop_value)(this) };
    }
}

#[cfg(not(test))]
mod tracking {
    #[inline(always)]
    pub(super) fn allocated() {}

    #[inline(always)]
    pub(super) fn released() {}
}


// mod tests
