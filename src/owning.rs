//! A control block owning a separately allocated value.

use core::ptr::NonNull;

use alloc::boxed::Box;

use crate::{BlockOps, ControlBlock, SharedFromSelf};

/// A control block pointing to a value in its own allocation.
///
/// The value is dropped, and its allocation released, when the strong count reaches 0. The block itself lives on
/// until the weak count reaches 0 as well.
#[repr(C)]
pub(crate) struct OwningBlock<T>
where
    T: ?Sized,
{
    //  Must be first, handles only know of `ControlBlock`.
    header: ControlBlock,
    value: NonNull<T>,
}

impl<T> OwningBlock<T>
where
    T: ?Sized,
{
    /// Allocates a block taking ownership of `value`.
    ///
    /// Returns the block, with a strong count of 1 attributed to the caller, and the value.
    pub(crate) fn allocate(value: Box<T>) -> (NonNull<ControlBlock>, NonNull<T>) {
        Self::allocate_with(value, None)
    }

    fn allocate_with(
        value: Box<T>,
        detach_self: Option<unsafe fn(NonNull<ControlBlock>) -> bool>,
    ) -> (NonNull<ControlBlock>, NonNull<T>) {
        let value = NonNull::from(Box::leak(value));

        let ops = BlockOps {
            drop_value: Self::drop_value,
            deallocate: Self::deallocate,
            detach_self,
        };

        let header = ControlBlock::new(ops);

        let block = NonNull::from(Box::leak(Box::new(Self { header, value })));

        (block.cast(), value)
    }

    //  Safety:
    //  -   Droppable: the value is alive, and will never be accessed again.
    unsafe fn drop_value(this: NonNull<ControlBlock>) {
        //  Safety:
        //  -   Layout: `ControlBlock` is the first field of a `#[repr(C)]` struct.
        //  -   Lifetime: the block is held during the drop of the value.
        let value = unsafe { this.cast::<Self>().as_ref().value };

        //  Safety:
        //  -   RoundTrip: `value` was obtained from `Box::leak`.
        //  -   Droppable: as per pre-condition.
        drop(unsafe { Box::from_raw(value.as_ptr()) });
    }

    //  Safety:
    //  -   EndOfLife: the block will never be accessed again.
    unsafe fn deallocate(this: NonNull<ControlBlock>) {
        //  Safety:
        //  -   RoundTrip: `this` was obtained from `Box::leak`, then cast.
        //  -   EndOfLife: as per pre-condition.
        drop(unsafe { Box::from_raw(this.cast::<Self>().as_ptr()) });
    }
}

impl<T> OwningBlock<T>
where
    T: SharedFromSelf,
{
    /// Allocates a block taking ownership of the self-aware `value`.
    ///
    /// The self slot of `value` is left for the caller to fill.
    pub(crate) fn allocate_self_aware(value: Box<T>) -> (NonNull<ControlBlock>, NonNull<T>) {
        Self::allocate_with(value, Some(Self::detach_self))
    }

    //  Safety:
    //  -   Alive: the value is alive.
    unsafe fn detach_self(this: NonNull<ControlBlock>) -> bool {
        //  Safety:
        //  -   Layout: `ControlBlock` is the first field of a `#[repr(C)]` struct.
        //  -   Lifetime: the block is alive, as the value is.
        let value = unsafe { this.cast::<Self>().as_ref().value };

        //  Safety:
        //  -   Alive: as per pre-condition.
        let value = unsafe { value.as_ref() };

        value.self_slot().detach()
    }
}

// mod tests
