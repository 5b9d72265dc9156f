//! A control block embedding its value, for a single allocation.

use core::{cell::UnsafeCell, mem::MaybeUninit, ptr::{self, NonNull}};

use alloc::boxed::Box;

use crate::{BlockOps, ControlBlock, SharedFromSelf};

/// A control block with the storage for its value.
///
/// The value is dropped in place when the strong count reaches 0, while the storage is only released alongside the
/// block, when the weak count reaches 0 as well.
#[repr(C)]
pub(crate) struct InPlaceBlock<T> {
    //  Must be first, handles only know of `ControlBlock`.
    header: ControlBlock,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> InPlaceBlock<T> {
    /// Allocates a block, then constructs the value in it.
    ///
    /// Returns the block, with a strong count of 1 attributed to the caller, and the value.
    ///
    /// If `construct` panics, the block is released.
    pub(crate) fn allocate<F>(construct: F) -> (NonNull<ControlBlock>, NonNull<T>)
    where
        F: FnOnce() -> T,
    {
        Self::allocate_with(construct, None)
    }

    fn allocate_with<F>(
        construct: F,
        detach_self: Option<unsafe fn(NonNull<ControlBlock>) -> bool>,
    ) -> (NonNull<ControlBlock>, NonNull<T>)
    where
        F: FnOnce() -> T,
    {
        //  Releases the block if `construct` panics, the value was never constructed.
        struct AbandonGuard(NonNull<ControlBlock>);

        impl Drop for AbandonGuard {
            fn drop(&mut self) {
                //  Safety:
                //  -   EndOfLife: no handle was ever handed out.
                unsafe { ControlBlock::deallocate(self.0) };
            }
        }

        let ops = BlockOps {
            drop_value: Self::drop_value,
            deallocate: Self::deallocate,
            detach_self,
        };

        let header = ControlBlock::new(ops);
        let value = UnsafeCell::new(MaybeUninit::uninit());

        let block = NonNull::from(Box::leak(Box::new(Self { header, value })));

        let guard = AbandonGuard(block.cast());

        //  Safety:
        //  -   Lifetime: the block was just allocated.
        let slot = unsafe { Self::value_ptr(block.cast()) };

        //  Safety:
        //  -   Writable: `slot` is suitably sized & aligned for `T`, and no reference to it exists.
        unsafe { slot.as_ptr().write(construct()) };

        core::mem::forget(guard);

        (block.cast(), slot)
    }

    //  Safety:
    //  -   Lifetime: the block is alive.
    unsafe fn value_ptr(this: NonNull<ControlBlock>) -> NonNull<T> {
        let block = this.cast::<Self>().as_ptr();

        //  Safety:
        //  -   InBounds: as per pre-condition.
        let cell = unsafe { ptr::addr_of_mut!((*block).value) };

        //  Safety:
        //  -   NonNull: derived from a non-null pointer.
        unsafe { NonNull::new_unchecked(UnsafeCell::raw_get(cell).cast::<T>()) }
    }

    //  Safety:
    //  -   Droppable: the value is alive, and will never be accessed again.
    unsafe fn drop_value(this: NonNull<ControlBlock>) {
        //  Safety:
        //  -   Lifetime: the block is held during the drop of the value.
        let value = unsafe { Self::value_ptr(this) };

        //  Safety:
        //  -   Droppable: as per pre-condition.
        unsafe { value.as_ptr().drop_in_place() };
    }

    //  Safety:
    //  -   EndOfLife: the block will never be accessed again, and the value is not alive.
    unsafe fn deallocate(this: NonNull<ControlBlock>) {
        //  Safety:
        //  -   RoundTrip: `this` was obtained from `Box::leak`, then cast.
        //  -   EndOfLife: as per pre-condition, `MaybeUninit` will not drop the value a second time.
        drop(unsafe { Box::from_raw(this.cast::<Self>().as_ptr()) });
    }
}

impl<T> InPlaceBlock<T>
where
    T: SharedFromSelf,
{
    /// Allocates a block, then constructs the self-aware value in it.
    ///
    /// The self slot of the value is left for the caller to fill.
    pub(crate) fn allocate_self_aware<F>(construct: F) -> (NonNull<ControlBlock>, NonNull<T>)
    where
        F: FnOnce() -> T,
    {
        Self::allocate_with(construct, Some(Self::detach_self))
    }

    //  Safety:
    //  -   Alive: the value is alive.
    unsafe fn detach_self(this: NonNull<ControlBlock>) -> bool {
        //  Safety:
        //  -   Lifetime: the block is alive, as the value is.
        let value = unsafe { Self::value_ptr(this) };

        //  Safety:
        //  -   Alive: as per pre-condition.
        let value = unsafe { value.as_ref() };

        value.self_slot().detach()
    }
}

// mod tests
