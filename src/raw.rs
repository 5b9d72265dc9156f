//! Handles the accounting of the handles to a control block.
//!
//! The raw handles are never empty: the public handles wrap them in an `Option` instead.

use core::{marker::PhantomData, mem::ManuallyDrop, ptr::NonNull};

use crate::ControlBlock;

/// Reference-counted raw handle, owning one strong unit.
pub(crate) struct RawStrong<T>
where
    T: ?Sized,
{
    //  Invariant:
    //  -   Alive: `ptr` is alive as long as the strong count of `block` is > 0.
    ptr: NonNull<T>,
    block: NonNull<ControlBlock>,
    _marker: PhantomData<T>,
}

/// Reference-counted raw handle, owning one weak unit.
pub(crate) struct RawWeak<T>
where
    T: ?Sized,
{
    //  Invariant:
    //  -   Alive: `ptr` is alive as long as the strong count of `block` is > 0.
    ptr: NonNull<T>,
    block: NonNull<ControlBlock>,
}

//
//  Conversions
//

impl<T> RawStrong<T>
where
    T: ?Sized,
{
    /// Constructs an instance from its parts.
    ///
    /// #   Safety
    ///
    /// -   Accounting: one strong unit of `block` is transferred to the result.
    /// -   Alive: `ptr` remains alive as long as the strong count of `block` is > 0.
    #[inline(always)]
    pub(crate) unsafe fn from_parts(ptr: NonNull<T>, block: NonNull<ControlBlock>) -> Self {
        let _marker = PhantomData;

        Self { ptr, block, _marker }
    }
}

impl<T> RawWeak<T>
where
    T: ?Sized,
{
    /// Forgets the weak unit, without accounting.
    ///
    /// #   Safety
    ///
    /// -   Accounting: the weak unit is accounted for by the caller.
    #[inline(always)]
    pub(crate) unsafe fn forget(self) {
        let _ = ManuallyDrop::new(self);
    }
}

//
//  Promotion & Demotion
//

impl<T> RawStrong<T>
where
    T: ?Sized,
{
    /// Constructs a new `RawWeak` pointer to this block.
    #[inline(always)]
    pub(crate) fn downgrade(this: &Self) -> RawWeak<T> {
        //  Safety:
        //  -   Accounting: the number of weak handles is increased by one.
        unsafe { this.block().increment_weak() };

        RawWeak {
            ptr: this.ptr,
            block: this.block,
        }
    }

    /// Constructs a new `RawStrong` sharing this block, but pointing to `ptr`.
    ///
    /// #   Safety
    ///
    /// -   Alive: `ptr` remains alive as long as the value of this block is.
    #[inline(always)]
    pub(crate) unsafe fn alias<U>(this: &Self, ptr: NonNull<U>) -> RawStrong<U>
    where
        U: ?Sized,
    {
        //  Safety:
        //  -   Accounting: the number of strong handles is increased by one.
        unsafe { this.block().increment_strong() };

        //  Safety:
        //  -   Accounting: the freshly acquired strong unit is transferred.
        //  -   Alive: as per pre-condition.
        unsafe { RawStrong::from_parts(ptr, this.block) }
    }
}

impl<T> RawWeak<T>
where
    T: ?Sized,
{
    /// Attempts to upgrade the `RawWeak` pointer to a `RawStrong`.
    ///
    /// Returns `None` if the value has already been dropped.
    #[inline(always)]
    pub(crate) fn upgrade(this: &Self) -> Option<RawStrong<T>> {
        //  Safety:
        //  -   Accounting: the number of strong handles is increased by one on success.
        let upgraded = unsafe { this.block().try_increment_strong() };

        upgraded.then(|| RawStrong {
            ptr: this.ptr,
            block: this.block,
            _marker: PhantomData,
        })
    }
}

//
//  Destruction
//

impl<T> Drop for RawStrong<T>
where
    T: ?Sized,
{
    fn drop(&mut self) {
        //  Safety:
        //  -   Accounting: one less strong instance exists after `drop`.
        //  -   EndOfLife: `self.block` is not used any longer.
        unsafe { ControlBlock::decrement_strong(self.block) };
    }
}

impl<T> Drop for RawWeak<T>
where
    T: ?Sized,
{
    fn drop(&mut self) {
        //  Safety:
        //  -   Accounting: one less weak instance exists after `drop`.
        //  -   EndOfLife: `self.block` is not used any longer.
        unsafe { ControlBlock::decrement_weak(self.block) };
    }
}

//
//  High-level Access
//

impl<T> RawStrong<T>
where
    T: ?Sized,
{
    /// Returns the number of strong handles.
    #[inline(always)]
    pub(crate) fn strong_count(&self) -> usize {
        self.block().strong_count()
    }

    /// Returns the number of weak handles.
    #[inline(always)]
    pub(crate) fn weak_count(&self) -> usize {
        self.block().weak_count()
    }

    /// Returns a reference to the value.
    #[inline(always)]
    pub(crate) fn as_ref(&self) -> &T {
        //  Safety:
        //  -   Alive: this handle guarantees that the value is alive, and will remain so as long as this handle is
        //      borrowed.
        unsafe { self.ptr.as_ref() }
    }

    /// Returns a pointer to the value.
    #[inline(always)]
    pub(crate) const fn as_non_null(&self) -> NonNull<T> {
        self.ptr
    }

    /// Returns a reference to the control block.
    #[inline(always)]
    pub(crate) fn block(&self) -> &ControlBlock {
        //  Safety:
        //  -   Lifetime: this handle guarantees that the block is alive, and will remain so as long as this handle is
        //      borrowed.
        unsafe { self.block.as_ref() }
    }
}

impl<T> RawWeak<T>
where
    T: ?Sized,
{
    /// Returns the number of strong handles.
    #[inline(always)]
    pub(crate) fn strong_count(&self) -> usize {
        self.block().strong_count()
    }

    /// Returns the number of weak handles.
    #[inline(always)]
    pub(crate) fn weak_count(&self) -> usize {
        self.block().weak_count()
    }

    /// Returns a pointer to the value, which may be dangling.
    #[inline(always)]
    pub(crate) const fn as_non_null(&self) -> NonNull<T> {
        self.ptr
    }

    /// Returns a reference to the control block.
    #[inline(always)]
    pub(crate) fn block(&self) -> &ControlBlock {
        //  Safety:
        //  -   Lifetime: this handle guarantees that the block is alive, and will remain so as long as this handle is
        //      borrowed.
        unsafe { self.block.as_ref() }
    }
}

//
//  Clone
//

impl<T> Clone for RawStrong<T>
where
    T: ?Sized,
{
    fn clone(&self) -> Self {
        //  Safety:
        //  -   Accounting: the number of strong handles is increased by one.
        unsafe { self.block().increment_strong() };

        Self {
            ptr: self.ptr,
            block: self.block,
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for RawWeak<T>
where
    T: ?Sized,
{
    fn clone(&self) -> Self {
        //  Safety:
        //  -   Accounting: the number of weak handles is increased by one.
        unsafe { self.block().increment_weak() };

        Self {
            ptr: self.ptr,
            block: self.block,
        }
    }
}
