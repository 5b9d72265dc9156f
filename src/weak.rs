//! Observation of a shared value, through weak references.
//!
//! A `WeakRef` does not keep its value alive, only its control block. It may be promoted to a `StrongRef` as long as
//! the value is alive.

use core::{fmt, mem};

use crate::{RawWeak, StrongRef};

/// A weak reference to a value, possibly empty.
///
/// Equivalent to `Weak<T>`. An empty `WeakRef` is always expired.
///
/// A `WeakRef` to a part of the value, or to a trait object, is obtained by downgrading a projection:
/// `StrongRef::downgrade(&StrongRef::project(&strong, |value| &value.field))`.
pub struct WeakRef<T>
where
    T: ?Sized,
{
    inner: Option<RawWeak<T>>,
}

//
//  Construction
//

impl<T> WeakRef<T>
where
    T: ?Sized,
{
    /// Constructs an empty instance.
    #[inline(always)]
    pub const fn empty() -> Self {
        Self { inner: None }
    }

    #[inline(always)]
    pub(crate) fn from_inner(inner: Option<RawWeak<T>>) -> Self {
        Self { inner }
    }
}

impl<T> Default for WeakRef<T>
where
    T: ?Sized,
{
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> From<&StrongRef<T>> for WeakRef<T>
where
    T: ?Sized,
{
    fn from(strong: &StrongRef<T>) -> Self {
        StrongRef::downgrade(strong)
    }
}

//
//  Promotion
//

impl<T> WeakRef<T>
where
    T: ?Sized,
{
    /// Attempts to promote to a `StrongRef`.
    ///
    /// Returns an empty `StrongRef` if the value has already been dropped, in which case no count is modified.
    pub fn lock(&self) -> StrongRef<T> {
        StrongRef::from_inner(self.inner.as_ref().and_then(RawWeak::upgrade))
    }
}

//
//  Modification
//

impl<T> WeakRef<T>
where
    T: ?Sized,
{
    /// Releases the weak unit, if any, leaving the instance empty.
    #[inline(always)]
    pub fn reset(&mut self) {
        self.inner = None;
    }

    /// Swaps the content of `self` and `other`.
    #[inline(always)]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(&mut self.inner, &mut other.inner);
    }

    /// Leaves the instance empty, without releasing its weak unit.
    ///
    /// Returns whether the instance was bound.
    ///
    /// Only for the teardown of a self-aware value, whose own weak unit is accounted for by the control block.
    pub(crate) fn detach(&mut self) -> bool {
        let Some(inner) = self.inner.take() else {
            return false;
        };

        //  Safety:
        //  -   Accounting: the control block accounts for the unit, as per contract.
        unsafe { inner.forget() };

        true
    }
}

//
//  High-level Access
//

impl<T> WeakRef<T>
where
    T: ?Sized,
{
    /// Returns the number of strong handles, or 0 if empty.
    #[inline(always)]
    pub fn use_count(&self) -> usize {
        self.inner.as_ref().map_or(0, RawWeak::strong_count)
    }

    /// Returns the number of weak handles, or 0 if empty.
    #[inline(always)]
    pub fn weak_count(&self) -> usize {
        self.inner.as_ref().map_or(0, RawWeak::weak_count)
    }

    /// Returns whether the value has been dropped, or whether the instance is empty.
    #[inline(always)]
    pub fn expired(&self) -> bool {
        self.use_count() == 0
    }

    /// Returns whether both point to the same address, or are both empty.
    #[inline(always)]
    pub fn ptr_eq<U>(&self, other: &WeakRef<U>) -> bool
    where
        U: ?Sized,
    {
        self.address() == other.address()
    }

    #[inline(always)]
    fn address(&self) -> usize {
        self.inner
            .as_ref()
            .map_or(0, |inner| inner.as_non_null().cast::<u8>().as_ptr() as usize)
    }

    //  Returns whether both share the same pointer and block, ie whether assigning one to the other is a no-op.
    fn is_same(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (Some(this), Some(other)) => {
                this.as_non_null().cast::<u8>() == other.as_non_null().cast::<u8>()
                    && core::ptr::eq(this.block(), other.block())
            }
            (None, None) => true,
            _ => false,
        }
    }
}

//
//  Clone
//

impl<T> Clone for WeakRef<T>
where
    T: ?Sized,
{
    fn clone(&self) -> Self {
        let inner = self.inner.clone();

        Self { inner }
    }

    fn clone_from(&mut self, source: &Self) {
        if self.is_same(source) {
            return;
        }

        self.reset();

        self.inner = source.inner.clone();
    }
}

//
//  Formatting
//

impl<T> fmt::Debug for WeakRef<T>
where
    T: ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("WeakRef")
            .field("use_count", &self.use_count())
            .field("weak_count", &self.weak_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use core::ptr::NonNull;

    use super::*;

    use crate::{
        make_shared, ControlBlock,
        testing::{live_blocks, Canary},
    };

    #[test]
    fn empty() {
        let mut weak = WeakRef::<String>::default();

        assert!(weak.expired());
        assert_eq!(0, weak.use_count());
        assert_eq!(0, weak.weak_count());
        assert!(StrongRef::is_empty(&weak.lock()));

        weak.reset();

        assert!(weak.expired());
    }

    #[test]
    fn downgrade_counts() {
        let strong = make_shared(String::from("Hello, World!"));
        let weak = WeakRef::from(&strong);

        assert_eq!(1, weak.use_count());
        assert_eq!(1, weak.weak_count());
        assert_eq!(1, StrongRef::weak_count(&strong));

        let clone = weak.clone();

        assert_eq!(2, StrongRef::weak_count(&strong));
        assert!(clone.ptr_eq(&weak));

        drop(clone);

        assert_eq!(1, StrongRef::weak_count(&strong));
        assert_eq!(1, StrongRef::use_count(&strong));
    }

    #[test]
    fn downgrade_empty() {
        let weak = StrongRef::downgrade(&StrongRef::<String>::empty());

        assert!(weak.expired());
        assert!(weak.ptr_eq(&WeakRef::<u8>::empty()));
    }

    #[test]
    fn lock_increments_by_one() {
        let strong = make_shared(String::from("Hello, World!"));
        let weak = StrongRef::downgrade(&strong);

        let before = weak.use_count();
        let locked = weak.lock();

        assert_eq!(before + 1, StrongRef::use_count(&locked));
        assert_eq!("Hello, World!", &*locked);
        assert!(StrongRef::ptr_eq(&strong, &locked));
    }

    #[test]
    fn lock_expired_is_empty() {
        let (canary, drops) = Canary::new();

        let strong = make_shared(canary);
        let weak = StrongRef::downgrade(&strong);

        drop(strong);

        assert_eq!(1, drops.get());
        assert!(weak.expired());
        assert_eq!(1, live_blocks());

        let locked = weak.lock();

        assert!(StrongRef::is_empty(&locked));
        assert_eq!(0, weak.use_count());
        assert_eq!(1, weak.weak_count());

        drop(weak);

        assert_eq!(0, live_blocks());
    }

    #[test]
    fn weak_outlives_strong() {
        let (canary, drops) = Canary::new();

        let strong = StrongRef::from_box(Box::new(canary));
        let mut first = StrongRef::downgrade(&strong);
        let second = first.clone();

        drop(strong);

        assert_eq!(1, drops.get());
        assert_eq!(1, live_blocks());

        first.reset();

        assert_eq!(1, live_blocks());

        drop(second);

        assert_eq!(1, drops.get());
        assert_eq!(0, live_blocks());
    }

    #[test]
    fn strong_outlives_weak() {
        let (canary, drops) = Canary::new();

        let strong = make_shared(canary);
        let weak = StrongRef::downgrade(&strong);

        drop(weak);

        assert_eq!(0, drops.get());
        assert_eq!(1, live_blocks());

        drop(strong);

        assert_eq!(1, drops.get());
        assert_eq!(0, live_blocks());
    }

    #[test]
    fn clone_from() {
        let one = make_shared(String::from("Hello"));
        let two = make_shared(String::from("World"));

        let mut weak = StrongRef::downgrade(&one);
        let same = weak.clone();

        weak.clone_from(&same);

        assert_eq!(2, StrongRef::weak_count(&one));

        weak.clone_from(&StrongRef::downgrade(&two));

        assert_eq!(1, StrongRef::weak_count(&one));
        assert_eq!(1, StrongRef::weak_count(&two));
        assert_eq!("World", &*weak.lock());
    }

    #[test]
    fn swap() {
        let strong = make_shared(String::from("Hello, World!"));

        let mut weak = StrongRef::downgrade(&strong);
        let mut empty = WeakRef::empty();

        weak.swap(&mut empty);

        assert!(weak.expired());
        assert!(!empty.expired());
        assert_eq!(1, StrongRef::weak_count(&strong));
    }

    #[test]
    fn detach_without_accounting() {
        let strong = make_shared(String::from("Hello, World!"));
        let mut weak = StrongRef::downgrade(&strong);

        let block = weak.inner.as_ref().map(|inner| NonNull::from(inner.block())).expect("bound");

        assert!(weak.detach());
        assert!(!weak.detach());
        assert!(weak.expired());
        assert_eq!(1, StrongRef::weak_count(&strong));

        //  Safety:
        //  -   Accounting: releases the unit forgotten by `detach`, the block remains alive.
        unsafe { ControlBlock::decrement_weak(block) };

        assert_eq!(0, StrongRef::weak_count(&strong));
    }

    #[test]
    fn downgrade_projection() {
        let (canary, drops) = Canary::new();

        let pair = make_shared((String::from("Hello, World!"), canary));
        let first = StrongRef::downgrade(&StrongRef::project(&pair, |pair| &pair.0));

        assert_eq!(1, first.use_count());
        assert_eq!(1, StrongRef::weak_count(&pair));
        assert_eq!("Hello, World!", &*first.lock());

        drop(pair);

        assert!(first.expired());
        assert_eq!(1, drops.get());
        assert_eq!(1, live_blocks());

        drop(first);

        assert_eq!(0, live_blocks());
    }

    #[test]
    fn debug() {
        let strong = make_shared(String::from("Hello, World!"));
        let weak = StrongRef::downgrade(&strong);

        assert_eq!("WeakRef { use_count: 1, weak_count: 1 }", format!("{weak:?}"));
    }
} // mod tests
