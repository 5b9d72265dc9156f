//! Shared ownership of a value, through strong references.
//!
//! A `StrongRef` keeps its value alive: the value is dropped when the last `StrongRef` to it is dropped or reset.

use core::{convert, fmt, hash, mem, ops, ptr::NonNull};

use alloc::boxed::Box;

use crate::{InPlaceBlock, OwningBlock, RawStrong, RefError, SharedFromSelf, WeakRef};

/// A strong reference to a value, possibly empty.
///
/// Equivalent to `Rc<T>`, with an empty state, and two allocation strategies:
///
/// -   In place, with `new` or `make_shared`: the value is constructed within the control block, in a single
///     allocation.
/// -   Owning, with `from_box`: the control block points to the separately allocated value.
///
/// Dereferencing an empty `StrongRef` panics. Use `StrongRef::get` to handle the empty state gracefully.
pub struct StrongRef<T>
where
    T: ?Sized,
{
    inner: Option<RawStrong<T>>,
}

/// Allocates a control block and moves `value` into it.
///
/// Equivalent to `StrongRef::new`.
///
/// The self slot of a `SharedFromSelf` value is left unbound: use `make_shared_self_aware` for such values.
#[inline(always)]
pub fn make_shared<T>(value: T) -> StrongRef<T> {
    StrongRef::new(value)
}

/// Allocates a control block, then constructs the value in it with `construct`.
///
/// Equivalent to `StrongRef::new_with`.
///
/// The self slot of a `SharedFromSelf` value is left unbound: use `StrongRef::new_self_aware_with` for such values.
#[inline(always)]
pub fn make_shared_with<T, F>(construct: F) -> StrongRef<T>
where
    F: FnOnce() -> T,
{
    StrongRef::new_with(construct)
}

/// Allocates a control block and moves the self-aware `value` into it.
///
/// Equivalent to `StrongRef::new_self_aware`.
#[inline(always)]
pub fn make_shared_self_aware<T>(value: T) -> StrongRef<T>
where
    T: SharedFromSelf,
{
    StrongRef::new_self_aware(value)
}

//
//  Conversion
//

impl<T> StrongRef<T>
where
    T: ?Sized,
{
    //  Safety:
    //  -   Accounting: one strong unit of `block` is transferred to the result.
    //  -   Alive: `ptr` remains alive as long as the strong count of `block` is > 0.
    #[inline(always)]
    unsafe fn from_block(ptr: NonNull<T>, block: NonNull<crate::ControlBlock>) -> Self {
        //  Safety:
        //  -   Accounting & Alive: as per pre-condition.
        let inner = unsafe { RawStrong::from_parts(ptr, block) };

        Self { inner: Some(inner) }
    }

    #[inline(always)]
    pub(crate) fn from_inner(inner: Option<RawStrong<T>>) -> Self {
        Self { inner }
    }
}

//
//  Construction
//

impl<T> StrongRef<T>
where
    T: ?Sized,
{
    /// Constructs an empty instance.
    #[inline(always)]
    pub const fn empty() -> Self {
        Self { inner: None }
    }

    /// Allocates a control block taking ownership of `value`.
    ///
    /// The self slot of a `SharedFromSelf` value is left unbound: use `from_box_self_aware` for such values.
    pub fn from_box(value: Box<T>) -> Self {
        let (block, ptr) = OwningBlock::allocate(value);

        //  Safety:
        //  -   Accounting: a fresh block has a strong count of 1.
        //  -   Alive: the block owns `ptr`.
        unsafe { Self::from_block(ptr, block) }
    }

    /// Allocates a control block taking ownership of `ptr`.
    ///
    /// Returns an empty instance if `ptr` is null.
    ///
    /// #   Safety
    ///
    /// -   RoundTrip: `ptr` must be null, or have been obtained by a call to `Box::into_raw`.
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        if ptr.is_null() {
            return Self::empty();
        }

        //  Safety:
        //  -   RoundTrip: as per pre-condition.
        let value = unsafe { Box::from_raw(ptr) };

        Self::from_box(value)
    }
}

impl<T> StrongRef<T> {
    /// Allocates a control block and moves `value` into it.
    ///
    /// The self slot of a `SharedFromSelf` value is left unbound: use `new_self_aware` for such values.
    #[inline(always)]
    pub fn new(value: T) -> Self {
        Self::new_with(move || value)
    }

    /// Allocates a control block, then constructs the value in it with `construct`.
    ///
    /// If `construct` panics, the control block is released. The self slot of a `SharedFromSelf` value is left
    /// unbound: use `new_self_aware_with` for such values.
    pub fn new_with<F>(construct: F) -> Self
    where
        F: FnOnce() -> T,
    {
        let (block, ptr) = InPlaceBlock::allocate(construct);

        //  Safety:
        //  -   Accounting: a fresh block has a strong count of 1.
        //  -   Alive: `ptr` lives within the block, and is only dropped when the strong count reaches 0.
        unsafe { Self::from_block(ptr, block) }
    }
}

impl<T> StrongRef<T>
where
    T: SharedFromSelf,
{
    /// Allocates a control block and moves the self-aware `value` into it.
    ///
    /// The self slot of the value is bound before returning.
    #[inline(always)]
    pub fn new_self_aware(value: T) -> Self {
        Self::new_self_aware_with(move || value)
    }

    /// Allocates a control block, then constructs the self-aware value in it with `construct`.
    ///
    /// The self slot of the value is bound before returning. If `construct` panics, the control block is released.
    pub fn new_self_aware_with<F>(construct: F) -> Self
    where
        F: FnOnce() -> T,
    {
        let (block, ptr) = InPlaceBlock::allocate_self_aware(construct);

        //  Safety:
        //  -   Accounting: a fresh block has a strong count of 1.
        //  -   Alive: `ptr` lives within the block, and is only dropped when the strong count reaches 0.
        let this = unsafe { Self::from_block(ptr, block) };

        Self::bind_self(this)
    }

    /// Allocates a control block taking ownership of the self-aware `value`.
    ///
    /// The self slot of the value is bound before returning.
    pub fn from_box_self_aware(value: Box<T>) -> Self {
        let (block, ptr) = OwningBlock::allocate_self_aware(value);

        //  Safety:
        //  -   Accounting: a fresh block has a strong count of 1.
        //  -   Alive: the block owns `ptr`.
        let this = unsafe { Self::from_block(ptr, block) };

        Self::bind_self(this)
    }

    //  Binds the self slot of a freshly allocated value, before any other handle exists.
    fn bind_self(this: Self) -> Self {
        let weak = Self::downgrade(&this);

        this.self_slot().bind(weak);

        this
    }
}

impl<T> Default for StrongRef<T>
where
    T: ?Sized,
{
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> From<Box<T>> for StrongRef<T>
where
    T: ?Sized,
{
    fn from(value: Box<T>) -> Self {
        Self::from_box(value)
    }
}

impl<T> TryFrom<&WeakRef<T>> for StrongRef<T>
where
    T: ?Sized,
{
    type Error = RefError;

    /// Promotes `weak`, or fails if its value has already been dropped.
    ///
    /// Unlike `WeakRef::lock`, an empty `WeakRef` is an error as well.
    fn try_from(weak: &WeakRef<T>) -> Result<Self, RefError> {
        let this = weak.lock();

        if Self::is_empty(&this) {
            log::debug!(target: "endor-shared", "failed to promote a dangling weak reference");

            return Err(RefError::DanglingWeak);
        }

        Ok(this)
    }
}

//
//  Modification
//

impl<T> StrongRef<T>
where
    T: ?Sized,
{
    /// Releases the strong unit, if any, leaving the instance empty.
    #[inline(always)]
    pub fn reset(this: &mut Self) {
        this.inner = None;
    }

    /// Releases the strong unit, if any, then allocates a control block taking ownership of `value`.
    pub fn reset_with(this: &mut Self, value: Box<T>) {
        Self::reset(this);

        *this = Self::from_box(value);
    }

    /// Swaps the content of `this` and `other`.
    #[inline(always)]
    pub fn swap(this: &mut Self, other: &mut Self) {
        mem::swap(&mut this.inner, &mut other.inner);
    }
}

//
//  Promotion & Aliasing
//

impl<T> StrongRef<T>
where
    T: ?Sized,
{
    /// Constructs a new `WeakRef` to this value.
    ///
    /// The result is empty if `this` is.
    pub fn downgrade(this: &Self) -> WeakRef<T> {
        WeakRef::from_inner(this.inner.as_ref().map(RawStrong::downgrade))
    }

    /// Constructs a new `StrongRef` sharing ownership with `this`, but pointing to `ptr`.
    ///
    /// The result is empty if `this` is.
    ///
    /// #   Safety
    ///
    /// -   Alive: `ptr` remains valid for reads as long as the value of `this` is alive.
    pub unsafe fn alias<U>(this: &Self, ptr: NonNull<U>) -> StrongRef<U>
    where
        U: ?Sized,
    {
        //  Safety:
        //  -   Alive: as per pre-condition.
        let inner = this.inner.as_ref().map(|inner| unsafe { RawStrong::alias(inner, ptr) });

        StrongRef { inner }
    }

    /// Constructs a new `StrongRef` sharing ownership with `this`, but pointing to a part of the value.
    ///
    /// Also performs pointer conversions, such as to a trait object. The result is empty if `this` is.
    pub fn project<U, F>(this: &Self, project: F) -> StrongRef<U>
    where
        U: ?Sized,
        F: FnOnce(&T) -> &U,
    {
        let Some(inner) = &this.inner else {
            return StrongRef::empty();
        };

        let ptr = NonNull::from(project(inner.as_ref()));

        //  Safety:
        //  -   Alive: `ptr` borrows from the value.
        let inner = unsafe { RawStrong::alias(inner, ptr) };

        StrongRef { inner: Some(inner) }
    }
}

//
//  High-level Access
//

impl<T> StrongRef<T>
where
    T: ?Sized,
{
    /// Returns whether the instance is empty.
    #[inline(always)]
    pub fn is_empty(this: &Self) -> bool {
        this.inner.is_none()
    }

    /// Returns the number of strong handles, or 0 if empty.
    #[inline(always)]
    pub fn use_count(this: &Self) -> usize {
        this.inner.as_ref().map_or(0, RawStrong::strong_count)
    }

    /// Returns the number of weak handles, or 0 if empty.
    #[inline(always)]
    pub fn weak_count(this: &Self) -> usize {
        this.inner.as_ref().map_or(0, RawStrong::weak_count)
    }

    /// Returns a reference to the value, unless empty.
    #[inline(always)]
    pub fn get(this: &Self) -> Option<&T> {
        this.inner.as_ref().map(RawStrong::as_ref)
    }

    /// Returns a pointer to the value, unless empty.
    #[inline(always)]
    pub fn as_non_null(this: &Self) -> Option<NonNull<T>> {
        this.inner.as_ref().map(RawStrong::as_non_null)
    }

    /// Returns whether both point to the same address, or are both empty.
    ///
    /// Two aliases of the same value may differ, and two values with different control blocks may compare equal, such
    /// as a value and its first field.
    #[inline(always)]
    pub fn ptr_eq<U>(this: &Self, other: &StrongRef<U>) -> bool
    where
        U: ?Sized,
    {
        Self::address(this) == StrongRef::address(other)
    }

    #[inline(always)]
    fn address(this: &Self) -> usize {
        this.inner
            .as_ref()
            .map_or(0, |inner| inner.as_non_null().cast::<u8>().as_ptr() as usize)
    }

    //  Returns whether both share the same pointer and block, ie whether assigning one to the other is a no-op.
    fn is_same(this: &Self, other: &Self) -> bool {
        match (&this.inner, &other.inner) {
            (Some(this), Some(other)) => {
                Self::ptr_eq_raw(this, other) && core::ptr::eq(this.block(), other.block())
            }
            (None, None) => true,
            _ => false,
        }
    }

    fn ptr_eq_raw(this: &RawStrong<T>, other: &RawStrong<T>) -> bool {
        this.as_non_null().cast::<u8>() == other.as_non_null().cast::<u8>()
    }
}

//
//  Clone
//

impl<T> Clone for StrongRef<T>
where
    T: ?Sized,
{
    fn clone(&self) -> Self {
        let inner = self.inner.clone();

        Self { inner }
    }

    fn clone_from(&mut self, source: &Self) {
        if Self::is_same(self, source) {
            return;
        }

        Self::reset(self);

        self.inner = source.inner.clone();
    }
}

//
//  Value Access
//

impl<T> convert::AsRef<T> for StrongRef<T>
where
    T: ?Sized,
{
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T> ops::Deref for StrongRef<T>
where
    T: ?Sized,
{
    type Target = T;

    fn deref(&self) -> &T {
        match &self.inner {
            Some(inner) => inner.as_ref(),
            None => deref_empty(),
        }
    }
}

#[cold]
#[inline(never)]
fn deref_empty() -> ! {
    panic!("dereferenced an empty StrongRef")
}

//
//  Formatting
//

impl<T> fmt::Debug for StrongRef<T>
where
    T: ?Sized + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match Self::get(self) {
            Some(value) => f.debug_tuple("StrongRef").field(&value).finish(),
            None => f.write_str("StrongRef(<empty>)"),
        }
    }
}

impl<T> fmt::Pointer for StrongRef<T>
where
    T: ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        fmt::Pointer::fmt(&(Self::address(self) as *const u8), f)
    }
}

//
//  Identity
//

impl<T> Eq for StrongRef<T> where T: ?Sized {}

impl<T, U> PartialEq<StrongRef<U>> for StrongRef<T>
where
    T: ?Sized,
    U: ?Sized,
{
    #[inline(always)]
    fn eq(&self, other: &StrongRef<U>) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl<T> hash::Hash for StrongRef<T>
where
    T: ?Sized,
{
    #[inline(always)]
    fn hash<HS>(&self, hasher: &mut HS)
    where
        HS: hash::Hasher,
    {
        Self::address(self).hash(hasher);
    }
}

// mod tests
