//! Typed and type-erased handles into the heap.
//!
//! `GcBox<T>` is the actual allocation: a [`GcHeader`] immediately followed
//! by the kind's payload, `#[repr(C)]` so that a pointer to the box and a
//! pointer to its header are the same address — the "fixed negative offset"
//! the external interfaces describe collapses to a same-address reinterpret
//! here because the header is the first field.

use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::header::GcHeader;

#[repr(C)]
pub(crate) struct GcBox<T> {
    pub header: GcHeader,
    pub body: T,
}

/// A typed, non-owning handle to a heap-allocated `T`.
///
/// `Copy`, and exactly pointer-sized. Like the host's own tagged value
/// representation, a `GcRef` does not borrow-check the object graph — it is
/// the host's job (via pinning or the active fiber) to keep a `GcRef` alive
/// across anything that might collect.
pub struct GcRef<T> {
    ptr: NonNull<GcBox<T>>,
    _marker: PhantomData<*const T>,
}

impl<T> GcRef<T> {
    pub(crate) fn from_box(ptr: NonNull<GcBox<T>>) -> Self {
        Self {
            ptr,
            _marker: PhantomData,
        }
    }

    /// Reinterpret a header pointer known (by its tag) to own a `T` payload
    /// as a typed reference to it.
    ///
    /// # Safety
    /// `ptr` must point at the header of a live `GcBox<T>`.
    pub(crate) unsafe fn from_header_ptr(ptr: NonNull<GcHeader>) -> Self {
        Self {
            ptr: ptr.cast(),
            _marker: PhantomData,
        }
    }

    pub fn header(&self) -> &GcHeader {
        unsafe { &self.ptr.as_ref().header }
    }

    pub fn get(&self) -> &T {
        unsafe { &self.ptr.as_ref().body }
    }

    /// A mutable view of the payload.
    ///
    /// # Safety
    /// The caller must not hold another live reference (typed or
    /// type-erased) into the same block for the duration of the borrow.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_mut(&self) -> &mut T {
        unsafe { &mut (*self.ptr.as_ptr()).body }
    }

    pub fn as_header_ptr(&self) -> NonNull<GcHeader> {
        self.ptr.cast()
    }
}

impl<T> Copy for GcRef<T> {}
impl<T> Clone for GcRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for GcRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}
impl<T> Eq for GcRef<T> {}

impl<T: std::fmt::Debug> std::fmt::Debug for GcRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self.get(), f)
    }
}
