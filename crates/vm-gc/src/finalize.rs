//! Finalization: the per-kind cleanup that must run before a block's memory
//! is returned to the allocator.
//!
//! For most kinds this is nothing beyond ordinary `Drop` glue on the
//! payload's owned buffers (`Vec`, `Box<[_]>`) — reconstructing the
//! `Box<GcBox<T>>` and dropping it is enough, exactly as the source's
//! `deinit_block` frees `->data` by hand for each kind. Two kinds need a
//! side effect first: interned kinds must tell the [`crate::interner::Interner`]
//! they're going away, and USERDATA must run the host's own finalizer
//! callback before its bytes are reclaimed.

use std::ptr::NonNull;

use crate::gcref::{GcBox, GcRef};
use crate::header::{GcHeader, Kind};
use crate::interner::Interner;
use crate::kinds::{
    ArrayObj, BufferObj, FiberObj, FuncDefObj, FuncEnvObj, FunctionObj, StringObj, StructObj,
    TableObj, TupleObj, UserDataObj,
};
use crate::value::Value;

/// Reconstruct the owning box from a header pointer known (by its tag) to
/// be a `GcBox<T>`, and drop it — running `T`'s destructor and freeing the
/// allocation.
///
/// # Safety
/// `ptr` must point at the header of a live, uniquely-owned `GcBox<T>` that
/// is about to be removed from the allocation list; nothing else may
/// reference it afterwards.
unsafe fn free_as<T>(ptr: NonNull<GcHeader>) {
    let boxed: Box<GcBox<T>> = unsafe { Box::from_raw(ptr.cast().as_ptr()) };
    drop(boxed);
}

/// Finalize and free one block. Called by the sweeper for every unreached,
/// unpinned block, after the block has already been unlinked from the
/// allocation list.
///
/// # Safety
/// `ptr` must point at a live header that has just been unlinked and will
/// not be visited again.
pub(crate) unsafe fn finalize_block(ptr: NonNull<GcHeader>, interner: &dyn Interner) {
    let tag = unsafe { ptr.as_ref().tag() };
    match tag {
        Kind::String | Kind::Symbol => {
            let r: GcRef<StringObj> = unsafe { GcRef::from_header_ptr(ptr) };
            let value = if tag == Kind::String {
                Value::String(r)
            } else {
                Value::Symbol(r)
            };
            interner.remove(value);
            unsafe { free_as::<StringObj>(ptr) };
        }
        Kind::Array => unsafe { free_as::<ArrayObj>(ptr) },
        Kind::Table => unsafe { free_as::<TableObj>(ptr) },
        Kind::Tuple => {
            let r: GcRef<TupleObj> = unsafe { GcRef::from_header_ptr(ptr) };
            interner.remove(Value::Tuple(r));
            unsafe { free_as::<TupleObj>(ptr) };
        }
        Kind::Struct => {
            let r: GcRef<StructObj> = unsafe { GcRef::from_header_ptr(ptr) };
            interner.remove(Value::Struct(r));
            unsafe { free_as::<StructObj>(ptr) };
        }
        Kind::Buffer => unsafe { free_as::<BufferObj>(ptr) },
        Kind::Fiber => unsafe { free_as::<FiberObj>(ptr) },
        Kind::Function => unsafe { free_as::<FunctionObj>(ptr) },
        Kind::FuncDef => unsafe { free_as::<FuncDefObj>(ptr) },
        Kind::FuncEnv => unsafe { free_as::<FuncEnvObj>(ptr) },
        Kind::UserData => {
            let r: GcRef<UserDataObj> = unsafe { GcRef::from_header_ptr(ptr) };
            let obj = r.get();
            if let Some(finalize) = obj.ty.finalize {
                unsafe { finalize(obj.bytes.as_ptr() as *mut u8, obj.bytes.len()) };
            }
            unsafe { free_as::<UserDataObj>(ptr) };
        }
    }
}
