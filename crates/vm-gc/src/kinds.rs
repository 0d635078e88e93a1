//! Payload types for each heap kind.
//!
//! Each of these sits behind a [`crate::gcref::GcBox`] as the `T` in
//! `GcBox<T>`; the header carries the matching [`crate::header::Kind`] tag.
//! Growable/external buffers (`Vec`, `Box<[_]>`) are plain owned Rust data —
//! when the sweeper reconstructs and drops the box, their `Drop` impls do
//! exactly what the source's `deinit_block` does by hand for each kind
//! (`free(array->data)`, `free(table->data)`, ...). Only the kinds that need
//! a side effect *before* that drop (interned kinds, user data) get an
//! explicit arm in [`crate::finalize`].

use std::hash::Hasher;

use rustc_hash::FxHasher;

use crate::gcref::GcRef;
use crate::value::Value;

fn content_hash(bytes: &[u8]) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(bytes);
    hasher.finish()
}

/// A value's contribution to a containing TUPLE/STRUCT/TABLE's content hash:
/// the cached hash for interned kinds, the bit pattern for numbers/bools, and
/// the block's address for anything else (reference kinds that never get
/// interned, where pointer identity is all there is to hash).
fn hash_value(v: &Value) -> u64 {
    match v {
        Value::String(r) | Value::Symbol(r) => r.get().hash,
        Value::Tuple(r) => r.get().hash,
        Value::Struct(r) => r.get().hash,
        Value::Number(n) => n.to_bits(),
        Value::Bool(b) => *b as u64,
        Value::Nil => 0,
        _ => v
            .header_ptr()
            .map(|p| p.as_ptr() as u64)
            .unwrap_or_default(),
    }
}

fn hash_values(values: &[Value]) -> u64 {
    let mut hasher = FxHasher::default();
    for v in values {
        hasher.write_u64(hash_value(v));
    }
    hasher.finish()
}

fn hash_entries(entries: &[(Value, Value)]) -> u64 {
    let mut hasher = FxHasher::default();
    for (k, v) in entries {
        hasher.write_u64(hash_value(k));
        hasher.write_u64(hash_value(v));
    }
    hasher.finish()
}

/// Backing payload for both STRING and SYMBOL blocks — the two kinds share
/// a representation and differ only in their header's type tag.
pub struct StringObj {
    pub(crate) hash: u64,
    pub bytes: Box<[u8]>,
}

impl StringObj {
    pub(crate) fn new(bytes: Box<[u8]>) -> Self {
        let hash = content_hash(&bytes);
        Self { hash, bytes }
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }
}

/// Growable, ordered sequence of values. The external buffer is `data`'s own
/// heap allocation, reclaimed by `Vec`'s `Drop` when the block is freed.
pub struct ArrayObj {
    pub data: Vec<Value>,
}

/// Immutable ordered sequence, built once and interned.
pub struct TupleObj {
    pub(crate) hash: u64,
    pub values: Box<[Value]>,
}

impl TupleObj {
    pub(crate) fn new(values: Box<[Value]>) -> Self {
        let hash = hash_values(&values);
        Self { hash, values }
    }
}

/// Immutable mapping, open-addressed over a fixed-size slot array built once
/// at construction and interned. Unoccupied slots are `(Nil, Nil)` — marking
/// them is a no-op, exactly as marking any other `Nil` is.
pub struct StructObj {
    pub(crate) hash: u64,
    pub entries: Box<[(Value, Value)]>,
}

impl StructObj {
    pub(crate) fn new(entries: Box<[(Value, Value)]>) -> Self {
        let hash = hash_entries(&entries);
        Self { hash, entries }
    }
}

/// Mutable, growable mapping. Like `StructObj` the tracer must walk every
/// slot including the unoccupied ones, so this cannot be a wrapped
/// `HashMap` — it's a hand-rolled open-addressed table indexed with
/// `rustc-hash`'s `FxHash`.
pub struct TableObj {
    pub data: Vec<(Value, Value)>,
    pub len: usize,
}

impl TableObj {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![(Value::Nil, Value::Nil); capacity.max(1)],
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    fn bucket(&self, key_hash: u64) -> usize {
        (key_hash as usize) % self.data.len()
    }

    fn hash_key(key: &Value) -> u64 {
        hash_value(key)
    }

    /// Linear-probe insert/overwrite. Growth/rehashing is the evaluator's
    /// concern (it resizes and rebuilds the table before handing it back to
    /// the GC); this layer only does the bookkeeping the tracer relies on.
    pub fn insert(&mut self, key: Value, value: Value) {
        let cap = self.data.len();
        let mut idx = self.bucket(Self::hash_key(&key));
        for _ in 0..cap {
            if self.data[idx].0.is_nil() {
                self.data[idx] = (key, value);
                self.len += 1;
                return;
            }
            idx = (idx + 1) % cap;
        }
        panic!("table insert on a full table without resize");
    }
}

/// Growable byte sequence.
pub struct BufferObj {
    pub data: Vec<u8>,
}

/// One slot in a FUNCDEF's constant pool: either an ordinary value, or (the
/// source's boolean-tag aliasing trick, translated to a safe enum instead of
/// reinterpreting a `bool` payload as a pointer) a reference to a nested
/// FUNCDEF embedded by the compiler.
pub enum Constant {
    Value(Value),
    NestedFuncDef(GcRef<FuncDefObj>),
}

/// Per-environment-slot descriptor a FUNCDEF carries for its inner closures.
/// Opaque to the collector — it exists so `environments_length` (read by
/// FUNCTION's mark routine) has something to be the length of.
pub struct EnvDescriptor {
    pub parent_slot: Option<u32>,
}

/// The immutable compiled form of a function: bytecode, constants (which may
/// embed nested funcdefs), and per-closure environment descriptors.
pub struct FuncDefObj {
    pub constants: Option<Vec<Constant>>,
    pub environments: Vec<EnvDescriptor>,
    pub bytecode: Vec<u32>,
}

impl FuncDefObj {
    pub fn environments_length(&self) -> u32 {
        self.environments.len() as u32
    }
}

/// A reference to a FUNCDEF plus the closures it captured.
pub struct FunctionObj {
    pub def: GcRef<FuncDefObj>,
    pub envs: Vec<Option<GcRef<FuncEnvObj>>>,
}

/// Where a closure's captured variables live.
pub enum FuncEnvStorage {
    /// Still on the owning fiber's stack (`offset != 0` in the source).
    Borrowed { fiber: GcRef<FiberObj>, offset: u32 },
    /// Closed over its own value array (`offset == 0`) — the fiber copied
    /// the slots out at frame teardown; that is the fiber's responsibility,
    /// not the GC's.
    Closed { values: Box<[Value]> },
}

pub struct FuncEnvObj {
    pub storage: FuncEnvStorage,
    pub length: u32,
}

/// One stack frame of a fiber. `base` indexes into the fiber's `data` slot
/// array; `prev_frame` is the index (into `frames`) of the caller, with `0`
/// reserved as the sentinel meaning "no caller" — `frames[0]` is never a
/// real frame.
///
/// The source packs this information as raw value slots directly beneath
/// each frame's base (`DST_FRAME_SIZE` slots, reinterpreted via a C union).
/// That bit-aliasing trick has no sound safe-Rust equivalent, so this is
/// represented as an explicit parallel array instead; the walk in
/// [`crate::mark::mark`] over it is otherwise identical to the source's.
pub struct Frame {
    pub base: u32,
    pub func: Option<GcRef<FunctionObj>>,
    pub prev_frame: u32,
}

/// A coroutine: its frame chain, value stack, parent fiber, and return slot.
pub struct FiberObj {
    pub frames: Vec<Frame>,
    /// Index into `frames` of the currently active frame; `0` means none.
    pub frame: usize,
    /// Exclusive top of the active frame's live slots in `data`.
    pub frametop: u32,
    pub data: Vec<Value>,
    pub parent: Option<GcRef<FiberObj>>,
    pub ret: Value,
}

impl FiberObj {
    /// Push a new call frame on top of the current one, growing `data` to
    /// fit its slots. Mirrors the source's frame-push bookkeeping just
    /// enough to give the tracer a real chain to walk — the evaluator owns
    /// the actual calling convention.
    pub fn push_frame(&mut self, func: Option<GcRef<FunctionObj>>, slots: u32) {
        let base = self.frametop;
        let prev_frame = self.frame as u32;
        self.frames.push(Frame {
            base,
            func,
            prev_frame,
        });
        self.frame = self.frames.len() - 1;
        self.frametop = base + slots;
        while (self.data.len() as u32) < self.frametop {
            self.data.push(Value::Nil);
        }
    }
}

/// A host-supplied vtable for an opaque USERDATA payload. This is the one
/// place a function pointer survives as a per-object field rather than a
/// tag-switch arm — user data types are open-ended (host-defined), unlike
/// the closed `Kind` set everything else dispatches over.
pub struct UserDataType {
    pub size: usize,
    pub finalize: Option<unsafe fn(*mut u8, usize)>,
}

pub struct UserDataObj {
    pub ty: &'static UserDataType,
    pub bytes: Box<[u8]>,
}
