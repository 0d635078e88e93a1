//! Allocation: pushing a new header+payload block onto the heap's
//! intrusive list.
//!
//! There is one allocation per object, made with `Box::new` and then
//! leaked into a raw pointer the list owns until the sweeper reclaims it.
//! This relies on Rust's global allocator for out-of-memory behavior —
//! an allocation failure aborts the process via `handle_alloc_error`
//! rather than returning a recoverable error, which is exactly the "OOM is
//! fatal, no partial state" contract this collector is specified to have.

use std::ptr::NonNull;

use crate::gcref::{GcBox, GcRef};
use crate::header::{GcHeader, Kind};
use crate::heap::Heap;
use crate::kinds::{
    ArrayObj, BufferObj, Constant, EnvDescriptor, FiberObj, Frame, FuncDefObj, FuncEnvObj,
    FuncEnvStorage, FunctionObj, StringObj, StructObj, TableObj, TupleObj, UserDataObj,
    UserDataType,
};
use crate::value::Value;

impl Heap {
    /// Allocate `body` with a fresh header tagged `tag`, link it onto the
    /// heap's allocation list, and return a typed handle to it.
    pub(crate) fn push<T>(&mut self, tag: Kind, body: T, size: usize) -> GcRef<T> {
        let boxed = Box::new(GcBox {
            header: GcHeader::new(tag),
            body,
        });
        let ptr = NonNull::from(Box::leak(boxed));

        unsafe { ptr.as_ref().header.next.set(self.head) };
        self.head = Some(ptr.cast());
        self.note_allocation(size);

        GcRef::from_box(ptr)
    }

    pub fn alloc_string(&mut self, bytes: Vec<u8>) -> GcRef<StringObj> {
        let size = bytes.len();
        self.push(Kind::String, StringObj::new(bytes.into_boxed_slice()), size)
    }

    pub fn alloc_symbol(&mut self, bytes: Vec<u8>) -> GcRef<StringObj> {
        let size = bytes.len();
        self.push(Kind::Symbol, StringObj::new(bytes.into_boxed_slice()), size)
    }

    pub fn alloc_array(&mut self, data: Vec<Value>) -> GcRef<ArrayObj> {
        let size = data.capacity() * std::mem::size_of::<Value>();
        self.push(Kind::Array, ArrayObj { data }, size)
    }

    pub fn alloc_table(&mut self, capacity: usize) -> GcRef<TableObj> {
        let table = TableObj::with_capacity(capacity);
        let size = table.capacity() * std::mem::size_of::<(Value, Value)>();
        self.push(Kind::Table, table, size)
    }

    pub fn alloc_tuple(&mut self, values: Box<[Value]>) -> GcRef<TupleObj> {
        let size = values.len() * std::mem::size_of::<Value>();
        self.push(Kind::Tuple, TupleObj::new(values), size)
    }

    pub fn alloc_struct(&mut self, entries: Box<[(Value, Value)]>) -> GcRef<StructObj> {
        let size = entries.len() * std::mem::size_of::<(Value, Value)>();
        self.push(Kind::Struct, StructObj::new(entries), size)
    }

    pub fn alloc_buffer(&mut self, data: Vec<u8>) -> GcRef<BufferObj> {
        let size = data.capacity();
        self.push(Kind::Buffer, BufferObj { data }, size)
    }

    pub fn alloc_funcdef(
        &mut self,
        constants: Option<Vec<Constant>>,
        environments: Vec<EnvDescriptor>,
        bytecode: Vec<u32>,
    ) -> GcRef<FuncDefObj> {
        let size = bytecode.len() * std::mem::size_of::<u32>();
        self.push(
            Kind::FuncDef,
            FuncDefObj {
                constants,
                environments,
                bytecode,
            },
            size,
        )
    }

    pub fn alloc_function(
        &mut self,
        def: GcRef<FuncDefObj>,
        envs: Vec<Option<GcRef<FuncEnvObj>>>,
    ) -> GcRef<FunctionObj> {
        let size = envs.len() * std::mem::size_of::<Option<GcRef<FuncEnvObj>>>();
        self.push(Kind::Function, FunctionObj { def, envs }, size)
    }

    pub fn alloc_funcenv(&mut self, storage: FuncEnvStorage, length: u32) -> GcRef<FuncEnvObj> {
        let size = length as usize * std::mem::size_of::<Value>();
        self.push(Kind::FuncEnv, FuncEnvObj { storage, length }, size)
    }

    pub fn alloc_fiber(&mut self, capacity: usize) -> GcRef<FiberObj> {
        let fiber = FiberObj {
            frames: vec![Frame {
                base: 0,
                func: None,
                prev_frame: 0,
            }],
            frame: 0,
            frametop: 0,
            data: Vec::with_capacity(capacity),
            parent: None,
            ret: Value::Nil,
        };
        let size = capacity * std::mem::size_of::<Value>();
        self.push(Kind::Fiber, fiber, size)
    }

    pub fn alloc_userdata(&mut self, ty: &'static UserDataType, bytes: Box<[u8]>) -> GcRef<UserDataObj> {
        let size = bytes.len();
        self.push(Kind::UserData, UserDataObj { ty, bytes }, size)
    }
}
