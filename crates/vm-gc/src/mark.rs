//! The tracer: walks the live object graph from a set of roots, flipping the
//! `reachable` bit on everything it finds.
//!
//! Every kind's mark routine follows the same shape: if the block is already
//! marked, stop (this is what makes cycles terminate); otherwise mark it,
//! then recurse into whatever it references. `Value::Nil`, `Bool`, and
//! `Number` carry nothing to follow and are handled at the top of [`mark`].

use crate::gcref::GcRef;
use crate::kinds::{
    ArrayObj, BufferObj, Constant, FiberObj, FuncDefObj, FuncEnvObj, FuncEnvStorage, FunctionObj,
    StringObj, StructObj, TableObj, TupleObj, UserDataObj,
};
use crate::value::Value;

/// Mark `value` and, transitively, everything it references. Safe to call
/// on a value already marked in this cycle — it returns immediately.
pub fn mark(value: Value) {
    match value {
        Value::Nil | Value::Bool(_) | Value::Number(_) => {}
        Value::String(r) | Value::Symbol(r) => mark_string(r),
        Value::Array(r) => mark_array(r),
        Value::Table(r) => mark_table(r),
        Value::Tuple(r) => mark_tuple(r),
        Value::Struct(r) => mark_struct(r),
        Value::Buffer(r) => mark_buffer(r),
        Value::Fiber(r) => mark_fiber(r),
        Value::Function(r) => mark_function(r),
        Value::FuncDef(r) => mark_funcdef(r),
        Value::FuncEnv(r) => mark_funcenv(r),
        Value::UserData(r) => mark_userdata(r),
    }
}

/// Claim a block for this mark phase. Returns `true` if the caller should
/// continue tracing into its referents, `false` if it was already marked
/// (or pinned-and-marked, which can't happen — pinning alone doesn't mark).
fn claim(header: &crate::header::GcHeader) -> bool {
    if header.is_reachable() {
        return false;
    }
    header.set_reachable();
    true
}

fn mark_string(r: GcRef<StringObj>) {
    claim(r.header());
}

fn mark_array(r: GcRef<ArrayObj>) {
    if !claim(r.header()) {
        return;
    }
    for v in &r.get().data {
        mark(*v);
    }
}

fn mark_table(r: GcRef<TableObj>) {
    if !claim(r.header()) {
        return;
    }
    for (k, v) in &r.get().data {
        mark(*k);
        mark(*v);
    }
}

fn mark_tuple(r: GcRef<TupleObj>) {
    if !claim(r.header()) {
        return;
    }
    for v in r.get().values.iter() {
        mark(*v);
    }
}

fn mark_struct(r: GcRef<StructObj>) {
    if !claim(r.header()) {
        return;
    }
    for (k, v) in r.get().entries.iter() {
        mark(*k);
        mark(*v);
    }
}

fn mark_buffer(r: GcRef<BufferObj>) {
    claim(r.header());
}

fn mark_funcdef(r: GcRef<FuncDefObj>) {
    if !claim(r.header()) {
        return;
    }
    if let Some(constants) = &r.get().constants {
        for c in constants {
            match c {
                Constant::Value(v) => mark(*v),
                Constant::NestedFuncDef(def) => mark_funcdef(*def),
            }
        }
    }
}

fn mark_function(r: GcRef<FunctionObj>) {
    if !claim(r.header()) {
        return;
    }
    let f = r.get();
    let env_count = f.def.get().environments_length() as usize;
    for env in f.envs.iter().take(env_count).flatten() {
        mark_funcenv(*env);
    }
    mark_funcdef(f.def);
}

fn mark_funcenv(r: GcRef<FuncEnvObj>) {
    if !claim(r.header()) {
        return;
    }
    match &r.get().storage {
        FuncEnvStorage::Borrowed { fiber, .. } => mark_fiber(*fiber),
        FuncEnvStorage::Closed { values } => {
            for v in values.iter() {
                mark(*v);
            }
        }
    }
}

fn mark_fiber(r: GcRef<FiberObj>) {
    if !claim(r.header()) {
        return;
    }
    let fiber = r.get();

    // Walk the frame chain from the active frame down through `prev_frame`
    // links to the sentinel index 0 (`frames[0]` is never a real frame).
    // Each frame contributes its function and the slice of `data` between
    // its own base and the top of the frame above it.
    let mut idx = fiber.frame;
    let mut top = fiber.frametop;
    while idx != 0 {
        let frame = &fiber.frames[idx];
        if let Some(func) = frame.func {
            mark_function(func);
        }
        for v in &fiber.data[frame.base as usize..top as usize] {
            mark(*v);
        }
        top = frame.base;
        idx = frame.prev_frame as usize;
    }

    if let Some(parent) = fiber.parent {
        mark_fiber(parent);
    }
    mark(fiber.ret);
}

fn mark_userdata(r: GcRef<UserDataObj>) {
    claim(r.header());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::Heap;
    use crate::interner::NullInterner;

    #[test]
    fn marking_an_array_reaches_its_elements() {
        let mut heap = Heap::new(Box::new(NullInterner));
        let inner = heap.alloc_array(vec![Value::Number(1.0)]);
        let outer = heap.alloc_array(vec![Value::Array(inner)]);

        mark(Value::Array(outer));

        assert!(outer.header().is_reachable());
        assert!(inner.header().is_reachable());
    }

    #[test]
    fn marking_twice_is_a_no_op() {
        let mut heap = Heap::new(Box::new(NullInterner));
        let arr = heap.alloc_array(vec![]);
        mark(Value::Array(arr));
        assert!(claim(arr.header()) == false);
    }
}
