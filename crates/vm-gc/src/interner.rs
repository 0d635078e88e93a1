//! Hook back into the host's intern table.
//!
//! STRING, SYMBOL, TUPLE, and STRUCT blocks are deduplicated by content in
//! the host runtime's own table; when one of these is about to be freed the
//! collector must tell the host so the dangling entry doesn't linger and
//! get handed back out to a new caller. The collector itself has no
//! opinion about how interning is implemented — it only needs somewhere to
//! report the removal.

use crate::value::Value;

pub trait Interner {
    /// Called once, during finalization, for every interned block the
    /// sweeper is about to free.
    fn remove(&self, value: Value);
}

/// An interner that does nothing — for embedders that don't intern, or for
/// tests that don't care.
pub struct NullInterner;

impl Interner for NullInterner {
    fn remove(&self, _value: Value) {}
}
