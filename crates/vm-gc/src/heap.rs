//! The heap: owns the allocation list and drives collection.
//!
//! `Heap` is deliberately not `Send`/`Sync` (it has no atomics and no
//! locking) — it must be driven entirely from whatever single thread
//! allocates into it. That thread is responsible for tracing its own root
//! set into [`crate::mark::mark`] before calling [`Heap::collect`]; the
//! heap has no way to discover roots on its own beyond the pinned set.

use std::ptr::NonNull;

use crate::header::GcHeader;
use crate::interner::Interner;
use crate::mark::mark;
use crate::sweep::sweep;
use crate::value::Value;

/// Tunables for when [`Heap::collect_if_needed`] decides to run a cycle.
#[derive(Debug, Clone, Copy)]
pub struct GcConfig {
    /// Bytes allocated since the last collection before an automatic cycle
    /// is triggered.
    pub collection_threshold: usize,
    /// Multiplier applied to the threshold after each automatic cycle that
    /// still leaves the heap above it, so a live set that's genuinely large
    /// doesn't thrash the collector every allocation.
    pub growth_factor: f64,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            collection_threshold: 1 << 20, // 1 MiB, matching the source's default next-collection size
            growth_factor: 1.5,
        }
    }
}

/// Point-in-time counters, exposed for diagnostics and tests. Purely
/// observational — nothing here feeds back into collection semantics
/// except `bytes_since_collection` / `collection_threshold`, which live on
/// the heap itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct GcStats {
    pub live_objects: usize,
    pub bytes_allocated: usize,
    pub collections_run: usize,
    pub last_collection_freed: usize,
    /// Wall-clock time spent in the most recent `collect()` call, in
    /// nanoseconds.
    pub last_pause_ns: u64,
    /// Cumulative wall-clock time spent across every `collect()` call.
    pub total_pause_ns: u64,
}

pub struct Heap {
    pub(crate) head: Option<NonNull<GcHeader>>,
    interner: Box<dyn Interner>,
    config: GcConfig,
    stats: GcStats,
    bytes_since_collection: usize,
}

impl Heap {
    pub fn new(interner: Box<dyn Interner>) -> Self {
        Self::with_config(interner, GcConfig::default())
    }

    pub fn with_config(interner: Box<dyn Interner>, config: GcConfig) -> Self {
        Self {
            head: None,
            interner,
            config,
            stats: GcStats::default(),
            bytes_since_collection: 0,
        }
    }

    pub fn config(&self) -> &GcConfig {
        &self.config
    }

    pub fn stats(&self) -> GcStats {
        self.stats
    }

    pub(crate) fn note_allocation(&mut self, size: usize) {
        self.stats.live_objects += 1;
        self.stats.bytes_allocated += size;
        self.bytes_since_collection += size;
    }

    /// Pin `value`, protecting it from collection regardless of whether it
    /// is reachable from anything the caller traces. A no-op for immediate
    /// (non-heap) values.
    pub fn pin(&self, value: Value) {
        if let Some(ptr) = value.header_ptr() {
            unsafe { ptr.as_ref().set_pinned() };
        }
    }

    /// Undo a previous [`Heap::pin`]. Does not itself free anything — the
    /// object becomes collectible on the next cycle if nothing reaches it.
    pub fn unpin(&self, value: Value) {
        if let Some(ptr) = value.header_ptr() {
            unsafe { ptr.as_ref().clear_pinned() };
        }
    }

    /// Bytes allocated since the last collection — the allocation counter
    /// the auto-trigger policy compares against [`GcConfig::collection_threshold`].
    pub fn bytes_since_collection(&self) -> usize {
        self.bytes_since_collection
    }

    /// Whether a cycle should run before the next allocation, given bytes
    /// allocated since the last collection.
    pub fn should_collect(&self) -> bool {
        self.bytes_since_collection >= self.config.collection_threshold
    }

    /// Run a full mark/sweep cycle: trace `roots`, then reclaim everything
    /// neither reached nor pinned. `roots` should include everything the
    /// caller can reach directly — globals, the active fiber's stack, and
    /// so on; the pinned set is consulted by the sweeper automatically and
    /// does not need to be passed in.
    pub fn collect(&mut self, roots: &[Value]) {
        let start = std::time::Instant::now();

        #[cfg(feature = "gc_logging")]
        tracing::debug!(
            live = self.stats.live_objects,
            "garbage collection cycle starting"
        );

        for &root in roots {
            mark(root);
        }

        let freed = unsafe { sweep(&mut self.head, self.interner.as_ref()) };

        let pause_ns = start.elapsed().as_nanos() as u64;
        self.stats.live_objects -= freed;
        self.stats.last_collection_freed = freed;
        self.stats.collections_run += 1;
        self.stats.last_pause_ns = pause_ns;
        self.stats.total_pause_ns += pause_ns;
        self.bytes_since_collection = 0;

        #[cfg(feature = "gc_logging")]
        tracing::debug!(
            freed,
            live = self.stats.live_objects,
            pause_ns,
            "garbage collection cycle completed"
        );
    }

    /// Run [`Heap::collect`] only if [`Heap::should_collect`] says to, and
    /// grow the threshold afterwards if the live set is still large enough
    /// to be near it again immediately.
    pub fn collect_if_needed(&mut self, roots: &[Value]) {
        if !self.should_collect() {
            return;
        }
        self.collect(roots);
        if self.bytes_since_collection >= self.config.collection_threshold {
            self.config.collection_threshold =
                (self.config.collection_threshold as f64 * self.config.growth_factor) as usize;
        }
    }

    /// Free every block unconditionally, ignoring reachability and pinning.
    /// Intended for tearing down a runtime that is shutting down entirely,
    /// not for routine collection.
    pub fn clear_memory(&mut self) {
        let mut current = self.head.take();
        while let Some(node) = current {
            let next = unsafe { node.as_ref().next.get() };
            unsafe { crate::finalize::finalize_block(node, self.interner.as_ref()) };
            current = next;
        }
        self.stats.live_objects = 0;
    }

    #[cfg(test)]
    pub(crate) fn sweep_for_test(&mut self) -> usize {
        let freed = unsafe { sweep(&mut self.head, self.interner.as_ref()) };
        self.stats.live_objects -= freed;
        freed
    }
}

impl Drop for Heap {
    fn drop(&mut self) {
        self.clear_memory();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interner::NullInterner;

    #[test]
    fn collect_with_no_roots_frees_everything_unpinned() {
        let mut heap = Heap::new(Box::new(NullInterner));
        heap.alloc_array(vec![]);
        heap.alloc_array(vec![]);
        assert_eq!(heap.stats().live_objects, 2);

        heap.collect(&[]);

        assert_eq!(heap.stats().live_objects, 0);
        assert_eq!(heap.stats().last_collection_freed, 2);
    }

    #[test]
    fn rooted_value_survives_collection() {
        let mut heap = Heap::new(Box::new(NullInterner));
        let kept = heap.alloc_array(vec![]);

        heap.collect(&[Value::Array(kept)]);

        assert_eq!(heap.stats().live_objects, 1);
        assert!(!kept.header().is_reachable());
    }

    #[test]
    fn pinned_value_survives_without_being_in_roots() {
        let mut heap = Heap::new(Box::new(NullInterner));
        let pinned = heap.alloc_array(vec![]);
        heap.pin(Value::Array(pinned));

        heap.collect(&[]);
        assert_eq!(heap.stats().live_objects, 1);

        heap.unpin(Value::Array(pinned));
        heap.collect(&[]);
        assert_eq!(heap.stats().live_objects, 0);
    }

    #[test]
    fn should_collect_reflects_configured_threshold() {
        let mut heap = Heap::with_config(
            Box::new(NullInterner),
            GcConfig {
                collection_threshold: 16,
                growth_factor: 2.0,
            },
        );
        assert!(!heap.should_collect());
        heap.alloc_buffer(vec![0u8; 32]);
        assert!(heap.should_collect());
    }

    #[test]
    fn clear_memory_frees_pinned_objects_too() {
        let mut heap = Heap::new(Box::new(NullInterner));
        let pinned = heap.alloc_array(vec![]);
        heap.pin(Value::Array(pinned));

        heap.clear_memory();

        assert_eq!(heap.stats().live_objects, 0);
    }
}
