//! The sweeper: one linear pass over the allocation list after marking,
//! freeing everything that's neither reachable nor pinned and clearing the
//! reachable bit on everything that survives.
//!
//! The list is singly-linked with each block's `next` stored in its own
//! header, so unlinking a dead block means the *previous* surviving block
//! (or the list head) needs to be repointed at `dead.next` — which must be
//! read before the block is freed, not after. Reading the link after
//! freeing is exactly the kind of use-after-free this pass is written to
//! avoid.

use std::ptr::NonNull;

use crate::finalize::finalize_block;
use crate::header::GcHeader;
use crate::interner::Interner;

/// Sweep the list starting at `*head`, freeing dead blocks and clearing the
/// reachable bit on survivors. Returns the number of blocks freed.
///
/// # Safety
/// `head` must point at the true head of the list (or be `None`), and every
/// block reachable through `next` links from it must be a live allocation
/// that is not concurrently being read or mutated.
pub(crate) unsafe fn sweep(
    head: &mut Option<NonNull<GcHeader>>,
    interner: &dyn Interner,
) -> usize {
    let mut freed = 0;
    let mut previous: Option<NonNull<GcHeader>> = None;
    let mut current = *head;

    while let Some(node) = current {
        let header = unsafe { node.as_ref() };
        let next = header.next.get();

        let keep = header.is_reachable() || header.is_pinned();
        if keep {
            header.clear_reachable();
            previous = Some(node);
        } else {
            match previous {
                Some(prev) => unsafe { prev.as_ref().next.set(next) },
                None => *head = next,
            }
            unsafe { finalize_block(node, interner) };
            freed += 1;
        }

        current = next;
    }

    freed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::Heap;
    use crate::interner::NullInterner;
    use crate::value::Value;

    #[test]
    fn sweep_frees_unreached_and_keeps_marked() {
        let mut heap = Heap::new(Box::new(NullInterner));
        let kept = heap.alloc_array(vec![]);
        heap.alloc_array(vec![]); // never rooted, must be freed

        crate::mark::mark(Value::Array(kept));
        let freed = heap.sweep_for_test();

        assert_eq!(freed, 1);
        assert_eq!(heap.stats().live_objects, 1);
        assert!(!kept.header().is_reachable());
    }

    #[test]
    fn pinned_unreached_block_survives_sweep() {
        let mut heap = Heap::new(Box::new(NullInterner));
        let pinned = heap.alloc_array(vec![]);
        heap.pin(Value::Array(pinned));

        let freed = heap.sweep_for_test();

        assert_eq!(freed, 0);
        assert_eq!(heap.stats().live_objects, 1);
    }
}
