//! Reusable request identifiers
//!
//! Ids are unique only among the requests one resolver currently holds. Freed
//! ids go back on a free list and the lowest free id is always handed out
//! first, so ids stay small no matter how many requests a process issues.

use std::collections::BTreeSet;

use ttymux_protocol::RequestId;

/// Free-list backed allocator of small integer ids
#[derive(Debug, Clone)]
pub struct IdPool {
    /// Released ids below `next`
    free: BTreeSet<RequestId>,
    /// Lowest id never handed out
    next: RequestId,
    /// Number of ids that may be live at once
    ceiling: RequestId,
}

impl IdPool {
    pub fn new(ceiling: RequestId) -> Self {
        Self {
            free: BTreeSet::new(),
            next: 0,
            ceiling,
        }
    }

    /// Allocate the lowest free id, or `None` when `ceiling` ids are live
    pub fn allocate(&mut self) -> Option<RequestId> {
        if let Some(id) = self.free.pop_first() {
            return Some(id);
        }
        if self.next >= self.ceiling {
            return None;
        }
        let id = self.next;
        self.next += 1;
        Some(id)
    }

    /// Return an id to the pool
    ///
    /// Releasing an id that is not live is ignored.
    pub fn release(&mut self, id: RequestId) {
        if id >= self.next {
            return;
        }
        if id + 1 == self.next {
            // Shrink the high-water mark instead of growing the free list
            self.next -= 1;
            while let Some(&top) = self.free.last() {
                if top + 1 != self.next {
                    break;
                }
                self.free.remove(&top);
                self.next -= 1;
            }
        } else {
            self.free.insert(id);
        }
    }
}
