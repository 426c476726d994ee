//! Duplicate suppression
//!
//! Bounded set of recently processed inbound-event ids. Chat transports
//! re-deliver on timeout; an already-seen id must be a no-op. Keeps the
//! newest K identifiers and evicts the oldest.

use std::collections::{HashSet, VecDeque};
use uuid::Uuid;

pub const DEFAULT_CAPACITY: usize = 512;

#[derive(Debug)]
pub struct DuplicateSuppressor {
    capacity: usize,
    seen: HashSet<Uuid>,
    order: VecDeque<Uuid>,
}

impl DuplicateSuppressor {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            seen: HashSet::new(),
            order: VecDeque::new(),
        }
    }

    /// Returns true if the id is fresh (and records it), false if it was
    /// already seen.
    pub fn insert(&mut self, id: Uuid) -> bool {
        if !self.seen.insert(id) {
            return false;
        }
        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for DuplicateSuppressor {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
