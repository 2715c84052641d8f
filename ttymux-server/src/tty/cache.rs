//! Output history for one terminal
//!
//! A bounded FIFO of output records. Viewers that connect late replay it to
//! catch up on what was written before they arrived.

use std::collections::VecDeque;

use ttymux_protocol::OutputRecord;

/// Bounded FIFO of output records, oldest evicted first
#[derive(Debug, Clone)]
pub struct OutputCache {
    records: VecDeque<OutputRecord>,
    capacity: usize,
}

impl OutputCache {
    /// Create a new cache holding at most `capacity` records
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a record, evicting the oldest ones beyond capacity
    pub fn push(&mut self, record: OutputRecord) {
        if self.capacity == 0 {
            return;
        }
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Change the capacity, evicting the oldest records if it shrank
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        let excess = self.records.len().saturating_sub(capacity);
        self.records.drain(..excess);
    }

    /// Records in write order, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &OutputRecord> {
        self.records.iter()
    }

    /// Owned copy of the records in write order, for replay
    pub fn snapshot(&self) -> Vec<OutputRecord> {
        self.records.iter().cloned().collect()
    }
}
