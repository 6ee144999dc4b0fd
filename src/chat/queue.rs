//! FIFO holding area for participants waiting for a partner.

use std::{collections::VecDeque, time::Instant};

use super::types::ParticipantId;

#[derive(Debug, Clone)]
pub struct WaitingEntry {
    pub id: ParticipantId,
    pub enqueued_at: Instant,
}

#[derive(Debug, Default)]
pub struct MatchingQueue {
    entries: VecDeque<WaitingEntry>,
}

impl MatchingQueue {
    pub fn push_back(&mut self, id: ParticipantId, now: Instant) {
        self.entries.push_back(WaitingEntry { id, enqueued_at: now });
    }

    pub fn pop_front(&mut self) -> Option<WaitingEntry> {
        self.entries.pop_front()
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.entries.iter().any(|e| &e.id == id)
    }

    /// Removes every entry for `id`, keeping the rest in order.
    pub fn remove(&mut self, id: &ParticipantId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| &e.id != id);
        before != self.entries.len()
    }

    /// Removes entries matching `evict` and returns them, oldest first.
    pub fn drain_where(&mut self, mut evict: impl FnMut(&WaitingEntry) -> bool) -> Vec<WaitingEntry> {
        let mut evicted = Vec::new();
        let mut kept = VecDeque::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if evict(&entry) {
                evicted.push(entry);
            } else {
                kept.push_back(entry);
            }
        }
        self.entries = kept;
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &WaitingEntry> {
        self.entries.iter()
    }
}
