//! Ordered job queue filled during the render pass and drained once.

use crate::types::EffectiveOptions;

/// One queued capture job.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    /// Zero-based enqueue position within the run.
    pub order: usize,
    pub options: EffectiveOptions,
}

/// Append-only queue of capture jobs.
///
/// Entries are never reordered or deduplicated; `drain_all` hands out the
/// whole sequence and leaves the queue empty.
#[derive(Debug, Default)]
pub struct JobQueue {
    entries: Vec<QueueEntry>,
    next_order: usize,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its order.
    pub fn enqueue(&mut self, options: EffectiveOptions) -> usize {
        let order = self.next_order;
        self.next_order += 1;
        self.entries.push(QueueEntry { order, options });
        order
    }

    pub fn drain_all(&mut self) -> Vec<QueueEntry> {
        self.next_order = 0;
        std::mem::take(&mut self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }
}
