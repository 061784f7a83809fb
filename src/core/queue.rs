//! Pending-job queue with priority and stable FIFO tie-break.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::core::cancel::CancelToken;
use crate::core::job::{JobFuture, JobId, Priority};

/// A submitted job waiting for dispatch.
pub(crate) struct PendingJob {
    pub(crate) id: JobId,
    pub(crate) work: JobFuture,
    pub(crate) cancel: CancelToken,
    pub(crate) priority: Priority,
    /// Monotonic submission sequence; breaks priority ties so dispatch
    /// stays FIFO within a priority level.
    pub(crate) seq: u64,
}

impl PartialEq for PendingJob {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for PendingJob {}

impl PartialOrd for PendingJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingJob {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority first, then earlier submission
        // (lower seq, reversed for the heap) within equal priority.
        match self.priority.cmp(&other.priority) {
            Ordering::Equal => other.seq.cmp(&self.seq),
            ord => ord,
        }
    }
}

/// Heap-backed queue consumed by the dispatch loop.
///
/// With every submission at the same priority this behaves as a plain FIFO
/// queue; distinct priorities reorder dispatch without starving equal-rank
/// jobs of their submission order.
#[derive(Default)]
pub(crate) struct PendingQueue {
    heap: BinaryHeap<PendingJob>,
}

impl PendingQueue {
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    pub(crate) fn push(&mut self, job: PendingJob) {
        self.heap.push(job);
    }

    pub(crate) fn pop(&mut self) -> Option<PendingJob> {
        self.heap.pop()
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    /// Remove and return everything still queued, in dispatch order.
    /// Used at shutdown to mark undispatched jobs cancelled.
    pub(crate) fn drain(&mut self) -> Vec<PendingJob> {
        let mut out = Vec::with_capacity(self.heap.len());
        while let Some(job) = self.heap.pop() {
            out.push(job);
        }
        out
    }
}
