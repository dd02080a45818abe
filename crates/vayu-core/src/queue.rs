//! Thread-safe FIFO of pending jobs.
//!
//! `push_batch` may race with the worker's `pop`; both go through the same
//! mutex. The run's byte total lives in the progress tracker, which the engine
//! extends with each batch's sum.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::job::TransferJob;

#[derive(Default)]
pub struct TransferQueue {
    jobs: Mutex<VecDeque<TransferJob>>,
}

impl TransferQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn jobs(&self) -> MutexGuard<'_, VecDeque<TransferJob>> {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append `batch` in order. Returns the batch's byte sum.
    pub fn push_batch(&self, batch: Vec<TransferJob>) -> u64 {
        let bytes: u64 = batch.iter().map(|j| j.size_bytes).sum();
        self.jobs().extend(batch);
        bytes
    }

    pub fn pop(&self) -> Option<TransferJob> {
        self.jobs().pop_front()
    }

    /// Remove every queued job and return them in FIFO order.
    pub fn clear(&self) -> Vec<TransferJob> {
        self.jobs().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.jobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs().is_empty()
    }

    /// Sum of the sizes of everything still queued; a new run starts from this.
    pub fn queued_bytes(&self) -> u64 {
        self.jobs().iter().map(|j| j.size_bytes).sum()
    }
}
