//! Observer channels: progress snapshots and completed items.
//!
//! Progress uses `tokio::sync::watch`, so a new subscriber immediately sees
//! the latest snapshot and then every update. Completed items go through a
//! bounded `tokio::sync::broadcast`; each subscriber receives each item at
//! most once, and a subscriber that falls more than the buffer behind loses
//! the oldest items.

use tokio::sync::{broadcast, watch};

use crate::job::CompletedItem;
use crate::progress::ProgressSnapshot;

pub struct EventChannels {
    progress_tx: watch::Sender<ProgressSnapshot>,
    completed_tx: broadcast::Sender<CompletedItem>,
}

impl EventChannels {
    pub fn new(completed_buffer: usize) -> Self {
        let (progress_tx, _) = watch::channel(ProgressSnapshot::idle());
        let (completed_tx, _) = broadcast::channel(completed_buffer.max(1));
        Self {
            progress_tx,
            completed_tx,
        }
    }

    /// Replace the latest snapshot. Works with or without subscribers.
    pub fn publish_progress(&self, snapshot: ProgressSnapshot) {
        self.progress_tx.send_replace(snapshot);
    }

    pub fn publish_completed(&self, item: CompletedItem) {
        // Err only means nobody is subscribed right now.
        if self.completed_tx.send(item).is_err() {
            tracing::trace!("completed item dropped: no subscribers");
        }
    }

    pub fn latest_progress(&self) -> ProgressSnapshot {
        self.progress_tx.borrow().clone()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<ProgressSnapshot> {
        self.progress_tx.subscribe()
    }

    pub fn subscribe_completed(&self) -> broadcast::Receiver<CompletedItem> {
        self.completed_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Locator;
    use tokio::sync::broadcast::error::TryRecvError;

    fn item(id: u64) -> CompletedItem {
        CompletedItem {
            job_id: id,
            display_name: format!("f{id}.jpg"),
            source: Locator::new(format!("src/f{id}.jpg")),
            destination: Locator::new(format!("dst/f{id}.jpg")),
            size_bytes: 1,
        }
    }

    #[test]
    fn late_progress_subscriber_sees_latest_value() {
        let ch = EventChannels::new(4);
        let mut snap = ProgressSnapshot::idle();
        snap.copied_bytes = 5;
        snap.total_bytes = 10;
        ch.publish_progress(snap);
        let rx = ch.subscribe_progress();
        assert_eq!(rx.borrow().copied_bytes, 5);
    }

    #[test]
    fn completed_items_delivered_once_in_order() {
        let ch = EventChannels::new(4);
        let mut rx = ch.subscribe_completed();
        ch.publish_completed(item(1));
        ch.publish_completed(item(2));
        assert_eq!(rx.try_recv().unwrap().job_id, 1);
        assert_eq!(rx.try_recv().unwrap().job_id, 2);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn slow_subscriber_lags_instead_of_blocking() {
        let ch = EventChannels::new(2);
        let mut rx = ch.subscribe_completed();
        for id in 1..=4 {
            ch.publish_completed(item(id));
        }
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Lagged(2))));
        assert_eq!(rx.try_recv().unwrap().job_id, 3);
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let ch = EventChannels::new(1);
        ch.publish_completed(item(1));
        ch.publish_progress(ProgressSnapshot::idle());
    }
}
