//! Transfer job model: one file queued for copying, plus the records the
//! engine hands back to observers.

use crate::storage::Locator;

/// Job identifier, assigned by the engine on enqueue.
pub type JobId = u64;

/// Lifecycle of a single job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Returns true if no further transitions are allowed.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One media item as produced by the folder enumerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub locator: Locator,
    pub display_name: String,
    pub size_bytes: u64,
    pub media_type: String,
}

/// One file to move from `source` into `destination_folder`.
#[derive(Debug, Clone)]
pub struct TransferJob {
    /// Zero until the engine assigns an id on enqueue.
    pub id: JobId,
    pub source: Locator,
    pub destination_folder: Locator,
    /// Used to create the destination item and to detect existing copies.
    pub display_name: String,
    pub media_type: String,
    pub size_bytes: u64,
    pub status: JobStatus,
}

impl TransferJob {
    pub fn new(item: MediaItem, destination_folder: Locator) -> Self {
        Self {
            id: 0,
            source: item.locator,
            destination_folder,
            display_name: item.display_name,
            media_type: item.media_type,
            size_bytes: item.size_bytes,
            status: JobStatus::Pending,
        }
    }

    /// Move to `next`. Terminal jobs are never mutated again; returns false in that case.
    pub fn transition(&mut self, next: JobStatus) -> bool {
        if self.status.is_terminal() {
            tracing::debug!(
                job_id = self.id,
                from = %self.status,
                to = %next,
                "ignoring transition of finished job"
            );
            return false;
        }
        self.status = next;
        true
    }
}

/// Payload of the completed-item stream: one event per finished file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedItem {
    pub job_id: JobId,
    pub display_name: String,
    pub source: Locator,
    pub destination: Locator,
    pub size_bytes: u64,
}

/// Terminal record of a job, kept so callers can reconcile failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub job_id: JobId,
    pub display_name: String,
    pub status: JobStatus,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> MediaItem {
        MediaItem {
            locator: Locator::new("src/a.jpg"),
            display_name: "a.jpg".into(),
            size_bytes: 10,
            media_type: "image/jpeg".into(),
        }
    }

    #[test]
    fn new_job_is_pending() {
        let job = TransferJob::new(item(), Locator::new("dst"));
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.display_name, "a.jpg");
        assert_eq!(job.size_bytes, 10);
    }

    #[test]
    fn terminal_jobs_are_frozen() {
        let mut job = TransferJob::new(item(), Locator::new("dst"));
        assert!(job.transition(JobStatus::InProgress));
        assert!(job.transition(JobStatus::Completed));
        assert!(!job.transition(JobStatus::Failed));
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[test]
    fn status_display_names() {
        assert_eq!(JobStatus::InProgress.to_string(), "in_progress");
        assert_eq!(JobStatus::Cancelled.as_str(), "cancelled");
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
    }
}
