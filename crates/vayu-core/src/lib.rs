pub mod config;
pub mod logging;

pub mod control;
pub mod copier;
pub mod dedupe;
pub mod engine;
pub mod events;
pub mod job;
pub mod progress;
pub mod queue;
pub mod storage;

pub use engine::{EngineError, EngineState, TransferEngine};
pub use job::{CompletedItem, JobId, JobReport, JobStatus, MediaItem, TransferJob};
pub use progress::ProgressSnapshot;
pub use storage::{LocalFsProvider, Locator, MemoryProvider, StorageError, StorageProvider};
