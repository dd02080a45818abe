//! CLI command handlers. Each command is in its own file.

mod control;
mod copy;
mod pending;

pub use control::run_control;
pub use copy::{run_copy, CopyArgs};
pub use pending::run_pending;
