use script_abi::{CatalogError, TaskId};
use slot_table::SlotError;
use thiserror::Error;

/// Scheduler-level failures. Script failures never surface here; they are
/// absorbed at the task boundary and logged.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Bootstrap could not enumerate scripts; nothing was registered.
    #[error("script discovery failed: {0}")]
    Discovery(#[from] CatalogError),

    #[error("{0} scripts discovered, more than task ids can address")]
    TooManyScripts(usize),

    /// Executing-task lookup made while no task is running on this thread.
    #[error("no script task is executing")]
    NoExecutingTask,

    #[error("{0} does not exist")]
    UnknownTask(TaskId),
}

/// A discovered script that could not be given a slot. It never runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationFailure {
    pub task: TaskId,
    pub name: String,
    pub error: SlotError,
}
