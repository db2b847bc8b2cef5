use thiserror::Error;

use crate::{FiberId, FiberStatus};

pub type FiberResult<T> = Result<T, FiberError>;

/// Misuse of the resume/suspend protocol, or a body that blew up.
///
/// Every variant is fatal to the fiber it names and to nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FiberError {
    #[error("fiber {id} cannot be resumed while {status}")]
    NotSuspended { id: FiberId, status: FiberStatus },

    #[error("fiber {0} was suspended from outside its own execution")]
    NotRunning(FiberId),

    #[error("fiber {id} panicked: {message}")]
    Panicked { id: FiberId, message: String },

    #[error("fiber {0} parked on a future it does not own")]
    ForeignAwait(FiberId),
}

impl FiberError {
    /// Fiber the error refers to.
    pub fn fiber(&self) -> FiberId {
        match *self {
            FiberError::NotSuspended { id, .. } | FiberError::Panicked { id, .. } => id,
            FiberError::NotRunning(id) | FiberError::ForeignAwait(id) => id,
        }
    }
}
