use fiber::FiberError;
use thiserror::Error;

pub type ScriptResult<T = ()> = Result<T, ScriptError>;

/// Failure raised by script code or by misuse of the script API.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("{0}")]
    Message(String),

    #[error("panicked: {0}")]
    Panicked(String),

    /// `wait` (or another suspending call) outside the task's own execution.
    #[error("illegal cross-context call: {0}")]
    IllegalContext(#[from] FiberError),

    #[error("string for a native call contains a NUL byte at offset {0}")]
    InteriorNul(usize),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScriptError {
    pub fn msg(msg: impl Into<String>) -> Self {
        ScriptError::Message(msg.into())
    }

    pub fn is_illegal_context(&self) -> bool {
        matches!(self, ScriptError::IllegalContext(_))
    }
}

/// Failure to enumerate scripts at bootstrap.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("script source unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
