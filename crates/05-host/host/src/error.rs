use thiserror::Error;

pub type HostResult<T> = Result<T, HostError>;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("host rejected script registration: {0}")]
    Rejected(String),

    #[error("host already holds {0} script callbacks")]
    CapacityExhausted(usize),
}

impl HostError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        HostError::Rejected(msg.into())
    }
}
