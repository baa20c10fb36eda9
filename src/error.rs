use std::fmt::{Display, Formatter};

use crate::api::UserId;

pub type DynError = Box<dyn std::error::Error + Send + Sync + 'static>;
pub type Result<T> = std::result::Result<T, DynError>;

/// Failures surfaced by a [`crate::api::UserStore`] or by the list state guarding it.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Network failure, timeout, or an undecodable body.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server could not be reached. Raised by stores that have no
    /// `reqwest::Error` to carry.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The server answered outside the 2xx range.
    #[error("server responded with status {status}")]
    Status { status: u16 },

    #[error("user {0} not found")]
    NotFound(UserId),

    /// A status code returned without a transport failure was not a success.
    #[error("operation rejected with status {status}")]
    Rejected { status: u16 },

    /// Another operation on the same record has not been reconciled yet.
    #[error("user {0} has an operation in flight")]
    Busy(UserId),
}

impl StoreError {
    /// True for the transport family: network, timeout, decode, non-2xx and unknown id.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            StoreError::Transport(_)
                | StoreError::Connection(_)
                | StoreError::Status { .. }
                | StoreError::NotFound(_)
        )
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub trait Context<T> {
    fn with_ctx<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

#[derive(Debug)]
pub struct WithContextError {
    pub context: String,
    pub source: DynError,
}

impl Display for WithContextError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.context, self.source)
    }
}

impl std::error::Error for WithContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.source)
    }
}

impl<T, E> Context<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_ctx<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            Box::new(WithContextError {
                context: f(),
                source: e.into(),
            }) as DynError
        })
    }
}

#[derive(Debug)]
pub struct SimpleError(pub String);

impl SimpleError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl std::fmt::Display for SimpleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for SimpleError {}

pub fn simple_error(msg: impl Into<String>) -> DynError {
    Box::new(SimpleError::new(msg))
}
