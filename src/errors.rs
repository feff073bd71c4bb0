//! Subscription Engine Error Hierarchy
//!
//! Protocol outcomes travel as [`StatusCode`] values inside service results.
//! The types here cover everything around them: configuration, the actor
//! boundary and process-level failures.

use config::ConfigError;
use tokio::task::JoinError;

use crate::types::StatusCode;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Infrastructure-level failures (actor channels, background tasks, IO)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A service call completed with a service-level status
    #[error("Service fault: {0}")]
    ServiceFault(StatusCode),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error("Subscription server is not running")]
    ServerUnavailable,

    #[error("Subscription server dropped the responder of {operation}")]
    ResponderDropped { operation: &'static str },

    #[error("Background task failed: {0}")]
    TaskFailed(#[from] JoinError),

    #[error("Failed to initialize observability: {0}")]
    Observability(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The protocol status behind a service fault, if any.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Error::ServiceFault(status) => Some(*status),
            _ => None,
        }
    }
}

// ============== Conversion Implementations ============== //
impl From<StatusCode> for Error {
    fn from(status: StatusCode) -> Self {
        Error::ServiceFault(status)
    }
}

impl From<JoinError> for Error {
    fn from(e: JoinError) -> Self {
        Error::System(SystemError::TaskFailed(e))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::System(SystemError::Io(e))
    }
}
