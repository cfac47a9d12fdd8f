//! Fault taxonomy for the dispatch pipeline.
//!
//! Actions and views report failures as [`ActionError`]. The dispatcher
//! classifies them and surfaces a [`DispatchError`] to the transport:
//!
//! | Raised by the action            | Dispatcher reaction                               | Surfaced as                      |
//! |---------------------------------|---------------------------------------------------|----------------------------------|
//! | [`ActionError::Status`]         | `send_error(status, message)`, context released   | [`DispatchError::Failed`] (status) |
//! | [`ActionError::Other`]          | logged, context released                          | [`DispatchError::Failed`] (none) |
//! | [`ActionError::Transport`]      | logged, rethrown unchanged                        | [`DispatchError::Transport`]     |

use http::StatusCode;
use std::fmt;
use std::io;

/// Error raised by action bodies, invokers and view results.
#[derive(Debug)]
pub enum ActionError {
    /// Deliberate application fault carrying the protocol status to answer with.
    Status {
        /// Status code sent to the client
        status: StatusCode,
        /// Reason sent to the client
        message: String,
    },
    /// I/O failure on the underlying connection.
    Transport(io::Error),
    /// Anything else. Answered with the transport's default error status.
    Other(anyhow::Error),
}

impl ActionError {
    /// Application fault with an explicit status code.
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        ActionError::Status {
            status,
            message: message.into(),
        }
    }

    /// `404 Not Found` application fault.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::status(StatusCode::NOT_FOUND, message)
    }

    /// `400 Bad Request` application fault.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::status(StatusCode::BAD_REQUEST, message)
    }

    /// Unclassified fault from a plain message.
    pub fn other(message: impl fmt::Display) -> Self {
        ActionError::Other(anyhow::anyhow!("{message}"))
    }

    /// Status code carried by an application fault, if any.
    #[must_use]
    pub fn response_status(&self) -> Option<StatusCode> {
        match self {
            ActionError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short label used in log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ActionError::Status { .. } => "application",
            ActionError::Transport(_) => "transport",
            ActionError::Other(_) => "unclassified",
        }
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionError::Status { message, .. } => write!(f, "{message}"),
            ActionError::Transport(e) => write!(f, "transport error: {e}"),
            ActionError::Other(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ActionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ActionError::Transport(e) => Some(e),
            ActionError::Other(e) => Some(&**e),
            ActionError::Status { .. } => None,
        }
    }
}

impl From<io::Error> for ActionError {
    fn from(e: io::Error) -> Self {
        ActionError::Transport(e)
    }
}

impl From<anyhow::Error> for ActionError {
    fn from(e: anyhow::Error) -> Self {
        ActionError::Other(e)
    }
}

impl From<serde_json::Error> for ActionError {
    fn from(e: serde_json::Error) -> Self {
        ActionError::Other(e.into())
    }
}

impl From<NoContextError> for ActionError {
    fn from(e: NoContextError) -> Self {
        ActionError::Other(e.into())
    }
}

/// Failure surfaced by [`Dispatcher::on_request`](crate::dispatcher::Dispatcher::on_request)
/// to the enclosing transport.
#[derive(Debug)]
pub enum DispatchError {
    /// The connection failed; the transport should drop it.
    Transport(io::Error),
    /// The request did not complete normally.
    Failed {
        /// Message of the original fault
        message: String,
        /// Status already sent to the client, for application faults
        status: Option<StatusCode>,
    },
}

impl DispatchError {
    /// Status already written for this failure, if any.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            DispatchError::Failed { status, .. } => *status,
            DispatchError::Transport(_) => None,
        }
    }

    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, DispatchError::Transport(_))
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Transport(e) => write!(f, "transport error: {e}"),
            DispatchError::Failed { message, .. } => write!(f, "dispatch failed: {message}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Transport(e) => Some(e),
            DispatchError::Failed { .. } => None,
        }
    }
}

/// Returned when the request context is requested outside an active dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoContextError;

impl fmt::Display for NoContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no request context is bound to this execution unit")
    }
}

impl std::error::Error for NoContextError {}
