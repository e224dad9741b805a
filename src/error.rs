//! Error types for syscall-deception
//!
//! Every failure the engine can report maps onto a Linux errno so it can be
//! handed back to an intercepted process exactly like a genuine syscall error.

use thiserror::Error;

use crate::rules::RuleId;

pub const EINVAL: i32 = 22;
pub const ENOENT: i32 = 2;
pub const ENOMEM: i32 = 12;
pub const EFAULT: i32 = 14;

/// Errors surfaced by the rule table, the interpreter and the dispatcher
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeceptionError {
    /// Missing or malformed required field
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Remove of an unknown rule id
    #[error("rule {0} not found")]
    NotFound(RuleId),

    /// Unrecognized control verb
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// Resource exhaustion while building a rule
    #[error("allocation failure")]
    AllocationFailure,

    /// The substituted response could not be delivered to the caller
    #[error("fault while copying result to caller")]
    TransportFault,
}

impl DeceptionError {
    /// Platform error code for this kind
    pub fn errno(&self) -> i32 {
        match self {
            DeceptionError::InvalidArgument(_) => EINVAL,
            DeceptionError::NotFound(_) => ENOENT,
            DeceptionError::InvalidCommand(_) => EINVAL,
            DeceptionError::AllocationFailure => ENOMEM,
            DeceptionError::TransportFault => EFAULT,
        }
    }

    /// Kernel return convention: negative errno
    pub fn as_syscall_return(&self) -> i64 {
        -i64::from(self.errno())
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        DeceptionError::InvalidArgument(msg.into())
    }
}

impl From<nix::errno::Errno> for DeceptionError {
    fn from(err: nix::errno::Errno) -> Self {
        match err {
            nix::errno::Errno::EFAULT => DeceptionError::TransportFault,
            nix::errno::Errno::ENOMEM => DeceptionError::AllocationFailure,
            other => DeceptionError::InvalidArgument(other.to_string()),
        }
    }
}

impl From<std::collections::TryReserveError> for DeceptionError {
    fn from(_: std::collections::TryReserveError) -> Self {
        DeceptionError::AllocationFailure
    }
}

pub type Result<T> = std::result::Result<T, DeceptionError>;
