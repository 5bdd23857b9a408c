//! error types of DomainCore
//!
//! Every fallible DDS operation returns [`DdsResult`]. [`ReturnCode`] is the flat
//! DDS return code view of a result, for callers that bridge to a C-style API.

use std::io;
use thiserror;

pub type DdsResult<T> = std::result::Result<T, DdsError>;

#[derive(Debug, thiserror::Error)]
pub enum DdsError {
    /// the QoS is self-contradictory, or would break an established match
    #[error("InconsistentPolicy: {0}")]
    InconsistentPolicy(String),

    /// attempt to change a policy that cannot be changed on an enabled entity
    #[error("ImmutablePolicy: {0}")]
    ImmutablePolicy(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("PreconditionNotMet: {0}")]
    PreconditionNotMet(String),

    #[error("BadParameter: {0}")]
    BadParameter(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("AlreadyDeleted: {0}")]
    AlreadyDeleted(String),

    #[error("Error: {0}")]
    Error(String),

    /// a recursive deletion finished with some steps failed
    #[error("{failed} of {attempted} deletions failed, first: {first}")]
    CleanupFailed {
        first: Box<DdsError>,
        failed: usize,
        attempted: usize,
    },
}

impl DdsError {
    pub fn return_code(&self) -> ReturnCode {
        match self {
            Self::InconsistentPolicy(_) => ReturnCode::InconsistentPolicy,
            Self::ImmutablePolicy(_) => ReturnCode::ImmutablePolicy,
            Self::Unsupported(_) => ReturnCode::Unsupported,
            Self::PreconditionNotMet(_) => ReturnCode::PreconditionNotMet,
            Self::BadParameter(_) => ReturnCode::BadParameter,
            Self::Timeout(_) => ReturnCode::Timeout,
            Self::AlreadyDeleted(_) => ReturnCode::AlreadyDeleted,
            Self::Error(_) | Self::CleanupFailed { .. } => ReturnCode::Error,
        }
    }
}

impl From<IoError> for DdsError {
    fn from(e: IoError) -> Self {
        Self::Error(e.to_string())
    }
}

/// DDS v1.4 spec, 2.2.1.1 Format and Conventions, ReturnCode_t
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReturnCode {
    Ok,
    Error,
    Unsupported,
    BadParameter,
    PreconditionNotMet,
    ImmutablePolicy,
    InconsistentPolicy,
    AlreadyDeleted,
    Timeout,
}

impl<T> From<&DdsResult<T>> for ReturnCode {
    fn from(r: &DdsResult<T>) -> Self {
        match r {
            Ok(_) => ReturnCode::Ok,
            Err(e) => e.return_code(),
        }
    }
}

pub type IoResult<T> = std::result::Result<T, IoError>;

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("SpeedyError: {0}")]
    SpeedyError(#[from] speedy::Error),

    #[error("CdrError: {0}")]
    CdrError(#[from] cdr::Error),

    #[error("transport: {0}")]
    Transport(String),

    #[error("{0}")]
    IoError(#[from] io::Error),
}
