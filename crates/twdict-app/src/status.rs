use std::process::ExitCode;

use twdict_core::error::LookupError;

use crate::error::{UpdateError, UpdateErrorKind};

/// Process exit status of the `twdict` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Success = 0,
    NotFound = 1,
    NetworkFailure = 2,
    /// Rejected archive, unreadable data file or empty dataset
    ValidationFailure = 3,
    Busy = 4,
    Failure = 5,
}

impl Status {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        ExitCode::from(status.code())
    }
}

impl From<&UpdateError> for Status {
    fn from(error: &UpdateError) -> Self {
        match &error.kind {
            UpdateErrorKind::Transport(_) => Status::NetworkFailure,
            UpdateErrorKind::Extract(_)
            | UpdateErrorKind::Parse(_)
            | UpdateErrorKind::EmptyDataset => Status::ValidationFailure,
            UpdateErrorKind::Busy => Status::Busy,
            UpdateErrorKind::UnknownDictionary
            | UpdateErrorKind::Disabled
            | UpdateErrorKind::Metadata(_)
            | UpdateErrorKind::Cancelled
            | UpdateErrorKind::Io(_) => Status::Failure,
        }
    }
}

impl From<&LookupError> for Status {
    fn from(error: &LookupError) -> Self {
        match error {
            LookupError::NotFound { .. } | LookupError::NotLoaded { .. } => Status::NotFound,
        }
    }
}
