use std::io;

use thiserror::Error;
use twdict_archive::ExtractError;
use twdict_core::error::ParseError;
use twdict_fetch::FetchError;

use crate::metadata::MetadataError;
use crate::reconciler::ReconcileState;

/// A failed update. The previously active version is still in place.
#[derive(Debug, Error)]
#[error("update of '{dictionary_id}' failed while {state}: {kind}; the previous version remains active")]
pub struct UpdateError {
    pub dictionary_id: String,
    /// Last state entered before the failure
    pub state: ReconcileState,
    #[source]
    pub kind: UpdateErrorKind,
}

impl UpdateError {
    pub fn new(dictionary_id: &str, state: ReconcileState, kind: impl Into<UpdateErrorKind>) -> Self {
        Self {
            dictionary_id: dictionary_id.to_string(),
            state,
            kind: kind.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, UpdateErrorKind::Cancelled)
    }
}

#[derive(Debug, Error)]
pub enum UpdateErrorKind {
    #[error("network: {0}")]
    Transport(FetchError),

    #[error("archive rejected: {0}")]
    Extract(ExtractError),

    #[error("data file: {0}")]
    Parse(#[from] ParseError),

    #[error("dataset contains no usable entries")]
    EmptyDataset,

    #[error("another update of this dictionary is in progress")]
    Busy,

    #[error("unknown dictionary")]
    UnknownDictionary,

    #[error("dictionary is disabled in the configuration")]
    Disabled,

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error("cancelled")]
    Cancelled,

    #[error("i/o: {0}")]
    Io(#[from] io::Error),
}

impl From<FetchError> for UpdateErrorKind {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Cancelled => UpdateErrorKind::Cancelled,
            other => UpdateErrorKind::Transport(other),
        }
    }
}

impl From<ExtractError> for UpdateErrorKind {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::Cancelled => UpdateErrorKind::Cancelled,
            other => UpdateErrorKind::Extract(other),
        }
    }
}
