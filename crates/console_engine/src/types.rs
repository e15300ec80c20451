use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use console_core::{
    DownloadRequest, JobAction, JobFile, JobId, PageResponse, RequestId, RetrievalJob,
};
use thiserror::Error;

use crate::persist::PersistError;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Poll timer fired.
    PollTick,
    JobsListed(Result<Vec<RetrievalJob>, ApiError>),
    JobActionFinished {
        action: JobAction,
        job_id: Option<JobId>,
        result: Result<(), ApiError>,
    },
    JobFilesListed {
        job_id: JobId,
        result: Result<Vec<JobFile>, ApiError>,
    },
    PageFetched {
        request_id: RequestId,
        key: String,
        result: Result<PageResponse, ApiError>,
    },
    SearchSettled {
        token: u64,
    },
    DownloadProgress {
        request: DownloadRequest,
        bytes: u64,
    },
    DownloadFinished {
        request: DownloadRequest,
        result: Result<PathBuf, DownloadError>,
    },
}

/// Binary payload of a download before it is written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Text shown to the user: the server's own explanation when it gave one.
    pub fn user_message(&self) -> String {
        match self.kind {
            FailureKind::HttpStatus(_) | FailureKind::Unauthorized => self.message.clone(),
            _ => self.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    Network,
    Timeout,
    HttpStatus(u16),
    Unauthorized,
    Decode,
    TooLarge { max_bytes: u64, actual: Option<u64> },
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Unauthorized => write!(f, "not authorized"),
            FailureKind::Decode => write!(f, "unexpected response"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
        }
    }
}

/// A download fails either on the wire or while saving.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownloadError {
    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),
    #[error("could not save file: {0}")]
    Persist(String),
}

impl From<PersistError> for DownloadError {
    fn from(err: PersistError) -> Self {
        DownloadError::Persist(err.to_string())
    }
}
