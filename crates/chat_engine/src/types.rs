use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    Network,
    /// The body stream broke off after the response started.
    Stream,
    RetriesExhausted { attempts: u32 },
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Stream => write!(f, "stream interrupted"),
            FailureKind::RetriesExhausted { attempts } => {
                write!(f, "gave up after {attempts} attempts")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownloadError {
    #[error("Download failed after {attempts} attempts: {url}")]
    Exhausted {
        url: String,
        attempts: u32,
        #[source]
        last: FetchError,
    },
}

impl From<DownloadError> for FetchError {
    fn from(err: DownloadError) -> Self {
        let message = err.to_string();
        match err {
            DownloadError::Exhausted { attempts, .. } => {
                FetchError::new(FailureKind::RetriesExhausted { attempts }, message)
            }
        }
    }
}

/// A listener refused an event, typically because the client went away.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("event sink failed: {0}")]
pub struct SinkError(pub String);
