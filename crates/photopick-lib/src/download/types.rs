use crate::error::is_transient_status;
use crate::retry::Retryable;
use std::fmt;
use std::time::Duration;

/// Why a download did not complete. Only used for logging and retry decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    Connection,
    HttpStatus(u16),
    Transport,
    Io,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection => write!(f, "connection error"),
            Self::HttpStatus(status) => write!(f, "HTTP error {status}"),
            Self::Transport => write!(f, "transport error"),
            Self::Io => write!(f, "local I/O error"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadResult {
    pub success: bool,
    pub bytes_written: u64,
    pub failure_kind: Option<FailureKind>,
}

impl DownloadResult {
    pub fn succeeded(bytes_written: u64) -> Self {
        Self {
            success: true,
            bytes_written,
            failure_kind: None,
        }
    }

    pub fn failed(bytes_written: u64, kind: FailureKind) -> Self {
        Self {
            success: false,
            bytes_written,
            failure_kind: Some(kind),
        }
    }
}

impl fmt::Display for DownloadResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failure_kind {
            None => write!(f, "downloaded {} bytes", self.bytes_written),
            Some(kind) => write!(f, "{} after {} bytes", kind, self.bytes_written),
        }
    }
}

impl Retryable for DownloadResult {
    fn is_transient(&self) -> bool {
        match self.failure_kind {
            Some(FailureKind::Connection | FailureKind::Transport) => true,
            Some(FailureKind::HttpStatus(status)) => is_transient_status(status),
            Some(FailureKind::Io) | None => false,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct DownloadOptions {
    /// Longest the transfer may stall waiting for the response or the next chunk.
    pub stall_timeout: Duration,
    pub delete_partial_on_failure: bool,
    pub show_progress: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            stall_timeout: Duration::from_secs(60),
            delete_partial_on_failure: true,
            show_progress: true,
        }
    }
}
