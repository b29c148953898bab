use crate::auth::AuthError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhotoPickError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid arguments: {details}")]
    CliArgumentValidation { details: String },

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Transport error during {operation}: {reason}")]
    Transport { operation: String, reason: String },

    #[error("HTTP status {status} during {operation}")]
    HttpStatus { operation: String, status: u16 },

    #[error("Failed to decode response during {operation}: {reason}")]
    Decode { operation: String, reason: String },

    #[error("Failed to save ledger to {path}: {reason}")]
    LedgerSave { path: PathBuf, reason: String },

    #[error("Failed to lock ledger at {path}: {reason}")]
    LedgerLock { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(#[from] eyre::Report),
}

impl PhotoPickError {
    pub const EXIT_CONFIG: u8 = 2;
    pub const EXIT_AUTH: u8 = 3;
    pub const EXIT_LISTING: u8 = 4;
    pub const EXIT_DOWNLOAD: u8 = 5;
    pub const EXIT_VERIFICATION: u8 = 6;
    pub const EXIT_LEDGER: u8 = 7;
    pub const EXIT_INTERRUPTED: u8 = 130;

    /// Process exit code for a run that ended with this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::CliArgumentValidation { .. } => Self::EXIT_CONFIG,
            Self::Auth(_) => Self::EXIT_AUTH,
            Self::Transport { .. }
            | Self::HttpStatus { .. }
            | Self::Decode { .. }
            | Self::Http(_)
            | Self::Json(_) => Self::EXIT_LISTING,
            Self::LedgerSave { .. } | Self::LedgerLock { .. } => Self::EXIT_LEDGER,
            Self::Io(_) | Self::Unexpected(_) => 1,
        }
    }

    /// Whether a retry of the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::HttpStatus { status, .. } => is_transient_status(*status),
            Self::Http(e) => match e.status() {
                Some(status) => is_transient_status(status.as_u16()),
                None => e.is_timeout() || e.is_connect(),
            },
            _ => false,
        }
    }

    pub(crate) fn from_reqwest(operation: &str, err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::HttpStatus {
                operation: operation.to_string(),
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            Self::Decode {
                operation: operation.to_string(),
                reason: err.to_string(),
            }
        } else {
            Self::Transport {
                operation: operation.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

pub(crate) fn is_transient_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..=599).contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_failure_class() {
        let transport = PhotoPickError::Transport {
            operation: "list".to_string(),
            reason: "reset".to_string(),
        };
        let auth = PhotoPickError::Auth(AuthError::MissingField {
            source_name: "token file".to_string(),
            field: "refresh_token".to_string(),
        });
        let lock = PhotoPickError::LedgerLock {
            path: PathBuf::from("ledger.json.lock"),
            reason: "busy".to_string(),
        };

        assert_eq!(transport.exit_code(), PhotoPickError::EXIT_LISTING);
        assert_eq!(auth.exit_code(), PhotoPickError::EXIT_AUTH);
        assert_eq!(lock.exit_code(), PhotoPickError::EXIT_LEDGER);
    }

    #[test]
    fn test_transient_classification() {
        let status = |status| PhotoPickError::HttpStatus {
            operation: "download".to_string(),
            status,
        };
        assert!(status(503).is_transient());
        assert!(status(429).is_transient());
        assert!(status(408).is_transient());
        assert!(!status(404).is_transient());
        assert!(!status(401).is_transient());
        assert!(
            !PhotoPickError::Decode {
                operation: "list".to_string(),
                reason: "bad json".to_string()
            }
            .is_transient()
        );
    }
}
