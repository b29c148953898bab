use crate::download::FailureKind;
use crate::error::PhotoPickError;
use crate::remote::RemoteItem;
use std::path::PathBuf;

/// Stages of a single pick run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickState {
    Idle,
    Listing,
    Filtering,
    NoCandidates,
    Selected,
    Downloading,
    Verifying,
    Done,
    Failed,
}

impl PickState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::NoCandidates | Self::Done | Self::Failed)
    }
}

/// A listed item that still needs downloading, with the file it would be written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub item: RemoteItem,
    pub target_path: PathBuf,
}

/// How a run ended. Runs that could not authenticate or persist the ledger
/// surface a [`PhotoPickError`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    EmptyAlbum,
    ListingFailed {
        reason: String,
    },
    AllFetched {
        listed: usize,
    },
    Downloaded {
        item_id: String,
        path: PathBuf,
        digest: String,
        bytes_written: u64,
    },
    DownloadFailed {
        item_id: String,
        path: PathBuf,
        failure_kind: Option<FailureKind>,
    },
    VerificationFailed {
        item_id: String,
        path: PathBuf,
        reason: String,
    },
}

impl PickOutcome {
    pub fn terminal_state(&self) -> PickState {
        match self {
            Self::EmptyAlbum | Self::ListingFailed { .. } | Self::AllFetched { .. } => {
                PickState::NoCandidates
            }
            Self::Downloaded { .. } => PickState::Done,
            Self::DownloadFailed { .. } | Self::VerificationFailed { .. } => PickState::Failed,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::EmptyAlbum | Self::AllFetched { .. } | Self::Downloaded { .. } => 0,
            Self::ListingFailed { .. } => PhotoPickError::EXIT_LISTING,
            Self::DownloadFailed { .. } => PhotoPickError::EXIT_DOWNLOAD,
            Self::VerificationFailed { .. } => PhotoPickError::EXIT_VERIFICATION,
        }
    }

    /// One-line human readable summary of the run.
    pub fn summary(&self) -> String {
        match self {
            Self::EmptyAlbum => "No photos found in the album.".to_string(),
            Self::ListingFailed { reason } => {
                format!("No photos found in the album (listing failed: {reason}).")
            }
            Self::AllFetched { .. } => {
                "All photos in the album have already been fetched (or have matching hashes)."
                    .to_string()
            }
            Self::Downloaded { path, .. } => format!("Downloaded {}", path.display()),
            Self::DownloadFailed {
                item_id,
                failure_kind,
                ..
            } => match failure_kind {
                Some(kind) => format!("Failed to download photo with ID {item_id}: {kind}"),
                None => format!("Failed to download photo with ID {item_id}"),
            },
            Self::VerificationFailed { path, reason, .. } => format!(
                "Downloaded {} but could not calculate its hash ({reason}); it was not recorded.",
                path.display()
            ),
        }
    }
}
