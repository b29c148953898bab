mod download;
mod extension;
mod progress;
mod types;

pub use download::Downloader;
pub use extension::{
    DEFAULT_EXTENSION, ExtensionProbe, extension_from_content_type, extension_from_url,
};
pub use progress::{DownloadProgress, ProgressSnapshot};
pub use types::{DownloadOptions, DownloadResult, FailureKind};
