use serde::{Deserialize, Serialize};

/// Filename hint used when the listing does not report one.
pub const UNKNOWN_FILENAME: &str = "unknown_file";

/// One media item of the album as reported by the listing API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    pub id: String,
    pub source_url: String,
    pub filename_hint: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchRequest<'a> {
    pub album_id: &'a str,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MediaItemsPage {
    #[serde(default)]
    pub media_items: Vec<MediaItem>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MediaItem {
    pub id: String,
    pub base_url: String,
    #[serde(default)]
    pub filename: Option<String>,
}

impl From<MediaItem> for RemoteItem {
    fn from(item: MediaItem) -> Self {
        Self {
            id: item.id,
            source_url: item.base_url,
            filename_hint: item
                .filename
                .unwrap_or_else(|| UNKNOWN_FILENAME.to_string()),
        }
    }
}

impl MediaItemsPage {
    /// The continuation token, if another page follows.
    pub fn next_token(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }
}
