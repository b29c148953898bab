use super::types::{MediaItemsPage, RemoteItem, SearchRequest};
use crate::auth::Credential;
use crate::error::PhotoPickError;
use crate::retry::RetryPolicy;
use futures::stream::{self, Stream, StreamExt};
use std::collections::HashSet;
use std::time::Duration;

const LIST_OPERATION: &str = "album listing";

enum PageCursor {
    First,
    Next(String),
    Done,
}

/// Paginated enumeration of the items in an album.
pub struct RemoteLister {
    client: reqwest::Client,
    search_url: String,
    page_size: u32,
    request_timeout: Duration,
    retry: RetryPolicy,
}

impl RemoteLister {
    pub fn new(
        client: reqwest::Client,
        api_endpoint: &str,
        page_size: u32,
        request_timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            search_url: format!("{}/mediaItems:search", api_endpoint.trim_end_matches('/')),
            page_size,
            request_timeout,
            retry,
        }
    }

    async fn fetch_page(
        &self,
        album_id: &str,
        credential: &Credential,
        page_token: Option<&str>,
    ) -> Result<MediaItemsPage, PhotoPickError> {
        let request = SearchRequest {
            album_id,
            page_size: self.page_size,
            page_token,
        };

        let request = &request;
        self.retry
            .run(LIST_OPERATION, move || async move {
                tracing::debug!(url = %self.search_url, page_token = ?page_token, "Requesting album page");
                credential
                    .apply(self.client.post(&self.search_url))
                    .timeout(self.request_timeout)
                    .json(request)
                    .send()
                    .await
                    .and_then(reqwest::Response::error_for_status)
                    .map_err(|e| PhotoPickError::from_reqwest(LIST_OPERATION, e))?
                    .json::<MediaItemsPage>()
                    .await
                    .map_err(|e| PhotoPickError::from_reqwest(LIST_OPERATION, e))
            })
            .await
    }

    /// Lazily yields one batch of items per page. The stream ends after the
    /// first page without a continuation token, or right after an error.
    pub fn pages<'a>(
        &'a self,
        album_id: &'a str,
        credential: &'a Credential,
    ) -> impl Stream<Item = Result<Vec<RemoteItem>, PhotoPickError>> + 'a {
        let start = (PageCursor::First, HashSet::new());
        stream::unfold(start, move |(cursor, mut seen_tokens)| async move {
            let token = match cursor {
                PageCursor::First => None,
                PageCursor::Next(token) => Some(token),
                PageCursor::Done => return None,
            };

            match self.fetch_page(album_id, credential, token.as_deref()).await {
                Ok(page) => {
                    if let Some(token) = token {
                        seen_tokens.insert(token);
                    }
                    let next = match page.next_token() {
                        Some(next) if seen_tokens.contains(next) => {
                            let err = PhotoPickError::Decode {
                                operation: LIST_OPERATION.to_string(),
                                reason: format!("continuation token {next} repeats an earlier page"),
                            };
                            return Some((Err(err), (PageCursor::Done, seen_tokens)));
                        }
                        Some(next) => PageCursor::Next(next.to_string()),
                        None => PageCursor::Done,
                    };
                    let items = page.media_items.into_iter().map(RemoteItem::from).collect();
                    Some((Ok(items), (next, seen_tokens)))
                }
                Err(err) => Some((Err(err), (PageCursor::Done, seen_tokens))),
            }
        })
    }

    /// Drains every page. Any failing page fails the whole listing, so a
    /// partial album never reaches selection. Ids seen on an earlier page are dropped.
    pub async fn try_list(
        &self,
        album_id: &str,
        credential: &Credential,
    ) -> Result<Vec<RemoteItem>, PhotoPickError> {
        let mut pages = std::pin::pin!(self.pages(album_id, credential));
        let mut seen = HashSet::new();
        let mut items = Vec::new();
        let mut page_count = 0usize;

        while let Some(page) = pages.next().await {
            page_count += 1;
            for item in page? {
                if seen.insert(item.id.clone()) {
                    items.push(item);
                } else {
                    tracing::debug!(item_id = %item.id, "Skipping duplicate item");
                }
            }
        }

        tracing::info!(album_id, items = items.len(), pages = page_count, "Album listed");
        Ok(items)
    }

    /// Like [`Self::try_list`], but logs the failure and yields no items.
    pub async fn list(&self, album_id: &str, credential: &Credential) -> Vec<RemoteItem> {
        match self.try_list(album_id, credential).await {
            Ok(items) => items,
            Err(e) => {
                tracing::error!(album_id, error = %e, "Error fetching photos from album");
                Vec::new()
            }
        }
    }
}
