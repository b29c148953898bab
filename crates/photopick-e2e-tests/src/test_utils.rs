use eyre::Result;
use mockito::{Matcher, Mock, ServerGuard};
use photopick_lib::config::{AuthConfig, Config, RetryConfig, TimeoutConfig};
use photopick_lib::verification::{ContentHasher, HashAlgorithm};
use secrecy::SecretString;
use serde_json::json;
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const TEST_ALBUM_ID: &str = "e2e-album";
pub const TEST_API_KEY: &str = "e2e-api-key";

/// A photo served by the mock album: its id and body.
#[derive(Debug, Clone)]
pub struct MockPhoto {
    pub id: String,
    pub body: Vec<u8>,
}

impl MockPhoto {
    pub fn new(id: &str, body: &[u8]) -> Self {
        Self {
            id: id.to_string(),
            body: body.to_vec(),
        }
    }
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("photopick_lib=debug,photopick_e2e_tests=debug")
        .with_test_writer()
        .try_init()
        .ok();
}

pub fn create_test_config(api_endpoint: &str, work_dir: &Path) -> Config {
    Config {
        album_id: TEST_ALBUM_ID.to_string(),
        auth: AuthConfig::ApiKey {
            api_key: SecretString::new(TEST_API_KEY.to_string()),
        },
        output_dir: work_dir.join("downloaded_photos"),
        ledger_path: work_dir.join("fetched_photos.json"),
        hash_algorithm: HashAlgorithm::Sha256,
        page_size: 50,
        api_endpoint: api_endpoint.to_string(),
        scopes: Vec::new(),
        retry: RetryConfig {
            max_retries: 0,
            initial_backoff_ms: 1,
            max_backoff_ms: 1,
        },
        timeouts: TimeoutConfig {
            request_secs: 10,
            connect_secs: 5,
        },
        delete_partial_on_failure: true,
        show_progress: false,
    }
}

pub fn digest_of(bytes: &[u8]) -> String {
    let mut hasher = ContentHasher::new(HashAlgorithm::Sha256);
    hasher.update(bytes);
    hasher.finalize_hex()
}

fn media_path(id: &str) -> String {
    format!("/media/{id}.jpg")
}

/// Serves `pages` from the listing endpoint, chaining them with
/// `page-<n>` continuation tokens.
pub async fn mock_album_pages(server: &mut ServerGuard, pages: &[Vec<String>]) -> Vec<Mock> {
    let base_url = server.url();
    let page_body = |index: usize, ids: &[String]| {
        let items: Vec<_> = ids
            .iter()
            .map(|id| {
                json!({
                    "id": id,
                    "baseUrl": format!("{base_url}{}", media_path(id)),
                    "filename": format!("{id}.jpg"),
                })
            })
            .collect();
        let mut body = json!({ "mediaItems": items });
        if index + 1 < pages.len() {
            body["nextPageToken"] = json!(format!("page-{}", index + 1));
        }
        body.to_string()
    };

    let mut mocks = Vec::new();
    // Token-matched pages are registered first so the catch-all first page
    // never shadows them.
    for (index, ids) in pages.iter().enumerate().skip(1) {
        let mock = server
            .mock("POST", "/mediaItems:search")
            .match_header("x-api-key", TEST_API_KEY)
            .match_body(Matcher::PartialJson(json!({ "pageToken": format!("page-{index}") })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(page_body(index, ids))
            .create_async()
            .await;
        mocks.push(mock);
    }

    let first = pages.first().map(Vec::as_slice).unwrap_or(&[]);
    let mock = server
        .mock("POST", "/mediaItems:search")
        .match_header("x-api-key", TEST_API_KEY)
        .match_body(Matcher::PartialJson(json!({ "albumId": TEST_ALBUM_ID })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(page_body(0, first))
        .create_async()
        .await;
    mocks.push(mock);

    mocks
}

/// Serves a single-page album and the bodies of its photos.
/// Returns the media mocks so callers can count downloads.
pub async fn mock_album(server: &mut ServerGuard, photos: &[MockPhoto]) -> (Mock, Vec<Mock>) {
    let ids: Vec<String> = photos.iter().map(|p| p.id.clone()).collect();
    let mut listing = mock_album_pages(server, &[ids]).await;
    let listing = listing.remove(0);

    let mut media = Vec::new();
    for photo in photos {
        let mock = server
            .mock("GET", media_path(&photo.id).as_str())
            .with_status(200)
            .with_header("content-type", "image/jpeg")
            .with_body(&photo.body)
            .create_async()
            .await;
        media.push(mock);
    }
    (listing, media)
}

/// Number of photos whose download endpoint was hit.
pub async fn total_downloads(media: &[Mock]) -> usize {
    let mut downloads = 0;
    for mock in media {
        if mock.matched_async().await {
            downloads += 1;
        }
    }
    downloads
}

/// Minimal HTTP server whose responses promise `declared_len` bytes but send
/// only `sent` before closing the connection.
pub async fn spawn_truncating_server(declared_len: usize, sent: Vec<u8>) -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }

            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Length: {declared_len}\r\n\r\n"
            );
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(&sent).await;
            let _ = socket.shutdown().await;
        }
    });

    Ok(format!("http://{addr}"))
}
