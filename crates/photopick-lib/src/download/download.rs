use super::progress::DownloadProgress;
use super::types::{DownloadOptions, DownloadResult, FailureKind};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

struct TransferFailure {
    kind: FailureKind,
    reason: String,
}

impl TransferFailure {
    fn io(context: &str, err: std::io::Error) -> Self {
        Self {
            kind: FailureKind::Io,
            reason: format!("{context}: {err}"),
        }
    }

    fn stalled(after: std::time::Duration) -> Self {
        Self {
            kind: FailureKind::Transport,
            reason: format!("no data received for {}s", after.as_secs()),
        }
    }
}

/// Removes the output file when dropped while armed. Covers error returns and
/// a transfer future that is dropped mid-stream.
struct PartialFileGuard {
    path: PathBuf,
    armed: bool,
}

impl PartialFileGuard {
    fn new(path: &Path, armed: bool) -> Self {
        Self {
            path: path.to_path_buf(),
            armed,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PartialFileGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!(output = %self.path.display(), "Removed partial download"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(output = %self.path.display(), error = %e, "Could not remove partial download")
            }
        }
    }
}

fn classify(err: &reqwest::Error) -> FailureKind {
    if let Some(status) = err.status() {
        FailureKind::HttpStatus(status.as_u16())
    } else if err.is_connect() {
        FailureKind::Connection
    } else {
        FailureKind::Transport
    }
}

impl From<reqwest::Error> for TransferFailure {
    fn from(err: reqwest::Error) -> Self {
        Self {
            kind: classify(&err),
            reason: err.to_string(),
        }
    }
}

/// Streams a single source URL to a local file.
///
/// Never retries on its own; callers decide whether a failed
/// [`DownloadResult`] is worth another attempt.
pub struct Downloader {
    client: reqwest::Client,
    options: DownloadOptions,
}

impl Downloader {
    pub fn new(client: reqwest::Client, options: DownloadOptions) -> Self {
        Self { client, options }
    }

    pub async fn download(&self, source_url: &str, dest_path: &Path) -> DownloadResult {
        info!(url = source_url, output = %dest_path.display(), "Downloading");

        let mut progress = None;
        let outcome = self.transfer(source_url, dest_path, &mut progress).await;
        let bytes_written = progress.as_ref().map_or(0, DownloadProgress::bytes_written);

        match outcome {
            Ok(()) => {
                if let Some(progress) = &progress {
                    progress.finish();
                }
                info!(output = %dest_path.display(), bytes = bytes_written, "Downloaded");
                DownloadResult::succeeded(bytes_written)
            }
            Err(failure) => {
                if let Some(progress) = &progress {
                    progress.abandon();
                }
                match failure.kind {
                    FailureKind::Connection => {
                        error!(url = source_url, reason = %failure.reason, "Connection error downloading")
                    }
                    FailureKind::HttpStatus(status) => {
                        error!(url = source_url, status, reason = %failure.reason, "HTTP error downloading")
                    }
                    FailureKind::Transport => {
                        error!(url = source_url, reason = %failure.reason, "Generic error downloading")
                    }
                    FailureKind::Io => {
                        error!(output = %dest_path.display(), reason = %failure.reason, "Failed writing download")
                    }
                }
                DownloadResult::failed(bytes_written, failure.kind)
            }
        }
    }

    async fn transfer(
        &self,
        source_url: &str,
        dest_path: &Path,
        progress: &mut Option<DownloadProgress>,
    ) -> Result<(), TransferFailure> {
        let stall_timeout = self.options.stall_timeout;

        let response = tokio::time::timeout(stall_timeout, self.client.get(source_url).send())
            .await
            .map_err(|_| TransferFailure::stalled(stall_timeout))??
            .error_for_status()?;

        let progress = progress.insert(DownloadProgress::new(
            response.content_length(),
            self.options.show_progress,
        ));

        let file = tokio::fs::File::create(dest_path)
            .await
            .map_err(|e| TransferFailure::io("Failed to create output file", e))?;
        let mut partial = PartialFileGuard::new(dest_path, self.options.delete_partial_on_failure);
        let mut writer = tokio::io::BufWriter::new(file);
        let mut body = response.bytes_stream();

        loop {
            let next = tokio::time::timeout(stall_timeout, body.next())
                .await
                .map_err(|_| TransferFailure::stalled(stall_timeout))?;
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk?;

            writer
                .write_all(&chunk)
                .await
                .map_err(|e| TransferFailure::io("Failed to write output file", e))?;
            progress.advance(chunk.len() as u64);
        }

        writer
            .flush()
            .await
            .map_err(|e| TransferFailure::io("Failed to flush output file", e))?;
        partial.disarm();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn downloader(delete_partial_on_failure: bool) -> Downloader {
        Downloader::new(
            reqwest::Client::new(),
            DownloadOptions {
                stall_timeout: Duration::from_secs(5),
                delete_partial_on_failure,
                show_progress: false,
            },
        )
    }

    #[tokio::test]
    async fn test_download_writes_body_in_order() {
        let body: Vec<u8> = (0..20_000u32).map(|i| (i % 256) as u8).collect();
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/photo")
            .with_status(200)
            .with_body(&body)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("photo.jpg");
        let result = downloader(true)
            .download(&format!("{}/photo", server.url()), &dest)
            .await;

        assert_eq!(result, DownloadResult::succeeded(body.len() as u64));
        assert_eq!(std::fs::read(&dest).unwrap(), body);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_error_is_classified() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/photo")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("photo.jpg");
        let result = downloader(true)
            .download(&format!("{}/photo", server.url()), &dest)
            .await;

        assert!(!result.success);
        assert_eq!(result.failure_kind, Some(FailureKind::HttpStatus(404)));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_connection_failure_is_classified() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dir = tempfile::tempdir().unwrap();
        let result = downloader(true)
            .download(&format!("http://{addr}/photo"), &dir.path().join("photo.jpg"))
            .await;

        assert_eq!(result.failure_kind, Some(FailureKind::Connection));
        assert_eq!(result.bytes_written, 0);
    }

    #[tokio::test]
    async fn test_unwritable_destination_is_an_io_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/photo")
            .with_status(200)
            .with_body("data")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing-dir").join("photo.jpg");
        let result = downloader(false)
            .download(&format!("{}/photo", server.url()), &dest)
            .await;

        assert_eq!(result.failure_kind, Some(FailureKind::Io));
    }

    /// Sends the headers and a few body bytes, then holds the connection open.
    async fn spawn_stalling_server() -> std::net::SocketAddr {
        use tokio::io::AsyncReadExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = [0u8; 1024];
                let _ = socket.read(&mut request).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 1000\r\n\r\npartial")
                    .await;
                held.push(socket);
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_cancelled_download_removes_partial_file() {
        let addr = spawn_stalling_server().await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("photo.jpg");

        let task = tokio::spawn({
            let dest = dest.clone();
            async move { downloader(true).download(&format!("http://{addr}/photo"), &dest).await }
        });
        for _ in 0..100 {
            if dest.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(dest.exists(), "transfer should have started writing");

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert!(!dest.exists());
    }
}
