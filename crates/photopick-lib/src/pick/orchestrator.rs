use super::selector::{choose_candidate, filter_candidates};
use super::types::{Candidate, PickOutcome, PickState};
use crate::auth::{CredentialProvider, provider_from_config};
use crate::config::Config;
use crate::download::{DownloadOptions, DownloadResult, Downloader, ExtensionProbe};
use crate::error::PhotoPickError;
use crate::ledger::{Ledger, LedgerLock};
use crate::remote::RemoteLister;
use crate::retry::RetryPolicy;
use crate::verification::{FileDigester, HashAlgorithm};
use eyre::WrapErr;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;

const DOWNLOAD_OPERATION: &str = "photo download";

/// Drives one pick: list the album, drop what is already on disk, download a
/// single random candidate and record its digest.
pub struct Orchestrator {
    provider: Box<dyn CredentialProvider>,
    lister: RemoteLister,
    downloader: Downloader,
    probe: ExtensionProbe,
    retry: RetryPolicy,
    album_id: String,
    output_dir: PathBuf,
    ledger_path: PathBuf,
    hash_algorithm: HashAlgorithm,
    digester: Box<dyn FileDigester>,
}

impl Orchestrator {
    pub fn from_config(config: &Config, client: reqwest::Client) -> Self {
        let retry = RetryPolicy::from(config.retry);
        let request_timeout = config.timeouts.request();

        Self {
            provider: provider_from_config(
                &config.auth,
                &config.scopes,
                client.clone(),
                request_timeout,
            ),
            lister: RemoteLister::new(
                client.clone(),
                &config.api_endpoint,
                config.page_size,
                request_timeout,
                retry,
            ),
            downloader: Downloader::new(
                client.clone(),
                DownloadOptions {
                    stall_timeout: request_timeout,
                    delete_partial_on_failure: config.delete_partial_on_failure,
                    show_progress: config.show_progress,
                },
            ),
            probe: ExtensionProbe::new(client, request_timeout),
            retry,
            album_id: config.album_id.clone(),
            output_dir: config.output_dir.clone(),
            ledger_path: config.ledger_path.clone(),
            hash_algorithm: config.hash_algorithm,
            digester: Box::new(config.hash_algorithm),
        }
    }

    /// Replaces the provider chosen from the configuration.
    pub fn with_credential_provider(mut self, provider: Box<dyn CredentialProvider>) -> Self {
        self.provider = provider;
        self
    }

    /// Replaces how the downloaded file is digested before it is recorded.
    pub fn with_digester(mut self, digester: Box<dyn FileDigester>) -> Self {
        self.digester = digester;
        self
    }

    pub async fn run(&self) -> Result<PickOutcome, PhotoPickError> {
        let mut rng = StdRng::from_os_rng();
        self.run_with_rng(&mut rng).await
    }

    /// Authentication and ledger persistence failures are errors; every other
    /// way a run can end is a [`PickOutcome`].
    pub async fn run_with_rng<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<PickOutcome, PhotoPickError> {
        std::fs::create_dir_all(&self.output_dir).wrap_err_with(|| {
            format!("Failed to create output directory {}", self.output_dir.display())
        })?;

        let mut lock = LedgerLock::open(&self.ledger_path)?;
        let _guard = lock.try_acquire()?;
        let ledger = Ledger::load_from_file(&self.ledger_path);
        tracing::debug!(entries = ledger.len(), "Ledger loaded");

        let mut state = PickState::Idle;
        self.advance(&mut state, PickState::Listing);

        let credential = self.provider.credential().await?;
        tracing::debug!(provider = self.provider.name(), "Credential acquired");

        let items = match self.lister.try_list(&self.album_id, &credential).await {
            Ok(items) => items,
            Err(e) => {
                tracing::error!(album_id = %self.album_id, error = %e, "Failed to list album");
                return Ok(self.finish(&mut state, PickOutcome::ListingFailed { reason: e.to_string() }));
            }
        };
        if items.is_empty() {
            return Ok(self.finish(&mut state, PickOutcome::EmptyAlbum));
        }

        self.advance(&mut state, PickState::Filtering);
        let listed = items.len();
        let candidates = filter_candidates(
            items,
            &ledger,
            &self.output_dir,
            self.hash_algorithm,
            &self.probe,
        )
        .await;
        tracing::info!(listed, candidates = candidates.len(), "Filtered album items");

        let Some(candidate) = choose_candidate(candidates, rng) else {
            return Ok(self.finish(&mut state, PickOutcome::AllFetched { listed }));
        };

        self.advance(&mut state, PickState::Selected);
        tracing::info!(
            item_id = %candidate.item.id,
            filename = %candidate.item.filename_hint,
            "Selected photo"
        );

        self.advance(&mut state, PickState::Downloading);
        let download = self
            .retry
            .run(DOWNLOAD_OPERATION, || self.download_once(&candidate))
            .await;
        let bytes_written = match download {
            Ok(result) => result.bytes_written,
            Err(result) => {
                let outcome = PickOutcome::DownloadFailed {
                    item_id: candidate.item.id,
                    path: candidate.target_path,
                    failure_kind: result.failure_kind,
                };
                return Ok(self.finish(&mut state, outcome));
            }
        };

        self.advance(&mut state, PickState::Verifying);
        let Candidate { item, target_path } = candidate;
        let digest = match self.digester.digest_file(&target_path).await {
            Ok(digest) => digest,
            Err(e) => {
                tracing::error!(item_id = %item.id, error = %e, "Could not hash downloaded file; ledger left unchanged");
                let outcome = PickOutcome::VerificationFailed {
                    item_id: item.id,
                    path: target_path,
                    reason: e.to_string(),
                };
                return Ok(self.finish(&mut state, outcome));
            }
        };

        ledger
            .update(item.id.clone(), digest.clone())
            .save_to_file(&self.ledger_path)?;
        tracing::info!(item_id = %item.id, digest = %digest, "Ledger updated");

        let outcome = PickOutcome::Downloaded {
            item_id: item.id,
            path: target_path,
            digest,
            bytes_written,
        };
        Ok(self.finish(&mut state, outcome))
    }

    async fn download_once(&self, candidate: &Candidate) -> Result<DownloadResult, DownloadResult> {
        let result = self
            .downloader
            .download(&candidate.item.source_url, &candidate.target_path)
            .await;
        if result.success { Ok(result) } else { Err(result) }
    }

    fn advance(&self, state: &mut PickState, next: PickState) {
        tracing::debug!(from = ?*state, to = ?next, "Pick state transition");
        *state = next;
    }

    fn finish(&self, state: &mut PickState, outcome: PickOutcome) -> PickOutcome {
        self.advance(state, outcome.terminal_state());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthError, Credential};
    use std::path::Path;
    use crate::config::{AuthConfig, RetryConfig, TimeoutConfig};
    use crate::verification::HashError;
    use async_trait::async_trait;
    use secrecy::SecretString;
    use serde_json::json;

    struct FailingProvider;

    #[async_trait]
    impl CredentialProvider for FailingProvider {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn credential(&self) -> Result<Credential, AuthError> {
            Err(AuthError::TokenExchange {
                token_uri: "http://127.0.0.1:9/token".to_string(),
                reason: "refresh token revoked".to_string(),
            })
        }
    }

    struct UnreadableDigester;

    #[async_trait]
    impl FileDigester for UnreadableDigester {
        async fn digest_file(&self, path: &Path) -> Result<String, HashError> {
            Err(HashError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::other("device went away"),
            })
        }
    }

    fn test_config(api_endpoint: &str, dir: &Path) -> Config {
        Config {
            album_id: "album-1".to_string(),
            auth: AuthConfig::ApiKey {
                api_key: SecretString::new("test-key".to_string()),
            },
            output_dir: dir.join("photos"),
            ledger_path: dir.join("fetched_photos.json"),
            hash_algorithm: HashAlgorithm::Sha256,
            page_size: 50,
            api_endpoint: api_endpoint.to_string(),
            scopes: Vec::new(),
            retry: RetryConfig {
                max_retries: 0,
                initial_backoff_ms: 1,
                max_backoff_ms: 1,
            },
            timeouts: TimeoutConfig::default(),
            delete_partial_on_failure: true,
            show_progress: false,
        }
    }

    async fn serve_album(server: &mut mockito::ServerGuard, ids: &[&str]) -> mockito::Mock {
        let items: Vec<_> = ids
            .iter()
            .map(|id| json!({ "id": id, "baseUrl": format!("{}/media/{id}.jpg", server.url()) }))
            .collect();
        server
            .mock("POST", "/mediaItems:search")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "mediaItems": items }).to_string())
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_single_candidate_is_downloaded_and_recorded() {
        let mut server = mockito::Server::new_async().await;
        let _album = serve_album(&mut server, &["a"]).await;
        let media = server
            .mock("GET", "/media/a.jpg")
            .with_status(200)
            .with_body("photo-a")
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&server.url(), dir.path());
        let orchestrator = Orchestrator::from_config(&config, reqwest::Client::new());
        let outcome = orchestrator.run_with_rng(&mut StdRng::seed_from_u64(1)).await.unwrap();

        let PickOutcome::Downloaded { item_id, path, digest, bytes_written } = outcome else {
            panic!("unexpected outcome: {outcome:?}");
        };
        assert_eq!(item_id, "a");
        assert_eq!(path, config.output_dir.join("photo_a.jpg"));
        assert_eq!(bytes_written, 7);
        assert_eq!(std::fs::read(&path).unwrap(), b"photo-a");

        let ledger = Ledger::load_from_file(&config.ledger_path);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.get("a"), Some(digest.as_str()));
        media.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_album_downloads_nothing() {
        let mut server = mockito::Server::new_async().await;
        let _album = serve_album(&mut server, &[]).await;

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&server.url(), dir.path());
        let outcome = Orchestrator::from_config(&config, reqwest::Client::new())
            .run()
            .await
            .unwrap();

        assert_eq!(outcome, PickOutcome::EmptyAlbum);
        assert!(!config.ledger_path.exists());
    }

    #[tokio::test]
    async fn test_listing_failure_ends_without_candidates() {
        let mut server = mockito::Server::new_async().await;
        let _album = server
            .mock("POST", "/mediaItems:search")
            .with_status(403)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&server.url(), dir.path());
        let outcome = Orchestrator::from_config(&config, reqwest::Client::new())
            .run()
            .await
            .unwrap();

        assert!(matches!(outcome, PickOutcome::ListingFailed { .. }));
        assert_eq!(outcome.terminal_state(), PickState::NoCandidates);
        assert_eq!(outcome.exit_code(), PhotoPickError::EXIT_LISTING);
    }

    #[tokio::test]
    async fn test_auth_failure_aborts_before_listing() {
        let mut server = mockito::Server::new_async().await;
        let album = server
            .mock("POST", "/mediaItems:search")
            .expect(0)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&server.url(), dir.path());
        let err = Orchestrator::from_config(&config, reqwest::Client::new())
            .with_credential_provider(Box::new(FailingProvider))
            .run()
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), PhotoPickError::EXIT_AUTH);
        album.assert_async().await;
    }

    #[tokio::test]
    async fn test_transient_download_failure_is_retried() {
        let mut server = mockito::Server::new_async().await;
        let _album = serve_album(&mut server, &["a"]).await;
        let _unavailable = server
            .mock("GET", "/media/a.jpg")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;
        let _ok = server
            .mock("GET", "/media/a.jpg")
            .with_status(200)
            .with_body("photo-a")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&server.url(), dir.path());
        config.retry.max_retries = 2;
        let outcome = Orchestrator::from_config(&config, reqwest::Client::new())
            .run()
            .await
            .unwrap();

        assert!(matches!(outcome, PickOutcome::Downloaded { .. }));
    }

    #[tokio::test]
    async fn test_failed_download_leaves_ledger_untouched() {
        let mut server = mockito::Server::new_async().await;
        let _album = serve_album(&mut server, &["a"]).await;
        let _missing = server
            .mock("GET", "/media/a.jpg")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&server.url(), dir.path());
        Ledger::new()
            .update("other", "00")
            .save_to_file(&config.ledger_path)
            .unwrap();
        let before = std::fs::read(&config.ledger_path).unwrap();

        let outcome = Orchestrator::from_config(&config, reqwest::Client::new())
            .run()
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            PickOutcome::DownloadFailed { failure_kind: Some(crate::download::FailureKind::HttpStatus(404)), .. }
        ));
        assert_eq!(std::fs::read(&config.ledger_path).unwrap(), before);
        assert!(!config.output_dir.join("photo_a.jpg").exists());
    }

    #[tokio::test]
    async fn test_concurrent_run_is_rejected_by_ledger_lock() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config("http://127.0.0.1:9", dir.path());
        let mut held = LedgerLock::open(&config.ledger_path).unwrap();
        let _guard = held.try_acquire().unwrap();

        let err = Orchestrator::from_config(&config, reqwest::Client::new())
            .run()
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), PhotoPickError::EXIT_LEDGER);
    }

    #[tokio::test]
    async fn test_unhashable_download_fails_verification_and_keeps_ledger() {
        let mut server = mockito::Server::new_async().await;
        let _album = serve_album(&mut server, &["a"]).await;
        let _media = server
            .mock("GET", "/media/a.jpg")
            .with_status(200)
            .with_body("photo-a")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&server.url(), dir.path());
        Ledger::new()
            .update("other", "00")
            .save_to_file(&config.ledger_path)
            .unwrap();
        let before = std::fs::read(&config.ledger_path).unwrap();

        let outcome = Orchestrator::from_config(&config, reqwest::Client::new())
            .with_digester(Box::new(UnreadableDigester))
            .run()
            .await
            .unwrap();

        let PickOutcome::VerificationFailed { ref item_id, ref path, ref reason } = outcome else {
            panic!("unexpected outcome: {outcome:?}");
        };
        assert_eq!(item_id, "a");
        assert!(reason.contains("device went away"), "reason: {reason}");
        assert_eq!(std::fs::read(path).unwrap(), b"photo-a");
        assert_eq!(outcome.terminal_state(), PickState::Failed);
        assert_eq!(outcome.exit_code(), PhotoPickError::EXIT_VERIFICATION);
        assert_eq!(std::fs::read(&config.ledger_path).unwrap(), before);
    }
}
