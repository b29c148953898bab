use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

pub const DEFAULT_EXTENSION: &str = ".jpg";

const CONTENT_TYPE_EXTENSIONS: &[(&str, &str)] = &[
    ("image/jpeg", ".jpg"),
    ("image/png", ".png"),
    ("image/gif", ".gif"),
    ("image/webp", ".webp"),
    ("image/heic", ".heic"),
    ("video/mp4", ".mp4"),
];

/// Extension (with leading dot) of the last path segment of `url`, if it has one.
pub fn extension_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let file_name = parsed.path_segments()?.next_back()?;
    let dot = file_name.rfind('.')?;
    if dot == 0 || dot + 1 == file_name.len() {
        return None;
    }
    Some(file_name[dot..].to_string())
}

pub fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    let content_type = content_type.to_ascii_lowercase();
    CONTENT_TYPE_EXTENSIONS
        .iter()
        .find(|(mime, _)| content_type.contains(mime))
        .map(|(_, ext)| *ext)
}

/// Resolves file extensions for source URLs, falling back to a metadata
/// (HEAD) request when the URL path does not carry one.
#[derive(Clone)]
pub struct ExtensionProbe {
    client: reqwest::Client,
    request_timeout: Duration,
}

impl ExtensionProbe {
    pub fn new(client: reqwest::Client, request_timeout: Duration) -> Self {
        Self {
            client,
            request_timeout,
        }
    }

    pub async fn infer(&self, url: &str) -> String {
        if let Some(ext) = extension_from_url(url) {
            return ext;
        }

        let response = self
            .client
            .head(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        match response {
            Ok(response) => response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .and_then(extension_from_content_type)
                .unwrap_or(DEFAULT_EXTENSION)
                .to_string(),
            Err(e) => {
                tracing::warn!(url, error = %e, "Could not determine file extension from URL");
                DEFAULT_EXTENSION.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_from_url_path() {
        assert_eq!(
            extension_from_url("https://example.com/a/photo.PNG?size=large").as_deref(),
            Some(".PNG")
        );
        assert_eq!(
            extension_from_url("https://example.com/a.b/photo").as_deref(),
            None
        );
        assert_eq!(extension_from_url("https://example.com/.hidden"), None);
        assert_eq!(extension_from_url("https://example.com/trailing."), None);
        assert_eq!(extension_from_url("not a url"), None);
    }

    #[test]
    fn test_extension_from_content_type() {
        assert_eq!(extension_from_content_type("image/jpeg"), Some(".jpg"));
        assert_eq!(
            extension_from_content_type("image/png; charset=binary"),
            Some(".png")
        );
        assert_eq!(extension_from_content_type("Image/GIF"), Some(".gif"));
        assert_eq!(extension_from_content_type("application/octet-stream"), None);
    }

    #[tokio::test]
    async fn test_head_probe_maps_content_type() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("HEAD", "/media/abc")
            .with_status(200)
            .with_header("content-type", "image/png")
            .create_async()
            .await;

        let probe = ExtensionProbe::new(reqwest::Client::new(), Duration::from_secs(5));
        let ext = probe.infer(&format!("{}/media/abc", server.url())).await;

        assert_eq!(ext, ".png");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_probe_defaults_to_jpg() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("HEAD", "/media/abc")
            .with_status(500)
            .create_async()
            .await;

        let probe = ExtensionProbe::new(reqwest::Client::new(), Duration::from_secs(5));
        assert_eq!(probe.infer(&format!("{}/media/abc", server.url())).await, ".jpg");
    }

    #[tokio::test]
    async fn test_url_extension_skips_probe() {
        let probe = ExtensionProbe::new(reqwest::Client::new(), Duration::from_secs(5));
        // Unroutable host: a HEAD request here would fail and yield ".jpg".
        assert_eq!(probe.infer("http://127.0.0.1:9/photo.gif").await, ".gif");
    }
}
