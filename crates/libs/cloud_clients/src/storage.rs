use crate::{CloudError, TokenSource};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const STORAGE_API: &str = "https://storage.googleapis.com";

/// Object store client over the JSON API. Buckets are keyed by object name;
/// uploads and downloads stream whole objects (media here are short proxies).
#[derive(Clone)]
pub struct StorageClient {
    http: reqwest::Client,
    token: Arc<TokenSource>,
    base_url: String,
}

impl StorageClient {
    #[must_use]
    pub fn new(token: Arc<TokenSource>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
            base_url: STORAGE_API.to_string(),
        }
    }

    /// Points the client at an emulator or test server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Downloads an object into a temp file and returns its path. The caller
    /// owns cleanup (pipeline runs track it on their context).
    pub async fn download_to_temp(
        &self,
        bucket: &str,
        object: &str,
    ) -> Result<PathBuf, CloudError> {
        let url = format!(
            "{}/storage/v1/b/{bucket}/o/{}?alt=media",
            self.base_url,
            encode(object)
        );
        let token = self.token.token().await?;
        let response = self.http.get(url).bearer_auth(token).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let bytes = response.bytes().await?;

        let extension = Path::new(object)
            .extension()
            .map_or_else(|| "bin".to_string(), |e| e.to_string_lossy().to_string());
        let (file, path) = tempfile::Builder::new()
            .prefix("media-download-")
            .suffix(&format!(".{extension}"))
            .tempfile()?
            .keep()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        drop(file);
        tokio::fs::write(&path, &bytes).await?;
        debug!(bucket, object, path = %path.display(), "downloaded object");
        Ok(path)
    }

    pub async fn upload_object(
        &self,
        bucket: &str,
        object: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), CloudError> {
        let url = format!(
            "{}/upload/storage/v1/b/{bucket}/o?uploadType=media&name={}",
            self.base_url,
            encode(object)
        );
        let token = self.token.token().await?;
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(bytes)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        debug!(bucket, object, "uploaded object");
        Ok(())
    }

    pub async fn upload_file(
        &self,
        bucket: &str,
        object: &str,
        mime_type: &str,
        path: &Path,
    ) -> Result<(), CloudError> {
        let bytes = tokio::fs::read(path).await?;
        self.upload_object(bucket, object, mime_type, bytes).await
    }
}

pub(crate) fn encode(raw: &str) -> String {
    utf8_percent_encode(raw, NON_ALPHANUMERIC).to_string()
}

pub(crate) async fn api_error(response: reqwest::Response) -> CloudError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    CloudError::Api { status, body }
}
