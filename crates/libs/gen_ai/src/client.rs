use crate::{GenAiError, GenerateRequest, GenerateResponse, GenerativeModel, TextEmbedder};
use async_trait::async_trait;
use cloud_clients::TokenSource;
use serde::Deserialize;
use std::sync::Arc;

/// REST client for the generative and embedding model endpoints. One client
/// serves any model name under the configured publisher base.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    token: Arc<TokenSource>,
    base_url: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f64>,
}

impl GeminiClient {
    /// Client for a project/location pair on the managed endpoint.
    #[must_use]
    pub fn new(token: Arc<TokenSource>, project: &str, location: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
            base_url: format!(
                "https://{location}-aiplatform.googleapis.com/v1/projects/{project}/locations/{location}/publishers/google/models"
            ),
        }
    }

    /// Points the client at an emulator or test server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn post_json<T: serde::Serialize>(
        &self,
        url: String,
        body: &T,
    ) -> Result<reqwest::Response, GenAiError> {
        let token = self.token.token().await?;
        let response = self.http.post(url).bearer_auth(token).json(body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenAiError::Api { status, body });
        }
        Ok(response)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, GenAiError> {
        let url = format!("{}/{model}:generateContent", self.base_url);
        let response = self.post_json(url, request).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl TextEmbedder for GeminiClient {
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f64>, GenAiError> {
        let url = format!("{}/{model}:embedContent", self.base_url);
        let body = serde_json::json!({
            "content": {"parts": [{"text": text}]},
        });
        let response = self.post_json(url, &body).await?;
        let parsed: EmbedResponse = response.json().await?;
        if parsed.embedding.values.is_empty() {
            return Err(GenAiError::EmptyResponse);
        }
        Ok(parsed.embedding.values)
    }
}
