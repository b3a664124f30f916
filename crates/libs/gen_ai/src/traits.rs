use crate::{GenAiError, GenerateRequest, GenerateResponse};
use async_trait::async_trait;

/// A multimodal generative model handle. Implemented by the REST client and
/// by in-memory stubs in tests.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, GenAiError>;
}

/// A text embedding model returning dense vectors.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f64>, GenAiError>;
}
