use crate::{CatalogError, MediaCatalog};
use gen_ai::{GenAiError, TextEmbedder};
use media_model::SceneMatch;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] GenAiError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Answers natural-language scene queries: embed the text once, then k-NN
/// over the scene embeddings.
pub struct SearchService {
    embedder: Arc<dyn TextEmbedder>,
    embedding_model: String,
    catalog: Arc<dyn MediaCatalog>,
}

impl SearchService {
    #[must_use]
    pub fn new(
        embedder: Arc<dyn TextEmbedder>,
        embedding_model: &str,
        catalog: Arc<dyn MediaCatalog>,
    ) -> Self {
        Self {
            embedder,
            embedding_model: embedding_model.to_string(),
            catalog,
        }
    }

    /// Returns up to `max_results` scene identifiers, nearest first.
    pub async fn find_scenes(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SceneMatch>, SearchError> {
        let embedding = self.embedder.embed(&self.embedding_model, query).await?;
        let matches = self.catalog.nearest_scenes(&embedding, max_results).await?;
        debug!(query, hits = matches.len(), "scene search completed");
        Ok(matches)
    }
}
