use async_trait::async_trait;
use media_model::{Media, Scene, SceneEmbedding, SceneMatch};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("store error: {0}")]
    Store(#[from] cloud_clients::CloudError),

    #[error("row decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Persistence seam over the columnar store. Implemented by the BigQuery
/// catalog and by in-memory fakes in tests.
#[async_trait]
pub trait MediaCatalog: Send + Sync {
    /// Streams one media row in. Duplicate deliveries of the same content
    /// must not produce two conflicting rows.
    async fn insert_media(&self, media: &Media) -> Result<(), CatalogError>;

    /// All media rows with no embeddings yet.
    async fn find_unembedded(&self) -> Result<Vec<Media>, CatalogError>;

    /// Streams one media item's scene embeddings in as a single batch.
    async fn insert_embeddings(&self, rows: &[SceneEmbedding]) -> Result<(), CatalogError>;

    async fn find_media(&self, id: &uuid::Uuid) -> Result<Option<Media>, CatalogError>;

    async fn find_scene(
        &self,
        id: &uuid::Uuid,
        sequence: i32,
    ) -> Result<Option<Scene>, CatalogError>;

    /// k-NN over the embeddings table, euclidean distance, nearest first.
    async fn nearest_scenes(
        &self,
        embedding: &[f64],
        top_k: usize,
    ) -> Result<Vec<SceneMatch>, CatalogError>;
}
