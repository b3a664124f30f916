use crate::{queries, CatalogError, MediaCatalog};
use async_trait::async_trait;
use cloud_clients::{BigQueryClient, InsertRow};
use media_model::{Media, Scene, SceneEmbedding, SceneMatch};
use tracing::info;
use uuid::Uuid;

/// The columnar-store catalog: media and scene-embedding tables in one
/// dataset, written through streaming inserts and read through the query API.
pub struct BigQueryCatalog {
    client: BigQueryClient,
    dataset: String,
    media_table: String,
    embedding_table: String,
    fq_media_table: String,
    fq_embedding_table: String,
}

impl BigQueryCatalog {
    #[must_use]
    pub fn new(
        client: BigQueryClient,
        dataset: &str,
        media_table: &str,
        embedding_table: &str,
    ) -> Self {
        let fq_media_table = client.qualified_table(dataset, media_table);
        let fq_embedding_table = client.qualified_table(dataset, embedding_table);
        Self {
            client,
            dataset: dataset.to_string(),
            media_table: media_table.to_string(),
            embedding_table: embedding_table.to_string(),
            fq_media_table,
            fq_embedding_table,
        }
    }
}

#[async_trait]
impl MediaCatalog for BigQueryCatalog {
    async fn insert_media(&self, media: &Media) -> Result<(), CatalogError> {
        // insert_id = row id: redelivered notifications dedupe instead of
        // writing a second row
        let row = InsertRow {
            insert_id: Some(media.id.clone()),
            json: serde_json::to_value(media)?,
        };
        self.client
            .insert_all(&self.dataset, &self.media_table, vec![row])
            .await?;
        info!(id = %media.id, title = %media.title, "persisted media row");
        Ok(())
    }

    async fn find_unembedded(&self) -> Result<Vec<Media>, CatalogError> {
        let sql = queries::find_unembedded_media(&self.fq_media_table, &self.fq_embedding_table);
        let rows = self.client.query_json_rows(&sql).await?;
        rows.into_iter()
            .map(|row| Ok(serde_json::from_value(row)?))
            .collect()
    }

    async fn insert_embeddings(&self, rows: &[SceneEmbedding]) -> Result<(), CatalogError> {
        let wire_rows = rows
            .iter()
            .map(|row| {
                Ok(InsertRow {
                    insert_id: Some(format!("{}:{}", row.media_id, row.sequence_number)),
                    json: serde_json::to_value(row)?,
                })
            })
            .collect::<Result<Vec<_>, CatalogError>>()?;
        self.client
            .insert_all(&self.dataset, &self.embedding_table, wire_rows)
            .await?;
        Ok(())
    }

    async fn find_media(&self, id: &Uuid) -> Result<Option<Media>, CatalogError> {
        let sql = queries::find_media_by_id(&self.fq_media_table, id);
        let mut rows = self.client.query_json_rows(&sql).await?;
        match rows.pop() {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    async fn find_scene(&self, id: &Uuid, sequence: i32) -> Result<Option<Scene>, CatalogError> {
        let sql = queries::find_scene(&self.fq_media_table, id, sequence);
        let mut rows = self.client.query_json_rows(&sql).await?;
        match rows.pop() {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    async fn nearest_scenes(
        &self,
        embedding: &[f64],
        top_k: usize,
    ) -> Result<Vec<SceneMatch>, CatalogError> {
        let sql = queries::scene_knn(&self.fq_embedding_table, embedding, top_k);
        let rows = self.client.query_json_rows(&sql).await?;
        rows.into_iter()
            .map(|row| Ok(serde_json::from_value(row)?))
            .collect()
    }
}
