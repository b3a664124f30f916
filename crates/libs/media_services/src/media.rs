use crate::{CatalogError, MediaCatalog};
use cloud_clients::{CloudError, UrlSigner};
use media_model::{Media, Scene};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

const MEDIA_URL_PREFIX: &str = "https://storage.mtls.cloud.google.com/";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("signing failed: {0}")]
    Signing(#[from] CloudError),

    #[error("media url '{0}' is not a storage url")]
    BadMediaUrl(String),
}

/// Row and scene reads plus signed streaming URL minting.
pub struct MediaService {
    catalog: Arc<dyn MediaCatalog>,
    signer: UrlSigner,
    stream_url_lifetime: Duration,
}

impl MediaService {
    #[must_use]
    pub fn new(catalog: Arc<dyn MediaCatalog>, signer: UrlSigner) -> Self {
        Self {
            catalog,
            signer,
            stream_url_lifetime: Duration::from_secs(15 * 60),
        }
    }

    pub async fn get(&self, id: &Uuid) -> Result<Option<Media>, MediaError> {
        Ok(self.catalog.find_media(id).await?)
    }

    pub async fn get_scene(
        &self,
        id: &Uuid,
        sequence: i32,
    ) -> Result<Option<Scene>, MediaError> {
        Ok(self.catalog.find_scene(id, sequence).await?)
    }

    /// Mints a short-lived signed GET URL for the media object behind a row's
    /// `media_url`.
    pub async fn streaming_url(&self, media: &Media) -> Result<String, MediaError> {
        let (bucket, object) = split_media_url(&media.media_url)?;
        let url = self
            .signer
            .signed_get_url(bucket, object, self.stream_url_lifetime)
            .await?;
        Ok(url)
    }
}

fn split_media_url(media_url: &str) -> Result<(&str, &str), MediaError> {
    let rest = media_url
        .strip_prefix(MEDIA_URL_PREFIX)
        .ok_or_else(|| MediaError::BadMediaUrl(media_url.to_string()))?;
    rest.split_once('/')
        .filter(|(bucket, object)| !bucket.is_empty() && !object.is_empty())
        .ok_or_else(|| MediaError::BadMediaUrl(media_url.to_string()))
}
