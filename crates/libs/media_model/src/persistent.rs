use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The top-level persisted entity describing one media item and its scenes.
///
/// The row key is content-derived: `UUIDv5(NS_URL, object_name)`, so the same
/// upload always maps to the same row and redelivered notifications collapse
/// onto one logical record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Media {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub length_seconds: i64,
    #[serde(default)]
    pub media_url: String,
    #[serde(default)]
    pub director: String,
    #[serde(default)]
    pub release_year: i32,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub scenes: Vec<Scene>,
    pub create_date: DateTime<Utc>,
}

impl Media {
    /// Derives the stable row id for an object name.
    #[must_use]
    pub fn id_for(object_name: &str) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_URL, object_name.as_bytes()).to_string()
    }

    #[must_use]
    pub fn new(object_name: &str) -> Self {
        Self {
            id: Self::id_for(object_name),
            title: String::new(),
            category: String::new(),
            summary: String::new(),
            length_seconds: 0,
            media_url: String::new(),
            director: String::new(),
            release_year: 0,
            genre: String::new(),
            rating: String::new(),
            cast: Vec::new(),
            scenes: Vec::new(),
            create_date: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CastMember {
    pub character_name: String,
    pub actor_name: String,
}

/// A contiguous time range within a media item with its extracted script.
/// `sequence` is 1-based; `start`/`end` are zero-padded `HH:MM:SS` stamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scene {
    pub sequence: i32,
    pub start: String,
    pub end: String,
    pub script: String,
}

/// One row of the embeddings table, keyed by (media id, scene sequence).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SceneEmbedding {
    pub media_id: String,
    pub sequence_number: i32,
    pub model_name: String,
    pub embeddings: Vec<f64>,
}

impl SceneEmbedding {
    #[must_use]
    pub fn new(media_id: &str, sequence_number: i32, model_name: &str) -> Self {
        Self {
            media_id: media_id.to_string(),
            sequence_number,
            model_name: model_name.to_string(),
            embeddings: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_id_is_stable_uuid_v5() {
        // Pinned against an independent UUIDv5 implementation (RFC 4122 URL
        // namespace over the bare object name).
        assert_eq!(
            Media::id_for("test-trailer-001.mp4"),
            "14cd9c58-925a-57e1-84af-030affa05724"
        );
        assert_eq!(
            Media::id_for("test-file.mp4"),
            "00f2a6d5-3a45-593f-9686-ef3d0ce3343c"
        );
        // and agrees with the uuid crate itself
        assert_eq!(
            Media::id_for("Serenity.mp4"),
            Uuid::new_v5(&Uuid::NAMESPACE_URL, b"Serenity.mp4").to_string()
        );
    }

    #[test]
    fn new_media_starts_empty() {
        let media = Media::new("test-file.mp4");
        assert_eq!(media.id, Media::id_for("test-file.mp4"));
        assert!(media.cast.is_empty());
        assert!(media.scenes.is_empty());
        assert!((Utc::now() - media.create_date).num_seconds() < 2);
    }

    #[test]
    fn scene_embedding_starts_empty() {
        let embedding = SceneEmbedding::new("some-media-id", 3, "text-embedding");
        assert_eq!(embedding.media_id, "some-media-id");
        assert_eq!(embedding.sequence_number, 3);
        assert_eq!(embedding.model_name, "text-embedding");
        assert!(embedding.embeddings.is_empty());
    }
}
