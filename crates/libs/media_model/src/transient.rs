use crate::CastMember;
use serde::{Deserialize, Serialize};

/// A time range identified by the summary pass, used to seed parallel scene
/// extraction. Consumed and discarded within a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeSpan {
    pub start: String,
    pub end: String,
}

/// The model's first-pass description of a media item: the head of a `Media`
/// plus the scene time stamps that drive extraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaSummary {
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub length_seconds: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
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
    pub scene_time_stamps: Vec<TimeSpan>,
}

/// One k-NN hit: which scene of which media matched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SceneMatch {
    pub media_id: String,
    pub sequence_number: i32,
}
