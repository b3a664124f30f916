use crate::api_state::ApiContext;
use crate::routes::error::ApiError;
use axum::extract::{Query, State};
use axum::Json;
use color_eyre::eyre::eyre;
use media_model::Media;
use serde::Deserialize;
use std::collections::BTreeMap;
use uuid::Uuid;

const DEFAULT_RESULT_COUNT: usize = 5;

#[derive(Deserialize, Debug)]
pub struct SearchParams {
    /// The natural-language scene query.
    pub s: Option<String>,
    pub count: Option<usize>,
}

/// GET /media?s=&count=: scene search hydrated into media rows carrying only
/// their matching scenes.
pub async fn search_media(
    State(context): State<ApiContext>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Media>>, ApiError> {
    let query = params
        .s
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing query parameter 's'".into()))?;
    let count = params.count.unwrap_or(DEFAULT_RESULT_COUNT);

    let matches = context.search.find_scenes(query, count).await?;

    // aggregate matched scenes under their parent media, one lookup each
    let mut hydrated: BTreeMap<String, Media> = BTreeMap::new();
    for scene_match in matches {
        let id = Uuid::parse_str(&scene_match.media_id)
            .map_err(|_| ApiError::Internal(eyre!("non-uuid media id in embeddings table")))?;

        if !hydrated.contains_key(&scene_match.media_id) {
            let Some(mut media) = context.media.get(&id).await? else {
                // embedding without a media row; skip rather than 500
                continue;
            };
            media.scenes.clear();
            hydrated.insert(scene_match.media_id.clone(), media);
        }

        if let Some(scene) = context
            .media
            .get_scene(&id, scene_match.sequence_number)
            .await?
        {
            if let Some(media) = hydrated.get_mut(&scene_match.media_id) {
                media.scenes.push(scene);
            }
        }
    }

    Ok(Json(hydrated.into_values().collect()))
}
