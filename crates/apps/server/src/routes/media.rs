use crate::api_state::ApiContext;
use crate::routes::error::ApiError;
use axum::extract::{Path, State};
use axum::Json;
use media_model::{Media, Scene};
use serde_json::json;
use uuid::Uuid;

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("'{raw}' is not a media id")))
}

/// GET /media/{id}
pub async fn get_media(
    State(context): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Media>, ApiError> {
    let id = parse_id(&id)?;
    let media = context.media.get(&id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(media))
}

/// GET /media/{id}/stream: a short-lived signed URL for the proxy object.
pub async fn stream_media(
    State(context): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_id(&id)?;
    let media = context.media.get(&id).await?.ok_or(ApiError::NotFound)?;
    let url = context.media.streaming_url(&media).await?;
    Ok(Json(json!({ "url": url })))
}

/// GET /media/{id}/scenes/{sequence}
pub async fn get_scene(
    State(context): State<ApiContext>,
    Path((id, sequence)): Path<(String, i32)>,
) -> Result<Json<Scene>, ApiError> {
    let id = parse_id(&id)?;
    let scene = context
        .media
        .get_scene(&id, sequence)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(scene))
}
