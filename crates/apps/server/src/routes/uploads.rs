use crate::api_state::ApiContext;
use crate::routes::error::ApiError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use color_eyre::eyre::eyre;
use serde_json::json;
use tracing::info;

/// POST /uploads: multipart file fields land in the hi-res bucket under
/// their client-supplied file names; the bucket notification takes it from
/// there.
pub async fn upload_media(
    State(context): State<ApiContext>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let mut uploaded: Vec<String> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let Some(file_name) = field.file_name().map(ToString::to_string) else {
            continue;
        };
        let content_type = field
            .content_type()
            .map_or_else(|| "application/octet-stream".to_string(), ToString::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?;

        context
            .storage
            .upload_object(&context.hi_res_bucket, &file_name, &content_type, bytes.to_vec())
            .await
            .map_err(|e| ApiError::Internal(eyre!("upload failed: {e}")))?;

        info!(bucket = %context.hi_res_bucket, object = %file_name, "upload accepted");
        uploaded.push(file_name);
    }

    if uploaded.is_empty() {
        return Err(ApiError::BadRequest("no file fields in upload".into()));
    }
    Ok((StatusCode::CREATED, Json(json!({ "objects": uploaded }))))
}
