mod error;
mod media;
mod search;
mod uploads;

use crate::api_state::ApiContext;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

pub fn router(context: ApiContext) -> Router {
    let api = Router::new()
        .route("/media", get(search::search_media))
        .route("/media/{id}", get(media::get_media))
        .route("/media/{id}/stream", get(media::stream_media))
        .route("/media/{id}/scenes/{sequence}", get(media::get_scene))
        .route("/uploads", post(uploads::upload_media))
        .with_state(context);

    Router::new()
        .nest("/api/v1", api)
        .layer(CorsLayer::permissive())
}
