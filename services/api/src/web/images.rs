//! services/api/src/web/images.rs
//!
//! Illustration endpoint. Generation failures degrade to a `null` URL so the
//! client can fall back to a placeholder.

use crate::web::{
    protocol::{ImageRequest, ImageResponse},
    state::AppState,
};
use axum::{extract::State, http::StatusCode, response::Json};
use std::sync::Arc;
use tracing::warn;

/// Generate an image for a scene prompt.
#[utoipa::path(
    post,
    path = "/api/images",
    request_body = ImageRequest,
    responses(
        (status = 200, description = "Image URL, or null when unavailable", body = ImageResponse),
        (status = 400, description = "Empty prompt")
    )
)]
pub async fn generate_image_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<ImageRequest>,
) -> Result<Json<ImageResponse>, (StatusCode, String)> {
    if req.prompt.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "prompt is required".to_string()));
    }

    let Some(adapter) = app_state.image_adapter.as_ref() else {
        warn!("Image generation requested but no image API key is configured");
        return Ok(Json(ImageResponse { url: None }));
    };

    let url = match adapter.generate_image(&req.prompt).await {
        Ok(url) => Some(url),
        Err(e) => {
            warn!("Image generation failed: {}", e);
            None
        }
    };
    Ok(Json(ImageResponse { url }))
}
