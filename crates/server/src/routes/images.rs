use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;
use pdftag_core::ImageDescriptor;

#[derive(Deserialize)]
pub struct EditAltTextRequest {
    pub alt_text: String,
}

/// Record a human edit to one image's alt-text. The model's original answer
/// in `alt_text` is left untouched; `effective_alt_text()` prefers the edit.
pub async fn edit_alt_text(
    Path(image_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<EditAltTextRequest>,
) -> Result<Json<ImageDescriptor>, ApiError> {
    if body.alt_text.chars().count() > state.config.max_alt_text_len {
        return Err(ApiError::BadRequest(format!(
            "alt-text exceeds the {}-character limit",
            state.config.max_alt_text_len
        )));
    }

    state.store.set_alt_text_edited(&image_id, &body.alt_text).await;
    state
        .store
        .get_image(&image_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("image {image_id} not found")))
}

/// Serve a materialized image's raw bytes (raster or vector-cluster render).
pub async fn get_image_file(
    Path(image_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let descriptor = state
        .store
        .get_image(&image_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("image {image_id} not found")))?;

    let bytes = tokio::fs::read(&descriptor.image_path)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to read image: {e}")))?;

    let content_type = match descriptor.ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    };

    Ok(Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(bytes))
        .map_err(|e| ApiError::Internal(e.to_string()))?)
}
