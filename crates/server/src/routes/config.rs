use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

/// Safe subset of [`pdftag_core::Config`] exposed to collaborators — no
/// filesystem paths, just the limits a client needs to validate input
/// before sending it.
#[derive(Serialize)]
pub struct ConfigResponse {
    pub model_name: String,
    pub max_upload_bytes: u64,
    pub max_image_dim: u32,
    pub max_alt_text_len: usize,
    pub model_timeout_secs: u64,
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        model_name: state.config.model_name.clone(),
        max_upload_bytes: state.config.max_upload_bytes,
        max_image_dim: state.config.max_image_dim,
        max_alt_text_len: state.config.max_alt_text_len,
        model_timeout_secs: state.config.model_timeout_secs,
    })
}
