use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::jobs::{runner, TracingReporter};
use crate::state::AppState;
use pdftag_core::ProjectStatus;

#[derive(Serialize)]
pub struct GenerateResponse {
    pub project_id: String,
    pub message: String,
}

/// Kick off the generation phase (C4/C5) for an extracted project.
///
/// Runs in a detached background task, strictly sequential per project —
/// progress is observable via the project's websocket or by polling
/// `GET /api/projects/{id}`. Safe to call again after a crash: only rows
/// still `pending` are picked up.
pub async fn generate(
    Path(project_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let project = state
        .store
        .get_project(&project_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("project {project_id} not found")))?;

    if !matches!(project.status, ProjectStatus::Extracted | ProjectStatus::Processing) {
        return Err(ApiError::BadRequest(format!(
            "project {project_id} is not ready for generation (status: {})",
            project.status
        )));
    }

    let cancel = state.new_cancel_flag(&project_id).await;
    let store = state.store.clone();
    let config = state.config.clone();
    let id = project_id.clone();

    tokio::spawn(async move {
        runner::run_generation(&store, config, &id, Arc::new(TracingReporter), cancel).await;
    });

    Ok(Json(GenerateResponse {
        project_id,
        message: "generation started".to_string(),
    }))
}

/// Request cancellation of an in-flight generation run. Takes effect at the
/// next image boundary, not mid-call.
pub async fn cancel_generate(
    Path(project_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<GenerateResponse>, ApiError> {
    if state.cancel(&project_id).await {
        Ok(Json(GenerateResponse {
            project_id,
            message: "cancellation requested".to_string(),
        }))
    } else {
        Err(ApiError::NotFound(format!(
            "no in-flight generation run for project {project_id}"
        )))
    }
}
