use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;
use pdftag_core::{ImageDescriptor, Project};

pub async fn list_projects(State(state): State<Arc<AppState>>) -> Json<Vec<Project>> {
    Json(state.store.list_projects().await)
}

pub async fn get_project(
    Path(project_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Project>, ApiError> {
    state
        .store
        .get_project(&project_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("project {project_id} not found")))
}

pub async fn list_project_images(
    Path(project_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ImageDescriptor>>, ApiError> {
    state
        .store
        .get_project(&project_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("project {project_id} not found")))?;
    Ok(Json(state.store.list_images(&project_id).await))
}

pub async fn delete_project(
    Path(project_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<(), ApiError> {
    // Stop any in-flight generation run at its next image boundary before
    // touching its rows or files — otherwise it keeps running against a
    // deleted project and may read from the directory we're about to remove.
    state.cancel(&project_id).await;

    if state.store.delete_project(&project_id).await {
        let dir = state.results_dir.join(&project_id);
        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    } else {
        Err(ApiError::NotFound(format!("project {project_id} not found")))
    }
}
