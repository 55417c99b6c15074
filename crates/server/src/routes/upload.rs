use axum::extract::{Multipart, State};
use axum::Json;
use std::sync::Arc;

use crate::error::ApiError;
use crate::jobs::runner;
use crate::state::AppState;
use pdftag_core::Project;

/// Accept a multipart PDF upload, persist it, and run extraction (C1-C3)
/// synchronously before responding. The collaborator surface does not defer
/// extraction to a background task — only the model-call phase is async.
pub async fn upload_pdf(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Project>, ApiError> {
    let mut pdf_data: Option<(String, Vec<u8>)> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("upload.pdf").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("failed to read file: {e}")))?;
            pdf_data = Some((filename, data.to_vec()));
        }
    }

    let (filename, data) =
        pdf_data.ok_or_else(|| ApiError::BadRequest("no PDF file provided".to_string()))?;

    if data.len() as u64 > state.config.max_upload_bytes {
        return Err(ApiError::BadRequest(format!(
            "upload exceeds the {}-byte limit",
            state.config.max_upload_bytes
        )));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let now = crate::jobs::models::iso_now();

    let rel_name = format!("{id}.pdf");
    state
        .uploads_store
        .write_bytes(&rel_name, &data)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to store upload: {e}")))?;
    let source_path = state.uploads_dir.join(&rel_name);

    let mut project = Project::new(
        id.clone(),
        "default".to_string(),
        filename,
        source_path.to_string_lossy().into_owned(),
        &now,
    );
    state.store.insert_project(&project).await;

    let output_dir = state.results_dir.join(&id);
    runner::run_extraction(&state.store, &mut project, &output_dir)
        .await
        .map_err(|e| {
            tracing::warn!(project_id = %id, error = %e, "extraction failed");
            ApiError::Internal(e.to_string())
        })?;

    Ok(Json(project))
}
