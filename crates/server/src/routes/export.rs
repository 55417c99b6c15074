use axum::extract::{Path, State};
use axum::http::header;
use axum::response::Response;
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;
use pdftag_core::{write_tagged_pdf, AltTextMap};

/// Export a project's source PDF as a tagged copy, with every raster image
/// carrying its (possibly user-edited) alt-text in the structure tree.
/// Vector-cluster-synthesized images have no real PDF object to tag and are
/// skipped — their synthetic xref is filtered out before the writer runs.
pub async fn export_pdf(
    Path(project_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let project = state
        .store
        .get_project(&project_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("project {project_id} not found")))?;

    let images = state.store.list_images(&project_id).await;

    let alt_texts: AltTextMap = images
        .iter()
        .filter(|img| !img.is_synthetic())
        .map(|img| (img.xref, img.effective_alt_text()))
        .collect();

    let output_dir = state.results_dir.join(&project_id);
    tokio::fs::create_dir_all(&output_dir).await?;
    let output_path = output_dir.join("tagged.pdf");
    let source_path = std::path::PathBuf::from(&project.source_path);

    tokio::task::spawn_blocking(move || write_tagged_pdf(&source_path, &output_path, &alt_texts))
        .await
        .map_err(|e| ApiError::Internal(format!("export task panicked: {e}")))?
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let rel_path = format!("{project_id}/tagged.pdf");
    let bytes = state
        .results_store
        .read_bytes(&rel_path)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to read exported PDF: {e}")))?;
    let filename = format!(
        "{}_tagged.pdf",
        project.source_filename.trim_end_matches(".pdf")
    );

    Ok(Response::builder()
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(axum::body::Body::from(bytes))
        .map_err(|e| ApiError::Internal(e.to_string()))?)
}
