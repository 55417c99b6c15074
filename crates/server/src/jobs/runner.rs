use std::path::Path;
use std::sync::Arc;

use pdftag_core::orchestrator::{apply_outcome, extract_project, generate_one};
use pdftag_core::{Config, ImageDescriptor, ModelClient, Project, ProgressReporter, ProjectStatus, SilentReporter};

use super::models::iso_now;
use super::store::ProjectStore;

/// Run extraction (C1-C3) for a freshly uploaded project, synchronously,
/// before the upload route responds — this mirrors the collaborator
/// contract's upload handler, which extracts before acknowledging the
/// request rather than deferring it to a background task.
pub async fn run_extraction(
    store: &ProjectStore,
    project: &mut Project,
    output_dir: &Path,
) -> pdftag_core::CoreResult<Vec<ImageDescriptor>> {
    let source_path = Path::new(&project.source_path).to_path_buf();
    let output_dir = output_dir.to_path_buf();
    let project_snapshot = project.clone();

    let (result, mut updated) = tokio::task::spawn_blocking(move || {
        let mut p = project_snapshot;
        let reporter = SilentReporter;
        let result = extract_project(&mut p, &source_path, &output_dir, &reporter);
        (result, p)
    })
    .await
    .expect("extraction task panicked");

    updated.updated_at = iso_now();
    *project = updated.clone();
    store
        .update_project_status(&project.id, project.status, &project.updated_at, project.error_message.as_deref())
        .await;

    if let Ok(descriptors) = &result {
        store.insert_images(descriptors).await;
        store.set_total_images(&project.id, descriptors.len() as u32, &project.updated_at).await;
    }

    result
}

/// Drive generation (C4/C5) for a project's pending images strictly
/// sequentially, committing each outcome atomically. Safe to call again
/// after a crash or cancellation — it only ever touches rows still in
/// `pending` status.
pub async fn run_generation(
    store: &ProjectStore,
    config: Arc<Config>,
    project_id: &str,
    reporter: Arc<dyn ProgressReporter>,
    cancel: Arc<std::sync::atomic::AtomicBool>,
) {
    let client = ModelClient::new(&config);
    store
        .update_project_status(project_id, ProjectStatus::Processing, &iso_now(), None)
        .await;

    loop {
        if cancel.load(std::sync::atomic::Ordering::Relaxed) {
            tracing::info!(project_id, "generation cancelled at image boundary");
            return;
        }

        let pending = store.list_pending_images(project_id).await;
        let Some(descriptor) = pending.into_iter().next() else {
            break;
        };

        let mut descriptor = descriptor;
        store
            .update_image_status(&descriptor.id, pdftag_core::ImageStatus::Processing)
            .await;
        let outcome = generate_one(&client, &config, &descriptor, reporter.as_ref()).await;
        apply_outcome(&mut descriptor, outcome);

        store
            .commit_image_result(
                &descriptor.id,
                project_id,
                descriptor.image_type.unwrap_or(pdftag_core::Bildtyp::Fehler),
                descriptor.alt_text.as_deref().unwrap_or(""),
                descriptor.konfidenz.unwrap_or_default(),
                descriptor.raw_response.as_deref(),
                descriptor.status,
                &iso_now(),
            )
            .await;
    }

    let remaining_pending = store.list_pending_images(project_id).await;
    if remaining_pending.is_empty() {
        let total = store.list_images(project_id).await.len() as u32;
        store
            .update_project_status(project_id, ProjectStatus::Done, &iso_now(), None)
            .await;
        reporter.on_project_complete(project_id, total);
    }
}

/// Progress reporter that logs via `tracing`, used for background
/// generation runs triggered over HTTP — there is no CLI terminal to draw a
/// bar on, so every callback becomes a structured log line instead.
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn on_extraction_start(&self, filename: &str, total_pages: u32) {
        tracing::info!(filename, total_pages, "extraction started");
    }

    fn on_extraction_complete(&self, filename: &str, total_images: u32) {
        tracing::info!(filename, total_images, "extraction complete");
    }

    fn on_image_start(&self, page_num: u32, image_index: u32) {
        tracing::debug!(page_num, image_index, "requesting alt-text");
    }

    fn on_image_done(&self, page_num: u32, image_index: u32, alt_text_preview: &str) {
        let preview: String = alt_text_preview.chars().take(60).collect();
        tracing::debug!(page_num, image_index, preview, "alt-text generated");
    }

    fn on_project_complete(&self, project_id: &str, total_images: u32) {
        tracing::info!(project_id, total_images, "project generation complete");
    }

    fn on_error(&self, page_num: u32, error: &str) {
        tracing::warn!(page_num, error, "image generation error");
    }
}
