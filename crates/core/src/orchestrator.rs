use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::entities::{ImageDescriptor, ImageStatus, Project, ProjectStatus};
use crate::model::{parse_model_reply, ModelClient};
use crate::pdf::{materialize_document, PdfReader};
use crate::progress::ProgressReporter;
use crate::prompts::alt_text_prompt;

/// Runs the extraction phase (C1-C3) for a freshly uploaded project.
///
/// On success returns the project's image descriptors and leaves `project`
/// in `Extracted` with `total_images` set; on failure the project moves to
/// `Error` and the failure is returned to the caller.
pub fn extract_project(
    project: &mut Project,
    source_path: &Path,
    output_dir: &Path,
    reporter: &dyn ProgressReporter,
) -> crate::error::CoreResult<Vec<ImageDescriptor>> {
    project.status = ProjectStatus::Extracting;

    let result = (|| {
        let reader = PdfReader::new()?;
        let pages = reader.read(source_path)?;
        reporter.on_extraction_start(&project.source_filename, pages.len() as u32);
        materialize_document(&reader, source_path, output_dir, &project.id, &pages)
    })();

    match result {
        Ok(descriptors) => {
            project.total_images = descriptors.len() as u32;
            project.status = ProjectStatus::Extracted;
            reporter.on_extraction_complete(&project.source_filename, project.total_images);
            Ok(descriptors)
        }
        Err(e) => {
            project.status = ProjectStatus::Error;
            project.error_message = Some(e.to_string());
            Err(e)
        }
    }
}

/// Result of asking the model about a single image. Always produced, even
/// on failure — the descriptor records the failure and the pipeline
/// continues to the next image (see the error handling design).
pub struct GenerationOutcome {
    pub image_type: crate::entities::Bildtyp,
    pub alt_text: String,
    pub ist_dekorativ: bool,
    pub konfidenz: crate::entities::Konfidenz,
    pub raw_response: Option<String>,
    pub failed: bool,
}

/// Process one pending image descriptor: resize, call the model, parse the
/// reply. Never returns `Err` — model/network failures are encoded in the
/// returned outcome so the caller can persist a `fehler` record and move on
/// to the next image, per the strictly-sequential-per-project model.
pub async fn generate_one(
    client: &ModelClient,
    config: &Config,
    descriptor: &ImageDescriptor,
    reporter: &dyn ProgressReporter,
) -> GenerationOutcome {
    reporter.on_image_start(descriptor.page_number, descriptor.image_index);

    let prompt = alt_text_prompt(&descriptor.context_text);

    let prepared = ModelClient::prepare_image(
        Path::new(&descriptor.image_path),
        config.max_image_dim,
        config.max_image_bytes,
    );

    let image_b64 = match prepared {
        Ok(b64) => b64,
        Err(e) => {
            reporter.on_error(descriptor.page_number, &e.to_string());
            return failed_outcome(&format!("Bild konnte nicht vorbereitet werden: {e}"));
        }
    };

    match client.ask(image_b64, &prompt).await {
        Ok(reply) => {
            let record = parse_model_reply(&reply.response, &reply.thinking, config.max_alt_text_len);
            reporter.on_image_done(
                descriptor.page_number,
                descriptor.image_index,
                &record.alt_text,
            );
            GenerationOutcome {
                image_type: record.bildtyp,
                alt_text: record.alt_text,
                ist_dekorativ: record.ist_dekorativ,
                konfidenz: record.konfidenz,
                raw_response: Some(record.raw_response),
                failed: false,
            }
        }
        Err(e) => {
            reporter.on_error(descriptor.page_number, &e.to_string());
            failed_outcome(&format!("Modellaufruf fehlgeschlagen: {e}"))
        }
    }
}

fn failed_outcome(message: &str) -> GenerationOutcome {
    GenerationOutcome {
        image_type: crate::entities::Bildtyp::Fehler,
        alt_text: message.to_string(),
        ist_dekorativ: false,
        konfidenz: crate::entities::Konfidenz::Niedrig,
        raw_response: None,
        failed: true,
    }
}

/// Apply a [`GenerationOutcome`] onto a descriptor in memory. Persistence
/// (the atomic per-image transaction) is the caller's responsibility — this
/// function only encodes the pure state transition so it can be unit
/// tested without a database.
pub fn apply_outcome(descriptor: &mut ImageDescriptor, outcome: GenerationOutcome) {
    descriptor.image_type = Some(outcome.image_type);
    descriptor.alt_text = Some(outcome.alt_text);
    descriptor.konfidenz = Some(outcome.konfidenz);
    descriptor.raw_response = outcome.raw_response;
    descriptor.status = if outcome.failed {
        ImageStatus::Error
    } else {
        ImageStatus::Done
    };
    let _ = outcome.ist_dekorativ; // surfaced via image_type/alt_text already
}

/// Advance a project's status once every descriptor has reached a terminal
/// (done/error) per-image status. Model failures on individual images never
/// force the *project* into `Error` — only a project-wide extraction
/// failure does that (handled in [`extract_project`]).
pub fn maybe_complete_project(project: &mut Project, descriptors: &[ImageDescriptor]) {
    let all_terminal = descriptors
        .iter()
        .all(|d| matches!(d.status, ImageStatus::Done | ImageStatus::Error));
    if all_terminal {
        project.status = ProjectStatus::Done;
    }
}

/// Shared handle passed to the background generation task.
pub struct GenerationContext {
    pub client: Arc<ModelClient>,
    pub config: Arc<Config>,
}
