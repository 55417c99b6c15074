/// Trait for reporting pipeline progress.
///
/// Implementations can target CLI (indicatif), WebSocket, or any other
/// channel; the pipeline itself never depends on a concrete sink.
pub trait ProgressReporter: Send + Sync {
    /// Called when extraction of a PDF's images starts.
    fn on_extraction_start(&self, filename: &str, total_pages: u32);

    /// Called when extraction finishes and the image count is known.
    fn on_extraction_complete(&self, filename: &str, total_images: u32);

    /// Called before an image's alt-text is requested from the model.
    fn on_image_start(&self, page_num: u32, image_index: u32);

    /// Called once an image's alt-text has been generated and persisted.
    fn on_image_done(&self, page_num: u32, image_index: u32, alt_text_preview: &str);

    /// Called when the whole project has reached a terminal status.
    fn on_project_complete(&self, project_id: &str, total_images: u32);

    /// Called on non-fatal, per-image errors.
    fn on_error(&self, page_num: u32, error: &str);
}

/// A no-op progress reporter that discards all events.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn on_extraction_start(&self, _filename: &str, _total_pages: u32) {}
    fn on_extraction_complete(&self, _filename: &str, _total_images: u32) {}
    fn on_image_start(&self, _page_num: u32, _image_index: u32) {}
    fn on_image_done(&self, _page_num: u32, _image_index: u32, _alt_text_preview: &str) {}
    fn on_project_complete(&self, _project_id: &str, _total_images: u32) {}
    fn on_error(&self, _page_num: u32, _error: &str) {}
}
