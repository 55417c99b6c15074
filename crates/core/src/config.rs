use serde::{Deserialize, Serialize};

/// Every tunable the pipeline and its HTTP collaborator surface need.
///
/// Assembled by the CLI/server binaries from flags and environment
/// variables; every field has a sane default so a bare `Config::default()`
/// is enough to run the `process` subcommand against a local Ollama.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the SQLite catalog database.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Root directory for uploaded source PDFs.
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,

    /// Root directory for per-project generated artifacts (materialized
    /// images, exported tagged PDFs).
    #[serde(default = "default_results_dir")]
    pub results_dir: String,

    /// Base URL of the vision model endpoint, e.g. `http://localhost:11434`.
    #[serde(default = "default_model_base_url")]
    pub model_base_url: String,

    /// Model identifier passed in the `model` field of each request.
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Maximum accepted upload size in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    /// Longest edge, in pixels, an image may have before being sent to the
    /// model (images are downscaled, never upscaled).
    #[serde(default = "default_max_image_dim")]
    pub max_image_dim: u32,

    /// Images larger than this on disk are forced to a lossier re-encode
    /// before being sent to the model.
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,

    /// Hard cap, in characters, on a generated alt-text.
    #[serde(default = "default_max_alt_text_len")]
    pub max_alt_text_len: usize,

    /// Model call timeout in seconds.
    #[serde(default = "default_model_timeout_secs")]
    pub model_timeout_secs: u64,

    /// Rate-limit window in seconds, kept as a dormant knob for a future
    /// auth layer (no authentication is implemented by this crate).
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,

    /// Max attempts within the rate-limit window, same caveat as above.
    #[serde(default = "default_rate_limit_max_attempts")]
    pub rate_limit_max_attempts: u32,

    /// Session/token TTL in seconds, same caveat as above.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,

    /// Cookie attributes to apply if a session layer is ever added.
    #[serde(default = "default_cookie_attributes")]
    pub cookie_attributes: String,
}

fn default_db_path() -> String {
    "./data/pdftag.sqlite3".to_string()
}

fn default_uploads_dir() -> String {
    "./data/uploads".to_string()
}

fn default_results_dir() -> String {
    "./data/results".to_string()
}

fn default_model_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model_name() -> String {
    "qwen2.5vl".to_string()
}

fn default_max_upload_bytes() -> u64 {
    50 * 1024 * 1024
}

fn default_max_image_dim() -> u32 {
    1024
}

fn default_max_image_bytes() -> u64 {
    4 * 1024 * 1024
}

fn default_max_alt_text_len() -> usize {
    400
}

fn default_model_timeout_secs() -> u64 {
    300
}

fn default_rate_limit_window_secs() -> u64 {
    300
}

fn default_rate_limit_max_attempts() -> u32 {
    5
}

fn default_token_ttl_secs() -> u64 {
    3600
}

fn default_cookie_attributes() -> String {
    "HttpOnly; SameSite=Strict; Secure".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            uploads_dir: default_uploads_dir(),
            results_dir: default_results_dir(),
            model_base_url: default_model_base_url(),
            model_name: default_model_name(),
            max_upload_bytes: default_max_upload_bytes(),
            max_image_dim: default_max_image_dim(),
            max_image_bytes: default_max_image_bytes(),
            max_alt_text_len: default_max_alt_text_len(),
            model_timeout_secs: default_model_timeout_secs(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
            rate_limit_max_attempts: default_rate_limit_max_attempts(),
            token_ttl_secs: default_token_ttl_secs(),
            cookie_attributes: default_cookie_attributes(),
        }
    }
}
