use serde::{Deserialize, Serialize};

/// Live progress event for one project's generation run, broadcast over
/// the project's channel and consumed by the websocket route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectProgress {
    pub project_id: String,
    pub image_id: String,
    pub status: String,
}

/// ISO 8601 UTC timestamp, e.g. `2026-08-01T01:12:24Z`.
pub fn iso_now() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
