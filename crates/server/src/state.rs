use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use pdftag_core::Config;
use pdftag_storage::{LocalStorage, StorageBackend};
use tokio::sync::Mutex;

use crate::jobs::ProjectStore;

/// Shared application state.
pub struct AppState {
    pub store: ProjectStore,
    pub config: Arc<Config>,
    pub uploads_dir: PathBuf,
    pub results_dir: PathBuf,
    /// Storage backend for uploaded source PDFs. A local-disk implementation
    /// today, but routes talk to it through [`StorageBackend`] so a future
    /// remote backend is a one-line swap.
    pub uploads_store: Arc<dyn StorageBackend>,
    /// Storage backend for generated artifacts (tagged PDFs), rooted at
    /// `results_dir`.
    pub results_store: Arc<dyn StorageBackend>,
    /// Cancellation flags for in-flight generation runs, keyed by project id.
    /// A `generate` call checks this at each image boundary; set by the
    /// cancel route and dropped once the run observes it.
    cancel_flags: Mutex<HashMap<String, Arc<AtomicBool>>>,
}

impl AppState {
    pub fn new(store: ProjectStore, config: Config, uploads_dir: PathBuf, results_dir: PathBuf) -> Arc<Self> {
        let uploads_store = Arc::new(LocalStorage::new(uploads_dir.clone(), "/uploads".to_string()));
        let results_store = Arc::new(LocalStorage::new(results_dir.clone(), "/results".to_string()));
        Arc::new(Self {
            store,
            config: Arc::new(config),
            uploads_dir,
            results_dir,
            uploads_store,
            results_store,
            cancel_flags: Mutex::new(HashMap::new()),
        })
    }

    /// Register a fresh cancellation flag for a project's generation run,
    /// replacing any stale one left over from a previous run.
    pub async fn new_cancel_flag(&self, project_id: &str) -> Arc<AtomicBool> {
        let flag = Arc::new(AtomicBool::new(false));
        self.cancel_flags
            .lock()
            .await
            .insert(project_id.to_string(), flag.clone());
        flag
    }

    /// Signal cancellation for a project's in-flight generation run, if any.
    /// Returns `true` if a run was found to cancel.
    pub async fn cancel(&self, project_id: &str) -> bool {
        if let Some(flag) = self.cancel_flags.lock().await.get(project_id) {
            flag.store(true, std::sync::atomic::Ordering::Relaxed);
            true
        } else {
            false
        }
    }
}
