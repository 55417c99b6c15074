use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use pdftag_core::{Bildtyp, ImageDescriptor, ImageStatus, Konfidenz, Project, ProjectStatus};
use rusqlite::{params, Connection};
use tokio::sync::{broadcast, Mutex};

use super::models::ProjectProgress;

/// SQLite-backed catalog of projects and their image descriptors, with a
/// broadcast channel per project for live progress events.
///
/// On startup, any image row left in `status = 'processing'` is reset to
/// `pending` (never `failed`) — the previous process died before the atomic
/// per-image commit completed, and the specification requires that a later
/// `generate` call can resume from pending rows rather than losing work.
/// The owning project's status is left untouched.
#[derive(Clone)]
pub struct ProjectStore {
    db: Arc<std::sync::Mutex<Connection>>,
    progress_senders: Arc<Mutex<HashMap<String, broadcast::Sender<ProjectProgress>>>>,
}

impl ProjectStore {
    pub fn new(db_path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS projects (
                id               TEXT PRIMARY KEY,
                owner            TEXT NOT NULL,
                source_filename  TEXT NOT NULL,
                source_path      TEXT NOT NULL,
                status           TEXT NOT NULL DEFAULT 'uploaded',
                total_images     INTEGER NOT NULL DEFAULT 0,
                processed_images INTEGER NOT NULL DEFAULT 0,
                created_at       TEXT NOT NULL,
                updated_at       TEXT NOT NULL,
                error_message    TEXT
            );
            CREATE TABLE IF NOT EXISTS images (
                id              TEXT PRIMARY KEY,
                project_id      TEXT NOT NULL,
                page_number     INTEGER NOT NULL,
                image_index     INTEGER NOT NULL,
                image_path      TEXT NOT NULL,
                ext             TEXT NOT NULL,
                width           INTEGER NOT NULL,
                height          INTEGER NOT NULL,
                xref            INTEGER NOT NULL,
                resource_name   TEXT NOT NULL,
                context_text    TEXT NOT NULL,
                image_type      TEXT,
                alt_text        TEXT,
                alt_text_edited TEXT,
                konfidenz       TEXT,
                raw_response    TEXT,
                status          TEXT NOT NULL DEFAULT 'pending',
                UNIQUE(project_id, page_number, image_index)
            );",
        )?;

        conn.execute(
            "UPDATE images SET status = 'pending' WHERE status = 'processing'",
            [],
        )?;

        tracing::info!("project catalog opened at {}", db_path.display());

        Ok(Self {
            db: Arc::new(std::sync::Mutex::new(conn)),
            progress_senders: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub async fn insert_project(&self, project: &Project) {
        {
            let db = self.db.lock().expect("db lock poisoned");
            db.execute(
                "INSERT INTO projects (id, owner, source_filename, source_path, status, total_images, processed_images, created_at, updated_at, error_message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    project.id,
                    project.owner,
                    project.source_filename,
                    project.source_path,
                    project.status.to_string(),
                    project.total_images,
                    project.processed_images,
                    project.created_at,
                    project.updated_at,
                    project.error_message,
                ],
            )
            .expect("failed to insert project");
        }

        let (tx, _) = broadcast::channel(64);
        self.progress_senders.lock().await.insert(project.id.clone(), tx);
    }

    pub async fn get_project(&self, id: &str) -> Option<Project> {
        let db = self.db.lock().expect("db lock poisoned");
        db.query_row(
            "SELECT id, owner, source_filename, source_path, status, total_images, processed_images, created_at, updated_at, error_message
             FROM projects WHERE id = ?1",
            params![id],
            row_to_project,
        )
        .ok()
    }

    pub async fn list_projects(&self) -> Vec<Project> {
        let db = self.db.lock().expect("db lock poisoned");
        let mut stmt = db
            .prepare(
                "SELECT id, owner, source_filename, source_path, status, total_images, processed_images, created_at, updated_at, error_message
                 FROM projects ORDER BY created_at DESC",
            )
            .expect("failed to prepare list_projects query");
        stmt.query_map([], row_to_project)
            .expect("failed to query projects")
            .filter_map(|r| r.ok())
            .collect()
    }

    pub async fn update_project_status(&self, id: &str, status: ProjectStatus, now: &str, error_message: Option<&str>) {
        let db = self.db.lock().expect("db lock poisoned");
        db.execute(
            "UPDATE projects SET status = ?1, updated_at = ?2, error_message = ?3 WHERE id = ?4",
            params![status.to_string(), now, error_message, id],
        )
        .ok();
    }

    pub async fn set_total_images(&self, id: &str, total: u32, now: &str) {
        let db = self.db.lock().expect("db lock poisoned");
        db.execute(
            "UPDATE projects SET total_images = ?1, updated_at = ?2 WHERE id = ?3",
            params![total, now, id],
        )
        .ok();
    }

    pub async fn delete_project(&self, id: &str) -> bool {
        let removed = {
            let db = self.db.lock().expect("db lock poisoned");
            db.execute("DELETE FROM images WHERE project_id = ?1", params![id]).ok();
            db.execute("DELETE FROM projects WHERE id = ?1", params![id])
                .map(|n| n > 0)
                .unwrap_or(false)
        };
        self.progress_senders.lock().await.remove(id);
        removed
    }

    pub async fn insert_images(&self, images: &[ImageDescriptor]) {
        let mut db = self.db.lock().expect("db lock poisoned");
        let tx = db.transaction().expect("failed to start transaction");
        for img in images {
            tx.execute(
                "INSERT INTO images (id, project_id, page_number, image_index, image_path, ext, width, height, xref, resource_name, context_text, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    img.id, img.project_id, img.page_number, img.image_index, img.image_path,
                    img.ext, img.width, img.height, img.xref, img.resource_name,
                    img.context_text, img.status.to_string(),
                ],
            )
            .expect("failed to insert image");
        }
        tx.commit().expect("failed to commit image insert transaction");
    }

    pub async fn list_images(&self, project_id: &str) -> Vec<ImageDescriptor> {
        let db = self.db.lock().expect("db lock poisoned");
        let mut stmt = db
            .prepare(
                "SELECT * FROM images WHERE project_id = ?1 ORDER BY page_number, image_index",
            )
            .expect("failed to prepare list_images query");
        stmt.query_map(params![project_id], row_to_image)
            .expect("failed to query images")
            .filter_map(|r| r.ok())
            .collect()
    }

    pub async fn list_pending_images(&self, project_id: &str) -> Vec<ImageDescriptor> {
        let db = self.db.lock().expect("db lock poisoned");
        let mut stmt = db
            .prepare(
                "SELECT * FROM images WHERE project_id = ?1 AND status = 'pending' ORDER BY page_number, image_index",
            )
            .expect("failed to prepare list_pending_images query");
        stmt.query_map(params![project_id], row_to_image)
            .expect("failed to query pending images")
            .filter_map(|r| r.ok())
            .collect()
    }

    /// Mark one image `processing` before its model call starts, so a crash
    /// mid-call is recovered (back to `pending`) by the startup-recovery
    /// query in [`ProjectStore::new`] instead of being indistinguishable
    /// from a row that was never picked up.
    pub async fn update_image_status(&self, image_id: &str, status: ImageStatus) {
        let db = self.db.lock().expect("db lock poisoned");
        db.execute(
            "UPDATE images SET status = ?1 WHERE id = ?2",
            params![status.to_string(), image_id],
        )
        .ok();
    }

    /// Atomically persist one image's generation outcome and increment the
    /// owning project's `processed_images` counter in a single transaction,
    /// per the crash-resumability requirement.
    pub async fn commit_image_result(
        &self,
        image_id: &str,
        project_id: &str,
        image_type: Bildtyp,
        alt_text: &str,
        konfidenz: Konfidenz,
        raw_response: Option<&str>,
        status: ImageStatus,
        now: &str,
    ) {
        {
            let mut db = self.db.lock().expect("db lock poisoned");
            let tx = db.transaction().expect("failed to start transaction");
            tx.execute(
                "UPDATE images SET image_type = ?1, alt_text = ?2, konfidenz = ?3, raw_response = ?4, status = ?5
                 WHERE id = ?6",
                params![
                    image_type.to_string(),
                    alt_text,
                    konfidenz.to_string(),
                    raw_response,
                    status.to_string(),
                    image_id,
                ],
            )
            .expect("failed to update image");
            tx.execute(
                "UPDATE projects SET processed_images = processed_images + 1, updated_at = ?1 WHERE id = ?2",
                params![now, project_id],
            )
            .expect("failed to update project progress");
            tx.commit().expect("failed to commit image-result transaction");
        }

        if let Some(tx) = self.progress_senders.lock().await.get(project_id) {
            let _ = tx.send(ProjectProgress {
                project_id: project_id.to_string(),
                image_id: image_id.to_string(),
                status: status.to_string(),
            });
        }
    }

    pub async fn set_alt_text_edited(&self, image_id: &str, text: &str) {
        let db = self.db.lock().expect("db lock poisoned");
        db.execute(
            "UPDATE images SET alt_text_edited = ?1 WHERE id = ?2",
            params![text, image_id],
        )
        .ok();
    }

    pub async fn get_image(&self, image_id: &str) -> Option<ImageDescriptor> {
        let db = self.db.lock().expect("db lock poisoned");
        db.query_row("SELECT * FROM images WHERE id = ?1", params![image_id], row_to_image)
            .ok()
    }

    pub async fn subscribe_progress(&self, project_id: &str) -> Option<broadcast::Receiver<ProjectProgress>> {
        self.progress_senders.lock().await.get(project_id).map(|tx| tx.subscribe())
    }
}

fn row_to_project(row: &rusqlite::Row) -> rusqlite::Result<Project> {
    let status_str: String = row.get("status")?;
    Ok(Project {
        id: row.get("id")?,
        owner: row.get("owner")?,
        source_filename: row.get("source_filename")?,
        source_path: row.get("source_path")?,
        status: status_str.parse().unwrap_or(ProjectStatus::Error),
        total_images: row.get("total_images")?,
        processed_images: row.get("processed_images")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        error_message: row.get("error_message")?,
    })
}

fn row_to_image(row: &rusqlite::Row) -> rusqlite::Result<ImageDescriptor> {
    let status_str: String = row.get("status")?;
    let image_type: Option<String> = row.get("image_type")?;
    let konfidenz: Option<String> = row.get("konfidenz")?;
    Ok(ImageDescriptor {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        page_number: row.get("page_number")?,
        image_index: row.get("image_index")?,
        image_path: row.get("image_path")?,
        ext: row.get("ext")?,
        width: row.get("width")?,
        height: row.get("height")?,
        xref: row.get("xref")?,
        resource_name: row.get("resource_name")?,
        context_text: row.get("context_text")?,
        image_type: image_type.and_then(|s| s.parse().ok()),
        alt_text: row.get("alt_text")?,
        alt_text_edited: row.get("alt_text_edited")?,
        konfidenz: konfidenz.and_then(|s| s.parse().ok()),
        raw_response: row.get("raw_response")?,
        status: status_str.parse().unwrap_or(ImageStatus::Error),
    })
}
