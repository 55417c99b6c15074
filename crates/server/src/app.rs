use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, patch, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::routes;
use crate::state::AppState;
use crate::ws;

/// Build the Axum application router.
pub fn create_app(state: Arc<AppState>) -> Router {
    let max_upload = state.config.max_upload_bytes as usize;

    let api_routes = Router::new()
        .route("/api/health", get(routes::health::health_check))
        .route("/api/config", get(routes::config::get_config))
        .route("/api/upload", post(routes::upload::upload_pdf))
        .route("/api/projects", get(routes::projects::list_projects))
        .route("/api/projects/{id}", get(routes::projects::get_project))
        .route("/api/projects/{id}", delete(routes::projects::delete_project))
        .route(
            "/api/projects/{id}/images",
            get(routes::projects::list_project_images),
        )
        .route("/api/projects/{id}/generate", post(routes::generate::generate))
        .route(
            "/api/projects/{id}/generate",
            delete(routes::generate::cancel_generate),
        )
        .route("/api/projects/{id}/export", get(routes::export::export_pdf))
        .route("/api/images/{id}", get(routes::images::get_image_file))
        .route("/api/images/{id}", patch(routes::images::edit_alt_text));

    let ws_route = Router::new().route("/ws/{project_id}", get(ws::ws_handler));

    let uploads_service = ServeDir::new(&state.uploads_dir);
    let results_service = ServeDir::new(&state.results_dir);

    Router::new()
        .merge(api_routes)
        .merge(ws_route)
        .nest_service("/uploads", uploads_service)
        .nest_service("/results", results_service)
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(max_upload))
        .with_state(state)
}
