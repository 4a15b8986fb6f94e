use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints readable by anyone. Identity is optional here and only changes the
/// affordances reported by the loader (`can_delete`, `is_owner`).
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /api/notes/{note_id}
        // The note loader's data as JSON.
        .route("/api/notes/{note_id}", get(handlers::note_data))
        // GET /resources/note-images/{image_id}
        // Image URL resolver: redirects to a presigned object storage URL.
        .route(
            "/resources/note-images/{image_id}",
            get(handlers::note_image),
        )
}
