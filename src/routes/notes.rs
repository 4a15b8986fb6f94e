use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Notes Router Module
///
/// The HTML note pages. The POST on a note page is its form action; it requires a
/// session through the `AuthUser` extractor and redirects anonymous users to login.
pub fn note_routes() -> Router<AppState> {
    Router::new()
        // GET /users/{username}/notes
        // The owner's listing; also where a successful delete redirects.
        .route("/users/{username}/notes", get(handlers::owner_notes))
        // GET  /users/{username}/notes/{note_id}  → loader + view
        // POST /users/{username}/notes/{note_id}  → delete action
        .route(
            "/users/{username}/notes/{note_id}",
            get(handlers::note_page).post(handlers::delete_note_action),
        )
}
