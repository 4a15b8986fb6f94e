use std::collections::HashMap;

use axum::{
    Form, Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    forms::{self, ActionReply, DeleteNoteForm, Submission},
    models::{NoteLoaderData, UserWithPermissions},
    permissions::{self, Action, Entity},
    views,
};

fn note_not_found(note_id: impl std::fmt::Display) -> AppError {
    AppError::not_found(format!("No note with the id \"{}\" exists", note_id))
}

/// Note ids arrive as raw strings from the URL and the form. One that is not a UUID
/// cannot name a stored note, so it reads as not found.
fn parse_note_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| note_not_found(raw))
}

// --- Loaders ---

/// load_note
///
/// The read path of the note route: the note projection plus UI affordances computed
/// by the shared capability predicate. Anonymous viewers never get `can_delete`.
pub async fn load_note(
    state: &AppState,
    viewer: Option<&UserWithPermissions>,
    note_id: Uuid,
) -> Result<NoteLoaderData, AppError> {
    let note = state
        .repo
        .get_note(note_id)
        .await?
        .ok_or_else(|| note_not_found(note_id))?;

    let can_delete = permissions::user_can(viewer, Entity::Note, Action::Delete, note.owner_id);
    let is_owner = viewer.is_some_and(|u| u.id == note.owner_id);
    let time_ago = views::time_ago(note.updated_at, Utc::now());

    Ok(NoteLoaderData {
        note,
        time_ago,
        can_delete,
        is_owner,
    })
}

// --- Handlers ---

/// note_page
///
/// [Public Route] Renders a single note. Missing notes render the 404 boundary.
#[utoipa::path(
    get,
    path = "/users/{username}/notes/{note_id}",
    params(
        ("username" = String, Path, description = "Owner username"),
        ("note_id" = String, Path, description = "Note ID")
    ),
    responses(
        (status = 200, description = "Note page", body = String, content_type = "text/html"),
        (status = 404, description = "No such note", body = String, content_type = "text/html")
    )
)]
pub async fn note_page(
    viewer: Option<AuthUser>,
    State(state): State<AppState>,
    Path((username, note_id)): Path<(String, String)>,
) -> Response {
    let viewer = viewer.map(|AuthUser(user)| user);
    let data = match parse_note_id(&note_id) {
        Ok(note_id) => load_note(&state, viewer.as_ref(), note_id).await,
        Err(e) => Err(e),
    };
    match data {
        Ok(data) => Html(views::render_note_page(&username, &data)).into_response(),
        Err(e) => e.into_page_response(),
    }
}

/// note_data
///
/// [Public Route] The note loader's data as JSON.
#[utoipa::path(
    get,
    path = "/api/notes/{note_id}",
    params(("note_id" = String, Path, description = "Note ID")),
    responses(
        (status = 200, description = "Loader data", body = NoteLoaderData),
        (status = 404, description = "No such note", body = crate::models::ErrorResponse)
    )
)]
pub async fn note_data(
    viewer: Option<AuthUser>,
    State(state): State<AppState>,
    Path(note_id): Path<String>,
) -> Result<Json<NoteLoaderData>, AppError> {
    let viewer = viewer.map(|AuthUser(user)| user);
    let note_id = parse_note_id(&note_id)?;
    load_note(&state, viewer.as_ref(), note_id).await.map(Json)
}

/// delete_note_action
///
/// [Authenticated Route] The write path of the note route:
/// validate → re-fetch → authorize → delete → redirect to the owner's listing.
///
/// *Authorization*: the capability check here is authoritative; whatever the loader
/// showed is irrelevant. A forbidden delete leaves the note untouched.
#[utoipa::path(
    post,
    path = "/users/{username}/notes/{note_id}",
    params(
        ("username" = String, Path, description = "Owner username"),
        ("note_id" = String, Path, description = "Note ID")
    ),
    request_body(content = DeleteNoteForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Submission echoed (not a submit)", body = ActionReply),
        (status = 302, description = "Deleted, redirect to the owner's notes"),
        (status = 400, description = "Invalid submission", body = ActionReply),
        (status = 403, description = "Missing permission", body = crate::models::ErrorResponse),
        (status = 404, description = "No such note", body = crate::models::ErrorResponse)
    )
)]
pub async fn delete_note_action(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let form = match forms::parse_delete_note(&fields) {
        Submission::Success(form) => form,
        Submission::Idle(reply) => {
            return Ok((StatusCode::OK, Json(ActionReply { result: reply })).into_response());
        }
        Submission::Error(reply) => return Err(AppError::Validation(reply)),
    };

    let note_id = parse_note_id(&form.note_id)?;
    let note = state
        .repo
        .get_note_owner(note_id)
        .await?
        .ok_or_else(|| note_not_found(note_id))?;

    permissions::require_user_can(&user, Entity::Note, Action::Delete, note.owner_id)?;

    if !state.repo.delete_note(note.id).await? {
        // Deleted concurrently between the re-fetch and now.
        return Err(note_not_found(note.id));
    }

    tracing::info!(note_id = %note.id, user_id = %user.id, "note deleted");

    let location = format!("/users/{}/notes", note.owner_username);
    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

/// owner_notes
///
/// [Public Route] Lists a user's notes, newest first.
#[utoipa::path(
    get,
    path = "/users/{username}/notes",
    params(("username" = String, Path, description = "Owner username")),
    responses(
        (status = 200, description = "Notes page", body = String, content_type = "text/html"),
        (status = 404, description = "No such user", body = String, content_type = "text/html")
    )
)]
pub async fn owner_notes(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Response {
    let result = async {
        let owner = state
            .repo
            .get_user_by_username(&username)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("No user with the username \"{}\" exists", username))
            })?;
        let notes = state.repo.get_owner_notes(owner.id).await?;
        Ok::<_, AppError>(views::render_notes_list(&owner, &notes))
    }
    .await;

    match result {
        Ok(page) => Html(page).into_response(),
        Err(e) => e.into_page_response(),
    }
}

/// note_image
///
/// [Public Route] Resolves an image id to a short-lived presigned storage URL and
/// redirects there.
#[utoipa::path(
    get,
    path = "/resources/note-images/{image_id}",
    params(("image_id" = Uuid, Path, description = "Image ID")),
    responses(
        (status = 307, description = "Redirect to the image blob"),
        (status = 404, description = "No such image", body = crate::models::ErrorResponse)
    )
)]
pub async fn note_image(
    State(state): State<AppState>,
    Path(image_id): Path<Uuid>,
) -> Result<Redirect, AppError> {
    let image = state
        .repo
        .get_note_image(image_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Image \"{}\" not found", image_id)))?;

    let url = state
        .storage
        .get_presigned_download_url(&image.object_key, &image.content_type)
        .await
        .map_err(AppError::Storage)?;

    Ok(Redirect::temporary(&url))
}
