use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::permissions::{Permission, PermissionParseError};

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A row of the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    // Unique handle used in note URLs (`/users/{username}/notes`).
    pub username: String,
    // Optional display name.
    pub name: Option<String>,
}

/// UserWithPermissions
///
/// The request's identity, resolved once by the auth extractor together with every
/// permission granted through the user's roles. Capability checks run against this
/// value instead of querying the store again.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserWithPermissions {
    pub id: Uuid,
    pub username: String,
    pub name: Option<String>,
    pub permissions: Vec<Permission>,
}

/// PermissionRow
///
/// Raw `(entity, action, access)` strings as stored in the `permissions` table.
#[derive(Debug, Clone, FromRow)]
pub struct PermissionRow {
    pub entity: String,
    pub action: String,
    pub access: String,
}

impl TryFrom<PermissionRow> for Permission {
    type Error = PermissionParseError;

    fn try_from(row: PermissionRow) -> Result<Self, Self::Error> {
        Ok(Permission::new(
            row.entity.parse()?,
            row.action.parse()?,
            row.access.parse()?,
        ))
    }
}

/// Note
///
/// The note projection read by the note route (without images).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub owner_id: Uuid,
    pub updated_at: DateTime<Utc>,
}

/// NoteImage
///
/// Image reference attached to a note. The blob itself lives in object storage and is
/// reached through `/resources/note-images/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct NoteImage {
    pub id: Uuid,
    pub alt_text: Option<String>,
}

/// NoteDetail
///
/// A note with its ordered images, as consumed by the loader and the view.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NoteDetail {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub owner_id: Uuid,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    pub images: Vec<NoteImage>,
}

impl NoteDetail {
    pub fn from_parts(note: Note, images: Vec<NoteImage>) -> Self {
        Self {
            id: note.id,
            title: note.title,
            content: note.content,
            owner_id: note.owner_id,
            updated_at: note.updated_at,
            images,
        }
    }
}

/// NoteOwner
///
/// Minimal projection re-fetched by the delete action: enough to authorize the
/// deletion and to build the redirect target.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NoteOwner {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub owner_username: String,
}

/// NoteSummary
///
/// One entry of an owner's note listing.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct NoteSummary {
    pub id: Uuid,
    pub title: String,
}

/// NoteImageObject
///
/// Storage-facing view of an image: where its blob lives and how to serve it.
#[derive(Debug, Clone, FromRow)]
pub struct NoteImageObject {
    pub id: Uuid,
    pub content_type: String,
    pub object_key: String,
}

// --- Response Payloads (Output Schemas) ---

/// NoteLoaderData
///
/// Everything the note view needs. `can_delete` comes from the shared capability
/// predicate and only drives UI affordances; the action re-checks authoritatively.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NoteLoaderData {
    pub note: NoteDetail,
    /// Relative age of the last update, e.g. "3 days".
    pub time_ago: String,
    pub can_delete: bool,
    pub is_owner: bool,
}

/// ErrorResponse
///
/// JSON body of every non-validation error, e.g. `{"error":"Unauthorized","message":"..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
