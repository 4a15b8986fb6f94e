use crate::models::{
    Note, NoteDetail, NoteImage, NoteImageObject, NoteOwner, NoteSummary, PermissionRow, User,
    UserWithPermissions,
};
use crate::permissions::Permission;
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// The abstract contract for every persistence operation the routes need. Handlers
/// depend on this trait only, so tests swap in an in-memory implementation.
///
/// **Send + Sync + async_trait** make the trait object (`Arc<dyn Repository>`)
/// shareable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Notes ---
    // Fixed projection used by the note loader, images in creation order.
    async fn get_note(&self, id: Uuid) -> Result<Option<NoteDetail>, sqlx::Error>;
    // Re-fetch used by the delete action: owner id and owner username only.
    async fn get_note_owner(&self, id: Uuid) -> Result<Option<NoteOwner>, sqlx::Error>;
    // Returns true if a row was deleted.
    async fn delete_note(&self, id: Uuid) -> Result<bool, sqlx::Error>;
    async fn get_owner_notes(&self, owner_id: Uuid) -> Result<Vec<NoteSummary>, sqlx::Error>;
    async fn get_note_image(&self, id: Uuid) -> Result<Option<NoteImageObject>, sqlx::Error>;

    // --- Users ---
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error>;
    /// Resolves a user together with every permission granted through their roles.
    async fn get_user_with_permissions(
        &self,
        id: Uuid,
    ) -> Result<Option<UserWithPermissions>, sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. Queries are checked at
/// runtime so the crate builds without a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// get_note
    ///
    /// Two round-trips: the note row, then its images. A missing note short-circuits
    /// before the image query.
    async fn get_note(&self, id: Uuid) -> Result<Option<NoteDetail>, sqlx::Error> {
        let note = sqlx::query_as::<_, Note>(
            r#"SELECT id, title, content, owner_id, updated_at FROM notes WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(note) = note else {
            return Ok(None);
        };

        let images = sqlx::query_as::<_, NoteImage>(
            r#"
            SELECT id, alt_text
            FROM note_images
            WHERE note_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(NoteDetail::from_parts(note, images)))
    }

    async fn get_note_owner(&self, id: Uuid) -> Result<Option<NoteOwner>, sqlx::Error> {
        sqlx::query_as::<_, NoteOwner>(
            r#"
            SELECT n.id, n.owner_id, u.username AS owner_username
            FROM notes n
            JOIN users u ON u.id = n.owner_id
            WHERE n.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// delete_note
    ///
    /// Unconditional delete by id. Authorization has already happened in the action;
    /// images go with the note through `ON DELETE CASCADE`.
    async fn delete_note(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let res = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn get_owner_notes(&self, owner_id: Uuid) -> Result<Vec<NoteSummary>, sqlx::Error> {
        sqlx::query_as::<_, NoteSummary>(
            r#"SELECT id, title FROM notes WHERE owner_id = $1 ORDER BY updated_at DESC"#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_note_image(&self, id: Uuid) -> Result<Option<NoteImageObject>, sqlx::Error> {
        sqlx::query_as::<_, NoteImageObject>(
            r#"SELECT id, content_type, object_key FROM note_images WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"SELECT id, email, username, name FROM users WHERE username = $1"#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    /// get_user_with_permissions
    ///
    /// Joins users → roles → permissions. Rows whose tags do not parse are logged
    /// and skipped rather than failing the whole request.
    async fn get_user_with_permissions(
        &self,
        id: Uuid,
    ) -> Result<Option<UserWithPermissions>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, email, username, name FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(user) = user else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT DISTINCT p.entity, p.action, p.access
            FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            JOIN user_roles ur ON ur.role_id = rp.role_id
            WHERE ur.user_id = $1
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let permissions = rows
            .into_iter()
            .filter_map(|row| match Permission::try_from(row) {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!(user_id = %id, "skipping unknown permission: {}", e);
                    None
                }
            })
            .collect();

        Ok(Some(UserWithPermissions {
            id: user.id,
            username: user.username,
            name: user.name,
            permissions,
        }))
    }
}
