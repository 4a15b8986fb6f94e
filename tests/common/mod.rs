#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use notes_portal::{
    AppConfig, AppState, MockStorageService,
    models::{
        NoteDetail, NoteImage, NoteImageObject, NoteOwner, NoteSummary, User, UserWithPermissions,
    },
    permissions::{Access, Action, Entity, Permission},
    repository::Repository,
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use uuid::Uuid;

// --- IN-MEMORY REPOSITORY ---

// Backs handler and router tests with plain vectors. `lookups` counts permission
// loads so tests can assert the user is resolved once per request.
#[derive(Default)]
pub struct InMemoryRepository {
    pub users: Mutex<Vec<User>>,
    pub grants: Mutex<Vec<(Uuid, Permission)>>,
    pub notes: Mutex<Vec<NoteDetail>>,
    pub images: Mutex<Vec<NoteImageObject>>,
    pub lookups: AtomicUsize,
}

impl InMemoryRepository {
    pub fn add_user(&self, username: &str, permissions: &[Permission]) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", username),
            username: username.to_string(),
            name: Some(format!("{} Example", username)),
        };
        self.users.lock().unwrap().push(user.clone());
        let mut grants = self.grants.lock().unwrap();
        for p in permissions {
            grants.push((user.id, *p));
        }
        user
    }

    pub fn add_note(&self, owner: &User, title: &str, content: &str) -> NoteDetail {
        let note = NoteDetail {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: content.to_string(),
            owner_id: owner.id,
            updated_at: Utc::now() - Duration::days(3),
            images: vec![],
        };
        self.notes.lock().unwrap().push(note.clone());
        note
    }

    pub fn add_image(&self, note_id: Uuid, alt_text: Option<&str>) -> NoteImage {
        let image = NoteImage {
            id: Uuid::new_v4(),
            alt_text: alt_text.map(str::to_string),
        };
        let mut notes = self.notes.lock().unwrap();
        if let Some(note) = notes.iter_mut().find(|n| n.id == note_id) {
            note.images.push(image.clone());
        }
        self.images.lock().unwrap().push(NoteImageObject {
            id: image.id,
            content_type: "image/png".to_string(),
            object_key: format!("notes/{}/{}.png", note_id, image.id),
        });
        image
    }

    pub fn has_note(&self, id: Uuid) -> bool {
        self.notes.lock().unwrap().iter().any(|n| n.id == id)
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_note(&self, id: Uuid) -> Result<Option<NoteDetail>, sqlx::Error> {
        Ok(self.notes.lock().unwrap().iter().find(|n| n.id == id).cloned())
    }

    async fn get_note_owner(&self, id: Uuid) -> Result<Option<NoteOwner>, sqlx::Error> {
        let notes = self.notes.lock().unwrap();
        let users = self.users.lock().unwrap();
        Ok(notes.iter().find(|n| n.id == id).and_then(|n| {
            users.iter().find(|u| u.id == n.owner_id).map(|u| NoteOwner {
                id: n.id,
                owner_id: n.owner_id,
                owner_username: u.username.clone(),
            })
        }))
    }

    async fn delete_note(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut notes = self.notes.lock().unwrap();
        let before = notes.len();
        notes.retain(|n| n.id != id);
        Ok(notes.len() < before)
    }

    async fn get_owner_notes(&self, owner_id: Uuid) -> Result<Vec<NoteSummary>, sqlx::Error> {
        Ok(self
            .notes
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.owner_id == owner_id)
            .map(|n| NoteSummary {
                id: n.id,
                title: n.title.clone(),
            })
            .collect())
    }

    async fn get_note_image(&self, id: Uuid) -> Result<Option<NoteImageObject>, sqlx::Error> {
        Ok(self.images.lock().unwrap().iter().find(|i| i.id == id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn get_user_with_permissions(
        &self,
        id: Uuid,
    ) -> Result<Option<UserWithPermissions>, sqlx::Error> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let users = self.users.lock().unwrap();
        let Some(user) = users.iter().find(|u| u.id == id) else {
            return Ok(None);
        };
        let permissions = self
            .grants
            .lock()
            .unwrap()
            .iter()
            .filter(|(user_id, _)| *user_id == id)
            .map(|(_, p)| *p)
            .collect();
        Ok(Some(UserWithPermissions {
            id: user.id,
            username: user.username.clone(),
            name: user.name.clone(),
            permissions,
        }))
    }
}

// --- FIXTURES ---

pub fn delete_note_own() -> Permission {
    Permission::new(Entity::Note, Action::Delete, Access::Own)
}

pub fn delete_note_any() -> Permission {
    Permission::new(Entity::Note, Action::Delete, Access::Any)
}

pub fn with_permissions(id: Uuid, permissions: Vec<Permission>) -> UserWithPermissions {
    UserWithPermissions {
        id,
        username: "someone".to_string(),
        name: None,
        permissions,
    }
}

pub fn create_test_state(repo: Arc<InMemoryRepository>) -> AppState {
    AppState {
        repo,
        storage: Arc::new(MockStorageService::new()),
        config: AppConfig::default(),
    }
}
