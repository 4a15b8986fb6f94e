mod common;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{Request, StatusCode, header, request::Parts},
};
use common::{InMemoryRepository, create_test_state, delete_note_own};
use jsonwebtoken::{EncodingKey, Header, encode};
use notes_portal::{
    AppError, AppState,
    auth::{AuthUser, Claims, issue_session_token},
    config::Env,
};
use std::sync::Arc;
use uuid::Uuid;

// --- TEST UTILITIES ---

fn parts_with(headers: &[(header::HeaderName, String)]) -> Parts {
    let mut builder = Request::builder().uri("/users/kody/notes/1");
    for (name, value) in headers {
        builder = builder.header(name, value);
    }
    builder.body(()).unwrap().into_parts().0
}

fn production_state(repo: Arc<InMemoryRepository>) -> AppState {
    let mut state = create_test_state(repo);
    state.config.env = Env::Production;
    state
}

async fn optional_user(parts: &mut Parts, state: &AppState) -> Option<AuthUser> {
    <AuthUser as OptionalFromRequestParts<AppState>>::from_request_parts(parts, state)
        .await
        .unwrap()
}

// --- TESTS ---

#[tokio::test]
async fn test_bearer_token_resolves_user_with_permissions() {
    let repo = Arc::new(InMemoryRepository::default());
    let user = repo.add_user("kody", &[delete_note_own()]);
    let state = create_test_state(repo);

    let token = issue_session_token(user.id, &state.config.jwt_secret, 60).unwrap();
    let mut parts = parts_with(&[(header::AUTHORIZATION, format!("Bearer {}", token))]);

    let AuthUser(resolved) = <AuthUser as FromRequestParts<AppState>>::from_request_parts(&mut parts, &state)
        .await
        .unwrap();

    assert_eq!(resolved.id, user.id);
    assert_eq!(resolved.username, "kody");
    assert_eq!(resolved.permissions, vec![delete_note_own()]);
}

#[tokio::test]
async fn test_session_cookie_resolves_user() {
    let repo = Arc::new(InMemoryRepository::default());
    let user = repo.add_user("kody", &[]);
    let state = production_state(repo);

    let token = issue_session_token(user.id, &state.config.jwt_secret, 60).unwrap();
    let mut parts = parts_with(&[(header::COOKIE, format!("a=b; en_session={}", token))]);

    let resolved = optional_user(&mut parts, &state).await;

    assert_eq!(resolved.map(|AuthUser(u)| u.id), Some(user.id));
}

#[tokio::test]
async fn test_expired_token_is_anonymous() {
    let repo = Arc::new(InMemoryRepository::default());
    let user = repo.add_user("kody", &[]);
    let state = create_test_state(repo);

    let claims = Claims {
        sub: user.id,
        iat: 1_000,
        exp: 2_000,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.config.jwt_secret.as_bytes()),
    )
    .unwrap();
    let mut parts = parts_with(&[(header::AUTHORIZATION, format!("Bearer {}", token))]);

    assert!(optional_user(&mut parts, &state).await.is_none());
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_anonymous() {
    let repo = Arc::new(InMemoryRepository::default());
    let user = repo.add_user("kody", &[]);
    let state = create_test_state(repo);

    let token = issue_session_token(user.id, "some-other-secret", 60).unwrap();
    let mut parts = parts_with(&[(header::AUTHORIZATION, format!("Bearer {}", token))]);

    assert!(optional_user(&mut parts, &state).await.is_none());
}

#[tokio::test]
async fn test_required_user_redirects_to_login() {
    let state = create_test_state(Arc::new(InMemoryRepository::default()));
    let mut parts = parts_with(&[]);

    let err = <AuthUser as FromRequestParts<AppState>>::from_request_parts(&mut parts, &state)
        .await
        .err()
        .unwrap();

    assert_eq!(err.status(), StatusCode::FOUND);
    match err {
        AppError::Unauthenticated { redirect_to } => {
            assert_eq!(redirect_to, "/users/kody/notes/1")
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_required_user_redirect_keeps_query() {
    let state = create_test_state(Arc::new(InMemoryRepository::default()));
    let mut parts = Request::builder()
        .uri("/users/kody/notes/1?tab=images&page=2")
        .body(())
        .unwrap()
        .into_parts()
        .0;

    let err = <AuthUser as FromRequestParts<AppState>>::from_request_parts(&mut parts, &state)
        .await
        .err()
        .unwrap();

    match err {
        AppError::Unauthenticated { redirect_to } => {
            assert_eq!(redirect_to, "/users/kody/notes/1?tab=images&page=2")
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_local_bypass_header() {
    let repo = Arc::new(InMemoryRepository::default());
    let user = repo.add_user("kody", &[]);
    let state = create_test_state(repo);
    let mut parts = parts_with(&[(header::HeaderName::from_static("x-user-id"), user.id.to_string())]);

    assert!(optional_user(&mut parts, &state).await.is_some());
}

#[tokio::test]
async fn test_bypass_header_ignored_in_production() {
    let repo = Arc::new(InMemoryRepository::default());
    let user = repo.add_user("kody", &[]);
    let state = production_state(repo);
    let mut parts = parts_with(&[(header::HeaderName::from_static("x-user-id"), user.id.to_string())]);

    assert!(optional_user(&mut parts, &state).await.is_none());
}

#[tokio::test]
async fn test_deleted_user_is_anonymous() {
    let state = create_test_state(Arc::new(InMemoryRepository::default()));
    let mut parts = parts_with(&[(
        header::HeaderName::from_static("x-user-id"),
        Uuid::new_v4().to_string(),
    )]);

    assert!(optional_user(&mut parts, &state).await.is_none());
}

#[tokio::test]
async fn test_user_is_loaded_once_per_request() {
    let repo = Arc::new(InMemoryRepository::default());
    let user = repo.add_user("kody", &[]);
    let state = create_test_state(repo.clone());
    let mut parts = parts_with(&[(header::HeaderName::from_static("x-user-id"), user.id.to_string())]);

    assert!(optional_user(&mut parts, &state).await.is_some());
    assert!(<AuthUser as FromRequestParts<AppState>>::from_request_parts(&mut parts, &state).await.is_ok());

    assert_eq!(repo.lookup_count(), 1);
}
