use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::AppError,
    models::UserWithPermissions,
    repository::RepositoryState,
};

/// Name of the cookie carrying the session token for browser form posts.
pub const SESSION_COOKIE: &str = "en_session";

/// Claims
///
/// Payload of the HS256 session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: Uuid,
    /// Expiration time (seconds since epoch). Always validated.
    pub exp: usize,
    /// Issued at.
    pub iat: usize,
}

/// AuthUser Extractor Result
///
/// The resolved identity of a request, with permissions already loaded.
///
/// - As `AuthUser`, the session is required: anonymous requests are redirected to
///   the login page.
/// - As `Option<AuthUser>`, anonymous requests yield `None`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserWithPermissions);

/// Per-request cache so the user and their permissions are loaded at most once.
#[derive(Clone)]
struct ResolvedUser(Option<UserWithPermissions>);

/// issue_session_token
///
/// Signs a session token for `user_id`, valid for `ttl_secs` seconds.
pub fn issue_session_token(
    user_id: Uuid,
    secret: &str,
    ttl_secs: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        iat: now.max(0) as usize,
        exp: (now + ttl_secs).max(0) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

fn cookie_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token)
}

/// session_user_id
///
/// The user id a request claims, before any store lookup:
/// 1. `x-user-id` header (local environment only),
/// 2. `Authorization: Bearer <token>`,
/// 3. the session cookie.
///
/// Invalid or expired tokens read as anonymous.
fn session_user_id(parts: &Parts, config: &AppConfig) -> Option<Uuid> {
    if config.env == Env::Local {
        let bypass = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|id| Uuid::parse_str(id).ok());
        if bypass.is_some() {
            return bypass;
        }
    }

    let token = bearer_token(parts).or_else(|| cookie_token(parts))?;

    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => Some(data.claims.sub),
        Err(e) => {
            tracing::debug!("rejected session token: {:?}", e.kind());
            None
        }
    }
}

/// resolve_user
///
/// Identity plus permissions, read from the request cache or the repository. Users
/// that no longer exist are anonymous.
async fn resolve_user<S>(parts: &mut Parts, state: &S) -> Result<Option<UserWithPermissions>, AppError>
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    if let Some(ResolvedUser(cached)) = parts.extensions.get::<ResolvedUser>() {
        return Ok(cached.clone());
    }

    let config = AppConfig::from_ref(state);
    let user = match session_user_id(parts, &config) {
        Some(user_id) => {
            let repo = RepositoryState::from_ref(state);
            repo.get_user_with_permissions(user_id).await?
        }
        None => None,
    };

    parts.extensions.insert(ResolvedUser(user.clone()));
    Ok(user)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match resolve_user(parts, state).await? {
            Some(user) => Ok(AuthUser(user)),
            None => Err(AppError::Unauthenticated {
                redirect_to: parts
                    .uri
                    .path_and_query()
                    .map_or_else(|| parts.uri.path().to_string(), |pq| pq.as_str().to_string()),
            }),
        }
    }
}

impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(resolve_user(parts, state).await?.map(AuthUser))
    }
}
