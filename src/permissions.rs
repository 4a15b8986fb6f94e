//! Centralized capability checks.
//!
//! Every route decides what a user may do through this module, so the read path
//! (UI affordances) and the write path (authoritative gate) can never drift apart.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{error::AppError, models::UserWithPermissions};

/// Kind of resource a permission applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Entity {
    Note,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

/// Access
///
/// `Own` grants the action only on resources the actor owns, `Any` regardless of
/// ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Access {
    Own,
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionParseError {
    #[error("unknown entity `{0}`")]
    Entity(String),
    #[error("unknown action `{0}`")]
    Action(String),
    #[error("unknown access `{0}`")]
    Access(String),
    #[error("malformed permission string `{0}`")]
    Malformed(String),
}

impl FromStr for Entity {
    type Err = PermissionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "note" => Ok(Entity::Note),
            "user" => Ok(Entity::User),
            other => Err(PermissionParseError::Entity(other.to_string())),
        }
    }
}

impl FromStr for Action {
    type Err = PermissionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Action::Create),
            "read" => Ok(Action::Read),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            other => Err(PermissionParseError::Action(other.to_string())),
        }
    }
}

impl FromStr for Access {
    type Err = PermissionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "own" => Ok(Access::Own),
            "any" => Ok(Access::Any),
            other => Err(PermissionParseError::Access(other.to_string())),
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Entity::Note => "note",
            Entity::User => "user",
        })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        })
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Access::Own => "own",
            Access::Any => "any",
        })
    }
}

/// Permission
///
/// A single grant, reached by a user through one of their roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Permission {
    pub entity: Entity,
    pub action: Action,
    pub access: Access,
}

impl Permission {
    pub fn new(entity: Entity, action: Action, access: Access) -> Self {
        Self { entity, action, access }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.entity, self.action, self.access)
    }
}

/// PermissionString
///
/// A permission requirement in the form `entity:action[:access[,access]]`, e.g.
/// `note:delete:own,any`. An empty access list matches every scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionString {
    pub entity: Entity,
    pub action: Action,
    pub access: Vec<Access>,
}

impl PermissionString {
    pub fn new(entity: Entity, action: Action, access: Vec<Access>) -> Self {
        Self { entity, action, access }
    }

    fn admits(&self, permission: &Permission) -> bool {
        permission.entity == self.entity
            && permission.action == self.action
            && (self.access.is_empty() || self.access.contains(&permission.access))
    }
}

impl FromStr for PermissionString {
    type Err = PermissionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let (Some(entity), Some(action)) = (parts.next(), parts.next()) else {
            return Err(PermissionParseError::Malformed(s.to_string()));
        };
        let access = match parts.next() {
            Some(list) => list
                .split(',')
                .map(str::parse)
                .collect::<Result<Vec<Access>, _>>()?,
            None => Vec::new(),
        };
        if parts.next().is_some() {
            return Err(PermissionParseError::Malformed(s.to_string()));
        }
        Ok(Self {
            entity: entity.parse()?,
            action: action.parse()?,
            access,
        })
    }
}

impl fmt::Display for PermissionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity, self.action)?;
        if !self.access.is_empty() {
            let scopes: Vec<String> = self.access.iter().map(Access::to_string).collect();
            write!(f, ":{}", scopes.join(","))?;
        }
        Ok(())
    }
}

/// user_has_permission
///
/// True when the user holds at least one grant admitted by `required`. An anonymous
/// viewer never has a permission.
pub fn user_has_permission(
    user: Option<&UserWithPermissions>,
    required: &PermissionString,
) -> bool {
    let Some(user) = user else {
        return false;
    };
    user.permissions.iter().any(|p| required.admits(p))
}

/// required_permission
///
/// The requirement for performing `action` on an `entity` owned by `owner_id`:
/// owners are satisfied by either scope, everybody else needs `any`.
pub fn required_permission(
    user_id: Uuid,
    entity: Entity,
    action: Action,
    owner_id: Uuid,
) -> PermissionString {
    let access = if user_id == owner_id {
        vec![Access::Own, Access::Any]
    } else {
        vec![Access::Any]
    };
    PermissionString::new(entity, action, access)
}

/// user_can
///
/// The capability predicate shared by every route. Used for UI affordances.
pub fn user_can(
    user: Option<&UserWithPermissions>,
    entity: Entity,
    action: Action,
    owner_id: Uuid,
) -> bool {
    match user {
        Some(u) => user_has_permission(Some(u), &required_permission(u.id, entity, action, owner_id)),
        None => false,
    }
}

/// require_user_with_permission
///
/// Authoritative form of [`user_has_permission`]: fails with a 403 naming only the
/// `entity:action` pair, never which scope was missing.
pub fn require_user_with_permission(
    user: &UserWithPermissions,
    required: &PermissionString,
) -> Result<(), AppError> {
    if user_has_permission(Some(user), required) {
        return Ok(());
    }
    tracing::warn!(
        user_id = %user.id,
        required = %required,
        "permission check failed"
    );
    Err(AppError::Forbidden {
        required: format!("{}:{}", required.entity, required.action),
    })
}

/// Authoritative form of [`user_can`], used right before a mutation.
pub fn require_user_can(
    user: &UserWithPermissions,
    entity: Entity,
    action: Action,
    owner_id: Uuid,
) -> Result<(), AppError> {
    require_user_with_permission(user, &required_permission(user.id, entity, action, owner_id))
}
