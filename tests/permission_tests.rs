mod common;

use axum::{http::StatusCode, response::IntoResponse};
use common::{delete_note_any, delete_note_own, with_permissions};
use notes_portal::{
    AppError,
    permissions::{
        Access, Action, Entity, Permission, PermissionParseError, PermissionString,
        require_user_can, require_user_with_permission, required_permission, user_can,
        user_has_permission,
    },
};
use uuid::Uuid;

const OWNER: Uuid = Uuid::from_u128(1);
const OTHER: Uuid = Uuid::from_u128(2);

#[test]
fn test_parse_permission_string() {
    let parsed: PermissionString = "note:delete:own,any".parse().unwrap();
    assert_eq!(parsed.entity, Entity::Note);
    assert_eq!(parsed.action, Action::Delete);
    assert_eq!(parsed.access, vec![Access::Own, Access::Any]);
    assert_eq!(parsed.to_string(), "note:delete:own,any");

    let no_scope: PermissionString = "user:read".parse().unwrap();
    assert!(no_scope.access.is_empty());
    assert_eq!(no_scope.to_string(), "user:read");
}

#[test]
fn test_parse_permission_string_rejects_unknown_tags() {
    assert_eq!(
        "comment:delete:own".parse::<PermissionString>(),
        Err(PermissionParseError::Entity("comment".to_string()))
    );
    assert_eq!(
        "note:archive".parse::<PermissionString>(),
        Err(PermissionParseError::Action("archive".to_string()))
    );
    assert_eq!(
        "note:delete:mine".parse::<PermissionString>(),
        Err(PermissionParseError::Access("mine".to_string()))
    );
    assert!(matches!(
        "note".parse::<PermissionString>(),
        Err(PermissionParseError::Malformed(_))
    ));
    assert!(matches!(
        "note:delete:own:extra".parse::<PermissionString>(),
        Err(PermissionParseError::Malformed(_))
    ));
}

#[test]
fn test_permission_display() {
    assert_eq!(delete_note_own().to_string(), "note:delete:own");
}

#[test]
fn test_user_has_permission_matches_scope_list() {
    let user = with_permissions(OTHER, vec![delete_note_own()]);
    assert!(user_has_permission(Some(&user), &"note:delete:own,any".parse().unwrap()));
    assert!(user_has_permission(Some(&user), &"note:delete".parse().unwrap()));
    assert!(!user_has_permission(Some(&user), &"note:delete:any".parse().unwrap()));
    assert!(!user_has_permission(Some(&user), &"note:update".parse().unwrap()));
}

#[test]
fn test_required_permission_depends_on_ownership() {
    assert_eq!(
        required_permission(OWNER, Entity::Note, Action::Delete, OWNER).to_string(),
        "note:delete:own,any"
    );
    assert_eq!(
        required_permission(OTHER, Entity::Note, Action::Delete, OWNER).to_string(),
        "note:delete:any"
    );
}

#[test]
fn test_can_delete_truth_table() {
    // (viewer id, grants, expected) for a note owned by OWNER.
    let cases: Vec<(Uuid, Vec<Permission>, bool)> = vec![
        (OWNER, vec![], false),
        (OWNER, vec![delete_note_own()], true),
        (OWNER, vec![delete_note_any()], true),
        (OTHER, vec![], false),
        (OTHER, vec![delete_note_own()], false),
        (OTHER, vec![delete_note_any()], true),
        (OTHER, vec![delete_note_own(), delete_note_any()], true),
        (
            OWNER,
            vec![
                Permission::new(Entity::Note, Action::Update, Access::Any),
                Permission::new(Entity::User, Action::Delete, Access::Own),
            ],
            false,
        ),
    ];

    for (viewer, grants, expected) in cases {
        let user = with_permissions(viewer, grants.clone());
        assert_eq!(
            user_can(Some(&user), Entity::Note, Action::Delete, OWNER),
            expected,
            "viewer={viewer} grants={grants:?}"
        );
        assert_eq!(
            require_user_can(&user, Entity::Note, Action::Delete, OWNER).is_ok(),
            expected
        );
    }
}

#[test]
fn test_anonymous_never_can_delete() {
    assert!(!user_can(None, Entity::Note, Action::Delete, OWNER));
    assert!(!user_has_permission(None, &"note:delete".parse().unwrap()));
}

#[tokio::test]
async fn test_forbidden_error_payload_hides_scope() {
    let user = with_permissions(OTHER, vec![delete_note_own()]);
    let err = require_user_with_permission(&user, &"note:delete:any".parse().unwrap())
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden { .. }));

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "Unauthorized");
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("note:delete"));
    assert!(!message.contains("any"));
}
