use axum::{extract::FromRequestParts, http::Request};
use ledgerguard::{
    middleware::{AdminIdentity, UserIdentity},
    models::common::UserRole,
    ApiError,
};
use uuid::Uuid;

fn parts_with(identity: Option<UserIdentity>) -> axum::http::request::Parts {
    let (mut parts, _) = Request::builder()
        .uri("/api/v1/admin/campaign-templates")
        .body(())
        .unwrap()
        .into_parts();
    if let Some(identity) = identity {
        parts.extensions.insert(identity);
    }
    parts
}

#[tokio::test]
async fn test_user_identity_requires_auth_middleware() {
    let mut parts = parts_with(None);
    let result = UserIdentity::from_request_parts(&mut parts, &()).await;
    assert!(matches!(result, Err(ApiError::Unauthorized(_))));
}

#[tokio::test]
async fn test_admin_identity_accepts_admins() {
    let user_id = Uuid::new_v4();
    let mut parts = parts_with(Some(UserIdentity {
        user_id,
        role: UserRole::Admin,
    }));

    let AdminIdentity(identity) = AdminIdentity::from_request_parts(&mut parts, &())
        .await
        .unwrap();
    assert_eq!(identity.user_id, user_id);
}

#[tokio::test]
async fn test_admin_identity_forbids_other_roles() {
    for role in [UserRole::User, UserRole::Consultant] {
        let mut parts = parts_with(Some(UserIdentity {
            user_id: Uuid::new_v4(),
            role,
        }));

        let result = AdminIdentity::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(ApiError::Forbidden(_))));
    }
}

#[test]
fn test_role_parsing() {
    assert_eq!(UserRole::from_str("Admin"), Some(UserRole::Admin));
    assert_eq!(UserRole::from_str("consultant"), Some(UserRole::Consultant));
    assert_eq!(UserRole::from_str("root"), None);
    assert!(UserRole::Admin.is_admin());
    assert!(!UserRole::User.is_admin());
}
