use crate::{
    app_state::AppState,
    error::{ApiError, Result},
    models::common::UserRole,
    services::jwt_service::JWTService,
};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Request extension storing verified user identity from JWT
#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub user_id: Uuid,
    pub role: UserRole,
}

/// Identity of a caller whose token carries the admin role
#[derive(Debug, Clone)]
pub struct AdminIdentity(pub UserIdentity);

/// JWT authentication middleware
///
/// Extracts the Authorization header, validates the JWT access token,
/// and stores the verified user identity in request extensions.
///
/// Returns 401 Unauthorized if the header is missing or token validation fails.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let headers = request.headers();

    let auth_header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    // Parse "Bearer <token>" format
    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        ApiError::InvalidToken(
            "Invalid Authorization format, expected 'Bearer <token>'".to_string(),
        )
    })?;

    let claims = state.jwt_service.validate_token(token)?;

    let identity = UserIdentity {
        user_id: JWTService::user_id_from_claims(&claims)?,
        role: JWTService::role_from_claims(&claims)?,
    };

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Axum extractor for user identity
///
/// Only works on routes protected by jwt_auth_middleware.
impl<S> FromRequestParts<S> for UserIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UserIdentity>()
            .cloned()
            .ok_or_else(|| {
                ApiError::Unauthorized(
                    "User identity not found - route must be protected by jwt_auth_middleware"
                        .to_string(),
                )
            })
    }
}

/// Rejects authenticated callers that are not admins with 403
impl<S> FromRequestParts<S> for AdminIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let identity = UserIdentity::from_request_parts(parts, state).await?;

        if !identity.role.is_admin() {
            tracing::warn!(
                user_id = %identity.user_id,
                role = identity.role.as_str(),
                "Non-admin caller on admin route"
            );
            return Err(ApiError::Forbidden(
                "Admin role required for this operation".to_string(),
            ));
        }

        Ok(AdminIdentity(identity))
    }
}
