//! Rate limiting middleware using Redis
//!
//! Sliding-window counter per user, with the limit picked by the caller's role.

use crate::{
    config::RateLimitConfig,
    error::{ApiError, Result},
    middleware::jwt_auth::UserIdentity,
    models::common::UserRole,
};
use axum::{extract::Request, middleware::Next, response::Response};
use redis::{AsyncCommands, Client};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, warn};

/// Requests allowed per window for a role
pub fn limit_for(config: &RateLimitConfig, role: UserRole) -> u32 {
    match role {
        UserRole::User => config.user_rpm,
        UserRole::Consultant => config.consultant_rpm,
        UserRole::Admin => config.admin_rpm,
    }
}

/// Rate limiting middleware
///
/// Returns 429 Too Many Requests when the caller's limit is exceeded.
pub fn rate_limit_middleware(
    redis_client: Arc<Client>,
    config: RateLimitConfig,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response>> + Send>>
       + Clone {
    move |request: Request, next: Next| {
        let redis_client = redis_client.clone();
        let config = config.clone();

        Box::pin(async move {
            // Set by jwt_auth_middleware
            let identity = request
                .extensions()
                .get::<UserIdentity>()
                .cloned()
                .ok_or_else(|| {
                    ApiError::Internal(anyhow::anyhow!(
                        "Rate limit middleware requires jwt_auth_middleware"
                    ))
                })?;

            let limit = limit_for(&config, identity.role);

            let allowed = check_rate_limit(
                &redis_client,
                &identity.user_id.to_string(),
                limit,
                config.window_seconds,
            )
            .await?;

            if !allowed {
                warn!(
                    user_id = %identity.user_id,
                    role = identity.role.as_str(),
                    limit,
                    "Rate limit exceeded"
                );
                return Err(ApiError::RateLimitExceeded);
            }

            debug!(user_id = %identity.user_id, "Rate limit check passed");

            Ok(next.run(request).await)
        })
    }
}

/// Check rate limit using Redis sliding window counter
///
/// Returns true if request is allowed, false if rate limit exceeded.
async fn check_rate_limit(
    redis_client: &Client,
    user_id: &str,
    limit: u32,
    window_seconds: u32,
) -> Result<bool> {
    let mut conn = redis_client
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Redis connection failed: {}", e)))?;

    let now = OffsetDateTime::now_utc().unix_timestamp();
    let key = format!("rate_limit:user:{}", user_id);
    let window_start = now - i64::from(window_seconds);

    // Sorted set scored by request timestamp; drop entries outside the window
    let _: () = conn
        .zrembyscore(&key, 0, window_start as f64)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Redis ZREMRANGEBYSCORE failed: {}", e)))?;

    let count: u32 = conn
        .zcard(&key)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Redis ZCARD failed: {}", e)))?;

    if count >= limit {
        return Ok(false);
    }

    let member = format!("{}:{}", now, uuid::Uuid::new_v4());
    let _: () = conn
        .zadd(&key, member, now as f64)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Redis ZADD failed: {}", e)))?;

    // Window plus a small buffer
    let _: () = conn
        .expire(&key, i64::from(window_seconds) + 10)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Redis EXPIRE failed: {}", e)))?;

    Ok(true)
}

/// Create rate limit middleware from the `rate_limit` config section
pub fn create_rate_limiter(
    redis_client: Arc<Client>,
    config: &RateLimitConfig,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response>> + Send>>
       + Clone {
    rate_limit_middleware(redis_client, config.clone())
}
