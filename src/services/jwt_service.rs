use crate::{
    config::AuthConfig,
    error::{ApiError, Result},
    models::common::UserRole,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user_id)
    pub sub: String,
    /// Marketplace role
    pub role: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

pub struct JWTService {
    config: Arc<AuthConfig>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JWTService {
    pub fn new(config: Arc<AuthConfig>) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Generate a JWT access token for a user.
    ///
    /// Tokens are issued by the marketplace's identity service; this is used by tooling and tests.
    pub fn generate_token(&self, user_id: Uuid, role: UserRole) -> Result<String> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let exp = now + (self.config.access_token_expiration_minutes as i64 * 60);

        let claims = Claims {
            sub: user_id.to_string(),
            role: role.as_str().to_string(),
            iat: now,
            exp,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(e.into()))?;

        Ok(token)
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => ApiError::ExpiredToken,
                _ => ApiError::InvalidToken(e.to_string()),
            })?;

        Ok(token_data.claims)
    }

    pub fn user_id_from_claims(claims: &Claims) -> Result<Uuid> {
        Uuid::parse_str(&claims.sub)
            .map_err(|e| ApiError::InvalidToken(format!("Invalid user_id: {}", e)))
    }

    pub fn role_from_claims(claims: &Claims) -> Result<UserRole> {
        UserRole::from_str(&claims.role)
            .ok_or_else(|| ApiError::InvalidToken(format!("Invalid role: {}", claims.role)))
    }
}
