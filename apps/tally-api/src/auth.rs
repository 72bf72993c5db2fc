//! JWT authentication module.
//!
//! Tokens are issued by the identity service; this module validates them and
//! turns the claims into the [`Actor`] every service call needs.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;
use tally_core::Actor;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    /// Display name, copied onto till shifts
    pub name: String,

    pub is_active: bool,

    /// Administrator
    pub is_superuser: bool,

    /// Read-only access to every report
    #[serde(default)]
    pub is_auditor: bool,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,
}

impl From<Claims> for Actor {
    fn from(claims: Claims) -> Self {
        Actor {
            user_id: claims.sub,
            name: claims.name,
            is_active: claims.is_active,
            is_superuser: claims.is_superuser,
            is_auditor: claims.is_auditor,
        }
    }
}

/// HS256 token validator.
#[derive(Clone)]
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager").finish_non_exhaustive()
    }
}

impl JwtManager {
    pub fn new(secret: &str) -> Self {
        JwtManager {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Signs a token for `actor`. Used by tests and local tooling.
    pub fn generate_token(&self, actor: &Actor, lifetime_secs: i64) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: actor.user_id.clone(),
            name: actor.name.clone(),
            is_active: actor.is_active,
            is_superuser: actor.is_superuser,
            is_auditor: actor.is_auditor,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(lifetime_secs)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| ApiError::unauthenticated(format!("Invalid token: {}", e)))
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Actor);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthenticated("Missing Authorization header"))?;

        let token = extract_bearer_token(header)
            .ok_or_else(|| ApiError::unauthenticated("Invalid Authorization format"))?;

        let claims = state.jwt.validate_token(token)?;
        Ok(CurrentUser(claims.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip() {
        let manager = JwtManager::new("test-secret");
        let auditor = Actor {
            is_auditor: true,
            ..Actor::cashier("u-7", "Audit")
        };

        let token = manager.generate_token(&auditor, 3600).unwrap();
        let actor: Actor = manager.validate_token(&token).unwrap().into();

        assert_eq!(actor.user_id, "u-7");
        assert_eq!(actor.name, "Audit");
        assert!(actor.is_auditor);
        assert!(!actor.is_superuser);
    }

    #[test]
    fn test_wrong_secret_and_expired() {
        let token = JwtManager::new("one")
            .generate_token(&Actor::cashier("u1", "Ann"), 3600)
            .unwrap();
        assert!(JwtManager::new("two").validate_token(&token).is_err());

        let manager = JwtManager::new("one");
        let expired = manager
            .generate_token(&Actor::cashier("u1", "Ann"), -3600)
            .unwrap();
        assert!(manager.validate_token(&expired).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }
}
