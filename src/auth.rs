//! Bearer-token authentication.
//!
//! Tokens are minted by the identity provider and signed with a shared HS256
//! secret; this service only verifies them. Route handlers opt in by taking
//! one of the extractors below:
//!
//! - [`AuthUser`] - any valid token
//! - [`MaybeUser`] - a valid token when one is sent, otherwise anonymous
//! - [`Customer`] - a valid token whose subject is not currently banned
//! - [`Staff`] - a valid token with the `staff` or `admin` role

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::db::{self, RepositoryError};
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("staff access required")]
    Forbidden,
    #[error("account suspended")]
    Suspended,
    #[error("ban lookup failed: {0}")]
    Repository(#[from] RepositoryError),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Staff,
    Admin,
}

impl Role {
    pub fn is_staff(self) -> bool { matches!(self, Self::Staff | Self::Admin) }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
    pub exp: usize,
}

/// Verifies identity-provider tokens.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &SecretString) -> Self {
        Self { key: DecodingKey::from_secret(secret.expose_secret().as_bytes()), validation: Validation::new(Algorithm::HS256) }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        Ok(decode::<Claims>(token, &self.key, &self.validation)?.claims)
    }
}

/// The caller identified by a verified token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(c: Claims) -> Self { Self { id: c.sub, email: c.email, role: c.role } }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::MissingToken)?;
        let claims = state.tokens.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            e
        })?;
        Ok(claims.into())
    }
}

/// Anonymous when no token is sent; a bad token is still rejected.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthUser>);

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if bearer_token(parts).is_none() {
            return Ok(Self(None));
        }
        AuthUser::from_request_parts(parts, state).await.map(|u| Self(Some(u)))
    }
}

/// A signed-in customer without an active ban.
#[derive(Debug, Clone)]
pub struct Customer(pub AuthUser);

#[axum::async_trait]
impl FromRequestParts<AppState> for Customer {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if let Some(ban) = db::bans::active(&state.db, user.id).await.map_err(AuthError::from)? {
            tracing::info!(customer_id = %user.id, ban_id = %ban.id, "Suspended customer rejected");
            return Err(AuthError::Suspended.into());
        }
        Ok(Self(user))
    }
}

#[derive(Debug, Clone)]
pub struct Staff(pub AuthUser);

#[axum::async_trait]
impl FromRequestParts<AppState> for Staff {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.role.is_staff() {
            return Err(AuthError::Forbidden.into());
        }
        Ok(Self(user))
    }
}
