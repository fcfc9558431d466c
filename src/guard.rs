//! Access Guard
//!
//! Per-request bearer credential check. Header parsing lives here; deciding
//! whether a token is acceptable is delegated to a [`CredentialVerifier`], so
//! the development mock and the real JWT check are interchangeable.

use crate::config::{AuthConfig, GuardMode};
use crate::error::AuthError;
use crate::models::AuthenticatedIdentity;
use crate::token::TokenIssuer;

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

const BEARER_PREFIX: &str = "Bearer ";

/// Decides whether a bearer token identifies a caller
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// `token` has already had the `Bearer ` prefix stripped and been trimmed
    async fn verify(&self, token: &str) -> Result<AuthenticatedIdentity, AuthError>;
}

/// Development stand-in that accepts one fixed credential
///
/// Known deviation from secure design: an empty token is accepted as well, so
/// a bare `"Bearer "` header authenticates as the mock user. Never select this
/// verifier outside development.
pub struct MockVerifier;

impl MockVerifier {
    pub const TOKEN: &'static str = "faketoken_user1";
    pub const USER_ID: &'static str = "user1";
    pub const USER_EMAIL: &'static str = "user@example.com";
}

#[async_trait]
impl CredentialVerifier for MockVerifier {
    async fn verify(&self, token: &str) -> Result<AuthenticatedIdentity, AuthError> {
        if token.is_empty() || token == Self::TOKEN {
            return Ok(AuthenticatedIdentity {
                id: Self::USER_ID.to_string(),
                email: Self::USER_EMAIL.to_string(),
            });
        }

        Err(AuthError::unauthorized("Invalid token"))
    }
}

/// Accepts access tokens issued by [`TokenIssuer`]
pub struct JwtVerifier {
    issuer: Arc<TokenIssuer>,
}

impl JwtVerifier {
    pub fn new(issuer: Arc<TokenIssuer>) -> Self {
        Self { issuer }
    }
}

#[async_trait]
impl CredentialVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<AuthenticatedIdentity, AuthError> {
        let claims = self.issuer.verify_access(token).map_err(|e| {
            tracing::debug!("Access token rejected: {:?}", e);
            AuthError::unauthorized("Invalid token")
        })?;

        Ok(AuthenticatedIdentity {
            id: claims.sub.to_string(),
            email: claims.email,
        })
    }
}

/// Bearer-header gate in front of protected routes
#[derive(Clone)]
pub struct AccessGuard {
    verifier: Arc<dyn CredentialVerifier>,
}

impl AccessGuard {
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { verifier }
    }

    /// Pick the verifier named by `config.guard_mode`
    pub fn from_config(config: &AuthConfig, issuer: Arc<TokenIssuer>) -> Self {
        match config.guard_mode {
            GuardMode::Mock => {
                tracing::warn!("Access guard is using the mock verifier");
                Self::new(Arc::new(MockVerifier))
            }
            GuardMode::Jwt => Self::new(Arc::new(JwtVerifier::new(issuer))),
        }
    }

    /// Authorize a request from its raw `Authorization` header value
    pub async fn authorize(
        &self,
        auth_header: Option<&str>,
    ) -> Result<AuthenticatedIdentity, AuthError> {
        let token = auth_header
            .and_then(|header| header.strip_prefix(BEARER_PREFIX))
            .ok_or_else(|| AuthError::unauthorized("Missing or invalid authorization header"))?;

        self.verifier.verify(token.trim()).await
    }
}

/// Require an authorized caller
///
/// Stores the [`AuthenticatedIdentity`] in request extensions for extractors.
pub async fn require_auth(
    State(guard): State<AccessGuard>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    let identity = guard.authorize(auth_header).await?;

    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}
