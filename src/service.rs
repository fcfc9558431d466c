//! Authentication Service
//!
//! Signup, login, token refresh and password change flows over the user
//! store and the token issuer.

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::models::*;
use crate::store::{parse_user_id, UserStore};
use crate::token::TokenIssuer;

use std::sync::Arc;

const SIGNUP_FAILED: &str = "Signup failed";
const INVALID_CREDENTIALS: &str = "Invalid credentials";
const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";

/// Authentication service
pub struct AuthService {
    store: Arc<UserStore>,
    tokens: Arc<TokenIssuer>,
}

impl AuthService {
    pub fn new(store: Arc<UserStore>, tokens: Arc<TokenIssuer>) -> Self {
        Self { store, tokens }
    }

    /// Build the store and token issuer from a validated configuration
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        config.validate()?;

        if config.uses_development_secrets() {
            tracing::warn!("Using development token secrets; set JWT_SECRET and JWT_REFRESH_SECRET");
        }

        Ok(Self::new(
            Arc::new(UserStore::new(config)?),
            Arc::new(TokenIssuer::new(config)),
        ))
    }

    pub fn store(&self) -> &Arc<UserStore> {
        &self.store
    }

    pub fn tokens(&self) -> &Arc<TokenIssuer> {
        &self.tokens
    }

    // ============================================
    // Signup
    // ============================================

    /// Register a new user and issue their first token pair
    ///
    /// A duplicate email surfaces as [`AuthError::Conflict`]; any other
    /// failure is reported as `Unauthorized("Signup failed")`.
    pub async fn signup(&self, req: SignupRequest) -> Result<AuthResponse, AuthError> {
        self.try_signup(req).await.map_err(signup_failure)
    }

    async fn try_signup(&self, req: SignupRequest) -> Result<AuthResponse, AuthError> {
        let (profile, password) = req.into_parts();
        let user = self.store.create(profile, &password).await?;
        let tokens = self.tokens.issue_pair(user.id, &user.email)?;

        tracing::info!(user_id = %user.id, email = %user.email, "User signed up");

        Ok(AuthResponse::new(user, tokens))
    }

    // ============================================
    // Login
    // ============================================

    /// Authenticate by email and password
    ///
    /// Unknown email and wrong password fail with the same message and the
    /// same hashing cost.
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, AuthError> {
        let record = match self.store.find_by_email_with_secret(&req.email).await {
            Some(record) => record,
            None => {
                self.store.verify_missing_secret(&req.password).await?;
                tracing::warn!("Login failed");
                return Err(AuthError::unauthorized(INVALID_CREDENTIALS));
            }
        };

        if !self.store.verify_secret(&record, &req.password).await? {
            tracing::warn!(user_id = %record.id, "Login failed");
            return Err(AuthError::unauthorized(INVALID_CREDENTIALS));
        }

        let tokens = self.tokens.issue_pair(record.id, &record.email)?;

        tracing::info!(user_id = %record.id, "User logged in");

        Ok(AuthResponse::new(User::from(record), tokens))
    }

    // ============================================
    // Token Refresh
    // ============================================

    /// Exchange a refresh token for a fresh pair
    ///
    /// The presented token stays valid. Every failure, including a subject
    /// deleted since issuance, is reported as `Unauthorized("Invalid refresh
    /// token")`.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse, AuthError> {
        self.try_refresh(refresh_token).await.map_err(refresh_failure)
    }

    async fn try_refresh(&self, refresh_token: &str) -> Result<AuthResponse, AuthError> {
        let claims = self.tokens.verify_refresh(refresh_token)?;
        let user = self.store.find_by_id(claims.sub).await?;
        let tokens = self.tokens.issue_pair(user.id, &user.email)?;

        tracing::info!(user_id = %user.id, "Tokens refreshed");

        Ok(AuthResponse::new(user, tokens))
    }

    // ============================================
    // Password Management
    // ============================================

    /// Change password after verifying the current one
    ///
    /// The user is named by `req.user_id`; an id that is not a UUID is
    /// [`AuthError::NotFound`].
    pub async fn change_password(
        &self,
        req: ChangePasswordRequest,
    ) -> Result<MessageResponse, AuthError> {
        let user_id = parse_user_id(&req.user_id)?;

        self.store
            .change_secret(user_id, &req.current_password, &req.new_password)
            .await?;

        tracing::info!(user_id = %user_id, "Password changed");

        Ok(MessageResponse::new("Password changed successfully"))
    }
}

/// Conflict passes through; everything else becomes "Signup failed"
fn signup_failure(err: AuthError) -> AuthError {
    match err {
        AuthError::Conflict => AuthError::Conflict,
        other => {
            tracing::warn!(error = ?other, "Signup failed");
            AuthError::unauthorized(SIGNUP_FAILED)
        }
    }
}

fn refresh_failure(err: AuthError) -> AuthError {
    tracing::warn!(error = ?err, "Refresh rejected");
    AuthError::unauthorized(INVALID_REFRESH_TOKEN)
}
