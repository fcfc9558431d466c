//! User Accounts
//!
//! In-process user account service providing:
//! - User registration with Argon2id password hashing
//! - Email/password login
//! - Stateless JWT access and refresh token pairs
//! - Password changes
//! - A bearer-token access guard with pluggable verifiers
//!
//! Records live in memory only and are lost on restart.
//!
//! # Configuration
//!
//! Configuration is loaded from environment variables, see [`AuthConfig`]:
//! - `JWT_SECRET` - Access token signing secret (development fallback if unset)
//! - `JWT_REFRESH_SECRET` - Refresh token signing secret (development fallback if unset)
//! - `JWT_ACCESS_EXPIRATION` - Access token lifetime in seconds (default: 900)
//! - `JWT_REFRESH_EXPIRATION` - Refresh token lifetime in seconds (default: 604800)
//! - `AUTH_GUARD_MODE` - `mock` (default) or `jwt`
//!
//! # Usage
//!
//! ```rust,ignore
//! use user_accounts::{Accounts, AuthConfig};
//!
//! let accounts = Accounts::new(AuthConfig::from_env())?;
//! let response = accounts.auth_service().login(login_request).await?;
//!
//! let app = accounts.routes();
//! ```

pub mod config;
pub mod error;
pub mod extractors;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod password;
pub mod service;
pub mod store;
pub mod token;

// Re-export commonly used types
pub use config::{AuthConfig, GuardMode};
pub use error::AuthError;
pub use guard::{AccessGuard, CredentialVerifier, JwtVerifier, MockVerifier};
pub use handlers::AuthState;
pub use models::*;
pub use service::AuthService;
pub use store::UserStore;
pub use token::TokenIssuer;

use axum::Router;
use std::sync::Arc;

/// Auth service and access guard built from one configuration
#[derive(Clone)]
pub struct Accounts {
    auth_service: Arc<AuthService>,
    guard: AccessGuard,
}

impl Accounts {
    /// Validate the configuration and build all components
    pub fn new(config: AuthConfig) -> Result<Self, AuthError> {
        let auth_service = Arc::new(AuthService::from_config(&config)?);
        let guard = AccessGuard::from_config(&config, auth_service.tokens().clone());

        tracing::info!(guard_mode = ?config.guard_mode, "User accounts initialized");

        Ok(Self {
            auth_service,
            guard,
        })
    }

    pub fn auth_service(&self) -> Arc<AuthService> {
        self.auth_service.clone()
    }

    pub fn guard(&self) -> AccessGuard {
        self.guard.clone()
    }

    /// Router with all account endpoints
    pub fn routes(&self) -> Router {
        create_routes(self.auth_service.clone(), self.guard.clone())
    }
}

/// Create account routes
pub fn create_routes(auth_service: Arc<AuthService>, guard: AccessGuard) -> Router {
    handlers::create_routes(auth_service, guard)
}
