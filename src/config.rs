//! Accounts Configuration
//!
//! Values are read from environment variables. Every secret has a fallback so
//! a local checkout runs out of the box; those fallbacks are for development
//! only and building the service from such a config logs a warning.

use crate::error::AuthError;
use std::env;

/// Fallback access-token signing secret. Development only.
pub const DEV_ACCESS_TOKEN_SECRET: &str = "dev-access-token-secret-do-not-use-in-production";

/// Fallback refresh-token signing secret. Development only.
pub const DEV_REFRESH_TOKEN_SECRET: &str = "dev-refresh-token-secret-do-not-use-in-production";

/// Which bearer-credential verifier guards protected routes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardMode {
    /// Fixed development credential, see [`crate::guard::MockVerifier`]
    Mock,
    /// Access tokens issued by [`crate::token::TokenIssuer`]
    Jwt,
}

impl GuardMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "mock" => Some(GuardMode::Mock),
            "jwt" => Some(GuardMode::Jwt),
            _ => None,
        }
    }
}

/// Accounts configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Secret for signing access tokens (from JWT_SECRET env var)
    pub access_token_secret: String,

    /// Secret for signing refresh tokens (from JWT_REFRESH_SECRET env var)
    pub refresh_token_secret: String,

    /// Access token lifetime in seconds (from JWT_ACCESS_EXPIRATION env var)
    pub access_token_expiration: i64,

    /// Refresh token lifetime in seconds (from JWT_REFRESH_EXPIRATION env var)
    pub refresh_token_expiration: i64,

    /// Argon2 memory cost in KiB (from ARGON2_MEMORY_COST env var)
    pub argon2_memory_cost: u32,

    /// Argon2 time cost (iterations) (from ARGON2_TIME_COST env var)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (from ARGON2_PARALLELISM env var)
    pub argon2_parallelism: u32,

    /// Bearer verifier for protected routes (from AUTH_GUARD_MODE env var)
    pub guard_mode: GuardMode,

    /// AUTH_GUARD_MODE value that named no known mode; rejected by `validate`
    pub unrecognized_guard_mode: Option<String>,
}

impl Default for AuthConfig {
    /// Development defaults, identical to `from_env` with nothing set.
    fn default() -> Self {
        Self {
            access_token_secret: DEV_ACCESS_TOKEN_SECRET.to_string(),
            refresh_token_secret: DEV_REFRESH_TOKEN_SECRET.to_string(),
            access_token_expiration: 900,     // 15 minutes
            refresh_token_expiration: 604800, // 7 days
            argon2_memory_cost: 65536,        // 64 MiB
            argon2_time_cost: 3,
            argon2_parallelism: 4,
            guard_mode: GuardMode::Mock,
            unrecognized_guard_mode: None,
        }
    }
}

impl AuthConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let (guard_mode, unrecognized_guard_mode) =
            guard_mode_from(env::var("AUTH_GUARD_MODE").ok(), defaults.guard_mode);

        Self {
            access_token_secret: secret_from_env("JWT_SECRET", defaults.access_token_secret),

            refresh_token_secret: secret_from_env(
                "JWT_REFRESH_SECRET",
                defaults.refresh_token_secret,
            ),

            access_token_expiration: parsed_from_env(
                "JWT_ACCESS_EXPIRATION",
                defaults.access_token_expiration,
            ),

            refresh_token_expiration: parsed_from_env(
                "JWT_REFRESH_EXPIRATION",
                defaults.refresh_token_expiration,
            ),

            argon2_memory_cost: parsed_from_env("ARGON2_MEMORY_COST", defaults.argon2_memory_cost),

            argon2_time_cost: parsed_from_env("ARGON2_TIME_COST", defaults.argon2_time_cost),

            argon2_parallelism: parsed_from_env("ARGON2_PARALLELISM", defaults.argon2_parallelism),

            guard_mode,

            unrecognized_guard_mode,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AuthError> {
        if let Some(value) = &self.unrecognized_guard_mode {
            return Err(AuthError::Config(format!(
                "AUTH_GUARD_MODE must be `mock` or `jwt`, got `{value}`"
            )));
        }

        if self.access_token_secret.len() < 32 {
            return Err(AuthError::Config(
                "JWT_SECRET must be at least 32 characters".to_string(),
            ));
        }

        if self.refresh_token_secret.len() < 32 {
            return Err(AuthError::Config(
                "JWT_REFRESH_SECRET must be at least 32 characters".to_string(),
            ));
        }

        // Refresh tokens must never verify as access tokens and vice versa.
        if self.access_token_secret == self.refresh_token_secret {
            return Err(AuthError::Config(
                "JWT_SECRET and JWT_REFRESH_SECRET must differ".to_string(),
            ));
        }

        if self.access_token_expiration <= 0 {
            return Err(AuthError::Config(
                "JWT_ACCESS_EXPIRATION must be positive".to_string(),
            ));
        }

        if self.refresh_token_expiration <= self.access_token_expiration {
            return Err(AuthError::Config(
                "JWT_REFRESH_EXPIRATION must be greater than JWT_ACCESS_EXPIRATION".to_string(),
            ));
        }

        argon2::Params::new(
            self.argon2_memory_cost,
            self.argon2_time_cost,
            self.argon2_parallelism,
            None,
        )
        .map_err(|e| AuthError::Config(format!("Invalid argon2 parameters: {e}")))?;

        Ok(())
    }

    /// Whether either signing secret is still a development fallback
    pub fn uses_development_secrets(&self) -> bool {
        self.access_token_secret == DEV_ACCESS_TOKEN_SECRET
            || self.refresh_token_secret == DEV_REFRESH_TOKEN_SECRET
    }

    /// Cheap hashing parameters so tests don't spend seconds in argon2
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self {
            argon2_memory_cost: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
            ..Self::default()
        }
    }
}

fn secret_from_env(key: &str, fallback: String) -> String {
    match env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => fallback,
    }
}

/// Unset or blank selects `fallback`. A value naming no mode is kept for
/// `validate` to reject and selects the JWT verifier in the meantime.
fn guard_mode_from(raw: Option<String>, fallback: GuardMode) -> (GuardMode, Option<String>) {
    match raw {
        Some(value) if !value.trim().is_empty() => match GuardMode::parse(&value) {
            Some(mode) => (mode, None),
            None => (GuardMode::Jwt, Some(value)),
        },
        _ => (fallback, None),
    }
}

fn parsed_from_env<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AuthConfig::default();

        assert!(config.validate().is_ok());
        assert!(config.uses_development_secrets());
        assert_eq!(config.access_token_expiration, 15 * 60);
        assert_eq!(config.refresh_token_expiration, 7 * 24 * 60 * 60);
        assert_eq!(config.guard_mode, GuardMode::Mock);
    }

    #[test]
    fn test_config_validation_short_secret() {
        let config = AuthConfig {
            access_token_secret: "short".to_string(),
            ..AuthConfig::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_shared_secret() {
        let config = AuthConfig {
            refresh_token_secret: DEV_ACCESS_TOKEN_SECRET.to_string(),
            ..AuthConfig::default()
        };

        assert!(matches!(config.validate(), Err(AuthError::Config(_))));
    }

    #[test]
    fn test_config_validation_lifetimes() {
        let config = AuthConfig {
            refresh_token_expiration: 900,
            ..AuthConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AuthConfig {
            access_token_expiration: 0,
            ..AuthConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_argon2_params() {
        let config = AuthConfig {
            argon2_memory_cost: 1,
            ..AuthConfig::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_guard_mode_parse() {
        assert_eq!(GuardMode::parse("mock"), Some(GuardMode::Mock));
        assert_eq!(GuardMode::parse(" JWT "), Some(GuardMode::Jwt));
        assert_eq!(GuardMode::parse("none"), None);
    }

    #[test]
    fn test_guard_mode_from_env_value() {
        assert_eq!(guard_mode_from(None, GuardMode::Mock), (GuardMode::Mock, None));
        assert_eq!(
            guard_mode_from(Some(" ".to_string()), GuardMode::Mock),
            (GuardMode::Mock, None)
        );
        assert_eq!(
            guard_mode_from(Some("jwt".to_string()), GuardMode::Mock),
            (GuardMode::Jwt, None)
        );
    }

    #[test]
    fn test_misspelled_guard_mode_is_rejected() {
        let (guard_mode, unrecognized_guard_mode) =
            guard_mode_from(Some("jwtt".to_string()), GuardMode::Mock);
        assert_eq!(guard_mode, GuardMode::Jwt);
        assert_eq!(unrecognized_guard_mode.as_deref(), Some("jwtt"));

        let config = AuthConfig {
            guard_mode,
            unrecognized_guard_mode,
            ..AuthConfig::default()
        };

        assert!(matches!(config.validate(), Err(AuthError::Config(msg)) if msg.contains("jwtt")));
    }
}
