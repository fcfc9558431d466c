//! Token Issuer
//!
//! Stateless HS256 access/refresh token pairs. The two kinds are signed with
//! different secrets, so one can never be presented in place of the other.

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::models::{TokenClaims, TokenPair, UserId};

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

/// Signing keys and lifetime for one kind of token
struct SigningKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl SigningKeys {
    fn new(secret: &str, lifetime_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: Duration::seconds(lifetime_secs),
        }
    }

    fn sign(&self, user_id: UserId, email: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: user_id,
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(token)
    }

    fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        let token_data = decode::<TokenClaims>(token, &self.decoding_key, &validation)?;
        Ok(token_data.claims)
    }
}

/// Issues and verifies token pairs
pub struct TokenIssuer {
    access: SigningKeys,
    refresh: SigningKeys,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access: SigningKeys::new(&config.access_token_secret, config.access_token_expiration),
            refresh: SigningKeys::new(
                &config.refresh_token_secret,
                config.refresh_token_expiration,
            ),
        }
    }

    /// Issue a fresh access/refresh pair bound to a user
    pub fn issue_pair(&self, user_id: UserId, email: &str) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.access.sign(user_id, email)?,
            refresh_token: self.refresh.sign(user_id, email)?,
        })
    }

    /// Verify a refresh token and return its claims
    ///
    /// Fails with [`AuthError::InvalidToken`] on a bad signature, an expired
    /// token or malformed input.
    pub fn verify_refresh(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.refresh.verify(token)
    }

    /// Verify an access token and return its claims
    pub fn verify_access(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.access.verify(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&AuthConfig::default())
    }

    #[test]
    fn test_issue_and_verify_refresh() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();

        let pair = issuer.issue_pair(user_id, "test@example.com").unwrap();
        let claims = issuer.verify_refresh(&pair.refresh_token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "test@example.com");
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn test_access_token_lifetime() {
        let issuer = issuer();

        let pair = issuer.issue_pair(Uuid::new_v4(), "test@example.com").unwrap();
        let claims = issuer.verify_access(&pair.access_token).unwrap();

        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn test_tokens_are_not_interchangeable() {
        let issuer = issuer();
        let pair = issuer.issue_pair(Uuid::new_v4(), "test@example.com").unwrap();

        assert_eq!(
            issuer.verify_refresh(&pair.access_token).unwrap_err(),
            AuthError::InvalidToken
        );
        assert_eq!(
            issuer.verify_access(&pair.refresh_token).unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[test]
    fn test_each_pair_is_unique() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();

        let first = issuer.issue_pair(user_id, "test@example.com").unwrap();
        let second = issuer.issue_pair(user_id, "test@example.com").unwrap();

        assert_ne!(first, second);
        assert_ok!(issuer.verify_refresh(&first.refresh_token));
        assert_ok!(issuer.verify_refresh(&second.refresh_token));
    }

    #[test]
    fn test_expired_refresh_token_is_rejected() {
        let config = AuthConfig {
            refresh_token_expiration: -10,
            ..AuthConfig::default()
        };
        let issuer = TokenIssuer::new(&config);

        let pair = issuer.issue_pair(Uuid::new_v4(), "test@example.com").unwrap();

        assert_eq!(
            issuer.verify_refresh(&pair.refresh_token).unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[test]
    fn test_foreign_secret_is_rejected() {
        let other = TokenIssuer::new(&AuthConfig {
            refresh_token_secret: "another-refresh-secret-that-is-long-enough".to_string(),
            ..AuthConfig::default()
        });
        let pair = other.issue_pair(Uuid::new_v4(), "test@example.com").unwrap();

        assert_err!(issuer().verify_refresh(&pair.refresh_token));
    }

    #[test]
    fn test_malformed_token_is_rejected() {
        assert_err!(issuer().verify_refresh("not.a.jwt"));
        assert_err!(issuer().verify_refresh(""));
    }
}
