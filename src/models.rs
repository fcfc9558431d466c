//! Accounts Models
//!
//! Stored user records, their password-free projections, request/response
//! DTOs and JWT claims.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// ============================================
// Stored Entities
// ============================================

/// User ID type
pub type UserId = Uuid;

/// Gender, one of a fixed three-value set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User record as held by the store, including the password hash
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub address: String,
    pub subscribe_to_newsletter: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile fields supplied at creation
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub address: String,
    pub subscribe_to_newsletter: bool,
}

// ============================================
// Request DTOs
// ============================================

/// Signup request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,

    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    pub date_of_birth: NaiveDate,

    pub gender: Gender,

    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,

    pub subscribe_to_newsletter: bool,
}

impl SignupRequest {
    /// Split into the stored profile and the plaintext password
    pub fn into_parts(self) -> (NewUser, String) {
        let profile = NewUser {
            email: self.email,
            name: self.name,
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            address: self.address,
            subscribe_to_newsletter: self.subscribe_to_newsletter,
        };
        (profile, self.password)
    }
}

/// Login request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Partial profile update. `None` means "leave as is"; no field can be cleared.
/// Fields outside this set, such as `email`, are rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Option<String>,
    pub subscribe_to_newsletter: Option<bool>,
}

/// Change password request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "User ID is required"))]
    pub user_id: String,

    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 6, message = "New password must be at least 6 characters long"))]
    pub new_password: String,
}

// ============================================
// Response DTOs
// ============================================

/// Public user data, never carries the password hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub address: String,
    pub subscribe_to_newsletter: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            email: record.email,
            name: record.name,
            date_of_birth: record.date_of_birth,
            gender: record.gender,
            address: record.address,
            subscribe_to_newsletter: record.subscribe_to_newsletter,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

impl From<&UserRecord> for User {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id,
            email: record.email.clone(),
            name: record.name.clone(),
            date_of_birth: record.date_of_birth,
            gender: record.gender,
            address: record.address.clone(),
            subscribe_to_newsletter: record.subscribe_to_newsletter,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Access and refresh tokens issued together
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signup, login and refresh response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

impl AuthResponse {
    pub fn new(user: User, tokens: TokenPair) -> Self {
        Self {
            user,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }
    }
}

/// Simple message response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Caller's own record with their calendar age
#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: User,
    pub age: i32,
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

// ============================================
// Identities and Claims
// ============================================

/// Caller identity attached to a request after access gating
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedIdentity {
    pub id: String,
    pub email: String,
}

/// JWT claims carried by both access and refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: UserId,
    /// User email
    pub email: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// JWT ID, unique per token
    pub jti: Uuid,
}
