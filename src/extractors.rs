//! Request Extractors
//!
//! Every rejection is reported through [`AuthError`] so clients always get the
//! same `{error, message}` body.

use crate::error::AuthError;
use crate::models::{AuthenticatedIdentity, UserId};
use crate::store::parse_user_id;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// Reads the identity that [`crate::guard::require_auth`] placed in request
/// extensions. Rejects routes that are not behind the guard.
#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedIdentity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedIdentity>()
            .cloned()
            .ok_or_else(|| AuthError::unauthorized("Missing or invalid authorization header"))
    }
}

/// JSON body whose syntax and shape errors surface as [`AuthError::Validation`]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AuthError::Validation(rejection.body_text()))?;

        Ok(Self(value))
    }
}

/// [`JsonBody`] that also passes its `validator` rules
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonBody(value) = JsonBody::<T>::from_request(req, state).await?;
        value.validate()?;

        Ok(Self(value))
    }
}

/// `:id` path segment. An id that is not a UUID names no user.
pub struct UserIdPath(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for UserIdPath
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthError::NotFound)?;

        Ok(Self(parse_user_id(&raw)?))
    }
}
