//! Accounts HTTP Handlers
//!
//! Thin axum adapters over [`AuthService`] and [`UserStore`](crate::store::UserStore).

use crate::error::AuthError;
use crate::extractors::{JsonBody, UserIdPath, ValidatedJson};
use crate::guard::{require_auth, AccessGuard};
use crate::models::*;
use crate::service::AuthService;
use crate::store::parse_user_id;

use axum::{
    extract::State,
    http::StatusCode,
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use std::sync::Arc;

/// Shared auth service state
pub type AuthState = Arc<AuthService>;

// ============================================
// Route Builder
// ============================================

/// Create account routes
pub fn create_routes(auth_service: Arc<AuthService>, guard: AccessGuard) -> Router {
    // Public routes (no authentication required)
    let public = Router::new()
        .route("/", get(health))
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/refresh-token", post(refresh_token));

    // Protected routes (require a bearer credential)
    let protected = Router::new()
        .route("/auth/change-password", post(change_password))
        .route("/users", get(list_users).post(create_user))
        .route("/users/profile", get(get_profile))
        .route(
            "/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route_layer(axum_middleware::from_fn_with_state(guard, require_auth));

    Router::new()
        .merge(public)
        .merge(protected)
        .with_state(auth_service)
}

/// GET /
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        message: "RESTful API is running!".to_string(),
        timestamp: Utc::now(),
    })
}

// ============================================
// Session
// ============================================

/// POST /auth/signup
pub async fn signup(
    State(auth): State<AuthState>,
    ValidatedJson(req): ValidatedJson<SignupRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let response = auth.signup(req).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /auth/login
pub async fn login(
    State(auth): State<AuthState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let response = auth.login(req).await?;

    Ok(Json(response))
}

/// POST /auth/refresh-token
pub async fn refresh_token(
    State(auth): State<AuthState>,
    ValidatedJson(req): ValidatedJson<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let response = auth.refresh(&req.refresh_token).await?;

    Ok(Json(response))
}

/// POST /auth/change-password
///
/// The target user comes from the body, not from the caller's identity.
pub async fn change_password(
    State(auth): State<AuthState>,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let response = auth.change_password(req).await?;

    Ok(Json(response))
}

// ============================================
// Users
// ============================================

/// POST /users
pub async fn create_user(
    State(auth): State<AuthState>,
    ValidatedJson(req): ValidatedJson<SignupRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let (profile, password) = req.into_parts();
    let user = auth.store().create(profile, &password).await?;

    tracing::info!(user_id = %user.id, "User created");

    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /users
pub async fn list_users(State(auth): State<AuthState>) -> impl IntoResponse {
    Json(auth.store().find_all().await)
}

/// GET /users/profile
pub async fn get_profile(
    State(auth): State<AuthState>,
    identity: AuthenticatedIdentity,
) -> Result<impl IntoResponse, AuthError> {
    let user = auth.store().find_by_id(parse_user_id(&identity.id)?).await?;
    let age = auth.store().age_of(user.date_of_birth);

    Ok(Json(ProfileResponse { user, age }))
}

/// GET /users/:id
pub async fn get_user(
    State(auth): State<AuthState>,
    UserIdPath(id): UserIdPath,
) -> Result<impl IntoResponse, AuthError> {
    Ok(Json(auth.store().find_by_id(id).await?))
}

/// PATCH /users/:id
pub async fn update_user(
    State(auth): State<AuthState>,
    UserIdPath(id): UserIdPath,
    JsonBody(req): JsonBody<UpdateUserRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let user = auth.store().update(id, req).await?;

    tracing::info!(user_id = %id, "User updated");

    Ok(Json(user))
}

/// DELETE /users/:id
pub async fn delete_user(
    State(auth): State<AuthState>,
    UserIdPath(id): UserIdPath,
) -> Result<impl IntoResponse, AuthError> {
    auth.store().remove(id).await?;

    tracing::info!(user_id = %id, "User removed");

    Ok(StatusCode::NO_CONTENT)
}
