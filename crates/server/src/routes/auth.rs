//! Authentication and profile endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::models::PublicProfile;
use crate::services::auth::{AuthService, ProfileUpdate, TokenPair};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/admin/login", post(admin_login))
        .route("/refresh-token", post(refresh))
        .route("/logout", post(logout))
        .route("/profile", get(profile).put(update_profile))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialsRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    message: &'static str,
    user: PublicProfile,
    access_token: String,
    refresh_token: String,
}

impl AuthResponse {
    fn new(message: &'static str, user: PublicProfile, tokens: TokenPair) -> Self {
        Self {
            message,
            user,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }
    }
}

fn required(value: Option<String>, message: &str) -> Result<String, AppError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Validation(message.to_string()))
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    const REQUIRED: &str = "Name, email and password are required";
    let name = required(body.name, REQUIRED)?;
    let email = required(body.email, REQUIRED)?;
    let password = required(body.password, REQUIRED)?;

    let auth = AuthService::new(state.store(), state.config());
    let (user, tokens) = auth.register(&name, &email, &password).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse::new("Registration successful", user, tokens)),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, AppError> {
    const REQUIRED: &str = "Email and password are required";
    let email = required(body.email, REQUIRED)?;
    let password = required(body.password, REQUIRED)?;

    let auth = AuthService::new(state.store(), state.config());
    let (user, tokens) = auth.login(&email, &password).await?;
    Ok(Json(AuthResponse::new("Login successful", user, tokens)))
}

async fn admin_login(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, AppError> {
    const REQUIRED: &str = "Email and password are required";
    let email = required(body.email, REQUIRED)?;
    let password = required(body.password, REQUIRED)?;

    let auth = AuthService::new(state.store(), state.config());
    let (user, tokens) = auth.admin_login(&email, &password).await?;
    Ok(Json(AuthResponse::new("Login successful", user, tokens)))
}

async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let token = required(body.refresh_token, "Refresh token is required")?;
    let tokens = AuthService::new(state.store(), state.config())
        .refresh(&token)
        .await?;
    Ok(Json(tokens))
}

async fn logout(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = body.refresh_token {
        AuthService::new(state.store(), state.config())
            .logout(&token)
            .await?;
    }
    Ok(Json(json!({ "message": "Logged out" })))
}

async fn profile(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
) -> Result<impl IntoResponse, AppError> {
    let user = AuthService::new(state.store(), state.config())
        .profile(&claims)
        .await?;
    Ok(Json(json!({ "user": user })))
}

async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Json(changes): Json<ProfileUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let user = AuthService::new(state.store(), state.config())
        .update_profile(&claims, changes)
        .await?;
    Ok(Json(json!({ "message": "Profile updated", "user": user })))
}
