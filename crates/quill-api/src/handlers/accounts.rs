//! Registration, login, and captcha-gated password resets.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{ApiError, AppState};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let user = state
        .db
        .users
        .register(&request.username, &request.email, &request.password)
        .await?;
    info!(
        subsystem = "api",
        component = "accounts",
        op = "register",
        user_id = %user.id,
        "Account registered"
    );
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = state
        .db
        .users
        .authenticate(&request.username, &request.password)
        .await?;
    let token = state.jwt.issue(user.id)?;
    Ok(Json(json!({
        "access_token": token,
        "token_type": "bearer",
    })))
}

#[derive(Deserialize)]
pub struct CaptchaRequest {
    pub email: String,
}

/// Issue a verification code and send it to the account's email address.
pub async fn email_captcha(
    State(state): State<AppState>,
    Json(request): Json<CaptchaRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let code = state.db.users.issue_captcha(&request.email).await?;
    state
        .mailer
        .send(
            &request.email,
            "Your verification code",
            &format!("Your password reset code is {}. It expires in 10 minutes.", code),
        )
        .await?;
    Ok(Json(json!({ "msg": "Verification code sent" })))
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub captcha: String,
    pub new_password: String,
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .db
        .users
        .reset_password(&request.email, &request.captcha, &request.new_password)
        .await?;
    Ok(Json(json!({ "msg": "Password reset" })))
}
