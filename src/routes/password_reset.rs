/**
 * Password Reset Routes
 * Code issuance, verification and the final password change
 */
use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crate::error::AppError;
use crate::routes::{AppState, SuccessResponse};
use crate::services::password_reset::CodeVerification;

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

/// POST /api/password-reset/request
///
/// The code goes out by email only. The response is the same whether or not
/// the address has an account.
pub async fn request_reset(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let email = payload.email.trim();
    let issued = state.resets.request_password_reset(email).await?;
    if let Some(code) = issued.code.as_deref() {
        state.mailer.send_reset_code(email, code).await?;
    }
    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/password-reset/verify
///
/// A failed check counts as an attempt.
pub async fn verify_code(
    State(state): State<AppState>,
    Json(payload): Json<VerifyCodeRequest>,
) -> Result<Json<CodeVerification>, AppError> {
    let email = payload.email.trim();
    let result = state
        .resets
        .verify_reset_code(email, payload.code.trim())
        .await?;
    if !result.valid {
        state.resets.increment_attempts(email).await?;
    }
    Ok(Json(result))
}

/// POST /api/password-reset/attempts
pub async fn record_attempt(
    State(state): State<AppState>,
    Json(payload): Json<EmailRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.resets.increment_attempts(payload.email.trim()).await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/password-reset/reset
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    state
        .resets
        .reset_password(
            payload.email.trim(),
            payload.code.trim(),
            &payload.new_password,
        )
        .await?;
    Ok(Json(SuccessResponse { success: true }))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/password-reset/request", post(request_reset))
        .route("/api/password-reset/verify", post(verify_code))
        .route("/api/password-reset/attempts", post(record_attempt))
        .route("/api/password-reset/reset", post(reset_password))
}
