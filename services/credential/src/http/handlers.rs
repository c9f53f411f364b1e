//! Route handlers. Request and response bodies use camelCase field names.

use crate::confirmation::{Confirmation, ResetRequested};
use crate::error::CredentialError;
use crate::http::error::ApiError;
use crate::http::AppState;
use crate::jwks::JsonWebKeySet;
use crate::jwt::claims::CLAIM_USER_ID;
use crate::jwt::{TokenValidator, ValidationMode};
use crate::metrics;
use crate::refresh::TokenPair;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// `POST /login` body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login address.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

/// `POST /token/refresh` and `POST /token/revoke` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    /// Access token, expired or not.
    pub access_token: String,
    /// Refresh value issued with it.
    pub refresh_token: String,
}

/// `POST /password/forgot` body.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    /// Address to send the reset token to, if registered.
    pub email: String,
}

/// Body for the token confirmation routes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmTokenRequest {
    /// User the token was issued to.
    pub user_id: String,
    /// Encoded opaque token.
    pub token: String,
}

/// `POST /password/reset` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    /// User the token was issued to.
    pub user_id: String,
    /// Encoded reset token.
    pub token: String,
    /// Replacement password.
    pub new_password: String,
}

/// `POST /email/request` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailConfirmationRequest {
    /// User whose address should be confirmed.
    pub user_id: String,
}

/// Outcome of a confirmation route.
#[derive(Debug, Serialize)]
pub struct ConfirmationResponse {
    /// Whether the token was accepted.
    pub confirmed: bool,
}

impl From<Confirmation> for ConfirmationResponse {
    fn from(confirmation: Confirmation) -> Self {
        Self {
            confirmed: confirmation.is_confirmed(),
        }
    }
}

/// `GET /keys`: the published key set.
pub async fn keys(State(state): State<AppState>) -> Json<JsonWebKeySet> {
    Json(state.jwks.key_set().clone())
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

/// `GET /metrics`: Prometheus text exposition.
pub async fn render_metrics() -> Result<impl IntoResponse, ApiError> {
    let body = metrics::render()?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}

/// `POST /login`: check the password and issue the first token pair.
pub async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Result<Json<TokenPair>, ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest("email and password are required".to_string()));
    }

    let Some(user) = state.credentials.find_by_email(&req.email).await? else {
        return Err(ApiError::InvalidCredentials);
    };
    if !state.credentials.verify_password(&user, &req.password).await? {
        return Err(ApiError::InvalidCredentials);
    }

    let pair = state.sessions.issue_for_user(&user.id, &user.user_name).await?;
    Ok(Json(pair))
}

/// `POST /token/refresh`
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let pair = state.rotator.exchange(&req.access_token, &req.refresh_token).await?;
    Ok(Json(pair))
}

/// `POST /token/revoke`: soft-delete the refresh row. Unknown values succeed.
pub async fn revoke(State(state): State<AppState>, Json(req): Json<RefreshRequest>) -> Result<StatusCode, ApiError> {
    let claims = state
        .validator
        .validate_token(&req.access_token, ValidationMode::LifetimeExempt)?;
    let user_id = TokenValidator::resolve_token_value(&claims, CLAIM_USER_ID)
        .ok_or(CredentialError::InvalidAccessToken)?;

    state.rotator.revoke(&user_id, &req.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /password/forgot`: same reply whether or not the address is known.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Json<ResetRequested> {
    Json(state.confirmations.request_password_reset(&req.email).await)
}

/// `POST /password/confirm`
pub async fn confirm_reset_token(
    State(state): State<AppState>,
    Json(req): Json<ConfirmTokenRequest>,
) -> Json<ConfirmationResponse> {
    let confirmation = state
        .confirmations
        .confirm_reset_token(&req.user_id, &req.token)
        .await;
    Json(confirmation.into())
}

/// `POST /password/reset`
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<ConfirmationResponse>, ApiError> {
    if req.new_password.is_empty() {
        return Err(ApiError::BadRequest("newPassword is required".to_string()));
    }

    let confirmation = state
        .confirmations
        .update_password(&req.user_id, &req.token, &req.new_password)
        .await;
    Ok(Json(confirmation.into()))
}

/// `POST /email/request`: always `202`, failures are only logged.
pub async fn request_email_confirmation(
    State(state): State<AppState>,
    Json(req): Json<EmailConfirmationRequest>,
) -> StatusCode {
    if let Err(e) = state.confirmations.request_email_confirmation(&req.user_id).await {
        tracing::warn!(error = %e, "Email confirmation request failed");
    }
    StatusCode::ACCEPTED
}

/// `POST /email/confirm`
pub async fn confirm_email(
    State(state): State<AppState>,
    Json(req): Json<ConfirmTokenRequest>,
) -> Json<ConfirmationResponse> {
    let confirmation = state.confirmations.confirm_email(&req.user_id, &req.token).await;
    Json(confirmation.into())
}
