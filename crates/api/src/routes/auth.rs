//! Token and registration handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::Result;
use crate::extract::ApiJson;
use crate::services::auth::{RegisterRequest, TokenPair};
use crate::state::AppState;

/// `POST /token/` body.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

/// `POST /token/refresh/` body.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct AccessToken {
    pub access: String,
}

/// Exchange credentials for an access/refresh pair.
///
/// POST /token/
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn obtain(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TokenRequest>,
) -> Result<ApiJson<TokenPair>> {
    let pair = state
        .auth()
        .login(&request.username, &request.password)
        .await
        .inspect_err(|e| tracing::info!(error = %e, "login refused"))?;
    Ok(ApiJson(pair))
}

/// Exchange a refresh token for a new access token.
///
/// POST /token/refresh/
#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> Result<ApiJson<AccessToken>> {
    let access = state.auth().refresh(&request.refresh).await?;
    Ok(ApiJson(AccessToken { access }))
}

/// Create a customer account.
///
/// POST /register/
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let user = state.auth().register(request).await?;
    Ok((StatusCode::CREATED, ApiJson(user)))
}
