use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use vibe_db::models::AccountRow;
use vibe_types::api::{
    AccountWithTokens, ActivateRequest, DetailResponse, LoginRequest, RefreshRequest,
    RefreshResponse, RegisterRequest, ResendOtpRequest, VerifyTokenRequest,
};

use crate::convert;
use crate::error::ApiResult;
use crate::state::AppState;
use crate::tokens::TokenPair;

fn with_tokens(account: &AccountRow, tokens: TokenPair) -> AccountWithTokens {
    AccountWithTokens {
        account: convert::account(account),
        access: tokens.access,
        refresh: tokens.refresh,
    }
}

/// POST /auth/v1/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let (account, tokens) = state.lifecycle.register(req).await?;
    Ok((StatusCode::CREATED, Json(with_tokens(&account, tokens))))
}

/// POST /auth/v1/register/activate
pub async fn activate(
    State(state): State<AppState>,
    Json(req): Json<ActivateRequest>,
) -> ApiResult<Json<AccountWithTokens>> {
    let (account, tokens) = state.lifecycle.activate(req.phone_number, req.otp).await?;
    Ok(Json(with_tokens(&account, tokens)))
}

/// POST /auth/v1/register/resend-otp
pub async fn resend_otp(
    State(state): State<AppState>,
    Json(req): Json<ResendOtpRequest>,
) -> ApiResult<Json<ResendOtpRequest>> {
    state
        .lifecycle
        .resend_activation_code(req.phone_number.clone())
        .await?;
    Ok(Json(req))
}

/// POST /auth/v1/token
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AccountWithTokens>> {
    let (account, tokens) = state.lifecycle.login(req).await?;
    Ok(Json(with_tokens(&account, tokens)))
}

/// POST /auth/v1/token/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access = state.tokens.refresh(&req.refresh)?;
    Ok(Json(RefreshResponse { access }))
}

/// POST /auth/v1/token/verify
pub async fn verify(
    State(state): State<AppState>,
    Json(req): Json<VerifyTokenRequest>,
) -> ApiResult<Json<DetailResponse>> {
    state.tokens.decode(&req.token)?;
    Ok(Json(DetailResponse {
        detail: "Token is valid".into(),
    }))
}
