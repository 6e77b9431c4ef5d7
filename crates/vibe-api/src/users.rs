use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use uuid::Uuid;

use vibe_db::activation;
use vibe_types::api::{
    AccountResponse, ProfileResponse, UpdateAccountRequest, UpdateEmailRequest, UpdateProfileRequest,
};
use vibe_types::models::TokenReason;

use crate::convert;
use crate::error::{ApiError, ApiResult, run_blocking};
use crate::middleware::CurrentUser;
use crate::state::AppState;
use crate::storage::MediaKind;
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    50
}

/// GET /auth/v1/users
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<AccountResponse>>> {
    let db = state.db.clone();
    let limit = query.limit.min(200);
    let rows = run_blocking(move || Ok(db.list_accounts(limit, query.offset)?)).await?;
    Ok(Json(rows.iter().map(convert::account).collect()))
}

/// GET /auth/v1/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<AccountResponse>> {
    let db = state.db.clone();
    let row = run_blocking(move || {
        db.get_account_by_id(&user_id.to_string())?
            .ok_or_else(|| ApiError::not_found("User not found"))
    })
    .await?;
    Ok(Json(convert::account(&row)))
}

/// GET /auth/v1/users/whoami
pub async fn whoami(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<AccountResponse>> {
    let db = state.db.clone();
    let row = run_blocking(move || {
        db.get_account_by_id(&user.id_str())?
            .ok_or_else(|| ApiError::not_found("User not found"))
    })
    .await?;
    Ok(Json(convert::account(&row)))
}

/// PATCH /auth/v1/users/me
pub async fn update_me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UpdateAccountRequest>,
) -> ApiResult<Json<AccountResponse>> {
    if let Some(username) = &req.username {
        validation::username(username)?;
    }

    let db = state.db.clone();
    let row = run_blocking(move || {
        let id = user.id_str();
        let mut account = db
            .get_account_by_id(&id)?
            .ok_or_else(|| ApiError::not_found("User not found"))?;

        if let Some(username) = req.username {
            if db.username_taken(&username, Some(&id))? {
                return Err(ApiError::Conflict("A user with that username already exists.".into()));
            }
            account.username = username;
        }
        if let Some(first_name) = req.first_name {
            account.first_name = first_name;
        }
        if let Some(last_name) = req.last_name {
            account.last_name = last_name;
        }
        validation::names(&account.first_name, &account.last_name)?;

        db.save_account(&mut account)?;
        Ok(account)
    })
    .await?;
    Ok(Json(convert::account(&row)))
}

/// POST /auth/v1/users/update-email
///
/// Stores the new address together with a fresh verification token.
pub async fn update_email(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UpdateEmailRequest>,
) -> ApiResult<Json<AccountResponse>> {
    validation::email(&req.email)?;

    let db = state.db.clone();
    let row = run_blocking(move || {
        let mut account = db
            .get_account_by_id(&user.id_str())?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        account.email = Some(req.email);
        account.token = activation::generate_code(&mut rand::rng());
        account.token_reason = TokenReason::EmailVerification.as_str().to_string();
        db.save_account(&mut account)?;
        Ok(account)
    })
    .await?;
    Ok(Json(convert::account(&row)))
}

/// GET /auth/v1/users/{id}/profile
pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<ProfileResponse>> {
    let db = state.db.clone();
    let row = run_blocking(move || {
        db.get_profile(&user_id.to_string())?
            .ok_or_else(|| ApiError::not_found("Profile not found"))
    })
    .await?;
    Ok(Json(convert::profile(&row)))
}

/// PATCH /auth/v1/update-profile
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    validation::about(&req.about)?;

    let db = state.db.clone();
    let row = run_blocking(move || {
        let id = user.id_str();
        db.update_profile_about(&id, &req.about)?;
        db.get_profile(&id)?
            .ok_or_else(|| ApiError::not_found("Profile not found"))
    })
    .await?;
    Ok(Json(convert::profile(&row)))
}

/// PUT /auth/v1/update-profile-image
pub async fn update_profile_image(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    bytes: Bytes,
) -> ApiResult<Json<ProfileResponse>> {
    replace_image(state, user, MediaKind::ProfilePicture, bytes).await
}

/// PUT /auth/v1/update-cover-image
pub async fn update_cover_image(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    bytes: Bytes,
) -> ApiResult<Json<ProfileResponse>> {
    replace_image(state, user, MediaKind::CoverPicture, bytes).await
}

async fn replace_image(
    state: AppState,
    user: CurrentUser,
    kind: MediaKind,
    bytes: Bytes,
) -> ApiResult<Json<ProfileResponse>> {
    let path = state.media.save(kind, &bytes).await?;

    let db = state.db.clone();
    let stored = path.clone();
    let result = run_blocking(move || {
        let id = user.id_str();
        let previous = match kind {
            MediaKind::CoverPicture => db.set_cover_picture(&id, &stored)?,
            _ => db.set_profile_picture(&id, &stored)?,
        };
        let row = db
            .get_profile(&id)?
            .ok_or_else(|| ApiError::not_found("Profile not found"))?;
        Ok((previous, row))
    })
    .await;
    let (previous, row) = state.media.discard_on_error(&path, result).await?;

    if let Some(previous) = previous {
        state.media.remove(&previous).await;
    }
    Ok(Json(convert::profile(&row)))
}
