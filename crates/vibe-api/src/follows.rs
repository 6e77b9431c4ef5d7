use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;

use vibe_db::Database;
use vibe_db::models::FollowRow;
use vibe_types::api::{DetailResponse, FollowshipResponse};

use crate::convert;
use crate::error::{ApiError, ApiResult, run_blocking};
use crate::middleware::CurrentUser;
use crate::state::AppState;

fn followship_responses(db: &Database, rows: &[FollowRow]) -> ApiResult<Vec<FollowshipResponse>> {
    let ids: Vec<String> = rows
        .iter()
        .flat_map(|r| [r.user_id.clone(), r.follower_id.clone()])
        .collect();
    let users = convert::user_infos(db, &ids)?;

    rows.iter()
        .map(|row| {
            let user = users.get(&row.user_id).cloned();
            let follower = users.get(&row.follower_id).cloned();
            match (user, follower) {
                (Some(user), Some(follower)) => Ok(FollowshipResponse {
                    id: convert::uuid(&row.id),
                    user,
                    follower,
                }),
                _ => Err(ApiError::Internal(format!("Dangling follow edge {}", row.id))),
            }
        })
        .collect()
}

/// POST /auth/v1/user-followership/{user_id}/follow
pub async fn follow(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(me): Extension<CurrentUser>,
) -> ApiResult<Json<FollowshipResponse>> {
    if user_id == me.id {
        return Err(ApiError::validation("You cannot follow yourself"));
    }

    let db = state.db.clone();
    let response = run_blocking(move || {
        let target = user_id.to_string();
        if db.get_account_by_id(&target)?.is_none() {
            return Err(ApiError::not_found("User not found"));
        }
        let edge = db.follow(&Uuid::new_v4().to_string(), &target, &me.id_str())?;
        followship_responses(&db, &[edge])?
            .pop()
            .ok_or_else(|| ApiError::Internal("Follow edge vanished".into()))
    })
    .await?;
    Ok(Json(response))
}

/// POST /auth/v1/user-followership/{user_id}/unfollow
pub async fn unfollow(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(me): Extension<CurrentUser>,
) -> ApiResult<Json<DetailResponse>> {
    let db = state.db.clone();
    let removed = run_blocking(move || Ok(db.unfollow(&user_id.to_string(), &me.id_str())?)).await?;
    if !removed {
        return Err(ApiError::not_found("You are not following this user"));
    }
    Ok(Json(DetailResponse {
        detail: "Unfollowed".into(),
    }))
}

/// GET /auth/v1/users/{id}/followers
pub async fn followers(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<FollowshipResponse>>> {
    let db = state.db.clone();
    let response = run_blocking(move || {
        let rows = db.list_followers(&user_id.to_string())?;
        followship_responses(&db, &rows)
    })
    .await?;
    Ok(Json(response))
}

/// GET /auth/v1/users/{id}/following
pub async fn following(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<FollowshipResponse>>> {
    let db = state.db.clone();
    let response = run_blocking(move || {
        let rows = db.list_following(&user_id.to_string())?;
        followship_responses(&db, &rows)
    })
    .await?;
    Ok(Json(response))
}
