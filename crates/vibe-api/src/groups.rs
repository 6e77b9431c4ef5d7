use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use vibe_db::Database;
use vibe_db::models::GroupRow;
use vibe_types::api::{GroupNameRequest, GroupResponse, MembersRequest, UserInfo};

use crate::convert;
use crate::error::{ApiError, ApiResult, run_blocking};
use crate::middleware::CurrentUser;
use crate::state::AppState;
use crate::validation::{self, NAME_MAX_LEN};

fn load_group(db: &Database, id: &str) -> ApiResult<GroupRow> {
    db.get_group(id)?
        .ok_or_else(|| ApiError::not_found("Group not found"))
}

fn require_admin(group: &GroupRow, user: &CurrentUser) -> ApiResult<()> {
    if group.admin_id != user.id_str() {
        return Err(ApiError::forbidden("Sorry, you are not an admin of this group."));
    }
    Ok(())
}

fn group_response(db: &Database, group: &GroupRow) -> ApiResult<GroupResponse> {
    let members = db.get_group_member_ids(&group.id)?;
    Ok(convert::group(group, &members))
}

fn id_strings(ids: &[Uuid]) -> Vec<String> {
    ids.iter().map(Uuid::to_string).collect()
}

/// POST /community/v1/groups
pub async fn create_group(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<GroupNameRequest>,
) -> ApiResult<impl IntoResponse> {
    validation::bounded_text("name", &req.name, NAME_MAX_LEN)?;

    let db = state.db.clone();
    let response = run_blocking(move || {
        let id = Uuid::new_v4().to_string();
        db.create_group(&id, req.name.trim(), &user.id_str())?;
        group_response(&db, &load_group(&db, &id)?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /community/v1/groups
pub async fn list_groups(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<GroupResponse>>> {
    let db = state.db.clone();
    let response = run_blocking(move || {
        db.list_groups_for_user(&user.id_str(), user.is_superuser)?
            .iter()
            .map(|g| group_response(&db, g))
            .collect::<ApiResult<Vec<_>>>()
    })
    .await?;
    Ok(Json(response))
}

/// GET /community/v1/groups/{id}
pub async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> ApiResult<Json<GroupResponse>> {
    let db = state.db.clone();
    let response = run_blocking(move || group_response(&db, &load_group(&db, &group_id.to_string())?)).await?;
    Ok(Json(response))
}

/// PATCH /community/v1/groups/{id}
pub async fn rename_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<GroupNameRequest>,
) -> ApiResult<Json<GroupResponse>> {
    validation::bounded_text("name", &req.name, NAME_MAX_LEN)?;

    let db = state.db.clone();
    let response = run_blocking(move || {
        let id = group_id.to_string();
        require_admin(&load_group(&db, &id)?, &user)?;
        db.rename_group(&id, req.name.trim())?;
        group_response(&db, &load_group(&db, &id)?)
    })
    .await?;
    Ok(Json(response))
}

/// DELETE /community/v1/groups/{id}
pub async fn delete_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<StatusCode> {
    let db = state.db.clone();
    run_blocking(move || {
        let id = group_id.to_string();
        require_admin(&load_group(&db, &id)?, &user)?;
        db.delete_group(&id)?;
        Ok(())
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /community/v1/groups/{id}/join
pub async fn join_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<GroupResponse>> {
    let db = state.db.clone();
    let response = run_blocking(move || {
        let group = load_group(&db, &group_id.to_string())?;
        db.add_group_members(&group.id, &[user.id_str()])?;
        group_response(&db, &group)
    })
    .await?;
    Ok(Json(response))
}

/// POST /community/v1/groups/{id}/leave
pub async fn leave_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<GroupResponse>> {
    let db = state.db.clone();
    let response = run_blocking(move || {
        let group = load_group(&db, &group_id.to_string())?;
        db.remove_group_members(&group.id, &[user.id_str()])?;
        group_response(&db, &group)
    })
    .await?;
    Ok(Json(response))
}

/// POST /community/v1/groups/{id}/add-members
pub async fn add_members(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<MembersRequest>,
) -> ApiResult<Json<GroupResponse>> {
    let db = state.db.clone();
    let response = run_blocking(move || {
        let group = load_group(&db, &group_id.to_string())?;
        require_admin(&group, &user)?;
        db.add_group_members(&group.id, &id_strings(&req.members))?;
        group_response(&db, &group)
    })
    .await?;
    Ok(Json(response))
}

/// POST /community/v1/groups/{id}/remove-members
pub async fn remove_members(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<MembersRequest>,
) -> ApiResult<Json<GroupResponse>> {
    let db = state.db.clone();
    let response = run_blocking(move || {
        let group = load_group(&db, &group_id.to_string())?;
        require_admin(&group, &user)?;
        db.remove_group_members(&group.id, &id_strings(&req.members))?;
        group_response(&db, &group)
    })
    .await?;
    Ok(Json(response))
}

/// GET /community/v1/groups/{id}/members
pub async fn get_members(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> ApiResult<Json<Vec<UserInfo>>> {
    let db = state.db.clone();
    let response = run_blocking(move || {
        let group = load_group(&db, &group_id.to_string())?;
        let member_ids = db.get_group_member_ids(&group.id)?;
        let users = convert::user_infos(&db, &member_ids)?;
        Ok(member_ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    })
    .await?;
    Ok(Json(response))
}
