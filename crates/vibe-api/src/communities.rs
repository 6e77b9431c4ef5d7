use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use vibe_db::Database;
use vibe_db::models::CommunityRow;
use vibe_types::api::{CommunityResponse, GroupNameRequest, GroupResponse, GroupsRequest};

use crate::convert;
use crate::error::{ApiError, ApiResult, run_blocking};
use crate::middleware::CurrentUser;
use crate::state::AppState;
use crate::validation::{self, NAME_MAX_LEN};

const ANNOUNCEMENT_NAME: &str = "Announcements";

fn load_community(db: &Database, id: &str) -> ApiResult<CommunityRow> {
    db.get_community(id)?
        .ok_or_else(|| ApiError::not_found("Community not found"))
}

fn community_response(db: &Database, community: &CommunityRow) -> ApiResult<CommunityResponse> {
    let groups = db.get_community_group_ids(&community.id)?;
    Ok(convert::community(community, &groups))
}

/// The caller must administer the community and every listed group.
fn authorize_group_change(
    db: &Database,
    community: &CommunityRow,
    user: &CurrentUser,
    group_ids: &[String],
) -> ApiResult<()> {
    let me = user.id_str();
    if community.admin_id != me {
        return Err(ApiError::forbidden("Sorry, you are not an admin of this community."));
    }
    if db.count_groups_not_administered_by(group_ids, &me)? > 0 {
        return Err(ApiError::forbidden("You must be an admin of every group you add or remove."));
    }
    Ok(())
}

/// POST /community/v1/communities
pub async fn create_community(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<GroupNameRequest>,
) -> ApiResult<impl IntoResponse> {
    validation::bounded_text("name", &req.name, NAME_MAX_LEN)?;

    let db = state.db.clone();
    let response = run_blocking(move || {
        let id = Uuid::new_v4().to_string();
        let announcement_id = Uuid::new_v4().to_string();
        db.create_community(&id, req.name.trim(), &user.id_str(), &announcement_id, ANNOUNCEMENT_NAME)?;
        community_response(&db, &load_community(&db, &id)?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /community/v1/communities
pub async fn list_communities(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<CommunityResponse>>> {
    let db = state.db.clone();
    let response = run_blocking(move || {
        db.list_communities_for_user(&user.id_str(), user.is_superuser)?
            .iter()
            .map(|c| community_response(&db, c))
            .collect::<ApiResult<Vec<_>>>()
    })
    .await?;
    Ok(Json(response))
}

/// GET /community/v1/communities/{id}
pub async fn get_community(
    State(state): State<AppState>,
    Path(community_id): Path<Uuid>,
) -> ApiResult<Json<CommunityResponse>> {
    let db = state.db.clone();
    let response = run_blocking(move || {
        community_response(&db, &load_community(&db, &community_id.to_string())?)
    })
    .await?;
    Ok(Json(response))
}

/// POST /community/v1/communities/{id}/add-groups
pub async fn add_groups(
    State(state): State<AppState>,
    Path(community_id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<GroupsRequest>,
) -> ApiResult<Json<CommunityResponse>> {
    let db = state.db.clone();
    let response = run_blocking(move || {
        let community = load_community(&db, &community_id.to_string())?;
        let group_ids: Vec<String> = req.groups.iter().map(Uuid::to_string).collect();
        authorize_group_change(&db, &community, &user, &group_ids)?;
        db.add_community_groups(&community.id, &group_ids)?;
        community_response(&db, &community)
    })
    .await?;
    Ok(Json(response))
}

/// POST /community/v1/communities/{id}/remove-groups
pub async fn remove_groups(
    State(state): State<AppState>,
    Path(community_id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<GroupsRequest>,
) -> ApiResult<Json<CommunityResponse>> {
    let db = state.db.clone();
    let response = run_blocking(move || {
        let community = load_community(&db, &community_id.to_string())?;
        let group_ids: Vec<String> = req.groups.iter().map(Uuid::to_string).collect();
        authorize_group_change(&db, &community, &user, &group_ids)?;
        db.remove_community_groups(&community.id, &group_ids)?;
        community_response(&db, &community)
    })
    .await?;
    Ok(Json(response))
}

/// GET /community/v1/communities/{id}/groups
pub async fn get_groups(
    State(state): State<AppState>,
    Path(community_id): Path<Uuid>,
) -> ApiResult<Json<Vec<GroupResponse>>> {
    let db = state.db.clone();
    let response = run_blocking(move || {
        let community = load_community(&db, &community_id.to_string())?;
        let mut groups = Vec::new();
        for group_id in db.get_community_group_ids(&community.id)? {
            if let Some(group) = db.get_group(&group_id)? {
                let members = db.get_group_member_ids(&group.id)?;
                groups.push(convert::group(&group, &members));
            }
        }
        Ok(groups)
    })
    .await?;
    Ok(Json(response))
}
