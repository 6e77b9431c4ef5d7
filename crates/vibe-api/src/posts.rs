use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use vibe_db::Database;
use vibe_db::models::{NewPost, PostCursor, PostFilter, PostRow};
use vibe_types::api::{CreatePostRequest, PostResponse, SharePostRequest, UpdatePostRequest};
use vibe_types::models::PostType;

use crate::convert;
use crate::error::{ApiError, ApiResult, run_blocking};
use crate::middleware::CurrentUser;
use crate::state::AppState;

const MAX_PAGE: u32 = 200;

#[derive(Debug, Deserialize)]
pub struct PostQuery {
    pub user: Option<Uuid>,
    pub post_type: Option<PostType>,
    pub group: Option<Uuid>,
    pub announcement: Option<Uuid>,
    pub shared_from: Option<Uuid>,
    pub search: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor: id of the last post on the previous page.
    pub before: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct VideoFeedQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

pub(crate) fn load_post(db: &Database, id: &str) -> ApiResult<PostRow> {
    db.get_post(id)?
        .ok_or_else(|| ApiError::not_found("Post not found"))
}

fn require_owner(post: &PostRow, user: &CurrentUser) -> ApiResult<()> {
    if post.user_id != user.id_str() {
        return Err(ApiError::forbidden("You can only modify your own posts"));
    }
    Ok(())
}

fn require_text(post_type: PostType, text: Option<&str>) -> ApiResult<()> {
    if post_type == PostType::TextPost && text.is_none_or(|t| t.trim().is_empty()) {
        return Err(ApiError::validation("A text post needs text"));
    }
    Ok(())
}

fn single(db: &Database, viewer: &str, id: &str) -> ApiResult<PostResponse> {
    let row = load_post(db, id)?;
    convert::posts(db, viewer, vec![row])?
        .pop()
        .ok_or_else(|| ApiError::Internal(format!("Post {} could not be assembled", id)))
}

/// POST /post/v1/posts
pub async fn create_post(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    require_text(req.post_type, req.text.as_deref())?;

    let db = state.db.clone();
    let response = run_blocking(move || {
        let me = user.id_str();
        let group_id = req.group.map(|g| g.to_string());
        let announcement_id = req.announcement.map(|a| a.to_string());

        if let Some(group_id) = &group_id {
            if db.get_group(group_id)?.is_none() {
                return Err(ApiError::not_found("Group not found"));
            }
            if !db.is_group_member(group_id, &me)? {
                return Err(ApiError::forbidden("You are not a member of this group"));
            }
        }
        if let Some(announcement_id) = &announcement_id {
            let announcement = db
                .get_announcement(announcement_id)?
                .ok_or_else(|| ApiError::not_found("Announcement not found"))?;
            if announcement.community_admin_id != me {
                return Err(ApiError::forbidden("Only the community admin can post announcements"));
            }
        }

        let id = Uuid::new_v4().to_string();
        db.insert_post(&NewPost {
            id: &id,
            text: req.text.as_deref(),
            user_id: &me,
            shared_from: None,
            post_type: req.post_type.as_str(),
            group_id: group_id.as_deref(),
            announcement_id: announcement_id.as_deref(),
        })?;

        if !req.videos.is_empty() {
            let video_ids: Vec<String> = req.videos.iter().map(Uuid::to_string).collect();
            let attached = db.attach_videos(&id, &video_ids, &me)?;
            debug!("Attached {} of {} videos to post {}", attached, video_ids.len(), id);
        }

        single(&db, &me, &id)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /post/v1/posts
pub async fn list_posts(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<PostQuery>,
) -> ApiResult<Json<Vec<PostResponse>>> {
    let mut filter = PostFilter {
        user_id: query.user.map(|u| u.to_string()),
        post_type: query.post_type.map(|t| t.as_str().to_string()),
        group_id: query.group.map(|g| g.to_string()),
        announcement_id: query.announcement.map(|a| a.to_string()),
        shared_from: query.shared_from.map(|s| s.to_string()),
        search: query.search.filter(|s| !s.is_empty()),
        year: query.year,
        month: query.month,
        day: query.day,
        before: None,
        limit: query.limit.min(MAX_PAGE),
    };

    let db = state.db.clone();
    let response = run_blocking(move || {
        if let Some(before) = query.before {
            let last = db
                .get_post(&before.to_string())?
                .ok_or_else(|| ApiError::validation("Cursor post no longer exists"))?;
            filter.before = Some(PostCursor {
                date_created: last.date_created,
                id: last.id,
            });
        }
        let rows = db.list_posts(&filter)?;
        convert::posts(&db, &user.id_str(), rows)
    })
    .await?;
    Ok(Json(response))
}

/// GET /post/v1/posts/video
pub async fn video_feed(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<VideoFeedQuery>,
) -> ApiResult<Json<Vec<PostResponse>>> {
    let db = state.db.clone();
    let limit = query.limit.min(MAX_PAGE);
    let response = run_blocking(move || {
        let rows = db.random_video_posts(limit)?;
        convert::posts(&db, &user.id_str(), rows)
    })
    .await?;
    Ok(Json(response))
}

/// GET /post/v1/posts/{id}
pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<PostResponse>> {
    let db = state.db.clone();
    let response = run_blocking(move || single(&db, &user.id_str(), &post_id.to_string())).await?;
    Ok(Json(response))
}

/// PATCH /post/v1/posts/{id}
pub async fn update_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UpdatePostRequest>,
) -> ApiResult<Json<PostResponse>> {
    let db = state.db.clone();
    let response = run_blocking(move || {
        let id = post_id.to_string();
        let me = user.id_str();
        let post = load_post(&db, &id)?;
        require_owner(&post, &user)?;

        let text = req.text.or(post.text);
        let post_type = match req.post_type {
            Some(t) => t,
            None => post.post_type.parse().map_err(ApiError::Internal)?,
        };
        if post.shared_from.is_none() {
            require_text(post_type, text.as_deref())?;
        }

        db.update_post(&id, text.as_deref(), post_type.as_str())?;
        if !req.videos.is_empty() {
            let video_ids: Vec<String> = req.videos.iter().map(Uuid::to_string).collect();
            db.attach_videos(&id, &video_ids, &me)?;
        }
        single(&db, &me, &id)
    })
    .await?;
    Ok(Json(response))
}

/// DELETE /post/v1/posts/{id}
pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<StatusCode> {
    let db = state.db.clone();
    let orphaned = run_blocking(move || {
        let id = post_id.to_string();
        let post = load_post(&db, &id)?;
        require_owner(&post, &user)?;

        let ids = [id.clone()];
        let mut paths: Vec<String> = db
            .list_pictures_for_posts(&ids)?
            .into_iter()
            .map(|p| p.image)
            .collect();
        for video in db.list_videos_for_posts(&ids)? {
            paths.push(video.video);
            paths.extend(video.thumbnail);
        }

        db.delete_post(&id)?;
        Ok(paths)
    })
    .await?;

    state.media.remove_all(&orphaned).await;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /post/v1/posts/{id}/like
pub async fn like_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<PostResponse>> {
    let db = state.db.clone();
    let response = run_blocking(move || {
        let id = post_id.to_string();
        let me = user.id_str();
        load_post(&db, &id)?;
        db.like_post(&id, &me)?;
        single(&db, &me, &id)
    })
    .await?;
    Ok(Json(response))
}

/// POST /post/v1/posts/{id}/unlike
pub async fn unlike_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<PostResponse>> {
    let db = state.db.clone();
    let response = run_blocking(move || {
        let id = post_id.to_string();
        let me = user.id_str();
        load_post(&db, &id)?;
        db.unlike_post(&id, &me)?;
        single(&db, &me, &id)
    })
    .await?;
    Ok(Json(response))
}

/// POST /post/v1/posts/{id}/share
///
/// Creates a new post by the caller that references the original.
pub async fn share_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
    req: Option<Json<SharePostRequest>>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = req.unwrap_or_default();

    let db = state.db.clone();
    let response = run_blocking(move || {
        let original = load_post(&db, &post_id.to_string())?;
        let me = user.id_str();
        let id = Uuid::new_v4().to_string();
        db.insert_post(&NewPost {
            id: &id,
            text: req.text.as_deref(),
            user_id: &me,
            shared_from: Some(&original.id),
            post_type: req.post_type.as_str(),
            group_id: None,
            announcement_id: None,
        })?;
        single(&db, &me, &id)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_posts_need_text() {
        assert!(require_text(PostType::TextPost, None).is_err());
        assert!(require_text(PostType::TextPost, Some("  ")).is_err());
        assert!(require_text(PostType::TextPost, Some("hi")).is_ok());
        assert!(require_text(PostType::VideoPost, None).is_ok());
    }
}
