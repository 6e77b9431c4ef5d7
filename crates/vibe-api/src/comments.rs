use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use vibe_db::Database;
use vibe_db::models::{CommentFilter, CommentRow};
use vibe_types::api::{CommentResponse, CreateCommentRequest, UpdateCommentRequest};

use crate::convert;
use crate::error::{ApiError, ApiResult, run_blocking};
use crate::middleware::CurrentUser;
use crate::posts::load_post;
use crate::state::AppState;
use crate::validation::{self, COMMENT_MAX_LEN};

#[derive(Debug, Deserialize)]
pub struct CommentQuery {
    pub post: Option<Uuid>,
    pub parent: Option<Uuid>,
    pub null_parent: Option<bool>,
    pub search: Option<String>,
    /// `date_created` for oldest first, `-date_created` (default) for newest first.
    pub ordering: Option<String>,
}

fn load_comment(db: &Database, id: &str) -> ApiResult<CommentRow> {
    db.get_comment(id)?
        .ok_or_else(|| ApiError::not_found("Comment not found"))
}

fn require_author(comment: &CommentRow, user: &CurrentUser) -> ApiResult<()> {
    if comment.user_id != user.id_str() {
        return Err(ApiError::forbidden("You can only modify your own comments"));
    }
    Ok(())
}

fn single(db: &Database, viewer: &str, id: &str) -> ApiResult<CommentResponse> {
    let row = load_comment(db, id)?;
    convert::comments(db, viewer, vec![row])?
        .pop()
        .ok_or_else(|| ApiError::Internal(format!("Comment {} could not be assembled", id)))
}

fn oldest_first(ordering: Option<&str>) -> ApiResult<bool> {
    match ordering {
        None | Some("-date_created") => Ok(false),
        Some("date_created") => Ok(true),
        Some(other) => Err(ApiError::validation(format!("Unsupported ordering: {}", other))),
    }
}

/// POST /post/v1/post-comments
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    validation::bounded_text("comment", &req.comment, COMMENT_MAX_LEN)?;

    let db = state.db.clone();
    let response = run_blocking(move || {
        let post_id = req.post.to_string();
        load_post(&db, &post_id)?;

        let parent_id = req.parent.map(|p| p.to_string());
        if let Some(parent_id) = &parent_id {
            let parent = load_comment(&db, parent_id)?;
            if parent.post_id != post_id {
                return Err(ApiError::validation("Parent comment belongs to another post"));
            }
        }

        let me = user.id_str();
        let id = Uuid::new_v4().to_string();
        db.insert_comment(&id, &post_id, &me, &req.comment, parent_id.as_deref())?;
        single(&db, &me, &id)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /post/v1/post-comments
pub async fn list_comments(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<CommentQuery>,
) -> ApiResult<Json<Vec<CommentResponse>>> {
    let filter = CommentFilter {
        post_id: query.post.map(|p| p.to_string()),
        parent_id: query.parent.map(|p| p.to_string()),
        null_parent: query.null_parent,
        search: query.search.filter(|s| !s.is_empty()),
        oldest_first: oldest_first(query.ordering.as_deref())?,
    };

    let db = state.db.clone();
    let response = run_blocking(move || {
        let rows = db.list_comments(&filter)?;
        convert::comments(&db, &user.id_str(), rows)
    })
    .await?;
    Ok(Json(response))
}

/// GET /post/v1/post-comments/{id}
pub async fn get_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<CommentResponse>> {
    let db = state.db.clone();
    let response = run_blocking(move || single(&db, &user.id_str(), &comment_id.to_string())).await?;
    Ok(Json(response))
}

/// PATCH /post/v1/post-comments/{id}
pub async fn update_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UpdateCommentRequest>,
) -> ApiResult<Json<CommentResponse>> {
    validation::bounded_text("comment", &req.comment, COMMENT_MAX_LEN)?;

    let db = state.db.clone();
    let response = run_blocking(move || {
        let id = comment_id.to_string();
        require_author(&load_comment(&db, &id)?, &user)?;
        db.update_comment(&id, &req.comment)?;
        single(&db, &user.id_str(), &id)
    })
    .await?;
    Ok(Json(response))
}

/// DELETE /post/v1/post-comments/{id}
pub async fn delete_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<StatusCode> {
    let db = state.db.clone();
    run_blocking(move || {
        let id = comment_id.to_string();
        require_author(&load_comment(&db, &id)?, &user)?;
        db.delete_comment(&id)?;
        Ok(())
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /post/v1/post-comments/{id}/like
pub async fn like_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<CommentResponse>> {
    let db = state.db.clone();
    let response = run_blocking(move || {
        let id = comment_id.to_string();
        let me = user.id_str();
        load_comment(&db, &id)?;
        db.like_comment(&id, &me)?;
        single(&db, &me, &id)
    })
    .await?;
    Ok(Json(response))
}

/// POST /post/v1/post-comments/{id}/unlike
pub async fn unlike_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<CommentResponse>> {
    let db = state.db.clone();
    let response = run_blocking(move || {
        let id = comment_id.to_string();
        let me = user.id_str();
        load_comment(&db, &id)?;
        db.unlike_comment(&id, &me)?;
        single(&db, &me, &id)
    })
    .await?;
    Ok(Json(response))
}
