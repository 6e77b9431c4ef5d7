//! Post pictures and videos. Uploads are raw request bodies.

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use vibe_db::Database;
use vibe_db::models::VideoRow;
use vibe_types::api::{DeleteMediaRequest, DetailResponse, PictureResponse, VideoResponse};

use crate::convert;
use crate::error::{ApiError, ApiResult, run_blocking};
use crate::middleware::CurrentUser;
use crate::posts::load_post;
use crate::state::AppState;
use crate::storage::MediaKind;

#[derive(Debug, Deserialize)]
pub struct MediaQuery {
    pub post: Option<Uuid>,
    pub user: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct VideoUploadQuery {
    pub post: Option<Uuid>,
    pub duration: Option<f64>,
}

fn owned_post(db: &Database, post_id: &str, user: &CurrentUser) -> ApiResult<()> {
    let post = load_post(db, post_id)?;
    if post.user_id != user.id_str() {
        return Err(ApiError::forbidden("You can only add media to your own posts"));
    }
    Ok(())
}

fn load_video(db: &Database, id: &str) -> ApiResult<VideoRow> {
    db.get_video(id)?
        .ok_or_else(|| ApiError::not_found("Video not found"))
}

fn id_strings(ids: &[Uuid]) -> Vec<String> {
    ids.iter().map(Uuid::to_string).collect()
}

// -- Pictures --

/// POST /post/v1/posts/{id}/pictures
pub async fn upload_picture(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
    bytes: Bytes,
) -> ApiResult<impl IntoResponse> {
    let db = state.db.clone();
    let check_user = user.clone();
    run_blocking(move || owned_post(&db, &post_id.to_string(), &check_user)).await?;

    let path = state.media.save(MediaKind::PostPicture, &bytes).await?;

    let db = state.db.clone();
    let stored = path.clone();
    let result = run_blocking(move || {
        let id = Uuid::new_v4().to_string();
        let post = post_id.to_string();
        db.insert_picture(&id, &post, &stored)?;
        db.list_pictures_for_posts(&[post])?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| ApiError::Internal(format!("Picture {} missing after insert", id)))
    })
    .await;
    let picture = state.media.discard_on_error(&path, result).await?;

    Ok((StatusCode::CREATED, Json(convert::picture(&picture))))
}

/// GET /post/v1/posts-pics?post=&user=
pub async fn list_pictures(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<MediaQuery>,
) -> ApiResult<Json<Vec<PictureResponse>>> {
    let db = state.db.clone();
    let rows = run_blocking(move || {
        Ok(match (query.post, query.user) {
            (Some(post), _) => db.list_pictures_for_posts(&[post.to_string()])?,
            (None, Some(owner)) => db.list_pictures_by_user(&owner.to_string())?,
            (None, None) => db.list_pictures_by_user(&user.id_str())?,
        })
    })
    .await?;
    Ok(Json(rows.iter().map(convert::picture).collect()))
}

/// POST /post/v1/posts-pics/delete
pub async fn delete_pictures(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<DeleteMediaRequest>,
) -> ApiResult<Json<DetailResponse>> {
    let db = state.db.clone();
    let paths = run_blocking(move || Ok(db.delete_pictures(&id_strings(&req.ids), &user.id_str())?)).await?;

    let count = paths.len();
    state.media.remove_all(&paths).await;
    Ok(Json(DetailResponse {
        detail: format!("Deleted {} pictures", count),
    }))
}

// -- Videos --

/// POST /post/v1/post-video?post=&duration=
pub async fn upload_video(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<VideoUploadQuery>,
    bytes: Bytes,
) -> ApiResult<impl IntoResponse> {
    if query.duration.is_some_and(|d| !d.is_finite() || d < 0.0) {
        return Err(ApiError::validation("duration must be a non-negative number"));
    }
    if let Some(post_id) = query.post {
        let db = state.db.clone();
        let check_user = user.clone();
        run_blocking(move || owned_post(&db, &post_id.to_string(), &check_user)).await?;
    }

    let path = state.media.save(MediaKind::PostVideo, &bytes).await?;

    let db = state.db.clone();
    let stored = path.clone();
    let result = run_blocking(move || {
        let id = Uuid::new_v4().to_string();
        let me = user.id_str();
        db.insert_video(&id, &me, &stored, query.duration)?;
        if let Some(post_id) = query.post {
            db.attach_videos(&post_id.to_string(), &[id.clone()], &me)?;
        }
        load_video(&db, &id)
    })
    .await;
    let video = state.media.discard_on_error(&path, result).await?;

    Ok((StatusCode::CREATED, Json(convert::video(&video))))
}

/// GET /post/v1/post-video?post=&user=
pub async fn list_videos(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<MediaQuery>,
) -> ApiResult<Json<Vec<VideoResponse>>> {
    let db = state.db.clone();
    let rows = run_blocking(move || {
        Ok(match (query.post, query.user) {
            (Some(post), _) => db.list_videos_for_posts(&[post.to_string()])?,
            (None, Some(owner)) => db.list_videos_by_user(&owner.to_string())?,
            (None, None) => db.list_videos_by_user(&user.id_str())?,
        })
    })
    .await?;
    Ok(Json(rows.iter().map(convert::video).collect()))
}

/// GET /post/v1/post-video/{id}
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<Uuid>,
) -> ApiResult<Json<VideoResponse>> {
    let db = state.db.clone();
    let video = run_blocking(move || load_video(&db, &video_id.to_string())).await?;
    Ok(Json(convert::video(&video)))
}

/// PUT /post/v1/post-video/{id}/thumbnail
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    Path(video_id): Path<Uuid>,
    Extension(user): Extension<CurrentUser>,
    bytes: Bytes,
) -> ApiResult<Json<VideoResponse>> {
    let db = state.db.clone();
    let me = user.id_str();
    let video = run_blocking(move || load_video(&db, &video_id.to_string())).await?;
    if video.user_id != me {
        return Err(ApiError::forbidden("You can only change thumbnails of your own videos"));
    }

    let path = state.media.save(MediaKind::Thumbnail, &bytes).await?;

    let db = state.db.clone();
    let stored = path.clone();
    let result = run_blocking(move || {
        let previous = db.set_video_thumbnail(&video.id, &stored)?;
        Ok((previous, load_video(&db, &video.id)?))
    })
    .await;
    let (previous, video) = state.media.discard_on_error(&path, result).await?;

    if let Some(previous) = previous {
        state.media.remove(&previous).await;
    }
    Ok(Json(convert::video(&video)))
}

/// POST /post/v1/post-video/delete
pub async fn delete_videos(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<DeleteMediaRequest>,
) -> ApiResult<Json<DetailResponse>> {
    let db = state.db.clone();
    let count = req.ids.len();
    let paths = run_blocking(move || Ok(db.delete_videos(&id_strings(&req.ids), &user.id_str())?)).await?;

    state.media.remove_all(&paths).await;
    Ok(Json(DetailResponse {
        detail: format!("Processed {} video ids", count),
    }))
}
