use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use vibe_types::api::HealthResponse;

use crate::middleware::{no_cache, require_auth};
use crate::state::AppState;
use crate::storage::MAX_UPLOAD_SIZE;
use crate::{auth, comments, communities, follows, groups, media, posts, users};

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
    })
}

/// Build the full application router.
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/v1/register", post(auth::register))
        .route("/auth/v1/register/activate", post(auth::activate))
        .route("/auth/v1/register/resend-otp", post(auth::resend_otp))
        .route("/auth/v1/token", post(auth::login))
        .route("/auth/v1/token/refresh", post(auth::refresh))
        .route("/auth/v1/token/verify", post(auth::verify))
        .route("/auth/v1/users", get(users::list_users))
        .route("/auth/v1/users/{id}", get(users::get_user))
        .route("/auth/v1/users/{id}/profile", get(users::get_profile))
        .route("/auth/v1/users/{id}/followers", get(follows::followers))
        .route("/auth/v1/users/{id}/following", get(follows::following))
        .with_state(state.clone());

    let protected_routes = Router::new()
        // Accounts & profiles
        .route("/auth/v1/users/whoami", get(users::whoami))
        .route("/auth/v1/users/me", patch(users::update_me))
        .route("/auth/v1/users/update-email", post(users::update_email))
        .route("/auth/v1/update-profile", patch(users::update_profile))
        .route("/auth/v1/update-profile-image", put(users::update_profile_image))
        .route("/auth/v1/update-cover-image", put(users::update_cover_image))
        .route("/auth/v1/user-followership/{id}/follow", post(follows::follow))
        .route("/auth/v1/user-followership/{id}/unfollow", post(follows::unfollow))
        // Groups
        .route("/community/v1/groups", post(groups::create_group).get(groups::list_groups))
        .route(
            "/community/v1/groups/{id}",
            get(groups::get_group)
                .patch(groups::rename_group)
                .delete(groups::delete_group),
        )
        .route("/community/v1/groups/{id}/join", post(groups::join_group))
        .route("/community/v1/groups/{id}/leave", post(groups::leave_group))
        .route("/community/v1/groups/{id}/add-members", post(groups::add_members))
        .route("/community/v1/groups/{id}/remove-members", post(groups::remove_members))
        .route("/community/v1/groups/{id}/members", get(groups::get_members))
        // Communities
        .route(
            "/community/v1/communities",
            post(communities::create_community).get(communities::list_communities),
        )
        .route("/community/v1/communities/{id}", get(communities::get_community))
        .route("/community/v1/communities/{id}/add-groups", post(communities::add_groups))
        .route("/community/v1/communities/{id}/remove-groups", post(communities::remove_groups))
        .route("/community/v1/communities/{id}/groups", get(communities::get_groups))
        // Posts
        .route("/post/v1/posts", post(posts::create_post).get(posts::list_posts))
        .route("/post/v1/posts/video", get(posts::video_feed))
        .route(
            "/post/v1/posts/{id}",
            get(posts::get_post)
                .patch(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/post/v1/posts/{id}/like", post(posts::like_post))
        .route("/post/v1/posts/{id}/unlike", post(posts::unlike_post))
        .route("/post/v1/posts/{id}/share", post(posts::share_post))
        .route("/post/v1/posts/{id}/pictures", post(media::upload_picture))
        // Media
        .route("/post/v1/posts-pics", get(media::list_pictures))
        .route("/post/v1/posts-pics/delete", post(media::delete_pictures))
        .route("/post/v1/post-video", post(media::upload_video).get(media::list_videos))
        .route("/post/v1/post-video/delete", post(media::delete_videos))
        .route("/post/v1/post-video/{id}", get(media::get_video))
        .route("/post/v1/post-video/{id}/thumbnail", put(media::upload_thumbnail))
        // Comments
        .route(
            "/post/v1/post-comments",
            post(comments::create_comment).get(comments::list_comments),
        )
        .route(
            "/post/v1/post-comments/{id}",
            get(comments::get_comment)
                .patch(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .route("/post/v1/post-comments/{id}/like", post(comments::like_comment))
        .route("/post/v1/post-comments/{id}/unlike", post(comments::unlike_comment))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/media", ServeDir::new(state.media.root()))
        .layer(middleware::from_fn(no_cache))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
