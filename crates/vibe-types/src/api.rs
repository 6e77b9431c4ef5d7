use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{PostType, TokenType};

// -- JWT Claims --

/// JWT claims shared by the token issuer and the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub token_type: TokenType,
    pub exp: usize,
    pub iat: usize,
    pub jti: Uuid,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub phone_number: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivateRequest {
    pub phone_number: String,
    pub otp: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResendOtpRequest {
    pub phone_number: String,
}

/// Login by phone number or username. At least one identifier is required.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyTokenRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub username: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub date_joined: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AccountWithTokens {
    #[serde(flatten)]
    pub account: AccountResponse,
    pub access: String,
    pub refresh: String,
}

// -- Users & profiles --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateAccountRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateEmailRequest {
    pub email: String,
}

/// Compact account summary embedded in posts, comments and follow lists.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub fullname: String,
    pub username: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub profile_picture: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: Uuid,
    pub about: String,
    pub profile_picture: Option<String>,
    pub cover_picture: Option<String>,
    pub date_created: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub about: String,
}

// -- Follows --

#[derive(Debug, Serialize)]
pub struct FollowshipResponse {
    pub id: Uuid,
    pub user: UserInfo,
    pub follower: UserInfo,
}

// -- Groups & communities --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupNameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MembersRequest {
    #[serde(default)]
    pub members: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct GroupResponse {
    pub id: Uuid,
    pub name: String,
    pub admin: Uuid,
    pub members: Vec<Uuid>,
    pub date_created: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupsRequest {
    #[serde(default)]
    pub groups: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct AnnouncementResponse {
    pub id: Uuid,
    pub name: String,
    pub date_created: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CommunityResponse {
    pub id: Uuid,
    pub name: String,
    pub admin: Uuid,
    pub groups: Vec<Uuid>,
    pub announcement: AnnouncementResponse,
    pub date_created: DateTime<Utc>,
}

// -- Posts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub post_type: PostType,
    #[serde(default)]
    pub group: Option<Uuid>,
    #[serde(default)]
    pub announcement: Option<Uuid>,
    /// Ids of previously uploaded videos to attach to the post.
    #[serde(default)]
    pub videos: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePostRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub post_type: Option<PostType>,
    #[serde(default)]
    pub videos: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SharePostRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub post_type: PostType,
}

#[derive(Debug, Clone, Serialize)]
pub struct PictureResponse {
    pub id: Uuid,
    pub image: String,
    pub post: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoResponse {
    pub id: Uuid,
    pub post: Option<Uuid>,
    pub video: String,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
    pub date_created: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteMediaRequest {
    #[serde(default)]
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct DetailResponse {
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub text: Option<String>,
    pub user: Uuid,
    pub user_account: UserInfo,
    pub liked: bool,
    pub likes_count: i64,
    pub comment_count: i64,
    pub pictures: Vec<PictureResponse>,
    pub videos: Vec<VideoResponse>,
    pub post_type: PostType,
    pub group: Option<Uuid>,
    pub announcement: Option<Uuid>,
    pub shares_count: i64,
    pub shared_from: Option<Box<PostResponse>>,
    pub is_edited: bool,
    pub date_created: DateTime<Utc>,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub post: Uuid,
    pub comment: String,
    #[serde(default)]
    pub parent: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCommentRequest {
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub post: Uuid,
    pub user: Uuid,
    pub user_account: UserInfo,
    pub comment: String,
    pub parent: Option<Uuid>,
    pub date_created: DateTime<Utc>,
    pub is_edited: bool,
    pub liked: bool,
    pub likes_count: i64,
    pub replies_count: i64,
}

// -- Misc --

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}
