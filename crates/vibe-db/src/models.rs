/// Database row types. These map directly to SQLite rows and stay
/// independent of the vibe-types API models.

#[derive(Debug, Clone)]
pub struct AccountRow {
    pub id: String,
    pub username: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub activation_otp: String,
    pub token: String,
    pub token_reason: String,
    pub last_login: Option<String>,
    pub date_joined: String,
}

/// Input for account creation. The account always starts inactive.
pub struct NewAccount<'a> {
    pub id: &'a str,
    pub username: Option<&'a str>,
    pub phone_number: &'a str,
    pub email: Option<&'a str>,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password_hash: &'a str,
}

/// Account fields needed to render a user summary.
#[derive(Debug, Clone)]
pub struct UserSummaryRow {
    pub id: String,
    pub username: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: Option<String>,
}

pub struct ProfileRow {
    pub user_id: String,
    pub about: String,
    pub profile_picture: Option<String>,
    pub cover_picture: Option<String>,
    pub date_created: String,
}

#[derive(Debug, Clone)]
pub struct FollowRow {
    pub id: String,
    pub user_id: String,
    pub follower_id: String,
    pub is_removed: bool,
    pub date_created: String,
}

pub struct GroupRow {
    pub id: String,
    pub name: String,
    pub admin_id: String,
    pub date_created: String,
}

pub struct CommunityRow {
    pub id: String,
    pub name: String,
    pub admin_id: String,
    pub date_created: String,
    pub announcement_id: String,
    pub announcement_name: String,
    pub announcement_created: String,
}

pub struct AnnouncementRow {
    pub id: String,
    pub name: String,
    pub community_id: String,
    pub community_admin_id: String,
}

#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: String,
    pub text: Option<String>,
    pub user_id: String,
    pub shared_from: Option<String>,
    pub post_type: String,
    pub group_id: Option<String>,
    pub announcement_id: Option<String>,
    pub is_edited: bool,
    pub date_created: String,
    pub likes_count: i64,
    pub comment_count: i64,
    pub shares_count: i64,
}

pub struct NewPost<'a> {
    pub id: &'a str,
    pub text: Option<&'a str>,
    pub user_id: &'a str,
    pub shared_from: Option<&'a str>,
    pub post_type: &'a str,
    pub group_id: Option<&'a str>,
    pub announcement_id: Option<&'a str>,
}

/// Post listing filters. Unset fields do not constrain the result.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub user_id: Option<String>,
    pub post_type: Option<String>,
    pub group_id: Option<String>,
    pub announcement_id: Option<String>,
    pub shared_from: Option<String>,
    pub search: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub before: Option<PostCursor>,
    pub limit: u32,
}

/// Position of the last post on a feed page. Feeds sort by
/// `(date_created, id)` descending, so the pair is unique.
#[derive(Debug, Clone)]
pub struct PostCursor {
    pub date_created: String,
    pub id: String,
}

#[derive(Debug, Clone)]
pub struct PictureRow {
    pub id: String,
    pub post_id: String,
    pub image: String,
    pub date_created: String,
}

#[derive(Debug, Clone)]
pub struct VideoRow {
    pub id: String,
    pub user_id: String,
    pub post_id: Option<String>,
    pub video: String,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
    pub date_created: String,
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub comment: String,
    pub parent_id: Option<String>,
    pub is_edited: bool,
    pub date_created: String,
    pub likes_count: i64,
    pub replies_count: i64,
}

#[derive(Debug, Clone, Default)]
pub struct CommentFilter {
    pub post_id: Option<String>,
    pub parent_id: Option<String>,
    /// `Some(true)`: top-level comments only. `Some(false)`: replies only.
    pub null_parent: Option<bool>,
    pub search: Option<String>,
    pub oldest_first: bool,
}
