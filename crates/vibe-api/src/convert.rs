//! Row to response conversions.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use vibe_db::Database;
use vibe_db::models::{
    AccountRow, CommentRow, CommunityRow, GroupRow, PictureRow, PostRow, ProfileRow, UserSummaryRow,
    VideoRow,
};
use vibe_types::api::{
    AccountResponse, AnnouncementResponse, CommentResponse, CommunityResponse, GroupResponse,
    PictureResponse, PostResponse, ProfileResponse, UserInfo, VideoResponse,
};
use vibe_types::models::PostType;

use crate::error::ApiResult;

pub fn uuid(raw: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}': {}", raw, e);
        Uuid::default()
    })
}

pub fn uuids(raw: &[String]) -> Vec<Uuid> {
    raw.iter().map(|r| uuid(r)).collect()
}

/// SQLite stores "YYYY-MM-DD HH:MM:SS.SSS" without a zone. Read it as UTC.
pub fn timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").map(|ndt| ndt.and_utc()))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

pub fn media_url(path: &str) -> String {
    format!("/media/{}", path)
}

pub fn account(row: &AccountRow) -> AccountResponse {
    AccountResponse {
        id: uuid(&row.id),
        username: row.username.clone(),
        phone_number: row.phone_number.clone(),
        email: row.email.clone(),
        first_name: row.first_name.clone(),
        last_name: row.last_name.clone(),
        is_active: row.is_active,
        is_staff: row.is_staff,
        is_superuser: row.is_superuser,
        last_login: row.last_login.as_deref().map(timestamp),
        date_joined: timestamp(&row.date_joined),
    }
}

pub fn user_info(row: &UserSummaryRow) -> UserInfo {
    let fullname = format!("{} {}", row.first_name, row.last_name).trim().to_string();
    UserInfo {
        id: uuid(&row.id),
        fullname,
        username: row.username.clone(),
        phone_number: row.phone_number.clone(),
        email: row.email.clone(),
        profile_picture: row.profile_picture.as_deref().map(media_url).unwrap_or_default(),
    }
}

pub fn profile(row: &ProfileRow) -> ProfileResponse {
    ProfileResponse {
        user: uuid(&row.user_id),
        about: row.about.clone(),
        profile_picture: row.profile_picture.as_deref().map(media_url),
        cover_picture: row.cover_picture.as_deref().map(media_url),
        date_created: timestamp(&row.date_created),
    }
}

pub fn group(row: &GroupRow, members: &[String]) -> GroupResponse {
    GroupResponse {
        id: uuid(&row.id),
        name: row.name.clone(),
        admin: uuid(&row.admin_id),
        members: uuids(members),
        date_created: timestamp(&row.date_created),
    }
}

pub fn community(row: &CommunityRow, groups: &[String]) -> CommunityResponse {
    CommunityResponse {
        id: uuid(&row.id),
        name: row.name.clone(),
        admin: uuid(&row.admin_id),
        groups: uuids(groups),
        announcement: AnnouncementResponse {
            id: uuid(&row.announcement_id),
            name: row.announcement_name.clone(),
            date_created: timestamp(&row.announcement_created),
        },
        date_created: timestamp(&row.date_created),
    }
}

pub fn picture(row: &PictureRow) -> PictureResponse {
    PictureResponse {
        id: uuid(&row.id),
        image: media_url(&row.image),
        post: uuid(&row.post_id),
    }
}

pub fn video(row: &VideoRow) -> VideoResponse {
    VideoResponse {
        id: uuid(&row.id),
        post: row.post_id.as_deref().map(uuid),
        video: media_url(&row.video),
        thumbnail: row.thumbnail.as_deref().map(media_url),
        duration: row.duration,
        date_created: timestamp(&row.date_created),
    }
}

/// Batch-load user summaries keyed by id.
pub fn user_infos(db: &Database, ids: &[String]) -> ApiResult<HashMap<String, UserInfo>> {
    let unique: Vec<String> = ids.iter().cloned().collect::<HashSet<_>>().into_iter().collect();
    Ok(db
        .get_user_summaries(&unique)?
        .iter()
        .map(|row| (row.id.clone(), user_info(row)))
        .collect())
}

fn lookup_user(users: &HashMap<String, UserInfo>, id: &str) -> UserInfo {
    users.get(id).cloned().unwrap_or_else(|| {
        warn!("Missing user summary for '{}'", id);
        UserInfo {
            id: uuid(id),
            fullname: String::new(),
            username: String::new(),
            phone_number: String::new(),
            email: None,
            profile_picture: String::new(),
        }
    })
}

/// Assemble full post responses for `viewer`, including pictures, videos,
/// like state and the chain of posts each one was shared from.
pub fn posts(db: &Database, viewer: &str, rows: Vec<PostRow>) -> ApiResult<Vec<PostResponse>> {
    let order: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let mut all: HashMap<String, PostRow> = HashMap::new();
    let mut pending: Vec<String> = Vec::new();
    for row in rows {
        if let Some(src) = &row.shared_from {
            pending.push(src.clone());
        }
        all.insert(row.id.clone(), row);
    }
    for src in pending {
        if all.contains_key(&src) {
            continue;
        }
        for row in db.get_post_chain(&src)? {
            all.entry(row.id.clone()).or_insert(row);
        }
    }

    let ids: Vec<String> = all.keys().cloned().collect();
    let user_ids: Vec<String> = all.values().map(|r| r.user_id.clone()).collect();
    let users = user_infos(db, &user_ids)?;
    let liked: HashSet<String> = db.liked_post_ids(viewer, &ids)?.into_iter().collect();

    let mut pictures: HashMap<String, Vec<PictureResponse>> = HashMap::new();
    for row in db.list_pictures_for_posts(&ids)? {
        pictures.entry(row.post_id.clone()).or_default().push(picture(&row));
    }
    let mut videos: HashMap<String, Vec<VideoResponse>> = HashMap::new();
    for row in db.list_videos_for_posts(&ids)? {
        if let Some(post_id) = &row.post_id {
            videos.entry(post_id.clone()).or_default().push(video(&row));
        }
    }

    let ctx = PostContext {
        all: &all,
        users: &users,
        liked: &liked,
        pictures: &pictures,
        videos: &videos,
    };
    Ok(order
        .iter()
        .filter_map(|id| ctx.build(id, &mut HashSet::new()))
        .collect())
}

struct PostContext<'a> {
    all: &'a HashMap<String, PostRow>,
    users: &'a HashMap<String, UserInfo>,
    liked: &'a HashSet<String>,
    pictures: &'a HashMap<String, Vec<PictureResponse>>,
    videos: &'a HashMap<String, Vec<VideoResponse>>,
}

impl PostContext<'_> {
    fn build(&self, id: &str, seen: &mut HashSet<String>) -> Option<PostResponse> {
        if !seen.insert(id.to_string()) {
            return None;
        }
        let row = self.all.get(id)?;
        let shared_from = row
            .shared_from
            .as_deref()
            .and_then(|src| self.build(src, seen))
            .map(Box::new);

        Some(PostResponse {
            id: uuid(&row.id),
            text: row.text.clone(),
            user: uuid(&row.user_id),
            user_account: lookup_user(self.users, &row.user_id),
            liked: self.liked.contains(&row.id),
            likes_count: row.likes_count,
            comment_count: row.comment_count,
            pictures: self.pictures.get(&row.id).cloned().unwrap_or_default(),
            videos: self.videos.get(&row.id).cloned().unwrap_or_default(),
            post_type: row.post_type.parse().unwrap_or_else(|e| {
                warn!("Corrupt post_type on post '{}': {}", row.id, e);
                PostType::default()
            }),
            group: row.group_id.as_deref().map(uuid),
            announcement: row.announcement_id.as_deref().map(uuid),
            shares_count: row.shares_count,
            shared_from,
            is_edited: row.is_edited,
            date_created: timestamp(&row.date_created),
        })
    }
}

pub fn comments(db: &Database, viewer: &str, rows: Vec<CommentRow>) -> ApiResult<Vec<CommentResponse>> {
    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let user_ids: Vec<String> = rows.iter().map(|r| r.user_id.clone()).collect();
    let users = user_infos(db, &user_ids)?;
    let liked: HashSet<String> = db.liked_comment_ids(viewer, &ids)?.into_iter().collect();

    Ok(rows
        .into_iter()
        .map(|row| CommentResponse {
            id: uuid(&row.id),
            post: uuid(&row.post_id),
            user: uuid(&row.user_id),
            user_account: lookup_user(&users, &row.user_id),
            liked: liked.contains(&row.id),
            comment: row.comment,
            parent: row.parent_id.as_deref().map(uuid),
            date_created: timestamp(&row.date_created),
            is_edited: row.is_edited,
            likes_count: row.likes_count,
            replies_count: row.replies_count,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn sqlite_timestamps_parse_as_utc() {
        let ts = timestamp("2024-03-05 14:07:09.123");
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 3, 5));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (14, 7, 9));

        let plain = timestamp("2024-03-05 14:07:09");
        assert_eq!(plain.second(), 9);
    }

    #[test]
    fn corrupt_values_fall_back_to_defaults() {
        assert_eq!(uuid("not-a-uuid"), Uuid::default());
        assert_eq!(timestamp("yesterday"), DateTime::<Utc>::default());
    }

    #[test]
    fn fullname_trims_missing_parts() {
        let row = UserSummaryRow {
            id: Uuid::new_v4().to_string(),
            username: "ama".into(),
            phone_number: "0551234567".into(),
            email: None,
            first_name: "Ama".into(),
            last_name: String::new(),
            profile_picture: Some("profile_pictures/x".into()),
        };
        let info = user_info(&row);
        assert_eq!(info.fullname, "Ama");
        assert_eq!(info.profile_picture, "/media/profile_pictures/x");
    }
}
