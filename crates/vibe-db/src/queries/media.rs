use anyhow::Result;
use rusqlite::{Row, params, params_from_iter};

use super::{OptionalExt, placeholders, to_sql_params};
use crate::Database;
use crate::models::{PictureRow, VideoRow};

const VIDEO_COLUMNS: &str = "id, user_id, post_id, video, thumbnail, duration, date_created";

impl Database {
    // -- Pictures --

    pub fn insert_picture(&self, id: &str, post_id: &str, image: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO post_pictures (id, post_id, image) VALUES (?1, ?2, ?3)",
                params![id, post_id, image],
            )?;
            Ok(())
        })
    }

    /// Pictures attached to any of `post_ids`, oldest first.
    pub fn list_pictures_for_posts(&self, post_ids: &[String]) -> Result<Vec<PictureRow>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT id, post_id, image, date_created FROM post_pictures
                 WHERE post_id IN ({}) ORDER BY date_created, rowid",
                placeholders(1, post_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(to_sql_params(post_ids).as_slice(), map_picture)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Pictures on posts authored by `user_id`, newest first.
    pub fn list_pictures_by_user(&self, user_id: &str) -> Result<Vec<PictureRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT pp.id, pp.post_id, pp.image, pp.date_created
                 FROM post_pictures pp
                 JOIN posts p ON p.id = pp.post_id
                 WHERE p.user_id = ?1
                 ORDER BY pp.date_created DESC, pp.rowid DESC",
            )?;
            let rows = stmt
                .query_map([user_id], map_picture)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Delete pictures among `ids` that sit on posts owned by `user_id`.
    /// Returns the stored paths of the deleted rows.
    pub fn delete_pictures(&self, ids: &[String], user_id: &str) -> Result<Vec<String>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let owned = format!(
                "FROM post_pictures WHERE id IN ({}) AND post_id IN (SELECT id FROM posts WHERE user_id = ?1)",
                placeholders(2, ids.len())
            );
            let mut values: Vec<&str> = Vec::with_capacity(ids.len() + 1);
            values.push(user_id);
            values.extend(ids.iter().map(String::as_str));

            let paths = {
                let mut stmt = tx.prepare(&format!("SELECT image {}", owned))?;
                stmt.query_map(params_from_iter(values.iter()), |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            };
            tx.execute(&format!("DELETE {}", owned), params_from_iter(values.iter()))?;
            tx.commit()?;
            Ok(paths)
        })
    }

    // -- Videos --

    /// Store an uploaded video. It stays unattached until a post claims it.
    pub fn insert_video(&self, id: &str, user_id: &str, video: &str, duration: Option<f64>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO post_videos (id, user_id, video, duration) VALUES (?1, ?2, ?3, ?4)",
                params![id, user_id, video, duration],
            )?;
            Ok(())
        })
    }

    pub fn set_video_thumbnail(&self, id: &str, thumbnail: &str) -> Result<Option<String>> {
        self.with_conn_mut(|conn| {
            let previous: Option<String> = conn
                .query_row(
                    "SELECT thumbnail FROM post_videos WHERE id = ?1",
                    [id],
                    |row| row.get::<_, Option<String>>(0),
                )
                .optional()?
                .flatten();
            conn.execute(
                "UPDATE post_videos SET thumbnail = ?2 WHERE id = ?1",
                params![id, thumbnail],
            )?;
            Ok(previous)
        })
    }

    pub fn get_video(&self, id: &str) -> Result<Option<VideoRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {} FROM post_videos WHERE id = ?1", VIDEO_COLUMNS),
                [id],
                map_video,
            )
            .optional()
        })
    }

    /// Videos uploaded by `user_id`, newest first.
    pub fn list_videos_by_user(&self, user_id: &str) -> Result<Vec<VideoRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM post_videos WHERE user_id = ?1
                 ORDER BY date_created DESC, rowid DESC",
                VIDEO_COLUMNS
            ))?;
            let rows = stmt
                .query_map([user_id], map_video)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Videos attached to any of `post_ids`, oldest first.
    pub fn list_videos_for_posts(&self, post_ids: &[String]) -> Result<Vec<VideoRow>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM post_videos WHERE post_id IN ({}) ORDER BY date_created, rowid",
                VIDEO_COLUMNS,
                placeholders(1, post_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(to_sql_params(post_ids).as_slice(), map_video)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Point videos owned by `user_id` at `post_id`. Ids owned by someone
    /// else or unknown are left untouched. Returns how many were attached.
    pub fn attach_videos(&self, post_id: &str, video_ids: &[String], user_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let mut attached = 0;
            for video_id in video_ids {
                attached += tx.execute(
                    "UPDATE post_videos SET post_id = ?1 WHERE id = ?2 AND user_id = ?3",
                    params![post_id, video_id, user_id],
                )?;
            }
            tx.commit()?;
            Ok(attached)
        })
    }

    /// Delete videos among `ids` uploaded by `user_id`. Returns the stored
    /// video and thumbnail paths of the deleted rows.
    pub fn delete_videos(&self, ids: &[String], user_id: &str) -> Result<Vec<String>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let owned = format!(
                "FROM post_videos WHERE user_id = ?1 AND id IN ({})",
                placeholders(2, ids.len())
            );
            let mut values: Vec<&str> = Vec::with_capacity(ids.len() + 1);
            values.push(user_id);
            values.extend(ids.iter().map(String::as_str));

            let mut paths = Vec::new();
            {
                let mut stmt = tx.prepare(&format!("SELECT video, thumbnail {}", owned))?;
                let mut rows = stmt.query(params_from_iter(values.iter()))?;
                while let Some(row) = rows.next()? {
                    paths.push(row.get::<_, String>(0)?);
                    if let Some(thumb) = row.get::<_, Option<String>>(1)? {
                        paths.push(thumb);
                    }
                }
            }
            tx.execute(&format!("DELETE {}", owned), params_from_iter(values.iter()))?;
            tx.commit()?;
            Ok(paths)
        })
    }
}

fn map_picture(row: &Row<'_>) -> rusqlite::Result<PictureRow> {
    Ok(PictureRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        image: row.get(2)?,
        date_created: row.get(3)?,
    })
}

fn map_video(row: &Row<'_>) -> rusqlite::Result<VideoRow> {
    Ok(VideoRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        post_id: row.get(2)?,
        video: row.get(3)?,
        thumbnail: row.get(4)?,
        duration: row.get(5)?,
        date_created: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{account, db};
    use crate::models::NewPost;

    fn post(db: &crate::Database, id: &str, user_id: &str) {
        db.insert_post(&NewPost {
            id,
            text: None,
            user_id,
            shared_from: None,
            post_type: "VisualPost",
            group_id: None,
            announcement_id: None,
        })
        .unwrap();
    }

    #[test]
    fn pictures_are_deleted_only_by_post_owner() {
        let db = db();
        account(&db, "a", "0551111111");
        account(&db, "b", "0552222222");
        post(&db, "p1", "a");
        db.insert_picture("pic1", "p1", "post_pictures/pic1").unwrap();

        assert!(db.delete_pictures(&["pic1".to_string()], "b").unwrap().is_empty());
        assert_eq!(db.list_pictures_for_posts(&["p1".to_string()]).unwrap().len(), 1);

        let paths = db.delete_pictures(&["pic1".to_string()], "a").unwrap();
        assert_eq!(paths, vec!["post_pictures/pic1".to_string()]);
        assert!(db.list_pictures_by_user("a").unwrap().is_empty());
    }

    #[test]
    fn videos_attach_to_owner_posts() {
        let db = db();
        account(&db, "a", "0551111111");
        account(&db, "b", "0552222222");
        post(&db, "p1", "a");
        db.insert_video("v1", "a", "post_videos/v1", Some(12.5)).unwrap();
        db.insert_video("v2", "b", "post_videos/v2", None).unwrap();

        let attached = db
            .attach_videos("p1", &["v1".to_string(), "v2".to_string()], "a")
            .unwrap();
        assert_eq!(attached, 1);
        let videos = db.list_videos_for_posts(&["p1".to_string()]).unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].duration, Some(12.5));
        assert_eq!(db.get_video("v2").unwrap().unwrap().post_id, None);
    }

    #[test]
    fn deleting_a_video_returns_its_thumbnail_too() {
        let db = db();
        account(&db, "a", "0551111111");
        db.insert_video("v1", "a", "post_videos/v1", None).unwrap();
        assert_eq!(db.set_video_thumbnail("v1", "thumbnails/v1").unwrap(), None);

        let paths = db.delete_videos(&["v1".to_string()], "a").unwrap();
        assert_eq!(paths, vec!["post_videos/v1".to_string(), "thumbnails/v1".to_string()]);
        assert!(db.get_video("v1").unwrap().is_none());
    }
}
