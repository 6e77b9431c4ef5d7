use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{Connection, Row, params, params_from_iter};

use super::{OptionalExt, contains_pattern, placeholders};
use crate::Database;
use crate::models::{NewPost, PostFilter, PostRow};

const POST_SELECT: &str = "SELECT p.id, p.text, p.user_id, p.shared_from, p.post_type, p.group_id,
        p.announcement_id, p.is_edited, p.date_created,
        (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id),
        (SELECT COUNT(*) FROM post_comments c WHERE c.post_id = p.id),
        (SELECT COUNT(*) FROM posts s WHERE s.shared_from = p.id)
     FROM posts p";

impl Database {
    // -- Posts --

    pub fn insert_post(&self, post: &NewPost<'_>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (id, text, user_id, shared_from, post_type, group_id, announcement_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    post.id,
                    post.text,
                    post.user_id,
                    post.shared_from,
                    post.post_type,
                    post.group_id,
                    post.announcement_id,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| query_post(conn, id))
    }

    /// Fetch a post and every post it was transitively shared from,
    /// starting with the post itself.
    pub fn get_post_chain(&self, id: &str) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut chain = Vec::new();
            let mut next = Some(id.to_string());
            while let Some(current) = next.take() {
                if chain.iter().any(|p: &PostRow| p.id == current) {
                    break;
                }
                match query_post(conn, &current)? {
                    Some(post) => {
                        next = post.shared_from.clone();
                        chain.push(post);
                    }
                    None => break,
                }
            }
            Ok(chain)
        })
    }

    /// Filtered feed, newest first.
    pub fn list_posts(&self, filter: &PostFilter) -> Result<Vec<PostRow>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        let mut push = |clause: &str, value: Value| {
            values.push(value);
            clauses.push(clause.replace('?', &format!("?{}", values.len())));
        };

        if let Some(user_id) = &filter.user_id {
            push("p.user_id = ?", Value::Text(user_id.clone()));
        }
        if let Some(post_type) = &filter.post_type {
            push("p.post_type = ?", Value::Text(post_type.clone()));
        }
        if let Some(group_id) = &filter.group_id {
            push("p.group_id = ?", Value::Text(group_id.clone()));
        }
        if let Some(announcement_id) = &filter.announcement_id {
            push("p.announcement_id = ?", Value::Text(announcement_id.clone()));
        }
        if let Some(shared_from) = &filter.shared_from {
            push("p.shared_from = ?", Value::Text(shared_from.clone()));
        }
        if let Some(search) = &filter.search {
            push("p.text LIKE ? ESCAPE '\\'", Value::Text(contains_pattern(search)));
        }
        if let Some(year) = filter.year {
            push("CAST(strftime('%Y', p.date_created) AS INTEGER) = ?", Value::Integer(year as i64));
        }
        if let Some(month) = filter.month {
            push("CAST(strftime('%m', p.date_created) AS INTEGER) = ?", Value::Integer(month as i64));
        }
        if let Some(day) = filter.day {
            push("CAST(strftime('%d', p.date_created) AS INTEGER) = ?", Value::Integer(day as i64));
        }
        if let Some(before) = &filter.before {
            values.push(Value::Text(before.date_created.clone()));
            values.push(Value::Text(before.id.clone()));
            clauses.push(format!(
                "(p.date_created, p.id) < (?{}, ?{})",
                values.len() - 1,
                values.len()
            ));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        values.push(Value::Integer(filter.limit as i64));
        let sql = format!(
            "{}{} ORDER BY p.date_created DESC, p.id DESC LIMIT ?{}",
            POST_SELECT,
            where_sql,
            values.len()
        );

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(values.iter()), map_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Video posts that have at least one video attached, in random order.
    pub fn random_video_posts(&self, limit: u32) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE p.post_type = 'VideoPost'
                   AND EXISTS (SELECT 1 FROM post_videos v WHERE v.post_id = p.id)
                 ORDER BY RANDOM() LIMIT ?1",
                POST_SELECT
            ))?;
            let rows = stmt
                .query_map([limit], map_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Overwrite text and type and flag the post as edited.
    pub fn update_post(&self, id: &str, text: Option<&str>, post_type: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE posts SET text = ?2, post_type = ?3, is_edited = 1 WHERE id = ?1",
                params![id, text, post_type],
            )?;
            Ok(())
        })
    }

    pub fn delete_post(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Post likes --

    pub fn like_post(&self, post_id: &str, user_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO post_likes (post_id, user_id) VALUES (?1, ?2)",
                params![post_id, user_id],
            )?;
            Ok(())
        })
    }

    pub fn unlike_post(&self, post_id: &str, user_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
                params![post_id, user_id],
            )?;
            Ok(())
        })
    }

    /// Subset of `post_ids` liked by `user_id`.
    pub fn liked_post_ids(&self, user_id: &str, post_ids: &[String]) -> Result<Vec<String>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT post_id FROM post_likes WHERE user_id = ?1 AND post_id IN ({})",
                placeholders(2, post_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut values: Vec<&str> = Vec::with_capacity(post_ids.len() + 1);
            values.push(user_id);
            values.extend(post_ids.iter().map(String::as_str));
            let ids = stmt
                .query_map(params_from_iter(values), |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }
}

fn query_post(conn: &Connection, id: &str) -> Result<Option<PostRow>> {
    conn.query_row(&format!("{} WHERE p.id = ?1", POST_SELECT), [id], map_post)
        .optional()
}

fn map_post(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        text: row.get(1)?,
        user_id: row.get(2)?,
        shared_from: row.get(3)?,
        post_type: row.get(4)?,
        group_id: row.get(5)?,
        announcement_id: row.get(6)?,
        is_edited: row.get(7)?,
        date_created: row.get(8)?,
        likes_count: row.get(9)?,
        comment_count: row.get(10)?,
        shares_count: row.get(11)?,
    })
}
