use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{Row, params, params_from_iter};

use super::{OptionalExt, contains_pattern, placeholders};
use crate::Database;
use crate::models::{CommentFilter, CommentRow};

const COMMENT_SELECT: &str = "SELECT c.id, c.post_id, c.user_id, c.comment, c.parent_id, c.is_edited, c.date_created,
        (SELECT COUNT(*) FROM comment_likes l WHERE l.comment_id = c.id),
        (SELECT COUNT(*) FROM post_comments r WHERE r.parent_id = c.id)
     FROM post_comments c";

impl Database {
    // -- Comments --

    pub fn insert_comment(
        &self,
        id: &str,
        post_id: &str,
        user_id: &str,
        comment: &str,
        parent_id: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO post_comments (id, post_id, user_id, comment, parent_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, post_id, user_id, comment, parent_id],
            )?;
            Ok(())
        })
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("{} WHERE c.id = ?1", COMMENT_SELECT),
                [id],
                map_comment,
            )
            .optional()
        })
    }

    /// Filtered comments, newest first unless `oldest_first` is set.
    pub fn list_comments(&self, filter: &CommentFilter) -> Result<Vec<CommentRow>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(post_id) = &filter.post_id {
            values.push(Value::Text(post_id.clone()));
            clauses.push(format!("c.post_id = ?{}", values.len()));
        }
        if let Some(parent_id) = &filter.parent_id {
            values.push(Value::Text(parent_id.clone()));
            clauses.push(format!("c.parent_id = ?{}", values.len()));
        }
        match filter.null_parent {
            Some(true) => clauses.push("c.parent_id IS NULL".into()),
            Some(false) => clauses.push("c.parent_id IS NOT NULL".into()),
            None => {}
        }
        if let Some(search) = &filter.search {
            values.push(Value::Text(contains_pattern(search)));
            clauses.push(format!("c.comment LIKE ?{} ESCAPE '\\'", values.len()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let order = if filter.oldest_first { "ASC" } else { "DESC" };
        let sql = format!(
            "{}{} ORDER BY c.date_created {order}, c.rowid {order}",
            COMMENT_SELECT, where_sql
        );

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(values.iter()), map_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_comment(&self, id: &str, comment: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE post_comments SET comment = ?2, is_edited = 1 WHERE id = ?1",
                params![id, comment],
            )?;
            Ok(())
        })
    }

    /// Deletes the comment and, through the foreign key, its replies.
    pub fn delete_comment(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM post_comments WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    // -- Comment likes --

    pub fn like_comment(&self, comment_id: &str, user_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO comment_likes (comment_id, user_id) VALUES (?1, ?2)",
                params![comment_id, user_id],
            )?;
            Ok(())
        })
    }

    pub fn unlike_comment(&self, comment_id: &str, user_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "DELETE FROM comment_likes WHERE comment_id = ?1 AND user_id = ?2",
                params![comment_id, user_id],
            )?;
            Ok(())
        })
    }

    pub fn liked_comment_ids(&self, user_id: &str, comment_ids: &[String]) -> Result<Vec<String>> {
        if comment_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT comment_id FROM comment_likes WHERE user_id = ?1 AND comment_id IN ({})",
                placeholders(2, comment_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut values: Vec<&str> = Vec::with_capacity(comment_ids.len() + 1);
            values.push(user_id);
            values.extend(comment_ids.iter().map(String::as_str));
            let ids = stmt
                .query_map(params_from_iter(values), |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        user_id: row.get(2)?,
        comment: row.get(3)?,
        parent_id: row.get(4)?,
        is_edited: row.get(5)?,
        date_created: row.get(6)?,
        likes_count: row.get(7)?,
        replies_count: row.get(8)?,
    })
}
