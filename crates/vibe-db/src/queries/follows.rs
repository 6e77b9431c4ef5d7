use anyhow::{Result, anyhow};
use rusqlite::{Connection, Row, params};

use super::OptionalExt;
use crate::Database;
use crate::models::FollowRow;

const FOLLOW_COLUMNS: &str = "id, user_id, follower_id, is_removed, date_created";

impl Database {
    // -- Follows --

    /// Create the edge `follower_id -> user_id`, or revive it if it was
    /// previously removed. Never produces a second row for the same pair.
    pub fn follow(&self, id: &str, user_id: &str, follower_id: &str) -> Result<FollowRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO user_followships (id, user_id, follower_id) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id, follower_id) DO UPDATE SET is_removed = 0",
                params![id, user_id, follower_id],
            )?;
            query_follow(conn, user_id, follower_id)?
                .ok_or_else(|| anyhow!("Follow edge missing after upsert"))
        })
    }

    /// Mark the edge removed. Returns false when there was no live edge.
    pub fn unfollow(&self, user_id: &str, follower_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE user_followships SET is_removed = 1
                 WHERE user_id = ?1 AND follower_id = ?2 AND is_removed = 0",
                params![user_id, follower_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_follow(&self, user_id: &str, follower_id: &str) -> Result<Option<FollowRow>> {
        self.with_conn(|conn| query_follow(conn, user_id, follower_id))
    }

    /// Live edges pointing at `user_id`, newest first.
    pub fn list_followers(&self, user_id: &str) -> Result<Vec<FollowRow>> {
        self.list_follows("user_id", user_id)
    }

    /// Live edges leaving `follower_id`, newest first.
    pub fn list_following(&self, follower_id: &str) -> Result<Vec<FollowRow>> {
        self.list_follows("follower_id", follower_id)
    }

    fn list_follows(&self, column: &str, value: &str) -> Result<Vec<FollowRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM user_followships
                 WHERE {} = ?1 AND is_removed = 0
                 ORDER BY date_created DESC, rowid DESC",
                FOLLOW_COLUMNS, column
            ))?;
            let rows = stmt
                .query_map([value], map_follow)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_follow(conn: &Connection, user_id: &str, follower_id: &str) -> Result<Option<FollowRow>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM user_followships WHERE user_id = ?1 AND follower_id = ?2",
            FOLLOW_COLUMNS
        ),
        params![user_id, follower_id],
        map_follow,
    )
    .optional()
}

fn map_follow(row: &Row<'_>) -> rusqlite::Result<FollowRow> {
    Ok(FollowRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        follower_id: row.get(2)?,
        is_removed: row.get(3)?,
        date_created: row.get(4)?,
    })
}
