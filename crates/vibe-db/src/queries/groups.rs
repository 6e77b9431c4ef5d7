use anyhow::Result;
use rusqlite::{Row, params};

use super::OptionalExt;
use crate::Database;
use crate::models::GroupRow;

impl Database {
    // -- Groups --

    /// Create a group administered by `admin_id`, who also becomes its first member.
    pub fn create_group(&self, id: &str, name: &str, admin_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO user_groups (id, name, admin_id) VALUES (?1, ?2, ?3)",
                params![id, name, admin_id],
            )?;
            tx.execute(
                "INSERT INTO group_members (group_id, user_id) VALUES (?1, ?2)",
                params![id, admin_id],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_group(&self, id: &str) -> Result<Option<GroupRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, admin_id, date_created FROM user_groups WHERE id = ?1",
                [id],
                map_group,
            )
            .optional()
        })
    }

    /// Groups visible to `user_id`: those they administer or belong to.
    /// With `all` set every group is returned.
    pub fn list_groups_for_user(&self, user_id: &str, all: bool) -> Result<Vec<GroupRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT g.id, g.name, g.admin_id, g.date_created
                 FROM user_groups g
                 WHERE ?2
                    OR g.admin_id = ?1
                    OR EXISTS (SELECT 1 FROM group_members m WHERE m.group_id = g.id AND m.user_id = ?1)
                 ORDER BY g.date_created DESC, g.rowid DESC",
            )?;
            let rows = stmt
                .query_map(params![user_id, all], map_group)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn rename_group(&self, id: &str, name: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("UPDATE user_groups SET name = ?2 WHERE id = ?1", params![id, name])?;
            Ok(())
        })
    }

    pub fn delete_group(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM user_groups WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Add members, silently skipping ids that match no account.
    pub fn add_group_members(&self, group_id: &str, user_ids: &[String]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            for user_id in user_ids {
                tx.execute(
                    "INSERT OR IGNORE INTO group_members (group_id, user_id)
                     SELECT ?1, id FROM users WHERE id = ?2",
                    params![group_id, user_id],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn remove_group_members(&self, group_id: &str, user_ids: &[String]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            for user_id in user_ids {
                tx.execute(
                    "DELETE FROM group_members WHERE group_id = ?1 AND user_id = ?2",
                    params![group_id, user_id],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_group_member_ids(&self, group_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id FROM group_members WHERE group_id = ?1 ORDER BY rowid",
            )?;
            let ids = stmt
                .query_map([group_id], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    pub fn is_group_member(&self, group_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM group_members WHERE group_id = ?1 AND user_id = ?2",
                params![group_id, user_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    /// Existing groups among `group_ids` not administered by `user_id`.
    pub fn count_groups_not_administered_by(&self, group_ids: &[String], user_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let mut count = 0;
            for group_id in group_ids {
                let foreign: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM user_groups WHERE id = ?1 AND admin_id != ?2",
                    params![group_id, user_id],
                    |row| row.get(0),
                )?;
                count += foreign as usize;
            }
            Ok(count)
        })
    }
}

fn map_group(row: &Row<'_>) -> rusqlite::Result<GroupRow> {
    Ok(GroupRow {
        id: row.get(0)?,
        name: row.get(1)?,
        admin_id: row.get(2)?,
        date_created: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{account, db};

    #[test]
    fn creator_is_admin_and_member() {
        let db = db();
        account(&db, "a", "0551111111");

        db.create_group("g1", "Runners", "a").unwrap();
        let group = db.get_group("g1").unwrap().unwrap();
        assert_eq!(group.admin_id, "a");
        assert_eq!(db.get_group_member_ids("g1").unwrap(), vec!["a".to_string()]);
    }

    #[test]
    fn unknown_members_are_skipped() {
        let db = db();
        account(&db, "a", "0551111111");
        account(&db, "b", "0552222222");
        db.create_group("g1", "Runners", "a").unwrap();

        db.add_group_members("g1", &["b".to_string(), "ghost".to_string()]).unwrap();
        assert_eq!(db.get_group_member_ids("g1").unwrap().len(), 2);

        db.remove_group_members("g1", &["b".to_string()]).unwrap();
        assert!(!db.is_group_member("g1", "b").unwrap());
    }

    #[test]
    fn visibility_follows_membership() {
        let db = db();
        account(&db, "a", "0551111111");
        account(&db, "b", "0552222222");
        db.create_group("g1", "Runners", "a").unwrap();

        assert_eq!(db.list_groups_for_user("a", false).unwrap().len(), 1);
        assert!(db.list_groups_for_user("b", false).unwrap().is_empty());
        assert_eq!(db.list_groups_for_user("b", true).unwrap().len(), 1);
    }
}
