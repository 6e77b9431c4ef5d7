use anyhow::Result;
use rusqlite::{Row, params};

use super::OptionalExt;
use crate::Database;
use crate::models::{AnnouncementRow, CommunityRow};

const COMMUNITY_SELECT: &str = "SELECT c.id, c.name, c.admin_id, c.date_created, a.id, a.name, a.date_created
     FROM communities c
     JOIN announcements a ON a.community_id = c.id";

impl Database {
    // -- Communities --

    /// Create a community together with its announcement page.
    pub fn create_community(
        &self,
        id: &str,
        name: &str,
        admin_id: &str,
        announcement_id: &str,
        announcement_name: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO communities (id, name, admin_id) VALUES (?1, ?2, ?3)",
                params![id, name, admin_id],
            )?;
            tx.execute(
                "INSERT INTO announcements (id, name, community_id) VALUES (?1, ?2, ?3)",
                params![announcement_id, announcement_name, id],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_community(&self, id: &str) -> Result<Option<CommunityRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("{} WHERE c.id = ?1", COMMUNITY_SELECT),
                [id],
                map_community,
            )
            .optional()
        })
    }

    /// Communities `user_id` administers or that contain one of their groups.
    /// With `all` set every community is returned.
    pub fn list_communities_for_user(&self, user_id: &str, all: bool) -> Result<Vec<CommunityRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE ?2
                    OR c.admin_id = ?1
                    OR EXISTS (
                        SELECT 1 FROM community_groups cg
                        JOIN group_members m ON m.group_id = cg.group_id
                        WHERE cg.community_id = c.id AND m.user_id = ?1
                    )
                 ORDER BY c.date_created DESC, c.rowid DESC",
                COMMUNITY_SELECT
            ))?;
            let rows = stmt
                .query_map(params![user_id, all], map_community)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Link groups to a community, skipping ids that match no group.
    pub fn add_community_groups(&self, community_id: &str, group_ids: &[String]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            for group_id in group_ids {
                tx.execute(
                    "INSERT OR IGNORE INTO community_groups (community_id, group_id)
                     SELECT ?1, id FROM user_groups WHERE id = ?2",
                    params![community_id, group_id],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn remove_community_groups(&self, community_id: &str, group_ids: &[String]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            for group_id in group_ids {
                tx.execute(
                    "DELETE FROM community_groups WHERE community_id = ?1 AND group_id = ?2",
                    params![community_id, group_id],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_community_group_ids(&self, community_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT group_id FROM community_groups WHERE community_id = ?1 ORDER BY rowid",
            )?;
            let ids = stmt
                .query_map([community_id], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    pub fn get_announcement(&self, id: &str) -> Result<Option<AnnouncementRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT a.id, a.name, a.community_id, c.admin_id
                 FROM announcements a
                 JOIN communities c ON c.id = a.community_id
                 WHERE a.id = ?1",
                [id],
                |row| {
                    Ok(AnnouncementRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        community_id: row.get(2)?,
                        community_admin_id: row.get(3)?,
                    })
                },
            )
            .optional()
        })
    }
}

fn map_community(row: &Row<'_>) -> rusqlite::Result<CommunityRow> {
    Ok(CommunityRow {
        id: row.get(0)?,
        name: row.get(1)?,
        admin_id: row.get(2)?,
        date_created: row.get(3)?,
        announcement_id: row.get(4)?,
        announcement_name: row.get(5)?,
        announcement_created: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{account, db};

    #[test]
    fn community_comes_with_an_announcement() {
        let db = db();
        account(&db, "a", "0551111111");

        db.create_community("c1", "Accra", "a", "ann1", "Announcements").unwrap();
        let community = db.get_community("c1").unwrap().unwrap();
        assert_eq!(community.announcement_id, "ann1");
        assert_eq!(community.announcement_name, "Announcements");

        let announcement = db.get_announcement("ann1").unwrap().unwrap();
        assert_eq!(announcement.community_id, "c1");
        assert_eq!(announcement.community_admin_id, "a");
    }

    #[test]
    fn group_members_see_the_community() {
        let db = db();
        account(&db, "a", "0551111111");
        account(&db, "b", "0552222222");
        db.create_group("g1", "Runners", "a").unwrap();
        db.add_group_members("g1", &["b".to_string()]).unwrap();
        db.create_community("c1", "Accra", "a", "ann1", "Announcements").unwrap();

        assert!(db.list_communities_for_user("b", false).unwrap().is_empty());
        db.add_community_groups("c1", &["g1".to_string(), "nope".to_string()]).unwrap();
        assert_eq!(db.get_community_group_ids("c1").unwrap(), vec!["g1".to_string()]);
        assert_eq!(db.list_communities_for_user("b", false).unwrap().len(), 1);

        db.remove_community_groups("c1", &["g1".to_string()]).unwrap();
        assert!(db.list_communities_for_user("b", false).unwrap().is_empty());
    }
}
