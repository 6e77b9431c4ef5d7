use anyhow::{Result, anyhow};
use rusqlite::{Connection, Row, params};

use super::{OptionalExt, placeholders, to_sql_params};
use crate::Database;
use crate::activation;
use crate::models::{AccountRow, NewAccount, ProfileRow, UserSummaryRow};

const ACCOUNT_COLUMNS: &str = "id, username, phone_number, email, first_name, last_name, password, \
     is_active, is_staff, is_superuser, activation_otp, token, token_reason, last_login, date_joined";

impl Database {
    // -- Accounts --

    /// Insert a new inactive account and its empty profile in one transaction.
    /// The save rule assigns the activation code before the row is written.
    pub fn create_account(&self, new: &NewAccount<'_>) -> Result<AccountRow> {
        let mut account = AccountRow {
            id: new.id.to_string(),
            username: new.username.unwrap_or(new.phone_number).to_string(),
            phone_number: new.phone_number.to_string(),
            email: new.email.map(str::to_string),
            first_name: new.first_name.to_string(),
            last_name: new.last_name.to_string(),
            password: new.password_hash.to_string(),
            is_active: false,
            is_staff: false,
            is_superuser: false,
            activation_otp: String::new(),
            token: String::new(),
            token_reason: String::new(),
            last_login: None,
            date_joined: String::new(),
        };
        activation::apply_save_rule(&mut account);

        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO users (id, username, phone_number, email, first_name, last_name, password, is_active, activation_otp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    account.id,
                    account.username,
                    account.phone_number,
                    account.email,
                    account.first_name,
                    account.last_name,
                    account.password,
                    account.is_active,
                    account.activation_otp,
                ],
            )?;
            tx.execute("INSERT INTO profiles (user_id) VALUES (?1)", [&account.id])?;
            tx.commit()?;

            query_account(conn, "id", &account.id)?
                .ok_or_else(|| anyhow!("Account {} missing after insert", account.id))
        })
    }

    /// Persist every mutable column of `account`, applying the activation
    /// code rule first so the stored row always satisfies it.
    pub fn save_account(&self, account: &mut AccountRow) -> Result<()> {
        activation::apply_save_rule(account);

        self.with_conn_mut(|conn| {
            let updated = conn.execute(
                "UPDATE users SET username = ?2, phone_number = ?3, email = ?4, first_name = ?5,
                    last_name = ?6, password = ?7, is_active = ?8, is_staff = ?9, is_superuser = ?10,
                    activation_otp = ?11, token = ?12, token_reason = ?13, last_login = ?14
                 WHERE id = ?1",
                params![
                    account.id,
                    account.username,
                    account.phone_number,
                    account.email,
                    account.first_name,
                    account.last_name,
                    account.password,
                    account.is_active,
                    account.is_staff,
                    account.is_superuser,
                    account.activation_otp,
                    account.token,
                    account.token_reason,
                    account.last_login,
                ],
            )?;
            if updated == 0 {
                return Err(anyhow!("Account not found: {}", account.id));
            }
            Ok(())
        })
    }

    pub fn get_account_by_id(&self, id: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "id", id))
    }

    pub fn get_account_by_phone(&self, phone_number: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "phone_number", phone_number))
    }

    pub fn get_account_by_username(&self, username: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "username", username))
    }

    /// Whether `username` belongs to an account other than `except_id`.
    pub fn username_taken(&self, username: &str, except_id: Option<&str>) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE username = ?1 AND id IS NOT ?2",
                params![username, except_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    /// Newest accounts first.
    pub fn list_accounts(&self, limit: u32, offset: u32) -> Result<Vec<AccountRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM users ORDER BY date_joined DESC, rowid DESC LIMIT ?1 OFFSET ?2",
                ACCOUNT_COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![limit, offset], map_account)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn touch_last_login(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET last_login = strftime('%Y-%m-%d %H:%M:%f', 'now') WHERE id = ?1",
                [id],
            )?;
            Ok(())
        })
    }

    // -- Profiles --

    pub fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT user_id, about, profile_picture, cover_picture, date_created
                 FROM profiles WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok(ProfileRow {
                        user_id: row.get(0)?,
                        about: row.get(1)?,
                        profile_picture: row.get(2)?,
                        cover_picture: row.get(3)?,
                        date_created: row.get(4)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn update_profile_about(&self, user_id: &str, about: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE profiles SET about = ?2 WHERE user_id = ?1",
                params![user_id, about],
            )?;
            Ok(())
        })
    }

    /// Replace the profile picture path. Returns the previous path, if any.
    pub fn set_profile_picture(&self, user_id: &str, path: &str) -> Result<Option<String>> {
        self.replace_profile_media(user_id, "profile_picture", path)
    }

    /// Replace the cover picture path. Returns the previous path, if any.
    pub fn set_cover_picture(&self, user_id: &str, path: &str) -> Result<Option<String>> {
        self.replace_profile_media(user_id, "cover_picture", path)
    }

    fn replace_profile_media(&self, user_id: &str, column: &str, path: &str) -> Result<Option<String>> {
        self.with_conn_mut(|conn| {
            let previous: Option<String> = conn
                .query_row(
                    &format!("SELECT {} FROM profiles WHERE user_id = ?1", column),
                    [user_id],
                    |row| row.get::<_, Option<String>>(0),
                )
                .optional()?
                .flatten();
            conn.execute(
                &format!("UPDATE profiles SET {} = ?2 WHERE user_id = ?1", column),
                params![user_id, path],
            )?;
            Ok(previous)
        })
    }

    // -- Summaries --

    /// Batch-fetch the account fields used in embedded user summaries.
    pub fn get_user_summaries(&self, ids: &[String]) -> Result<Vec<UserSummaryRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT u.id, u.username, u.phone_number, u.email, u.first_name, u.last_name, p.profile_picture
                 FROM users u
                 LEFT JOIN profiles p ON p.user_id = u.id
                 WHERE u.id IN ({})",
                placeholders(1, ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(to_sql_params(ids).as_slice(), |row| {
                    Ok(UserSummaryRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        phone_number: row.get(2)?,
                        email: row.get(3)?,
                        first_name: row.get(4)?,
                        last_name: row.get(5)?,
                        profile_picture: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_account(conn: &Connection, column: &str, value: &str) -> Result<Option<AccountRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM users WHERE {} = ?1",
        ACCOUNT_COLUMNS, column
    ))?;

    stmt.query_row([value], map_account).optional()
}

fn map_account(row: &Row<'_>) -> rusqlite::Result<AccountRow> {
    Ok(AccountRow {
        id: row.get(0)?,
        username: row.get(1)?,
        phone_number: row.get(2)?,
        email: row.get(3)?,
        first_name: row.get(4)?,
        last_name: row.get(5)?,
        password: row.get(6)?,
        is_active: row.get(7)?,
        is_staff: row.get(8)?,
        is_superuser: row.get(9)?,
        activation_otp: row.get(10)?,
        token: row.get(11)?,
        token_reason: row.get(12)?,
        last_login: row.get(13)?,
        date_joined: row.get(14)?,
    })
}
