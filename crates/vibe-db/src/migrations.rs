use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (accounts, follows, communities, posts)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                username        TEXT NOT NULL UNIQUE,
                phone_number    TEXT NOT NULL UNIQUE,
                email           TEXT,
                first_name      TEXT NOT NULL DEFAULT '',
                last_name       TEXT NOT NULL DEFAULT '',
                password        TEXT NOT NULL,
                is_active       INTEGER NOT NULL DEFAULT 0,
                is_staff        INTEGER NOT NULL DEFAULT 0,
                is_superuser    INTEGER NOT NULL DEFAULT 0,
                activation_otp  TEXT NOT NULL DEFAULT '',
                token           TEXT NOT NULL DEFAULT '',
                token_reason    TEXT NOT NULL DEFAULT '',
                last_login      TEXT,
                date_joined     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE TABLE profiles (
                user_id         TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                about           TEXT NOT NULL DEFAULT '',
                profile_picture TEXT,
                cover_picture   TEXT,
                date_created    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE TABLE user_followships (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                follower_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                is_removed      INTEGER NOT NULL DEFAULT 0,
                date_created    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
                UNIQUE(user_id, follower_id)
            );

            CREATE INDEX idx_followships_follower ON user_followships(follower_id);

            CREATE TABLE user_groups (
                id              TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                admin_id        TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                date_created    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE TABLE group_members (
                group_id        TEXT NOT NULL REFERENCES user_groups(id) ON DELETE CASCADE,
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                PRIMARY KEY (group_id, user_id)
            );

            CREATE TABLE communities (
                id              TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                admin_id        TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                date_created    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE TABLE community_groups (
                community_id    TEXT NOT NULL REFERENCES communities(id) ON DELETE CASCADE,
                group_id        TEXT NOT NULL REFERENCES user_groups(id) ON DELETE CASCADE,
                PRIMARY KEY (community_id, group_id)
            );

            CREATE TABLE announcements (
                id              TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                community_id    TEXT NOT NULL UNIQUE REFERENCES communities(id) ON DELETE CASCADE,
                date_created    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE TABLE posts (
                id              TEXT PRIMARY KEY,
                text            TEXT,
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                shared_from     TEXT REFERENCES posts(id) ON DELETE SET NULL,
                post_type       TEXT NOT NULL DEFAULT 'TextPost',
                group_id        TEXT REFERENCES user_groups(id) ON DELETE CASCADE,
                announcement_id TEXT REFERENCES announcements(id) ON DELETE CASCADE,
                is_edited       INTEGER NOT NULL DEFAULT 0,
                date_created    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE INDEX idx_posts_created ON posts(date_created);
            CREATE INDEX idx_posts_user ON posts(user_id, date_created);

            CREATE TABLE post_likes (
                post_id         TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                PRIMARY KEY (post_id, user_id)
            );

            CREATE TABLE post_pictures (
                id              TEXT PRIMARY KEY,
                post_id         TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                image           TEXT NOT NULL,
                date_created    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE INDEX idx_post_pictures_post ON post_pictures(post_id);

            CREATE TABLE post_videos (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                post_id         TEXT REFERENCES posts(id) ON DELETE CASCADE,
                video           TEXT NOT NULL,
                thumbnail       TEXT,
                duration        REAL,
                date_created    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE INDEX idx_post_videos_post ON post_videos(post_id);

            CREATE TABLE post_comments (
                id              TEXT PRIMARY KEY,
                post_id         TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                comment         TEXT NOT NULL,
                parent_id       TEXT REFERENCES post_comments(id) ON DELETE CASCADE,
                is_edited       INTEGER NOT NULL DEFAULT 0,
                date_created    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE INDEX idx_post_comments_post ON post_comments(post_id, date_created);

            CREATE TABLE comment_likes (
                comment_id      TEXT NOT NULL REFERENCES post_comments(id) ON DELETE CASCADE,
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                PRIMARY KEY (comment_id, user_id)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
