use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::Duration;

use vibe_sms::{DEFAULT_MNOTIFY_URL, DEFAULT_SENDER_ID};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub url: String,
    pub api_key: String,
    pub sender_id: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub media_root: PathBuf,
    pub jwt_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// `None` logs outgoing messages instead of sending them.
    pub sms: Option<SmsConfig>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = var("VIBE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("VIBE_JWT_SECRET is unset or still a placeholder");
        }

        let port: u16 = var("VIBE_PORT")
            .unwrap_or_else(|| "8000".into())
            .parse()
            .context("VIBE_PORT must be a port number")?;
        let access_minutes: i64 = var("VIBE_ACCESS_TOKEN_MINUTES")
            .map(|v| v.parse())
            .transpose()
            .context("VIBE_ACCESS_TOKEN_MINUTES must be an integer")?
            .unwrap_or(24 * 60);
        let refresh_days: i64 = var("VIBE_REFRESH_TOKEN_DAYS")
            .map(|v| v.parse())
            .transpose()
            .context("VIBE_REFRESH_TOKEN_DAYS must be an integer")?
            .unwrap_or(30);
        if access_minutes <= 0 || refresh_days <= 0 {
            bail!("token lifetimes must be positive");
        }

        let sms = var("VIBE_SMS_API_KEY")
            .filter(|key| !key.is_empty())
            .map(|api_key| SmsConfig {
                url: var("VIBE_SMS_URL").unwrap_or_else(|| DEFAULT_MNOTIFY_URL.into()),
                api_key,
                sender_id: var("VIBE_SMS_SENDER_ID").unwrap_or_else(|| DEFAULT_SENDER_ID.into()),
            });

        Ok(Self {
            host: var("VIBE_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: var("VIBE_DB_PATH").unwrap_or_else(|| "vibe.db".into()).into(),
            media_root: var("VIBE_MEDIA_ROOT").unwrap_or_else(|| "./media".into()).into(),
            jwt_secret,
            access_ttl: Duration::minutes(access_minutes),
            refresh_ttl: Duration::days(refresh_days),
            sms,
        })
    }
}
