//! Account lifecycle: registration, activation, activation code resend and
//! password login.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use vibe_db::models::{AccountRow, NewAccount};
use vibe_db::{Database, unique_violation_target};
use vibe_sms::SmsGateway;
use vibe_types::api::{LoginRequest, RegisterRequest};

use crate::error::{ApiError, ApiResult, run_blocking};
use crate::passwords;
use crate::tokens::{TokenIssuer, TokenPair};
use crate::validation;

const ACCOUNT_NOT_FOUND: &str = "User with this phone number does not exist.";
const BAD_CREDENTIALS: &str = "No active account found with the given credentials";
const INACTIVE_ACCOUNT: &str = "The account is inactive. Please verify account.";

pub fn activation_message(code: &str) -> String {
    format!(
        "Your VIBE account activation token is {}.\nPlease do not share this token with any third party.",
        code
    )
}

pub struct AccountLifecycle {
    db: Arc<Database>,
    sms: Arc<dyn SmsGateway>,
    tokens: TokenIssuer,
}

impl AccountLifecycle {
    pub fn new(db: Arc<Database>, sms: Arc<dyn SmsGateway>, tokens: TokenIssuer) -> Self {
        Self { db, sms, tokens }
    }

    /// Create an inactive account, text it the activation code and hand
    /// back a fresh credential pair.
    pub async fn register(&self, req: RegisterRequest) -> ApiResult<(AccountRow, TokenPair)> {
        validation::phone_number(&req.phone_number)?;
        validation::names(&req.first_name, &req.last_name)?;
        validation::password(&req.password)?;
        if let Some(username) = &req.username {
            validation::username(username)?;
        }
        if let Some(email) = &req.email {
            validation::email(email)?;
        }

        let db = self.db.clone();
        let account = run_blocking(move || {
            if db.get_account_by_phone(&req.phone_number)?.is_some() {
                return Err(duplicate_phone());
            }
            let username = req.username.as_deref().unwrap_or(&req.phone_number);
            if db.username_taken(username, None)? {
                return Err(duplicate_username());
            }

            let password_hash = passwords::hash(&req.password)?;
            let id = Uuid::new_v4().to_string();
            db.create_account(&NewAccount {
                id: &id,
                username: req.username.as_deref(),
                phone_number: &req.phone_number,
                email: req.email.as_deref(),
                first_name: &req.first_name,
                last_name: &req.last_name,
                password_hash: &password_hash,
            })
            .map_err(registration_conflict)
        })
        .await?;

        info!("Registered account {} ({})", account.id, account.phone_number);
        self.send_code(&account).await;

        let tokens = self.tokens.issue(parse_id(&account.id)?, &account.username)?;
        Ok((account, tokens))
    }

    /// Activate the account when `code` matches the stored activation code.
    pub async fn activate(&self, phone_number: String, code: String) -> ApiResult<(AccountRow, TokenPair)> {
        validation::phone_number(&phone_number)?;
        validation::activation_code(&code)?;

        let db = self.db.clone();
        let account = run_blocking(move || {
            let mut account = db
                .get_account_by_phone(&phone_number)?
                .ok_or_else(|| ApiError::not_found(ACCOUNT_NOT_FOUND))?;

            if account.activation_otp != code {
                return Err(ApiError::validation("Invalid OTP code."));
            }

            account.is_active = true;
            account.activation_otp.clear();
            db.save_account(&mut account)?;
            Ok(account)
        })
        .await?;

        info!("Activated account {}", account.id);
        let tokens = self.tokens.issue(parse_id(&account.id)?, &account.username)?;
        Ok((account, tokens))
    }

    /// Re-send the stored activation code without regenerating it.
    pub async fn resend_activation_code(&self, phone_number: String) -> ApiResult<()> {
        validation::phone_number(&phone_number)?;

        let db = self.db.clone();
        let account = run_blocking(move || {
            db.get_account_by_phone(&phone_number)?
                .ok_or_else(|| ApiError::not_found(ACCOUNT_NOT_FOUND))
        })
        .await?;

        if account.is_active {
            return Err(ApiError::validation("account is already active"));
        }

        self.send_code(&account).await;
        Ok(())
    }

    /// Password login by phone number or username.
    pub async fn login(&self, req: LoginRequest) -> ApiResult<(AccountRow, TokenPair)> {
        let db = self.db.clone();
        let account = run_blocking(move || {
            let found = match (&req.phone_number, &req.username) {
                (Some(phone), _) => db.get_account_by_phone(phone)?,
                (None, Some(username)) => db.get_account_by_username(username)?,
                (None, None) => {
                    return Err(ApiError::validation("phone_number or username is required"));
                }
            };
            let mut account = found.ok_or_else(|| ApiError::unauthorized(BAD_CREDENTIALS))?;

            if !passwords::verify(&req.password, &account.password)? {
                return Err(ApiError::unauthorized(BAD_CREDENTIALS));
            }
            if !account.is_active {
                return Err(ApiError::unauthorized(INACTIVE_ACCOUNT));
            }

            db.touch_last_login(&account.id)?;
            if let Some(fresh) = db.get_account_by_id(&account.id)? {
                account = fresh;
            }
            Ok(account)
        })
        .await?;

        let tokens = self.tokens.issue(parse_id(&account.id)?, &account.username)?;
        Ok((account, tokens))
    }

    async fn send_code(&self, account: &AccountRow) {
        let message = activation_message(&account.activation_otp);
        if let Err(e) = self.sms.send(&message, &account.phone_number).await {
            warn!("Failed to send activation code to {}: {:#}", account.phone_number, e);
        }
    }
}

fn duplicate_phone() -> ApiError {
    ApiError::Conflict(
        "User with this phone number already exists. Please use a different phone number.".into(),
    )
}

fn duplicate_username() -> ApiError {
    ApiError::Conflict("User with this username exists. Please use a different username".into())
}

/// Map a failed account insert, naming the column a concurrent
/// registration claimed first.
fn registration_conflict(err: anyhow::Error) -> ApiError {
    match unique_violation_target(&err) {
        Some("users.phone_number") => duplicate_phone(),
        Some("users.username") => duplicate_username(),
        Some(other) => ApiError::Conflict(format!("Account already exists ({})", other)),
        None => err.into(),
    }
}

fn parse_id(raw: &str) -> ApiResult<Uuid> {
    raw.parse()
        .map_err(|e| ApiError::Internal(format!("Corrupt account id '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use vibe_sms::MemoryGateway;

    struct Harness {
        lifecycle: AccountLifecycle,
        sms: Arc<MemoryGateway>,
        db: Arc<Database>,
    }

    fn harness() -> Harness {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let sms = Arc::new(MemoryGateway::new());
        let tokens = TokenIssuer::new("test-secret", Duration::minutes(5), Duration::days(1));
        Harness {
            lifecycle: AccountLifecycle::new(db.clone(), sms.clone(), tokens),
            sms,
            db,
        }
    }

    fn register_request(phone: &str) -> RegisterRequest {
        RegisterRequest {
            phone_number: phone.into(),
            username: None,
            email: None,
            first_name: "Ama".into(),
            last_name: String::new(),
            password: "p@ss1234".into(),
        }
    }

    fn code_from(message: &str) -> String {
        message.chars().filter(|c| c.is_ascii_digit()).take(4).collect()
    }

    #[tokio::test]
    async fn register_sends_the_stored_code() {
        let h = harness();
        let (account, _) = h.lifecycle.register(register_request("0551234567")).await.unwrap();

        assert!(!account.is_active);
        let message = h.sms.last_to("0551234567").unwrap();
        assert_eq!(code_from(&message), account.activation_otp);
    }

    #[tokio::test]
    async fn duplicate_phone_is_a_conflict() {
        let h = harness();
        h.lifecycle.register(register_request("0551234567")).await.unwrap();

        let mut again = register_request("0551234567");
        again.username = Some("someone_else".into());
        let err = h.lifecycle.register(again).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn racing_insert_reports_the_claimed_column() {
        let h = harness();
        h.lifecycle.register(register_request("0551234567")).await.unwrap();

        let insert = |username: Option<&str>, phone: &str| {
            h.db.create_account(&NewAccount {
                id: &Uuid::new_v4().to_string(),
                username,
                phone_number: phone,
                email: None,
                first_name: "Kofi",
                last_name: "",
                password_hash: "hash",
            })
            .unwrap_err()
        };

        let by_username = registration_conflict(insert(Some("0551234567"), "0559999999"));
        assert!(matches!(&by_username, ApiError::Conflict(msg) if msg.contains("username")));

        let by_phone = registration_conflict(insert(Some("fresh_name"), "0551234567"));
        assert!(matches!(&by_phone, ApiError::Conflict(msg) if msg.contains("phone number")));
    }

    #[tokio::test]
    async fn missing_names_are_rejected() {
        let h = harness();
        let mut req = register_request("0551234567");
        req.first_name.clear();
        let err = h.lifecycle.register(req).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(h.sms.sent().is_empty());
    }

    #[tokio::test]
    async fn wrong_code_leaves_account_inactive() {
        let h = harness();
        let (account, _) = h.lifecycle.register(register_request("0551234567")).await.unwrap();
        let wrong = if account.activation_otp == "0000" { "1111" } else { "0000" };

        let err = h
            .lifecycle
            .activate("0551234567".into(), wrong.into())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(!h.db.get_account_by_id(&account.id).unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn matching_code_activates_and_is_cleared() {
        let h = harness();
        let (account, _) = h.lifecycle.register(register_request("0551234567")).await.unwrap();

        let (active, _) = h
            .lifecycle
            .activate("0551234567".into(), account.activation_otp.clone())
            .await
            .unwrap();
        assert!(active.is_active);

        let stored = h.db.get_account_by_id(&account.id).unwrap().unwrap();
        assert!(stored.is_active);
        assert!(stored.activation_otp.is_empty());

        let replay = h
            .lifecycle
            .activate("0551234567".into(), account.activation_otp)
            .await;
        assert!(replay.is_err());
    }

    #[tokio::test]
    async fn resend_reuses_the_code() {
        let h = harness();
        let (account, _) = h.lifecycle.register(register_request("0551234567")).await.unwrap();

        h.lifecycle.resend_activation_code("0551234567".into()).await.unwrap();
        let sent = h.sms.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(code_from(&sent[1].1), account.activation_otp);
    }

    #[tokio::test]
    async fn resend_to_unknown_number_sends_nothing() {
        let h = harness();
        let err = h
            .lifecycle
            .resend_activation_code("0559999999".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert!(h.sms.sent().is_empty());
    }

    #[tokio::test]
    async fn login_requires_activation() {
        let h = harness();
        let (account, _) = h.lifecycle.register(register_request("0551234567")).await.unwrap();
        let login = || LoginRequest {
            phone_number: Some("0551234567".into()),
            username: None,
            password: "p@ss1234".into(),
        };

        match h.lifecycle.login(login()).await {
            Err(ApiError::Unauthorized(msg)) => assert_eq!(msg, INACTIVE_ACCOUNT),
            other => panic!("unexpected: {:?}", other.map(|(a, _)| a.id)),
        }

        h.lifecycle
            .activate("0551234567".into(), account.activation_otp)
            .await
            .unwrap();
        let (logged_in, _) = h.lifecycle.login(login()).await.unwrap();
        assert!(logged_in.last_login.is_some());

        let wrong = LoginRequest { password: "not-it-at-all".into(), ..login() };
        assert!(matches!(h.lifecycle.login(wrong).await, Err(ApiError::Unauthorized(_))));
    }
}
