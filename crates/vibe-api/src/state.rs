use std::sync::Arc;

use vibe_db::Database;
use vibe_sms::SmsGateway;

use crate::lifecycle::AccountLifecycle;
use crate::storage::MediaStore;
use crate::tokens::TokenIssuer;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub tokens: TokenIssuer,
    pub lifecycle: AccountLifecycle,
    pub media: MediaStore,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, sms: Arc<dyn SmsGateway>, tokens: TokenIssuer, media: MediaStore) -> AppState {
        let lifecycle = AccountLifecycle::new(db.clone(), sms, tokens.clone());
        Arc::new(Self {
            db,
            tokens,
            lifecycle,
            media,
        })
    }
}
