pub mod auth;
pub mod comments;
pub mod communities;
pub mod convert;
pub mod error;
pub mod follows;
pub mod groups;
pub mod lifecycle;
pub mod media;
pub mod middleware;
pub mod passwords;
pub mod posts;
pub mod router;
pub mod state;
pub mod storage;
pub mod tokens;
pub mod users;
pub mod validation;

pub use error::{ApiError, ApiResult};
pub use router::create_router;
pub use state::{AppState, AppStateInner};
