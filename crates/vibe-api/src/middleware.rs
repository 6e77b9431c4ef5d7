use axum::{
    extract::{Request, State},
    http::{HeaderValue, header},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::error::{ApiError, run_blocking};
use crate::state::AppState;

/// The authenticated account, inserted into request extensions by
/// [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub is_superuser: bool,
}

impl CurrentUser {
    pub fn id_str(&self) -> String {
        self.id.to_string()
    }
}

/// Validate the Bearer access token and load the active account behind it.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided."))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("Authorization header must use Bearer"))?;

    let claims = state.tokens.decode_access(token)?;

    let db = state.db.clone();
    let user_id = claims.sub.to_string();
    let account = run_blocking(move || Ok(db.get_account_by_id(&user_id)?)).await?;

    let account = match account {
        Some(a) if a.is_active => a,
        Some(_) => return Err(ApiError::unauthorized("User is inactive")),
        None => return Err(ApiError::unauthorized("User not found")),
    };

    req.extensions_mut().insert(CurrentUser {
        id: claims.sub,
        username: account.username,
        is_superuser: account.is_superuser,
    });
    Ok(next.run(req).await)
}

/// Disable client caching on everything except static and media files.
pub async fn no_cache(req: Request, next: Next) -> Response {
    let path = req.uri().path();
    let cacheable = path.starts_with("/static") || path.starts_with("/media");

    let mut response = next.run(req).await;
    if !cacheable {
        let headers = response.headers_mut();
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        );
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    }
    response
}
