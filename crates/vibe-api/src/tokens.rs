use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use vibe_types::api::Claims;
use vibe_types::models::TokenType;

use crate::error::{ApiError, ApiResult};

/// An access/refresh credential pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Issues and checks HS256 JWTs.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn issue(&self, user_id: Uuid, username: &str) -> ApiResult<TokenPair> {
        Ok(TokenPair {
            access: self.sign(user_id, username, TokenType::Access)?,
            refresh: self.sign(user_id, username, TokenType::Refresh)?,
        })
    }

    /// Check signature and expiry of any token.
    pub fn decode(&self, token: &str) -> ApiResult<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| ApiError::unauthorized("Token is invalid or expired"))
    }

    /// Claims of a valid access token.
    pub fn decode_access(&self, token: &str) -> ApiResult<Claims> {
        let claims = self.decode(token)?;
        if claims.token_type != TokenType::Access {
            return Err(ApiError::unauthorized("Token has wrong type"));
        }
        Ok(claims)
    }

    /// Exchange a refresh token for a new access token.
    pub fn refresh(&self, refresh_token: &str) -> ApiResult<String> {
        let claims = self.decode(refresh_token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(ApiError::unauthorized("Token has wrong type"));
        }
        self.sign(claims.sub, &claims.username, TokenType::Access)
    }

    fn sign(&self, user_id: Uuid, username: &str, token_type: TokenType) -> ApiResult<String> {
        let now = Utc::now();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            token_type,
            exp: (now + ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
            jti: Uuid::new_v4(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("Token encoding failed: {}", e)))
    }
}
