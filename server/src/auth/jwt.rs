use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::models::user::{Role, User};
use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Keys {
    fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

/// Signs and verifies HS256 tokens. Access and refresh tokens use separate
/// secrets, and each carries its kind so one cannot stand in for the other.
pub struct TokenService {
    access: Keys,
    refresh: Keys,
}

impl TokenService {
    pub fn new(config: &Config) -> Self {
        Self {
            access: Keys::new(&config.jwt_secret, config.jwt_expiry),
            refresh: Keys::new(&config.refresh_secret, config.refresh_expiry),
        }
    }

    pub fn issue_pair(&self, user: &User) -> AppResult<TokenPair> {
        let now = Utc::now().timestamp();
        Ok(TokenPair {
            access_token: self.sign(&self.claims(user, TokenKind::Access, now))?,
            refresh_token: self.sign(&self.claims(user, TokenKind::Refresh, now))?,
            expires_in: self.access.ttl.as_secs(),
        })
    }

    pub fn verify_access(&self, token: &str) -> AppResult<Claims> {
        self.verify(token, TokenKind::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> AppResult<Claims> {
        self.verify(token, TokenKind::Refresh)
    }

    fn keys(&self, kind: TokenKind) -> &Keys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    fn claims(&self, user: &User, kind: TokenKind, now: i64) -> Claims {
        let ttl = i64::try_from(self.keys(kind).ttl.as_secs()).unwrap_or(i64::MAX);
        Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            kind,
            iat: now,
            exp: now.saturating_add(ttl),
        }
    }

    fn sign(&self, claims: &Claims) -> AppResult<String> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.keys(claims.kind).encoding,
        )
        .map_err(|e| AppError::Internal(format!("failed to sign token: {e}")))
    }

    fn verify(&self, token: &str, kind: TokenKind) -> AppResult<Claims> {
        let data = decode::<Claims>(
            token,
            &self.keys(kind).decoding,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| {
            tracing::debug!(error = %e, "Token rejected");
            AppError::Unauthenticated("Invalid or expired token".to_string())
        })?;

        if data.claims.kind != kind {
            return Err(AppError::Unauthenticated("Invalid token type".to_string()));
        }
        Ok(data.claims)
    }
}
