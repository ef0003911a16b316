use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;
use validator::Validate;

use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::auth::{TokenPair, TokenService};
use crate::config::Config;
use crate::models::user::{NewUser, Role, User, UserProfile};
use crate::store::Store;
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation::{validate_password, validate_phone};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,
    #[validate(
        length(min = 8, message = "Password must be at least 8 characters"),
        custom(function = "validate_password")
    )]
    pub password: String,
    #[serde(default)]
    pub role: Role,
    pub university_id: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    #[validate(length(max = 100, message = "Department cannot exceed 100 characters"))]
    pub department: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Please enter a valid email"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Reset token is required"))]
    pub token: String,
    #[validate(
        length(min = 8, message = "Password must be at least 8 characters"),
        custom(function = "validate_password")
    )]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthSession {
    pub user: UserProfile,
    pub tokens: TokenPair,
}

pub struct AccountService {
    store: Arc<dyn Store>,
    tokens: Arc<TokenService>,
    reset_token_ttl: chrono::Duration,
    app_url: String,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>, tokens: Arc<TokenService>, config: &Config) -> Self {
        Self {
            store,
            tokens,
            reset_token_ttl: chrono::Duration::from_std(config.reset_token_ttl)
                .unwrap_or_else(|_| chrono::Duration::hours(1)),
            app_url: config.app_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> AppResult<AuthSession> {
        if request.role == Role::Admin {
            return Err(AppError::Forbidden(
                "Admin accounts cannot be self-registered".to_string(),
            ));
        }

        let email = normalize_email(&request.email);
        let university_id = request
            .university_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        if self.store.user_by_email(&email).await?.is_some() {
            return Err(AppError::conflict_on("email", "Email already registered"));
        }
        if let Some(id) = &university_id {
            if self.store.user_by_university_id(id).await?.is_some() {
                return Err(AppError::conflict_on(
                    "universityId",
                    "University ID already registered",
                ));
            }
        }

        let password_hash = hash_password_blocking(request.password).await?;
        let user = self
            .store
            .create_user(NewUser {
                name: request.name.trim().to_string(),
                email,
                password_hash,
                role: request.role,
                university_id,
                phone: request.phone,
                department: request.department,
            })
            .await?;

        info!(user_id = %user.id, role = %user.role, "User registered");
        self.session(&user)
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthSession> {
        let email = normalize_email(&request.email);
        let mut user = self
            .store
            .user_by_email(&email)
            .await?
            .ok_or_else(|| AppError::Unauthenticated(INVALID_CREDENTIALS.to_string()))?;

        if !verify_password_blocking(request.password, user.password_hash.clone()).await? {
            return Err(AppError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
        }
        if !user.is_active {
            return Err(AppError::Unauthenticated(
                "Account is deactivated".to_string(),
            ));
        }

        let now = Utc::now();
        self.store.record_login(user.id, now).await?;
        user.last_login = Some(now);

        info!(user_id = %user.id, "User logged in");
        self.session(&user)
    }

    pub async fn refresh(&self, request: RefreshRequest) -> AppResult<AuthSession> {
        let claims = self.tokens.verify_refresh(&request.refresh_token)?;
        let user = self
            .store
            .user_by_id(claims.sub)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(|| AppError::Unauthenticated("Invalid refresh token".to_string()))?;

        self.session(&user)
    }

    /// Returns the raw reset token for a known, active account. Callers must
    /// answer identically whether or not a token was produced.
    pub async fn forgot_password(&self, request: ForgotPasswordRequest) -> AppResult<Option<String>> {
        let email = normalize_email(&request.email);
        let Some(user) = self
            .store
            .user_by_email(&email)
            .await?
            .filter(|user| user.is_active)
        else {
            info!("Password reset requested for unknown account");
            return Ok(None);
        };

        let token = hex::encode(rand::thread_rng().gen::<[u8; 32]>());
        let expires_at = Utc::now() + self.reset_token_ttl;
        self.store
            .set_reset_token(user.id, &digest(&token), expires_at)
            .await?;

        // No mail transport; the link is surfaced in the logs instead.
        info!(
            user_id = %user.id,
            reset_link = %format!("{}/reset-password?token={}", self.app_url, token),
            expires_at = %expires_at,
            "Password reset link issued"
        );
        Ok(Some(token))
    }

    pub async fn reset_password(&self, request: ResetPasswordRequest) -> AppResult<()> {
        let user = self
            .store
            .user_by_reset_token(&digest(&request.token), Utc::now())
            .await?
            .ok_or_else(|| {
                AppError::InvalidArgument("Invalid or expired reset token".to_string())
            })?;

        let password_hash = hash_password_blocking(request.password).await?;
        self.store.update_password(user.id, &password_hash).await?;

        info!(user_id = %user.id, "Password reset completed");
        Ok(())
    }

    fn session(&self, user: &User) -> AppResult<AuthSession> {
        Ok(AuthSession {
            user: UserProfile::from(user),
            tokens: self.tokens.issue_pair(user)?,
        })
    }
}
