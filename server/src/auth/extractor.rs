use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::models::user::{Role, User};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};

/// The authenticated caller, loaded fresh from the store on every request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

fn bearer_token(parts: &Parts) -> AppResult<&str> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthenticated("Access token required".to_string()))?;

    match header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AppError::Unauthenticated(
            "Invalid authorization format. Expected 'Bearer <token>'".to_string(),
        )),
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.tokens.verify_access(token)?;

        let user = state
            .store
            .user_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthenticated("User not found".to_string()))?;

        if !user.is_active {
            return Err(AppError::Unauthenticated(
                "Account is deactivated".to_string(),
            ));
        }

        Ok(CurrentUser(user))
    }
}

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn require_role(&self, allowed: &[Role]) -> AppResult<()> {
        if allowed.contains(&self.0.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden("Insufficient permissions".to_string()))
        }
    }

    pub fn require_owner_or_admin(&self, owner_id: Uuid) -> AppResult<()> {
        if self.0.id == owner_id || self.0.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Access denied".to_string()))
        }
    }
}
