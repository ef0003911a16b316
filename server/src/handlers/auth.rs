use axum::extract::State;
use axum::response::Response;

use crate::auth::CurrentUser;
use crate::models::user::UserProfile;
use crate::services::accounts::{
    ForgotPasswordRequest, LoginRequest, RefreshRequest, RegisterRequest, ResetPasswordRequest,
};
use crate::state::AppState;
use crate::utils::error::AppResult;
use crate::utils::response::{created, empty_success, success};
use crate::utils::validation::ValidatedJson;

pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> AppResult<Response> {
    let session = state.accounts.register(body).await?;
    Ok(created(session, "User registered successfully"))
}

pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> AppResult<Response> {
    let session = state.accounts.login(body).await?;
    Ok(success(session, "Login successful"))
}

pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RefreshRequest>,
) -> AppResult<Response> {
    let session = state.accounts.refresh(body).await?;
    Ok(success(session, "Token refreshed"))
}

pub async fn me(CurrentUser(user): CurrentUser) -> Response {
    success(UserProfile::from(&user), "Current user")
}

pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<ForgotPasswordRequest>,
) -> AppResult<Response> {
    state.accounts.forgot_password(body).await?;
    Ok(empty_success(
        "If an account with that email exists, a password reset link has been sent",
    ))
}

pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<ResetPasswordRequest>,
) -> AppResult<Response> {
    state.accounts.reset_password(body).await?;
    Ok(empty_success("Password has been reset successfully"))
}
