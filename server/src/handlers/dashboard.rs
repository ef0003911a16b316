use axum::extract::{Path, State};
use axum::response::Response;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::models::user::Role;
use crate::state::AppState;
use crate::utils::error::AppResult;
use crate::utils::response::success;

pub async fn student_dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Response> {
    user.require_owner_or_admin(user_id)?;
    let dashboard = state.dashboard.student(user_id).await?;
    Ok(success(dashboard, "Student dashboard"))
}

pub async fn staff_dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Response> {
    user.require_owner_or_admin(user_id)?;
    let dashboard = state.dashboard.staff(user_id).await?;
    Ok(success(dashboard, "Staff dashboard"))
}

pub async fn admin_dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Response> {
    user.require_role(&[Role::Admin])?;
    let dashboard = state.dashboard.admin().await?;
    Ok(success(dashboard, "Admin dashboard"))
}
