use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::models::event::Event;
use crate::models::user::Role;
use crate::models::Pagination;
use crate::services::events::{CreateEventRequest, EventListParams, UpdateEventRequest};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};
use crate::utils::response::{created, success};
use crate::utils::validation::ValidatedJson;

#[derive(Serialize)]
struct EventPage {
    events: Vec<Event>,
    pagination: Pagination,
}

pub async fn list_events(
    State(state): State<AppState>,
    params: Result<Query<EventListParams>, QueryRejection>,
) -> AppResult<Response> {
    let Query(params) = params.map_err(|e| AppError::InvalidArgument(e.body_text()))?;
    let (events, pagination) = state.events.list(params).await?;
    Ok(success(EventPage { events, pagination }, "Events retrieved"))
}

pub async fn create_event(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(body): ValidatedJson<CreateEventRequest>,
) -> AppResult<Response> {
    user.require_role(&[Role::Staff, Role::Admin])?;
    let event = state.events.create(&user.0, body).await?;
    Ok(created(event, "Event created successfully"))
}

pub async fn get_event(
    State(state): State<AppState>,
    viewer: Option<CurrentUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let event = state
        .events
        .get(id, viewer.as_ref().map(|CurrentUser(user)| user))
        .await?;
    Ok(success(event, "Event retrieved"))
}

pub async fn update_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<UpdateEventRequest>,
) -> AppResult<Response> {
    let event = state.events.update(&user, id, body).await?;
    Ok(success(event, "Event updated successfully"))
}

pub async fn cancel_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let event = state.events.cancel(&user, id).await?;
    Ok(success(event, "Event cancelled successfully"))
}
