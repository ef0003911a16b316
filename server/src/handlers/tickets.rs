use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::models::user::Role;
use crate::models::Pagination;
use crate::services::checkin::CheckInRequest;
use crate::services::tickets::{PurchaseRequest, TicketWithEvent, UserTicketParams};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};
use crate::utils::response::{created, success};
use crate::utils::validation::ValidatedJson;

#[derive(Serialize)]
struct TicketPage {
    tickets: Vec<TicketWithEvent>,
    pagination: Pagination,
}

pub async fn buy_tickets(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(body): ValidatedJson<PurchaseRequest>,
) -> AppResult<Response> {
    let purchase = state.tickets.purchase(&user, body).await?;
    Ok(created(
        purchase,
        "Tickets created successfully. Please complete payment.",
    ))
}

pub async fn user_tickets(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<Uuid>,
    params: Result<Query<UserTicketParams>, QueryRejection>,
) -> AppResult<Response> {
    let Query(params) = params.map_err(|e| AppError::InvalidArgument(e.body_text()))?;
    let (tickets, pagination) = state.tickets.list_for_user(&user, user_id, params).await?;
    Ok(success(TicketPage { tickets, pagination }, "Tickets retrieved"))
}

pub async fn ticket_qr(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let qr = state.tickets.qr_code(&user, id).await?;
    Ok(success(qr, "QR code generated"))
}

pub async fn check_in(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(body): ValidatedJson<CheckInRequest>,
) -> AppResult<Response> {
    user.require_role(&[Role::Staff, Role::Admin])?;
    let ticket = state.checkin.check_in(&user.0, id, &body.qr_code).await?;
    Ok(success(ticket, "Ticket checked in successfully"))
}
