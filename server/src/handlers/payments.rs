use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;

use crate::auth::CurrentUser;
use crate::payments::gateway::StkCallbackEnvelope;
use crate::services::payments::InitiatePaymentRequest;
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};
use crate::utils::response::{empty_success, success};
use crate::utils::validation::ValidatedJson;

pub async fn initiate_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(body): ValidatedJson<InitiatePaymentRequest>,
) -> AppResult<Response> {
    let outcome = state.payments.initiate(&user, body).await?;
    Ok(success(outcome, "Payment initiated successfully"))
}

pub async fn payment_callback(
    State(state): State<AppState>,
    Path(gateway): Path<String>,
    body: Result<Json<StkCallbackEnvelope>, JsonRejection>,
) -> AppResult<Response> {
    let Json(envelope) = body.map_err(|rejection| {
        tracing::warn!(gateway = %gateway, error = %rejection.body_text(), "Malformed gateway callback");
        AppError::InvalidArgument("Invalid callback format".to_string())
    })?;

    state
        .payments
        .handle_callback(&gateway, envelope.body.stk_callback)
        .await?;
    Ok(empty_success("Callback processed successfully"))
}
