use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{auth, dashboard, events, health_check, payments, tickets};
use crate::state::AppState;

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/me", get(auth::me))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
}

fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(events::list_events).post(events::create_event))
        .route(
            "/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::cancel_event),
        )
}

fn ticket_routes() -> Router<AppState> {
    Router::new()
        .route("/buy", post(tickets::buy_tickets))
        .route("/user/:user_id", get(tickets::user_tickets))
        .route("/:id/qr", get(tickets::ticket_qr))
        .route("/:id/checkin", post(tickets::check_in))
}

fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/initiate", post(payments::initiate_payment))
        .route("/callback/:gateway", post(payments::payment_callback))
}

fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/admin", get(dashboard::admin_dashboard))
        .route("/staff/:user_id", get(dashboard::staff_dashboard))
        .route("/student/:user_id", get(dashboard::student_dashboard))
}

pub fn create_routes(state: AppState) -> Router {
    let security = create_security_headers_layer(&state.config);
    let cors = create_cors_layer(&state.config);

    Router::new()
        .route("/health", get(health_check))
        .nest("/auth", auth_routes())
        .nest("/events", event_routes())
        .nest("/tickets", ticket_routes())
        .nest("/payments", payment_routes())
        .nest("/dashboard", dashboard_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(security)
        .layer(cors)
}
