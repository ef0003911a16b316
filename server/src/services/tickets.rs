use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use qrcode::render::svg;
use qrcode::QrCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::models::event::{Event, EventCategory, EventStatus, TicketKind};
use crate::models::ticket::{IssueTickets, Ticket, TicketQuery, TicketStatus};
use crate::models::transaction::Transaction;
use crate::models::user::{Role, User};
use crate::models::Pagination;
use crate::services::PageParams;
use crate::store::Store;
use crate::utils::error::{AppError, AppResult};

const QR_SIZE: u32 = 300;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub event_id: Uuid,
    pub ticket_type: TicketKind,
    #[validate(range(min = 1, max = 10, message = "Quantity must be between 1 and 10"))]
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub tickets: Vec<Ticket>,
    pub transaction: Transaction,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserTicketParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<TicketStatus>,
    pub upcoming: Option<bool>,
}

/// Event fields shown next to a ticket.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub id: Uuid,
    pub title: String,
    pub date: DateTime<Utc>,
    pub venue: String,
    pub status: EventStatus,
    pub category: EventCategory,
    pub images: Vec<String>,
}

impl From<&Event> for EventSummary {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            title: event.title.clone(),
            date: event.date,
            venue: event.venue.clone(),
            status: event.status,
            category: event.category,
            images: event.images.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketWithEvent {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub event: Option<EventSummary>,
}

/// Pairs each ticket with its event, preserving ticket order.
pub fn attach_events(tickets: Vec<Ticket>, events: &[Event]) -> Vec<TicketWithEvent> {
    let by_id: HashMap<Uuid, &Event> = events.iter().map(|e| (e.id, e)).collect();
    tickets
        .into_iter()
        .map(|ticket| TicketWithEvent {
            event: by_id.get(&ticket.event_id).map(|e| EventSummary::from(*e)),
            ticket,
        })
        .collect()
}

pub fn distinct_event_ids(tickets: &[Ticket]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    tickets
        .iter()
        .map(|t| t.event_id)
        .filter(|id| seen.insert(*id))
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketQrSummary {
    pub id: Uuid,
    pub event_title: String,
    pub event_date: DateTime<Utc>,
    pub venue: String,
    pub ticket_type: TicketKind,
    pub qr_code: String,
    pub status: TicketStatus,
    pub buyer_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketQr {
    /// `data:image/svg+xml;base64,...`
    pub qr_code: String,
    pub ticket: TicketQrSummary,
}

fn render_qr(payload: &str) -> AppResult<String> {
    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| AppError::Internal(format!("failed to encode QR payload: {e}")))?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(QR_SIZE, QR_SIZE)
        .quiet_zone(true)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();
    Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(image)))
}

pub struct TicketService {
    store: Arc<dyn Store>,
    max_tickets_per_user: i64,
}

impl TicketService {
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Self {
        Self {
            store,
            max_tickets_per_user: config.max_tickets_per_user,
        }
    }

    pub async fn purchase(&self, buyer: &User, request: PurchaseRequest) -> AppResult<Purchase> {
        let event = self
            .store
            .event_by_id(request.event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
        if event.status != EventStatus::Published {
            return Err(AppError::InvalidState(
                "Event is not available for purchase".to_string(),
            ));
        }

        let ticket_type = event
            .ticket_type(request.ticket_type)
            .ok_or_else(|| AppError::InvalidArgument("Invalid ticket type".to_string()))?;
        if ticket_type.available < request.quantity {
            return Err(AppError::conflict("Not enough tickets available"));
        }

        let issue = IssueTickets {
            event_id: event.id,
            kind: request.ticket_type,
            quantity: request.quantity,
            buyer_id: buyer.id,
            per_buyer_limit: self.max_tickets_per_user,
            issued_at: Utc::now(),
        };
        let held = self
            .store
            .count_buyer_tickets(event.id, buyer.id, TicketStatus::Purchased)
            .await?;
        if issue.over_limit(held) {
            return Err(issue.limit_error());
        }

        // The store re-checks availability and the per-buyer cap atomically;
        // a concurrent purchase may still win here.
        let issued = self.store.issue_tickets(issue).await?;

        info!(
            event_id = %event.id,
            buyer_id = %buyer.id,
            ticket_type = %request.ticket_type,
            quantity = request.quantity,
            transaction_id = %issued.transaction.id,
            "Tickets issued"
        );

        Ok(Purchase {
            total_amount: issued.transaction.amount,
            tickets: issued.tickets,
            transaction: issued.transaction,
        })
    }

    pub async fn list_for_user(
        &self,
        actor: &User,
        user_id: Uuid,
        params: UserTicketParams,
    ) -> AppResult<(Vec<TicketWithEvent>, Pagination)> {
        if actor.id != user_id && !actor.is_admin() {
            return Err(AppError::Forbidden("Access denied".to_string()));
        }

        let paging = PageParams {
            page: params.page,
            limit: params.limit,
        };
        let query = TicketQuery {
            page: paging.page(),
            limit: paging.limit(),
            status: params.status,
            upcoming_from: params.upcoming.unwrap_or(false).then(Utc::now),
        };

        let page = self.store.tickets_for_buyer(user_id, &query).await?;
        let events = self
            .store
            .events_by_ids(&distinct_event_ids(&page.items))
            .await?;

        Ok((
            attach_events(page.items, &events),
            Pagination::new(query.page, query.limit, page.total),
        ))
    }

    /// Students may only render their own tickets; staff and admins any.
    pub async fn qr_code(&self, actor: &User, ticket_id: Uuid) -> AppResult<TicketQr> {
        let ticket = self
            .store
            .ticket_by_id(ticket_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;
        if actor.role == Role::Student && ticket.buyer_id != actor.id {
            return Err(AppError::Forbidden("Access denied".to_string()));
        }

        let event = self
            .store
            .event_by_id(ticket.event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
        let buyer_name = self
            .store
            .user_by_id(ticket.buyer_id)
            .await?
            .map(|u| u.name)
            .unwrap_or_default();

        let payload = json!({
            "ticketId": ticket.id,
            "qrCode": ticket.qr_code,
            "eventTitle": event.title,
            "eventDate": event.date,
            "venue": event.venue,
            "ticketType": ticket.kind,
            "buyerName": buyer_name,
        });

        Ok(TicketQr {
            qr_code: render_qr(&payload.to_string())?,
            ticket: TicketQrSummary {
                id: ticket.id,
                event_title: event.title,
                event_date: event.date,
                venue: event.venue,
                ticket_type: ticket.kind,
                qr_code: ticket.qr_code,
                status: ticket.status,
                buyer_name,
            },
        })
    }
}
