use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::models::event::Event;
use crate::models::ticket::{Ticket, TicketStatus};
use crate::models::user::User;
use crate::store::Store;
use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    #[validate(length(min = 1, message = "QR code is required"))]
    pub qr_code: String,
}

/// Decides whether `ticket` may be admitted to `event` at `now`.
///
/// An event that started earlier on the current UTC day still admits.
pub fn evaluate(ticket: &Ticket, event: &Event, qr_code: &str, now: DateTime<Utc>) -> AppResult<()> {
    if ticket.qr_code != qr_code {
        return Err(AppError::InvalidArgument("Invalid QR code".to_string()));
    }

    match ticket.status {
        TicketStatus::Purchased => {}
        TicketStatus::Used => return Err(AppError::AlreadyUsed),
        TicketStatus::Refunded | TicketStatus::Expired => {
            return Err(AppError::InvalidState(
                "Ticket is not valid for check-in".to_string(),
            ))
        }
    }

    if event.date < now && event.date.date_naive() != now.date_naive() {
        return Err(AppError::EventExpired);
    }
    Ok(())
}

pub struct CheckInService {
    store: Arc<dyn Store>,
}

impl CheckInService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn check_in(&self, staff: &User, ticket_id: Uuid, qr_code: &str) -> AppResult<Ticket> {
        let ticket = self
            .store
            .ticket_by_id(ticket_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;
        let event = self
            .store
            .event_by_id(ticket.event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        let now = Utc::now();
        evaluate(&ticket, &event, qr_code, now)?;

        // Losing a concurrent scan means someone else admitted it first.
        let used = self
            .store
            .mark_ticket_used(ticket.id, staff.id, now)
            .await?
            .ok_or(AppError::AlreadyUsed)?;

        info!(ticket_id = %used.id, event_id = %event.id, staff_id = %staff.id, "Ticket checked in");
        Ok(used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::{EventCategory, EventStatus, TicketKind};
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    fn event_at(date: DateTime<Utc>) -> Event {
        Event {
            id: Uuid::new_v4(),
            title: "Robotics Showcase".into(),
            description: "Final year projects".into(),
            category: EventCategory::Academic,
            date,
            end_date: None,
            venue: "Engineering Hall".into(),
            capacity: 200,
            ticket_types: vec![],
            organizer_id: Uuid::new_v4(),
            images: vec![],
            videos: vec![],
            tags: vec![],
            is_featured: false,
            requires_approval: false,
            status: EventStatus::Published,
            published_at: None,
            created_at: date,
            updated_at: date,
        }
    }

    fn ticket_for(event: &Event, status: TicketStatus) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            event_id: event.id,
            buyer_id: Uuid::new_v4(),
            kind: TicketKind::General,
            price: Decimal::ZERO,
            qr_code: "qr-123".into(),
            status,
            purchase_date: event.created_at,
            used_date: None,
            checked_in_by: None,
            transaction_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_same_day_event_still_admits() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 18, 0, 0).unwrap();
        let event = event_at(Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap());
        let ticket = ticket_for(&event, TicketStatus::Purchased);
        assert!(evaluate(&ticket, &event, "qr-123", now).is_ok());
    }

    #[test]
    fn test_previous_day_event_is_expired() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 0, 30, 0).unwrap();
        let event = event_at(now - Duration::hours(1));
        let ticket = ticket_for(&event, TicketStatus::Purchased);
        assert!(matches!(
            evaluate(&ticket, &event, "qr-123", now),
            Err(AppError::EventExpired)
        ));
    }

    #[test]
    fn test_rejections_by_status_and_qr() {
        let now = Utc::now();
        let event = event_at(now + Duration::days(2));

        let used = ticket_for(&event, TicketStatus::Used);
        assert!(matches!(
            evaluate(&used, &event, "qr-123", now),
            Err(AppError::AlreadyUsed)
        ));

        let refunded = ticket_for(&event, TicketStatus::Refunded);
        assert!(matches!(
            evaluate(&refunded, &event, "qr-123", now),
            Err(AppError::InvalidState(_))
        ));

        let purchased = ticket_for(&event, TicketStatus::Purchased);
        assert!(matches!(
            evaluate(&purchased, &event, "wrong", now),
            Err(AppError::InvalidArgument(_))
        ));
    }
}
