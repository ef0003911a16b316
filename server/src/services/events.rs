use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::models::event::{
    DateWindow, Event, EventCategory, EventChanges, EventQuery, EventStatus, NewEvent,
    TicketKind, TicketType,
};
use crate::models::ticket::TicketStatus;
use crate::models::user::User;
use crate::models::Pagination;
use crate::services::PageParams;
use crate::store::Store;
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation::validate_tags;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketTypeInput {
    #[serde(rename = "type")]
    pub kind: TicketKind,
    pub price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[validate(length(min = 5, max = 200, message = "Title must be between 5 and 200 characters"))]
    pub title: String,
    #[validate(length(
        min = 10,
        max = 5000,
        message = "Description must be between 10 and 5000 characters"
    ))]
    pub description: String,
    pub category: EventCategory,
    pub date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    #[validate(length(min = 2, max = 200, message = "Venue must be between 2 and 200 characters"))]
    pub venue: String,
    #[validate(range(min = 1, message = "Capacity must be at least 1"))]
    pub capacity: i32,
    #[validate(length(min = 1, message = "At least one ticket type is required"))]
    pub ticket_types: Vec<TicketTypeInput>,
    #[serde(default)]
    #[validate(custom(function = "validate_tags"))]
    pub tags: Vec<String>,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub videos: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[validate(length(min = 5, max = 200, message = "Title must be between 5 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(
        min = 10,
        max = 5000,
        message = "Description must be between 10 and 5000 characters"
    ))]
    pub description: Option<String>,
    pub category: Option<EventCategory>,
    pub date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[validate(length(min = 2, max = 200, message = "Venue must be between 2 and 200 characters"))]
    pub venue: Option<String>,
    #[validate(range(min = 1, message = "Capacity must be at least 1"))]
    pub capacity: Option<i32>,
    pub ticket_types: Option<Vec<TicketTypeInput>>,
    #[validate(custom(function = "validate_tags"))]
    pub tags: Option<Vec<String>>,
    pub requires_approval: Option<bool>,
    pub is_featured: Option<bool>,
    pub images: Option<Vec<String>>,
    pub videos: Option<Vec<String>>,
    pub status: Option<EventStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<EventCategory>,
    pub search: Option<String>,
    pub date: Option<DateWindow>,
    pub featured: Option<bool>,
}

fn ticket_types(inputs: &[TicketTypeInput]) -> AppResult<Vec<TicketType>> {
    if inputs.is_empty() {
        return Err(AppError::InvalidArgument(
            "At least one ticket type is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            if !seen.insert(input.kind) {
                return Err(AppError::InvalidArgument(format!(
                    "Duplicate ticket type '{}'",
                    input.kind
                )));
            }
            if input.price < Decimal::ZERO {
                return Err(AppError::InvalidArgument(
                    "Ticket price cannot be negative".to_string(),
                ));
            }
            if input.quantity < 1 {
                return Err(AppError::InvalidArgument(
                    "Ticket quantity must be at least 1".to_string(),
                ));
            }
            Ok(TicketType::new(input.kind, input.price, input.quantity))
        })
        .collect()
}

fn check_schedule(
    date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if date <= now {
        return Err(AppError::InvalidArgument(
            "Event date must be in the future".to_string(),
        ));
    }
    if end_date.is_some_and(|end| end < date) {
        return Err(AppError::InvalidArgument(
            "End date must be after start date".to_string(),
        ));
    }
    Ok(())
}

fn require_organizer(actor: &User, event: &Event) -> AppResult<()> {
    if actor.is_admin() || actor.id == event.organizer_id {
        Ok(())
    } else {
        Err(AppError::Forbidden("Permission denied".to_string()))
    }
}

pub struct EventService {
    store: Arc<dyn Store>,
}

impl EventService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self, params: EventListParams) -> AppResult<(Vec<Event>, Pagination)> {
        let paging = PageParams {
            page: params.page,
            limit: params.limit,
        };
        let query = EventQuery {
            page: paging.page(),
            limit: paging.limit(),
            category: params.category,
            search: params
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            date: params.date,
            featured: params.featured.unwrap_or(false),
            now: Utc::now(),
        };

        let page = self.store.list_events(&query).await?;
        let pagination = Pagination::new(query.page, query.limit, page.total);
        Ok((page.items, pagination))
    }

    pub async fn create(&self, actor: &User, request: CreateEventRequest) -> AppResult<Event> {
        let now = Utc::now();
        check_schedule(request.date, request.end_date, now)?;
        let ticket_types = ticket_types(&request.ticket_types)?;

        let event = self
            .store
            .create_event(
                NewEvent {
                    title: request.title,
                    description: request.description,
                    category: request.category,
                    date: request.date,
                    end_date: request.end_date,
                    venue: request.venue,
                    capacity: request.capacity,
                    ticket_types,
                    organizer_id: actor.id,
                    images: request.images,
                    videos: request.videos,
                    tags: request.tags,
                    requires_approval: request.requires_approval,
                },
                now,
            )
            .await?;

        info!(event_id = %event.id, organizer_id = %actor.id, "Event created");
        Ok(event)
    }

    /// Drafts are only visible to their organizer and to admins.
    pub async fn get(&self, id: Uuid, viewer: Option<&User>) -> AppResult<Event> {
        let event = self.find(id).await?;
        if event.status == EventStatus::Draft {
            let viewer = viewer.ok_or_else(|| {
                AppError::Unauthenticated("Access token required".to_string())
            })?;
            require_organizer(viewer, &event)?;
        }
        Ok(event)
    }

    pub async fn update(
        &self,
        actor: &User,
        id: Uuid,
        request: UpdateEventRequest,
    ) -> AppResult<Event> {
        let event = self.find(id).await?;
        require_organizer(actor, &event)?;

        if event.status == EventStatus::Published && !actor.is_admin() {
            return Err(AppError::InvalidState(
                "Cannot edit published events".to_string(),
            ));
        }

        let now = Utc::now();
        if request.date.is_some() || request.end_date.is_some() {
            let date = request.date.unwrap_or(event.date);
            let end_date = request.end_date.or(event.end_date);
            check_schedule(date, end_date, now)?;
        }

        let ticket_types = match &request.ticket_types {
            Some(inputs) => {
                if self.store.count_event_tickets(id, None).await? > 0 {
                    return Err(AppError::InvalidState(
                        "Ticket types cannot be changed once tickets have been issued".to_string(),
                    ));
                }
                Some(ticket_types(inputs)?)
            }
            None => None,
        };

        let changes = EventChanges {
            title: request.title,
            description: request.description,
            category: request.category,
            date: request.date,
            end_date: request.end_date,
            venue: request.venue,
            capacity: request.capacity,
            ticket_types,
            images: request.images,
            videos: request.videos,
            tags: request.tags,
            is_featured: request.is_featured,
            requires_approval: request.requires_approval,
            status: request.status,
        };

        let updated = self
            .store
            .update_event(id, changes, now)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        info!(event_id = %id, status = %updated.status, "Event updated");
        Ok(updated)
    }

    /// Soft delete. Organizers cannot cancel once tickets are outstanding.
    pub async fn cancel(&self, actor: &User, id: Uuid) -> AppResult<Event> {
        let event = self.find(id).await?;
        require_organizer(actor, &event)?;

        let sold = self
            .store
            .count_event_tickets(id, Some(TicketStatus::Purchased))
            .await?;
        if sold > 0 && !actor.is_admin() {
            return Err(AppError::InvalidState(
                "Cannot delete event with sold tickets".to_string(),
            ));
        }

        let cancelled = self
            .store
            .set_event_status(id, EventStatus::Cancelled, Utc::now())
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        info!(event_id = %id, sold, "Event cancelled");
        Ok(cancelled)
    }

    async fn find(&self, id: Uuid) -> AppResult<Event> {
        self.store
            .event_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(kind: TicketKind, price: i64, quantity: i32) -> TicketTypeInput {
        TicketTypeInput {
            kind,
            price: Decimal::new(price, 0),
            quantity,
        }
    }

    #[test]
    fn test_ticket_types_start_fully_available() {
        let types = ticket_types(&[
            input(TicketKind::General, 500, 100),
            input(TicketKind::Vip, 1500, 10),
        ])
        .unwrap();
        assert_eq!(types[1].available, 10);
        assert_eq!(types[1].quantity, 10);
    }

    #[test]
    fn test_ticket_types_reject_duplicates_and_bad_values() {
        assert!(ticket_types(&[]).is_err());
        assert!(ticket_types(&[
            input(TicketKind::Free, 0, 5),
            input(TicketKind::Free, 0, 5)
        ])
        .is_err());
        assert!(ticket_types(&[input(TicketKind::General, -1, 5)]).is_err());
        assert!(ticket_types(&[input(TicketKind::General, 100, 0)]).is_err());
    }

    #[test]
    fn test_create_request_requires_a_ticket_type() {
        let mut request = CreateEventRequest {
            title: "Freshers Night".to_string(),
            description: "Welcome party for first years".to_string(),
            category: EventCategory::Social,
            date: Utc::now() + chrono::Duration::days(2),
            end_date: None,
            venue: "Student Centre".to_string(),
            capacity: 400,
            ticket_types: vec![],
            tags: vec![],
            requires_approval: false,
            images: vec![],
            videos: vec![],
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("ticket_types"));

        request.ticket_types = vec![input(TicketKind::General, 300, 400)];
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_schedule_rules() {
        let now = Utc::now();
        let tomorrow = now + chrono::Duration::days(1);
        assert!(check_schedule(tomorrow, None, now).is_ok());
        assert!(check_schedule(now - chrono::Duration::hours(1), None, now).is_err());
        assert!(check_schedule(tomorrow, Some(now), now).is_err());
    }
}
