use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

text_enum! {
    EventCategory {
        Academic => "academic",
        Sports => "sports",
        Cultural => "cultural",
        Social => "social",
        Conference => "conference",
    }
}

text_enum! {
    EventStatus {
        Draft => "draft",
        Published => "published",
        Cancelled => "cancelled",
        Completed => "completed",
    }
}

text_enum! {
    /// Fare class within an event; each has its own price and inventory pool.
    TicketKind {
        Free => "free",
        Vip => "vip",
        General => "general",
        Student => "student",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketType {
    #[serde(rename = "type")]
    pub kind: TicketKind,
    pub price: Decimal,
    pub quantity: i32,
    pub available: i32,
}

impl TicketType {
    /// A fresh fare class with its whole quantity on sale.
    pub fn new(kind: TicketKind, price: Decimal, quantity: i32) -> Self {
        Self {
            kind,
            price,
            quantity,
            available: quantity,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: EventCategory,
    pub date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub venue: String,
    pub capacity: i32,
    pub ticket_types: Vec<TicketType>,
    pub organizer_id: Uuid,
    pub images: Vec<String>,
    pub videos: Vec<String>,
    pub tags: Vec<String>,
    pub is_featured: bool,
    pub requires_approval: bool,
    pub status: EventStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn ticket_type(&self, kind: TicketKind) -> Option<&TicketType> {
        self.ticket_types.iter().find(|t| t.kind == kind)
    }
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub category: EventCategory,
    pub date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub venue: String,
    pub capacity: i32,
    pub ticket_types: Vec<TicketType>,
    pub organizer_id: Uuid,
    pub images: Vec<String>,
    pub videos: Vec<String>,
    pub tags: Vec<String>,
    pub requires_approval: bool,
}

/// Field-level edits; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct EventChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<EventCategory>,
    pub date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub venue: Option<String>,
    pub capacity: Option<i32>,
    pub ticket_types: Option<Vec<TicketType>>,
    pub images: Option<Vec<String>>,
    pub videos: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub is_featured: Option<bool>,
    pub requires_approval: Option<bool>,
    pub status: Option<EventStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateWindow {
    Upcoming,
    Past,
}

/// Filters for the public event listing. Only published events are listed.
#[derive(Debug, Clone)]
pub struct EventQuery {
    pub page: i64,
    pub limit: i64,
    pub category: Option<EventCategory>,
    pub search: Option<String>,
    pub date: Option<DateWindow>,
    pub featured: bool,
    pub now: DateTime<Utc>,
}

impl EventQuery {
    pub fn offset(&self) -> i64 {
        (self.page - 1).max(0).saturating_mul(self.limit)
    }

    pub fn matches(&self, event: &Event) -> bool {
        if event.status != EventStatus::Published {
            return false;
        }
        if self.category.is_some_and(|c| c != event.category) {
            return false;
        }
        if self.featured && !event.is_featured {
            return false;
        }
        match self.date {
            Some(DateWindow::Upcoming) if event.date < self.now => return false,
            Some(DateWindow::Past) if event.date >= self.now => return false,
            _ => {}
        }
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            return event.title.to_lowercase().contains(&term)
                || event.description.to_lowercase().contains(&term);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: i64, limit: i64) -> EventQuery {
        EventQuery {
            page,
            limit,
            category: None,
            search: None,
            date: None,
            featured: false,
            now: Utc::now(),
        }
    }

    #[test]
    fn test_offset_saturates_for_huge_pages() {
        assert_eq!(query(3, 10).offset(), 20);
        assert_eq!(query(i64::MAX, 100).offset(), i64::MAX);
    }
}
