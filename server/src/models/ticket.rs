use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::event::TicketKind;
use crate::models::transaction::Transaction;
use crate::utils::error::AppError;

text_enum! {
    TicketStatus {
        Purchased => "purchased",
        Used => "used",
        Refunded => "refunded",
        Expired => "expired",
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Uuid,
    pub event_id: Uuid,
    pub buyer_id: Uuid,
    #[serde(rename = "type")]
    pub kind: TicketKind,
    pub price: Decimal,
    pub qr_code: String,
    pub status: TicketStatus,
    pub purchase_date: DateTime<Utc>,
    pub used_date: Option<DateTime<Utc>>,
    pub checked_in_by: Option<Uuid>,
    pub transaction_id: Uuid,
}

/// A batch purchase of one fare class, applied atomically by the store.
#[derive(Debug, Clone)]
pub struct IssueTickets {
    pub event_id: Uuid,
    pub kind: TicketKind,
    pub quantity: i32,
    pub buyer_id: Uuid,
    /// Upper bound on the buyer's purchased tickets for the event,
    /// including this batch.
    pub per_buyer_limit: i64,
    pub issued_at: DateTime<Utc>,
}

impl IssueTickets {
    pub fn over_limit(&self, held: i64) -> bool {
        held + i64::from(self.quantity) > self.per_buyer_limit
    }

    pub fn limit_error(&self) -> AppError {
        AppError::conflict(format!(
            "Maximum {} tickets per user for this event",
            self.per_buyer_limit
        ))
    }
}

#[derive(Debug, Clone)]
pub struct IssuedTickets {
    pub tickets: Vec<Ticket>,
    pub transaction: Transaction,
}

#[derive(Debug, Clone)]
pub struct TicketQuery {
    pub page: i64,
    pub limit: i64,
    pub status: Option<TicketStatus>,
    /// Only tickets whose event starts at or after this instant.
    pub upcoming_from: Option<DateTime<Utc>>,
}

impl TicketQuery {
    pub fn offset(&self) -> i64 {
        (self.page - 1).max(0).saturating_mul(self.limit)
    }
}
