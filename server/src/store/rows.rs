//! Row shapes as stored in PostgreSQL and their mapping to domain records.
//! Enumerations are kept as `TEXT` columns and parsed on the way out.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::event::{Event, TicketType};
use crate::models::notification::Notification;
use crate::models::ticket::Ticket;
use crate::models::transaction::Transaction;
use crate::models::user::User;
use crate::utils::error::AppError;

#[derive(Debug, FromRow)]
pub(super) struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub university_id: Option<String>,
    pub profile_pic: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub reset_token_hash: Option<String>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse()?,
            university_id: row.university_id,
            profile_pic: row.profile_pic,
            phone: row.phone,
            department: row.department,
            is_active: row.is_active,
            last_login: row.last_login,
            reset_token_hash: row.reset_token_hash,
            reset_token_expires_at: row.reset_token_expires_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(super) struct EventRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub venue: String,
    pub capacity: i32,
    pub organizer_id: Uuid,
    pub images: Vec<String>,
    pub videos: Vec<String>,
    pub tags: Vec<String>,
    pub is_featured: bool,
    pub requires_approval: bool,
    pub status: String,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub(super) struct TicketTypeRow {
    pub event_id: Uuid,
    pub kind: String,
    pub price: Decimal,
    pub quantity: i32,
    pub available: i32,
}

impl TryFrom<TicketTypeRow> for TicketType {
    type Error = AppError;

    fn try_from(row: TicketTypeRow) -> Result<Self, Self::Error> {
        Ok(TicketType {
            kind: row.kind.parse()?,
            price: row.price,
            quantity: row.quantity,
            available: row.available,
        })
    }
}

impl EventRow {
    /// Joins the event with its fare classes, picking the ones it owns.
    pub fn into_event(self, types: &mut Vec<TicketTypeRow>) -> Result<Event, AppError> {
        let (mine, rest): (Vec<_>, Vec<_>) =
            types.drain(..).partition(|t| t.event_id == self.id);
        *types = rest;

        Ok(Event {
            id: self.id,
            title: self.title,
            description: self.description,
            category: self.category.parse()?,
            date: self.date,
            end_date: self.end_date,
            venue: self.venue,
            capacity: self.capacity,
            ticket_types: mine
                .into_iter()
                .map(TicketType::try_from)
                .collect::<Result<_, _>>()?,
            organizer_id: self.organizer_id,
            images: self.images,
            videos: self.videos,
            tags: self.tags,
            is_featured: self.is_featured,
            requires_approval: self.requires_approval,
            status: self.status.parse()?,
            published_at: self.published_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(super) struct TicketRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub buyer_id: Uuid,
    pub kind: String,
    pub price: Decimal,
    pub qr_code: String,
    pub status: String,
    pub purchase_date: DateTime<Utc>,
    pub used_date: Option<DateTime<Utc>>,
    pub checked_in_by: Option<Uuid>,
    pub transaction_id: Uuid,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = AppError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        Ok(Ticket {
            id: row.id,
            event_id: row.event_id,
            buyer_id: row.buyer_id,
            kind: row.kind.parse()?,
            price: row.price,
            qr_code: row.qr_code,
            status: row.status.parse()?,
            purchase_date: row.purchase_date,
            used_date: row.used_date,
            checked_in_by: row.checked_in_by,
            transaction_id: row.transaction_id,
        })
    }
}

#[derive(Debug, FromRow)]
pub(super) struct TransactionRow {
    pub id: Uuid,
    pub ticket_ids: Vec<Uuid>,
    pub buyer_id: Uuid,
    pub amount: Decimal,
    pub payment_method: String,
    pub status: String,
    pub merchant_request_id: Option<String>,
    pub gateway_reference: Option<String>,
    pub failure_reason: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = AppError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: row.id,
            ticket_ids: row.ticket_ids,
            buyer_id: row.buyer_id,
            amount: row.amount,
            payment_method: row.payment_method.parse()?,
            status: row.status.parse()?,
            merchant_request_id: row.merchant_request_id,
            gateway_reference: row.gateway_reference,
            failure_reason: row.failure_reason,
            payment_date: row.payment_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(super) struct NotificationRow {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub event_id: Option<Uuid>,
    pub ticket_id: Option<Uuid>,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = AppError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: row.id,
            recipient_id: row.recipient_id,
            event_id: row.event_id,
            ticket_id: row.ticket_id,
            kind: row.kind.parse()?,
            title: row.title,
            message: row.message,
            is_read: row.is_read,
            created_at: row.created_at,
        })
    }
}

/// Converts a batch of rows, failing on the first unparsable one.
pub(super) fn convert<R, T>(rows: Vec<R>) -> Result<Vec<T>, AppError>
where
    T: TryFrom<R, Error = AppError>,
{
    rows.into_iter().map(T::try_from).collect()
}
