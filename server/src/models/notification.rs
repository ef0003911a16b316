use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

text_enum! {
    NotificationKind {
        EventReminder => "event_reminder",
        TicketConfirmation => "ticket_confirmation",
        EventUpdate => "event_update",
        PaymentConfirmation => "payment_confirmation",
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub event_id: Option<Uuid>,
    pub ticket_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    pub event_id: Option<Uuid>,
    pub ticket_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}
