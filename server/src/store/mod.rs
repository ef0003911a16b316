//! Persistence port.
//!
//! Services talk to a [`Store`] trait object. [`PgStore`] is the production
//! adapter over a `sqlx` pool; [`MemoryStore`] keeps everything in process
//! and backs the test suite and local runs without a database.
//!
//! Every mutation that the checkout path depends on is a conditional update:
//! inventory is only decremented while enough remains, and tickets and
//! transactions only leave their initial status once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::event::{Event, EventChanges, EventQuery, EventStatus, NewEvent};
use crate::models::notification::{NewNotification, Notification};
use crate::models::ticket::{IssueTickets, IssuedTickets, Ticket, TicketQuery, TicketStatus};
use crate::models::transaction::{PaymentMethod, Settlement, Transaction};
use crate::models::user::{NewUser, User};
use crate::models::Page;
use crate::utils::error::AppResult;

pub mod memory;
pub mod postgres;
mod rows;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    // Users

    /// Fails with a field-scoped `Conflict` on duplicate e-mail or university id.
    async fn create_user(&self, user: NewUser) -> AppResult<User>;
    async fn user_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn user_by_university_id(&self, university_id: &str) -> AppResult<Option<User>>;
    async fn users_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<User>>;
    async fn list_users(&self) -> AppResult<Vec<User>>;
    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()>;
    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()>;
    /// Looks up a user by reset-token digest, ignoring expired tokens.
    async fn user_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<User>>;
    /// Replaces the password hash and clears any reset token.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> AppResult<()>;

    // Events

    async fn create_event(&self, event: NewEvent, at: DateTime<Utc>) -> AppResult<Event>;
    async fn event_by_id(&self, id: Uuid) -> AppResult<Option<Event>>;
    async fn events_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Event>>;
    async fn events_by_organizer(&self, organizer_id: Uuid) -> AppResult<Vec<Event>>;
    async fn list_events(&self, query: &EventQuery) -> AppResult<Page<Event>>;
    async fn list_all_events(&self) -> AppResult<Vec<Event>>;
    /// Applies the edits; a move to `published` stamps `published_at` once.
    async fn update_event(
        &self,
        id: Uuid,
        changes: EventChanges,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Event>>;
    async fn set_event_status(
        &self,
        id: Uuid,
        status: EventStatus,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Event>>;

    // Tickets

    /// Atomically decrements inventory, creates the tickets and their pending
    /// transaction. Fails with `Conflict` when the fare class no longer has
    /// `quantity` seats or the event stopped being published; nothing is
    /// written in that case.
    async fn issue_tickets(&self, request: IssueTickets) -> AppResult<IssuedTickets>;
    async fn ticket_by_id(&self, id: Uuid) -> AppResult<Option<Ticket>>;
    async fn tickets_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Ticket>>;
    async fn count_buyer_tickets(
        &self,
        event_id: Uuid,
        buyer_id: Uuid,
        status: TicketStatus,
    ) -> AppResult<i64>;
    async fn count_event_tickets(&self, event_id: Uuid, status: Option<TicketStatus>)
        -> AppResult<i64>;
    /// Newest purchases first.
    async fn tickets_for_buyer(&self, buyer_id: Uuid, query: &TicketQuery)
        -> AppResult<Page<Ticket>>;
    async fn tickets_for_events(&self, event_ids: &[Uuid]) -> AppResult<Vec<Ticket>>;
    async fn list_all_tickets(&self) -> AppResult<Vec<Ticket>>;
    /// `purchased -> used`; returns `None` if the ticket was no longer purchased.
    async fn mark_ticket_used(
        &self,
        id: Uuid,
        checked_in_by: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Ticket>>;

    // Transactions

    async fn transaction_by_id(&self, id: Uuid) -> AppResult<Option<Transaction>>;
    async fn transaction_by_merchant_request(
        &self,
        merchant_request_id: &str,
    ) -> AppResult<Option<Transaction>>;
    async fn transactions_for_tickets(&self, ticket_ids: &[Uuid]) -> AppResult<Vec<Transaction>>;
    async fn list_transactions(&self) -> AppResult<Vec<Transaction>>;
    /// Re-opens a `pending` or `failed` transaction for a payment attempt with
    /// the given method. Returns `None` if it is in any other status.
    async fn begin_payment(
        &self,
        id: Uuid,
        method: PaymentMethod,
        merchant_request_id: Option<String>,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Transaction>>;
    /// Applies the outcome only while the transaction is `pending`; returns
    /// `None` when another writer settled it first.
    async fn settle_transaction(
        &self,
        id: Uuid,
        settlement: Settlement,
    ) -> AppResult<Option<Transaction>>;

    // Notifications

    async fn create_notification(
        &self,
        notification: NewNotification,
        at: DateTime<Utc>,
    ) -> AppResult<Notification>;
    /// Newest first.
    async fn notifications_for(&self, recipient_id: Uuid, limit: i64)
        -> AppResult<Vec<Notification>>;
}
