use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::event::{Event, EventChanges, EventQuery, EventStatus, NewEvent};
use crate::models::notification::{NewNotification, Notification};
use crate::models::ticket::{IssueTickets, IssuedTickets, Ticket, TicketQuery, TicketStatus};
use crate::models::transaction::{PaymentMethod, Settlement, Transaction, TransactionStatus};
use crate::models::user::{NewUser, User};
use crate::models::Page;
use crate::store::Store;
use crate::utils::error::{AppError, AppResult};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    events: HashMap<Uuid, Event>,
    tickets: HashMap<Uuid, Ticket>,
    transactions: HashMap<Uuid, Transaction>,
    notifications: Vec<Notification>,
}

/// Process-local store. A single lock guards all collections so every trait
/// method is one critical section.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an event verbatim, bypassing creation rules. Used to seed
    /// fixtures such as events that already took place.
    pub fn insert_event(&self, event: Event) {
        self.inner.lock().events.insert(event.id, event);
    }

    /// Overwrites a user record, e.g. to deactivate an account.
    pub fn put_user(&self, user: User) {
        self.inner.lock().users.insert(user.id, user);
    }
}

fn paginate<T: Clone>(items: Vec<T>, offset: i64, limit: i64) -> Page<T> {
    let total = items.len() as i64;
    let items = items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect();
    Page { items, total }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut inner = self.inner.lock();
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(AppError::conflict_on("email", "Email already registered"));
        }
        if let Some(university_id) = &user.university_id {
            if inner
                .users
                .values()
                .any(|u| u.university_id.as_ref() == Some(university_id))
            {
                return Err(AppError::conflict_on(
                    "universityId",
                    "University ID already registered",
                ));
            }
        }

        let now = Utc::now();
        let record = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            university_id: user.university_id,
            profile_pic: None,
            phone: user.phone,
            department: user.department,
            is_active: true,
            last_login: None,
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.inner.lock().users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .inner
            .lock()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn user_by_university_id(&self, university_id: &str) -> AppResult<Option<User>> {
        Ok(self
            .inner
            .lock()
            .users
            .values()
            .find(|u| u.university_id.as_deref() == Some(university_id))
            .cloned())
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<User>> {
        let inner = self.inner.lock();
        Ok(ids.iter().filter_map(|id| inner.users.get(id).cloned()).collect())
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        Ok(self.inner.lock().users.values().cloned().collect())
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        if let Some(user) = self.inner.lock().users.get_mut(&id) {
            user.last_login = Some(at);
            user.updated_at = at;
        }
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        if let Some(user) = self.inner.lock().users.get_mut(&id) {
            user.reset_token_hash = Some(token_hash.to_string());
            user.reset_token_expires_at = Some(expires_at);
        }
        Ok(())
    }

    async fn user_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<User>> {
        Ok(self
            .inner
            .lock()
            .users
            .values()
            .find(|u| {
                u.reset_token_hash.as_deref() == Some(token_hash)
                    && u.reset_token_expires_at.is_some_and(|exp| exp > now)
            })
            .cloned())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
        if let Some(user) = self.inner.lock().users.get_mut(&id) {
            user.password_hash = password_hash.to_string();
            user.reset_token_hash = None;
            user.reset_token_expires_at = None;
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn create_event(&self, event: NewEvent, at: DateTime<Utc>) -> AppResult<Event> {
        let record = Event {
            id: Uuid::new_v4(),
            title: event.title,
            description: event.description,
            category: event.category,
            date: event.date,
            end_date: event.end_date,
            venue: event.venue,
            capacity: event.capacity,
            ticket_types: event.ticket_types,
            organizer_id: event.organizer_id,
            images: event.images,
            videos: event.videos,
            tags: event.tags,
            is_featured: false,
            requires_approval: event.requires_approval,
            status: EventStatus::Draft,
            published_at: None,
            created_at: at,
            updated_at: at,
        };
        self.inner.lock().events.insert(record.id, record.clone());
        Ok(record)
    }

    async fn event_by_id(&self, id: Uuid) -> AppResult<Option<Event>> {
        Ok(self.inner.lock().events.get(&id).cloned())
    }

    async fn events_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Event>> {
        let inner = self.inner.lock();
        Ok(ids.iter().filter_map(|id| inner.events.get(id).cloned()).collect())
    }

    async fn events_by_organizer(&self, organizer_id: Uuid) -> AppResult<Vec<Event>> {
        let mut events: Vec<Event> = self
            .inner
            .lock()
            .events
            .values()
            .filter(|e| e.organizer_id == organizer_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }

    async fn list_events(&self, query: &EventQuery) -> AppResult<Page<Event>> {
        let mut events: Vec<Event> = self
            .inner
            .lock()
            .events
            .values()
            .filter(|e| query.matches(e))
            .cloned()
            .collect();
        events.sort_by(|a, b| a.date.cmp(&b.date).then(b.created_at.cmp(&a.created_at)));
        Ok(paginate(events, query.offset(), query.limit))
    }

    async fn list_all_events(&self) -> AppResult<Vec<Event>> {
        Ok(self.inner.lock().events.values().cloned().collect())
    }

    async fn update_event(
        &self,
        id: Uuid,
        changes: EventChanges,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Event>> {
        let mut inner = self.inner.lock();
        let Some(event) = inner.events.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            event.title = title;
        }
        if let Some(description) = changes.description {
            event.description = description;
        }
        if let Some(category) = changes.category {
            event.category = category;
        }
        if let Some(date) = changes.date {
            event.date = date;
        }
        if let Some(end_date) = changes.end_date {
            event.end_date = Some(end_date);
        }
        if let Some(venue) = changes.venue {
            event.venue = venue;
        }
        if let Some(capacity) = changes.capacity {
            event.capacity = capacity;
        }
        if let Some(ticket_types) = changes.ticket_types {
            event.ticket_types = ticket_types;
        }
        if let Some(images) = changes.images {
            event.images = images;
        }
        if let Some(videos) = changes.videos {
            event.videos = videos;
        }
        if let Some(tags) = changes.tags {
            event.tags = tags;
        }
        if let Some(is_featured) = changes.is_featured {
            event.is_featured = is_featured;
        }
        if let Some(requires_approval) = changes.requires_approval {
            event.requires_approval = requires_approval;
        }
        if let Some(status) = changes.status {
            event.status = status;
            if status == EventStatus::Published && event.published_at.is_none() {
                event.published_at = Some(at);
            }
        }
        event.updated_at = at;
        Ok(Some(event.clone()))
    }

    async fn set_event_status(
        &self,
        id: Uuid,
        status: EventStatus,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Event>> {
        let changes = EventChanges {
            status: Some(status),
            ..EventChanges::default()
        };
        self.update_event(id, changes, at).await
    }

    async fn issue_tickets(&self, request: IssueTickets) -> AppResult<IssuedTickets> {
        let mut inner = self.inner.lock();

        let held = inner
            .tickets
            .values()
            .filter(|t| {
                t.event_id == request.event_id
                    && t.buyer_id == request.buyer_id
                    && t.status == TicketStatus::Purchased
            })
            .count() as i64;
        if request.over_limit(held) {
            return Err(request.limit_error());
        }

        let event = inner
            .events
            .get_mut(&request.event_id)
            .filter(|e| e.status == EventStatus::Published)
            .ok_or_else(|| AppError::conflict("Event is no longer available for purchase"))?;
        let ticket_type = event
            .ticket_types
            .iter_mut()
            .find(|t| t.kind == request.kind && t.available >= request.quantity)
            .ok_or_else(|| AppError::conflict("Not enough tickets available"))?;

        ticket_type.available -= request.quantity;
        let unit_price = ticket_type.price;

        let transaction_id = Uuid::new_v4();
        let tickets: Vec<Ticket> = (0..request.quantity)
            .map(|_| Ticket {
                id: Uuid::new_v4(),
                event_id: request.event_id,
                buyer_id: request.buyer_id,
                kind: request.kind,
                price: unit_price,
                qr_code: Uuid::new_v4().to_string(),
                status: TicketStatus::Purchased,
                purchase_date: request.issued_at,
                used_date: None,
                checked_in_by: None,
                transaction_id,
            })
            .collect();
        let transaction = Transaction {
            id: transaction_id,
            ticket_ids: tickets.iter().map(|t| t.id).collect(),
            buyer_id: request.buyer_id,
            amount: unit_price * Decimal::from(request.quantity),
            payment_method: PaymentMethod::Pending,
            status: TransactionStatus::Pending,
            merchant_request_id: None,
            gateway_reference: None,
            failure_reason: None,
            payment_date: None,
            created_at: request.issued_at,
            updated_at: request.issued_at,
        };

        for ticket in &tickets {
            inner.tickets.insert(ticket.id, ticket.clone());
        }
        inner.transactions.insert(transaction.id, transaction.clone());

        Ok(IssuedTickets {
            tickets,
            transaction,
        })
    }

    async fn ticket_by_id(&self, id: Uuid) -> AppResult<Option<Ticket>> {
        Ok(self.inner.lock().tickets.get(&id).cloned())
    }

    async fn tickets_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Ticket>> {
        let inner = self.inner.lock();
        Ok(ids.iter().filter_map(|id| inner.tickets.get(id).cloned()).collect())
    }

    async fn count_buyer_tickets(
        &self,
        event_id: Uuid,
        buyer_id: Uuid,
        status: TicketStatus,
    ) -> AppResult<i64> {
        Ok(self
            .inner
            .lock()
            .tickets
            .values()
            .filter(|t| t.event_id == event_id && t.buyer_id == buyer_id && t.status == status)
            .count() as i64)
    }

    async fn count_event_tickets(
        &self,
        event_id: Uuid,
        status: Option<TicketStatus>,
    ) -> AppResult<i64> {
        Ok(self
            .inner
            .lock()
            .tickets
            .values()
            .filter(|t| t.event_id == event_id && status.map_or(true, |s| t.status == s))
            .count() as i64)
    }

    async fn tickets_for_buyer(
        &self,
        buyer_id: Uuid,
        query: &TicketQuery,
    ) -> AppResult<Page<Ticket>> {
        let inner = self.inner.lock();
        let mut tickets: Vec<Ticket> = inner
            .tickets
            .values()
            .filter(|t| t.buyer_id == buyer_id)
            .filter(|t| query.status.map_or(true, |s| t.status == s))
            .filter(|t| match query.upcoming_from {
                Some(from) => inner
                    .events
                    .get(&t.event_id)
                    .is_some_and(|e| e.date >= from),
                None => true,
            })
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.purchase_date.cmp(&a.purchase_date));
        Ok(paginate(tickets, query.offset(), query.limit))
    }

    async fn tickets_for_events(&self, event_ids: &[Uuid]) -> AppResult<Vec<Ticket>> {
        let mut tickets: Vec<Ticket> = self
            .inner
            .lock()
            .tickets
            .values()
            .filter(|t| event_ids.contains(&t.event_id))
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.purchase_date.cmp(&a.purchase_date));
        Ok(tickets)
    }

    async fn list_all_tickets(&self) -> AppResult<Vec<Ticket>> {
        Ok(self.inner.lock().tickets.values().cloned().collect())
    }

    async fn mark_ticket_used(
        &self,
        id: Uuid,
        checked_in_by: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Ticket>> {
        let mut inner = self.inner.lock();
        match inner.tickets.get_mut(&id) {
            Some(ticket) if ticket.status == TicketStatus::Purchased => {
                ticket.status = TicketStatus::Used;
                ticket.used_date = Some(at);
                ticket.checked_in_by = Some(checked_in_by);
                Ok(Some(ticket.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn transaction_by_id(&self, id: Uuid) -> AppResult<Option<Transaction>> {
        Ok(self.inner.lock().transactions.get(&id).cloned())
    }

    async fn transaction_by_merchant_request(
        &self,
        merchant_request_id: &str,
    ) -> AppResult<Option<Transaction>> {
        Ok(self
            .inner
            .lock()
            .transactions
            .values()
            .find(|t| t.merchant_request_id.as_deref() == Some(merchant_request_id))
            .cloned())
    }

    async fn transactions_for_tickets(&self, ticket_ids: &[Uuid]) -> AppResult<Vec<Transaction>> {
        Ok(self
            .inner
            .lock()
            .transactions
            .values()
            .filter(|t| t.ticket_ids.iter().any(|id| ticket_ids.contains(id)))
            .cloned()
            .collect())
    }

    async fn list_transactions(&self) -> AppResult<Vec<Transaction>> {
        Ok(self.inner.lock().transactions.values().cloned().collect())
    }

    async fn begin_payment(
        &self,
        id: Uuid,
        method: PaymentMethod,
        merchant_request_id: Option<String>,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Transaction>> {
        let mut inner = self.inner.lock();
        match inner.transactions.get_mut(&id) {
            Some(txn)
                if matches!(
                    txn.status,
                    TransactionStatus::Pending | TransactionStatus::Failed
                ) =>
            {
                txn.status = TransactionStatus::Pending;
                txn.payment_method = method;
                txn.merchant_request_id = merchant_request_id;
                txn.failure_reason = None;
                txn.updated_at = at;
                Ok(Some(txn.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn settle_transaction(
        &self,
        id: Uuid,
        settlement: Settlement,
    ) -> AppResult<Option<Transaction>> {
        let mut inner = self.inner.lock();
        match inner.transactions.get_mut(&id) {
            Some(txn) if txn.status == TransactionStatus::Pending => {
                txn.status = settlement.status;
                txn.gateway_reference = settlement.gateway_reference;
                txn.failure_reason = settlement.failure_reason;
                if settlement.status == TransactionStatus::Completed {
                    txn.payment_date = Some(settlement.settled_at);
                }
                txn.updated_at = settlement.settled_at;
                Ok(Some(txn.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn create_notification(
        &self,
        notification: NewNotification,
        at: DateTime<Utc>,
    ) -> AppResult<Notification> {
        let record = Notification {
            id: Uuid::new_v4(),
            recipient_id: notification.recipient_id,
            event_id: notification.event_id,
            ticket_id: notification.ticket_id,
            kind: notification.kind,
            title: notification.title,
            message: notification.message,
            is_read: false,
            created_at: at,
        };
        self.inner.lock().notifications.push(record.clone());
        Ok(record)
    }

    async fn notifications_for(
        &self,
        recipient_id: Uuid,
        limit: i64,
    ) -> AppResult<Vec<Notification>> {
        let mut notifications: Vec<Notification> = self
            .inner
            .lock()
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notifications.truncate(limit.max(0) as usize);
        Ok(notifications)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::{EventCategory, TicketKind, TicketType};
    use std::sync::Arc;

    fn published_event(quantity: i32) -> Event {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4(),
            title: "Spring Concert".into(),
            description: "Live music on the quad".into(),
            category: EventCategory::Cultural,
            date: now + chrono::Duration::days(7),
            end_date: None,
            venue: "Main Quad".into(),
            capacity: 500,
            ticket_types: vec![TicketType::new(
                TicketKind::General,
                Decimal::new(500, 0),
                quantity,
            )],
            organizer_id: Uuid::new_v4(),
            images: vec![],
            videos: vec![],
            tags: vec![],
            is_featured: false,
            requires_approval: false,
            status: EventStatus::Published,
            published_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    fn issue(event_id: Uuid, quantity: i32) -> IssueTickets {
        IssueTickets {
            event_id,
            kind: TicketKind::General,
            quantity,
            buyer_id: Uuid::new_v4(),
            per_buyer_limit: 10,
            issued_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_issue_tickets_decrements_and_links_transaction() {
        let store = MemoryStore::new();
        let event = published_event(5);
        let event_id = event.id;
        store.insert_event(event);

        let issued = store.issue_tickets(issue(event_id, 3)).await.unwrap();
        assert_eq!(issued.tickets.len(), 3);
        assert_eq!(issued.transaction.amount, Decimal::new(1500, 0));
        assert!(issued
            .tickets
            .iter()
            .all(|t| t.transaction_id == issued.transaction.id));

        let event = store.event_by_id(event_id).await.unwrap().unwrap();
        assert_eq!(event.ticket_types[0].available, 2);
    }

    #[tokio::test]
    async fn test_issue_tickets_rejects_oversell_without_writing() {
        let store = MemoryStore::new();
        let event = published_event(1);
        let event_id = event.id;
        store.insert_event(event);

        let err = store.issue_tickets(issue(event_id, 2)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
        assert!(store.list_all_tickets().await.unwrap().is_empty());
        assert!(store.list_transactions().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_purchases_never_exceed_quantity() {
        let store = Arc::new(MemoryStore::new());
        let event = published_event(10);
        let event_id = event.id;
        store.insert_event(event);

        let handles: Vec<_> = (0..25)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.issue_tickets(issue(event_id, 1)).await })
            })
            .collect();

        let mut sold = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                sold += 1;
            }
        }

        assert_eq!(sold, 10);
        let event = store.event_by_id(event_id).await.unwrap().unwrap();
        assert_eq!(event.ticket_types[0].available, 0);
        assert_eq!(store.list_all_tickets().await.unwrap().len(), 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_purchases_respect_buyer_cap() {
        let store = Arc::new(MemoryStore::new());
        let event = published_event(100);
        let event_id = event.id;
        store.insert_event(event);
        let buyer_id = Uuid::new_v4();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let mut request = issue(event_id, 3);
                request.buyer_id = buyer_id;
                tokio::spawn(async move { store.issue_tickets(request).await })
            })
            .collect();

        let mut rejected = 0;
        for handle in handles {
            if let Err(err) = handle.await.unwrap() {
                assert!(matches!(err, AppError::Conflict { .. }));
                rejected += 1;
            }
        }

        assert_eq!(rejected, 5);
        assert_eq!(store.list_all_tickets().await.unwrap().len(), 9);
        let event = store.event_by_id(event_id).await.unwrap().unwrap();
        assert_eq!(event.ticket_types[0].available, 91);
    }

    #[tokio::test]
    async fn test_settle_only_applies_once() {
        let store = MemoryStore::new();
        let event = published_event(2);
        let event_id = event.id;
        store.insert_event(event);
        let issued = store.issue_tickets(issue(event_id, 1)).await.unwrap();
        let id = issued.transaction.id;

        let first = store
            .settle_transaction(id, Settlement::completed(Some("ref-1".into()), Utc::now()))
            .await
            .unwrap();
        let second = store
            .settle_transaction(id, Settlement::failed("late callback", Utc::now()))
            .await
            .unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        let txn = store.transaction_by_id(id).await.unwrap().unwrap();
        assert_eq!(txn.status, TransactionStatus::Completed);
        assert_eq!(txn.gateway_reference.as_deref(), Some("ref-1"));
    }
}
