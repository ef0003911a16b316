use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::config::Config;
use crate::models::event::{
    DateWindow, Event, EventChanges, EventQuery, EventStatus, NewEvent, TicketType,
};
use crate::models::notification::{NewNotification, Notification};
use crate::models::ticket::{IssueTickets, IssuedTickets, Ticket, TicketQuery, TicketStatus};
use crate::models::transaction::{PaymentMethod, Settlement, Transaction, TransactionStatus};
use crate::models::user::{NewUser, User};
use crate::models::Page;
use crate::store::rows::{
    convert, EventRow, NotificationRow, TicketRow, TicketTypeRow, TransactionRow, UserRow,
};
use crate::store::Store;
use crate::utils::error::{AppError, AppResult};

/// PostgreSQL adapter. Owns the connection pool for the lifetime of the
/// process; call [`PgStore::close`] during shutdown.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens the pool and applies pending migrations.
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await?;
        tracing::info!("Successfully connected to database");

        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| AppError::Internal(format!("migration failed: {e}")))?;
        tracing::info!("Migrations run successfully");

        Ok(Self::new(pool))
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }

    async fn hydrate(&self, rows: Vec<EventRow>) -> AppResult<Vec<Event>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut types: Vec<TicketTypeRow> = sqlx::query_as(
            "SELECT event_id, kind, price, quantity, available FROM event_ticket_types \
             WHERE event_id = ANY($1) ORDER BY position",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| row.into_event(&mut types))
            .collect()
    }

    async fn hydrate_one(&self, row: Option<EventRow>) -> AppResult<Option<Event>> {
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.into_iter().next()),
            None => Ok(None),
        }
    }
}

fn map_user_conflict(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return match db.constraint() {
                Some("users_university_id_key") => {
                    AppError::conflict_on("universityId", "University ID already registered")
                }
                _ => AppError::conflict_on("email", "Email already registered"),
            };
        }
    }
    AppError::from(err)
}

async fn insert_ticket_types(
    conn: &mut sqlx::PgConnection,
    event_id: Uuid,
    types: &[TicketType],
) -> AppResult<()> {
    if types.is_empty() {
        return Ok(());
    }
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO event_ticket_types (event_id, kind, price, quantity, available, position) ",
    );
    qb.push_values(types.iter().enumerate(), |mut b, (position, t)| {
        b.push_bind(event_id)
            .push_bind(t.kind.as_str())
            .push_bind(t.price)
            .push_bind(t.quantity)
            .push_bind(t.available)
            .push_bind(position as i32);
    });
    qb.build().execute(conn).await?;
    Ok(())
}

fn push_event_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &EventQuery) {
    qb.push(" WHERE status = 'published'");
    if let Some(category) = query.category {
        qb.push(" AND category = ").push_bind(category.as_str());
    }
    if let Some(term) = &query.search {
        let pattern = format!("%{term}%");
        qb.push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(window) = query.date {
        let op = match window {
            DateWindow::Upcoming => " AND date >= ",
            DateWindow::Past => " AND date < ",
        };
        qb.push(op).push_bind(query.now);
    }
    if query.featured {
        qb.push(" AND is_featured");
    }
}

fn push_ticket_filters(qb: &mut QueryBuilder<'_, Postgres>, buyer_id: Uuid, query: &TicketQuery) {
    qb.push(" FROM tickets t JOIN events e ON e.id = t.event_id WHERE t.buyer_id = ")
        .push_bind(buyer_id);
    if let Some(status) = query.status {
        qb.push(" AND t.status = ").push_bind(status.as_str());
    }
    if let Some(from) = query.upcoming_from {
        qb.push(" AND e.date >= ").push_bind(from);
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let now = Utc::now();
        let row: UserRow = sqlx::query_as(
            "INSERT INTO users (id, name, email, password_hash, role, university_id, phone, \
             department, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.university_id)
        .bind(&user.phone)
        .bind(&user.department)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_user_conflict)?;
        row.try_into()
    }

    async fn user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn user_by_university_id(&self, university_id: &str) -> AppResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT * FROM users WHERE university_id = $1")
                .bind(university_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(User::try_from).transpose()
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        convert(rows)
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as("SELECT * FROM users")
            .fetch_all(&self.pool)
            .await?;
        convert(rows)
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login = $2, updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE users SET reset_token_hash = $2, reset_token_expires_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn user_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT * FROM users WHERE reset_token_hash = $1 AND reset_token_expires_at > $2",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE users SET password_hash = $2, reset_token_hash = NULL, \
             reset_token_expires_at = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_event(&self, event: NewEvent, at: DateTime<Utc>) -> AppResult<Event> {
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO events (id, title, description, category, date, end_date, venue, \
             capacity, organizer_id, images, videos, tags, requires_approval, status, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $15)",
        )
        .bind(id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.category.as_str())
        .bind(event.date)
        .bind(event.end_date)
        .bind(&event.venue)
        .bind(event.capacity)
        .bind(event.organizer_id)
        .bind(&event.images)
        .bind(&event.videos)
        .bind(&event.tags)
        .bind(event.requires_approval)
        .bind(EventStatus::Draft.as_str())
        .bind(at)
        .execute(&mut *tx)
        .await?;
        insert_ticket_types(&mut tx, id, &event.ticket_types).await?;
        tx.commit().await?;

        self.event_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("event {id} vanished after insert")))
    }

    async fn event_by_id(&self, id: Uuid) -> AppResult<Option<Event>> {
        let row: Option<EventRow> = sqlx::query_as("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        self.hydrate_one(row).await
    }

    async fn events_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Event>> {
        let rows: Vec<EventRow> = sqlx::query_as("SELECT * FROM events WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        self.hydrate(rows).await
    }

    async fn events_by_organizer(&self, organizer_id: Uuid) -> AppResult<Vec<Event>> {
        let rows: Vec<EventRow> = sqlx::query_as(
            "SELECT * FROM events WHERE organizer_id = $1 ORDER BY created_at DESC",
        )
        .bind(organizer_id)
        .fetch_all(&self.pool)
        .await?;
        self.hydrate(rows).await
    }

    async fn list_events(&self, query: &EventQuery) -> AppResult<Page<Event>> {
        let mut count: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM events");
        push_event_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM events");
        push_event_filters(&mut select, query);
        select
            .push(" ORDER BY date ASC, created_at DESC LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset());
        let rows: Vec<EventRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok(Page {
            items: self.hydrate(rows).await?,
            total,
        })
    }

    async fn list_all_events(&self) -> AppResult<Vec<Event>> {
        let rows: Vec<EventRow> = sqlx::query_as("SELECT * FROM events")
            .fetch_all(&self.pool)
            .await?;
        self.hydrate(rows).await
    }

    async fn update_event(
        &self,
        id: Uuid,
        changes: EventChanges,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Event>> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE events SET \
               title = COALESCE($2, title), \
               description = COALESCE($3, description), \
               category = COALESCE($4, category), \
               date = COALESCE($5, date), \
               end_date = COALESCE($6, end_date), \
               venue = COALESCE($7, venue), \
               capacity = COALESCE($8, capacity), \
               images = COALESCE($9, images), \
               videos = COALESCE($10, videos), \
               tags = COALESCE($11, tags), \
               is_featured = COALESCE($12, is_featured), \
               requires_approval = COALESCE($13, requires_approval), \
               status = COALESCE($14, status), \
               published_at = CASE WHEN $14 = 'published' AND published_at IS NULL \
                              THEN $15 ELSE published_at END, \
               updated_at = $15 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.category.map(|c| c.as_str()))
        .bind(changes.date)
        .bind(changes.end_date)
        .bind(&changes.venue)
        .bind(changes.capacity)
        .bind(&changes.images)
        .bind(&changes.videos)
        .bind(&changes.tags)
        .bind(changes.is_featured)
        .bind(changes.requires_approval)
        .bind(changes.status.map(|s| s.as_str()))
        .bind(at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        if let Some(types) = &changes.ticket_types {
            sqlx::query("DELETE FROM event_ticket_types WHERE event_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_ticket_types(&mut tx, id, types).await?;
        }
        tx.commit().await?;

        self.event_by_id(id).await
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
        let mut tx = self.pool.begin().await?;

        // The buyer row lock serializes one buyer's purchases so the cap
        // below cannot be passed by two concurrent requests.
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(request.buyer_id)
            .execute(&mut *tx)
            .await?;
        let held: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tickets WHERE event_id = $1 AND buyer_id = $2 AND status = $3",
        )
        .bind(request.event_id)
        .bind(request.buyer_id)
        .bind(TicketStatus::Purchased.as_str())
        .fetch_one(&mut *tx)
        .await?;
        if request.over_limit(held) {
            tx.rollback().await?;
            return Err(request.limit_error());
        }

        // Check-and-decrement in one statement; concurrent buyers serialize on
        // the row lock and re-evaluate the predicate.
        let unit_price: Option<Decimal> = sqlx::query_scalar(
            "UPDATE event_ticket_types t SET available = t.available - $3 \
             FROM events e \
             WHERE t.event_id = $1 AND t.kind = $2 AND t.available >= $3 \
               AND e.id = t.event_id AND e.status = 'published' \
             RETURNING t.price",
        )
        .bind(request.event_id)
        .bind(request.kind.as_str())
        .bind(request.quantity)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(unit_price) = unit_price else {
            tx.rollback().await?;
            return Err(AppError::conflict("Not enough tickets available"));
        };

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
        let ticket_ids: Vec<Uuid> = tickets.iter().map(|t| t.id).collect();

        let row: TransactionRow = sqlx::query_as(
            "INSERT INTO transactions (id, ticket_ids, buyer_id, amount, payment_method, status, \
             created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $7) RETURNING *",
        )
        .bind(transaction_id)
        .bind(&ticket_ids)
        .bind(request.buyer_id)
        .bind(unit_price * Decimal::from(request.quantity))
        .bind(PaymentMethod::Pending.as_str())
        .bind(TransactionStatus::Pending.as_str())
        .bind(request.issued_at)
        .fetch_one(&mut *tx)
        .await?;

        {
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO tickets (id, event_id, buyer_id, kind, price, qr_code, status, \
                 purchase_date, transaction_id) ",
            );
            qb.push_values(tickets.iter(), |mut b, t| {
                b.push_bind(t.id)
                    .push_bind(t.event_id)
                    .push_bind(t.buyer_id)
                    .push_bind(t.kind.as_str())
                    .push_bind(t.price)
                    .push_bind(t.qr_code.as_str())
                    .push_bind(t.status.as_str())
                    .push_bind(t.purchase_date)
                    .push_bind(t.transaction_id);
            });
            qb.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        Ok(IssuedTickets {
            tickets,
            transaction: row.try_into()?,
        })
    }

    async fn ticket_by_id(&self, id: Uuid) -> AppResult<Option<Ticket>> {
        let row: Option<TicketRow> = sqlx::query_as("SELECT * FROM tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Ticket::try_from).transpose()
    }

    async fn tickets_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Ticket>> {
        let rows: Vec<TicketRow> = sqlx::query_as("SELECT * FROM tickets WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        convert(rows)
    }

    async fn count_buyer_tickets(
        &self,
        event_id: Uuid,
        buyer_id: Uuid,
        status: TicketStatus,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tickets WHERE event_id = $1 AND buyer_id = $2 AND status = $3",
        )
        .bind(event_id)
        .bind(buyer_id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn count_event_tickets(
        &self,
        event_id: Uuid,
        status: Option<TicketStatus>,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tickets WHERE event_id = $1 AND ($2::TEXT IS NULL OR status = $2)",
        )
        .bind(event_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn tickets_for_buyer(
        &self,
        buyer_id: Uuid,
        query: &TicketQuery,
    ) -> AppResult<Page<Ticket>> {
        let mut count: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*)");
        push_ticket_filters(&mut count, buyer_id, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select: QueryBuilder<Postgres> = QueryBuilder::new("SELECT t.*");
        push_ticket_filters(&mut select, buyer_id, query);
        select
            .push(" ORDER BY t.purchase_date DESC LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset());
        let rows: Vec<TicketRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok(Page {
            items: convert(rows)?,
            total,
        })
    }

    async fn tickets_for_events(&self, event_ids: &[Uuid]) -> AppResult<Vec<Ticket>> {
        let rows: Vec<TicketRow> = sqlx::query_as(
            "SELECT * FROM tickets WHERE event_id = ANY($1) ORDER BY purchase_date DESC",
        )
        .bind(event_ids)
        .fetch_all(&self.pool)
        .await?;
        convert(rows)
    }

    async fn list_all_tickets(&self) -> AppResult<Vec<Ticket>> {
        let rows: Vec<TicketRow> = sqlx::query_as("SELECT * FROM tickets")
            .fetch_all(&self.pool)
            .await?;
        convert(rows)
    }

    async fn mark_ticket_used(
        &self,
        id: Uuid,
        checked_in_by: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Ticket>> {
        let row: Option<TicketRow> = sqlx::query_as(
            "UPDATE tickets SET status = 'used', used_date = $3, checked_in_by = $2 \
             WHERE id = $1 AND status = 'purchased' RETURNING *",
        )
        .bind(id)
        .bind(checked_in_by)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Ticket::try_from).transpose()
    }

    async fn transaction_by_id(&self, id: Uuid) -> AppResult<Option<Transaction>> {
        let row: Option<TransactionRow> =
            sqlx::query_as("SELECT * FROM transactions WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Transaction::try_from).transpose()
    }

    async fn transaction_by_merchant_request(
        &self,
        merchant_request_id: &str,
    ) -> AppResult<Option<Transaction>> {
        let row: Option<TransactionRow> =
            sqlx::query_as("SELECT * FROM transactions WHERE merchant_request_id = $1")
                .bind(merchant_request_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Transaction::try_from).transpose()
    }

    async fn transactions_for_tickets(&self, ticket_ids: &[Uuid]) -> AppResult<Vec<Transaction>> {
        let rows: Vec<TransactionRow> =
            sqlx::query_as("SELECT * FROM transactions WHERE ticket_ids && $1")
                .bind(ticket_ids)
                .fetch_all(&self.pool)
                .await?;
        convert(rows)
    }

    async fn list_transactions(&self) -> AppResult<Vec<Transaction>> {
        let rows: Vec<TransactionRow> = sqlx::query_as("SELECT * FROM transactions")
            .fetch_all(&self.pool)
            .await?;
        convert(rows)
    }

    async fn begin_payment(
        &self,
        id: Uuid,
        method: PaymentMethod,
        merchant_request_id: Option<String>,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Transaction>> {
        let row: Option<TransactionRow> = sqlx::query_as(
            "UPDATE transactions SET status = 'pending', payment_method = $2, \
             merchant_request_id = $3, failure_reason = NULL, updated_at = $4 \
             WHERE id = $1 AND status IN ('pending', 'failed') RETURNING *",
        )
        .bind(id)
        .bind(method.as_str())
        .bind(merchant_request_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Transaction::try_from).transpose()
    }

    async fn settle_transaction(
        &self,
        id: Uuid,
        settlement: Settlement,
    ) -> AppResult<Option<Transaction>> {
        let row: Option<TransactionRow> = sqlx::query_as(
            "UPDATE transactions SET status = $2, gateway_reference = $3, failure_reason = $4, \
             payment_date = CASE WHEN $2 = 'completed' THEN $5 ELSE payment_date END, \
             updated_at = $5 \
             WHERE id = $1 AND status = 'pending' RETURNING *",
        )
        .bind(id)
        .bind(settlement.status.as_str())
        .bind(settlement.gateway_reference)
        .bind(settlement.failure_reason)
        .bind(settlement.settled_at)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Transaction::try_from).transpose()
    }

    async fn create_notification(
        &self,
        notification: NewNotification,
        at: DateTime<Utc>,
    ) -> AppResult<Notification> {
        let row: NotificationRow = sqlx::query_as(
            "INSERT INTO notifications (id, recipient_id, event_id, ticket_id, kind, title, \
             message, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(notification.recipient_id)
        .bind(notification.event_id)
        .bind(notification.ticket_id)
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn notifications_for(
        &self,
        recipient_id: Uuid,
        limit: i64,
    ) -> AppResult<Vec<Notification>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(
            "SELECT * FROM notifications WHERE recipient_id = $1 \
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(recipient_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        convert(rows)
    }
}
