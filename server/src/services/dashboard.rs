//! Read-only reporting for the three dashboards. The aggregation itself is
//! done by plain functions over loaded records; [`DashboardService`] only
//! gathers their inputs.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::event::{Event, EventCategory, EventStatus};
use crate::models::notification::Notification;
use crate::models::ticket::{Ticket, TicketQuery, TicketStatus};
use crate::models::transaction::{Transaction, TransactionStatus};
use crate::models::user::{Role, User, UserProfile};
use crate::services::tickets::{attach_events, distinct_event_ids, TicketWithEvent};
use crate::store::Store;
use crate::utils::error::AppResult;

const NOTIFICATION_LIMIT: i64 = 10;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentStats {
    pub total_tickets: usize,
    pub used_tickets: usize,
    pub purchased_tickets: usize,
    pub unread_notifications: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDashboard {
    pub stats: StudentStats,
    pub upcoming_events: Vec<TicketWithEvent>,
    pub past_events: Vec<TicketWithEvent>,
    pub recent_tickets: Vec<TicketWithEvent>,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffStats {
    pub total_events: usize,
    pub upcoming_events: usize,
    pub past_events: usize,
    pub total_sales: Decimal,
    pub tickets_used: usize,
    pub tickets_purchased: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRevenue {
    pub event_id: Uuid,
    pub title: String,
    pub revenue: Decimal,
    pub tickets_sold: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleActivity {
    pub ticket_id: Uuid,
    pub event_title: Option<String>,
    pub buyer_name: Option<String>,
    pub purchase_date: DateTime<Utc>,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub ticket_id: Uuid,
    pub event_title: Option<String>,
    pub buyer_name: Option<String>,
    pub buyer_email: Option<String>,
    pub status: TicketStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffDashboard {
    pub stats: StaffStats,
    pub my_events: Vec<Event>,
    pub upcoming_events: Vec<Event>,
    pub revenue_by_event: Vec<EventRevenue>,
    pub recent_sales: Vec<SaleActivity>,
    pub attendees: Vec<Attendee>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOverview {
    pub total_users: usize,
    pub total_events: usize,
    pub published_events: usize,
    pub total_tickets: usize,
    pub used_tickets: usize,
    pub total_revenue: Decimal,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct RoleCount {
    pub role: Role,
    pub count: usize,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: EventCategory,
    pub count: usize,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct MonthlyRevenue {
    pub year: i32,
    pub month: u32,
    pub revenue: Decimal,
    pub count: usize,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub overview: AdminOverview,
    pub users_by_role: Vec<RoleCount>,
    pub events_by_category: Vec<CategoryCount>,
    pub revenue_trend: Vec<MonthlyRevenue>,
    pub top_events: Vec<EventRevenue>,
    pub user_growth: Vec<DailyCount>,
    pub recent_users: Vec<UserProfile>,
    pub recent_events: Vec<Event>,
    pub recent_transactions: Vec<Transaction>,
}

fn completed(transactions: &[Transaction]) -> impl Iterator<Item = &Transaction> {
    transactions
        .iter()
        .filter(|t| t.status == TransactionStatus::Completed)
}

/// Revenue of completed transactions grouped by the event their tickets
/// belong to, highest first.
pub fn revenue_by_event(
    transactions: &[Transaction],
    tickets: &[Ticket],
    events: &[Event],
) -> Vec<EventRevenue> {
    let event_of: HashMap<Uuid, Uuid> = tickets.iter().map(|t| (t.id, t.event_id)).collect();
    let titles: HashMap<Uuid, &str> = events.iter().map(|e| (e.id, e.title.as_str())).collect();

    let mut totals: HashMap<Uuid, EventRevenue> = HashMap::new();
    for txn in completed(transactions) {
        let Some(event_id) = txn.ticket_ids.iter().find_map(|id| event_of.get(id)) else {
            continue;
        };
        let Some(title) = titles.get(event_id) else {
            continue;
        };
        let entry = totals.entry(*event_id).or_insert_with(|| EventRevenue {
            event_id: *event_id,
            title: title.to_string(),
            revenue: Decimal::ZERO,
            tickets_sold: 0,
        });
        entry.revenue += txn.amount;
        entry.tickets_sold += txn.ticket_ids.len();
    }

    let mut ranked: Vec<EventRevenue> = totals.into_values().collect();
    ranked.sort_by(|a, b| b.revenue.cmp(&a.revenue).then(a.title.cmp(&b.title)));
    ranked
}

/// `tickets` must be ordered newest purchase first.
pub fn student_dashboard(
    tickets: Vec<Ticket>,
    events: &[Event],
    notifications: Vec<Notification>,
    now: DateTime<Utc>,
) -> StudentDashboard {
    let count = |status: TicketStatus| tickets.iter().filter(|t| t.status == status).count();
    let stats = StudentStats {
        total_tickets: tickets.len(),
        used_tickets: count(TicketStatus::Used),
        purchased_tickets: count(TicketStatus::Purchased),
        unread_notifications: notifications.iter().filter(|n| !n.is_read).count(),
    };

    let dated = attach_events(tickets, events);
    let event_date = |t: &TicketWithEvent| t.event.as_ref().map(|e| e.date);

    let upcoming_events = dated
        .iter()
        .filter(|t| t.ticket.status == TicketStatus::Purchased)
        .filter(|t| event_date(*t).is_some_and(|d| d > now))
        .take(5)
        .cloned()
        .collect();
    let past_events = dated
        .iter()
        .filter(|t| matches!(t.ticket.status, TicketStatus::Purchased | TicketStatus::Used))
        .filter(|t| event_date(*t).is_some_and(|d| d <= now))
        .take(5)
        .cloned()
        .collect();
    let recent_tickets = dated.into_iter().take(3).collect();

    StudentDashboard {
        stats,
        upcoming_events,
        past_events,
        recent_tickets,
        notifications,
    }
}

/// `events` newest first, `tickets` newest purchase first.
pub fn staff_dashboard(
    events: Vec<Event>,
    tickets: &[Ticket],
    transactions: &[Transaction],
    buyers: &[User],
    now: DateTime<Utc>,
) -> StaffDashboard {
    let buyer_of: HashMap<Uuid, &User> = buyers.iter().map(|u| (u.id, u)).collect();
    let title_of: HashMap<Uuid, &str> = events.iter().map(|e| (e.id, e.title.as_str())).collect();
    let title = |t: &Ticket| title_of.get(&t.event_id).map(|s| s.to_string());

    let upcoming: Vec<Event> = events.iter().filter(|e| e.date > now).cloned().collect();
    let stats = StaffStats {
        total_events: events.len(),
        upcoming_events: upcoming.len(),
        past_events: events.len() - upcoming.len(),
        total_sales: completed(transactions).map(|t| t.amount).sum(),
        tickets_used: tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Used)
            .count(),
        tickets_purchased: tickets
            .iter()
            .filter(|t| matches!(t.status, TicketStatus::Purchased | TicketStatus::Used))
            .count(),
    };

    let recent_sales = tickets
        .iter()
        .take(5)
        .map(|t| SaleActivity {
            ticket_id: t.id,
            event_title: title(t),
            buyer_name: buyer_of.get(&t.buyer_id).map(|u| u.name.clone()),
            purchase_date: t.purchase_date,
            amount: t.price,
        })
        .collect();
    let attendees = tickets
        .iter()
        .take(10)
        .map(|t| Attendee {
            ticket_id: t.id,
            event_title: title(t),
            buyer_name: buyer_of.get(&t.buyer_id).map(|u| u.name.clone()),
            buyer_email: buyer_of.get(&t.buyer_id).map(|u| u.email.clone()),
            status: t.status,
        })
        .collect();

    StaffDashboard {
        stats,
        revenue_by_event: revenue_by_event(transactions, tickets, &events),
        upcoming_events: upcoming.into_iter().take(3).collect(),
        my_events: events.into_iter().take(5).collect(),
        recent_sales,
        attendees,
    }
}

pub fn admin_dashboard(
    mut users: Vec<User>,
    mut events: Vec<Event>,
    tickets: &[Ticket],
    mut transactions: Vec<Transaction>,
    now: DateTime<Utc>,
) -> AdminDashboard {
    let active: Vec<&User> = users.iter().filter(|u| u.is_active).collect();
    let published: Vec<&Event> = events
        .iter()
        .filter(|e| e.status == EventStatus::Published)
        .collect();

    let overview = AdminOverview {
        total_users: active.len(),
        total_events: events.len(),
        published_events: published.len(),
        total_tickets: tickets.len(),
        used_tickets: tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Used)
            .count(),
        total_revenue: completed(&transactions).map(|t| t.amount).sum(),
    };

    let users_by_role = Role::ALL
        .iter()
        .map(|role| RoleCount {
            role: *role,
            count: active.iter().filter(|u| u.role == *role).count(),
        })
        .collect();
    let events_by_category = EventCategory::ALL
        .iter()
        .map(|category| CategoryCount {
            category: *category,
            count: published.iter().filter(|e| e.category == *category).count(),
        })
        .filter(|c| c.count > 0)
        .collect();

    let since = now.checked_sub_months(Months::new(6)).unwrap_or(now);
    let mut by_month: BTreeMap<(i32, u32), (Decimal, usize)> = BTreeMap::new();
    for txn in completed(&transactions) {
        if let Some(paid) = txn.payment_date.filter(|d| *d >= since) {
            let slot = by_month.entry((paid.year(), paid.month())).or_default();
            slot.0 += txn.amount;
            slot.1 += 1;
        }
    }
    let revenue_trend = by_month
        .into_iter()
        .map(|((year, month), (revenue, count))| MonthlyRevenue {
            year,
            month,
            revenue,
            count,
        })
        .collect();

    let growth_since = now - Duration::days(30);
    let mut by_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for user in users.iter().filter(|u| u.created_at >= growth_since) {
        *by_day.entry(user.created_at.date_naive()).or_default() += 1;
    }
    let user_growth = by_day
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect();

    let mut top_events = revenue_by_event(&transactions, tickets, &events);
    top_events.truncate(10);

    users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    AdminDashboard {
        overview,
        users_by_role,
        events_by_category,
        revenue_trend,
        top_events,
        user_growth,
        recent_users: users.iter().take(5).map(UserProfile::from).collect(),
        recent_events: events.into_iter().take(5).collect(),
        recent_transactions: transactions.into_iter().take(10).collect(),
    }
}

pub struct DashboardService {
    store: Arc<dyn Store>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn student(&self, user_id: Uuid) -> AppResult<StudentDashboard> {
        let query = TicketQuery {
            page: 1,
            limit: i64::MAX,
            status: None,
            upcoming_from: None,
        };
        let tickets = self.store.tickets_for_buyer(user_id, &query).await?.items;
        let events = self
            .store
            .events_by_ids(&distinct_event_ids(&tickets))
            .await?;
        let notifications = self
            .store
            .notifications_for(user_id, NOTIFICATION_LIMIT)
            .await?;

        Ok(student_dashboard(tickets, &events, notifications, Utc::now()))
    }

    pub async fn staff(&self, user_id: Uuid) -> AppResult<StaffDashboard> {
        let events = self.store.events_by_organizer(user_id).await?;
        let event_ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
        let tickets = self.store.tickets_for_events(&event_ids).await?;
        let ticket_ids: Vec<Uuid> = tickets.iter().map(|t| t.id).collect();
        let transactions = self.store.transactions_for_tickets(&ticket_ids).await?;

        let mut seen = HashSet::new();
        let buyer_ids: Vec<Uuid> = tickets
            .iter()
            .map(|t| t.buyer_id)
            .filter(|id| seen.insert(*id))
            .collect();
        let buyers = self.store.users_by_ids(&buyer_ids).await?;

        Ok(staff_dashboard(
            events,
            &tickets,
            &transactions,
            &buyers,
            Utc::now(),
        ))
    }

    pub async fn admin(&self) -> AppResult<AdminDashboard> {
        let users = self.store.list_users().await?;
        let events = self.store.list_all_events().await?;
        let tickets = self.store.list_all_tickets().await?;
        let transactions = self.store.list_transactions().await?;

        Ok(admin_dashboard(
            users,
            events,
            &tickets,
            transactions,
            Utc::now(),
        ))
    }
}
