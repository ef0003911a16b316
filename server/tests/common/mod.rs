#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use campus_events_server::config::Config;
use campus_events_server::models::event::{
    Event, EventCategory, EventStatus, TicketKind, TicketType,
};
use campus_events_server::models::user::{NewUser, Role, User};
use campus_events_server::payments::{FixedPolicy, SettlementScheduler};
use campus_events_server::routes::create_routes;
use campus_events_server::state::AppState;
use campus_events_server::store::{MemoryStore, Store};

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

pub fn setup_test(policy: FixedPolicy) -> TestApp {
    let config = Config {
        mobile_money_delay: Duration::from_secs(5),
        ..Config::default()
    };
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(
        config,
        store.clone(),
        Arc::new(policy),
        SettlementScheduler::new(),
    );

    TestApp {
        router: create_routes(state.clone()),
        state,
        store,
    }
}

impl TestApp {
    /// Creates an account directly in the store and returns it with an
    /// access token.
    pub async fn user(&self, role: Role) -> (User, String) {
        let tag = Uuid::new_v4().simple().to_string();
        let user = self
            .store
            .create_user(NewUser {
                name: format!("{role} {}", &tag[..6]),
                email: format!("{tag}@campus.ac.ke"),
                password_hash: "unused".to_string(),
                role,
                university_id: None,
                phone: None,
                department: None,
            })
            .await
            .unwrap();
        let token = self.state.tokens.issue_pair(&user).unwrap().access_token;
        (user, token)
    }

    pub fn event(
        &self,
        organizer: Uuid,
        date: DateTime<Utc>,
        types: Vec<TicketType>,
    ) -> Event {
        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            title: "Inter-faculty Debate".to_string(),
            description: "Annual debating championship".to_string(),
            category: EventCategory::Academic,
            date,
            end_date: None,
            venue: "Senate Hall".to_string(),
            capacity: 300,
            ticket_types: types,
            organizer_id: organizer,
            images: vec![],
            videos: vec![],
            tags: vec![],
            is_featured: false,
            requires_approval: false,
            status: EventStatus::Published,
            published_at: Some(now),
            created_at: now,
            updated_at: now,
        };
        self.store.insert_event(event.clone());
        event
    }

    /// A published event next week with one `general` fare class.
    pub fn general_event(&self, organizer: Uuid, quantity: i32, price: i64) -> Event {
        self.event(
            organizer,
            Utc::now() + chrono::Duration::days(7),
            vec![TicketType::new(
                TicketKind::General,
                Decimal::new(price, 0),
                quantity,
            )],
        )
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }
}

pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}
