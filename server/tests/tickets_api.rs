mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use campus_events_server::models::event::{TicketKind, TicketType};
use campus_events_server::models::user::Role;
use campus_events_server::payments::FixedPolicy;
use campus_events_server::store::Store;

use common::{error_code, setup_test};

#[tokio::test]
async fn test_last_seats_go_to_first_buyer() {
    let app = setup_test(FixedPolicy::approve_all());
    let (organizer, _) = app.user(Role::Staff).await;
    let (_, buyer_a) = app.user(Role::Student).await;
    let (_, buyer_b) = app.user(Role::Student).await;
    let event = app.general_event(organizer.id, 2, 500);

    let (status, body) = app
        .post(
            "/tickets/buy",
            Some(&buyer_a),
            json!({ "eventId": event.id, "ticketType": "general", "quantity": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["tickets"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["transaction"]["status"], "pending");
    assert_eq!(body["data"]["transaction"]["paymentMethod"], "pending");

    let stored = app.store.event_by_id(event.id).await.unwrap().unwrap();
    assert_eq!(stored.ticket_types[0].available, 0);

    let (status, body) = app
        .post(
            "/tickets/buy",
            Some(&buyer_b),
            json!({ "eventId": event.id, "ticketType": "general", "quantity": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "CONFLICT");
    assert_eq!(app.store.list_all_tickets().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_sold_out_type_creates_nothing() {
    let app = setup_test(FixedPolicy::approve_all());
    let (organizer, _) = app.user(Role::Staff).await;
    let (_, buyer) = app.user(Role::Student).await;
    let mut sold_out = TicketType::new(TicketKind::Vip, Decimal::new(2000, 0), 5);
    sold_out.available = 0;
    let event = app.event(organizer.id, Utc::now() + Duration::days(3), vec![sold_out]);

    let (status, _) = app
        .post(
            "/tickets/buy",
            Some(&buyer),
            json!({ "eventId": event.id, "ticketType": "vip", "quantity": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(app.store.list_all_tickets().await.unwrap().is_empty());
    assert!(app.store.list_transactions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_purchase_preconditions() {
    let app = setup_test(FixedPolicy::approve_all());
    let (organizer, _) = app.user(Role::Staff).await;
    let (_, buyer) = app.user(Role::Student).await;
    let event = app.general_event(organizer.id, 50, 100);

    let (status, _) = app
        .post(
            "/tickets/buy",
            Some(&buyer),
            json!({ "eventId": uuid::Uuid::new_v4(), "ticketType": "general", "quantity": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .post(
            "/tickets/buy",
            Some(&buyer),
            json!({ "eventId": event.id, "ticketType": "vip", "quantity": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_ARGUMENT");

    let (status, _) = app
        .post(
            "/tickets/buy",
            Some(&buyer),
            json!({ "eventId": event.id, "ticketType": "general", "quantity": 11 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/tickets/buy",
            None,
            json!({ "eventId": event.id, "ticketType": "general", "quantity": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_per_user_cap_counts_existing_tickets() {
    let app = setup_test(FixedPolicy::approve_all());
    let (organizer, _) = app.user(Role::Staff).await;
    let (_, buyer) = app.user(Role::Student).await;
    let event = app.general_event(organizer.id, 50, 100);

    let (status, _) = app
        .post(
            "/tickets/buy",
            Some(&buyer),
            json!({ "eventId": event.id, "ticketType": "general", "quantity": 8 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post(
            "/tickets/buy",
            Some(&buyer),
            json!({ "eventId": event.id, "ticketType": "general", "quantity": 3 }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"]["message"].as_str().unwrap().contains("Maximum 10"));
}

#[tokio::test]
async fn test_check_in_twice_is_rejected() {
    let app = setup_test(FixedPolicy::approve_all());
    let (organizer, staff) = app.user(Role::Staff).await;
    let (_, buyer) = app.user(Role::Student).await;
    let event = app.event(
        organizer.id,
        Utc::now(),
        vec![TicketType::new(TicketKind::Free, Decimal::ZERO, 10)],
    );

    let (_, body) = app
        .post(
            "/tickets/buy",
            Some(&buyer),
            json!({ "eventId": event.id, "ticketType": "free", "quantity": 1 }),
        )
        .await;
    let ticket = &body["data"]["tickets"][0];
    let ticket_id = ticket["id"].as_str().unwrap().to_string();
    let qr = ticket["qrCode"].as_str().unwrap().to_string();
    let uri = format!("/tickets/{ticket_id}/checkin");

    let (status, _) = app
        .post(&uri, Some(&buyer), json!({ "qrCode": qr }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(&uri, Some(&staff), json!({ "qrCode": "not-the-code" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.post(&uri, Some(&staff), json!({ "qrCode": qr })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "used");
    assert!(body["data"]["usedDate"].is_string());
    assert_eq!(body["data"]["checkedInBy"], json!(organizer.id));

    let (status, body) = app.post(&uri, Some(&staff), json!({ "qrCode": qr })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "ALREADY_USED");
}

#[tokio::test]
async fn test_check_in_after_event_day_is_expired() {
    let app = setup_test(FixedPolicy::approve_all());
    let (organizer, staff) = app.user(Role::Staff).await;
    let (_, buyer) = app.user(Role::Student).await;
    let event = app.general_event(organizer.id, 10, 100);

    let (_, body) = app
        .post(
            "/tickets/buy",
            Some(&buyer),
            json!({ "eventId": event.id, "ticketType": "general", "quantity": 1 }),
        )
        .await;
    let ticket_id = body["data"]["tickets"][0]["id"].as_str().unwrap().to_string();
    let qr = body["data"]["tickets"][0]["qrCode"].as_str().unwrap().to_string();

    let mut past = app.store.event_by_id(event.id).await.unwrap().unwrap();
    past.date = Utc::now() - Duration::days(3);
    app.store.insert_event(past);

    let (status, body) = app
        .post(
            &format!("/tickets/{ticket_id}/checkin"),
            Some(&staff),
            json!({ "qrCode": qr }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "EVENT_EXPIRED");
}

#[tokio::test]
async fn test_qr_and_ticket_listing_access() {
    let app = setup_test(FixedPolicy::approve_all());
    let (organizer, staff) = app.user(Role::Staff).await;
    let (buyer, buyer_token) = app.user(Role::Student).await;
    let (_, other_token) = app.user(Role::Student).await;
    let event = app.general_event(organizer.id, 10, 100);

    let (_, body) = app
        .post(
            "/tickets/buy",
            Some(&buyer_token),
            json!({ "eventId": event.id, "ticketType": "general", "quantity": 1 }),
        )
        .await;
    let ticket_id = body["data"]["tickets"][0]["id"].as_str().unwrap().to_string();
    let qr_uri = format!("/tickets/{ticket_id}/qr");

    let (status, body) = app.get(&qr_uri, Some(&buyer_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["qrCode"]
        .as_str()
        .unwrap()
        .starts_with("data:image/svg+xml;base64,"));
    assert_eq!(body["data"]["ticket"]["buyerName"], json!(buyer.name));

    let (status, _) = app.get(&qr_uri, Some(&other_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get(&qr_uri, Some(&staff)).await;
    assert_eq!(status, StatusCode::OK);

    let list_uri = format!("/tickets/user/{}?upcoming=true", buyer.id);
    let (status, body) = app.get(&list_uri, Some(&buyer_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["total"], 1);
    assert_eq!(body["data"]["tickets"][0]["event"]["title"], json!(event.title));

    let (status, _) = app.get(&list_uri, Some(&other_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
