mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use campus_events_server::models::notification::NotificationKind;
use campus_events_server::models::user::Role;
use campus_events_server::payments::FixedPolicy;
use campus_events_server::store::Store;

use common::{error_code, setup_test, TestApp};

/// Buys `quantity` general tickets and returns the buyer's token with the
/// issued ticket ids.
async fn purchase(app: &TestApp, quantity: i32) -> (uuid::Uuid, String, Vec<String>) {
    let (organizer, _) = app.user(Role::Staff).await;
    let (buyer, token) = app.user(Role::Student).await;
    let event = app.general_event(organizer.id, 20, 500);

    let (status, body) = app
        .post(
            "/tickets/buy",
            Some(&token),
            json!({ "eventId": event.id, "ticketType": "general", "quantity": quantity }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let ids = body["data"]["tickets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap().to_string())
        .collect();
    (buyer.id, token, ids)
}

fn stk_callback(merchant_request_id: &str, result_code: i64, amount: i64) -> Value {
    json!({
        "Body": {
            "stkCallback": {
                "MerchantRequestID": merchant_request_id,
                "CheckoutRequestID": "ws_CO_191220191020363925",
                "ResultCode": result_code,
                "ResultDesc": if result_code == 0 { "The service request is processed successfully." } else { "Request cancelled by user" },
                "CallbackMetadata": {
                    "Item": [
                        { "Name": "Amount", "Value": amount },
                        { "Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV" }
                    ]
                }
            }
        }
    })
}

#[tokio::test]
async fn test_cash_payment_completes_immediately() {
    let app = setup_test(FixedPolicy::decline_all());
    let (buyer_id, token, ids) = purchase(&app, 2).await;

    let (status, body) = app
        .post(
            "/payments/initiate",
            Some(&token),
            json!({ "ticketIds": ids, "paymentMethod": "cash" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["transaction"]["status"], "completed");
    assert_eq!(body["data"]["transaction"]["paymentMethod"], "cash");
    assert_eq!(body["data"]["totalAmount"], json!("1000"));

    let notifications = app.store.notifications_for(buyer_id, 10).await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::PaymentConfirmation);

    let (status, body) = app
        .post(
            "/payments/initiate",
            Some(&token),
            json!({ "ticketIds": ids, "paymentMethod": "card" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_STATE");
}

#[tokio::test]
async fn test_card_outcome_follows_policy() {
    let declined = setup_test(FixedPolicy::decline_all());
    let (_, token, ids) = purchase(&declined, 1).await;
    let (status, body) = declined
        .post(
            "/payments/initiate",
            Some(&token),
            json!({ "ticketIds": ids, "paymentMethod": "card" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["transaction"]["status"], "failed");
    assert_eq!(body["data"]["paymentResponse"]["message"], "Card payment declined");

    let approved = setup_test(FixedPolicy::approve_all());
    let (_, token, ids) = purchase(&approved, 1).await;
    let (_, body) = approved
        .post(
            "/payments/initiate",
            Some(&token),
            json!({ "ticketIds": ids, "paymentMethod": "card" }),
        )
        .await;
    assert_eq!(body["data"]["transaction"]["status"], "completed");
    assert!(body["data"]["paymentResponse"]["reference"]
        .as_str()
        .unwrap()
        .starts_with("CARD-"));
}

#[tokio::test]
async fn test_payment_requires_whole_purchase_and_ownership() {
    let app = setup_test(FixedPolicy::approve_all());
    let (_, token, ids) = purchase(&app, 2).await;
    let (_, stranger) = app.user(Role::Student).await;

    let (status, _) = app
        .post(
            "/payments/initiate",
            Some(&token),
            json!({ "ticketIds": [ids[0]], "paymentMethod": "cash" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/payments/initiate",
            Some(&stranger),
            json!({ "ticketIds": ids, "paymentMethod": "cash" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .post(
            "/payments/initiate",
            Some(&token),
            json!({ "ticketIds": ids, "paymentMethod": "mobile-money", "phoneNumber": "0712" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_ARGUMENT");
}

#[tokio::test]
async fn test_gateway_callback_settles_once() {
    let app = setup_test(FixedPolicy::decline_all());
    let (buyer_id, token, ids) = purchase(&app, 1).await;

    let (status, body) = app
        .post(
            "/payments/initiate",
            Some(&token),
            json!({ "ticketIds": ids, "paymentMethod": "mobile-money", "phoneNumber": "+254712345678" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["transaction"]["status"], "pending");
    let merchant_request_id = body["data"]["paymentResponse"]["merchantRequestId"]
        .as_str()
        .unwrap()
        .to_string();
    let transaction_id: uuid::Uuid = body["data"]["transaction"]["id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();

    let (status, body) = app
        .post(
            "/payments/callback/mpesa",
            None,
            stk_callback(&merchant_request_id, 0, 500),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let settled = app.store.transaction_by_id(transaction_id).await.unwrap().unwrap();
    assert_eq!(settled.status.as_str(), "completed");
    assert_eq!(
        settled.gateway_reference.as_deref(),
        Some("ws_CO_191220191020363925")
    );

    // A late failure report for the same request must not undo the payment.
    let (status, _) = app
        .post(
            "/payments/callback/mpesa",
            None,
            stk_callback(&merchant_request_id, 1032, 500),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let replayed = app.store.transaction_by_id(transaction_id).await.unwrap().unwrap();
    assert_eq!(replayed.status.as_str(), "completed");
    assert_eq!(replayed.payment_date, settled.payment_date);
    assert_eq!(app.store.notifications_for(buyer_id, 10).await.unwrap().len(), 1);
    assert_eq!(app.state.payments.awaiting_settlement(), 0);
}

#[tokio::test]
async fn test_callback_rejects_unknown_requests() {
    let app = setup_test(FixedPolicy::approve_all());

    let (status, _) = app
        .post("/payments/callback/mpesa", None, stk_callback("MR-UNKNOWN", 0, 10))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .post("/payments/callback/mpesa", None, json!({ "unexpected": true }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Invalid callback format");

    let (status, _) = app
        .post("/payments/callback/paypal", None, stk_callback("MR-UNKNOWN", 0, 10))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
