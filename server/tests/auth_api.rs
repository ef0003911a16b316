mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use campus_events_server::models::user::Role;
use campus_events_server::payments::FixedPolicy;

use common::{error_code, setup_test, TestApp};

fn registration(email: &str, university_id: &str) -> Value {
    json!({
        "name": "Wanjiru Kamau",
        "email": email,
        "password": "Harambee2024",
        "universityId": university_id,
        "department": "Computer Science"
    })
}

async fn register(app: &TestApp, body: Value) -> (StatusCode, Value) {
    app.post("/auth/register", None, body).await
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = setup_test(FixedPolicy::approve_all());

    let (status, body) = register(&app, registration("wanjiru@campus.ac.ke", "CS/001/2024")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["user"]["role"], "student");
    assert!(body["data"]["user"].get("passwordHash").is_none());

    let (status, body) = app
        .post(
            "/auth/login",
            None,
            json!({ "email": "wanjiru@campus.ac.ke", "password": "Harambee2024" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let access = body["data"]["tokens"]["accessToken"].as_str().unwrap().to_string();
    let refresh = body["data"]["tokens"]["refreshToken"].as_str().unwrap().to_string();

    let (status, body) = app.get("/auth/me", Some(&access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "wanjiru@campus.ac.ke");
    assert!(body["data"]["lastLogin"].is_string());

    // A refresh token is not an access token.
    let (status, _) = app.get("/auth/me", Some(&refresh)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .post("/auth/refresh", None, json!({ "refreshToken": refresh }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["tokens"]["accessToken"].is_string());
}

#[tokio::test]
async fn test_duplicate_registration_names_the_field() {
    let app = setup_test(FixedPolicy::approve_all());
    let (status, _) = register(&app, registration("otieno@campus.ac.ke", "EN/114/2023")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = register(&app, registration("otieno@campus.ac.ke", "EN/999/2023")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["details"]["field"], "email");

    let (status, body) = register(&app, registration("other@campus.ac.ke", "EN/114/2023")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["details"]["field"], "universityId");
}

#[tokio::test]
async fn test_register_validation_and_bad_login() {
    let app = setup_test(FixedPolicy::approve_all());

    let (status, body) = register(
        &app,
        json!({ "name": "K", "email": "not-an-email", "password": "weak" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_ARGUMENT");

    let (status, body) = app
        .post(
            "/auth/login",
            None,
            json!({ "email": "nobody@campus.ac.ke", "password": "Harambee2024" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "Invalid email or password");

    let (status, _) = app.get("/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.get("/auth/me", Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_forgot_password_never_reveals_accounts() {
    let app = setup_test(FixedPolicy::approve_all());
    register(&app, registration("njeri@campus.ac.ke", "BS/020/2022")).await;

    let (known_status, known) = app
        .post("/auth/forgot-password", None, json!({ "email": "njeri@campus.ac.ke" }))
        .await;
    let (unknown_status, unknown) = app
        .post("/auth/forgot-password", None, json!({ "email": "ghost@campus.ac.ke" }))
        .await;
    assert_eq!(known_status, StatusCode::OK);
    assert_eq!(unknown_status, StatusCode::OK);
    assert_eq!(known["message"], unknown["message"]);

    let (status, _) = app
        .post(
            "/auth/reset-password",
            None,
            json!({ "token": "bogus", "password": "NewPassword1" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_deactivated_account_loses_issued_tokens() {
    let app = setup_test(FixedPolicy::approve_all());
    let (mut user, token) = app.user(Role::Student).await;

    let (status, _) = app.get("/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    user.is_active = false;
    app.store.put_user(user);

    let (status, body) = app.get("/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "Account is deactivated");
}

#[tokio::test]
async fn test_admin_role_is_not_self_service() {
    let app = setup_test(FixedPolicy::approve_all());

    let mut admin = registration("mwangi@campus.ac.ke", "AD/001/2020");
    admin["role"] = json!("admin");
    let (status, body) = register(&app, admin).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "FORBIDDEN");

    let mut staff = registration("mwangi@campus.ac.ke", "AD/001/2020");
    staff["role"] = json!("staff");
    let (status, body) = register(&app, staff).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["user"]["role"], "staff");
}
