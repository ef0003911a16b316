//! The `{ success, data, message }` envelope shared by every endpoint.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    message: &'a str,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    success: bool,
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

fn reply<T: Serialize>(status: StatusCode, data: Option<T>, message: &str) -> Response {
    let body = Envelope {
        success: true,
        data,
        message,
    };
    (status, Json(body)).into_response()
}

pub fn success<T: Serialize>(data: T, message: impl AsRef<str>) -> Response {
    reply(StatusCode::OK, Some(data), message.as_ref())
}

pub fn created<T: Serialize>(data: T, message: impl AsRef<str>) -> Response {
    reply(StatusCode::CREATED, Some(data), message.as_ref())
}

pub fn empty_success(message: impl AsRef<str>) -> Response {
    reply::<()>(StatusCode::OK, None, message.as_ref())
}

pub fn error(
    code: &str,
    message: impl AsRef<str>,
    details: Option<Value>,
    status: StatusCode,
) -> Response {
    let body = ErrorEnvelope {
        success: false,
        error: ErrorBody {
            code,
            message: message.as_ref(),
            details,
        },
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn body_of(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_created_wraps_payload() {
        let response = created(json!({ "id": 7 }), "Made");
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            body_of(response).await,
            json!({ "success": true, "data": { "id": 7 }, "message": "Made" })
        );
    }

    #[tokio::test]
    async fn test_error_omits_missing_details() {
        let response = error("NOT_FOUND", "Gone", None, StatusCode::NOT_FOUND);
        assert_eq!(
            body_of(response).await,
            json!({ "success": false, "error": { "code": "NOT_FOUND", "message": "Gone" } })
        );
    }
}
