use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// The uniform response envelope. Every handler answers with
/// `{ message, ... }`; the payload key (`event`, `events`, `booking`)
/// depends on the operation, and `code`/`error` appear only on failures.
#[derive(Serialize)]
struct Envelope<T>
where
    T: Serialize,
{
    message: String,
    #[serde(flatten)]
    payload: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct EventPayload<T: Serialize> {
    event: T,
}

#[derive(Serialize)]
struct EventListPayload<T: Serialize> {
    events: Vec<T>,
}

#[derive(Serialize)]
struct BookingPayload<T: Serialize> {
    booking: T,
}

fn envelope<T: Serialize>(status: StatusCode, message: impl Into<String>, payload: T) -> Response {
    let body = Envelope {
        message: message.into(),
        payload: Some(payload),
        code: None,
        error: None,
    };
    (status, Json(body)).into_response()
}

pub fn event<T: Serialize>(status: StatusCode, message: impl Into<String>, event: T) -> Response {
    envelope(status, message, EventPayload { event })
}

pub fn events<T: Serialize>(message: impl Into<String>, events: Vec<T>) -> Response {
    envelope(StatusCode::OK, message, EventListPayload { events })
}

pub fn booking<T: Serialize>(message: impl Into<String>, booking: T) -> Response {
    envelope(StatusCode::CREATED, message, BookingPayload { booking })
}

pub fn confirmation(message: impl Into<String>) -> Response {
    let body: Envelope<()> = Envelope {
        message: message.into(),
        payload: None,
        code: None,
        error: None,
    };
    (StatusCode::OK, Json(body)).into_response()
}

pub fn error(
    code: &str,
    message: impl Into<String>,
    detail: Option<String>,
    status: StatusCode,
) -> Response {
    let body: Envelope<()> = Envelope {
        message: message.into(),
        payload: None,
        code: Some(code.to_string()),
        error: detail,
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn event_envelope_nests_the_record() {
        let response = event(
            StatusCode::CREATED,
            "Event Created Successfully",
            serde_json::json!({"title": "Test Talk"}),
        );
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert_eq!(body["message"], "Event Created Successfully");
        assert_eq!(body["event"]["title"], "Test Talk");
        assert!(body.get("code").is_none());
    }

    #[tokio::test]
    async fn confirmation_carries_only_a_message() {
        let response = confirmation("Event deleted successfully");
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["message"], "Event deleted successfully");
        assert_eq!(body.as_object().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn error_envelope_keeps_detail_optional() {
        let response = error("NOT_FOUND", "Event not found.", None, StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["code"], "NOT_FOUND");
        assert!(body.get("error").is_none());
    }
}
