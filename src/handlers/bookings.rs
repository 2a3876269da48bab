use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use bson::oid::ObjectId;
use serde::Deserialize;

use crate::models::booking::{is_valid_email, BookingRecord};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateBookingRequest {
    pub event_id: String,
    pub email: String,
}

pub async fn create_booking(
    State(state): State<AppState>,
    body: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) =
        body.map_err(|e| AppError::Validation(format!("Expected a JSON body: {e}")))?;

    let event_id = ObjectId::parse_str(request.event_id.trim())
        .map_err(|_| AppError::Validation("Valid event ID is required.".to_string()))?;

    let email = request.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(AppError::Validation(
            "A valid email address is required.".to_string(),
        ));
    }

    let booking = state.events.insert_booking(event_id, &email).await?;

    Ok(response::booking(
        "Registered for event successfully",
        BookingRecord::from(booking),
    ))
}
