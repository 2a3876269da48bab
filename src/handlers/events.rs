use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use bson::oid::ObjectId;

use crate::handlers::forms::{parse_create, parse_update};
use crate::models::event::{
    is_valid_slug, normalize_mode, EventChanges, EventRecord, NewEvent,
};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response;

type FormBody = Result<Multipart, MultipartRejection>;

fn multipart_or_reject(body: FormBody) -> Result<Multipart, AppError> {
    body.map_err(|e| AppError::Validation(format!("Expected multipart form data: {e}")))
}

fn parse_object_id(raw: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(raw.trim())
        .map_err(|_| AppError::Validation("Valid event ID is required.".to_string()))
}

pub async fn list_events(State(state): State<AppState>) -> Result<Response, AppError> {
    let events = state.events.list_events().await?;
    let records: Vec<EventRecord> = events.into_iter().map(Into::into).collect();
    Ok(response::events("Events fetched successfully", records))
}

/// Slug lookup only; opaque ids are served by [`get_event_by_id`].
pub async fn get_event_by_slug(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, AppError> {
    let slug = token.trim().to_lowercase();
    if slug.is_empty() {
        return Err(AppError::Validation("Slug is required.".to_string()));
    }
    if !is_valid_slug(&slug) {
        return Err(AppError::Validation("Slug format is invalid.".to_string()));
    }

    let event = state
        .events
        .find_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found.".to_string()))?;

    Ok(response::event(
        StatusCode::OK,
        "Event fetched successfully",
        EventRecord::from(event),
    ))
}

pub async fn get_event_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_object_id(&id)?;
    let event = state
        .events
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found.".to_string()))?;

    Ok(response::event(
        StatusCode::OK,
        "Event fetched successfully",
        EventRecord::from(event),
    ))
}

/// Upload first, write second: an upload failure leaves no partial event
/// behind. A write failure after the upload orphans the asset, which is
/// accepted.
pub async fn create_event(
    State(state): State<AppState>,
    body: FormBody,
) -> Result<Response, AppError> {
    let form = parse_create(multipart_or_reject(body)?).await?;

    let image_url = state.media.upload_image(form.image).await?;

    let event = state
        .events
        .insert_event(NewEvent {
            title: form.title,
            overview: form.overview,
            description: form.description,
            organizer: form.organizer,
            audience: form.audience,
            venue: form.venue,
            location: form.location,
            date: form.date,
            time: form.time,
            mode: normalize_mode(&form.mode),
            image: image_url,
            tags: form.tags,
            agenda: form.agenda,
        })
        .await?;

    Ok(response::event(
        StatusCode::CREATED,
        "Event Created Successfully",
        EventRecord::from(event),
    ))
}

pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: FormBody,
) -> Result<Response, AppError> {
    let id = parse_object_id(&id)?;
    let form = parse_update(multipart_or_reject(body)?).await?;

    // Only a non-empty replacement file touches the image field; otherwise
    // it stays out of the update entirely.
    let image_url = match form.image {
        Some(image) => Some(state.media.upload_image(image).await?),
        None => None,
    };

    let changes = EventChanges {
        title: form.title,
        overview: form.overview,
        description: form.description,
        organizer: form.organizer,
        audience: form.audience,
        venue: form.venue,
        location: form.location,
        date: form.date,
        time: form.time,
        mode: form.mode.as_deref().map(normalize_mode),
        image: image_url,
        tags: form.tags,
        agenda: form.agenda,
    };

    let event = state
        .events
        .update_event(id, changes)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found.".to_string()))?;

    Ok(response::event(
        StatusCode::OK,
        "Event updated successfully",
        EventRecord::from(event),
    ))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_object_id(&id)?;

    if !state.events.delete_event(id).await? {
        return Err(AppError::NotFound("Event not found.".to_string()));
    }

    Ok(response::confirmation("Event deleted successfully"))
}
