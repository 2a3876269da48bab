use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::db::store::EventStore;
use crate::models::booking::Booking;
use crate::models::event::{suffixed_slug, Event, EventChanges, NewEvent};
use crate::utils::error::AppError;

/// In-memory store with the same semantics as the MongoDB backend,
/// including slug uniqueness and the one-registration-per-address rule.
/// Used by the integration tests.
#[derive(Default)]
pub struct MemoryEventStore {
    events: RwLock<Vec<Event>>,
    bookings: RwLock<Vec<Booking>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn list_events(&self) -> Result<Vec<Event>, AppError> {
        let events = self.events.read().await;
        // Newest insertions first among equal timestamps: reverse, then
        // stable-sort by createdAt descending.
        let mut listed: Vec<Event> = events.iter().rev().cloned().collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listed)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Event>, AppError> {
        let events = self.events.read().await;
        Ok(events.iter().find(|event| event.slug == slug).cloned())
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Event>, AppError> {
        let events = self.events.read().await;
        Ok(events.iter().find(|event| event.id == id).cloned())
    }

    async fn insert_event(&self, new: NewEvent) -> Result<Event, AppError> {
        let mut events = self.events.write().await;

        let mut event = Event::from_new(new);
        if events.iter().any(|existing| existing.slug == event.slug) {
            event.slug = suffixed_slug(&event.slug, &event.id);
        }

        events.push(event.clone());
        Ok(event)
    }

    async fn update_event(
        &self,
        id: ObjectId,
        changes: EventChanges,
    ) -> Result<Option<Event>, AppError> {
        let mut events = self.events.write().await;
        let Some(event) = events.iter_mut().find(|event| event.id == id) else {
            return Ok(None);
        };

        macro_rules! apply {
            ($($field:ident),*) => {
                $(if let Some(value) = changes.$field {
                    event.$field = value;
                })*
            };
        }
        apply!(
            title, overview, description, organizer, audience, venue, location, date, time,
            mode, image, tags, agenda
        );
        event.updated_at = Utc::now();

        Ok(Some(event.clone()))
    }

    async fn delete_event(&self, id: ObjectId) -> Result<bool, AppError> {
        let mut events = self.events.write().await;
        let before = events.len();
        events.retain(|event| event.id != id);
        Ok(events.len() < before)
    }

    async fn insert_booking(
        &self,
        event_id: ObjectId,
        email: &str,
    ) -> Result<Booking, AppError> {
        let events = self.events.read().await;
        if !events.iter().any(|event| event.id == event_id) {
            return Err(AppError::NotFound("Event not found.".to_string()));
        }
        drop(events);

        let mut bookings = self.bookings.write().await;
        let duplicate = bookings
            .iter()
            .any(|booking| booking.event_id == event_id && booking.email == email);
        if duplicate {
            return Err(AppError::Validation(
                "This email is already registered for this event.".to_string(),
            ));
        }

        let booking = Booking::new(event_id, email.to_string());
        bookings.push(booking.clone());
        Ok(booking)
    }
}
