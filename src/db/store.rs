use async_trait::async_trait;
use bson::oid::ObjectId;

use crate::models::booking::Booking;
use crate::models::event::{Event, EventChanges, NewEvent};
use crate::utils::error::AppError;

/// Persistence seam for the handlers. The production backend wraps the
/// shared MongoDB session; tests run against an in-memory one.
#[async_trait]
pub trait EventStore: Send + Sync + 'static {
    /// All events, newest first.
    async fn list_events(&self) -> Result<Vec<Event>, AppError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Event>, AppError>;

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Event>, AppError>;

    /// Inserts a new event. The store assigns the id, derives the slug and
    /// sets both timestamps; a colliding slug is disambiguated with an
    /// id-derived suffix rather than failing.
    async fn insert_event(&self, new: NewEvent) -> Result<Event, AppError>;

    /// Applies the changes as one write and returns the updated document,
    /// or `None` if no document matches.
    async fn update_event(
        &self,
        id: ObjectId,
        changes: EventChanges,
    ) -> Result<Option<Event>, AppError>;

    /// Returns whether a document was removed.
    async fn delete_event(&self, id: ObjectId) -> Result<bool, AppError>;

    /// Registers an email for an event. Fails with `NotFound` if the event
    /// does not exist and `Validation` if the address is already registered.
    async fn insert_booking(&self, event_id: ObjectId, email: &str)
        -> Result<Booking, AppError>;
}
