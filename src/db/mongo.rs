use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};

use crate::db::connection::ConnectionManager;
use crate::db::store::EventStore;
use crate::models::booking::Booking;
use crate::models::event::{suffixed_slug, Event, EventChanges, NewEvent};
use crate::utils::error::AppError;

const DUPLICATE_KEY: i32 = 11000;

/// MongoDB-backed store. Every method acquires the shared session first
/// and performs a single operation against it.
pub struct MongoEventStore {
    manager: ConnectionManager,
}

impl MongoEventStore {
    pub fn new(manager: ConnectionManager) -> Self {
        Self { manager }
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

fn changes_to_set_document(changes: EventChanges) -> Document {
    let mut set = Document::new();

    let scalars = [
        ("title", changes.title),
        ("overview", changes.overview),
        ("description", changes.description),
        ("organizer", changes.organizer),
        ("audience", changes.audience),
        ("venue", changes.venue),
        ("location", changes.location),
        ("date", changes.date),
        ("time", changes.time),
        ("mode", changes.mode),
        ("image", changes.image),
    ];
    for (key, value) in scalars {
        if let Some(value) = value {
            set.insert(key, value);
        }
    }

    for (key, value) in [("tags", changes.tags), ("agenda", changes.agenda)] {
        if let Some(items) = value {
            set.insert(
                key,
                Bson::Array(items.into_iter().map(Bson::String).collect()),
            );
        }
    }

    set.insert("updatedAt", bson::DateTime::from_chrono(Utc::now()));
    set
}

#[async_trait]
impl EventStore for MongoEventStore {
    #[tracing::instrument(skip(self), name = "MongoEventStore::list_events", err)]
    async fn list_events(&self) -> Result<Vec<Event>, AppError> {
        let database = self.manager.acquire().await?;
        let cursor = Event::collection(&database)
            .find(
                None,
                FindOptions::builder()
                    .sort(bson::doc! { "createdAt": -1 })
                    .build(),
            )
            .await?;

        Ok(cursor.try_collect().await?)
    }

    #[tracing::instrument(skip(self), name = "MongoEventStore::find_by_slug", err)]
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Event>, AppError> {
        let database = self.manager.acquire().await?;
        Ok(Event::collection(&database)
            .find_one(bson::doc! { "slug": slug }, None)
            .await?)
    }

    #[tracing::instrument(skip(self), name = "MongoEventStore::find_by_id", err)]
    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Event>, AppError> {
        let database = self.manager.acquire().await?;
        Ok(Event::collection(&database)
            .find_one(bson::doc! { "_id": id }, None)
            .await?)
    }

    #[tracing::instrument(skip(self, new), name = "MongoEventStore::insert_event", err)]
    async fn insert_event(&self, new: NewEvent) -> Result<Event, AppError> {
        let database = self.manager.acquire().await?;
        let collection = Event::collection(&database);

        let mut event = Event::from_new(new);
        match collection.insert_one(&event, None).await {
            Ok(_) => Ok(event),
            // Unique index hit: another event owns this slug. Retry once
            // with an id-derived suffix.
            Err(err) if is_duplicate_key(&err) => {
                event.slug = suffixed_slug(&event.slug, &event.id);
                collection.insert_one(&event, None).await?;
                Ok(event)
            }
            Err(err) => Err(err.into()),
        }
    }

    #[tracing::instrument(skip(self, changes), name = "MongoEventStore::update_event", err)]
    async fn update_event(
        &self,
        id: ObjectId,
        changes: EventChanges,
    ) -> Result<Option<Event>, AppError> {
        let database = self.manager.acquire().await?;
        Ok(Event::collection(&database)
            .find_one_and_update(
                bson::doc! { "_id": id },
                bson::doc! { "$set": changes_to_set_document(changes) },
                Some(
                    FindOneAndUpdateOptions::builder()
                        .return_document(ReturnDocument::After)
                        .build(),
                ),
            )
            .await?)
    }

    #[tracing::instrument(skip(self), name = "MongoEventStore::delete_event", err)]
    async fn delete_event(&self, id: ObjectId) -> Result<bool, AppError> {
        let database = self.manager.acquire().await?;
        let result = Event::collection(&database)
            .delete_one(bson::doc! { "_id": id }, None)
            .await?;

        Ok(result.deleted_count == 1)
    }

    #[tracing::instrument(skip(self), name = "MongoEventStore::insert_booking", err)]
    async fn insert_booking(
        &self,
        event_id: ObjectId,
        email: &str,
    ) -> Result<Booking, AppError> {
        let database = self.manager.acquire().await?;

        let event_exists = Event::collection(&database)
            .find_one(bson::doc! { "_id": event_id }, None)
            .await?
            .is_some();
        if !event_exists {
            return Err(AppError::NotFound("Event not found.".to_string()));
        }

        let booking = Booking::new(event_id, email.to_string());
        match Booking::collection(&database).insert_one(&booking, None).await {
            Ok(_) => Ok(booking),
            Err(err) if is_duplicate_key(&err) => Err(AppError::Validation(
                "This email is already registered for this event.".to_string(),
            )),
            Err(err) => Err(err.into()),
        }
    }
}
