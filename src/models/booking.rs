use bson::oid::ObjectId;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use mongodb::{Database, IndexModel};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const BOOKINGS_COLLECTION: &str = "bookings";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));

/// An email registration for an event. One registration per address per
/// event, enforced by a unique compound index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub event_id: ObjectId,
    pub email: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub event_id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<Booking> for BookingRecord {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id.to_hex(),
            event_id: booking.event_id.to_hex(),
            email: booking.email,
            created_at: booking.created_at,
        }
    }
}

impl Booking {
    pub fn collection(database: &Database) -> mongodb::Collection<Booking> {
        database.collection(BOOKINGS_COLLECTION)
    }

    pub async fn setup_collection(database: &Database) -> Result<(), mongodb::error::Error> {
        Self::collection(database)
            .create_index(
                IndexModel::builder()
                    .keys(bson::doc! { "eventId": 1, "email": 1 })
                    .options(Some(IndexOptions::builder().unique(Some(true)).build()))
                    .build(),
                None,
            )
            .await?;

        Ok(())
    }

    pub fn new(event_id: ObjectId, email: String) -> Self {
        Self {
            id: ObjectId::new(),
            event_id,
            email,
            created_at: Utc::now(),
        }
    }
}

/// A plausibility check, not RFC 5322: something@something.something.
pub fn is_valid_email(candidate: &str) -> bool {
    EMAIL_RE.is_match(candidate)
}
