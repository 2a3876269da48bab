use bson::oid::ObjectId;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use mongodb::{Database, IndexModel};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const EVENTS_COLLECTION: &str = "events";

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("slug regex"));

/// An event document as stored in the `events` collection.
///
/// Field names are camelCase on the wire and in BSON; timestamps are stored
/// as native BSON datetimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub slug: String,
    pub title: String,
    pub overview: String,
    pub description: String,
    pub organizer: String,
    pub audience: String,
    pub venue: String,
    pub location: String,
    pub date: String,
    pub time: String,
    pub mode: String,
    pub image: String,
    pub tags: Vec<String>,
    pub agenda: Vec<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// JSON representation of an event: `_id` as a hex string, RFC 3339
/// timestamps. This is what the response envelopes carry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub slug: String,
    pub title: String,
    pub overview: String,
    pub description: String,
    pub organizer: String,
    pub audience: String,
    pub venue: String,
    pub location: String,
    pub date: String,
    pub time: String,
    pub mode: String,
    pub image: String,
    pub tags: Vec<String>,
    pub agenda: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Event> for EventRecord {
    fn from(event: Event) -> Self {
        Self {
            id: event.id.to_hex(),
            slug: event.slug,
            title: event.title,
            overview: event.overview,
            description: event.description,
            organizer: event.organizer,
            audience: event.audience,
            venue: event.venue,
            location: event.location,
            date: event.date,
            time: event.time,
            mode: event.mode,
            image: event.image,
            tags: event.tags,
            agenda: event.agenda,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

/// Validated input for creating an event. The image has already been
/// uploaded; `image` is the URL the media host returned.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub overview: String,
    pub description: String,
    pub organizer: String,
    pub audience: String,
    pub venue: String,
    pub location: String,
    pub date: String,
    pub time: String,
    pub mode: String,
    pub image: String,
    pub tags: Vec<String>,
    pub agenda: Vec<String>,
}

/// Field-by-field changes for an update. `None` means "leave untouched";
/// tags and agenda replace the stored sequences wholesale when present.
/// There is deliberately no slug or id field here.
#[derive(Debug, Clone, Default)]
pub struct EventChanges {
    pub title: Option<String>,
    pub overview: Option<String>,
    pub description: Option<String>,
    pub organizer: Option<String>,
    pub audience: Option<String>,
    pub venue: Option<String>,
    pub location: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub mode: Option<String>,
    pub image: Option<String>,
    pub tags: Option<Vec<String>>,
    pub agenda: Option<Vec<String>>,
}

impl Event {
    pub fn collection(database: &Database) -> mongodb::Collection<Event> {
        database.collection(EVENTS_COLLECTION)
    }

    pub async fn setup_collection(database: &Database) -> Result<(), mongodb::error::Error> {
        Self::collection(database)
            .create_index(
                IndexModel::builder()
                    .keys(bson::doc! { "slug": 1 })
                    .options(Some(IndexOptions::builder().unique(Some(true)).build()))
                    .build(),
                None,
            )
            .await?;

        Ok(())
    }

    /// Builds a fresh document from validated input. The slug is derived
    /// from the title; callers resolve collisions with [`suffixed_slug`].
    pub fn from_new(new: NewEvent) -> Self {
        let id = ObjectId::new();
        let now = Utc::now();
        let slug = {
            let base = slugify(&new.title);
            if base.is_empty() {
                format!("event-{}", id_suffix(&id))
            } else {
                base
            }
        };

        Self {
            id,
            slug,
            title: new.title,
            overview: new.overview,
            description: new.description,
            organizer: new.organizer,
            audience: new.audience,
            venue: new.venue,
            location: new.location,
            date: new.date,
            time: new.time,
            mode: new.mode,
            image: new.image,
            tags: new.tags,
            agenda: new.agenda,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Checks a candidate against the slug grammar `^[a-z0-9]+(-[a-z0-9]+)*$`.
pub fn is_valid_slug(candidate: &str) -> bool {
    SLUG_RE.is_match(candidate)
}

/// Derives a slug from a title: lowercase, alphanumeric runs joined by
/// single dashes. May return an empty string for titles with no
/// alphanumeric content.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// The last six hex characters of an ObjectId, used to disambiguate
/// colliding slugs.
pub fn id_suffix(id: &ObjectId) -> String {
    let hex = id.to_hex();
    hex[hex.len() - 6..].to_string()
}

pub fn suffixed_slug(base: &str, id: &ObjectId) -> String {
    format!("{}-{}", base, id_suffix(id))
}

/// Normalizes a free-text mode to one of the three enumerated tokens by
/// case-insensitive substring match, hybrid winning over online over
/// offline. Inputs matching none are kept verbatim.
pub fn normalize_mode(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    if lowered.contains("hybrid") {
        "hybrid".to_string()
    } else if lowered.contains("online") {
        "online".to_string()
    } else if lowered.contains("offline") {
        "offline".to_string()
    } else {
        raw.to_string()
    }
}
