use axum::extract::multipart::Multipart;
use bytes::Bytes;

use crate::media::ImageUpload;
use crate::utils::error::AppError;

/// Create submission: every scalar is required, exactly one non-empty
/// image file, tags and agenda in submitted order.
#[derive(Debug)]
pub struct CreateEventForm {
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
    pub tags: Vec<String>,
    pub agenda: Vec<String>,
    pub image: ImageUpload,
}

/// Update submission: everything optional. `tags`/`agenda` being `Some`
/// means the field appeared in the form and replaces the stored sequence;
/// an absent or zero-length image part means "keep the stored image".
#[derive(Debug, Default)]
pub struct UpdateEventForm {
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
    pub tags: Option<Vec<String>>,
    pub agenda: Option<Vec<String>>,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Default)]
struct RawForm {
    title: Option<String>,
    overview: Option<String>,
    description: Option<String>,
    organizer: Option<String>,
    audience: Option<String>,
    venue: Option<String>,
    location: Option<String>,
    date: Option<String>,
    time: Option<String>,
    mode: Option<String>,
    tags: Option<Vec<String>>,
    agenda: Option<Vec<String>>,
    image: Option<ImageUpload>,
}

/// Drains the multipart stream into typed fields, rejecting unknown field
/// names early.
async fn collect_fields(mut multipart: Multipart) -> Result<RawForm, AppError> {
    let mut raw = RawForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart form: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            return Err(AppError::Validation(
                "Form fields must be named.".to_string(),
            ));
        };

        match name.as_str() {
            "image" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes: Bytes = field.bytes().await.map_err(|e| {
                    AppError::Validation(format!("Could not read image field: {e}"))
                })?;
                raw.image = Some(ImageUpload {
                    filename,
                    content_type,
                    bytes,
                });
            }
            "tags" => {
                let value = text_value(field, &name).await?;
                raw.tags.get_or_insert_with(Vec::new).push(value);
            }
            "agenda" => {
                let value = text_value(field, &name).await?;
                raw.agenda.get_or_insert_with(Vec::new).push(value);
            }
            "title" => raw.title = Some(text_value(field, &name).await?),
            "overview" => raw.overview = Some(text_value(field, &name).await?),
            "description" => raw.description = Some(text_value(field, &name).await?),
            "organizer" => raw.organizer = Some(text_value(field, &name).await?),
            "audience" => raw.audience = Some(text_value(field, &name).await?),
            "venue" => raw.venue = Some(text_value(field, &name).await?),
            "location" => raw.location = Some(text_value(field, &name).await?),
            "date" => raw.date = Some(text_value(field, &name).await?),
            "time" => raw.time = Some(text_value(field, &name).await?),
            "mode" => raw.mode = Some(text_value(field, &name).await?),
            other => {
                return Err(AppError::Validation(format!(
                    "Unexpected form field '{other}'."
                )));
            }
        }
    }

    Ok(raw)
}

async fn text_value(
    field: axum::extract::multipart::Field<'_>,
    name: &str,
) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Field '{name}' must be text: {e}")))
}

fn require(value: Option<String>, name: &str) -> Result<String, AppError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::Validation(format!("Field '{name}' is required."))),
    }
}

pub async fn parse_create(multipart: Multipart) -> Result<CreateEventForm, AppError> {
    let raw = collect_fields(multipart).await?;

    let image = match raw.image {
        Some(image) if !image.bytes.is_empty() => image,
        _ => return Err(AppError::Validation("Image file is required".to_string())),
    };

    Ok(CreateEventForm {
        title: require(raw.title, "title")?,
        overview: require(raw.overview, "overview")?,
        description: require(raw.description, "description")?,
        organizer: require(raw.organizer, "organizer")?,
        audience: require(raw.audience, "audience")?,
        venue: require(raw.venue, "venue")?,
        location: require(raw.location, "location")?,
        date: require(raw.date, "date")?,
        time: require(raw.time, "time")?,
        mode: require(raw.mode, "mode")?,
        tags: raw.tags.unwrap_or_default(),
        agenda: raw.agenda.unwrap_or_default(),
        image,
    })
}

pub async fn parse_update(multipart: Multipart) -> Result<UpdateEventForm, AppError> {
    let raw = collect_fields(multipart).await?;

    Ok(UpdateEventForm {
        title: raw.title,
        overview: raw.overview,
        description: raw.description,
        organizer: raw.organizer,
        audience: raw.audience,
        venue: raw.venue,
        location: raw.location,
        date: raw.date,
        time: raw.time,
        mode: raw.mode,
        tags: raw.tags,
        agenda: raw.agenda,
        // A zero-length file part counts as "no new image".
        image: raw.image.filter(|image| !image.bytes.is_empty()),
    })
}
