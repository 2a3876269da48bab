use async_trait::async_trait;
use bytes::Bytes;

pub mod cloudinary;
pub mod memory;

pub use cloudinary::CloudinaryStore;
pub use memory::MemoryMediaStore;

/// Namespace all uploads land under at the media host.
pub const UPLOAD_FOLDER: &str = "devEvent";

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("media host credentials are not configured")]
    Credentials,
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("upload rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("malformed upload response: {0}")]
    MalformedResponse(String),
    #[error("upload refused: {0}")]
    Refused(String),
}

/// An image file pulled out of a multipart form, not yet uploaded.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Outbound seam to the external media host. Returns the absolute URL of
/// the stored asset.
#[async_trait]
pub trait MediaStore: Send + Sync + 'static {
    async fn upload_image(&self, image: ImageUpload) -> Result<String, MediaError>;
}
