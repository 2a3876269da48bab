use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ImageUpload, MediaError, MediaStore, UPLOAD_FOLDER};

/// Recording media host for tests: hands out fake URLs and can be switched
/// into a failing state to exercise the no-partial-write guarantee.
#[derive(Default)]
pub struct MemoryMediaStore {
    uploads: RwLock<Vec<ImageUpload>>,
    next_id: AtomicU64,
    failing: AtomicBool,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn upload_count(&self) -> usize {
        self.uploads.read().await.len()
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn upload_image(&self, image: ImageUpload) -> Result<String, MediaError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MediaError::Refused("media host unavailable".to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.uploads.write().await.push(image);
        Ok(format!("https://media.test/{UPLOAD_FOLDER}/{id}.png"))
    }
}
