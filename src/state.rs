use std::sync::Arc;

use crate::db::EventStore;
use crate::media::MediaStore;

/// Shared application state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub events: Arc<dyn EventStore>,
    pub media: Arc<dyn MediaStore>,
}
