use std::env;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_PORT: u16 = 3001;

/// Environment-backed configuration, loaded once at startup.
///
/// The connection string is kept as an `Option` on purpose: its absence is
/// reported lazily, as a `ConfigurationError` on the first request that needs
/// the database, not as a startup panic.
pub struct Config {
    pub port: u16,
    pub mongodb_uri: Option<String>,
    pub cloudinary_cloud_name: String,
    pub cloudinary_api_key: String,
    pub cloudinary_api_secret: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            mongodb_uri: env::var("MONGODB_URI")
                .ok()
                .filter(|uri| !uri.trim().is_empty()),
            cloudinary_cloud_name: env::var("CLOUDINARY_CLOUD_NAME").unwrap_or_default(),
            cloudinary_api_key: env::var("CLOUDINARY_API_KEY").unwrap_or_default(),
            cloudinary_api_secret: env::var("CLOUDINARY_API_SECRET").unwrap_or_default(),
        }
    }
}
