use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use devevent_server::config::Config;
use devevent_server::db::{ConnectionManager, MongoConnector, MongoEventStore};
use devevent_server::media::CloudinaryStore;
use devevent_server::routes::create_routes;
use devevent_server::state::AppState;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("devevent_server=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env();

    // The database connection is lazy: nothing connects until the first
    // request needs it, and a missing MONGODB_URI surfaces there.
    let manager = ConnectionManager::new(config.mongodb_uri.clone(), Arc::new(MongoConnector));

    let media = CloudinaryStore::new(
        config.cloudinary_cloud_name.clone(),
        config.cloudinary_api_key.clone(),
        config.cloudinary_api_secret.clone(),
    )
    .expect("Failed to build media host client");

    let state = AppState {
        events: Arc::new(MongoEventStore::new(manager)),
        media: Arc::new(media),
    };

    let app: Router = create_routes(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
