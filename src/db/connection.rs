use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use tokio::sync::Mutex;

use crate::models::booking::Booking;
use crate::models::event::Event;
use crate::utils::error::AppError;

const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_IDLE_TIME: Duration = Duration::from_secs(45);
const MAX_POOL_SIZE: u32 = 10;

const DEFAULT_DATABASE: &str = "devevent";

/// The establishment backend. Split out so the single-flight discipline in
/// [`ConnectionManager`] can be exercised without a running database.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Establishes a session and prepares collections.
    async fn establish(&self, uri: &str) -> Result<Database, AppError>;

    /// Liveness probe for a cached session.
    async fn is_live(&self, database: &Database) -> bool;
}

/// Production connector: parses the URI, applies the bounded timeouts,
/// verifies the deployment with a ping and ensures collection indexes.
pub struct MongoConnector;

#[async_trait]
impl Connector for MongoConnector {
    #[tracing::instrument(skip_all, name = "MongoConnector::establish", err)]
    async fn establish(&self, uri: &str) -> Result<Database, AppError> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| AppError::Connection(format!("invalid connection string: {e}")))?;
        options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);
        options.connect_timeout = Some(CONNECT_TIMEOUT);
        options.max_idle_time = Some(MAX_IDLE_TIME);
        options.max_pool_size = Some(MAX_POOL_SIZE);

        let name = options
            .default_database
            .clone()
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        let client = Client::with_options(options)
            .map_err(|e| AppError::Connection(format!("client setup failed: {e}")))?;
        let database = client.database(&name);

        // The driver connects lazily; force a round trip so failures surface
        // here instead of on the first query.
        database
            .run_command(bson::doc! { "ping": 1 }, None)
            .await
            .map_err(|e| AppError::Connection(format!("database unreachable: {e}")))?;

        Event::setup_collection(&database)
            .await
            .map_err(|e| AppError::Connection(format!("events index setup failed: {e}")))?;
        Booking::setup_collection(&database)
            .await
            .map_err(|e| AppError::Connection(format!("bookings index setup failed: {e}")))?;

        tracing::info!(database = %name, "connected to MongoDB");
        Ok(database)
    }

    async fn is_live(&self, database: &Database) -> bool {
        database
            .run_command(bson::doc! { "ping": 1 }, None)
            .await
            .is_ok()
    }
}

type Establishment = Shared<BoxFuture<'static, Result<Database, String>>>;

#[derive(Default)]
struct Slot {
    ready: Option<Database>,
    in_flight: Option<Establishment>,
}

/// Lazily established, process-wide database handle with single-flight
/// semantics: concurrent first callers share one establishment attempt
/// instead of each opening their own session.
///
/// Owned by startup and injected into handlers through application state;
/// nothing else mutates the slot.
pub struct ConnectionManager {
    uri: Option<String>,
    connector: Arc<dyn Connector>,
    slot: Arc<Mutex<Slot>>,
}

impl ConnectionManager {
    pub fn new(uri: Option<String>, connector: Arc<dyn Connector>) -> Self {
        Self {
            uri,
            connector,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    /// Returns the shared session, establishing it first if necessary.
    ///
    /// A cached session is re-validated before being returned; a dead one is
    /// dropped and establishment restarts. Establishment failures clear the
    /// slot entirely so the next call retries from scratch, and the error is
    /// propagated to every caller that awaited the attempt.
    pub async fn acquire(&self) -> Result<Database, AppError> {
        loop {
            enum Step {
                Ready(Database),
                Wait(Establishment),
            }

            let step = {
                let mut slot = self.slot.lock().await;
                if let Some(database) = slot.ready.clone() {
                    Step::Ready(database)
                } else if let Some(attempt) = slot.in_flight.clone() {
                    Step::Wait(attempt)
                } else {
                    Step::Wait(self.start_establishment(&mut slot)?)
                }
            };

            match step {
                Step::Ready(database) => {
                    // Probe outside the lock; a dead session is treated as
                    // "no connection".
                    if self.connector.is_live(&database).await {
                        return Ok(database);
                    }
                    tracing::warn!("cached database session is no longer live, reconnecting");
                    let mut slot = self.slot.lock().await;
                    slot.ready = None;
                }
                Step::Wait(attempt) => {
                    let outcome = attempt.clone().await;

                    // Record the outcome promptly instead of relying on the
                    // detached recorder, which may not have run yet.
                    let mut slot = self.slot.lock().await;
                    let current = slot
                        .in_flight
                        .as_ref()
                        .is_some_and(|inflight| Shared::ptr_eq(inflight, &attempt));
                    if current {
                        slot.in_flight = None;
                        slot.ready = outcome.clone().ok();
                    }
                    drop(slot);

                    return outcome.map_err(AppError::Connection);
                }
            }
        }
    }

    fn start_establishment(&self, slot: &mut Slot) -> Result<Establishment, AppError> {
        let uri = self.uri.clone().ok_or_else(|| {
            AppError::Configuration(
                "MONGODB_URI environment variable is not set".to_string(),
            )
        })?;

        let connector = self.connector.clone();
        let attempt: Establishment = async move {
            connector
                .establish(&uri)
                .await
                .map_err(|e| e.to_string())
        }
        .boxed()
        .shared();

        slot.in_flight = Some(attempt.clone());

        // A detached task records the outcome so it lands in the slot even
        // if every awaiting request is cancelled mid-establishment.
        tokio::spawn({
            let slot = self.slot.clone();
            let attempt = attempt.clone();
            async move {
                let outcome = attempt.clone().await;
                let mut slot = slot.lock().await;
                let current = slot
                    .in_flight
                    .as_ref()
                    .is_some_and(|inflight| Shared::ptr_eq(inflight, &attempt));
                if current {
                    slot.in_flight = None;
                    slot.ready = outcome.ok();
                }
            }
        });

        Ok(attempt)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;

    /// Connector that never touches the network: the driver only connects
    /// on the first operation, so building a handle is free.
    struct CountingConnector {
        establish_calls: AtomicUsize,
        fail: AtomicBool,
        live: AtomicBool,
    }

    impl CountingConnector {
        fn new() -> Self {
            Self {
                establish_calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                live: AtomicBool::new(true),
            }
        }

        fn calls(&self) -> usize {
            self.establish_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Connector for CountingConnector {
        async fn establish(&self, _uri: &str) -> Result<Database, AppError> {
            self.establish_calls.fetch_add(1, Ordering::SeqCst);
            // Yield so concurrent acquires pile onto the in-flight attempt.
            tokio::time::sleep(Duration::from_millis(20)).await;

            if self.fail.load(Ordering::SeqCst) {
                return Err(AppError::Connection("refused".to_string()));
            }

            let client = Client::with_uri_str("mongodb://127.0.0.1:27017")
                .await
                .unwrap();
            Ok(client.database("test"))
        }

        async fn is_live(&self, _database: &Database) -> bool {
            self.live.load(Ordering::SeqCst)
        }
    }

    fn manager(connector: Arc<CountingConnector>) -> ConnectionManager {
        ConnectionManager::new(Some("mongodb://127.0.0.1:27017".to_string()), connector)
    }

    #[tokio::test]
    async fn missing_uri_is_a_configuration_error() {
        let manager = ConnectionManager::new(None, Arc::new(CountingConnector::new()));
        let err = manager.acquire().await.unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[tokio::test]
    async fn concurrent_first_acquires_share_one_attempt() {
        let connector = Arc::new(CountingConnector::new());
        let manager = Arc::new(manager(connector.clone()));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.acquire().await })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }
        assert_eq!(connector.calls(), 1);
    }

    #[tokio::test]
    async fn ready_session_is_reused_without_new_work() {
        let connector = Arc::new(CountingConnector::new());
        let manager = manager(connector.clone());

        manager.acquire().await.unwrap();
        manager.acquire().await.unwrap();
        manager.acquire().await.unwrap();

        assert_eq!(connector.calls(), 1);
    }

    #[tokio::test]
    async fn failure_propagates_to_all_waiters_and_clears_the_slot() {
        let connector = Arc::new(CountingConnector::new());
        connector.fail.store(true, Ordering::SeqCst);
        let manager = Arc::new(manager(connector.clone()));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.acquire().await })
            })
            .collect();

        for task in tasks {
            let err = task.await.unwrap().unwrap_err();
            assert!(matches!(err, AppError::Connection(_)));
        }
        assert_eq!(connector.calls(), 1);

        // Next call retries from scratch and succeeds.
        connector.fail.store(false, Ordering::SeqCst);
        assert!(manager.acquire().await.is_ok());
        assert_eq!(connector.calls(), 2);
    }

    #[tokio::test]
    async fn dead_cached_session_triggers_reestablishment() {
        let connector = Arc::new(CountingConnector::new());
        let manager = manager(connector.clone());

        manager.acquire().await.unwrap();
        assert_eq!(connector.calls(), 1);

        // Kill the cached session; the next acquire must reconnect. The
        // fresh session is returned straight from the attempt, unprobed.
        connector.live.store(false, Ordering::SeqCst);
        manager.acquire().await.unwrap();
        assert_eq!(connector.calls(), 2);
    }
}
