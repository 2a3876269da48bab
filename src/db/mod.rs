pub mod connection;
pub mod memory;
pub mod mongo;
pub mod store;

pub use connection::{ConnectionManager, Connector, MongoConnector};
pub use memory::MemoryEventStore;
pub use mongo::MongoEventStore;
pub use store::EventStore;
