pub mod connection;
pub mod directory;
pub mod matches;
pub mod memory;
pub mod messages;
pub mod migrations;
pub mod pg_store;
pub mod store;
pub mod swipes;

pub use connection::{get_db_pool, DatabaseConfig};
pub use memory::MemoryStore;
pub use pg_store::PgStore;
pub use store::{Directory, MatchStore, MessageStore, Store, StoreResult, SwipeLedger};
