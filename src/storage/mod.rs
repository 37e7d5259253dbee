pub mod memory;
pub mod postgres;

pub use memory::{InMemoryStore, StoreState};
pub use postgres::PostgresStore;
