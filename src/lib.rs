// Library crate for the fantasy cricket draft and scoring engine
// This file exposes the public API for integration tests

pub mod config;
pub mod draft;
pub mod event;
pub mod league;
pub mod providers;
pub mod routes;
pub mod scoring;
pub mod season;
pub mod shared;
pub mod stats;
pub mod storage;
pub mod trade;

// Re-export commonly used types for easier access in tests
pub use config::AppConfig;
pub use event::{EventBus, EventSubscription, LeagueEvent};
pub use routes::build_router;
pub use shared::{AppError, AppState, AppStateBuilder};
pub use storage::{InMemoryStore, PostgresStore};
