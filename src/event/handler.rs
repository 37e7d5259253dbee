use async_trait::async_trait;
use thiserror::Error;

use super::events::LeagueEvent;
use crate::shared::LeagueId;

/// Errors that can occur when handling league events
#[derive(Debug, Error)]
pub enum LeagueEventError {
    #[error("League not found: {0}")]
    LeagueNotFound(LeagueId),

    #[error("Handler error: {0}")]
    HandlerError(String),
}

/// Trait for components that react to league events
///
/// Handlers run after the unit of work that produced the event has
/// committed, so they only ever observe consistent derived state.
#[async_trait]
pub trait LeagueEventHandler: Send + Sync {
    async fn handle_league_event(
        &self,
        league_id: LeagueId,
        event: LeagueEvent,
    ) -> Result<(), LeagueEventError>;

    /// Get a human-readable name for this handler (for logging/debugging)
    fn handler_name(&self) -> &'static str;
}
