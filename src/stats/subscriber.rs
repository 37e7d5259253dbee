use async_trait::async_trait;
use std::sync::Arc;
use tracing::error;

use super::service::StatsService;
use crate::event::{EventBus, LeagueEvent, LeagueEventError, LeagueEventHandler};
use crate::shared::LeagueId;

/// Keeps the stats cache in step with committed writes
pub struct StatsLeagueSubscriber {
    stats_service: Arc<StatsService>,
    event_bus: EventBus,
}

impl StatsLeagueSubscriber {
    pub fn new(stats_service: Arc<StatsService>, event_bus: EventBus) -> Self {
        Self {
            stats_service,
            event_bus,
        }
    }
}

#[async_trait]
impl LeagueEventHandler for StatsLeagueSubscriber {
    async fn handle_league_event(
        &self,
        league_id: LeagueId,
        event: LeagueEvent,
    ) -> Result<(), LeagueEventError> {
        match event {
            LeagueEvent::MatchCompleted { match_id } => {
                match self.stats_service.refresh_league(league_id).await {
                    Ok(_) => self.event_bus.emit(league_id, LeagueEvent::StandingsRefreshed),
                    Err(err) => {
                        error!(?err, league_id, match_id, "Failed to refresh league stats");
                        return Err(LeagueEventError::HandlerError(err.to_string()));
                    }
                }
            }
            LeagueEvent::MatchScored { .. }
            | LeagueEvent::DraftCompleted { .. }
            | LeagueEvent::TradeClosed { .. } => {
                self.stats_service.invalidate_league(league_id).await;
            }
            LeagueEvent::StandingsRefreshed => {}
        }

        Ok(())
    }

    fn handler_name(&self) -> &'static str {
        "StatsLeagueSubscriber"
    }
}
