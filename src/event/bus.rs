use tokio::sync::broadcast;
use tracing::debug;

use super::events::{LeagueEnvelope, LeagueEvent};
use crate::shared::LeagueId;

/// Event bus for distributing league events throughout the application
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<LeagueEnvelope>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emits an event to every subscriber
    pub fn emit(&self, league_id: LeagueId, event: LeagueEvent) {
        let event_type = event.event_type();
        match self.sender.send(LeagueEnvelope { league_id, event }) {
            Ok(receivers) => {
                debug!(league_id, event_type, receivers, "League event emitted");
            }
            Err(_) => {
                debug!(league_id, event_type, "League event emitted with no receivers");
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LeagueEnvelope> {
        self.sender.subscribe()
    }
}
