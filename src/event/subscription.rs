use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{bus::EventBus, handler::LeagueEventHandler};

/// Routes every event on the bus to one handler from a background task
pub struct EventSubscription {
    handler: Arc<dyn LeagueEventHandler>,
    event_bus: EventBus,
}

impl EventSubscription {
    pub fn new(handler: Arc<dyn LeagueEventHandler>, event_bus: EventBus) -> Self {
        Self { handler, event_bus }
    }

    /// Start the subscription - spawns a background task that listens to
    /// league events and routes them to the handler
    pub fn start(self) -> JoinHandle<()> {
        let handler_name = self.handler.handler_name();
        let mut receiver = self.event_bus.subscribe();

        info!(handler = handler_name, "Starting league event subscription");

        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(envelope) => {
                        let event_type = envelope.event.event_type();
                        if let Err(e) = self
                            .handler
                            .handle_league_event(envelope.league_id, envelope.event)
                            .await
                        {
                            warn!(
                                league_id = envelope.league_id,
                                handler = handler_name,
                                event_type,
                                error = %e,
                                "League event handler failed"
                            );
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(handler = handler_name, skipped, "Subscription lagged behind the bus");
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            warn!(handler = handler_name, "League event subscription ended");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{LeagueEvent, LeagueEventError};
    use crate::shared::LeagueId;
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    struct Forwarder {
        sender: mpsc::UnboundedSender<(LeagueId, LeagueEvent)>,
    }

    #[async_trait]
    impl LeagueEventHandler for Forwarder {
        async fn handle_league_event(
            &self,
            league_id: LeagueId,
            event: LeagueEvent,
        ) -> Result<(), LeagueEventError> {
            self.sender
                .send((league_id, event))
                .map_err(|e| LeagueEventError::HandlerError(e.to_string()))
        }

        fn handler_name(&self) -> &'static str {
            "Forwarder"
        }
    }

    #[tokio::test]
    async fn routes_events_to_handler() {
        let bus = EventBus::new(16);
        let (sender, mut received) = mpsc::unbounded_channel();
        let _handle = EventSubscription::new(Arc::new(Forwarder { sender }), bus.clone()).start();

        bus.emit(4, LeagueEvent::TradeClosed { trade_id: 9 });

        let (league_id, event) = received.recv().await.unwrap();
        assert_eq!(league_id, 4);
        assert_eq!(event, LeagueEvent::TradeClosed { trade_id: 9 });
    }
}
