use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::shared::{LeagueId, PlayerId, SquadId, TradeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum TradeStatus {
    Pending,
    Accepted,
    Rejected,
    Closed,
}

/// Player swap proposed by `initiator_id` to `receiver_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FantasyTrade {
    pub id: TradeId,
    pub league_id: LeagueId,
    pub initiator_id: SquadId,
    pub receiver_id: SquadId,
    /// Leaves the initiator, joins the receiver
    pub players_given: Vec<PlayerId>,
    /// Leaves the receiver, joins the initiator
    pub players_received: Vec<PlayerId>,
    pub status: TradeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FantasyTrade {
    pub fn players(&self) -> impl Iterator<Item = &PlayerId> {
        self.players_given.iter().chain(self.players_received.iter())
    }

    pub fn shares_player_with(&self, other: &FantasyTrade) -> bool {
        self.players().any(|p| other.players().any(|q| p == q))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTrade {
    pub league_id: LeagueId,
    pub initiator_id: SquadId,
    pub receiver_id: SquadId,
    pub players_given: Vec<PlayerId>,
    pub players_received: Vec<PlayerId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDecision {
    Accept,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionOutcome {
    pub trade: FantasyTrade,
    pub conflicts_resolved: Vec<TradeId>,
    pub deferred: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessReport {
    pub processed: Vec<TradeId>,
    pub deferred: Vec<TradeId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(id: TradeId, given: Vec<PlayerId>, received: Vec<PlayerId>) -> FantasyTrade {
        let now = Utc::now();
        FantasyTrade {
            id,
            league_id: 1,
            initiator_id: 1,
            receiver_id: 2,
            players_given: given,
            players_received: received,
            status: TradeStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn overlap_checks_both_sides() {
        let t1 = trade(1, vec![10, 11], vec![20]);
        let t2 = trade(2, vec![30], vec![11]);
        let t3 = trade(3, vec![40], vec![41]);

        assert!(t1.shares_player_with(&t2));
        assert!(!t1.shares_player_with(&t3));
    }
}
