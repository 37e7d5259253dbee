use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::models::{
    DecisionOutcome, FantasyTrade, NewTrade, ProcessReport, TradeDecision, TradeStatus,
};
use super::repository::TradeRepository;
use crate::event::{EventBus, LeagueEvent};
use crate::league::{CoreAssignment, FantasyBoostRole, FantasySquad, LeagueRepository};
use crate::providers::Clock;
use crate::season::{CatalogRepository, MatchStatus, PlayerRole};
use crate::shared::{
    AppError, BoostRoleId, LeagueId, LeagueLocks, PlayerId, SeasonId, SquadId, TradeId,
};

/// Accepts, rejects and processes player swaps between two squads of a league.
///
/// Every roster-changing step runs under the league lock shared with the
/// draft services, so a trade never interleaves with a draft of the same
/// league.
pub struct TradeService {
    catalog: Arc<dyn CatalogRepository>,
    leagues: Arc<dyn LeagueRepository>,
    trades: Arc<dyn TradeRepository>,
    clock: Arc<dyn Clock>,
    league_locks: LeagueLocks,
    event_bus: EventBus,
}

impl TradeService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        leagues: Arc<dyn LeagueRepository>,
        trades: Arc<dyn TradeRepository>,
        clock: Arc<dyn Clock>,
        league_locks: LeagueLocks,
        event_bus: EventBus,
    ) -> Self {
        Self {
            catalog,
            leagues,
            trades,
            clock,
            league_locks,
            event_bus,
        }
    }

    #[instrument(skip(self, request), fields(league_id = request.league_id))]
    pub async fn propose_trade(&self, request: NewTrade) -> Result<FantasyTrade, AppError> {
        if request.initiator_id == request.receiver_id {
            return Err(AppError::BadRequest(
                "A squad cannot trade with itself".to_string(),
            ));
        }
        if request.players_given.is_empty() && request.players_received.is_empty() {
            return Err(AppError::BadRequest("Trade moves no players".to_string()));
        }
        let distinct: BTreeSet<PlayerId> = request
            .players_given
            .iter()
            .chain(request.players_received.iter())
            .copied()
            .collect();
        if distinct.len() != request.players_given.len() + request.players_received.len() {
            return Err(AppError::BadRequest(
                "A player appears more than once in the trade".to_string(),
            ));
        }

        let initiator = self.league_squad(request.league_id, request.initiator_id).await?;
        let receiver = self.league_squad(request.league_id, request.receiver_id).await?;
        if let Some(p) = request.players_given.iter().find(|p| !initiator.owns(**p)) {
            return Err(AppError::BadRequest(format!(
                "Player {} is not in squad {}",
                p, initiator.id
            )));
        }
        if let Some(p) = request.players_received.iter().find(|p| !receiver.owns(**p)) {
            return Err(AppError::BadRequest(format!(
                "Player {} is not in squad {}",
                p, receiver.id
            )));
        }

        let now = self.clock.now();
        let trade = self
            .trades
            .create_trade(FantasyTrade {
                id: 0,
                league_id: request.league_id,
                initiator_id: request.initiator_id,
                receiver_id: request.receiver_id,
                players_given: request.players_given,
                players_received: request.players_received,
                status: TradeStatus::Pending,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(trade_id = trade.id, "Trade proposed");
        Ok(trade)
    }

    /// Applies the receiver's decision. Accepting rejects every other pending
    /// trade of the league that shares a player, then processes the trade
    /// unless a match of the season is live.
    #[instrument(skip(self))]
    pub async fn decide(
        &self,
        trade_id: TradeId,
        decision: TradeDecision,
    ) -> Result<DecisionOutcome, AppError> {
        let trade = self.load_trade(trade_id).await?;
        let _guard = self.league_locks.acquire(trade.league_id).await;
        let trade = self.load_trade(trade_id).await?;
        let now = self.clock.now();

        if decision == TradeDecision::Reject {
            let trade = self.trades.reject_trade(trade_id, now).await?;
            info!(trade_id, "Trade rejected");
            return Ok(DecisionOutcome {
                trade,
                conflicts_resolved: Vec::new(),
                deferred: false,
            });
        }

        let conflicts: Vec<TradeId> = self
            .trades
            .list_trades(trade.league_id, Some(TradeStatus::Pending))
            .await?
            .iter()
            .filter(|other| other.id != trade.id && other.shares_player_with(&trade))
            .map(|other| other.id)
            .collect();

        let accepted = self.trades.accept_trade(trade_id, &conflicts, now).await?;
        info!(trade_id, conflicts = ?conflicts, "Trade accepted");

        let season_id = self.league_season(trade.league_id).await?;
        if self.has_live_match(season_id).await? {
            info!(trade_id, season_id, "Live match in progress, trade processing deferred");
            return Ok(DecisionOutcome {
                trade: accepted,
                conflicts_resolved: conflicts,
                deferred: true,
            });
        }

        let closed = self.process_locked(accepted).await?;
        Ok(DecisionOutcome {
            trade: closed,
            conflicts_resolved: conflicts,
            deferred: false,
        })
    }

    /// Processes one accepted trade; a closed trade is returned unchanged
    #[instrument(skip(self))]
    pub async fn process_trade(&self, trade_id: TradeId) -> Result<FantasyTrade, AppError> {
        let trade = self.load_trade(trade_id).await?;
        let _guard = self.league_locks.acquire(trade.league_id).await;
        let trade = self.load_trade(trade_id).await?;

        let season_id = self.league_season(trade.league_id).await?;
        if trade.status == TradeStatus::Accepted && self.has_live_match(season_id).await? {
            return Err(AppError::LiveMatchBlocked(format!(
                "Season {} has a live match",
                season_id
            )));
        }
        self.process_locked(trade).await
    }

    /// Batch entry for the deferred processor: every accepted trade in the
    /// season's leagues, in trade id order, once no match is live
    #[instrument(skip(self))]
    pub async fn process_ready_trades(&self, season_id: SeasonId) -> Result<ProcessReport, AppError> {
        let leagues = self.leagues.list_leagues(season_id).await?;
        let mut report = ProcessReport::default();

        let live = self.has_live_match(season_id).await?;
        for league in leagues {
            let accepted = self
                .trades
                .list_trades(league.id, Some(TradeStatus::Accepted))
                .await?;
            if accepted.is_empty() {
                continue;
            }
            if live {
                report.deferred.extend(accepted.iter().map(|t| t.id));
                continue;
            }

            let _guard = self.league_locks.acquire(league.id).await;
            for trade in accepted {
                let trade_id = trade.id;
                let current = self.load_trade(trade_id).await?;
                match self.process_locked(current).await {
                    Ok(_) => report.processed.push(trade_id),
                    Err(e) => {
                        warn!(trade_id, error = %e, "Deferred trade could not be processed");
                        report.deferred.push(trade_id);
                    }
                }
            }
        }

        if !report.processed.is_empty() || !report.deferred.is_empty() {
            info!(
                season_id,
                processed = report.processed.len(),
                deferred = report.deferred.len(),
                "Ready trades processed"
            );
        }
        Ok(report)
    }

    /// Caller holds the league lock
    async fn process_locked(&self, trade: FantasyTrade) -> Result<FantasyTrade, AppError> {
        match trade.status {
            TradeStatus::Closed => {
                debug!(trade_id = trade.id, "Trade already closed");
                return Ok(trade);
            }
            TradeStatus::Accepted => {}
            status => {
                return Err(AppError::Conflict(format!(
                    "Trade {} is {} and cannot be processed",
                    trade.id, status
                )));
            }
        }

        let mut initiator = self.league_squad(trade.league_id, trade.initiator_id).await?;
        let mut receiver = self.league_squad(trade.league_id, trade.receiver_id).await?;

        let player_ids: Vec<PlayerId> = trade.players().copied().collect();
        let roles: HashMap<PlayerId, PlayerRole> = self
            .catalog
            .get_players(&player_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p.role))
            .collect();
        let boost_roles: HashMap<BoostRoleId, FantasyBoostRole> = self
            .leagues
            .list_boost_roles()
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();

        swap_players(&trade, &mut initiator, &mut receiver, &roles, &boost_roles);

        let closed = self
            .trades
            .close_trade(trade.id, &[initiator, receiver], self.clock.now())
            .await?;

        self.event_bus.emit(
            trade.league_id,
            LeagueEvent::TradeClosed { trade_id: trade.id },
        );
        info!(trade_id = trade.id, league_id = trade.league_id, "Trade processed");
        Ok(closed)
    }

    async fn load_trade(&self, trade_id: TradeId) -> Result<FantasyTrade, AppError> {
        self.trades
            .get_trade(trade_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Trade {} not found", trade_id)))
    }

    async fn league_squad(
        &self,
        league_id: LeagueId,
        squad_id: SquadId,
    ) -> Result<FantasySquad, AppError> {
        let squad = self
            .leagues
            .get_squad(squad_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Squad {} not found", squad_id)))?;
        if squad.league_id != league_id {
            return Err(AppError::BadRequest(format!(
                "Squad {} does not belong to league {}",
                squad_id, league_id
            )));
        }
        Ok(squad)
    }

    async fn league_season(&self, league_id: LeagueId) -> Result<SeasonId, AppError> {
        self.leagues
            .get_league(league_id)
            .await?
            .map(|league| league.season_id)
            .ok_or_else(|| AppError::NotFound(format!("League {} not found", league_id)))
    }

    async fn has_live_match(&self, season_id: SeasonId) -> Result<bool, AppError> {
        Ok(self
            .catalog
            .list_matches(season_id)
            .await?
            .iter()
            .any(|m| m.status == MatchStatus::Live))
    }
}

/// Moves the traded players that are still owned by their source squad and
/// hands any boost role they carried to a compatible incoming player
pub fn swap_players(
    trade: &FantasyTrade,
    initiator: &mut FantasySquad,
    receiver: &mut FantasySquad,
    roles: &HashMap<PlayerId, PlayerRole>,
    boost_roles: &HashMap<BoostRoleId, FantasyBoostRole>,
) {
    let to_initiator = move_players(receiver, initiator, &trade.players_received);
    let to_receiver = move_players(initiator, receiver, &trade.players_given);

    for (squad, outgoing, incoming) in [
        (initiator, &to_receiver, &to_initiator),
        (receiver, &to_initiator, &to_receiver),
    ] {
        reassign_boosts(&mut squad.current_core_squad, outgoing, incoming, roles, boost_roles);
        reassign_boosts(&mut squad.future_core_squad, outgoing, incoming, roles, boost_roles);
    }
}

fn move_players(
    from: &mut FantasySquad,
    to: &mut FantasySquad,
    players: &[PlayerId],
) -> Vec<PlayerId> {
    let mut moved = Vec::new();
    for player_id in players {
        if !from.owns(*player_id) {
            continue;
        }
        from.current_squad.retain(|p| p != player_id);
        if !to.owns(*player_id) {
            to.current_squad.push(*player_id);
        }
        moved.push(*player_id);
    }
    moved
}

fn reassign_boosts(
    assignments: &mut Vec<CoreAssignment>,
    outgoing: &[PlayerId],
    incoming: &[PlayerId],
    roles: &HashMap<PlayerId, PlayerRole>,
    boost_roles: &HashMap<BoostRoleId, FantasyBoostRole>,
) {
    let mut result: Vec<CoreAssignment> = assignments
        .iter()
        .filter(|a| !outgoing.contains(&a.player_id))
        .copied()
        .collect();

    for vacated in assignments.iter().filter(|a| outgoing.contains(&a.player_id)) {
        let replacement = incoming.iter().find(|candidate| {
            let accepted = match (boost_roles.get(&vacated.boost_role_id), roles.get(*candidate)) {
                (Some(boost), Some(role)) => boost.accepts(*role),
                _ => false,
            };
            accepted && !result.iter().any(|a| a.player_id == **candidate)
        });
        if let Some(player_id) = replacement {
            result.push(CoreAssignment {
                boost_role_id: vacated.boost_role_id,
                player_id: *player_id,
            });
        }
    }

    *assignments = result;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::BoostMultipliers;
    use chrono::Utc;

    fn squad(id: SquadId, players: Vec<PlayerId>, core: Vec<CoreAssignment>) -> FantasySquad {
        FantasySquad {
            id,
            league_id: 1,
            user_id: id,
            name: format!("Squad {}", id),
            current_squad: players,
            current_core_squad: core.clone(),
            future_core_squad: core,
            total_points: 0.0,
            version: 0,
        }
    }

    fn trade(given: Vec<PlayerId>, received: Vec<PlayerId>) -> FantasyTrade {
        let now = Utc::now();
        FantasyTrade {
            id: 9,
            league_id: 1,
            initiator_id: 1,
            receiver_id: 2,
            players_given: given,
            players_received: received,
            status: TradeStatus::Accepted,
            created_at: now,
            updated_at: now,
        }
    }

    fn keeper_boost() -> HashMap<BoostRoleId, FantasyBoostRole> {
        HashMap::from([(
            7,
            FantasyBoostRole {
                id: 7,
                label: "Keeper".to_string(),
                multipliers: BoostMultipliers::default(),
                allowed_player_roles: vec![PlayerRole::Wk],
            },
        )])
    }

    #[test]
    fn players_move_and_boost_follows_compatible_player() {
        let mut a = squad(1, vec![10, 11], vec![CoreAssignment { boost_role_id: 7, player_id: 10 }]);
        let mut b = squad(2, vec![20, 21], vec![]);
        let roles = HashMap::from([
            (10, PlayerRole::Wk),
            (20, PlayerRole::Bat),
            (21, PlayerRole::Wk),
        ]);

        swap_players(&trade(vec![10], vec![20, 21]), &mut a, &mut b, &roles, &keeper_boost());

        assert_eq!(a.current_squad, vec![11, 20, 21]);
        assert_eq!(b.current_squad, vec![10]);
        assert_eq!(
            a.current_core_squad,
            vec![CoreAssignment { boost_role_id: 7, player_id: 21 }]
        );
        assert_eq!(a.future_core_squad, a.current_core_squad);
    }

    #[test]
    fn boost_is_dropped_without_compatible_replacement() {
        let mut a = squad(1, vec![10], vec![CoreAssignment { boost_role_id: 7, player_id: 10 }]);
        let mut b = squad(2, vec![20], vec![]);
        let roles = HashMap::from([(10, PlayerRole::Wk), (20, PlayerRole::Bowl)]);

        swap_players(&trade(vec![10], vec![20]), &mut a, &mut b, &roles, &keeper_boost());

        assert!(a.current_core_squad.is_empty());
        assert!(a.future_core_squad.is_empty());
    }

    #[test]
    fn players_no_longer_owned_are_skipped() {
        let mut a = squad(1, vec![11], vec![]);
        let mut b = squad(2, vec![20], vec![]);

        swap_players(&trade(vec![10], vec![20]), &mut a, &mut b, &HashMap::new(), &HashMap::new());

        assert_eq!(a.current_squad, vec![11, 20]);
        assert!(b.current_squad.is_empty());
    }
}
