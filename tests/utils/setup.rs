#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use fantasy_cricket::{
    config::AppConfig,
    draft::{DraftWindow, RetentionMode, WindowKind},
    league::{CoreAssignment, FantasyBoostRole, FantasyLeague, FantasySquad},
    providers::{FixedClock, SeededRandomSource},
    scoring::BoostMultipliers,
    season::{
        Match, MatchStage, MatchStatus, Player, PlayerRole, PlayerSeasonTeam, Season,
        SeasonPhase, SeasonStatus, Team,
    },
    shared::{LeagueId, PhaseId, PlayerId, SeasonId},
    AppState, AppStateBuilder,
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

/// Midday on the given day of April 2024
pub fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, d, 12, 0, 0).unwrap()
}

pub struct TestSetup {
    pub state: AppState,
    pub clock: Arc<FixedClock>,
    pub season: Season,
    /// Home side first, then away side
    pub teams: Vec<Team>,
    pub players: HashMap<String, Player>,
}

pub struct TestSetupBuilder {
    players: Vec<(String, PlayerRole, usize)>,
    seed: u64,
    completed_only: bool,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            players: vec![],
            seed: 7,
            completed_only: false,
        }
    }

    /// Registers a player with the home (0) or away (1) team
    pub fn with_player(mut self, name: &str, role: PlayerRole, team: usize) -> Self {
        self.players.push((name.to_string(), role, team));
        self
    }

    /// Twelve players: four batters, two keepers, two all-rounders, four bowlers
    pub fn with_draft_roster(self) -> Self {
        self.with_player("Bat One", PlayerRole::Bat, 0)
            .with_player("Bat Two", PlayerRole::Bat, 1)
            .with_player("Bat Three", PlayerRole::Bat, 0)
            .with_player("Bat Four", PlayerRole::Bat, 1)
            .with_player("Keeper One", PlayerRole::Wk, 0)
            .with_player("Keeper Two", PlayerRole::Wk, 1)
            .with_player("Allrounder One", PlayerRole::All, 0)
            .with_player("Allrounder Two", PlayerRole::All, 1)
            .with_player("Bowler One", PlayerRole::Bowl, 0)
            .with_player("Bowler Two", PlayerRole::Bowl, 1)
            .with_player("Bowler Three", PlayerRole::Bowl, 0)
            .with_player("Bowler Four", PlayerRole::Bowl, 1)
    }

    /// `count` players named "{prefix} 01", "{prefix} 02", ... alternating teams
    pub fn with_numbered_players(mut self, prefix: &str, role: PlayerRole, count: usize) -> Self {
        for n in 1..=count {
            self = self.with_player(&format!("{} {:02}", prefix, n), role, (n - 1) % 2);
        }
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn completed_only(mut self) -> Self {
        self.completed_only = true;
        self
    }

    pub async fn build(self) -> TestSetup {
        let clock = Arc::new(FixedClock::new(day(1)));
        let config = AppConfig {
            running_rank_completed_only: self.completed_only,
            ..AppConfig::default()
        };
        let state = AppStateBuilder::new()
            .with_clock(clock.clone())
            .with_random(Arc::new(SeededRandomSource::new(self.seed)))
            .with_config(config)
            .build_in_memory();

        let season = state
            .catalog
            .create_season(Season {
                id: 0,
                name: "Premier League 2024".to_string(),
                year: 2024,
                status: SeasonStatus::Ongoing,
                default_draft_order: None,
            })
            .await
            .unwrap();

        let mut teams = Vec::new();
        for (name, short_name) in [("Mumbai Indians", "MI"), ("Chennai Super Kings", "CSK")] {
            let team = state
                .catalog
                .create_team(Team {
                    id: 0,
                    name: name.to_string(),
                    short_name: short_name.to_string(),
                })
                .await
                .unwrap();
            teams.push(team);
        }

        let mut players = HashMap::new();
        for (name, role, team) in self.players {
            let player = state
                .catalog
                .create_player(Player {
                    id: 0,
                    name: name.clone(),
                    role,
                })
                .await
                .unwrap();
            state
                .catalog
                .create_player_season_team(PlayerSeasonTeam {
                    id: 0,
                    player_id: player.id,
                    team_id: teams[team].id,
                    season_id: season.id,
                    ruled_out: false,
                    replacement_id: None,
                })
                .await
                .unwrap();
            players.insert(name, player);
        }

        TestSetup {
            state,
            clock,
            season,
            teams,
            players,
        }
    }
}

impl TestSetup {
    pub fn player(&self, name: &str) -> PlayerId {
        self.players[name].id
    }

    pub fn players_named(&self, names: &[&str]) -> Vec<PlayerId> {
        names.iter().map(|name| self.player(name)).collect()
    }

    pub async fn add_match(&self, number: i32, phase: i32, on: DateTime<Utc>) -> Match {
        self.state
            .catalog
            .create_match(Match {
                id: 0,
                season_id: self.season.id,
                external_id: format!("ext-{}", number),
                match_number: number,
                phase,
                stage: MatchStage::League,
                date: on,
                team1_id: self.teams[0].id,
                team2_id: self.teams[1].id,
                status: MatchStatus::Scheduled,
                toss_winner_id: None,
                toss_decision: None,
                winner_id: None,
                innings: vec![],
            })
            .await
            .unwrap()
    }

    pub async fn add_phase(&self, phase: i32, start: DateTime<Utc>, end: DateTime<Utc>) -> SeasonPhase {
        self.state
            .catalog
            .create_phase(SeasonPhase {
                id: 0,
                season_id: self.season.id,
                phase,
                start,
                end,
            })
            .await
            .unwrap()
    }

    pub async fn add_league(&self, name: &str) -> FantasyLeague {
        self.add_league_in(self.season.id, name).await
    }

    pub async fn add_league_in(&self, season_id: SeasonId, name: &str) -> FantasyLeague {
        self.state
            .leagues
            .create_league(FantasyLeague {
                id: 0,
                season_id,
                name: name.to_string(),
                max_squads: 8,
                snake_draft_seed_order: None,
                draft_seed_orders: BTreeMap::new(),
                draft_completed: false,
                mid_season_draft_pool: None,
            })
            .await
            .unwrap()
    }

    pub async fn add_squad(
        &self,
        league_id: LeagueId,
        user_id: i64,
        name: &str,
        roster: Vec<PlayerId>,
        core: Vec<CoreAssignment>,
    ) -> FantasySquad {
        self.state
            .leagues
            .create_squad(FantasySquad {
                id: 0,
                league_id,
                user_id,
                name: name.to_string(),
                current_squad: roster,
                current_core_squad: core.clone(),
                future_core_squad: core,
                total_points: 0.0,
                version: 0,
            })
            .await
            .unwrap()
    }

    pub async fn add_boost_role(&self, label: &str, multiplier: f64) -> FantasyBoostRole {
        self.state
            .leagues
            .create_boost_role(FantasyBoostRole {
                id: 0,
                label: label.to_string(),
                multipliers: BoostMultipliers::uniform(multiplier),
                allowed_player_roles: vec![
                    PlayerRole::Bat,
                    PlayerRole::Bowl,
                    PlayerRole::All,
                    PlayerRole::Wk,
                ],
            })
            .await
            .unwrap()
    }

    /// Mid-season window open on day 10, locking on day 12
    pub async fn add_window(&self, retention_phase_id: Option<PhaseId>) -> DraftWindow {
        self.state
            .drafts
            .create_window(DraftWindow {
                id: 0,
                season_id: self.season.id,
                kind: WindowKind::MidSeason,
                sequence: 1,
                open_at: day(10),
                lock_at: day(12),
                retention_mode: RetentionMode::ManualPhase,
                retention_phase_id,
                draft_pool: None,
                pool_compiled_at: None,
                executed_at: None,
            })
            .await
            .unwrap()
    }
}
