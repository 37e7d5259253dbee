use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::Row;
use tracing::{debug, instrument, warn};

use super::models::{
    sort_chronologically, Match, Player, PlayerSeasonTeam, Season, SeasonPhase, SeasonPlayer,
    Team,
};
use crate::shared::{AppError, MatchId, PlayerId, SeasonId};
use crate::storage::postgres::{db_error, parse_column};
use crate::storage::{InMemoryStore, PostgresStore};

/// Shared cricket catalog: seasons, teams, players, matches and phases.
///
/// `create_*` methods ignore the id on the passed value and return the stored
/// row with the id the store assigned.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn create_season(&self, season: Season) -> Result<Season, AppError>;
    async fn get_season(&self, season_id: SeasonId) -> Result<Option<Season>, AppError>;
    async fn list_seasons(&self) -> Result<Vec<Season>, AppError>;

    async fn create_team(&self, team: Team) -> Result<Team, AppError>;
    /// Teams with a registered player or a scheduled match in the season
    async fn list_season_teams(&self, season_id: SeasonId) -> Result<Vec<Team>, AppError>;

    async fn create_player(&self, player: Player) -> Result<Player, AppError>;
    async fn get_player(&self, player_id: PlayerId) -> Result<Option<Player>, AppError>;
    async fn get_players(&self, player_ids: &[PlayerId]) -> Result<Vec<Player>, AppError>;

    /// Fails with `Conflict` when the player already has a row for the season
    async fn create_player_season_team(
        &self,
        assignment: PlayerSeasonTeam,
    ) -> Result<PlayerSeasonTeam, AppError>;
    async fn list_season_players(&self, season_id: SeasonId)
        -> Result<Vec<SeasonPlayer>, AppError>;

    async fn create_match(&self, fixture: Match) -> Result<Match, AppError>;
    async fn get_match(&self, match_id: MatchId) -> Result<Option<Match>, AppError>;
    async fn find_match_by_external_id(&self, external_id: &str)
        -> Result<Option<Match>, AppError>;
    /// Ordered by (date, match number)
    async fn list_matches(&self, season_id: SeasonId) -> Result<Vec<Match>, AppError>;
    async fn update_match(&self, fixture: &Match) -> Result<(), AppError>;

    async fn create_phase(&self, phase: SeasonPhase) -> Result<SeasonPhase, AppError>;
    /// Ordered by phase number
    async fn list_phases(&self, season_id: SeasonId) -> Result<Vec<SeasonPhase>, AppError>;
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    #[instrument(skip(self, season))]
    async fn create_season(&self, mut season: Season) -> Result<Season, AppError> {
        let mut state = self.write().await;
        season.id = state.next_id();
        state.seasons.insert(season.id, season.clone());
        debug!(season_id = season.id, name = %season.name, "Season created in memory");
        Ok(season)
    }

    async fn get_season(&self, season_id: SeasonId) -> Result<Option<Season>, AppError> {
        Ok(self.read().await.seasons.get(&season_id).cloned())
    }

    async fn list_seasons(&self) -> Result<Vec<Season>, AppError> {
        Ok(self.read().await.seasons.values().cloned().collect())
    }

    async fn create_team(&self, mut team: Team) -> Result<Team, AppError> {
        let mut state = self.write().await;
        team.id = state.next_id();
        state.teams.insert(team.id, team.clone());
        Ok(team)
    }

    async fn list_season_teams(&self, season_id: SeasonId) -> Result<Vec<Team>, AppError> {
        let state = self.read().await;
        Ok(state
            .season_team_ids(season_id)
            .into_iter()
            .filter_map(|id| state.teams.get(&id).cloned())
            .collect())
    }

    async fn create_player(&self, mut player: Player) -> Result<Player, AppError> {
        let mut state = self.write().await;
        player.id = state.next_id();
        state.players.insert(player.id, player.clone());
        Ok(player)
    }

    async fn get_player(&self, player_id: PlayerId) -> Result<Option<Player>, AppError> {
        Ok(self.read().await.players.get(&player_id).cloned())
    }

    async fn get_players(&self, player_ids: &[PlayerId]) -> Result<Vec<Player>, AppError> {
        let state = self.read().await;
        Ok(player_ids
            .iter()
            .filter_map(|id| state.players.get(id).cloned())
            .collect())
    }

    #[instrument(skip(self, assignment))]
    async fn create_player_season_team(
        &self,
        mut assignment: PlayerSeasonTeam,
    ) -> Result<PlayerSeasonTeam, AppError> {
        let mut state = self.write().await;
        let duplicate = state.player_season_teams.values().any(|pst| {
            pst.player_id == assignment.player_id && pst.season_id == assignment.season_id
        });
        if duplicate {
            warn!(
                player_id = assignment.player_id,
                season_id = assignment.season_id,
                "Player already assigned for season"
            );
            return Err(AppError::Conflict(format!(
                "Player {} already has a team in season {}",
                assignment.player_id, assignment.season_id
            )));
        }

        assignment.id = state.next_id();
        state
            .player_season_teams
            .insert(assignment.id, assignment.clone());
        Ok(assignment)
    }

    async fn list_season_players(
        &self,
        season_id: SeasonId,
    ) -> Result<Vec<SeasonPlayer>, AppError> {
        let state = self.read().await;
        Ok(state
            .player_season_teams
            .values()
            .filter(|pst| pst.season_id == season_id)
            .filter_map(|pst| {
                state.players.get(&pst.player_id).map(|player| SeasonPlayer {
                    assignment: pst.clone(),
                    player: player.clone(),
                })
            })
            .collect())
    }

    #[instrument(skip(self, fixture))]
    async fn create_match(&self, mut fixture: Match) -> Result<Match, AppError> {
        let mut state = self.write().await;
        if state
            .matches
            .values()
            .any(|m| m.external_id == fixture.external_id)
        {
            return Err(AppError::Conflict(format!(
                "Match {} already exists",
                fixture.external_id
            )));
        }
        fixture.id = state.next_id();
        state.matches.insert(fixture.id, fixture.clone());
        debug!(match_id = fixture.id, external_id = %fixture.external_id, "Match created in memory");
        Ok(fixture)
    }

    async fn get_match(&self, match_id: MatchId) -> Result<Option<Match>, AppError> {
        Ok(self.read().await.matches.get(&match_id).cloned())
    }

    async fn find_match_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Match>, AppError> {
        Ok(self
            .read()
            .await
            .matches
            .values()
            .find(|m| m.external_id == external_id)
            .cloned())
    }

    async fn list_matches(&self, season_id: SeasonId) -> Result<Vec<Match>, AppError> {
        let mut matches: Vec<Match> = self
            .read()
            .await
            .matches
            .values()
            .filter(|m| m.season_id == season_id)
            .cloned()
            .collect();
        sort_chronologically(&mut matches);
        Ok(matches)
    }

    async fn update_match(&self, fixture: &Match) -> Result<(), AppError> {
        let mut state = self.write().await;
        match state.matches.get_mut(&fixture.id) {
            Some(existing) => {
                *existing = fixture.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Match {} not found", fixture.id))),
        }
    }

    async fn create_phase(&self, mut phase: SeasonPhase) -> Result<SeasonPhase, AppError> {
        let mut state = self.write().await;
        phase.id = state.next_id();
        state.phases.insert(phase.id, phase.clone());
        Ok(phase)
    }

    async fn list_phases(&self, season_id: SeasonId) -> Result<Vec<SeasonPhase>, AppError> {
        let mut phases: Vec<SeasonPhase> = self
            .read()
            .await
            .phases
            .values()
            .filter(|p| p.season_id == season_id)
            .cloned()
            .collect();
        phases.sort_by_key(|p| (p.phase, p.id));
        Ok(phases)
    }
}

fn season_from_row(row: &PgRow) -> Result<Season, AppError> {
    let status: String = row.try_get("status")?;
    Ok(Season {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        year: row.try_get("year")?,
        status: parse_column(&status, "status")?,
        default_draft_order: row
            .try_get::<Option<Json<_>>, _>("default_draft_order")?
            .map(|order| order.0),
    })
}

fn team_from_row(row: &PgRow) -> Result<Team, AppError> {
    Ok(Team {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        short_name: row.try_get("short_name")?,
    })
}

fn player_from_row(row: &PgRow) -> Result<Player, AppError> {
    let role: String = row.try_get("role")?;
    Ok(Player {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        role: parse_column(&role, "role")?,
    })
}

fn match_from_row(row: &PgRow) -> Result<Match, AppError> {
    let stage: String = row.try_get("stage")?;
    let status: String = row.try_get("status")?;
    let toss_decision: Option<String> = row.try_get("toss_decision")?;
    Ok(Match {
        id: row.try_get("id")?,
        season_id: row.try_get("season_id")?,
        external_id: row.try_get("external_id")?,
        match_number: row.try_get("match_number")?,
        phase: row.try_get("phase")?,
        stage: parse_column(&stage, "stage")?,
        date: row.try_get("date")?,
        team1_id: row.try_get("team1_id")?,
        team2_id: row.try_get("team2_id")?,
        status: parse_column(&status, "status")?,
        toss_winner_id: row.try_get("toss_winner_id")?,
        toss_decision: toss_decision
            .map(|d| parse_column(&d, "toss_decision"))
            .transpose()?,
        winner_id: row.try_get("winner_id")?,
        innings: row.try_get::<Json<_>, _>("innings")?.0,
    })
}

fn phase_from_row(row: &PgRow) -> Result<SeasonPhase, AppError> {
    Ok(SeasonPhase {
        id: row.try_get("id")?,
        season_id: row.try_get("season_id")?,
        phase: row.try_get("phase")?,
        start: row.try_get("start_at")?,
        end: row.try_get("end_at")?,
    })
}

const MATCH_COLUMNS: &str = "id, season_id, external_id, match_number, phase, stage, date, \
     team1_id, team2_id, status, toss_winner_id, toss_decision, winner_id, innings";

#[async_trait]
impl CatalogRepository for PostgresStore {
    #[instrument(skip(self, season))]
    async fn create_season(&self, mut season: Season) -> Result<Season, AppError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO seasons (name, year, status, default_draft_order) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&season.name)
        .bind(season.year)
        .bind(season.status.to_string())
        .bind(season.default_draft_order.as_ref().map(Json))
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create season"))?;

        season.id = id;
        debug!(season_id = id, "Season created in database");
        Ok(season)
    }

    async fn get_season(&self, season_id: SeasonId) -> Result<Option<Season>, AppError> {
        sqlx::query("SELECT id, name, year, status, default_draft_order FROM seasons WHERE id = $1")
            .bind(season_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get season"))?
            .as_ref()
            .map(season_from_row)
            .transpose()
    }

    async fn list_seasons(&self) -> Result<Vec<Season>, AppError> {
        sqlx::query("SELECT id, name, year, status, default_draft_order FROM seasons ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list seasons"))?
            .iter()
            .map(season_from_row)
            .collect()
    }

    async fn create_team(&self, mut team: Team) -> Result<Team, AppError> {
        team.id = sqlx::query_scalar(
            "INSERT INTO teams (name, short_name) VALUES ($1, $2) RETURNING id",
        )
        .bind(&team.name)
        .bind(&team.short_name)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create team"))?;
        Ok(team)
    }

    async fn list_season_teams(&self, season_id: SeasonId) -> Result<Vec<Team>, AppError> {
        sqlx::query(
            "SELECT id, name, short_name FROM teams WHERE id IN (
                SELECT team_id FROM player_season_teams WHERE season_id = $1
                UNION SELECT team1_id FROM matches WHERE season_id = $1
                UNION SELECT team2_id FROM matches WHERE season_id = $1
            ) ORDER BY id",
        )
        .bind(season_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list season teams"))?
        .iter()
        .map(team_from_row)
        .collect()
    }

    async fn create_player(&self, mut player: Player) -> Result<Player, AppError> {
        player.id = sqlx::query_scalar("INSERT INTO players (name, role) VALUES ($1, $2) RETURNING id")
            .bind(&player.name)
            .bind(player.role.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("create player"))?;
        Ok(player)
    }

    async fn get_player(&self, player_id: PlayerId) -> Result<Option<Player>, AppError> {
        sqlx::query("SELECT id, name, role FROM players WHERE id = $1")
            .bind(player_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get player"))?
            .as_ref()
            .map(player_from_row)
            .transpose()
    }

    async fn get_players(&self, player_ids: &[PlayerId]) -> Result<Vec<Player>, AppError> {
        let players: Vec<Player> = sqlx::query("SELECT id, name, role FROM players WHERE id = ANY($1)")
            .bind(player_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("get players"))?
            .iter()
            .map(player_from_row)
            .collect::<Result<_, _>>()?;

        // Preserve the caller's order
        Ok(player_ids
            .iter()
            .filter_map(|id| players.iter().find(|p| p.id == *id).cloned())
            .collect())
    }

    #[instrument(skip(self, assignment))]
    async fn create_player_season_team(
        &self,
        mut assignment: PlayerSeasonTeam,
    ) -> Result<PlayerSeasonTeam, AppError> {
        let id: Option<i64> = sqlx::query_scalar(
            "INSERT INTO player_season_teams (player_id, team_id, season_id, ruled_out, replacement_id)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (player_id, season_id) DO NOTHING
             RETURNING id",
        )
        .bind(assignment.player_id)
        .bind(assignment.team_id)
        .bind(assignment.season_id)
        .bind(assignment.ruled_out)
        .bind(assignment.replacement_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("create player season team"))?;

        match id {
            Some(id) => {
                assignment.id = id;
                Ok(assignment)
            }
            None => Err(AppError::Conflict(format!(
                "Player {} already has a team in season {}",
                assignment.player_id, assignment.season_id
            ))),
        }
    }

    async fn list_season_players(
        &self,
        season_id: SeasonId,
    ) -> Result<Vec<SeasonPlayer>, AppError> {
        let rows = sqlx::query(
            "SELECT pst.id AS pst_id, pst.player_id, pst.team_id, pst.season_id, pst.ruled_out,
                    pst.replacement_id, p.id, p.name, p.role
             FROM player_season_teams pst JOIN players p ON p.id = pst.player_id
             WHERE pst.season_id = $1 ORDER BY pst.id",
        )
        .bind(season_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list season players"))?;

        rows.iter()
            .map(|row| -> Result<SeasonPlayer, AppError> {
                Ok(SeasonPlayer {
                    assignment: PlayerSeasonTeam {
                        id: row.try_get("pst_id")?,
                        player_id: row.try_get("player_id")?,
                        team_id: row.try_get("team_id")?,
                        season_id: row.try_get("season_id")?,
                        ruled_out: row.try_get("ruled_out")?,
                        replacement_id: row.try_get("replacement_id")?,
                    },
                    player: player_from_row(row)?,
                })
            })
            .collect()
    }

    #[instrument(skip(self, fixture))]
    async fn create_match(&self, mut fixture: Match) -> Result<Match, AppError> {
        fixture.id = sqlx::query_scalar(
            "INSERT INTO matches (season_id, external_id, match_number, phase, stage, date, team1_id,
                team2_id, status, toss_winner_id, toss_decision, winner_id, innings)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) RETURNING id",
        )
        .bind(fixture.season_id)
        .bind(&fixture.external_id)
        .bind(fixture.match_number)
        .bind(fixture.phase)
        .bind(fixture.stage.to_string())
        .bind(fixture.date)
        .bind(fixture.team1_id)
        .bind(fixture.team2_id)
        .bind(fixture.status.to_string())
        .bind(fixture.toss_winner_id)
        .bind(fixture.toss_decision.map(|d| d.to_string()))
        .bind(fixture.winner_id)
        .bind(Json(&fixture.innings))
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create match"))?;
        Ok(fixture)
    }

    async fn get_match(&self, match_id: MatchId) -> Result<Option<Match>, AppError> {
        sqlx::query(&format!("SELECT {} FROM matches WHERE id = $1", MATCH_COLUMNS))
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("get match"))?
            .as_ref()
            .map(match_from_row)
            .transpose()
    }

    async fn find_match_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Match>, AppError> {
        sqlx::query(&format!(
            "SELECT {} FROM matches WHERE external_id = $1",
            MATCH_COLUMNS
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find match"))?
        .as_ref()
        .map(match_from_row)
        .transpose()
    }

    async fn list_matches(&self, season_id: SeasonId) -> Result<Vec<Match>, AppError> {
        sqlx::query(&format!(
            "SELECT {} FROM matches WHERE season_id = $1 ORDER BY date, match_number, id",
            MATCH_COLUMNS
        ))
        .bind(season_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list matches"))?
        .iter()
        .map(match_from_row)
        .collect()
    }

    #[instrument(skip(self, fixture), fields(match_id = fixture.id))]
    async fn update_match(&self, fixture: &Match) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE matches SET status = $2, toss_winner_id = $3, toss_decision = $4,
                winner_id = $5, innings = $6, date = $7, phase = $8
             WHERE id = $1",
        )
        .bind(fixture.id)
        .bind(fixture.status.to_string())
        .bind(fixture.toss_winner_id)
        .bind(fixture.toss_decision.map(|d| d.to_string()))
        .bind(fixture.winner_id)
        .bind(Json(&fixture.innings))
        .bind(fixture.date)
        .bind(fixture.phase)
        .execute(&self.pool)
        .await
        .map_err(db_error("update match"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Match {} not found", fixture.id)));
        }
        Ok(())
    }

    async fn create_phase(&self, mut phase: SeasonPhase) -> Result<SeasonPhase, AppError> {
        phase.id = sqlx::query_scalar(
            "INSERT INTO season_phases (season_id, phase, start_at, end_at) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(phase.season_id)
        .bind(phase.phase)
        .bind(phase.start)
        .bind(phase.end)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create phase"))?;
        Ok(phase)
    }

    async fn list_phases(&self, season_id: SeasonId) -> Result<Vec<SeasonPhase>, AppError> {
        sqlx::query(
            "SELECT id, season_id, phase, start_at, end_at FROM season_phases
             WHERE season_id = $1 ORDER BY phase, id",
        )
        .bind(season_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list phases"))?
        .iter()
        .map(phase_from_row)
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::season::{MatchStage, MatchStatus, PlayerRole, SeasonStatus};
    use chrono::{TimeZone, Utc};

    fn season() -> Season {
        Season {
            id: 0,
            name: "IPL".into(),
            year: 2024,
            status: SeasonStatus::Ongoing,
            default_draft_order: None,
        }
    }

    #[tokio::test]
    async fn player_can_only_join_one_team_per_season() {
        let store = InMemoryStore::new();
        let season = store.create_season(season()).await.unwrap();
        let team = store
            .create_team(Team { id: 0, name: "Mumbai Indians".into(), short_name: "MI".into() })
            .await
            .unwrap();
        let player = store
            .create_player(Player { id: 0, name: "Rohit Sharma".into(), role: PlayerRole::Bat })
            .await
            .unwrap();

        let assignment = PlayerSeasonTeam {
            id: 0,
            player_id: player.id,
            team_id: team.id,
            season_id: season.id,
            ruled_out: false,
            replacement_id: None,
        };
        store.create_player_season_team(assignment.clone()).await.unwrap();
        let second = store.create_player_season_team(assignment).await;

        assert!(matches!(second, Err(AppError::Conflict(_))));
        let players = store.list_season_players(season.id).await.unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].player.name, "Rohit Sharma");
        assert_eq!(store.list_season_teams(season.id).await.unwrap(), vec![team]);
    }

    #[tokio::test]
    async fn matches_list_in_chronological_order() {
        let store = InMemoryStore::new();
        let season = store.create_season(season()).await.unwrap();
        let date = Utc.with_ymd_and_hms(2024, 4, 6, 14, 0, 0).unwrap();

        for (external_id, number) in [("b", 2), ("a", 1)] {
            store
                .create_match(Match {
                    id: 0,
                    season_id: season.id,
                    external_id: external_id.into(),
                    match_number: number,
                    phase: 1,
                    stage: MatchStage::League,
                    date,
                    team1_id: 1,
                    team2_id: 2,
                    status: MatchStatus::Scheduled,
                    toss_winner_id: None,
                    toss_decision: None,
                    winner_id: None,
                    innings: vec![],
                })
                .await
                .unwrap();
        }

        let matches = store.list_matches(season.id).await.unwrap();
        let order: Vec<&str> = matches.iter().map(|m| m.external_id.as_str()).collect();
        assert_eq!(order, vec!["a", "b"]);

        let found = store.find_match_by_external_id("b").await.unwrap().unwrap();
        assert_eq!(found.match_number, 2);
    }
}
