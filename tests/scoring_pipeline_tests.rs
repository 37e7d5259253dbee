mod utils;

use fantasy_cricket::league::{CoreAssignment, FantasyLeague, FantasySquad};
use fantasy_cricket::scoring::{FantasyMatchEvent, Scorecard, SkipReason};
use fantasy_cricket::season::{Match, MatchStatus, PlayerRole};
use fantasy_cricket::shared::{MatchId, SquadId};
use utils::{day, ScorecardBuilder, TestSetup, TestSetupBuilder};

/// 30 off 20 with two fours and a six scores 40 base points
fn forty_point_knock(external_id: &str, batter: &str) -> Scorecard {
    ScorecardBuilder::new(external_id)
        .innings("MI", 160, "20")
        .batting(batter, 30, 20, 2, 1)
        .build()
}

struct League {
    league: FantasyLeague,
    captain_side: FantasySquad,
    other_side: FantasySquad,
}

async fn two_batter_setup() -> TestSetup {
    TestSetupBuilder::new()
        .with_player("Virat Kohli", PlayerRole::Bat, 0)
        .with_player("Rohit Sharma", PlayerRole::Bat, 1)
        .build()
        .await
}

/// Squad A holds Virat as captain, squad B holds Rohit with no boosts
async fn captain_league(setup: &TestSetup) -> League {
    let captain = setup.add_boost_role("Captain", 2.0).await;
    let league = setup.add_league("Office League").await;
    let captain_side = setup
        .add_squad(
            league.id,
            1,
            "Captains",
            vec![setup.player("Virat Kohli")],
            vec![CoreAssignment {
                boost_role_id: captain.id,
                player_id: setup.player("Virat Kohli"),
            }],
        )
        .await;
    let other_side = setup
        .add_squad(league.id, 2, "Openers", vec![setup.player("Rohit Sharma")], vec![])
        .await;

    League {
        league,
        captain_side,
        other_side,
    }
}

async fn match_rows(setup: &TestSetup, squads: &[SquadId]) -> Vec<FantasyMatchEvent> {
    let mut rows = setup
        .state
        .scoring_repository
        .list_fantasy_match_events(squads)
        .await
        .unwrap();
    rows.sort_by_key(|r| (r.match_id, r.squad_id));
    rows
}

fn row(rows: &[FantasyMatchEvent], squad_id: SquadId, match_id: MatchId) -> &FantasyMatchEvent {
    rows.iter()
        .find(|r| r.squad_id == squad_id && r.match_id == match_id)
        .unwrap()
}

async fn start(setup: &TestSetup, fixture: &Match) {
    setup
        .state
        .pipeline
        .set_match_status(fixture.id, MatchStatus::Live)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_captain_doubles_base_points() {
    let setup = two_batter_setup().await;
    let league = captain_league(&setup).await;
    let fixture = setup.add_match(1, 1, day(2)).await;
    start(&setup, &fixture).await;

    let scorecard = ScorecardBuilder::new("ext-1")
        .status(MatchStatus::Completed)
        .innings("MI", 160, "20")
        .batting("Virat Kohli", 30, 20, 2, 1)
        .build();
    let summary = setup
        .state
        .pipeline
        .ingest_scorecard(fixture.id, &scorecard)
        .await
        .unwrap();
    assert_eq!(summary.player_events_touched, 1);

    let player_events = setup
        .state
        .scoring_repository
        .list_player_match_events(fixture.id)
        .await
        .unwrap();
    assert_eq!(player_events.len(), 1);
    assert_eq!(player_events[0].points.total, 40);

    let squads = [league.captain_side.id, league.other_side.id];
    let fantasy_events = setup
        .state
        .scoring_repository
        .list_fantasy_player_events(&squads, Some(fixture.id))
        .await
        .unwrap();
    assert_eq!(fantasy_events.len(), 1);
    assert_eq!(fantasy_events[0].base_points, 40);
    assert_eq!(fantasy_events[0].boost_points, 40.0);

    let rows = match_rows(&setup, &squads).await;
    let captains = row(&rows, league.captain_side.id, fixture.id);
    assert_eq!(captains.total_points, 80.0);
    assert_eq!(captains.match_rank, 1);

    // Squads without a scoring player still get a zero row
    let openers = row(&rows, league.other_side.id, fixture.id);
    assert_eq!(openers.total_points, 0.0);
    assert_eq!(openers.players_count, 0);
    assert_eq!(openers.match_rank, 2);

    let squad = setup
        .state
        .leagues
        .get_squad(league.captain_side.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(squad.total_points, 80.0);
    assert_eq!(
        setup.state.catalog.get_match(fixture.id).await.unwrap().unwrap().status,
        MatchStatus::Completed
    );
}

#[tokio::test]
async fn test_equal_totals_rank_lower_squad_id_first() {
    let setup = two_batter_setup().await;
    let league = setup.add_league("Tied League").await;
    let first = setup
        .add_squad(league.id, 1, "First", vec![setup.player("Virat Kohli")], vec![])
        .await;
    let second = setup
        .add_squad(league.id, 2, "Second", vec![setup.player("Rohit Sharma")], vec![])
        .await;
    let fixture = setup.add_match(1, 1, day(2)).await;

    let scorecard = ScorecardBuilder::new("ext-1")
        .innings("MI", 160, "20")
        .batting("Virat Kohli", 30, 20, 2, 1)
        .innings("CSK", 150, "20")
        .batting("Rohit Sharma", 30, 20, 2, 1)
        .build();
    setup
        .state
        .pipeline
        .ingest_scorecard(fixture.id, &scorecard)
        .await
        .unwrap();

    let rows = match_rows(&setup, &[first.id, second.id]).await;
    assert_eq!(row(&rows, first.id, fixture.id).total_points, 40.0);
    assert_eq!(row(&rows, second.id, fixture.id).total_points, 40.0);
    assert_eq!(row(&rows, first.id, fixture.id).match_rank, 1);
    assert_eq!(row(&rows, second.id, fixture.id).match_rank, 2);
    assert_eq!(row(&rows, first.id, fixture.id).running_rank, 1);
    assert_eq!(row(&rows, second.id, fixture.id).running_rank, 2);
}

#[tokio::test]
async fn test_reingest_leaves_derived_rows_unchanged() {
    let setup = two_batter_setup().await;
    let league = captain_league(&setup).await;
    let squads = [league.captain_side.id, league.other_side.id];
    let fixture = setup.add_match(1, 1, day(2)).await;
    let scorecard = forty_point_knock("ext-1", "Virat Kohli");

    setup
        .state
        .pipeline
        .ingest_scorecard(fixture.id, &scorecard)
        .await
        .unwrap();
    let rows_before = match_rows(&setup, &squads).await;
    let squads_before = setup.state.leagues.list_squads(league.league.id).await.unwrap();

    setup
        .state
        .pipeline
        .ingest_scorecard(fixture.id, &scorecard)
        .await
        .unwrap();
    let rows_after = match_rows(&setup, &squads).await;
    let squads_after = setup.state.leagues.list_squads(league.league.id).await.unwrap();

    assert_eq!(rows_before, rows_after);
    for (before, after) in squads_before.iter().zip(squads_after.iter()) {
        assert_eq!(before.total_points, after.total_points);
    }
    assert_eq!(
        setup
            .state
            .scoring_repository
            .list_player_match_events(fixture.id)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_unknown_player_is_skipped_and_ingest_continues() {
    let setup = two_batter_setup().await;
    captain_league(&setup).await;
    let fixture = setup.add_match(1, 1, day(2)).await;

    let scorecard = ScorecardBuilder::new("ext-1")
        .innings("MI", 160, "20")
        .batting("Virat Kohli", 30, 20, 2, 1)
        .batting("Mystery Guest", 12, 9, 1, 0)
        .build();
    let summary = setup
        .state
        .pipeline
        .ingest_scorecard(fixture.id, &scorecard)
        .await
        .unwrap();

    assert_eq!(summary.player_events_touched, 1);
    assert!(summary
        .skipped
        .iter()
        .any(|s| s.reason == SkipReason::UnknownPlayer && s.detail.contains("Mystery Guest")));
}

#[tokio::test]
async fn test_shared_name_is_skipped_instead_of_guessed() {
    let setup = TestSetupBuilder::new()
        .with_player("Virat Kohli", PlayerRole::Bat, 0)
        .with_player("Rahul Sharma", PlayerRole::Bat, 0)
        .with_player("rahul sharma ", PlayerRole::Bowl, 1)
        .build()
        .await;
    let fixture = setup.add_match(1, 1, day(2)).await;

    let scorecard = ScorecardBuilder::new("ext-1")
        .innings("MI", 160, "20")
        .batting("Virat Kohli", 30, 20, 2, 1)
        .batting("Rahul Sharma", 45, 30, 4, 2)
        .build();
    let summary = setup
        .state
        .pipeline
        .ingest_scorecard(fixture.id, &scorecard)
        .await
        .unwrap();

    assert_eq!(summary.player_events_touched, 1);
    assert!(summary
        .skipped
        .iter()
        .any(|s| s.reason == SkipReason::UnknownPlayer && s.detail.contains("matches 2 players")));

    let events = setup
        .state
        .scoring_repository
        .list_player_match_events(fixture.id)
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].player_id, setup.player("Virat Kohli"));
}

#[tokio::test]
async fn test_illegal_status_in_scorecard_is_skipped() {
    let setup = two_batter_setup().await;
    captain_league(&setup).await;
    let fixture = setup.add_match(1, 1, day(2)).await;

    let scorecard = ScorecardBuilder::new("ext-1")
        .status(MatchStatus::Completed)
        .innings("MI", 160, "20")
        .batting("Virat Kohli", 30, 20, 2, 1)
        .build();
    let summary = setup
        .state
        .pipeline
        .ingest_scorecard(fixture.id, &scorecard)
        .await
        .unwrap();

    assert!(summary
        .skipped
        .iter()
        .any(|s| s.reason == SkipReason::IllegalTransition));
    let stored = setup.state.catalog.get_match(fixture.id).await.unwrap().unwrap();
    assert_eq!(stored.status, MatchStatus::Scheduled);
    assert_eq!(summary.player_events_touched, 1);
}

#[tokio::test]
async fn test_status_endpoint_rejects_illegal_transition() {
    let setup = two_batter_setup().await;
    let fixture = setup.add_match(1, 1, day(2)).await;

    let result = setup
        .state
        .pipeline
        .set_match_status(fixture.id, MatchStatus::Completed)
        .await;
    assert!(matches!(result, Err(fantasy_cricket::AppError::BadRequest(_))));
}

#[tokio::test]
async fn test_earlier_match_rewrites_later_running_totals() {
    let setup = two_batter_setup().await;
    let league = captain_league(&setup).await;
    let squads = [league.captain_side.id, league.other_side.id];
    let early = setup.add_match(1, 1, day(2)).await;
    let late = setup.add_match(2, 1, day(5)).await;

    setup
        .state
        .pipeline
        .ingest_scorecard(late.id, &forty_point_knock("ext-2", "Virat Kohli"))
        .await
        .unwrap();
    let rows = match_rows(&setup, &squads).await;
    assert_eq!(row(&rows, league.captain_side.id, late.id).running_total_points, 80.0);

    setup
        .state
        .pipeline
        .ingest_scorecard(early.id, &forty_point_knock("ext-1", "Virat Kohli"))
        .await
        .unwrap();
    let rows = match_rows(&setup, &squads).await;

    let captains_early = row(&rows, league.captain_side.id, early.id);
    let captains_late = row(&rows, league.captain_side.id, late.id);
    assert_eq!(captains_early.running_total_points, 80.0);
    assert_eq!(captains_late.running_total_points, 160.0);
    assert_eq!(captains_late.running_rank, 1);
    assert_eq!(row(&rows, league.other_side.id, late.id).running_rank, 2);

    let squad = setup
        .state
        .leagues
        .get_squad(league.captain_side.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(squad.total_points, 160.0);
}

#[tokio::test]
async fn test_completed_only_running_totals_wait_for_result() {
    let setup = TestSetupBuilder::new()
        .with_player("Virat Kohli", PlayerRole::Bat, 0)
        .with_player("Rohit Sharma", PlayerRole::Bat, 1)
        .completed_only()
        .build()
        .await;
    let league = captain_league(&setup).await;
    let squads = [league.captain_side.id, league.other_side.id];
    let fixture = setup.add_match(1, 1, day(2)).await;
    start(&setup, &fixture).await;

    setup
        .state
        .pipeline
        .ingest_scorecard(fixture.id, &forty_point_knock("ext-1", "Virat Kohli"))
        .await
        .unwrap();
    let rows = match_rows(&setup, &squads).await;
    let live_row = row(&rows, league.captain_side.id, fixture.id);
    assert_eq!(live_row.total_points, 80.0);
    assert_eq!(live_row.running_total_points, 0.0);

    setup
        .state
        .pipeline
        .set_match_status(fixture.id, MatchStatus::Completed)
        .await
        .unwrap();
    let rows = match_rows(&setup, &squads).await;
    assert_eq!(
        row(&rows, league.captain_side.id, fixture.id).running_total_points,
        80.0
    );
}

#[tokio::test]
async fn test_standings_and_stats_follow_completed_matches() {
    let setup = two_batter_setup().await;
    let league = captain_league(&setup).await;
    let fixture = setup.add_match(1, 1, day(2)).await;
    start(&setup, &fixture).await;

    let scorecard = ScorecardBuilder::new("ext-1")
        .status(MatchStatus::Completed)
        .innings("MI", 160, "20")
        .batting("Virat Kohli", 30, 20, 2, 1)
        .build();
    setup
        .state
        .pipeline
        .ingest_scorecard(fixture.id, &scorecard)
        .await
        .unwrap();

    let standings = setup.state.stats.standings(league.league.id).await.unwrap();
    assert_eq!(standings[0].squad_id, league.captain_side.id);
    assert_eq!(standings[0].rank, 1);
    assert_eq!(standings[0].total_points, 80.0);
    assert_eq!(standings[1].squad_id, league.other_side.id);

    let stats = setup.state.stats.league_stats(league.league.id, None).await.unwrap();
    assert_eq!(stats.matches_counted, 1);
    assert_eq!(stats.season_mvps[0].player_id, setup.player("Virat Kohli"));
    assert_eq!(stats.season_mvps[0].points, 80.0);
}
