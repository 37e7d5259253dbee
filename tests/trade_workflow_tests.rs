mod utils;

use fantasy_cricket::league::{CoreAssignment, FantasyLeague, FantasySquad};
use fantasy_cricket::season::{Match, MatchStatus};
use fantasy_cricket::shared::PlayerId;
use fantasy_cricket::trade::{FantasyTrade, NewTrade, TradeDecision, TradeStatus};
use fantasy_cricket::{AppError, LeagueEvent};
use utils::{day, TestSetup, TestSetupBuilder};

struct TradeLeague {
    league: FantasyLeague,
    alpha: FantasySquad,
    bravo: FantasySquad,
    charlie: FantasySquad,
}

async fn trade_league(setup: &TestSetup) -> TradeLeague {
    let captain = setup.add_boost_role("Captain", 2.0).await;
    let league = setup.add_league("Trading League").await;
    let alpha = setup
        .add_squad(
            league.id,
            1,
            "Alpha",
            setup.players_named(&["Bat One", "Bat Two", "Keeper One"]),
            vec![CoreAssignment {
                boost_role_id: captain.id,
                player_id: setup.player("Bat One"),
            }],
        )
        .await;
    let bravo = setup
        .add_squad(
            league.id,
            2,
            "Bravo",
            setup.players_named(&["Bat Three", "Bat Four", "Keeper Two"]),
            vec![],
        )
        .await;
    let charlie = setup
        .add_squad(
            league.id,
            3,
            "Charlie",
            setup.players_named(&["Bowler One", "Bowler Two"]),
            vec![],
        )
        .await;

    TradeLeague {
        league,
        alpha,
        bravo,
        charlie,
    }
}

async fn propose(
    setup: &TestSetup,
    league: &TradeLeague,
    initiator: &FantasySquad,
    receiver: &FantasySquad,
    given: &[&str],
    received: &[&str],
) -> FantasyTrade {
    setup
        .state
        .trade_service
        .propose_trade(NewTrade {
            league_id: league.league.id,
            initiator_id: initiator.id,
            receiver_id: receiver.id,
            players_given: setup.players_named(given),
            players_received: setup.players_named(received),
        })
        .await
        .unwrap()
}

async fn roster(setup: &TestSetup, squad: &FantasySquad) -> FantasySquad {
    setup.state.leagues.get_squad(squad.id).await.unwrap().unwrap()
}

async fn status(setup: &TestSetup, trade: &FantasyTrade) -> TradeStatus {
    setup
        .state
        .trades
        .get_trade(trade.id)
        .await
        .unwrap()
        .unwrap()
        .status
}

async fn live_match(setup: &TestSetup) -> Match {
    let fixture = setup.add_match(1, 1, day(2)).await;
    setup
        .state
        .pipeline
        .set_match_status(fixture.id, MatchStatus::Live)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_accepting_rejects_conflicting_pending_trades() {
    let setup = TestSetupBuilder::new().with_draft_roster().build().await;
    let ctx = trade_league(&setup).await;
    let mut events = setup.state.event_bus.subscribe();

    let swap = propose(&setup, &ctx, &ctx.alpha, &ctx.bravo, &["Bat One"], &["Bat Three"]).await;
    let rival = propose(&setup, &ctx, &ctx.charlie, &ctx.alpha, &["Bowler One"], &["Bat One"]).await;
    let unrelated = propose(&setup, &ctx, &ctx.bravo, &ctx.charlie, &["Keeper Two"], &[]).await;

    let outcome = setup
        .state
        .trade_service
        .decide(swap.id, TradeDecision::Accept)
        .await
        .unwrap();

    assert_eq!(outcome.conflicts_resolved, vec![rival.id]);
    assert!(!outcome.deferred);
    assert_eq!(outcome.trade.status, TradeStatus::Closed);
    assert_eq!(status(&setup, &rival).await, TradeStatus::Rejected);
    assert_eq!(status(&setup, &unrelated).await, TradeStatus::Pending);

    let alpha = roster(&setup, &ctx.alpha).await;
    let bravo = roster(&setup, &ctx.bravo).await;
    assert!(alpha.owns(setup.player("Bat Three")));
    assert!(!alpha.owns(setup.player("Bat One")));
    assert!(bravo.owns(setup.player("Bat One")));
    assert_eq!(alpha.current_squad.len(), 3);
    assert_eq!(bravo.current_squad.len(), 3);

    let closed = std::iter::from_fn(|| events.try_recv().ok())
        .any(|e| e.event == LeagueEvent::TradeClosed { trade_id: swap.id });
    assert!(closed);
}

#[tokio::test]
async fn test_captaincy_moves_to_incoming_player() {
    let setup = TestSetupBuilder::new().with_draft_roster().build().await;
    let ctx = trade_league(&setup).await;

    let swap = propose(&setup, &ctx, &ctx.alpha, &ctx.bravo, &["Bat One"], &["Bat Three"]).await;
    setup
        .state
        .trade_service
        .decide(swap.id, TradeDecision::Accept)
        .await
        .unwrap();

    let alpha = roster(&setup, &ctx.alpha).await;
    let captains: Vec<PlayerId> = alpha.current_core_squad.iter().map(|a| a.player_id).collect();
    assert_eq!(captains, vec![setup.player("Bat Three")]);
    assert_eq!(alpha.future_core_squad, alpha.current_core_squad);
    assert!(roster(&setup, &ctx.bravo).await.current_core_squad.is_empty());
}

#[tokio::test]
async fn test_live_match_defers_processing() {
    let setup = TestSetupBuilder::new().with_draft_roster().build().await;
    let ctx = trade_league(&setup).await;
    let fixture = live_match(&setup).await;

    let swap = propose(&setup, &ctx, &ctx.alpha, &ctx.bravo, &["Bat Two"], &["Bat Four"]).await;
    let outcome = setup
        .state
        .trade_service
        .decide(swap.id, TradeDecision::Accept)
        .await
        .unwrap();
    assert!(outcome.deferred);
    assert_eq!(outcome.trade.status, TradeStatus::Accepted);
    assert!(roster(&setup, &ctx.alpha).await.owns(setup.player("Bat Two")));

    let blocked = setup.state.trade_service.process_trade(swap.id).await;
    assert!(matches!(blocked, Err(AppError::LiveMatchBlocked(_))));

    let report = setup
        .state
        .trade_service
        .process_ready_trades(setup.season.id)
        .await
        .unwrap();
    assert!(report.processed.is_empty());
    assert_eq!(report.deferred, vec![swap.id]);

    setup
        .state
        .pipeline
        .set_match_status(fixture.id, MatchStatus::Completed)
        .await
        .unwrap();
    let report = setup
        .state
        .trade_service
        .process_ready_trades(setup.season.id)
        .await
        .unwrap();
    assert_eq!(report.processed, vec![swap.id]);
    assert!(report.deferred.is_empty());

    assert_eq!(status(&setup, &swap).await, TradeStatus::Closed);
    assert!(roster(&setup, &ctx.alpha).await.owns(setup.player("Bat Four")));
    assert!(roster(&setup, &ctx.bravo).await.owns(setup.player("Bat Two")));
}

#[tokio::test]
async fn test_processing_a_closed_trade_changes_nothing() {
    let setup = TestSetupBuilder::new().with_draft_roster().build().await;
    let ctx = trade_league(&setup).await;

    let swap = propose(&setup, &ctx, &ctx.alpha, &ctx.bravo, &["Bat Two"], &["Bat Four"]).await;
    setup
        .state
        .trade_service
        .decide(swap.id, TradeDecision::Accept)
        .await
        .unwrap();
    let alpha_before = roster(&setup, &ctx.alpha).await;

    let again = setup.state.trade_service.process_trade(swap.id).await.unwrap();
    assert_eq!(again.status, TradeStatus::Closed);
    assert_eq!(roster(&setup, &ctx.alpha).await, alpha_before);

    let report = setup
        .state
        .trade_service
        .process_ready_trades(setup.season.id)
        .await
        .unwrap();
    assert!(report.processed.is_empty());
    assert!(report.deferred.is_empty());
}

#[tokio::test]
async fn test_rejected_trade_cannot_be_accepted() {
    let setup = TestSetupBuilder::new().with_draft_roster().build().await;
    let ctx = trade_league(&setup).await;

    let swap = propose(&setup, &ctx, &ctx.alpha, &ctx.bravo, &["Bat Two"], &["Bat Four"]).await;
    let rejected = setup
        .state
        .trade_service
        .decide(swap.id, TradeDecision::Reject)
        .await
        .unwrap();
    assert_eq!(rejected.trade.status, TradeStatus::Rejected);

    let accept = setup
        .state
        .trade_service
        .decide(swap.id, TradeDecision::Accept)
        .await;
    assert!(matches!(accept, Err(AppError::Conflict(_))));
    assert!(roster(&setup, &ctx.alpha).await.owns(setup.player("Bat Two")));
}

#[tokio::test]
async fn test_proposal_must_move_owned_players() {
    let setup = TestSetupBuilder::new().with_draft_roster().build().await;
    let ctx = trade_league(&setup).await;
    let trade_service = &setup.state.trade_service;

    let not_owned = trade_service
        .propose_trade(NewTrade {
            league_id: ctx.league.id,
            initiator_id: ctx.alpha.id,
            receiver_id: ctx.bravo.id,
            players_given: vec![setup.player("Bowler One")],
            players_received: vec![],
        })
        .await;
    assert!(matches!(not_owned, Err(AppError::BadRequest(_))));

    let empty = trade_service
        .propose_trade(NewTrade {
            league_id: ctx.league.id,
            initiator_id: ctx.alpha.id,
            receiver_id: ctx.bravo.id,
            players_given: vec![],
            players_received: vec![],
        })
        .await;
    assert!(matches!(empty, Err(AppError::BadRequest(_))));

    let repeated = trade_service
        .propose_trade(NewTrade {
            league_id: ctx.league.id,
            initiator_id: ctx.alpha.id,
            receiver_id: ctx.bravo.id,
            players_given: vec![setup.player("Bat One"), setup.player("Bat One")],
            players_received: vec![],
        })
        .await;
    assert!(matches!(repeated, Err(AppError::BadRequest(_))));
}
