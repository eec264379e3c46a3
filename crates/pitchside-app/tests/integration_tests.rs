// Integration tests for the squad planner.
//
// These exercise the library crates end-to-end through their public API:
// mock data loading, the mock service, the squad state, the application
// loop and session recovery through SQLite.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use pitchside_app::app::{self, AppState};
use pitchside_app::config::{Config, SquadConfig};
use pitchside_app::db::Database;
use pitchside_app::protocol::*;
use pitchside_core::registry::{self, SquadData};
use pitchside_core::service::{MockSquadService, SquadService};
use pitchside_core::squad::assessment::AssessmentEdit;
use pitchside_core::squad::formation::{Formation, Role};
use pitchside_core::squad::lineup::SlotRef;
use pitchside_core::squad::state::{PositionPolicy, SquadAction, SquadError, SquadState};
use pitchside_core::squad::transfer::{RumorFilter, RumorStatus};

use tokio::sync::mpsc;

// ===========================================================================
// Test helpers
// ===========================================================================

const SQUAD_CSV: &str = "data/squad.csv";
const TRANSFERS_CSV: &str = "data/transfers.csv";

fn test_config(policy: PositionPolicy) -> Config {
    Config {
        squad: SquadConfig {
            team_id: "ars".into(),
            squad_csv: SQUAD_CSV.into(),
            transfers_csv: TRANSFERS_CSV.into(),
            default_formation: "4-3-3".into(),
            transfer_budget: 75.0,
            wage_space: 180.0,
        },
        formation: Formation::F433,
        position_policy: policy,
        latency_ms: 0,
        db_path: ":memory:".into(),
    }
}

fn load_data() -> SquadData {
    registry::load_squad(Path::new(SQUAD_CSV)).expect("shipped squad sheet should load")
}

/// Build an AppState over the shipped data with the given database.
fn build_state(
    db: Database,
    session_id: &str,
    policy: PositionPolicy,
) -> (AppState, mpsc::Receiver<ServiceEvent>) {
    let mut data = load_data();
    let rumors = registry::load_rumors(Path::new(TRANSFERS_CSV)).unwrap();
    app::apply_saved_assessments(&db, session_id, &mut data.players).unwrap();

    let service: Arc<dyn SquadService> =
        Arc::new(MockSquadService::new("ars", data.players.clone(), rumors));
    let squad = SquadState::new(
        data.players,
        Formation::F433,
        data.starting,
        data.bench,
        policy,
    )
    .unwrap();
    let (svc_tx, svc_rx) = mpsc::channel(64);
    let state = AppState::new(
        test_config(policy),
        squad,
        db,
        session_id.into(),
        service,
        svc_tx,
    );
    (state, svc_rx)
}

/// Receive updates until one matches `pred`, failing after a timeout.
async fn wait_for<F>(ui_rx: &mut mpsc::Receiver<UiUpdate>, pred: F) -> UiUpdate
where
    F: Fn(&UiUpdate) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let update = ui_rx.recv().await.expect("ui channel closed early");
            if pred(&update) {
                return update;
            }
        }
    })
    .await
    .expect("timed out waiting for update")
}

// ===========================================================================
// Data + service
// ===========================================================================

#[test]
fn shipped_squad_sheet_fills_a_four_three_three() {
    let data = load_data();
    assert_eq!(data.players.len(), 20);
    assert_eq!(data.starting.len(), 11);
    assert_eq!(data.bench.len(), 7);

    let squad = SquadState::new(
        data.players,
        Formation::F433,
        data.starting,
        data.bench,
        PositionPolicy::Strict,
    )
    .unwrap();
    assert_eq!(squad.lineup().filled_count(), 18);
    assert_eq!(squad.reserves().len(), 2);

    let snap = squad.snapshot();
    assert_eq!(snap.starting[0].role, Role::Goalkeeper);
    assert_eq!(snap.starting[0].player.as_ref().unwrap().id, "1");
}

#[test]
fn shipped_rumors_load() {
    let rumors = registry::load_rumors(Path::new(TRANSFERS_CSV)).unwrap();
    assert_eq!(rumors.len(), 6);
    assert!(rumors.iter().any(|r| r.status == RumorStatus::Collapsed));
}

#[tokio::test]
async fn service_serves_shipped_squad() {
    let data = load_data();
    let svc = MockSquadService::new("ars", data.players, vec![]).with_finances(75.0, 180.0);
    let summary = svc.squad("ars").await.into_result().unwrap();
    assert_eq!(summary.players.len(), 20);
    assert_eq!(svc.squad("che").await.status_code, 404);
}

// ===========================================================================
// Squad state over real data
// ===========================================================================

#[test]
fn strict_policy_keeps_keepers_in_goal() {
    let data = load_data();
    let mut squad = SquadState::new(
        data.players,
        Formation::F433,
        data.starting,
        data.bench,
        PositionPolicy::Strict,
    )
    .unwrap();

    // Backup keeper (bench 0) onto the striker slot.
    squad
        .dispatch(SquadAction::BeginDrag {
            player_id: "12".into(),
            source: SlotRef::bench(0),
        })
        .unwrap();
    let err = squad
        .dispatch(SquadAction::Drop {
            target: SlotRef::starting(9),
        })
        .unwrap_err();
    assert!(matches!(err, SquadError::IncompatibleRole { .. }));

    // Keeper for keeper is fine.
    squad
        .dispatch(SquadAction::BeginDrag {
            player_id: "12".into(),
            source: SlotRef::bench(0),
        })
        .unwrap();
    squad
        .dispatch(SquadAction::Drop {
            target: SlotRef::starting(0),
        })
        .unwrap();
    assert_eq!(squad.lineup().starting[0].as_deref(), Some("12"));
    assert_eq!(squad.lineup().bench[0].as_deref(), Some("1"));
}

#[test]
fn formation_switch_keeps_starters_by_index() {
    let data = load_data();
    let mut squad = SquadState::new(
        data.players,
        Formation::F433,
        data.starting.clone(),
        data.bench,
        PositionPolicy::Permissive,
    )
    .unwrap();
    squad
        .dispatch(SquadAction::SetFormation(Formation::F352))
        .unwrap();
    let snap = squad.snapshot();
    assert_eq!(snap.formation, Formation::F352);
    for (i, id) in data.starting.iter().enumerate() {
        assert_eq!(snap.starting[i].player.as_ref().unwrap().id, *id);
    }
}

// ===========================================================================
// Application loop
// ===========================================================================

#[tokio::test]
async fn app_loop_end_to_end() {
    let (state, svc_rx) = build_state(
        Database::open(":memory:").unwrap(),
        "s1",
        PositionPolicy::Permissive,
    );
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (ui_tx, mut ui_rx) = mpsc::channel(256);
    let handle = tokio::spawn(app::run(cmd_rx, svc_rx, ui_tx, state));

    // Initial squad view.
    let first = wait_for(&mut ui_rx, |u| matches!(u, UiUpdate::Squad(_))).await;
    let UiUpdate::Squad(view) = first else { unreachable!() };
    assert_eq!(view.snapshot.revision, 0);

    // Sub the right-sided forward for a bench forward.
    cmd_tx
        .send(UserCommand::Drag {
            player_id: "11".into(),
            source: SlotRef::starting(10),
        })
        .await
        .unwrap();
    cmd_tx.send(UserCommand::Drop(SlotRef::bench(5))).await.unwrap();
    let update = wait_for(&mut ui_rx, |u| {
        matches!(u, UiUpdate::Squad(v) if v.snapshot.drag.is_none() && v.snapshot.revision == 2)
    })
    .await;
    let UiUpdate::Squad(view) = update else { unreachable!() };
    assert_eq!(view.snapshot.starting[10].player.as_ref().unwrap().id, "17");
    assert_eq!(view.snapshot.bench[5].player.as_ref().unwrap().id, "11");

    // Rating goes through the service and comes back as a card.
    cmd_tx
        .send(UserCommand::Rate {
            player_id: "7".into(),
            edit: AssessmentEdit {
                rating: Some(10),
                fan_pulse: Some(99),
                ..Default::default()
            },
        })
        .await
        .unwrap();
    let card = wait_for(&mut ui_rx, |u| matches!(u, UiUpdate::PlayerCard(_))).await;
    let UiUpdate::PlayerCard(player) = card else { unreachable!() };
    assert_eq!(player.id, "7");
    assert_eq!(player.ratings.rating, Some(10));
    assert_eq!(player.ratings.fan_pulse, Some(99));

    // Rumor listing, filtered.
    cmd_tx
        .send(UserCommand::Rumors(RumorFilter::Status(RumorStatus::Advanced)))
        .await
        .unwrap();
    let listing = wait_for(&mut ui_rx, |u| matches!(u, UiUpdate::Rumors { .. })).await;
    let UiUpdate::Rumors { filter, rumors } = listing else { unreachable!() };
    assert_eq!(filter, RumorFilter::Status(RumorStatus::Advanced));
    assert_eq!(rumors.len(), 2);
    assert_eq!(rumors[0].id, "r3", "most likely first");

    cmd_tx.send(UserCommand::Quit).await.unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn tracked_rumors_are_listed_through_the_loop() {
    let (state, svc_rx) = build_state(
        Database::open(":memory:").unwrap(),
        "s1",
        PositionPolicy::Permissive,
    );
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (ui_tx, mut ui_rx) = mpsc::channel(256);
    let handle = tokio::spawn(app::run(cmd_rx, svc_rx, ui_tx, state));

    cmd_tx
        .send(UserCommand::Rumors(RumorFilter::Tracked))
        .await
        .unwrap();
    let listing = wait_for(&mut ui_rx, |u| matches!(u, UiUpdate::Rumors { .. })).await;
    let UiUpdate::Rumors { rumors, .. } = listing else { unreachable!() };
    assert!(rumors.is_empty());

    for id in ["r1", "r3"] {
        cmd_tx
            .send(UserCommand::Track {
                rumor_id: id.into(),
                tracked: true,
            })
            .await
            .unwrap();
        wait_for(&mut ui_rx, |u| matches!(u, UiUpdate::Notice(m) if m.contains(id))).await;
    }

    cmd_tx
        .send(UserCommand::Rumors(RumorFilter::Tracked))
        .await
        .unwrap();
    let listing = wait_for(&mut ui_rx, |u| matches!(u, UiUpdate::Rumors { .. })).await;
    let UiUpdate::Rumors { filter, rumors } = listing else { unreachable!() };
    assert_eq!(filter, RumorFilter::Tracked);
    let ids: Vec<&str> = rumors.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["r3", "r1"]);
    assert!(rumors.iter().all(|r| r.tracked));

    cmd_tx.send(UserCommand::Quit).await.unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn app_loop_exits_when_console_goes_away() {
    let (state, svc_rx) = build_state(
        Database::open(":memory:").unwrap(),
        "s1",
        PositionPolicy::Permissive,
    );
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (ui_tx, _ui_rx) = mpsc::channel(256);
    let handle = tokio::spawn(app::run(cmd_rx, svc_rx, ui_tx, state));
    drop(cmd_tx);
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("loop should exit")
        .unwrap()
        .unwrap();
}

// ===========================================================================
// Session recovery
// ===========================================================================

#[tokio::test]
async fn lineup_and_assessments_survive_restart() {
    let db_path = std::env::temp_dir().join("pitchside_it_recovery.db");
    let _ = std::fs::remove_file(&db_path);
    let db_str = db_path.to_string_lossy().to_string();

    // Session one: change formation, swap a player, rate a player.
    {
        let (mut state, mut svc_rx) = build_state(
            Database::open(&db_str).unwrap(),
            "s1",
            PositionPolicy::Permissive,
        );
        let (ui_tx, _ui_rx) = mpsc::channel(256);
        app::handle_user_command(&mut state, UserCommand::SetFormation(Formation::F442), &ui_tx)
            .await;
        app::handle_user_command(
            &mut state,
            UserCommand::Drag {
                player_id: "10".into(),
                source: SlotRef::starting(9),
            },
            &ui_tx,
        )
        .await;
        app::handle_user_command(&mut state, UserCommand::Drop(SlotRef::bench(4)), &ui_tx).await;
        app::handle_user_command(
            &mut state,
            UserCommand::Rate {
                player_id: "9".into(),
                edit: AssessmentEdit {
                    rating: Some(3),
                    comment: Some("off the pace".into()),
                    ..Default::default()
                },
            },
            &ui_tx,
        )
        .await;
        let event = svc_rx.recv().await.unwrap();
        app::handle_service_event(&mut state, event, &ui_tx).await;
    }

    // Session two: same database.
    let (mut state, _svc_rx) = build_state(
        Database::open(&db_str).unwrap(),
        "s1",
        PositionPolicy::Permissive,
    );
    assert!(app::recover_from_db(&mut state).unwrap());
    assert_eq!(state.squad.formation(), Formation::F442);
    assert_eq!(state.squad.lineup().starting[9].as_deref(), Some("16"));
    assert_eq!(state.squad.lineup().bench[4].as_deref(), Some("10"));

    let rated = state.squad.player("9").unwrap();
    assert_eq!(rated.ratings.rating, Some(3));
    assert_eq!(rated.comment.as_deref(), Some("off the pace"));

    // A different session id does not pick up session one's ratings.
    let (other, _rx) = build_state(
        Database::open(&db_str).unwrap(),
        "s2",
        PositionPolicy::Permissive,
    );
    assert_eq!(other.squad.player("9").unwrap().ratings.rating, Some(8));

    let _ = std::fs::remove_file(&db_path);
}
