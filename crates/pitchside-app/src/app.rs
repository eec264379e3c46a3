// Application state and orchestration logic.
//
// The event loop owns the squad state. Console commands are applied in
// arrival order; service calls run as spawned tasks and report back on their
// own channel, so the lineup never waits on the network.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use pitchside_core::service::SquadService;
use pitchside_core::squad::assessment::{AssessmentEdit, ContractAction, StatusEdit};
use pitchside_core::squad::player::Player;
use pitchside_core::squad::state::{ActionOutcome, PlayerSummary, SquadAction, SquadState};

use crate::config::Config;
use crate::db::Database;
use crate::protocol::{EditKind, ServiceEvent, SquadView, StatusFlag, UiUpdate, UserCommand};

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    pub config: Config,
    pub squad: SquadState,
    pub db: Database,
    /// Scopes assessment history to one planning session.
    pub session_id: String,
    pub service: Arc<dyn SquadService>,
    /// Spawned service tasks send their results here.
    pub svc_tx: mpsc::Sender<ServiceEvent>,
    pub transfer_budget: f64,
    pub wage_space: f64,
    /// Service calls in flight; non-zero shows as "saving".
    pub pending_requests: usize,
}

impl AppState {
    pub fn new(
        config: Config,
        squad: SquadState,
        db: Database,
        session_id: String,
        service: Arc<dyn SquadService>,
        svc_tx: mpsc::Sender<ServiceEvent>,
    ) -> Self {
        let transfer_budget = config.squad.transfer_budget;
        let wage_space = config.squad.wage_space;
        AppState {
            config,
            squad,
            db,
            session_id,
            service,
            svc_tx,
            transfer_budget,
            wage_space,
            pending_requests: 0,
        }
    }

    pub fn build_squad_view(&self) -> SquadView {
        SquadView {
            snapshot: self.squad.snapshot(),
            reserves: self
                .squad
                .reserves()
                .into_iter()
                .map(PlayerSummary::from)
                .collect(),
            transfer_budget: self.transfer_budget,
            wage_space: self.wage_space,
        }
    }

    /// Write the current lineup to the session store. Failures are logged;
    /// the in-memory lineup stays authoritative.
    pub fn persist_lineup(&self) {
        if let Err(e) = self.db.save_lineup(&self.squad.saved_lineup()) {
            warn!("failed to persist lineup: {:#}", e);
        }
    }

    /// Run a service call on its own task and route the result back to the
    /// loop through `svc_tx`.
    fn spawn_service<F, Fut>(&mut self, call: F)
    where
        F: FnOnce(Arc<dyn SquadService>) -> Fut,
        Fut: Future<Output = ServiceEvent> + Send + 'static,
    {
        let fut = call(Arc::clone(&self.service));
        let tx = self.svc_tx.clone();
        self.pending_requests += 1;
        tokio::spawn(async move {
            let event = fut.await;
            if tx.send(event).await.is_err() {
                debug!("service result dropped: event loop has exited");
            }
        });
    }

    /// Look up a player the console wants to edit. Injured players are
    /// read-only for assessment edits.
    fn editable_player(&self, player_id: &str) -> Result<&Player, String> {
        let player = self
            .squad
            .player(player_id)
            .ok_or_else(|| format!("unknown player '{player_id}'"))?;
        if !player.is_editable() {
            return Err(format!("{} is injured; assessment is read-only", player.label()));
        }
        Ok(player)
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the application event loop until `Quit` or the command channel
/// closes.
///
/// Listens on two channels using `tokio::select!`:
/// 1. Results of spawned service calls
/// 2. User commands from the console
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    mut svc_rx: mpsc::Receiver<ServiceEvent>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    let _ = ui_tx
        .send(UiUpdate::Squad(Box::new(state.build_squad_view())))
        .await;

    let mut svc_open = true;

    loop {
        tokio::select! {
            event = svc_rx.recv(), if svc_open => {
                match event {
                    Some(event) => handle_service_event(&mut state, event, &ui_tx).await,
                    None => {
                        info!("Service channel closed");
                        svc_open = false;
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => handle_user_command(&mut state, cmd, &ui_tx).await,
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }
        }
    }

    state.persist_lineup();
    Ok(())
}

// ---------------------------------------------------------------------------
// Command handling
// ---------------------------------------------------------------------------

async fn send_squad(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let _ = ui_tx
        .send(UiUpdate::Squad(Box::new(state.build_squad_view())))
        .await;
}

async fn send_error(ui_tx: &mpsc::Sender<UiUpdate>, message: String) {
    let _ = ui_tx.send(UiUpdate::Error(message)).await;
}

/// Apply a lineup action and report the result. Lineup changes are saved.
async fn apply_action(state: &mut AppState, action: SquadAction, ui_tx: &mpsc::Sender<UiUpdate>) {
    match state.squad.dispatch(action) {
        Ok(outcome) => {
            match &outcome {
                ActionOutcome::Dropped(_) => state.persist_lineup(),
                ActionOutcome::FormationChanged { formation, dropped } => {
                    state.persist_lineup();
                    if !dropped.is_empty() {
                        let _ = ui_tx
                            .send(UiUpdate::Notice(format!(
                                "{} leaves out: {}",
                                formation,
                                dropped.join(", ")
                            )))
                            .await;
                    }
                }
                _ => {}
            }
            send_squad(state, ui_tx).await;
        }
        Err(e) => {
            warn!("lineup action rejected: {}", e);
            send_error(ui_tx, e.to_string()).await;
            // A failed drop may still have ended the drag.
            send_squad(state, ui_tx).await;
        }
    }
}

enum PlayerEdit {
    Assessment(AssessmentEdit),
    Status(StatusEdit),
    Contract(ContractAction),
}

fn spawn_player_edit(state: &mut AppState, kind: EditKind, player_id: String, edit: PlayerEdit) {
    state.spawn_service(move |svc| async move {
        let response = match edit {
            PlayerEdit::Assessment(edit) => svc.update_rating(&player_id, edit).await,
            PlayerEdit::Status(edit) => svc.update_status(&player_id, edit).await,
            PlayerEdit::Contract(action) => svc.update_contract(&player_id, action).await,
        };
        ServiceEvent::PlayerUpdated {
            kind,
            player_id,
            response,
        }
    });
}

pub async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match cmd {
        UserCommand::Show => send_squad(state, ui_tx).await,
        UserCommand::Drag { player_id, source } => {
            apply_action(state, SquadAction::BeginDrag { player_id, source }, ui_tx).await
        }
        UserCommand::Hover(target) => {
            apply_action(state, SquadAction::Hover { target }, ui_tx).await
        }
        UserCommand::Drop(target) => {
            apply_action(state, SquadAction::Drop { target }, ui_tx).await
        }
        UserCommand::Cancel => apply_action(state, SquadAction::EndDrag, ui_tx).await,
        UserCommand::SetFormation(formation) => {
            apply_action(state, SquadAction::SetFormation(formation), ui_tx).await
        }
        UserCommand::Rate { player_id, edit } => {
            if let Err(msg) = state.editable_player(&player_id) {
                send_error(ui_tx, msg).await;
                return;
            }
            if edit.is_empty() {
                send_error(ui_tx, "nothing to rate".to_string()).await;
                return;
            }
            let edit = PlayerEdit::Assessment(edit);
            spawn_player_edit(state, EditKind::Assessment, player_id, edit);
            let _ = ui_tx.send(UiUpdate::Notice("saving...".into())).await;
        }
        UserCommand::Recommend {
            player_id,
            recommendation,
        } => {
            if let Err(msg) = state.editable_player(&player_id) {
                send_error(ui_tx, msg).await;
                return;
            }
            let edit = AssessmentEdit {
                recommendation: Some(recommendation),
                ..Default::default()
            };
            let edit = PlayerEdit::Assessment(edit);
            spawn_player_edit(state, EditKind::Assessment, player_id, edit);
            let _ = ui_tx.send(UiUpdate::Notice("saving...".into())).await;
        }
        UserCommand::SetFlag {
            player_id,
            flag,
            on,
        } => {
            if state.squad.player(&player_id).is_none() {
                send_error(ui_tx, format!("unknown player '{player_id}'")).await;
                return;
            }
            let mut edit = StatusEdit::default();
            match flag {
                StatusFlag::Injured => edit.injured = Some(on),
                StatusFlag::Captain => edit.captain = Some(on),
                StatusFlag::OnLoan => edit.on_loan = Some(on),
            }
            spawn_player_edit(state, EditKind::Status, player_id, PlayerEdit::Status(edit));
        }
        UserCommand::Contract { player_id, action } => {
            if state.squad.player(&player_id).is_none() {
                send_error(ui_tx, format!("unknown player '{player_id}'")).await;
                return;
            }
            spawn_player_edit(state, EditKind::Contract, player_id, PlayerEdit::Contract(action));
        }
        UserCommand::Rumors(filter) => {
            state.spawn_service(move |svc| async move {
                ServiceEvent::RumorsLoaded {
                    filter,
                    response: svc.transfer_rumors(filter).await,
                }
            });
        }
        UserCommand::Track { rumor_id, tracked } => {
            state.spawn_service(move |svc| async move {
                ServiceEvent::RumorTracked(svc.track_rumor(&rumor_id, tracked).await)
            });
        }
        UserCommand::History { player_id } => {
            match state.db.load_assessments(&state.session_id, &player_id) {
                Ok(records) => {
                    let _ = ui_tx
                        .send(UiUpdate::History { player_id, records })
                        .await;
                }
                Err(e) => {
                    warn!("failed to load assessment history: {:#}", e);
                    send_error(ui_tx, format!("history unavailable: {e}")).await;
                }
            }
        }
        UserCommand::NewSession => match start_new_session(state) {
            Ok(()) => {
                let _ = ui_tx
                    .send(UiUpdate::Notice(format!("started {}", state.session_id)))
                    .await;
            }
            Err(e) => {
                warn!("failed to start a new session: {:#}", e);
                send_error(ui_tx, format!("could not reset session: {e}")).await;
            }
        },
        UserCommand::Quit => {}
    }
}

// ---------------------------------------------------------------------------
// Service results
// ---------------------------------------------------------------------------

pub async fn handle_service_event(
    state: &mut AppState,
    event: ServiceEvent,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    state.pending_requests = state.pending_requests.saturating_sub(1);

    match event {
        ServiceEvent::PlayerUpdated {
            kind,
            player_id,
            response,
        } => {
            let player = match response.into_result() {
                Ok(player) => player,
                Err(msg) => {
                    warn!("{:?} update for {} failed: {}", kind, player_id, msg);
                    send_error(ui_tx, format!("could not update {player_id}: {msg}")).await;
                    return;
                }
            };
            if kind == EditKind::Assessment {
                if let Err(e) = state.db.record_assessment(&state.session_id, &player) {
                    warn!("failed to record assessment for {}: {:#}", player_id, e);
                }
            }
            if let Err(e) = state.squad.dispatch(SquadAction::ReplacePlayer(player.clone())) {
                warn!("service returned a player the squad does not know: {}", e);
                send_error(ui_tx, e.to_string()).await;
                return;
            }
            info!("{:?} update applied for {}", kind, player_id);
            let _ = ui_tx.send(UiUpdate::PlayerCard(Box::new(player))).await;
            send_squad(state, ui_tx).await;
        }
        ServiceEvent::RumorsLoaded { filter, response } => match response.into_result() {
            Ok(rumors) => {
                debug!("{} {} rumors loaded", rumors.len(), filter);
                let _ = ui_tx.send(UiUpdate::Rumors { filter, rumors }).await;
            }
            Err(msg) => {
                warn!("failed to load rumors: {}", msg);
                send_error(ui_tx, format!("could not load rumors: {msg}")).await;
            }
        },
        ServiceEvent::RumorTracked(response) => match response.into_result() {
            Ok(rumor) => {
                let verb = if rumor.tracked { "tracking" } else { "stopped tracking" };
                let _ = ui_tx
                    .send(UiUpdate::Notice(format!("{verb} {} ({})", rumor.player_name, rumor.id)))
                    .await;
            }
            Err(msg) => {
                warn!("failed to track rumor: {}", msg);
                send_error(ui_tx, format!("could not track rumor: {msg}")).await;
            }
        },
    }
}

// ---------------------------------------------------------------------------
// Session recovery
// ---------------------------------------------------------------------------

/// Drop the stored lineup and assessment history and switch to a fresh
/// session id. The lineup on screen is saved again under the new session.
fn start_new_session(state: &mut AppState) -> anyhow::Result<()> {
    state.db.clear_session()?;
    let session_id = Database::generate_session_id();
    state.db.set_session_id(&session_id)?;
    info!("Session {} replaced by {}", state.session_id, session_id);
    state.session_id = session_id;
    state.persist_lineup();
    Ok(())
}

/// Re-apply the latest recorded assessment of each player in `session_id`.
/// Returns how many players were updated.
pub fn apply_saved_assessments(
    db: &Database,
    session_id: &str,
    players: &mut [Player],
) -> anyhow::Result<usize> {
    let mut applied = 0;
    for record in db.latest_assessments(session_id)? {
        match players.iter_mut().find(|p| p.id == record.player_id) {
            Some(player) => {
                record.apply_to(player);
                applied += 1;
            }
            None => warn!(
                "saved assessment for unknown player {}, skipping",
                record.player_id
            ),
        }
    }
    Ok(applied)
}

/// Restore the saved lineup from the previous session.
///
/// Returns `Ok(false)` when nothing was saved or the saved lineup no longer
/// matches the registry (it is discarded with a warning in that case).
pub fn recover_from_db(state: &mut AppState) -> anyhow::Result<bool> {
    let Some(saved) = state.db.load_lineup()? else {
        info!("No saved lineup for session {}, starting fresh", state.session_id);
        return Ok(false);
    };

    match state.squad.restore_lineup(saved) {
        Ok(()) => {
            info!(
                "Restored saved lineup ({}, {} players placed)",
                state.squad.formation(),
                state.squad.lineup().filled_count()
            );
            Ok(true)
        }
        Err(e) => {
            warn!("Saved lineup is inconsistent with the squad, ignoring: {}", e);
            Ok(false)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
