// Pitchside entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Open database, resolve the session id
// 4. Load mock data, re-apply saved assessments
// 5. Build the mock service and fetch the squad through it
// 6. Build SquadState, restore the saved lineup
// 7. Spawn the app loop, run the console until quit

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

use pitchside_app::app;
use pitchside_app::config;
use pitchside_app::console;
use pitchside_app::db::Database;
use pitchside_core::registry;
use pitchside_core::service::{MockSquadService, SquadService};
use pitchside_core::squad::state::SquadState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Tracing
    init_tracing()?;
    info!("Pitchside starting up");

    // 2. Config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: team={}, formation={}, policy={:?}",
        config.squad.team_id, config.formation, config.position_policy
    );

    // 3. Database and session
    let db_path = config.resolve_db_path();
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let db_path_str = db_path.to_string_lossy().to_string();
    let db = Database::open(&db_path_str).context("failed to open database")?;
    info!("Database opened at {}", db_path_str);

    let session_id = match db.get_session_id()? {
        Some(id) => {
            info!("Resuming session {}", id);
            id
        }
        None => {
            let id = Database::generate_session_id();
            db.set_session_id(&id)?;
            info!("Started new session {}", id);
            id
        }
    };

    // 4. Mock data
    let mut squad_data = registry::load_squad(Path::new(&config.squad.squad_csv))
        .context("failed to load squad sheet")?;
    let rumors = registry::load_rumors(Path::new(&config.squad.transfers_csv))
        .context("failed to load transfer rumors")?;
    info!(
        "Loaded {} players ({} starting, {} bench), {} rumors",
        squad_data.players.len(),
        squad_data.starting.len(),
        squad_data.bench.len(),
        rumors.len()
    );
    let restored = app::apply_saved_assessments(&db, &session_id, &mut squad_data.players)
        .context("failed to re-apply saved assessments")?;
    if restored > 0 {
        info!("Re-applied {} saved assessments", restored);
    }

    // 5. Service
    let service: Arc<dyn SquadService> = Arc::new(
        MockSquadService::new(config.squad.team_id.clone(), squad_data.players, rumors)
            .with_finances(config.squad.transfer_budget, config.squad.wage_space)
            .with_latency(Duration::from_millis(config.latency_ms)),
    );
    let summary = service
        .squad(&config.squad.team_id)
        .await
        .into_result()
        .map_err(anyhow::Error::msg)
        .context("failed to fetch squad")?;

    // 6. Squad state
    let squad = SquadState::new(
        summary.players,
        config.formation,
        squad_data.starting,
        squad_data.bench,
        config.position_policy,
    )
    .context("squad sheet lineup is inconsistent")?;

    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (svc_tx, svc_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    let mut app_state = app::AppState::new(config, squad, db, session_id, service, svc_tx);
    app_state.transfer_budget = summary.transfer_budget;
    app_state.wage_space = summary.wage_space;

    match app::recover_from_db(&mut app_state) {
        Ok(true) => info!("Lineup restored from previous session"),
        Ok(false) => info!("Using lineup from the squad sheet"),
        Err(e) => {
            error!("Session recovery failed: {}", e);
            return Err(e.context("session recovery failed"));
        }
    }

    // 7. Run
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, svc_rx, ui_tx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });

    if let Err(e) = console::run(ui_rx, cmd_tx).await {
        error!("Console error: {}", e);
    }

    let _ = tokio::time::timeout(Duration::from_secs(5), app_handle).await;

    info!("Pitchside shut down cleanly");
    Ok(())
}

/// Initialize tracing to a file so stdout stays free for the console.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("pitchside.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pitchside=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
