// Squad service seam: the request/response contract of the squad backend and
// an in-memory mock with simulated latency.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::squad::assessment::{
    apply_assessment, apply_contract, apply_status, AssessmentEdit, ContractAction, StatusEdit,
};
use crate::squad::player::Player;
use crate::squad::transfer::{RumorBoard, RumorFilter, TransferRumor};

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// Envelope every service call returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub is_success: bool,
    pub status_code: u16,
    pub message: String,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            data: Some(data),
            is_success: true,
            status_code: 200,
            message: "OK".to_string(),
            errors: Vec::new(),
        }
    }

    pub fn not_found(what: &str, id: &str) -> Self {
        ApiResponse {
            data: None,
            is_success: false,
            status_code: 404,
            message: format!("{what} not found"),
            errors: vec![format!("no {what} with id '{id}'")],
        }
    }

    pub fn bad_request(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        ApiResponse {
            data: None,
            is_success: false,
            status_code: 400,
            message: "Bad request".to_string(),
            errors: vec![reason],
        }
    }

    /// Collapse the envelope into a `Result`, joining error details.
    pub fn into_result(self) -> Result<T, String> {
        match self.data {
            Some(data) if self.is_success => Ok(data),
            _ => {
                if self.errors.is_empty() {
                    Err(format!("{} ({})", self.message, self.status_code))
                } else {
                    Err(format!(
                        "{} ({}): {}",
                        self.message,
                        self.status_code,
                        self.errors.join("; ")
                    ))
                }
            }
        }
    }
}

/// Team overview returned by `squad`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquadSummary {
    pub team_id: String,
    pub players: Vec<Player>,
    /// Millions.
    pub transfer_budget: f64,
    /// Weekly wage headroom, thousands.
    pub wage_space: f64,
}

// ---------------------------------------------------------------------------
// Service trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SquadService: Send + Sync {
    async fn squad(&self, team_id: &str) -> ApiResponse<SquadSummary>;

    async fn update_status(&self, player_id: &str, edit: StatusEdit) -> ApiResponse<Player>;

    async fn update_rating(&self, player_id: &str, edit: AssessmentEdit) -> ApiResponse<Player>;

    async fn update_contract(&self, player_id: &str, action: ContractAction)
        -> ApiResponse<Player>;

    /// Rumors matching `filter`, most likely first.
    async fn transfer_rumors(&self, filter: RumorFilter) -> ApiResponse<Vec<TransferRumor>>;

    async fn track_rumor(&self, rumor_id: &str, tracked: bool) -> ApiResponse<TransferRumor>;
}

// ---------------------------------------------------------------------------
// Mock implementation
// ---------------------------------------------------------------------------

struct MockData {
    players: Vec<Player>,
    rumors: RumorBoard,
}

/// In-memory squad backend. Every call sleeps for `latency` before answering.
pub struct MockSquadService {
    team_id: String,
    transfer_budget: f64,
    wage_space: f64,
    latency: Duration,
    data: Mutex<MockData>,
}

impl MockSquadService {
    pub fn new(
        team_id: impl Into<String>,
        players: Vec<Player>,
        rumors: Vec<TransferRumor>,
    ) -> Self {
        MockSquadService {
            team_id: team_id.into(),
            transfer_budget: 0.0,
            wage_space: 0.0,
            latency: Duration::ZERO,
            data: Mutex::new(MockData {
                players,
                rumors: RumorBoard::new(rumors),
            }),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_finances(mut self, transfer_budget: f64, wage_space: f64) -> Self {
        self.transfer_budget = transfer_budget;
        self.wage_space = wage_space;
        self
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    /// Apply `f` to the stored player and return the stored result.
    async fn edit_player<F>(&self, player_id: &str, f: F) -> ApiResponse<Player>
    where
        F: FnOnce(&Player) -> Player + Send,
    {
        self.delay().await;
        let mut data = self.data.lock().await;
        match data.players.iter_mut().find(|p| p.id == player_id) {
            Some(stored) => {
                *stored = f(stored);
                debug!("mock service updated player {}", player_id);
                ApiResponse::ok(stored.clone())
            }
            None => {
                warn!("mock service: unknown player {}", player_id);
                ApiResponse::not_found("player", player_id)
            }
        }
    }
}

#[async_trait]
impl SquadService for MockSquadService {
    async fn squad(&self, team_id: &str) -> ApiResponse<SquadSummary> {
        self.delay().await;
        if team_id != self.team_id {
            return ApiResponse::not_found("team", team_id);
        }
        let data = self.data.lock().await;
        ApiResponse::ok(SquadSummary {
            team_id: self.team_id.clone(),
            players: data.players.clone(),
            transfer_budget: self.transfer_budget,
            wage_space: self.wage_space,
        })
    }

    async fn update_status(&self, player_id: &str, edit: StatusEdit) -> ApiResponse<Player> {
        self.edit_player(player_id, |p| apply_status(p, &edit)).await
    }

    async fn update_rating(&self, player_id: &str, edit: AssessmentEdit) -> ApiResponse<Player> {
        if edit.is_empty() {
            self.delay().await;
            return ApiResponse::bad_request("assessment has no fields set");
        }
        self.edit_player(player_id, |p| apply_assessment(p, &edit)).await
    }

    async fn update_contract(
        &self,
        player_id: &str,
        action: ContractAction,
    ) -> ApiResponse<Player> {
        self.edit_player(player_id, |p| apply_contract(p, action)).await
    }

    async fn transfer_rumors(&self, filter: RumorFilter) -> ApiResponse<Vec<TransferRumor>> {
        self.delay().await;
        let data = self.data.lock().await;
        ApiResponse::ok(data.rumors.query(filter).into_iter().cloned().collect())
    }

    async fn track_rumor(&self, rumor_id: &str, tracked: bool) -> ApiResponse<TransferRumor> {
        self.delay().await;
        let mut data = self.data.lock().await;
        match data.rumors.set_tracked(rumor_id, tracked) {
            Some(rumor) => ApiResponse::ok(rumor.clone()),
            None => ApiResponse::not_found("rumor", rumor_id),
        }
    }
}
