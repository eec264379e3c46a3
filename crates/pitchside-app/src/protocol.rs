// Messages between the console, the application loop and service tasks.

use pitchside_core::service::ApiResponse;
use pitchside_core::squad::assessment::{AssessmentEdit, ContractAction};
use pitchside_core::squad::formation::Formation;
use pitchside_core::squad::lineup::SlotRef;
use pitchside_core::squad::player::{Player, Recommendation};
use pitchside_core::squad::state::{LineupSnapshot, PlayerSummary};
use pitchside_core::squad::transfer::{RumorFilter, TransferRumor};

use crate::db::AssessmentRecord;

/// Status flag the console can toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFlag {
    Injured,
    Captain,
    OnLoan,
}

/// Commands from the console to the application loop.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    Show,
    Drag { player_id: String, source: SlotRef },
    Hover(SlotRef),
    Drop(SlotRef),
    Cancel,
    SetFormation(Formation),
    Rate { player_id: String, edit: AssessmentEdit },
    Recommend { player_id: String, recommendation: Recommendation },
    SetFlag { player_id: String, flag: StatusFlag, on: bool },
    Contract { player_id: String, action: ContractAction },
    Rumors(RumorFilter),
    Track { rumor_id: String, tracked: bool },
    History { player_id: String },
    /// Wipe the saved lineup and history and start a fresh session id.
    NewSession,
    Quit,
}

/// Which kind of player edit a service response answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Assessment,
    Status,
    Contract,
}

/// Results of spawned service calls, sent back to the application loop.
#[derive(Debug, Clone)]
pub enum ServiceEvent {
    PlayerUpdated {
        kind: EditKind,
        player_id: String,
        response: ApiResponse<Player>,
    },
    RumorsLoaded {
        filter: RumorFilter,
        response: ApiResponse<Vec<TransferRumor>>,
    },
    RumorTracked(ApiResponse<TransferRumor>),
}

/// Everything the console needs to draw the squad screen.
#[derive(Debug, Clone, PartialEq)]
pub struct SquadView {
    pub snapshot: LineupSnapshot,
    pub reserves: Vec<PlayerSummary>,
    pub transfer_budget: f64,
    pub wage_space: f64,
}

/// Updates pushed from the application loop to the console.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    Squad(Box<SquadView>),
    /// A player's card after a confirmed edit.
    PlayerCard(Box<Player>),
    Rumors {
        filter: RumorFilter,
        rumors: Vec<TransferRumor>,
    },
    History {
        player_id: String,
        records: Vec<AssessmentRecord>,
    },
    /// Informational line, e.g. "saving...".
    Notice(String),
    /// A failed action or service call.
    Error(String),
}
