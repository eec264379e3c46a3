// Player assessment: ratings, status flags and contract actions.
//
// All functions here are pure: they take a player by reference and return the
// updated record. Callers decide where the new record goes.

use serde::{Deserialize, Serialize};

use super::player::{ContractStatus, Player, Recommendation};

pub const RATING_MIN: i32 = 1;
pub const RATING_MAX: i32 = 10;
pub const VALUE_FOR_MONEY_MIN: i32 = -2;
pub const VALUE_FOR_MONEY_MAX: i32 = 2;
pub const FAN_PULSE_MAX: i32 = 100;

/// A fan's assessment of a player. Fields left `None` are not changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentEdit {
    pub rating: Option<i32>,
    pub value_for_money: Option<i32>,
    pub fan_pulse: Option<i32>,
    pub recommendation: Option<Recommendation>,
    /// Free text. An empty (or all-whitespace) comment clears the stored one.
    pub comment: Option<String>,
}

impl AssessmentEdit {
    pub fn is_empty(&self) -> bool {
        self == &AssessmentEdit::default()
    }
}

/// Status flag changes. Fields left `None` are not changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEdit {
    pub injured: Option<bool>,
    pub captain: Option<bool>,
    pub on_loan: Option<bool>,
    pub recommendation: Option<Recommendation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractAction {
    Renew,
    Expire,
}

impl ContractAction {
    pub fn from_str_action(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "renew" => Some(ContractAction::Renew),
            "expire" => Some(ContractAction::Expire),
            _ => None,
        }
    }
}

/// Apply an assessment, clamping every numeric field into its slider range.
pub fn apply_assessment(player: &Player, edit: &AssessmentEdit) -> Player {
    let mut updated = player.clone();

    if let Some(rating) = edit.rating {
        updated.ratings.rating = Some(rating.clamp(RATING_MIN, RATING_MAX) as u8);
    }
    if let Some(vfm) = edit.value_for_money {
        updated.ratings.value_for_money =
            Some(vfm.clamp(VALUE_FOR_MONEY_MIN, VALUE_FOR_MONEY_MAX) as i8);
    }
    if let Some(pulse) = edit.fan_pulse {
        updated.ratings.fan_pulse = Some(pulse.clamp(0, FAN_PULSE_MAX) as u8);
    }
    if let Some(rec) = edit.recommendation {
        updated.status.recommendation = Some(rec);
    }
    if let Some(comment) = &edit.comment {
        let trimmed = comment.trim();
        updated.comment = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
    }

    updated
}

pub fn apply_status(player: &Player, edit: &StatusEdit) -> Player {
    let mut updated = player.clone();
    if let Some(injured) = edit.injured {
        updated.status.injured = injured;
    }
    if let Some(captain) = edit.captain {
        updated.status.captain = captain;
    }
    if let Some(on_loan) = edit.on_loan {
        updated.status.on_loan = on_loan;
    }
    if let Some(rec) = edit.recommendation {
        updated.status.recommendation = Some(rec);
    }
    updated
}

pub fn apply_contract(player: &Player, action: ContractAction) -> Player {
    let mut updated = player.clone();
    updated.contract = match action {
        ContractAction::Renew => ContractStatus::Renewed,
        ContractAction::Expire => ContractStatus::Expiring,
    };
    updated
}
