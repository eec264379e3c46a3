// Player records: identity, display attributes, stats, status flags and fan ratings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The line a player naturally plays in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
}

impl Position {
    /// Parse a position string into a Position.
    ///
    /// Accepts both the short forms used on squad sheets ("GK", "DEF", "MID",
    /// "FWD") and the long forms ("Goalkeeper", "Defender", ...).
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "GK" | "G" | "GOALKEEPER" => Some(Position::Goalkeeper),
            "DEF" | "D" | "DEFENDER" => Some(Position::Defender),
            "MID" | "M" | "MIDFIELDER" => Some(Position::Midfielder),
            "FWD" | "F" | "FW" | "FORWARD" | "ATTACKER" => Some(Position::Forward),
            _ => None,
        }
    }

    /// Return the display string for this position.
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Goalkeeper => "GK",
            Position::Defender => "DEF",
            Position::Midfielder => "MID",
            Position::Forward => "FWD",
        }
    }

    /// Deterministic ordering index for squad listings (back to front).
    pub fn sort_order(&self) -> u8 {
        match self {
            Position::Goalkeeper => 0,
            Position::Defender => 1,
            Position::Midfielder => 2,
            Position::Forward => 3,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// A user-assigned advisory tag on a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Keep,
    Sell,
    Loan,
    Promote,
    Bench,
}

impl Recommendation {
    pub fn from_str_tag(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "keep" => Some(Recommendation::Keep),
            "sell" => Some(Recommendation::Sell),
            "loan" => Some(Recommendation::Loan),
            "promote" => Some(Recommendation::Promote),
            "bench" => Some(Recommendation::Bench),
            _ => None,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Recommendation::Keep => "keep",
            Recommendation::Sell => "sell",
            Recommendation::Loan => "loan",
            Recommendation::Promote => "promote",
            Recommendation::Bench => "bench",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// Where a player's contract stands after the last contract action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    #[default]
    Active,
    Renewed,
    Expiring,
}

/// Season counting stats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub appearances: u32,
    pub goals: u32,
    pub assists: u32,
    /// Only tracked for goalkeepers and defenders.
    #[serde(default)]
    pub clean_sheets: Option<u32>,
}

/// Status flags shown on the player card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub injured: bool,
    pub captain: bool,
    pub on_loan: bool,
    #[serde(default)]
    pub recommendation: Option<Recommendation>,
}

/// Fan-facing scalar ratings. `None` means "not rated yet".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanRatings {
    /// 1..=10
    #[serde(default)]
    pub rating: Option<u8>,
    /// -2..=2
    #[serde(default)]
    pub value_for_money: Option<i8>,
    /// 0..=100
    #[serde(default)]
    pub fan_pulse: Option<u8>,
}

/// A squad member. Plain value record; identity is `id` only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub number: u8,
    pub position: Position,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub stats: PlayerStats,
    #[serde(default)]
    pub status: PlayerStatus,
    #[serde(default)]
    pub ratings: FanRatings,
    /// Free-text note from the most recent assessment.
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub contract: ContractStatus,
}

impl Player {
    /// Create a player with empty stats, flags and ratings.
    pub fn new(id: &str, name: &str, number: u8, position: Position) -> Self {
        Player {
            id: id.to_string(),
            name: name.to_string(),
            number,
            position,
            image: None,
            stats: PlayerStats::default(),
            status: PlayerStatus::default(),
            ratings: FanRatings::default(),
            comment: None,
            contract: ContractStatus::default(),
        }
    }

    /// Whether the assessment controls should be enabled for this player.
    ///
    /// Injured players are shown read-only. This is a presentation rule: the
    /// assessment functions themselves do not refuse injured players.
    pub fn is_editable(&self) -> bool {
        !self.status.injured
    }

    /// Short label used in listings, e.g. `#9 Haaland (FWD)`.
    pub fn label(&self) -> String {
        format!("#{} {} ({})", self.number, self.name, self.position)
    }
}
