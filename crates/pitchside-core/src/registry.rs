// Mock data loading: squad sheet and transfer rumor CSV files.
//
// The squad sheet lists one player per row. Its `lineup` column places the
// player in the starting XI ("starting"), on the bench ("bench"), or nowhere
// (blank). Row order decides slot order.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::warn;

use crate::squad::assessment::{
    FAN_PULSE_MAX, RATING_MAX, RATING_MIN, VALUE_FOR_MONEY_MAX, VALUE_FOR_MONEY_MIN,
};
use crate::squad::player::{
    FanRatings, Player, PlayerStats, PlayerStatus, Position, Recommendation,
};
use crate::squad::transfer::{RumorStatus, TransferRumor};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Everything the squad sheet provides: the registry plus initial lineup.
#[derive(Debug, Clone, Default)]
pub struct SquadData {
    pub players: Vec<Player>,
    /// Player ids for the starting slots, in slot order.
    pub starting: Vec<String>,
    /// Player ids for the bench, in slot order.
    pub bench: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Raw CSV rows (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawPlayerRow {
    id: String,
    name: String,
    number: u8,
    position: String,
    image: Option<String>,
    appearances: u32,
    goals: u32,
    assists: u32,
    clean_sheets: Option<u32>,
    injured: bool,
    captain: bool,
    on_loan: bool,
    recommendation: Option<String>,
    rating: Option<i32>,
    value_for_money: Option<i32>,
    fan_pulse: Option<i32>,
    #[serde(default)]
    lineup: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRumorRow {
    id: String,
    player_name: String,
    from_club: String,
    to_club: String,
    fee_millions: f64,
    likelihood: u32,
    status: String,
    reported_on: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn clamp_logged(name: &str, field: &str, value: i32, min: i32, max: i32) -> i32 {
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!("{name}: {field} {value} out of range, clamped to {clamped}");
    }
    clamped
}

fn player_from_row(raw: RawPlayerRow) -> Option<(Player, Option<String>)> {
    let name = raw.name.trim().to_string();
    let id = raw.id.trim().to_string();
    if id.is_empty() {
        warn!("skipping player '{}': empty id", name);
        return None;
    }
    let Some(position) = Position::from_str_pos(&raw.position) else {
        warn!("skipping player '{}': unknown position '{}'", name, raw.position);
        return None;
    };

    let recommendation = match raw.recommendation.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(tag) => {
            let parsed = Recommendation::from_str_tag(tag);
            if parsed.is_none() {
                warn!("{}: ignoring unknown recommendation '{}'", name, tag);
            }
            parsed
        }
    };

    let ratings = FanRatings {
        rating: raw
            .rating
            .map(|v| clamp_logged(&name, "rating", v, RATING_MIN, RATING_MAX) as u8),
        value_for_money: raw.value_for_money.map(|v| {
            let (min, max) = (VALUE_FOR_MONEY_MIN, VALUE_FOR_MONEY_MAX);
            clamp_logged(&name, "value_for_money", v, min, max) as i8
        }),
        fan_pulse: raw
            .fan_pulse
            .map(|v| clamp_logged(&name, "fan_pulse", v, 0, FAN_PULSE_MAX) as u8),
    };

    let player = Player {
        id,
        name,
        number: raw.number,
        position,
        image: raw.image.filter(|s| !s.trim().is_empty()),
        stats: PlayerStats {
            appearances: raw.appearances,
            goals: raw.goals,
            assists: raw.assists,
            clean_sheets: raw.clean_sheets,
        },
        status: PlayerStatus {
            injured: raw.injured,
            captain: raw.captain,
            on_loan: raw.on_loan,
            recommendation,
        },
        ratings,
        comment: None,
        contract: Default::default(),
    };

    Some((player, raw.lineup))
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, enable testing without temp files)
// ---------------------------------------------------------------------------

fn load_squad_from_reader<R: Read>(rdr: R) -> Result<SquadData, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut data = SquadData::default();
    let mut seen: HashSet<String> = HashSet::new();

    for result in reader.deserialize::<RawPlayerRow>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed player row: {}", e);
                continue;
            }
        };
        let Some((player, lineup)) = player_from_row(raw) else {
            continue;
        };

        // Ids are only unique within one sheet; keep the first occurrence.
        if !seen.insert(player.id.clone()) {
            warn!(
                "duplicate player id '{}' ({}), keeping first occurrence",
                player.id, player.name
            );
            continue;
        }

        match lineup.as_deref().map(|s| s.trim().to_lowercase()).as_deref() {
            Some("starting") | Some("xi") => data.starting.push(player.id.clone()),
            Some("bench") | Some("sub") => data.bench.push(player.id.clone()),
            None | Some("") => {}
            Some(other) => warn!("{}: unknown lineup value '{}'", player.name, other),
        }
        data.players.push(player);
    }

    Ok(data)
}

fn load_rumors_from_reader<R: Read>(rdr: R) -> Result<Vec<TransferRumor>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut rumors = Vec::new();

    for result in reader.deserialize::<RawRumorRow>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed rumor row: {}", e);
                continue;
            }
        };
        let Some(status) = RumorStatus::from_str_status(&raw.status) else {
            warn!("skipping rumor '{}': unknown status '{}'", raw.id, raw.status);
            continue;
        };
        let reported_on = match NaiveDate::parse_from_str(raw.reported_on.trim(), "%Y-%m-%d") {
            Ok(d) => d,
            Err(e) => {
                warn!("skipping rumor '{}': bad date '{}': {}", raw.id, raw.reported_on, e);
                continue;
            }
        };
        if !raw.fee_millions.is_finite() || raw.fee_millions < 0.0 {
            warn!("skipping rumor '{}': invalid fee {}", raw.id, raw.fee_millions);
            continue;
        }
        rumors.push(TransferRumor {
            id: raw.id.trim().to_string(),
            player_name: raw.player_name.trim().to_string(),
            from_club: raw.from_club.trim().to_string(),
            to_club: raw.to_club.trim().to_string(),
            fee_millions: raw.fee_millions,
            likelihood: raw.likelihood.min(100) as u8,
            status,
            reported_on,
            tracked: false,
        });
    }

    Ok(rumors)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

/// Load the squad sheet from a CSV file.
pub fn load_squad(path: &Path) -> Result<SquadData, RegistryError> {
    let file = std::fs::File::open(path).map_err(|e| RegistryError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let data = load_squad_from_reader(file).map_err(|e| RegistryError::Csv {
        path: path.display().to_string(),
        source: e,
    })?;
    if data.players.is_empty() {
        return Err(RegistryError::Validation(format!(
            "squad sheet {} produced zero valid rows",
            path.display()
        )));
    }
    Ok(data)
}

/// Load transfer rumors from a CSV file. An empty board is valid.
pub fn load_rumors(path: &Path) -> Result<Vec<TransferRumor>, RegistryError> {
    let file = std::fs::File::open(path).map_err(|e| RegistryError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_rumors_from_reader(file).map_err(|e| RegistryError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
