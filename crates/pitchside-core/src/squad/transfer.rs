// Transfer rumor board.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RumorStatus {
    Rumour,
    Advanced,
    Done,
    Collapsed,
}

impl RumorStatus {
    pub fn from_str_status(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "rumour" | "rumor" => Some(RumorStatus::Rumour),
            "advanced" => Some(RumorStatus::Advanced),
            "done" | "complete" | "completed" => Some(RumorStatus::Done),
            "collapsed" | "off" => Some(RumorStatus::Collapsed),
            _ => None,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            RumorStatus::Rumour => "rumour",
            RumorStatus::Advanced => "advanced",
            RumorStatus::Done => "done",
            RumorStatus::Collapsed => "collapsed",
        }
    }

    /// Whether the story can still move.
    pub fn is_open(&self) -> bool {
        matches!(self, RumorStatus::Rumour | RumorStatus::Advanced)
    }
}

impl fmt::Display for RumorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRumor {
    pub id: String,
    pub player_name: String,
    pub from_club: String,
    pub to_club: String,
    /// Reported fee in millions.
    pub fee_millions: f64,
    /// 0..=100
    pub likelihood: u8,
    pub status: RumorStatus,
    pub reported_on: NaiveDate,
    #[serde(default)]
    pub tracked: bool,
}

/// Which rumors a listing shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RumorFilter {
    #[default]
    All,
    /// Rumours and advanced talks.
    Open,
    Status(RumorStatus),
    Tracked,
}

impl RumorFilter {
    /// `open`, `tracked`, or any status word.
    pub fn from_str_filter(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "all" => Some(RumorFilter::All),
            "open" => Some(RumorFilter::Open),
            "tracked" => Some(RumorFilter::Tracked),
            other => RumorStatus::from_str_status(other).map(RumorFilter::Status),
        }
    }
}

impl fmt::Display for RumorFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RumorFilter::All => write!(f, "all"),
            RumorFilter::Open => write!(f, "open"),
            RumorFilter::Status(status) => write!(f, "{status}"),
            RumorFilter::Tracked => write!(f, "tracked"),
        }
    }
}

/// In-memory rumor board with the queries the transfers view needs.
#[derive(Debug, Clone, Default)]
pub struct RumorBoard {
    rumors: Vec<TransferRumor>,
}

impl RumorBoard {
    pub fn new(rumors: Vec<TransferRumor>) -> Self {
        RumorBoard { rumors }
    }

    pub fn with_status(&self, status: RumorStatus) -> Vec<&TransferRumor> {
        self.rumors.iter().filter(|r| r.status == status).collect()
    }

    pub fn tracked(&self) -> Vec<&TransferRumor> {
        self.rumors.iter().filter(|r| r.tracked).collect()
    }

    /// Rumors matching `filter`, most likely first; ties broken by most
    /// recent report.
    pub fn query(&self, filter: RumorFilter) -> Vec<&TransferRumor> {
        let mut hits: Vec<&TransferRumor> = match filter {
            RumorFilter::All => self.rumors.iter().collect(),
            RumorFilter::Open => self.rumors.iter().filter(|r| r.status.is_open()).collect(),
            RumorFilter::Status(status) => self.with_status(status),
            RumorFilter::Tracked => self.tracked(),
        };
        hits.sort_by(|a, b| {
            b.likelihood
                .cmp(&a.likelihood)
                .then_with(|| b.reported_on.cmp(&a.reported_on))
        });
        hits
    }

    /// Set the tracked flag. Returns the updated rumor, or `None` for an
    /// unknown id.
    pub fn set_tracked(&mut self, id: &str, tracked: bool) -> Option<&TransferRumor> {
        let rumor = self.rumors.iter_mut().find(|r| r.id == id)?;
        rumor.tracked = tracked;
        Some(&*rumor)
    }
}
