// Squad state container: player registry, current formation, lineup and drag
// session, mutated only through `dispatch`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::formation::{overflow, reconcile, Formation, Role};
use super::lineup::{
    Collection, DragSession, DropOutcome, Lineup, LineupError, SlotManager, SlotRef,
};
use super::player::{Player, Position, Recommendation};

/// How strictly drops are checked against slot roles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionPolicy {
    /// Any player may go into any slot.
    #[default]
    Permissive,
    /// Goalkeepers only in the GK slot, outfielders anywhere else.
    Strict,
}

impl PositionPolicy {
    pub fn from_str_policy(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "permissive" => Some(PositionPolicy::Permissive),
            "strict" => Some(PositionPolicy::Strict),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SquadError {
    #[error("unknown player '{0}'")]
    UnknownPlayer(String),

    #[error("player '{0}' is listed twice in the registry")]
    DuplicateRegistryId(String),

    #[error("{player_id} ({position}) cannot fill the {role} slot")]
    IncompatibleRole {
        player_id: String,
        position: Position,
        role: Role,
    },

    #[error(transparent)]
    Lineup(#[from] LineupError),
}

/// Every state transition the squad screen can request.
#[derive(Debug, Clone, PartialEq)]
pub enum SquadAction {
    BeginDrag { player_id: String, source: SlotRef },
    Hover { target: SlotRef },
    Drop { target: SlotRef },
    EndDrag,
    SetFormation(Formation),
    /// Swap in an updated record for an existing player (e.g. a service
    /// response after a rating edit).
    ReplacePlayer(Player),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    DragStarted,
    Hovered,
    Dropped(DropOutcome),
    /// `None` when there was no drag to cancel.
    DragCancelled(Option<DragSession>),
    FormationChanged {
        formation: Formation,
        /// Starters that no longer fit the new layout.
        dropped: Vec<String>,
    },
    PlayerReplaced { player_id: String },
}

// ---------------------------------------------------------------------------
// Snapshot views
// ---------------------------------------------------------------------------

/// What a player card shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: String,
    pub name: String,
    pub number: u8,
    pub position: Position,
    pub injured: bool,
    pub captain: bool,
    pub on_loan: bool,
    pub rating: Option<u8>,
    pub recommendation: Option<Recommendation>,
}

impl From<&Player> for PlayerSummary {
    fn from(p: &Player) -> Self {
        PlayerSummary {
            id: p.id.clone(),
            name: p.name.clone(),
            number: p.number,
            position: p.position,
            injured: p.status.injured,
            captain: p.status.captain,
            on_loan: p.status.on_loan,
            rating: p.ratings.rating,
            recommendation: p.status.recommendation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotView {
    pub index: usize,
    pub role: Role,
    pub x: f32,
    pub y: f32,
    pub player: Option<PlayerSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchView {
    pub index: usize,
    pub player: Option<PlayerSummary>,
}

/// Immutable view of the squad at one revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupSnapshot {
    pub formation: Formation,
    pub starting: Vec<SlotView>,
    pub bench: Vec<BenchView>,
    pub drag: Option<DragSession>,
    pub revision: u64,
}

/// Lineup persisted between sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedLineup {
    pub formation: Formation,
    pub starting: Vec<Option<String>>,
    pub bench: Vec<Option<String>>,
}

// ---------------------------------------------------------------------------
// SquadState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SquadState {
    players: Vec<Player>,
    formation: Formation,
    slots: SlotManager,
    policy: PositionPolicy,
    revision: u64,
}

/// Fit a starting list to `size` slots, padding with empties. Players past
/// the end are cut and logged.
fn fit_starting(mut starting: Vec<Option<String>>, formation: Formation) -> Vec<Option<String>> {
    let cut = overflow(formation, &starting);
    if !cut.is_empty() {
        warn!(
            "{} has {} starting slots, leaving out: {}",
            formation,
            formation.size(),
            cut.join(", ")
        );
    }
    starting.resize(formation.size(), None);
    starting
}

impl SquadState {
    /// Build the state from a registry and initial lineup ids.
    ///
    /// Every lineup id must exist in `players` and appear once. The starting
    /// list is padded or cut to the formation's slot count.
    pub fn new(
        players: Vec<Player>,
        formation: Formation,
        starting_ids: Vec<String>,
        bench_ids: Vec<String>,
        policy: PositionPolicy,
    ) -> Result<Self, SquadError> {
        for (i, p) in players.iter().enumerate() {
            if players[..i].iter().any(|q| q.id == p.id) {
                return Err(SquadError::DuplicateRegistryId(p.id.clone()));
            }
        }

        let starting = fit_starting(starting_ids.into_iter().map(Some).collect(), formation);
        let bench = bench_ids.into_iter().map(Some).collect();
        let lineup = Lineup::new(starting, bench)?;

        let state = SquadState {
            players,
            formation,
            slots: SlotManager::new(lineup),
            policy,
            revision: 0,
        };
        state.check_known(state.slots.lineup())?;
        Ok(state)
    }

    fn check_known(&self, lineup: &Lineup) -> Result<(), SquadError> {
        match lineup.player_ids().find(|id| self.player(id).is_none()) {
            Some(id) => Err(SquadError::UnknownPlayer(id.to_string())),
            None => Ok(()),
        }
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn formation(&self) -> Formation {
        self.formation
    }

    pub fn lineup(&self) -> &Lineup {
        self.slots.lineup()
    }

    pub fn drag(&self) -> Option<&DragSession> {
        self.slots.session()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Registry players holding no slot, ordered by position.
    pub fn reserves(&self) -> Vec<&Player> {
        let lineup = self.slots.lineup();
        let mut out: Vec<&Player> = self
            .players
            .iter()
            .filter(|p| lineup.find(&p.id).is_none())
            .collect();
        out.sort_by_key(|p| (p.position.sort_order(), p.number));
        out
    }

    /// Apply one action. State is untouched on `Err`, except that a failed
    /// drop still ends the drag.
    pub fn dispatch(&mut self, action: SquadAction) -> Result<ActionOutcome, SquadError> {
        let outcome = match action {
            SquadAction::BeginDrag { player_id, source } => {
                if self.player(&player_id).is_none() {
                    return Err(SquadError::UnknownPlayer(player_id));
                }
                self.slots.begin_drag(&player_id, source)?;
                debug!("drag started: {} from {}", player_id, source);
                ActionOutcome::DragStarted
            }
            SquadAction::Hover { target } => {
                self.slots.hover(target)?;
                ActionOutcome::Hovered
            }
            SquadAction::Drop { target } => {
                if let Err(e) = self.check_drop(target) {
                    self.slots.end_drag();
                    self.revision += 1;
                    return Err(e);
                }
                match self.slots.drop_at(target) {
                    Ok(outcome) => {
                        info!("lineup drop: {:?}", outcome);
                        ActionOutcome::Dropped(outcome)
                    }
                    Err(LineupError::NoActiveDrag) => return Err(LineupError::NoActiveDrag.into()),
                    Err(e) => {
                        // drop_at already consumed the session.
                        self.revision += 1;
                        return Err(e.into());
                    }
                }
            }
            SquadAction::EndDrag => {
                let ended = self.slots.end_drag();
                if ended.is_none() {
                    return Ok(ActionOutcome::DragCancelled(None));
                }
                ActionOutcome::DragCancelled(ended)
            }
            SquadAction::SetFormation(formation) => self.set_formation(formation)?,
            SquadAction::ReplacePlayer(player) => {
                let slot = self
                    .players
                    .iter_mut()
                    .find(|p| p.id == player.id)
                    .ok_or_else(|| SquadError::UnknownPlayer(player.id.clone()))?;
                let player_id = player.id.clone();
                *slot = player;
                ActionOutcome::PlayerReplaced { player_id }
            }
        };
        self.revision += 1;
        Ok(outcome)
    }

    /// Role check for a pending drop under the strict policy. Checks both the
    /// dragged player entering the target and any displaced player entering
    /// the source.
    fn check_drop(&self, target: SlotRef) -> Result<(), SquadError> {
        if self.policy == PositionPolicy::Permissive {
            return Ok(());
        }
        let Some(session) = self.slots.session() else {
            return Ok(());
        };
        let lineup = self.slots.lineup();

        let mut moves = vec![(session.player_id.clone(), target)];
        if let Ok(Some(displaced)) = lineup.get(target) {
            moves.push((displaced.to_string(), session.source));
        }

        for (player_id, slot) in moves {
            if slot.collection != Collection::Starting {
                continue;
            }
            let (Some(role), Some(player)) =
                (self.formation.role_at(slot.index), self.player(&player_id))
            else {
                continue;
            };
            if !role.accepts(player.position) {
                return Err(SquadError::IncompatibleRole {
                    player_id,
                    position: player.position,
                    role,
                });
            }
        }
        Ok(())
    }

    fn set_formation(&mut self, formation: Formation) -> Result<ActionOutcome, SquadError> {
        let current = &self.slots.lineup().starting;
        let dropped = overflow(formation, current);
        let starting: Vec<Option<String>> = reconcile(formation, current)
            .into_iter()
            .map(|a| a.player_id)
            .collect();
        if !dropped.is_empty() {
            warn!(
                "formation {} drops {} starter(s): {}",
                formation,
                dropped.len(),
                dropped.join(", ")
            );
        }
        let lineup = Lineup::new(starting, self.slots.lineup().bench.clone())?;
        self.slots.replace_lineup(lineup);
        info!("formation changed {} -> {}", self.formation, formation);
        self.formation = formation;
        Ok(ActionOutcome::FormationChanged { formation, dropped })
    }

    pub fn snapshot(&self) -> LineupSnapshot {
        let lineup = self.slots.lineup();
        let summary = |id: &Option<String>| -> Option<PlayerSummary> {
            id.as_deref()
                .and_then(|id| self.player(id))
                .map(PlayerSummary::from)
        };
        let starting = self
            .formation
            .slots()
            .iter()
            .enumerate()
            .map(|(index, desc)| SlotView {
                index,
                role: desc.role,
                x: desc.x,
                y: desc.y,
                player: lineup.starting.get(index).and_then(summary),
            })
            .collect();
        let bench = lineup
            .bench
            .iter()
            .enumerate()
            .map(|(index, id)| BenchView {
                index,
                player: summary(id),
            })
            .collect();

        LineupSnapshot {
            formation: self.formation,
            starting,
            bench,
            drag: self.slots.session().cloned(),
            revision: self.revision,
        }
    }

    pub fn saved_lineup(&self) -> SavedLineup {
        let lineup = self.slots.lineup();
        SavedLineup {
            formation: self.formation,
            starting: lineup.starting.clone(),
            bench: lineup.bench.clone(),
        }
    }

    /// Replace formation and lineup with a saved copy.
    ///
    /// Rejected (state unchanged) when the saved lineup names a player the
    /// registry does not know or repeats an id.
    pub fn restore_lineup(&mut self, saved: SavedLineup) -> Result<(), SquadError> {
        let starting = fit_starting(saved.starting, saved.formation);
        let lineup = Lineup::new(starting, saved.bench)?;
        self.check_known(&lineup)?;
        self.formation = saved.formation;
        self.slots.replace_lineup(lineup);
        self.revision += 1;
        Ok(())
    }
}
