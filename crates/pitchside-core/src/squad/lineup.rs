// Lineup slot collections and the drag/drop slot manager.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Which of the two slot collections a slot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Starting,
    Bench,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::Starting => write!(f, "starting"),
            Collection::Bench => write!(f, "bench"),
        }
    }
}

/// Address of a single slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRef {
    pub collection: Collection,
    pub index: usize,
}

impl SlotRef {
    pub fn starting(index: usize) -> Self {
        SlotRef {
            collection: Collection::Starting,
            index,
        }
    }

    pub fn bench(index: usize) -> Self {
        SlotRef {
            collection: Collection::Bench,
            index,
        }
    }
}

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.collection, self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineupError {
    #[error("slot {slot} does not exist")]
    SlotOutOfRange { slot: SlotRef },

    #[error("slot {slot} does not hold player '{player_id}'")]
    SourceMismatch { player_id: String, slot: SlotRef },

    #[error("no drag in progress")]
    NoActiveDrag,

    #[error("player '{player_id}' appears in more than one slot")]
    DuplicatePlayer { player_id: String },
}

/// The two slot collections. Slots hold player ids, never player records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineup {
    pub starting: Vec<Option<String>>,
    pub bench: Vec<Option<String>>,
}

impl Lineup {
    /// Build a lineup, rejecting any player id that appears twice.
    pub fn new(
        starting: Vec<Option<String>>,
        bench: Vec<Option<String>>,
    ) -> Result<Self, LineupError> {
        let lineup = Lineup { starting, bench };
        lineup.check_unique()?;
        Ok(lineup)
    }

    /// Err on the first player id found in more than one slot.
    pub fn check_unique(&self) -> Result<(), LineupError> {
        let mut seen = HashSet::new();
        for id in self.player_ids() {
            if !seen.insert(id) {
                return Err(LineupError::DuplicatePlayer {
                    player_id: id.to_string(),
                });
            }
        }
        Ok(())
    }

    fn collection(&self, c: Collection) -> &Vec<Option<String>> {
        match c {
            Collection::Starting => &self.starting,
            Collection::Bench => &self.bench,
        }
    }

    fn collection_mut(&mut self, c: Collection) -> &mut Vec<Option<String>> {
        match c {
            Collection::Starting => &mut self.starting,
            Collection::Bench => &mut self.bench,
        }
    }

    /// Contents of a slot. `Err` if the slot does not exist.
    pub fn get(&self, slot: SlotRef) -> Result<Option<&str>, LineupError> {
        self.collection(slot.collection)
            .get(slot.index)
            .map(|s| s.as_deref())
            .ok_or(LineupError::SlotOutOfRange { slot })
    }

    /// Exchange the contents of two slots. Covers both "move into an empty
    /// slot" and "swap two occupied slots". Swapping a slot with itself is a
    /// no-op.
    pub fn swap(&mut self, a: SlotRef, b: SlotRef) -> Result<(), LineupError> {
        self.get(a)?;
        self.get(b)?;
        if a == b {
            return Ok(());
        }
        if a.collection == b.collection {
            self.collection_mut(a.collection).swap(a.index, b.index);
        } else {
            let taken = self.collection_mut(a.collection)[a.index].take();
            let displaced =
                std::mem::replace(&mut self.collection_mut(b.collection)[b.index], taken);
            self.collection_mut(a.collection)[a.index] = displaced;
        }
        Ok(())
    }

    /// Every player id currently in a slot, starting slots first.
    pub fn player_ids(&self) -> impl Iterator<Item = &str> {
        self.starting
            .iter()
            .chain(self.bench.iter())
            .filter_map(|s| s.as_deref())
    }

    /// Where a player currently sits, if anywhere.
    pub fn find(&self, player_id: &str) -> Option<SlotRef> {
        if let Some(i) = self
            .starting
            .iter()
            .position(|s| s.as_deref() == Some(player_id))
        {
            return Some(SlotRef::starting(i));
        }
        self.bench
            .iter()
            .position(|s| s.as_deref() == Some(player_id))
            .map(SlotRef::bench)
    }

    /// Number of occupied slots across both collections.
    pub fn filled_count(&self) -> usize {
        self.player_ids().count()
    }
}

/// An in-progress drag gesture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragSession {
    pub player_id: String,
    pub source: SlotRef,
    /// Current hover target, used for highlight rendering only.
    pub hover: Option<SlotRef>,
}

/// What a completed drop did to the lineup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// Dropped back onto the originating slot.
    Unchanged,
    /// The target was empty; the dragged player moved into it.
    Moved { from: SlotRef, to: SlotRef },
    /// The target was occupied; `displaced` now sits in the source slot.
    Swapped {
        from: SlotRef,
        to: SlotRef,
        displaced: String,
    },
}

/// Owns the lineup and the drag session, and turns drag gestures into slot
/// exchanges.
#[derive(Debug, Clone, Default)]
pub struct SlotManager {
    lineup: Lineup,
    session: Option<DragSession>,
}

impl SlotManager {
    pub fn new(lineup: Lineup) -> Self {
        SlotManager {
            lineup,
            session: None,
        }
    }

    pub fn lineup(&self) -> &Lineup {
        &self.lineup
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    /// Replace the lineup wholesale (formation change, restore). Any drag in
    /// progress is discarded since its source slot may no longer exist.
    pub fn replace_lineup(&mut self, lineup: Lineup) {
        self.session = None;
        self.lineup = lineup;
    }

    /// Start dragging `player_id` out of `source`.
    ///
    /// The slot must currently hold that player. Starting a new drag while
    /// one is active replaces the old session.
    pub fn begin_drag(&mut self, player_id: &str, source: SlotRef) -> Result<(), LineupError> {
        match self.lineup.get(source)? {
            Some(id) if id == player_id => {}
            _ => {
                return Err(LineupError::SourceMismatch {
                    player_id: player_id.to_string(),
                    slot: source,
                })
            }
        }
        if let Some(old) = self.session.take() {
            debug!("drag of '{}' superseded by '{}'", old.player_id, player_id);
        }
        self.session = Some(DragSession {
            player_id: player_id.to_string(),
            source,
            hover: None,
        });
        Ok(())
    }

    /// Record the slot currently under the pointer.
    pub fn hover(&mut self, target: SlotRef) -> Result<(), LineupError> {
        self.lineup.get(target)?;
        let session = self.session.as_mut().ok_or(LineupError::NoActiveDrag)?;
        session.hover = Some(target);
        Ok(())
    }

    /// Finish the drag by dropping onto `target`.
    ///
    /// The session is consumed even when the drop fails, so a failed drop
    /// behaves like a cancelled gesture.
    pub fn drop_at(&mut self, target: SlotRef) -> Result<DropOutcome, LineupError> {
        let session = self.session.take().ok_or(LineupError::NoActiveDrag)?;

        // The source may have changed under us (e.g. a restore mid-drag).
        match self.lineup.get(session.source)? {
            Some(id) if id == session.player_id => {}
            _ => {
                return Err(LineupError::SourceMismatch {
                    player_id: session.player_id,
                    slot: session.source,
                })
            }
        }

        let displaced = self.lineup.get(target)?.map(str::to_string);
        if target == session.source {
            return Ok(DropOutcome::Unchanged);
        }

        self.lineup.swap(session.source, target)?;
        Ok(match displaced {
            Some(displaced) => DropOutcome::Swapped {
                from: session.source,
                to: target,
                displaced,
            },
            None => DropOutcome::Moved {
                from: session.source,
                to: target,
            },
        })
    }

    /// Abandon the current drag, if any. Leaves the lineup untouched.
    pub fn end_drag(&mut self) -> Option<DragSession> {
        self.session.take()
    }
}
