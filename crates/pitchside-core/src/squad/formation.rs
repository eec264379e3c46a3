// Formation layout table and starting-slot reconciliation.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::player::Position;

/// Role label printed on a starting slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Goalkeeper,
    LeftBack,
    CentreBack,
    RightBack,
    LeftWingBack,
    RightWingBack,
    DefensiveMidfield,
    CentralMidfield,
    AttackingMidfield,
    LeftMidfield,
    RightMidfield,
    LeftWing,
    RightWing,
    Striker,
}

impl Role {
    pub fn display_str(&self) -> &'static str {
        match self {
            Role::Goalkeeper => "GK",
            Role::LeftBack => "LB",
            Role::CentreBack => "CB",
            Role::RightBack => "RB",
            Role::LeftWingBack => "LWB",
            Role::RightWingBack => "RWB",
            Role::DefensiveMidfield => "CDM",
            Role::CentralMidfield => "CM",
            Role::AttackingMidfield => "CAM",
            Role::LeftMidfield => "LM",
            Role::RightMidfield => "RM",
            Role::LeftWing => "LW",
            Role::RightWing => "RW",
            Role::Striker => "ST",
        }
    }

    /// The line this role belongs to.
    pub fn line(&self) -> Position {
        match self {
            Role::Goalkeeper => Position::Goalkeeper,
            Role::LeftBack
            | Role::CentreBack
            | Role::RightBack
            | Role::LeftWingBack
            | Role::RightWingBack => Position::Defender,
            Role::DefensiveMidfield
            | Role::CentralMidfield
            | Role::AttackingMidfield
            | Role::LeftMidfield
            | Role::RightMidfield => Position::Midfielder,
            Role::LeftWing | Role::RightWing | Role::Striker => Position::Forward,
        }
    }

    /// Whether a player of `position` may stand in this slot under the strict
    /// position policy: goalkeepers only in goal, outfielders anywhere else.
    pub fn accepts(&self, position: Position) -> bool {
        (self.line() == Position::Goalkeeper) == (position == Position::Goalkeeper)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// One starting slot of a formation: role label plus pitch coordinate.
///
/// Coordinates are normalized to `0.0..=1.0`, `y` running from the team's own
/// goal line (0.0) towards the opponent's (1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlotDescriptor {
    pub role: Role,
    pub x: f32,
    pub y: f32,
}

const fn slot(role: Role, x: f32, y: f32) -> SlotDescriptor {
    SlotDescriptor { role, x, y }
}

use Role::*;

const F442: &[SlotDescriptor] = &[
    slot(Goalkeeper, 0.5, 0.05),
    slot(LeftBack, 0.15, 0.25),
    slot(CentreBack, 0.35, 0.2),
    slot(CentreBack, 0.65, 0.2),
    slot(RightBack, 0.85, 0.25),
    slot(LeftMidfield, 0.15, 0.5),
    slot(CentralMidfield, 0.35, 0.45),
    slot(CentralMidfield, 0.65, 0.45),
    slot(RightMidfield, 0.85, 0.5),
    slot(Striker, 0.35, 0.8),
    slot(Striker, 0.65, 0.8),
];

const F433: &[SlotDescriptor] = &[
    slot(Goalkeeper, 0.5, 0.05),
    slot(LeftBack, 0.15, 0.25),
    slot(CentreBack, 0.35, 0.2),
    slot(CentreBack, 0.65, 0.2),
    slot(RightBack, 0.85, 0.25),
    slot(CentralMidfield, 0.3, 0.45),
    slot(CentralMidfield, 0.5, 0.4),
    slot(CentralMidfield, 0.7, 0.45),
    slot(LeftWing, 0.15, 0.75),
    slot(Striker, 0.5, 0.85),
    slot(RightWing, 0.85, 0.75),
];

const F4231: &[SlotDescriptor] = &[
    slot(Goalkeeper, 0.5, 0.05),
    slot(LeftBack, 0.15, 0.25),
    slot(CentreBack, 0.35, 0.2),
    slot(CentreBack, 0.65, 0.2),
    slot(RightBack, 0.85, 0.25),
    slot(DefensiveMidfield, 0.35, 0.4),
    slot(DefensiveMidfield, 0.65, 0.4),
    slot(LeftWing, 0.15, 0.65),
    slot(AttackingMidfield, 0.5, 0.62),
    slot(RightWing, 0.85, 0.65),
    slot(Striker, 0.5, 0.85),
];

const F352: &[SlotDescriptor] = &[
    slot(Goalkeeper, 0.5, 0.05),
    slot(CentreBack, 0.25, 0.2),
    slot(CentreBack, 0.5, 0.18),
    slot(CentreBack, 0.75, 0.2),
    slot(LeftWingBack, 0.1, 0.45),
    slot(CentralMidfield, 0.35, 0.45),
    slot(CentralMidfield, 0.65, 0.45),
    slot(RightWingBack, 0.9, 0.45),
    slot(AttackingMidfield, 0.5, 0.62),
    slot(Striker, 0.35, 0.82),
    slot(Striker, 0.65, 0.82),
];

const F532: &[SlotDescriptor] = &[
    slot(Goalkeeper, 0.5, 0.05),
    slot(LeftWingBack, 0.1, 0.3),
    slot(CentreBack, 0.3, 0.2),
    slot(CentreBack, 0.5, 0.18),
    slot(CentreBack, 0.7, 0.2),
    slot(RightWingBack, 0.9, 0.3),
    slot(CentralMidfield, 0.3, 0.5),
    slot(CentralMidfield, 0.5, 0.45),
    slot(CentralMidfield, 0.7, 0.5),
    slot(Striker, 0.35, 0.8),
    slot(Striker, 0.65, 0.8),
];

const F4141: &[SlotDescriptor] = &[
    slot(Goalkeeper, 0.5, 0.05),
    slot(LeftBack, 0.15, 0.25),
    slot(CentreBack, 0.35, 0.2),
    slot(CentreBack, 0.65, 0.2),
    slot(RightBack, 0.85, 0.25),
    slot(DefensiveMidfield, 0.5, 0.35),
    slot(LeftMidfield, 0.15, 0.55),
    slot(CentralMidfield, 0.38, 0.52),
    slot(CentralMidfield, 0.62, 0.52),
    slot(RightMidfield, 0.85, 0.55),
    slot(Striker, 0.5, 0.85),
];

const F343: &[SlotDescriptor] = &[
    slot(Goalkeeper, 0.5, 0.05),
    slot(CentreBack, 0.25, 0.2),
    slot(CentreBack, 0.5, 0.18),
    slot(CentreBack, 0.75, 0.2),
    slot(LeftMidfield, 0.15, 0.48),
    slot(CentralMidfield, 0.38, 0.45),
    slot(CentralMidfield, 0.62, 0.45),
    slot(RightMidfield, 0.85, 0.48),
    slot(LeftWing, 0.2, 0.78),
    slot(Striker, 0.5, 0.85),
    slot(RightWing, 0.8, 0.78),
];

const F541: &[SlotDescriptor] = &[
    slot(Goalkeeper, 0.5, 0.05),
    slot(LeftWingBack, 0.1, 0.3),
    slot(CentreBack, 0.3, 0.2),
    slot(CentreBack, 0.5, 0.18),
    slot(CentreBack, 0.7, 0.2),
    slot(RightWingBack, 0.9, 0.3),
    slot(LeftMidfield, 0.15, 0.55),
    slot(CentralMidfield, 0.38, 0.5),
    slot(CentralMidfield, 0.62, 0.5),
    slot(RightMidfield, 0.85, 0.55),
    slot(Striker, 0.5, 0.85),
];

// Seven-a-side.
const F231: &[SlotDescriptor] = &[
    slot(Goalkeeper, 0.5, 0.05),
    slot(CentreBack, 0.3, 0.25),
    slot(CentreBack, 0.7, 0.25),
    slot(LeftMidfield, 0.2, 0.5),
    slot(CentralMidfield, 0.5, 0.5),
    slot(RightMidfield, 0.8, 0.5),
    slot(Striker, 0.5, 0.82),
];

/// A named formation from the layout table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Formation {
    #[serde(rename = "4-4-2")]
    F442,
    #[serde(rename = "4-3-3")]
    F433,
    #[serde(rename = "4-2-3-1")]
    F4231,
    #[serde(rename = "3-5-2")]
    F352,
    #[serde(rename = "5-3-2")]
    F532,
    #[serde(rename = "4-1-4-1")]
    F4141,
    #[serde(rename = "3-4-3")]
    F343,
    #[serde(rename = "5-4-1")]
    F541,
    #[serde(rename = "2-3-1")]
    F231,
}

impl Formation {
    /// Every formation in the table, in menu order.
    pub const ALL: [Formation; 9] = [
        Formation::F442,
        Formation::F433,
        Formation::F4231,
        Formation::F352,
        Formation::F532,
        Formation::F4141,
        Formation::F343,
        Formation::F541,
        Formation::F231,
    ];

    /// Look up a formation by identifier. Dashes are optional, so "433",
    /// "4-3-3" and "T433" all resolve to the same layout.
    pub fn from_id(s: &str) -> Option<Self> {
        let key = s.trim().to_uppercase().replace('-', "");
        let key = key.strip_prefix('T').unwrap_or(&key);
        match key {
            "442" => Some(Formation::F442),
            "433" => Some(Formation::F433),
            "4231" => Some(Formation::F4231),
            "352" => Some(Formation::F352),
            "532" => Some(Formation::F532),
            "4141" => Some(Formation::F4141),
            "343" => Some(Formation::F343),
            "541" => Some(Formation::F541),
            "231" => Some(Formation::F231),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Formation::F442 => "4-4-2",
            Formation::F433 => "4-3-3",
            Formation::F4231 => "4-2-3-1",
            Formation::F352 => "3-5-2",
            Formation::F532 => "5-3-2",
            Formation::F4141 => "4-1-4-1",
            Formation::F343 => "3-4-3",
            Formation::F541 => "5-4-1",
            Formation::F231 => "2-3-1",
        }
    }

    /// Ordered starting-slot descriptors for this formation.
    pub fn slots(&self) -> &'static [SlotDescriptor] {
        match self {
            Formation::F442 => F442,
            Formation::F433 => F433,
            Formation::F4231 => F4231,
            Formation::F352 => F352,
            Formation::F532 => F532,
            Formation::F4141 => F4141,
            Formation::F343 => F343,
            Formation::F541 => F541,
            Formation::F231 => F231,
        }
    }

    /// Number of starting slots.
    pub fn size(&self) -> usize {
        self.slots().len()
    }

    /// Role label of starting slot `index`, if it exists.
    pub fn role_at(&self, index: usize) -> Option<Role> {
        self.slots().get(index).map(|s| s.role)
    }
}

impl fmt::Display for Formation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// A starting slot of the new formation paired with the player now in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotAssignment {
    pub index: usize,
    pub role: Role,
    pub x: f32,
    pub y: f32,
    pub player_id: Option<String>,
}

/// Pair `formation`'s slots with the current starting players by index.
///
/// Roles are not matched: slot `i` of the new layout receives whoever held
/// starting slot `i` before. Players beyond the new slot count are left out;
/// slots beyond the current player list come back empty.
pub fn reconcile(formation: Formation, current: &[Option<String>]) -> Vec<SlotAssignment> {
    formation
        .slots()
        .iter()
        .enumerate()
        .map(|(index, desc)| SlotAssignment {
            index,
            role: desc.role,
            x: desc.x,
            y: desc.y,
            player_id: current.get(index).cloned().flatten(),
        })
        .collect()
}

/// Player ids that `reconcile` would leave out of the starting lineup.
pub fn overflow(formation: Formation, current: &[Option<String>]) -> Vec<String> {
    current
        .iter()
        .skip(formation.size())
        .flatten()
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<Option<String>> {
        list.iter()
            .map(|s| if s.is_empty() { None } else { Some(s.to_string()) })
            .collect()
    }

    #[test]
    fn every_eleven_a_side_formation_has_eleven_slots_and_one_keeper() {
        for f in Formation::ALL {
            let keepers = f.slots().iter().filter(|s| s.role == Role::Goalkeeper).count();
            assert_eq!(keepers, 1, "{} should have exactly one GK slot", f);
            assert_eq!(f.role_at(0), Some(Role::Goalkeeper), "{} should start with GK", f);
            if f != Formation::F231 {
                assert_eq!(f.size(), 11, "{} should have 11 slots", f);
            }
        }
        assert_eq!(Formation::F231.size(), 7);
    }

    #[test]
    fn coordinates_are_normalized() {
        for f in Formation::ALL {
            for s in f.slots() {
                assert!((0.0..=1.0).contains(&s.x), "{} {} x out of range", f, s.role);
                assert!((0.0..=1.0).contains(&s.y), "{} {} y out of range", f, s.role);
            }
        }
    }

    #[test]
    fn line_counts_match_formation_name() {
        let count = |f: Formation, line: Position| {
            f.slots().iter().filter(|s| s.role.line() == line).count()
        };
        assert_eq!(count(Formation::F442, Position::Defender), 4);
        assert_eq!(count(Formation::F442, Position::Midfielder), 4);
        assert_eq!(count(Formation::F442, Position::Forward), 2);
        assert_eq!(count(Formation::F352, Position::Defender), 5);
        assert_eq!(count(Formation::F352, Position::Forward), 2);
        assert_eq!(count(Formation::F4231, Position::Midfielder), 3);
        assert_eq!(count(Formation::F4231, Position::Forward), 3);
    }

    #[test]
    fn from_id_accepts_dashless_and_prefixed_forms() {
        assert_eq!(Formation::from_id("4-3-3"), Some(Formation::F433));
        assert_eq!(Formation::from_id("433"), Some(Formation::F433));
        assert_eq!(Formation::from_id("T433"), Some(Formation::F433));
        assert_eq!(Formation::from_id(" 4-2-3-1 "), Some(Formation::F4231));
        assert_eq!(Formation::from_id("4-5-1"), None);
        assert_eq!(Formation::from_id(""), None);
    }

    #[test]
    fn id_roundtrip() {
        for f in Formation::ALL {
            assert_eq!(Formation::from_id(f.id()), Some(f));
        }
    }

    #[test]
    fn formation_serializes_as_id() {
        assert_eq!(serde_json::to_string(&Formation::F4141).unwrap(), "\"4-1-4-1\"");
        let f: Formation = serde_json::from_str("\"3-4-3\"").unwrap();
        assert_eq!(f, Formation::F343);
    }

    #[test]
    fn role_lines() {
        assert_eq!(Role::Goalkeeper.line(), Position::Goalkeeper);
        assert_eq!(Role::RightWingBack.line(), Position::Defender);
        assert_eq!(Role::AttackingMidfield.line(), Position::Midfielder);
        assert_eq!(Role::LeftWing.line(), Position::Forward);
    }

    #[test]
    fn role_accepts_keeps_goalkeepers_in_goal() {
        assert!(Role::Goalkeeper.accepts(Position::Goalkeeper));
        assert!(!Role::Goalkeeper.accepts(Position::Forward));
        assert!(!Role::Striker.accepts(Position::Goalkeeper));
        assert!(Role::Striker.accepts(Position::Defender));
        assert!(Role::CentreBack.accepts(Position::Midfielder));
    }

    #[test]
    fn reconcile_pairs_by_index_not_role() {
        let current = ids(&["p1", "p2", "p3", "p4", "p5", "p6", "p7", "p8", "p9", "p10", "p11"]);
        let out = reconcile(Formation::F352, &current);
        assert_eq!(out.len(), 11);
        // Index 4 is a wing-back in 3-5-2; the role changes, the fifth id stays.
        assert_eq!(out[4].role, Role::LeftWingBack);
        assert_eq!(out[4].player_id.as_deref(), Some("p5"));
        for (i, a) in out.iter().enumerate() {
            assert_eq!(a.index, i);
            assert_eq!(a.player_id, current[i]);
        }
    }

    #[test]
    fn reconcile_drops_trailing_players_when_shrinking() {
        let current = ids(&["p1", "p2", "p3", "p4", "p5", "p6", "p7", "p8", "p9", "p10", "p11"]);
        let out = reconcile(Formation::F231, &current);
        assert_eq!(out.len(), 7);
        assert_eq!(out[6].player_id.as_deref(), Some("p7"));
        assert_eq!(overflow(Formation::F231, &current), vec!["p8", "p9", "p10", "p11"]);
    }

    #[test]
    fn reconcile_leaves_new_slots_empty_when_growing() {
        let current = ids(&["p1", "p2", "", "p4", "p5", "p6", "p7"]);
        let out = reconcile(Formation::F433, &current);
        assert_eq!(out.len(), 11);
        assert!(out[2].player_id.is_none());
        assert!(out[7..].iter().all(|a| a.player_id.is_none()));
        assert!(overflow(Formation::F433, &current).is_empty());
    }

    #[test]
    fn reconcile_is_pure() {
        let current = ids(&["p1", "", "p3"]);
        let a = reconcile(Formation::F442, &current);
        let b = reconcile(Formation::F442, &current);
        assert_eq!(a, b);
        assert_eq!(current, ids(&["p1", "", "p3"]));
    }

    #[test]
    fn reconcile_copies_layout_coordinates() {
        let out = reconcile(Formation::F433, &[]);
        assert_eq!(out[9].role, Role::Striker);
        assert!((out[9].x - 0.5).abs() < f32::EPSILON);
        assert!((out[9].y - 0.85).abs() < f32::EPSILON);
    }
}
