// Squad domain: players, formations, lineup slots and the state container.

pub mod assessment;
pub mod formation;
pub mod lineup;
pub mod player;
pub mod state;
pub mod transfer;
