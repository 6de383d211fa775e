//! Plannable action categories and the regulatory oracle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geography::Tile;
use crate::vessel::Vessel;

/// Categories of action the planner can put in a plan. Each has its own
/// planning module and its own permit budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Deployment,
    OwnFadSet,
    OpportunisticFadSet,
    DolphinSet,
    NonAssociatedSet,
    Fishing,
}

impl ActionType {
    pub const ALL: [ActionType; 6] = [
        ActionType::Deployment,
        ActionType::OwnFadSet,
        ActionType::OpportunisticFadSet,
        ActionType::DolphinSet,
        ActionType::NonAssociatedSet,
        ActionType::Fishing,
    ];

    /// Three-letter code used in logbooks and regulation tables.
    pub fn code(&self) -> &'static str {
        match self {
            ActionType::Deployment => "DPL",
            ActionType::OwnFadSet => "FAD",
            ActionType::OpportunisticFadSet => "OFS",
            ActionType::DolphinSet => "DEL",
            ActionType::NonAssociatedSet => "NOA",
            ActionType::Fishing => "FSH",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Legality and permit counts. Both are re-queried every time; nothing in the
/// planner caches an answer.
pub trait Regulations {
    /// Would `action` at `tile` be legal right now?
    fn is_allowed(&self, vessel: &Vessel, tile: Tile, action: ActionType) -> bool;

    /// How many more actions of this type the vessel may still take.
    fn remaining_permitted(&self, vessel: &Vessel, action: ActionType) -> u32;
}

/// Everything is legal and nothing is capped.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anarchy;

impl Regulations for Anarchy {
    fn is_allowed(&self, _vessel: &Vessel, _tile: Tile, _action: ActionType) -> bool {
        true
    }

    fn remaining_permitted(&self, _vessel: &Vessel, _action: ActionType) -> u32 {
        u32::MAX
    }
}

/// A rectangle (inclusive) closed to some action types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedArea {
    pub min: Tile,
    pub max: Tile,
    pub closed_to: Vec<ActionType>,
}

impl ClosedArea {
    pub fn contains(&self, tile: Tile) -> bool {
        tile.x >= self.min.x && tile.x <= self.max.x && tile.y >= self.min.y && tile.y <= self.max.y
    }
}

/// Closed areas plus per-type caps on the actions a vessel has taken.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegulationTable {
    #[serde(default)]
    pub closed_areas: Vec<ClosedArea>,
    #[serde(default)]
    pub caps: BTreeMap<ActionType, u32>,
}

impl RegulationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cap(mut self, action: ActionType, cap: u32) -> Self {
        self.caps.insert(action, cap);
        self
    }

    pub fn with_closed_area(mut self, area: ClosedArea) -> Self {
        self.closed_areas.push(area);
        self
    }
}

impl Regulations for RegulationTable {
    fn is_allowed(&self, _vessel: &Vessel, tile: Tile, action: ActionType) -> bool {
        !self
            .closed_areas
            .iter()
            .any(|area| area.closed_to.contains(&action) && area.contains(tile))
    }

    fn remaining_permitted(&self, vessel: &Vessel, action: ActionType) -> u32 {
        match self.caps.get(&action) {
            Some(cap) => cap.saturating_sub(vessel.actions_taken(action)),
            None => u32::MAX,
        }
    }
}
