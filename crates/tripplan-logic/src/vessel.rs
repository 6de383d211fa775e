//! The vessel as the planner sees it: where it is, how fast it goes, what it
//! carries, and the FADs it has in the water.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::actions::AtomicAction;
use crate::biology::Biology;
use crate::geography::Tile;
use crate::regulation::ActionType;

/// Added to hold weights before comparing against capacity.
pub const HOLD_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FadId(pub u64);

impl std::fmt::Display for FadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FAD#{}", self.0)
    }
}

/// A drifting fish aggregating device owned by a vessel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fad {
    pub id: FadId,
    /// `None` once the device has been lost (beached, destroyed, set upon).
    pub location: Option<Tile>,
    pub biology: Biology,
    /// Simulation hour at which it was deployed.
    pub deployed_at: f64,
}

impl Fad {
    pub fn new(id: FadId, location: Tile, biology: Biology, deployed_at: f64) -> Self {
        Self {
            id,
            location: Some(location),
            biology,
            deployed_at,
        }
    }

    pub fn is_lost(&self) -> bool {
        self.location.is_none()
    }
}

/// Monetary cost of steaming around.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TripCosts {
    /// Crew, opportunity and other time-proportional costs.
    pub per_hour: f64,
    /// Fuel.
    pub per_km: f64,
}

impl Default for TripCosts {
    fn default() -> Self {
        Self {
            per_hour: 0.0,
            per_km: 0.0,
        }
    }
}

impl TripCosts {
    /// Cost of spending `hours` steaming at `speed_kph`.
    pub fn cost_of_steaming(&self, hours: f64, speed_kph: f64) -> f64 {
        hours * self.per_hour + hours * speed_kph * self.per_km
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vessel {
    pub id: u32,
    pub home_port: Tile,
    pub location: Tile,
    pub speed_kph: f64,
    pub hold_capacity: f64,
    pub hold: f64,
    pub hours_at_sea: f64,
    pub allowed_at_sea: bool,
    pub fads: Vec<Fad>,
    pub fads_in_stock: u32,
    /// Maximum number of FADs the vessel may have in the water at once.
    pub active_fad_cap: u32,
    pub costs: TripCosts,
    /// Actions taken so far this season, for permit accounting.
    pub action_counts: BTreeMap<ActionType, u32>,
}

impl Vessel {
    pub fn new(id: u32, home_port: Tile, speed_kph: f64) -> Self {
        assert!(speed_kph > 0.0, "vessel speed must be positive");
        Self {
            id,
            home_port,
            location: home_port,
            speed_kph,
            hold_capacity: f64::INFINITY,
            hold: 0.0,
            hours_at_sea: 0.0,
            allowed_at_sea: true,
            fads: Vec::new(),
            fads_in_stock: 0,
            active_fad_cap: u32::MAX,
            costs: TripCosts::default(),
            action_counts: BTreeMap::new(),
        }
    }

    pub fn is_at_port(&self) -> bool {
        self.location == self.home_port
    }

    pub fn is_hold_full(&self) -> bool {
        self.hold + HOLD_EPSILON >= self.hold_capacity
    }

    pub fn fad(&self, id: FadId) -> Option<&Fad> {
        self.fads.iter().find(|f| f.id == id)
    }

    /// FADs still in the water.
    pub fn deployed_fads(&self) -> impl Iterator<Item = &Fad> {
        self.fads.iter().filter(|f| !f.is_lost())
    }

    pub fn deployed_fad_count(&self) -> u32 {
        self.deployed_fads().count() as u32
    }

    pub fn actions_taken(&self, action: ActionType) -> u32 {
        self.action_counts.get(&action).copied().unwrap_or(0)
    }

    pub fn record_action(&mut self, action: ActionType) {
        *self.action_counts.entry(action).or_insert(0) += 1;
    }

    /// Whether the gear can physically carry out an atomic action.
    pub fn is_gear_safe(&self, action: &AtomicAction) -> bool {
        match action {
            AtomicAction::DeployFad { .. } => {
                self.fads_in_stock > 0 && self.deployed_fad_count() < self.active_fad_cap
            }
            AtomicAction::SetOnFad { fad, .. } => self.fad(*fad).is_some_and(|f| !f.is_lost()),
            AtomicAction::Moving | AtomicAction::Arriving | AtomicAction::Delay { .. } => true,
            _ => !self.is_hold_full(),
        }
    }
}
