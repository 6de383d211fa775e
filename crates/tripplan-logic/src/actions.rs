//! Atomic actions: what a vessel actually does on a tick.
//!
//! Planned actions expand into short queues of these when the vessel reaches
//! them. The surrounding stepping framework executes them; this crate only
//! decides which one comes next.

use crate::biology::{Association, Biology, BiomassSource};
use crate::geography::Tile;
use crate::planned_action::AssociatedSet;
use crate::vessel::FadId;

#[derive(Debug, Clone, PartialEq)]
pub enum AtomicAction {
    /// Head for the current destination.
    Moving,
    /// Tie up at port; ends the trip.
    Arriving,
    DeployFad {
        tile: Tile,
    },
    SetOnFad {
        fad: FadId,
        hours: f64,
    },
    /// Look for somebody else's FAD to set on. Burns `wasted_hours` when
    /// nothing worth at least `minimum_value` turns up.
    SearchForFads {
        set_hours: f64,
        wasted_hours: f64,
        minimum_value: f64,
        probability_of_finding: f64,
    },
    Fish,
    Delay {
        hours: f64,
    },
    /// A set whose catch has not been drawn yet. Never handed to the
    /// framework: the strategy commits it into a `CatchSet` first.
    PendingSet(AssociatedSet),
    CatchSet(CommittedSet),
}

/// A dolphin or non-associated set with its catch already drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedSet {
    pub association: Association,
    pub tile: Tile,
    pub hours: f64,
    pub catch: Biology,
    /// Where the catch is taken from, so the framework can deplete them.
    pub sources: Vec<BiomassSource>,
}

/// What `act` hands back to the framework.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResult {
    pub action: AtomicAction,
    pub hours_left: f64,
}

impl ActionResult {
    pub fn new(action: AtomicAction, hours_left: f64) -> Self {
        Self { action, hours_left }
    }
}
