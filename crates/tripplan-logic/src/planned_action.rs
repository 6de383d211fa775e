//! One step of a trip plan.
//!
//! A planned action knows where it happens, how long it takes once the
//! vessel is there, whether it would be legal right now, and how it expands
//! into atomic actions when the vessel reaches it.

use rand::RngCore;

use crate::actions::{AtomicAction, CommittedSet};
use crate::biology::{Association, Biology, BiomassSources, CatchSamplers};
use crate::geography::Tile;
use crate::regulation::{ActionType, Regulations};
use crate::vessel::{Fad, FadId, Vessel};

/// Duration of a dolphin or non-associated set when none is configured.
pub const DEFAULT_SET_DURATION: f64 = 2.69;

/// Setting on one's own FAD takes one hour.
pub const OWN_FAD_SET_HOURS: f64 = 1.0;

/// Go to a tile and look for other vessels' FADs to steal from.
#[derive(Debug, Clone, PartialEq)]
pub struct OpportunisticSearch {
    pub tile: Tile,
    pub set_hours: f64,
    pub wasted_hours_if_empty: f64,
    pub minimum_value: f64,
    pub probability_of_finding: f64,
}

/// A dolphin or non-associated set whose catch is sampled from data.
///
/// The catch is not drawn at planning time: the planned set only becomes a
/// concrete `CatchSet` through [`AssociatedSet::commit`], which is the one
/// place allowed to advance the shared catch sampler.
#[derive(Debug, Clone, PartialEq)]
pub struct AssociatedSet {
    pub association: Association,
    pub tile: Tile,
    pub set_hours: f64,
    pub search_hours: f64,
    /// Whether biomass under foreign FADs counts as catchable.
    pub can_poach_fads: bool,
    /// How many cells around the tile the set may pull biomass from.
    pub range_in_tiles: i32,
}

impl AssociatedSet {
    pub fn new(association: Association, tile: Tile, search_hours: f64) -> Self {
        Self {
            association,
            tile,
            set_hours: DEFAULT_SET_DURATION,
            search_hours,
            can_poach_fads: false,
            range_in_tiles: 0,
        }
    }

    pub fn action_type(&self) -> ActionType {
        match self.association {
            Association::Dolphin => ActionType::DolphinSet,
            Association::NonAssociated => ActionType::NonAssociatedSet,
        }
    }

    /// Look up the biomass in range, draw a catch and build the set.
    pub fn commit(
        &self,
        biomass: &dyn BiomassSources,
        samplers: Option<&mut CatchSamplers>,
        rng: &mut dyn RngCore,
    ) -> CommittedSet {
        let sources = biomass.sources_near(self.tile, self.range_in_tiles, self.can_poach_fads);
        let available = Biology::aggregate(sources.iter().map(|s| &s.biology));
        let catch = match samplers.and_then(|s| s.get_mut(self.association)) {
            Some(sampler) => sampler.draw(&available, rng),
            None => {
                log::warn!("no catch sampler for {:?} sets; landing nothing", self.association);
                Biology::empty(available.biomass.len())
            }
        };
        CommittedSet {
            association: self.association,
            tile: self.tile,
            hours: self.set_hours,
            catch,
            sources,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlannedAction {
    /// Start or end marker of a trip.
    Arrival { position: Tile, end_of_trip: bool },
    Deploy { tile: Tile, delay_hours: f64 },
    /// Set on one of our own FADs. `tile` is where it was when planned.
    FadSet { fad: FadId, tile: Option<Tile> },
    OpportunisticSearch(OpportunisticSearch),
    /// An hour of fishing followed by `delay_hours` of processing.
    Fishing { tile: Tile, delay_hours: f64 },
    AssociatedSet(AssociatedSet),
}

impl PlannedAction {
    pub fn arrival(position: Tile, end_of_trip: bool) -> Self {
        PlannedAction::Arrival {
            position,
            end_of_trip,
        }
    }

    pub fn deploy(tile: Tile, delay_hours: f64) -> Self {
        PlannedAction::Deploy { tile, delay_hours }
    }

    pub fn fishing(tile: Tile, delay_hours: f64) -> Self {
        PlannedAction::Fishing { tile, delay_hours }
    }

    pub fn fad_set(fad: &Fad) -> Self {
        PlannedAction::FadSet {
            fad: fad.id,
            tile: fad.location,
        }
    }

    /// Where the action was planned to happen.
    pub fn location(&self) -> Option<Tile> {
        match self {
            PlannedAction::Arrival { position, .. } => Some(*position),
            PlannedAction::Deploy { tile, .. } => Some(*tile),
            PlannedAction::FadSet { tile, .. } => *tile,
            PlannedAction::OpportunisticSearch(search) => Some(search.tile),
            PlannedAction::Fishing { tile, .. } => Some(*tile),
            PlannedAction::AssociatedSet(set) => Some(set.tile),
        }
    }

    /// Where the action happens now. FADs drift and get lost, so a FAD set
    /// follows its device and has no location once it is gone.
    pub fn live_location(&self, vessel: &Vessel) -> Option<Tile> {
        match self {
            PlannedAction::FadSet { fad, .. } => vessel.fad(*fad).and_then(|f| f.location),
            other => other.location(),
        }
    }

    /// Hours spent on site, excluding travel.
    pub fn hours_it_takes(&self) -> f64 {
        match self {
            PlannedAction::Arrival { .. } => 0.0,
            // the deployment itself is immediate
            PlannedAction::Deploy { delay_hours, .. } => delay_hours.max(0.0),
            PlannedAction::FadSet { .. } => OWN_FAD_SET_HOURS,
            // pessimistic: assume the search comes up empty
            PlannedAction::OpportunisticSearch(search) => {
                search.set_hours + search.wasted_hours_if_empty
            }
            PlannedAction::Fishing { delay_hours, .. } => 1.0 + delay_hours.max(0.0),
            PlannedAction::AssociatedSet(set) => set.set_hours + set.search_hours,
        }
    }

    /// `None` for arrival markers.
    pub fn action_type(&self) -> Option<ActionType> {
        match self {
            PlannedAction::Arrival { .. } => None,
            PlannedAction::Deploy { .. } => Some(ActionType::Deployment),
            PlannedAction::FadSet { .. } => Some(ActionType::OwnFadSet),
            PlannedAction::OpportunisticSearch(_) => Some(ActionType::OpportunisticFadSet),
            PlannedAction::Fishing { .. } => Some(ActionType::Fishing),
            PlannedAction::AssociatedSet(set) => Some(set.action_type()),
        }
    }

    pub fn is_arrival(&self) -> bool {
        matches!(self, PlannedAction::Arrival { .. })
    }

    pub fn is_end_of_trip(&self) -> bool {
        matches!(
            self,
            PlannedAction::Arrival {
                end_of_trip: true,
                ..
            }
        )
    }

    /// Would this be legal if it happened now?
    pub fn is_allowed_now(&self, vessel: &Vessel, regulations: &dyn Regulations) -> bool {
        if !vessel.allowed_at_sea {
            return false;
        }
        let Some(action_type) = self.action_type() else {
            return true;
        };
        match self.live_location(vessel) {
            Some(tile) => regulations.is_allowed(vessel, tile, action_type),
            None => false,
        }
    }

    /// The atomic actions to run once the vessel is on site.
    pub fn actuate(&self) -> Vec<AtomicAction> {
        match self {
            PlannedAction::Arrival { end_of_trip, .. } => {
                vec![if *end_of_trip {
                    AtomicAction::Arriving
                } else {
                    AtomicAction::Moving
                }]
            }
            PlannedAction::Deploy { tile, delay_hours } => {
                with_delay(AtomicAction::DeployFad { tile: *tile }, *delay_hours)
            }
            PlannedAction::FadSet { fad, .. } => vec![AtomicAction::SetOnFad {
                fad: *fad,
                hours: OWN_FAD_SET_HOURS,
            }],
            PlannedAction::OpportunisticSearch(search) => vec![AtomicAction::SearchForFads {
                set_hours: search.set_hours,
                wasted_hours: search.wasted_hours_if_empty,
                minimum_value: search.minimum_value,
                probability_of_finding: search.probability_of_finding,
            }],
            PlannedAction::Fishing { delay_hours, .. } => {
                with_delay(AtomicAction::Fish, *delay_hours)
            }
            PlannedAction::AssociatedSet(set) => {
                with_delay(AtomicAction::PendingSet(set.clone()), set.search_hours)
            }
        }
    }
}

fn with_delay(action: AtomicAction, delay_hours: f64) -> Vec<AtomicAction> {
    if delay_hours > 0.0 {
        vec![action, AtomicAction::Delay { hours: delay_hours }]
    } else {
        vec![action]
    }
}
