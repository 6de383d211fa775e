//! Candidate generators: where the planning modules get their proposals from.
//!
//! | Generator | Feeds |
//! |-----------|-------|
//! | [`LocationWeightedSampler`] | deployments, dolphin/non-associated sets, searches, fishing |
//! | [`FadRanking`] | every own-FAD selection policy |

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, RngCore};

use crate::context::SimContext;
use crate::geography::{MapDiscretization, SeaMap, Tile};
use crate::planned_action::PlannedAction;
use crate::regulation::ActionType;
use crate::vessel::{FadId, Vessel};

// ── Weighted location draw ─────────────────────────────────────────────────

/// Draws tiles with probability proportional to a location value.
///
/// The sampler is frozen by [`start`](Self::start): draws in between reuse it
/// until the next `start`. Only [`discard`](Self::discard) rebuilds it early.
#[derive(Debug, Clone, Default)]
pub struct LocationWeightedSampler {
    values: BTreeMap<Tile, f64>,
    candidates: Vec<Tile>,
    weights: Vec<f64>,
    index: Option<WeightedIndex<f64>>,
}

impl LocationWeightedSampler {
    pub fn new(values: BTreeMap<Tile, f64>) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    pub fn values(&self) -> &BTreeMap<Tile, f64> {
        &self.values
    }

    /// Freeze a sampler over the current values.
    ///
    /// Negative values are dropped. When every remaining value is zero all
    /// candidates are drawn uniformly. With no values at all the draw falls
    /// back to every water tile of the map.
    pub fn start(&mut self, map: &dyn SeaMap) {
        if self.values.is_empty() {
            self.candidates = map.water_tiles();
            self.weights = vec![1.0; self.candidates.len()];
        } else {
            let (candidates, weights): (Vec<Tile>, Vec<f64>) = self
                .values
                .iter()
                .filter(|(_, value)| **value >= 0.0)
                .map(|(tile, value)| (*tile, *value))
                .unzip();
            self.candidates = candidates;
            self.weights = weights;
            if self.weights.iter().all(|w| *w == 0.0) {
                self.weights.iter_mut().for_each(|w| *w = 1.0);
            }
        }
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.index = if self.candidates.is_empty() {
            None
        } else {
            WeightedIndex::new(&self.weights).ok()
        };
    }

    /// Remove a tile from the frozen sampler for the rest of the pass.
    pub fn discard(&mut self, tile: Tile) {
        if let Some(position) = self.candidates.iter().position(|t| *t == tile) {
            self.candidates.remove(position);
            self.weights.remove(position);
            if !self.weights.is_empty() && self.weights.iter().all(|w| *w == 0.0) {
                self.weights.iter_mut().for_each(|w| *w = 1.0);
            }
            self.rebuild();
        }
    }

    /// `None` before `start` or once every candidate has been discarded.
    pub fn draw(&self, rng: &mut dyn RngCore) -> Option<Tile> {
        let index = self.index.as_ref()?;
        Some(self.candidates[index.sample(rng)])
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }
}

// ── Own-FAD ranking ────────────────────────────────────────────────────────

/// A deployed FAD with the value it had when the ranking was built.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuedFad {
    pub fad: FadId,
    pub tile: Tile,
    pub value: f64,
    pub deployed_at: f64,
}

impl ValuedFad {
    /// Hours in the water at simulation hour `now`.
    pub fn age(&self, now: f64) -> f64 {
        (now - self.deployed_at).max(0.0)
    }

    pub fn to_planned(&self) -> PlannedAction {
        PlannedAction::FadSet {
            fad: self.fad,
            tile: Some(self.tile),
        }
    }
}

impl Eq for ValuedFad {}

impl Ord for ValuedFad {
    /// Higher value first; on equal value the older id wins.
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .total_cmp(&other.value)
            .then_with(|| other.fad.cmp(&self.fad))
    }
}

impl PartialOrd for ValuedFad {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Knobs for [`FadRanking`].
#[derive(Debug, Clone, PartialEq)]
pub struct FadRankingSettings {
    /// FADs worth less than this are not worth a set.
    pub minimum_value: f64,
    /// Inclusive rectangle the vessel never sets in.
    pub banned: Option<(Tile, Tile)>,
    /// Drop FADs that are illegal to set on right now.
    pub filter_illegal: bool,
    /// Chance that a below-threshold FAD is misread as worth the threshold.
    pub bad_reading_probability: f64,
}

impl Default for FadRankingSettings {
    fn default() -> Self {
        Self {
            minimum_value: 0.0,
            banned: None,
            filter_illegal: true,
            bad_reading_probability: 0.0,
        }
    }
}

/// Deployed FADs ranked by value inside each zone of a discretization.
pub struct FadRanking {
    discretization: Box<dyn MapDiscretization>,
    zones: Vec<BinaryHeap<ValuedFad>>,
    pub settings: FadRankingSettings,
}

impl std::fmt::Debug for FadRanking {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FadRanking")
            .field("zones", &self.zones.len())
            .field("ranked", &self.len())
            .field("settings", &self.settings)
            .finish()
    }
}

impl FadRanking {
    pub fn new(discretization: Box<dyn MapDiscretization>, settings: FadRankingSettings) -> Self {
        let zones = (0..discretization.zone_count()).map(|_| BinaryHeap::new()).collect();
        Self {
            discretization,
            zones,
            settings,
        }
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    /// Total FADs still ranked across all zones.
    pub fn len(&self) -> usize {
        self.zones.iter().map(|z| z.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.iter().all(|z| z.is_empty())
    }

    /// Forget every ranked FAD until the next `start_or_reset`.
    pub fn clear(&mut self) {
        for zone in &mut self.zones {
            zone.clear();
        }
    }

    fn is_banned(&self, tile: Tile) -> bool {
        self.settings.banned.is_some_and(|(min, max)| {
            tile.x >= min.x && tile.x <= max.x && tile.y >= min.y && tile.y <= max.y
        })
    }

    /// Value every FAD the vessel has in the water and rank the ones worth
    /// setting on. Anything chosen in a previous pass is back in play.
    pub fn start_or_reset(&mut self, ctx: &mut SimContext, vessel: &Vessel) {
        self.clear();
        for fad in vessel.deployed_fads() {
            let Some(tile) = fad.location else { continue };
            if self.is_banned(tile) {
                continue;
            }
            if self.settings.filter_illegal
                && !ctx.regulations.is_allowed(vessel, tile, ActionType::OwnFadSet)
            {
                continue;
            }
            let mut value = ctx.valuation.value_of(&fad.biology, ctx.prices);
            if value < self.settings.minimum_value {
                let misread = self.settings.bad_reading_probability > 0.0
                    && ctx.rng.gen_bool(self.settings.bad_reading_probability.min(1.0));
                if !misread {
                    continue;
                }
                value = self.settings.minimum_value;
            }
            let zone = self.discretization.zone_of(tile);
            self.zones[zone].push(ValuedFad {
                fad: fad.id,
                tile,
                value,
                deployed_at: fad.deployed_at,
            });
        }
    }

    /// Top candidate of every non-empty zone, by zone index.
    pub fn best_per_zone(&self) -> Vec<(usize, &ValuedFad)> {
        self.zones
            .iter()
            .enumerate()
            .filter_map(|(zone, heap)| heap.peek().map(|best| (zone, best)))
            .collect()
    }

    /// Every candidate of every non-empty zone, best first.
    pub fn all_per_zone(&self) -> Vec<(usize, Vec<&ValuedFad>)> {
        self.zones
            .iter()
            .enumerate()
            .filter(|(_, heap)| !heap.is_empty())
            .map(|(zone, heap)| {
                let mut ranked: Vec<&ValuedFad> = heap.iter().collect();
                ranked.sort_by(|a, b| b.cmp(a));
                (zone, ranked)
            })
            .collect()
    }

    pub fn peek(&self, zone: usize) -> Option<&ValuedFad> {
        self.zones.get(zone).and_then(|heap| heap.peek())
    }

    /// Take the best FAD of a zone out of the ranking for the rest of the pass.
    pub fn choose(&mut self, zone: usize) -> Option<PlannedAction> {
        self.zones
            .get_mut(zone)
            .and_then(|heap| heap.pop())
            .map(|best| best.to_planned())
    }
}
