//! Planning modules: one per action type, each proposing the next candidate
//! for the plan being built.
//!
//! All modules share the same lifecycle. `start` at the beginning of a trip,
//! `prepare_for_replanning` before a replan, `turn_off` when the strategy is
//! torn down. `maximum_actions_in_plan` bounds how many of their actions a
//! single plan may hold.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::context::SimContext;
use crate::generators::{FadRanking, LocationWeightedSampler, ValuedFad};
use crate::geography::Tile;
use crate::plan::Plan;
use crate::planned_action::{AssociatedSet, OpportunisticSearch, PlannedAction};
use crate::regulation::ActionType;
use crate::vessel::Vessel;

/// What a location-value module puts at the tile it draws.
#[derive(Debug, Clone, PartialEq)]
pub enum Proposal {
    Deploy { delay_hours: f64 },
    Fishing { delay_hours: f64 },
    /// The template's tile is replaced by the drawn one.
    Search(OpportunisticSearch),
    /// The template's tile is replaced by the drawn one.
    Set(AssociatedSet),
}

impl Proposal {
    pub fn action_type(&self) -> ActionType {
        match self {
            Proposal::Deploy { .. } => ActionType::Deployment,
            Proposal::Fishing { .. } => ActionType::Fishing,
            Proposal::Search(_) => ActionType::OpportunisticFadSet,
            Proposal::Set(set) => set.action_type(),
        }
    }

    pub fn at(&self, tile: Tile) -> PlannedAction {
        match self {
            Proposal::Deploy { delay_hours } => PlannedAction::deploy(tile, *delay_hours),
            Proposal::Fishing { delay_hours } => PlannedAction::fishing(tile, *delay_hours),
            Proposal::Search(template) => PlannedAction::OpportunisticSearch(OpportunisticSearch {
                tile,
                ..template.clone()
            }),
            Proposal::Set(template) => PlannedAction::AssociatedSet(AssociatedSet {
                tile,
                ..template.clone()
            }),
        }
    }
}

/// Draws a tile from location values and proposes an action there.
#[derive(Debug, Clone)]
pub struct LocationValueModule {
    pub sampler: LocationWeightedSampler,
    pub proposal: Proposal,
}

/// How the per-candidate weight of a pile is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PileWeighting {
    /// Hours the FAD has been in the water.
    Age,
    Value,
}

/// Zone selection rule of an own-FAD module.
#[derive(Debug, Clone, PartialEq)]
pub enum FadSelectionPolicy {
    /// Best net revenue: zone head plus `look_ahead` runners-up, minus the
    /// cost of the detour to the head.
    Greedy { look_ahead: usize },
    /// Keep working the last zone while it has anything left, else greedy.
    MarginalValue { last_zone: Option<usize> },
    /// Value discounted by `(hours from the plan centroid + 1) ^ penalty`.
    CentroidDistance { distance_penalty: f64 },
    /// Draw a zone by average value, flattened towards uniform by `dampen`.
    ValuePerSet { dampen: f64 },
    /// Zone with the heaviest pile of `weight ^ exponent`.
    WeightedPile { weighting: PileWeighting, exponent: f64 },
}

#[derive(Debug)]
pub struct OwnFadModule {
    pub ranking: FadRanking,
    pub policy: FadSelectionPolicy,
}

/// Baseline module: fishes a random legal water tile.
#[derive(Debug, Clone, PartialEq)]
pub struct DummyModule {
    pub max_attempts: u32,
    pub delay_hours: f64,
}

#[derive(Debug)]
pub enum PlanningModule {
    LocationValue(LocationValueModule),
    OwnFad(OwnFadModule),
    Dummy(DummyModule),
}

impl PlanningModule {
    pub fn location_value(sampler: LocationWeightedSampler, proposal: Proposal) -> Self {
        PlanningModule::LocationValue(LocationValueModule { sampler, proposal })
    }

    pub fn own_fad(ranking: FadRanking, policy: FadSelectionPolicy) -> Self {
        PlanningModule::OwnFad(OwnFadModule { ranking, policy })
    }

    pub fn dummy(max_attempts: u32, delay_hours: f64) -> Self {
        PlanningModule::Dummy(DummyModule {
            max_attempts,
            delay_hours,
        })
    }

    pub fn action_type(&self) -> ActionType {
        match self {
            PlanningModule::LocationValue(module) => module.proposal.action_type(),
            PlanningModule::OwnFad(_) => ActionType::OwnFadSet,
            PlanningModule::Dummy(_) => ActionType::Fishing,
        }
    }

    pub fn start(&mut self, ctx: &mut SimContext, vessel: &Vessel) {
        match self {
            PlanningModule::LocationValue(module) => module.sampler.start(ctx.map),
            PlanningModule::OwnFad(module) => {
                module.ranking.start_or_reset(ctx, vessel);
                if let FadSelectionPolicy::MarginalValue { last_zone } = &mut module.policy {
                    *last_zone = None;
                }
            }
            PlanningModule::Dummy(_) => {}
        }
    }

    /// Refresh whatever the previous pass consumed. FADs drift between
    /// passes, so the ranking is rebuilt from scratch.
    pub fn prepare_for_replanning(&mut self, ctx: &mut SimContext, vessel: &Vessel) {
        self.start(ctx, vessel);
    }

    pub fn turn_off(&mut self) {
        match self {
            PlanningModule::LocationValue(module) => {
                module.sampler = LocationWeightedSampler::new(module.sampler.values().clone());
            }
            PlanningModule::OwnFad(module) => module.ranking.clear(),
            PlanningModule::Dummy(_) => {}
        }
    }

    /// Upper bound on how many actions of this module a plan may hold.
    pub fn maximum_actions_in_plan(&self, ctx: &SimContext, vessel: &Vessel) -> u32 {
        let action_type = self.action_type();
        let permitted = ctx.regulations.remaining_permitted(vessel, action_type);
        if action_type == ActionType::Deployment {
            let room = vessel.active_fad_cap.saturating_sub(vessel.deployed_fad_count());
            permitted.min(vessel.fads_in_stock).min(room)
        } else {
            permitted
        }
    }

    /// Propose the next action, or `None` when there is nothing to offer.
    pub fn choose_next_action(
        &mut self,
        plan: &Plan,
        ctx: &mut SimContext,
        vessel: &Vessel,
    ) -> Option<PlannedAction> {
        match self {
            PlanningModule::LocationValue(module) => {
                let tile = module.sampler.draw(&mut *ctx.rng)?;
                Some(module.proposal.at(tile))
            }
            PlanningModule::OwnFad(module) => module.choose(plan, ctx, vessel),
            PlanningModule::Dummy(module) => module.choose(ctx, vessel),
        }
    }

    /// Drop a tile the planner could not use from the rest of this pass.
    pub fn discard_location(&mut self, tile: Tile) {
        if let PlanningModule::LocationValue(module) = self {
            module.sampler.discard(tile);
        }
    }
}

impl OwnFadModule {
    fn choose(
        &mut self,
        plan: &Plan,
        ctx: &mut SimContext,
        vessel: &Vessel,
    ) -> Option<PlannedAction> {
        let zones: Vec<usize> =
            self.ranking.best_per_zone().iter().map(|(zone, _)| *zone).collect();
        let zone = match zones.as_slice() {
            [] => return None,
            [only] => *only,
            _ => match &mut self.policy {
                FadSelectionPolicy::Greedy { look_ahead } => {
                    greedy_zone(&self.ranking, *look_ahead, plan, ctx, vessel)?
                }
                FadSelectionPolicy::MarginalValue { last_zone } => {
                    let ranking = &self.ranking;
                    let worked = (*last_zone)
                        .filter(|z| ranking.peek(*z).is_some_and(|f| f.value.is_finite()));
                    match worked {
                        Some(zone) => zone,
                        None => greedy_zone(ranking, 0, plan, ctx, vessel)?,
                    }
                }
                FadSelectionPolicy::CentroidDistance { distance_penalty } => {
                    centroid_zone(&self.ranking, *distance_penalty, plan, ctx, vessel)?
                }
                FadSelectionPolicy::ValuePerSet { dampen } => {
                    value_per_set_zone(&self.ranking, *dampen, ctx)?
                }
                FadSelectionPolicy::WeightedPile { weighting, exponent } => {
                    let now = ctx.hours_since_start;
                    pile_zone(&self.ranking, |fad| match weighting {
                        PileWeighting::Age => fad.age(now).powf(*exponent),
                        PileWeighting::Value => fad.value.max(0.0).powf(*exponent),
                    })?
                }
            },
        };
        if let FadSelectionPolicy::MarginalValue { last_zone } = &mut self.policy {
            *last_zone = Some(zone);
        }
        self.ranking.choose(zone)
    }
}

fn greedy_zone(
    ranking: &FadRanking,
    look_ahead: usize,
    plan: &Plan,
    ctx: &SimContext,
    vessel: &Vessel,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (zone, ranked) in ranking.all_per_zone() {
        let head = ranked[0];
        let Some((_, hours)) = plan.cheapest_insertion(head.tile, ctx.map, vessel.speed_kph) else {
            continue;
        };
        let revenue: f64 = ranked.iter().take(1 + look_ahead).map(|f| f.value).sum();
        let profit = revenue - vessel.costs.cost_of_steaming(hours, vessel.speed_kph);
        if best.map_or(true, |(_, top)| profit > top) {
            best = Some((zone, profit));
        }
    }
    best.map(|(zone, _)| zone)
}

fn centroid_zone(
    ranking: &FadRanking,
    distance_penalty: f64,
    plan: &Plan,
    ctx: &SimContext,
    vessel: &Vessel,
) -> Option<usize> {
    let centroid = plan.centroid_tile();
    let mut best: Option<(usize, f64)> = None;
    for (zone, head) in ranking.best_per_zone() {
        let hours = ctx.map.distance(centroid, head.tile) / vessel.speed_kph;
        let discounted = head.value / (hours + 1.0).powf(distance_penalty);
        // later zones win ties here
        if best.map_or(true, |(_, top)| discounted >= top) {
            best = Some((zone, discounted));
        }
    }
    best.map(|(zone, _)| zone)
}

fn value_per_set_zone(ranking: &FadRanking, dampen: f64, ctx: &mut SimContext) -> Option<usize> {
    let per_zone = ranking.all_per_zone();
    let averages: Vec<f64> = per_zone
        .iter()
        .map(|(_, ranked)| {
            let total: f64 = ranked.iter().map(|f| f.value.max(0.0)).sum();
            total / ranked.len() as f64
        })
        .collect();
    let total: f64 = averages.iter().sum();
    let uniform = 1.0 / averages.len() as f64;
    let weights: Vec<f64> = averages
        .iter()
        .map(|average| {
            let proportional = if total > 0.0 { average / total } else { uniform };
            dampen * uniform + (1.0 - dampen) * proportional
        })
        .collect();
    let index = WeightedIndex::new(&weights).ok()?;
    Some(per_zone[index.sample(&mut *ctx.rng)].0)
}

fn pile_zone(ranking: &FadRanking, weight: impl Fn(&ValuedFad) -> f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (zone, ranked) in ranking.all_per_zone() {
        let pile: f64 = ranked.iter().map(|f| weight(f)).sum();
        if best.map_or(true, |(_, top)| pile > top) {
            best = Some((zone, pile));
        }
    }
    best.map(|(zone, _)| zone)
}

impl DummyModule {
    fn choose(&self, ctx: &mut SimContext, vessel: &Vessel) -> Option<PlannedAction> {
        let (width, height) = (ctx.map.width(), ctx.map.height());
        for _ in 0..self.max_attempts {
            let tile = Tile::new(ctx.rng.gen_range(0..width), ctx.rng.gen_range(0..height));
            if ctx.map.is_water(tile)
                && ctx.regulations.is_allowed(vessel, tile, ActionType::Fishing)
            {
                return Some(PlannedAction::fishing(tile, self.delay_hours));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biology::{Association, Biology, PriceWeightedValuation};
    use crate::generators::FadRankingSettings;
    use crate::geography::{DistanceMetric, GridMap, MapDiscretization, SeaMap, SquareDiscretization};
    use crate::regulation::{Anarchy, ClosedArea, RegulationTable};
    use crate::vessel::{Fad, FadId, TripCosts};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap;

    const PRICES: [f64; 1] = [1.0];

    fn fad(id: u64, x: i32, y: i32, value: f64) -> Fad {
        Fad::new(FadId(id), Tile::new(x, y), Biology::new(vec![value]), 0.0)
    }

    /// A 20×20 map split into four 10×10 quadrants.
    fn quadrants() -> Box<dyn MapDiscretization> {
        Box::new(SquareDiscretization::new(20, 20, 1, 1))
    }

    fn own_fad(policy: FadSelectionPolicy) -> PlanningModule {
        PlanningModule::own_fad(FadRanking::new(quadrants(), FadRankingSettings::default()), policy)
    }

    #[test]
    fn test_greedy_prefers_cheap_zone() {
        let map = GridMap::new(20, 20, 1.0, DistanceMetric::Euclidean);
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = SimContext::new(&map, &Anarchy, &mut rng)
            .with_market(&PriceWeightedValuation, &PRICES);

        let mut vessel = Vessel::new(1, Tile::new(0, 0), 1.0);
        vessel.costs = TripCosts {
            per_hour: 10.0,
            per_km: 0.0,
        };
        // $100 ten hours away and back, $50 an hour away and back
        vessel.fads.push(fad(1, 0, 10, 100.0));
        vessel.fads.push(fad(2, 1, 0, 50.0));

        let mut module = own_fad(FadSelectionPolicy::Greedy { look_ahead: 0 });
        module.start(&mut ctx, &vessel);
        let plan = Plan::new(vessel.location, vessel.home_port);
        let chosen = module.choose_next_action(&plan, &mut ctx, &vessel).unwrap();
        assert_eq!(chosen.location(), Some(Tile::new(1, 0)));
    }

    #[test]
    fn test_greedy_look_ahead_counts_depth() {
        let map = GridMap::new(20, 20, 1.0, DistanceMetric::Euclidean);
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = SimContext::new(&map, &Anarchy, &mut rng)
            .with_market(&PriceWeightedValuation, &PRICES);
        let mut vessel = Vessel::new(1, Tile::new(0, 0), 1.0);
        vessel.fads.push(fad(1, 1, 1, 10.0));
        vessel.fads.push(fad(2, 15, 15, 8.0));
        vessel.fads.push(fad(3, 16, 15, 8.0));

        let plan = Plan::new(vessel.location, vessel.home_port);
        let mut shallow = own_fad(FadSelectionPolicy::Greedy { look_ahead: 0 });
        shallow.start(&mut ctx, &vessel);
        let first = shallow.choose_next_action(&plan, &mut ctx, &vessel).unwrap();
        assert_eq!(first.location(), Some(Tile::new(1, 1)));

        let mut deep = own_fad(FadSelectionPolicy::Greedy { look_ahead: 1 });
        deep.start(&mut ctx, &vessel);
        let first = deep.choose_next_action(&plan, &mut ctx, &vessel).unwrap();
        assert_eq!(first.location().map(|t| t.y), Some(15));
    }

    #[test]
    fn test_marginal_value_stays_in_zone() {
        let map = GridMap::new(20, 20, 1.0, DistanceMetric::Euclidean);
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = SimContext::new(&map, &Anarchy, &mut rng)
            .with_market(&PriceWeightedValuation, &PRICES);
        let mut vessel = Vessel::new(1, Tile::new(0, 0), 1.0);
        vessel.fads.push(fad(1, 15, 15, 100.0));
        vessel.fads.push(fad(2, 16, 16, 1.0));
        vessel.fads.push(fad(3, 2, 2, 50.0));

        let mut module = own_fad(FadSelectionPolicy::MarginalValue { last_zone: None });
        module.start(&mut ctx, &vessel);
        let plan = Plan::new(vessel.location, vessel.home_port);
        let first = module.choose_next_action(&plan, &mut ctx, &vessel).unwrap();
        let second = module.choose_next_action(&plan, &mut ctx, &vessel).unwrap();
        let third = module.choose_next_action(&plan, &mut ctx, &vessel).unwrap();
        assert_eq!(first.location(), Some(Tile::new(15, 15)));
        // the $1 FAD beats the $50 one because the zone is not exhausted yet
        assert_eq!(second.location(), Some(Tile::new(16, 16)));
        assert_eq!(third.location(), Some(Tile::new(2, 2)));
        assert!(module.choose_next_action(&plan, &mut ctx, &vessel).is_none());
    }

    #[test]
    fn test_centroid_distance_discounts_far_zones() {
        let map = GridMap::new(20, 20, 1.0, DistanceMetric::Euclidean);
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = SimContext::new(&map, &Anarchy, &mut rng)
            .with_market(&PriceWeightedValuation, &PRICES);
        let mut vessel = Vessel::new(1, Tile::new(0, 0), 1.0);
        vessel.fads.push(fad(1, 2, 2, 10.0));
        vessel.fads.push(fad(2, 18, 18, 20.0));
        let plan = Plan::new(vessel.location, vessel.home_port);

        let mut blind = own_fad(FadSelectionPolicy::CentroidDistance { distance_penalty: 0.0 });
        blind.start(&mut ctx, &vessel);
        let chosen = blind.choose_next_action(&plan, &mut ctx, &vessel).unwrap();
        assert_eq!(chosen.location(), Some(Tile::new(18, 18)));

        let mut careful = own_fad(FadSelectionPolicy::CentroidDistance { distance_penalty: 1.0 });
        careful.start(&mut ctx, &vessel);
        let chosen = careful.choose_next_action(&plan, &mut ctx, &vessel).unwrap();
        assert_eq!(chosen.location(), Some(Tile::new(2, 2)));
    }

    /// Equal FADs in zones 1 and 2, mirror images across the diagonal
    /// through the port.
    fn mirrored_zones() -> Vessel {
        let mut vessel = Vessel::new(1, Tile::new(0, 0), 1.0);
        vessel.fads.push(fad(1, 12, 2, 10.0));
        vessel.fads.push(fad(2, 2, 12, 10.0));
        vessel
    }

    #[test]
    fn test_greedy_tie_keeps_first_zone() {
        let map = GridMap::new(20, 20, 1.0, DistanceMetric::Euclidean);
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = SimContext::new(&map, &Anarchy, &mut rng)
            .with_market(&PriceWeightedValuation, &PRICES);
        let vessel = mirrored_zones();
        let plan = Plan::new(vessel.location, vessel.home_port);

        let mut module = own_fad(FadSelectionPolicy::Greedy { look_ahead: 0 });
        module.start(&mut ctx, &vessel);
        let chosen = module.choose_next_action(&plan, &mut ctx, &vessel).unwrap();
        assert_eq!(chosen.location(), Some(Tile::new(12, 2)));
    }

    #[test]
    fn test_centroid_tie_takes_later_zone() {
        let map = GridMap::new(20, 20, 1.0, DistanceMetric::Euclidean);
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = SimContext::new(&map, &Anarchy, &mut rng)
            .with_market(&PriceWeightedValuation, &PRICES);
        let vessel = mirrored_zones();
        let plan = Plan::new(vessel.location, vessel.home_port);

        let mut module = own_fad(FadSelectionPolicy::CentroidDistance { distance_penalty: 1.0 });
        module.start(&mut ctx, &vessel);
        let chosen = module.choose_next_action(&plan, &mut ctx, &vessel).unwrap();
        assert_eq!(chosen.location(), Some(Tile::new(2, 12)));
    }

    fn value_per_set_frequencies(dampen: f64) -> [f64; 2] {
        let map = GridMap::new(20, 20, 1.0, DistanceMetric::Euclidean);
        let mut rng = StdRng::seed_from_u64(11);
        let mut ctx = SimContext::new(&map, &Anarchy, &mut rng)
            .with_market(&PriceWeightedValuation, &PRICES);
        let mut vessel = Vessel::new(1, Tile::new(0, 0), 1.0);
        vessel.fads.push(fad(1, 2, 2, 10.0));
        vessel.fads.push(fad(2, 18, 18, 30.0));
        let plan = Plan::new(vessel.location, vessel.home_port);
        let mut module = own_fad(FadSelectionPolicy::ValuePerSet { dampen });

        let trials = 4000;
        let mut near = 0;
        for _ in 0..trials {
            module.start(&mut ctx, &vessel);
            let chosen = module.choose_next_action(&plan, &mut ctx, &vessel).unwrap();
            if chosen.location() == Some(Tile::new(2, 2)) {
                near += 1;
            }
        }
        let near = near as f64 / trials as f64;
        [near, 1.0 - near]
    }

    #[test]
    fn test_value_per_set_dampen_one_is_uniform() {
        let [near, far] = value_per_set_frequencies(1.0);
        assert!((near - 0.5).abs() < 0.05, "near = {}", near);
        assert!((far - 0.5).abs() < 0.05, "far = {}", far);
    }

    #[test]
    fn test_value_per_set_dampen_zero_is_proportional() {
        let [near, far] = value_per_set_frequencies(0.0);
        assert!((near - 0.25).abs() < 0.05, "near = {}", near);
        assert!((far - 0.75).abs() < 0.05, "far = {}", far);
    }

    #[test]
    fn test_weighted_pile_by_age() {
        let map = GridMap::new(20, 20, 1.0, DistanceMetric::Euclidean);
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = SimContext::new(&map, &Anarchy, &mut rng)
            .with_market(&PriceWeightedValuation, &PRICES)
            .at_hour(100.0);
        let mut vessel = Vessel::new(1, Tile::new(0, 0), 1.0);
        let mut old = fad(1, 2, 2, 1.0);
        old.deployed_at = 0.0;
        let mut young = fad(2, 18, 18, 50.0);
        young.deployed_at = 90.0;
        vessel.fads.push(old);
        vessel.fads.push(young);
        let plan = Plan::new(vessel.location, vessel.home_port);

        let mut by_age = own_fad(FadSelectionPolicy::WeightedPile {
            weighting: PileWeighting::Age,
            exponent: 1.0,
        });
        by_age.start(&mut ctx, &vessel);
        let chosen = by_age.choose_next_action(&plan, &mut ctx, &vessel).unwrap();
        assert_eq!(chosen.location(), Some(Tile::new(2, 2)));

        let mut by_value = own_fad(FadSelectionPolicy::WeightedPile {
            weighting: PileWeighting::Value,
            exponent: 2.0,
        });
        by_value.start(&mut ctx, &vessel);
        let chosen = by_value.choose_next_action(&plan, &mut ctx, &vessel).unwrap();
        assert_eq!(chosen.location(), Some(Tile::new(18, 18)));
    }

    #[test]
    fn test_single_zone_short_circuits() {
        let map = GridMap::new(20, 20, 1.0, DistanceMetric::Euclidean);
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = SimContext::new(&map, &Anarchy, &mut rng)
            .with_market(&PriceWeightedValuation, &PRICES);
        let mut vessel = Vessel::new(1, Tile::new(0, 0), 1.0);
        vessel.fads.push(fad(1, 2, 2, 1.0));
        let plan = Plan::new(vessel.location, vessel.home_port);
        // a dampen the weighted draw would reject never gets used
        let mut module = own_fad(FadSelectionPolicy::ValuePerSet { dampen: f64::NAN });
        module.start(&mut ctx, &vessel);
        assert!(module.choose_next_action(&plan, &mut ctx, &vessel).is_some());
        assert!(module.choose_next_action(&plan, &mut ctx, &vessel).is_none());
    }

    #[test]
    fn test_deployment_budget_respects_stock_and_cap() {
        let map = GridMap::new(5, 5, 1.0, DistanceMetric::Euclidean);
        let regulations = RegulationTable::new().with_cap(ActionType::Deployment, 10);
        let mut rng = StdRng::seed_from_u64(0);
        let ctx = SimContext::new(&map, &regulations, &mut rng);
        let mut vessel = Vessel::new(1, Tile::new(0, 0), 1.0);
        vessel.fads_in_stock = 6;
        vessel.active_fad_cap = 3;
        vessel.fads.push(fad(1, 1, 1, 1.0));

        let module = PlanningModule::location_value(
            LocationWeightedSampler::new(BTreeMap::new()),
            Proposal::Deploy { delay_hours: 0.0 },
        );
        assert_eq!(module.maximum_actions_in_plan(&ctx, &vessel), 2);
        vessel.active_fad_cap = 100;
        assert_eq!(module.maximum_actions_in_plan(&ctx, &vessel), 6);
        vessel.fads_in_stock = 50;
        assert_eq!(module.maximum_actions_in_plan(&ctx, &vessel), 10);
    }

    #[test]
    fn test_location_value_proposes_from_template() {
        let map = GridMap::new(5, 5, 1.0, DistanceMetric::Euclidean);
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = SimContext::new(&map, &Anarchy, &mut rng);
        let vessel = Vessel::new(1, Tile::new(0, 0), 1.0);
        let mut values = BTreeMap::new();
        values.insert(Tile::new(3, 3), 1.0);
        let template = AssociatedSet::new(Association::Dolphin, Tile::new(0, 0), 4.0);
        let mut module = PlanningModule::location_value(
            LocationWeightedSampler::new(values),
            Proposal::Set(template),
        );
        assert_eq!(module.action_type(), ActionType::DolphinSet);

        module.start(&mut ctx, &vessel);
        let plan = Plan::new(vessel.location, vessel.home_port);
        let proposed = module.choose_next_action(&plan, &mut ctx, &vessel).unwrap();
        assert_eq!(proposed.location(), Some(Tile::new(3, 3)));
        assert_eq!(proposed.action_type(), Some(ActionType::DolphinSet));

        module.discard_location(Tile::new(3, 3));
        assert!(module.choose_next_action(&plan, &mut ctx, &vessel).is_none());
    }

    #[test]
    fn test_dummy_finds_legal_water_or_gives_up() {
        let map = GridMap::new(3, 3, 1.0, DistanceMetric::Euclidean);
        let mut rng = StdRng::seed_from_u64(5);
        let closed = RegulationTable::new().with_closed_area(ClosedArea {
            min: Tile::new(0, 0),
            max: Tile::new(2, 2),
            closed_to: vec![ActionType::Fishing],
        });
        let vessel = Vessel::new(1, Tile::new(0, 0), 1.0);
        let plan = Plan::new(vessel.location, vessel.home_port);

        let mut ctx = SimContext::new(&map, &Anarchy, &mut rng);
        let mut module = PlanningModule::dummy(10, 0.0);
        let found = module.choose_next_action(&plan, &mut ctx, &vessel).unwrap();
        assert!(map.is_water(found.location().unwrap()));

        let mut ctx = SimContext::new(&map, &closed, &mut rng);
        assert!(module.choose_next_action(&plan, &mut ctx, &vessel).is_none());
    }
}
