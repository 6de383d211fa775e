//! Explicit per-call context.
//!
//! Everything the planner would otherwise reach for through a global model
//! object (map, regulations, market, biomass, samplers, clock, RNG) is handed
//! in through this struct. The vessel being planned for is passed separately.

use rand::RngCore;

use crate::biology::{
    BiomassSource, BiomassSources, CatchSamplers, FishValuation, PriceWeightedValuation,
};
use crate::geography::{SeaMap, Tile};
use crate::regulation::Regulations;

/// Biomass lookup that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBiomass;

impl BiomassSources for NoBiomass {
    fn sources_near(&self, _center: Tile, _radius: i32, _include_fads: bool) -> Vec<BiomassSource> {
        Vec::new()
    }
}

pub struct SimContext<'a> {
    pub map: &'a dyn SeaMap,
    pub regulations: &'a dyn Regulations,
    pub valuation: &'a dyn FishValuation,
    /// Market prices per species at the home port.
    pub prices: &'a [f64],
    pub biomass: &'a dyn BiomassSources,
    /// Only needed when deferred sets get committed.
    pub samplers: Option<&'a mut CatchSamplers>,
    /// Simulation clock.
    pub hours_since_start: f64,
    pub rng: &'a mut dyn RngCore,
}

impl<'a> SimContext<'a> {
    pub fn new(
        map: &'a dyn SeaMap,
        regulations: &'a dyn Regulations,
        rng: &'a mut dyn RngCore,
    ) -> Self {
        Self {
            map,
            regulations,
            valuation: &PriceWeightedValuation,
            prices: &[],
            biomass: &NoBiomass,
            samplers: None,
            hours_since_start: 0.0,
            rng,
        }
    }

    pub fn with_market(mut self, valuation: &'a dyn FishValuation, prices: &'a [f64]) -> Self {
        self.valuation = valuation;
        self.prices = prices;
        self
    }

    pub fn with_biomass(mut self, biomass: &'a dyn BiomassSources) -> Self {
        self.biomass = biomass;
        self
    }

    pub fn with_samplers(mut self, samplers: &'a mut CatchSamplers) -> Self {
        self.samplers = Some(samplers);
        self
    }

    pub fn at_hour(mut self, hours_since_start: f64) -> Self {
        self.hours_since_start = hours_since_start;
        self
    }
}
