//! Biomass, valuation, and catch sampling collaborators.
//!
//! The planner never models fish dynamics. It needs three things from the
//! biology side: a way to price a pile of biomass, a lookup of biomass
//! sources around a tile, and a stochastic catch sampler for sets whose catch
//! is "fit to data" rather than simulated.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::geography::Tile;
use crate::vessel::FadId;

/// Biomass per species, in tonnes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Biology {
    pub biomass: Vec<f64>,
}

impl Biology {
    pub fn new(biomass: Vec<f64>) -> Self {
        Self { biomass }
    }

    pub fn empty(species: usize) -> Self {
        Self {
            biomass: vec![0.0; species],
        }
    }

    pub fn total(&self) -> f64 {
        self.biomass.iter().sum()
    }

    /// Species-wise sum. The result is as long as the longer operand.
    pub fn add(&mut self, other: &Biology) {
        if other.biomass.len() > self.biomass.len() {
            self.biomass.resize(other.biomass.len(), 0.0);
        }
        for (mine, theirs) in self.biomass.iter_mut().zip(&other.biomass) {
            *mine += theirs;
        }
    }

    /// Sum of a collection of biologies.
    pub fn aggregate<'a>(biologies: impl IntoIterator<Item = &'a Biology>) -> Biology {
        let mut total = Biology::default();
        for biology in biologies {
            total.add(biology);
        }
        total
    }
}

/// Prices a biology at the current market.
pub trait FishValuation {
    fn value_of(&self, biology: &Biology, prices: &[f64]) -> f64;
}

/// Value = Σ biomass × price, species by species. Missing prices count as 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceWeightedValuation;

impl FishValuation for PriceWeightedValuation {
    fn value_of(&self, biology: &Biology, prices: &[f64]) -> f64 {
        biology
            .biomass
            .iter()
            .zip(prices)
            .map(|(tonnes, price)| tonnes * price)
            .sum()
    }
}

/// One place a set could pull fish from.
#[derive(Debug, Clone, PartialEq)]
pub struct BiomassSource {
    pub tile: Tile,
    pub biology: Biology,
    /// Set when the biomass sits under somebody's FAD.
    pub fad: Option<FadId>,
}

/// Lookup of biomass around a tile.
pub trait BiomassSources {
    /// Sources within `radius` cells (Chebyshev) of `center`. FAD-associated
    /// biomass is only returned when `include_fads` is true.
    fn sources_near(&self, center: Tile, radius: i32, include_fads: bool) -> Vec<BiomassSource>;
}

/// Free-swimming biomass per tile plus biomass under foreign FADs.
#[derive(Debug, Clone, Default)]
pub struct BiomassField {
    cells: HashMap<Tile, Biology>,
    fads: Vec<(FadId, Tile, Biology)>,
}

impl BiomassField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_cell(&mut self, tile: Tile, biology: Biology) {
        self.cells.insert(tile, biology);
    }

    pub fn add_fad(&mut self, fad: FadId, tile: Tile, biology: Biology) {
        self.fads.push((fad, tile, biology));
    }
}

impl BiomassSources for BiomassField {
    fn sources_near(&self, center: Tile, radius: i32, include_fads: bool) -> Vec<BiomassSource> {
        let radius = radius.max(0);
        let mut near: Vec<(&Tile, &Biology)> = self
            .cells
            .iter()
            .filter(|(tile, _)| tile.cells_to(center) <= radius)
            .collect();
        // row-major, whatever order the cells were stored in
        near.sort_by_key(|(tile, _)| (tile.y, tile.x));
        let mut sources: Vec<BiomassSource> = near
            .into_iter()
            .map(|(tile, biology)| BiomassSource {
                tile: *tile,
                biology: biology.clone(),
                fad: None,
            })
            .collect();
        if include_fads {
            for (fad, tile, biology) in &self.fads {
                if tile.cells_to(center) <= radius {
                    sources.push(BiomassSource {
                        tile: *tile,
                        biology: biology.clone(),
                        fad: Some(*fad),
                    });
                }
            }
        }
        sources
    }
}

/// The two kinds of set whose catch is drawn from a sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Association {
    Dolphin,
    NonAssociated,
}

/// Draws how much of the available biomass a set actually lands.
pub trait CatchSampler {
    fn draw(&mut self, available: &Biology, rng: &mut dyn RngCore) -> Biology;
}

/// Replays observed catches (tonnes per species) without replacement,
/// reshuffling once every observation has been used. Each catch is capped by
/// what is actually available.
#[derive(Debug, Clone)]
pub struct EmpiricalCatchSampler {
    observations: Vec<Vec<f64>>,
    pending: Vec<usize>,
}

impl EmpiricalCatchSampler {
    pub fn new(observations: Vec<Vec<f64>>) -> Self {
        assert!(!observations.is_empty(), "a catch sampler needs at least one observation");
        Self {
            observations,
            pending: Vec::new(),
        }
    }

    /// Observations left before the next reshuffle.
    pub fn remaining_in_cycle(&self) -> usize {
        self.pending.len()
    }
}

impl CatchSampler for EmpiricalCatchSampler {
    fn draw(&mut self, available: &Biology, rng: &mut dyn RngCore) -> Biology {
        if self.pending.is_empty() {
            self.pending = (0..self.observations.len()).collect();
            self.pending.shuffle(rng);
        }
        let index = self.pending.pop().unwrap_or(0);
        let observed = &self.observations[index];
        Biology::new(
            available
                .biomass
                .iter()
                .enumerate()
                .map(|(species, tonnes)| observed.get(species).copied().unwrap_or(0.0).min(*tonnes))
                .collect(),
        )
    }
}

/// Arena of catch samplers, one per association. Only deferred sets mutate
/// it, and only when they are committed.
#[derive(Default)]
pub struct CatchSamplers {
    samplers: HashMap<Association, Box<dyn CatchSampler>>,
}

impl CatchSamplers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, association: Association, sampler: Box<dyn CatchSampler>) {
        self.samplers.insert(association, sampler);
    }

    pub fn get_mut(
        &mut self,
        association: Association,
    ) -> Option<&mut (dyn CatchSampler + 'static)> {
        self.samplers.get_mut(&association).map(|s| s.as_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_price_weighted_value() {
        let biology = Biology::new(vec![2.0, 3.0]);
        assert_eq!(PriceWeightedValuation.value_of(&biology, &[10.0, 1.0]), 23.0);
        // missing price means worthless
        assert_eq!(PriceWeightedValuation.value_of(&biology, &[10.0]), 20.0);
    }

    #[test]
    fn test_aggregate_pads_species() {
        let a = Biology::new(vec![1.0]);
        let b = Biology::new(vec![1.0, 2.0]);
        let total = Biology::aggregate([&a, &b]);
        assert_eq!(total.biomass, vec![2.0, 2.0]);
    }

    #[test]
    fn test_sources_near_respects_radius_and_fads() {
        let mut field = BiomassField::new();
        field.set_cell(Tile::new(5, 5), Biology::new(vec![1.0]));
        field.set_cell(Tile::new(6, 6), Biology::new(vec![2.0]));
        field.set_cell(Tile::new(9, 9), Biology::new(vec![4.0]));
        field.add_fad(FadId(7), Tile::new(5, 6), Biology::new(vec![8.0]));

        let only_here = field.sources_near(Tile::new(5, 5), 0, true);
        assert_eq!(only_here.len(), 1);

        let nearby = field.sources_near(Tile::new(5, 5), 1, false);
        assert_eq!(nearby.len(), 2);
        assert!(nearby.iter().all(|s| s.fad.is_none()));

        let with_fads = field.sources_near(Tile::new(5, 5), 1, true);
        assert_eq!(with_fads.len(), 3);
        assert_eq!(with_fads[2].fad, Some(FadId(7)));
    }

    #[test]
    fn test_sources_near_huge_radius_scans_stored_cells() {
        let mut field = BiomassField::new();
        field.set_cell(Tile::new(9, 2), Biology::new(vec![1.0]));
        field.set_cell(Tile::new(1, 7), Biology::new(vec![2.0]));
        field.set_cell(Tile::new(3, 2), Biology::new(vec![4.0]));

        let everything = field.sources_near(Tile::new(5, 5), i32::MAX, false);
        let tiles: Vec<Tile> = everything.iter().map(|s| s.tile).collect();
        assert_eq!(tiles, vec![Tile::new(3, 2), Tile::new(9, 2), Tile::new(1, 7)]);
    }

    #[test]
    fn test_empirical_sampler_caps_at_available() {
        let mut sampler = EmpiricalCatchSampler::new(vec![vec![10.0, 10.0]]);
        let mut rng = StdRng::seed_from_u64(1);
        let catch = sampler.draw(&Biology::new(vec![3.0, 20.0]), &mut rng);
        assert_eq!(catch.biomass, vec![3.0, 10.0]);
    }

    #[test]
    fn test_empirical_sampler_cycles_without_replacement() {
        let mut sampler = EmpiricalCatchSampler::new(vec![vec![1.0], vec![2.0], vec![3.0]]);
        let mut rng = StdRng::seed_from_u64(3);
        let plenty = Biology::new(vec![100.0]);
        let mut seen: Vec<f64> = (0..3).map(|_| sampler.draw(&plenty, &mut rng).total()).collect();
        seen.sort_by(f64::total_cmp);
        assert_eq!(seen, vec![1.0, 2.0, 3.0]);
        assert_eq!(sampler.remaining_in_cycle(), 0);
    }
}
