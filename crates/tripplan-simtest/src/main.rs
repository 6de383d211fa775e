//! Tripplan Headless Fleet Harness
//!
//! Runs a small fleet through several planned trips on a synthetic sea and
//! checks what a stepping framework relies on: every trip ends at port,
//! stays inside its budget, never acts in a closed area and never exceeds a
//! permit cap. Runs entirely in-process with no framework, no rendering.
//!
//! Usage:
//!   cargo run -p tripplan-simtest
//!   cargo run -p tripplan-simtest -- --verbose

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;

use tripplan_logic::actions::AtomicAction;
use tripplan_logic::biology::{
    Association, Biology, BiomassField, CatchSamplers, EmpiricalCatchSampler,
    PriceWeightedValuation,
};
use tripplan_logic::config::{build_strategy, validate, ConfigError, StrategyConfig};
use tripplan_logic::context::SimContext;
use tripplan_logic::geography::{DistanceMetric, GridMap, SeaMap, Tile};
use tripplan_logic::regulation::{ActionType, RegulationTable, Regulations};
use tripplan_logic::strategy::PlannedStrategy;
use tripplan_logic::vessel::{Fad, FadId, Vessel};

// ── Scenario (synthetic sea, fleet and strategy) ────────────────────────
const SCENARIO_JSON: &str = include_str!("../../../data/scenario.json");

const MAX_STEPS_PER_TRIP: usize = 5_000;

#[derive(Debug, Deserialize)]
struct Scenario {
    seed: u64,
    trips_per_vessel: u32,
    fad_growth_per_trip: Vec<f64>,
    map: MapSpec,
    prices: Vec<f64>,
    #[serde(default)]
    regulations: RegulationTable,
    #[serde(default)]
    biomass: Vec<CellSpec>,
    #[serde(default)]
    dolphin_catches: Vec<Vec<f64>>,
    #[serde(default)]
    non_associated_catches: Vec<Vec<f64>>,
    fleet: Vec<VesselSpec>,
    strategy: StrategyConfig,
}

#[derive(Debug, Deserialize)]
struct MapSpec {
    width: i32,
    height: i32,
    cell_km: f64,
    #[serde(default)]
    metric: DistanceMetric,
    #[serde(default)]
    land: Vec<Tile>,
}

#[derive(Debug, Deserialize)]
struct CellSpec {
    tile: Tile,
    biomass: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct VesselSpec {
    id: u32,
    home_port: Tile,
    speed_kph: f64,
    hold_capacity: f64,
    fads_in_stock: u32,
    active_fad_cap: u32,
    #[serde(default)]
    fads: Vec<FadSpec>,
}

#[derive(Debug, Deserialize)]
struct FadSpec {
    id: u64,
    tile: Tile,
    biomass: Vec<f64>,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== Tripplan Fleet Harness ===\n");

    let scenario: Scenario = match serde_json::from_str(SCENARIO_JSON) {
        Ok(s) => s,
        Err(e) => {
            println!("  ✗ scenario_parse: JSON parse error: {}", e);
            std::process::exit(1);
        }
    };

    let mut results = Vec::new();

    // 1. Scenario and strategy configuration
    results.extend(validate_scenario(&scenario, verbose));

    // 2. Fleet trips
    results.extend(validate_fleet_trips(&scenario, verbose));

    // 3. Same seed, same trips
    results.extend(validate_determinism(&scenario, verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── Simulated sea ───────────────────────────────────────────────────────

struct Sea {
    map: GridMap,
    regulations: RegulationTable,
    biomass: BiomassField,
    samplers: CatchSamplers,
    prices: Vec<f64>,
    rng: StdRng,
}

impl Sea {
    fn new(scenario: &Scenario) -> Self {
        let spec = &scenario.map;
        let map = GridMap::new(spec.width, spec.height, spec.cell_km, spec.metric)
            .with_land(spec.land.iter().copied());

        let mut biomass = BiomassField::new();
        for cell in &scenario.biomass {
            biomass.set_cell(cell.tile, Biology::new(cell.biomass.clone()));
        }

        let mut samplers = CatchSamplers::new();
        if !scenario.dolphin_catches.is_empty() {
            samplers.insert(
                Association::Dolphin,
                Box::new(EmpiricalCatchSampler::new(scenario.dolphin_catches.clone())),
            );
        }
        if !scenario.non_associated_catches.is_empty() {
            samplers.insert(
                Association::NonAssociated,
                Box::new(EmpiricalCatchSampler::new(scenario.non_associated_catches.clone())),
            );
        }

        Self {
            map,
            regulations: scenario.regulations.clone(),
            biomass,
            samplers,
            prices: scenario.prices.clone(),
            rng: StdRng::seed_from_u64(scenario.seed),
        }
    }

    fn ctx(&mut self, clock: f64) -> SimContext<'_> {
        SimContext::new(&self.map, &self.regulations, &mut self.rng)
            .with_market(&PriceWeightedValuation, &self.prices)
            .with_biomass(&self.biomass)
            .with_samplers(&mut self.samplers)
            .at_hour(clock)
    }
}

/// One vessel with its own strategy and clock.
struct Boat {
    vessel: Vessel,
    strategy: PlannedStrategy,
    clock: f64,
    initial_stock: u32,
    landed: f64,
}

fn build_vessel(spec: &VesselSpec) -> Vessel {
    let mut vessel = Vessel::new(spec.id, spec.home_port, spec.speed_kph);
    vessel.hold_capacity = spec.hold_capacity;
    vessel.fads_in_stock = spec.fads_in_stock;
    vessel.active_fad_cap = spec.active_fad_cap;
    vessel.fads = spec
        .fads
        .iter()
        .map(|f| Fad::new(FadId(f.id), f.tile, Biology::new(f.biomass.clone()), 0.0))
        .collect();
    vessel
}

fn build_fleet(scenario: &Scenario, map: &GridMap) -> Result<Vec<Boat>, ConfigError> {
    scenario
        .fleet
        .iter()
        .map(|spec| {
            Ok(Boat {
                vessel: build_vessel(spec),
                strategy: build_strategy(&scenario.strategy, map)?,
                clock: 0.0,
                initial_stock: spec.fads_in_stock,
                landed: 0.0,
            })
        })
        .collect()
}

/// What happened on one trip.
#[derive(Debug, Clone, PartialEq)]
struct TripRecord {
    vessel: u32,
    hours: f64,
    ended_at_port: bool,
    illegal_actions: usize,
    actions: Vec<(Tile, AtomicAction)>,
}

fn action_type_of(action: &AtomicAction) -> Option<ActionType> {
    match action {
        AtomicAction::DeployFad { .. } => Some(ActionType::Deployment),
        AtomicAction::SetOnFad { .. } => Some(ActionType::OwnFadSet),
        AtomicAction::SearchForFads { .. } => Some(ActionType::OpportunisticFadSet),
        AtomicAction::Fish => Some(ActionType::Fishing),
        AtomicAction::CatchSet(set) => Some(match set.association {
            Association::Dolphin => ActionType::DolphinSet,
            Association::NonAssociated => ActionType::NonAssociatedSet,
        }),
        _ => None,
    }
}

/// Carry out an atomic action and advance the boat's clock.
fn apply(boat: &mut Boat, action: &AtomicAction, species: usize) {
    let vessel = &mut boat.vessel;
    match action {
        AtomicAction::DeployFad { tile } => {
            vessel.fads_in_stock = vessel.fads_in_stock.saturating_sub(1);
            let id = FadId(u64::from(vessel.id) * 100_000 + vessel.fads.len() as u64);
            vessel
                .fads
                .push(Fad::new(id, *tile, Biology::empty(species), boat.clock));
        }
        AtomicAction::SetOnFad { fad, hours } => {
            if let Some(fad) = vessel.fads.iter_mut().find(|f| f.id == *fad) {
                vessel.hold += fad.biology.total();
                fad.location = None;
            }
            boat.clock += hours;
        }
        AtomicAction::SearchForFads {
            set_hours,
            wasted_hours,
            ..
        } => boat.clock += set_hours + wasted_hours,
        AtomicAction::Fish => boat.clock += 1.0,
        AtomicAction::Delay { hours } => boat.clock += hours,
        AtomicAction::CatchSet(set) => {
            vessel.hold += set.catch.total();
            boat.clock += set.hours;
        }
        _ => {}
    }
    if let Some(action_type) = action_type_of(action) {
        boat.vessel.record_action(action_type);
    }
}

fn run_trip(sea: &mut Sea, boat: &mut Boat) -> TripRecord {
    let started = boat.clock;
    let mut actions = Vec::new();
    let mut illegal_actions = 0;
    let mut current: Option<AtomicAction> = None;

    for _ in 0..MAX_STEPS_PER_TRIP {
        let destination = boat
            .strategy
            .choose_destination(&mut sea.ctx(boat.clock), &boat.vessel, current.as_ref());
        if destination != boat.vessel.location {
            let hours = sea.map.distance(boat.vessel.location, destination) / boat.vessel.speed_kph;
            boat.clock += hours;
            boat.vessel.hours_at_sea += hours;
            boat.vessel.location = destination;
        }

        let result = boat.strategy.act(&mut sea.ctx(boat.clock), &boat.vessel, 1.0);
        if let Some(action_type) = action_type_of(&result.action) {
            if !sea
                .regulations
                .is_allowed(&boat.vessel, boat.vessel.location, action_type)
            {
                illegal_actions += 1;
            }
        }
        apply(boat, &result.action, sea.prices.len());
        actions.push((boat.vessel.location, result.action.clone()));

        if result.action == AtomicAction::Arriving {
            boat.vessel.hours_at_sea = 0.0;
            boat.landed += boat.vessel.hold;
            boat.vessel.hold = 0.0;
            return TripRecord {
                vessel: boat.vessel.id,
                hours: boat.clock - started,
                ended_at_port: boat.vessel.is_at_port(),
                illegal_actions,
                actions,
            };
        }
        current = Some(result.action);
    }

    TripRecord {
        vessel: boat.vessel.id,
        hours: boat.clock - started,
        ended_at_port: false,
        illegal_actions,
        actions,
    }
}

/// FADs soak up fish while the boats are in port.
fn grow_fads(boat: &mut Boat, growth: &[f64]) {
    for fad in boat.vessel.fads.iter_mut().filter(|f| !f.is_lost()) {
        fad.biology.add(&Biology::new(growth.to_vec()));
    }
}

fn run_fleet(scenario: &Scenario) -> Result<(Vec<TripRecord>, Vec<Boat>), ConfigError> {
    let mut sea = Sea::new(scenario);
    let mut boats = build_fleet(scenario, &sea.map)?;
    let mut trips = Vec::new();
    for _ in 0..scenario.trips_per_vessel {
        for boat in boats.iter_mut() {
            trips.push(run_trip(&mut sea, boat));
            grow_fads(boat, &scenario.fad_growth_per_trip);
            // a day in port between trips
            boat.clock += 24.0;
        }
    }
    Ok((trips, boats))
}

// ── 1. Scenario ─────────────────────────────────────────────────────────

fn validate_scenario(scenario: &Scenario, verbose: bool) -> Vec<TestResult> {
    println!("--- Scenario & Configuration ---");
    let mut results = Vec::new();

    let errors = validate(&scenario.strategy);
    results.push(TestResult {
        name: "config_validates".into(),
        passed: errors.is_empty(),
        detail: if errors.is_empty() {
            "strategy configuration is valid".into()
        } else {
            errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        },
    });

    let sea = Sea::new(scenario);
    let ports_on_water = scenario.fleet.iter().all(|v| sea.map.is_water(v.home_port));
    results.push(TestResult {
        name: "ports_on_water".into(),
        passed: !scenario.fleet.is_empty() && ports_on_water,
        detail: format!(
            "{} vessels, all home ports navigable={}",
            scenario.fleet.len(),
            ports_on_water
        ),
    });

    let built = build_fleet(scenario, &sea.map);
    results.push(TestResult {
        name: "strategies_build".into(),
        passed: built.is_ok(),
        detail: match &built {
            Ok(boats) => format!("{} strategies built", boats.len()),
            Err(e) => e.to_string(),
        },
    });

    let weights = scenario.strategy.effective_weights();
    results.push(TestResult {
        name: "biases_applied".into(),
        passed: weights.values().all(|w| w.is_finite() && *w >= 0.0),
        detail: format!("{} weighted action types", weights.len()),
    });

    if verbose {
        println!("  Effective weights:");
        for (action_type, weight) in &weights {
            println!("    {}: {:.3}", action_type, weight);
        }
    }

    results
}

// ── 2. Fleet trips ──────────────────────────────────────────────────────

fn validate_fleet_trips(scenario: &Scenario, verbose: bool) -> Vec<TestResult> {
    println!("--- Fleet Trips ---");
    let mut results = Vec::new();

    let (trips, boats) = match run_fleet(scenario) {
        Ok(run) => run,
        Err(e) => {
            results.push(TestResult {
                name: "fleet_runs".into(),
                passed: false,
                detail: e.to_string(),
            });
            return results;
        }
    };

    let expected = scenario.fleet.len() * scenario.trips_per_vessel as usize;
    results.push(TestResult {
        name: "fleet_trip_count".into(),
        passed: trips.len() == expected,
        detail: format!("{} trips run, {} expected", trips.len(), expected),
    });

    let stranded: Vec<_> = trips.iter().filter(|t| !t.ended_at_port).collect();
    results.push(TestResult {
        name: "trips_end_at_port".into(),
        passed: stranded.is_empty(),
        detail: if stranded.is_empty() {
            "every trip ended with an arrival at port".into()
        } else {
            format!("{} trips never made it home", stranded.len())
        },
    });

    // overshoot is bounded by the longest way home plus one action
    let diagonal = Tile::new(0, 0);
    let far_corner = Tile::new(scenario.map.width - 1, scenario.map.height - 1);
    let slowest = scenario
        .fleet
        .iter()
        .map(|v| v.speed_kph)
        .fold(f64::INFINITY, f64::min);
    let slack = Sea::new(scenario).map.distance(diagonal, far_corner) / slowest + 24.0;
    let budget = scenario.strategy.max_hours_per_trip + slack;
    let overlong: Vec<_> = trips.iter().filter(|t| t.hours > budget).collect();
    results.push(TestResult {
        name: "trips_within_budget".into(),
        passed: overlong.is_empty(),
        detail: format!(
            "longest trip {:.1}h, allowed {:.1}h",
            trips.iter().map(|t| t.hours).fold(0.0, f64::max),
            budget
        ),
    });

    let illegal: usize = trips.iter().map(|t| t.illegal_actions).sum();
    results.push(TestResult {
        name: "closed_areas_respected".into(),
        passed: illegal == 0,
        detail: format!("{} actions taken inside closed areas", illegal),
    });

    let mut cap_breaches = Vec::new();
    for boat in &boats {
        for (action_type, cap) in &scenario.regulations.caps {
            let taken = boat.vessel.actions_taken(*action_type);
            if taken > *cap {
                cap_breaches.push(format!(
                    "vessel {} {} {}/{}",
                    boat.vessel.id, action_type, taken, cap
                ));
            }
        }
    }
    results.push(TestResult {
        name: "permit_caps_respected".into(),
        passed: cap_breaches.is_empty(),
        detail: if cap_breaches.is_empty() {
            "no vessel exceeded a cap".into()
        } else {
            cap_breaches.join(", ")
        },
    });

    let overdeployed: Vec<_> = boats
        .iter()
        .filter(|b| b.vessel.actions_taken(ActionType::Deployment) > b.initial_stock)
        .collect();
    let over_cap: Vec<_> = boats
        .iter()
        .filter(|b| b.vessel.deployed_fad_count() > b.vessel.active_fad_cap)
        .collect();
    results.push(TestResult {
        name: "deployments_within_stock_and_cap".into(),
        passed: overdeployed.is_empty() && over_cap.is_empty(),
        detail: format!(
            "{} over stock, {} over active cap",
            overdeployed.len(),
            over_cap.len()
        ),
    });

    let pending: usize = trips
        .iter()
        .flat_map(|t| &t.actions)
        .filter(|(_, a)| matches!(a, AtomicAction::PendingSet(_)))
        .count();
    results.push(TestResult {
        name: "no_uncommitted_sets".into(),
        passed: pending == 0,
        detail: format!("{} pending sets handed out", pending),
    });

    let landed: f64 = boats.iter().map(|b| b.landed).sum();
    results.push(TestResult {
        name: "fleet_lands_fish".into(),
        passed: landed > 0.0,
        detail: format!("{:.1} t landed across the fleet", landed),
    });

    if verbose {
        println!("  Trips:");
        for trip in &trips {
            let by_type = ActionType::ALL
                .iter()
                .map(|t| {
                    let n = trip
                        .actions
                        .iter()
                        .filter(|(_, a)| action_type_of(a) == Some(*t))
                        .count();
                    format!("{}={}", t, n)
                })
                .collect::<Vec<_>>()
                .join(" ");
            println!("    vessel {}: {:6.1}h  {}", trip.vessel, trip.hours, by_type);
        }
        for boat in &boats {
            println!(
                "    vessel {}: {} trips, {} replans, {:.1} t landed",
                boat.vessel.id,
                boat.strategy.trips_planned(),
                boat.strategy.replans(),
                boat.landed
            );
        }
    }

    results
}

// ── 3. Determinism ──────────────────────────────────────────────────────

fn validate_determinism(scenario: &Scenario, _verbose: bool) -> Vec<TestResult> {
    println!("--- Determinism ---");
    let mut results = Vec::new();

    let first = run_fleet(scenario).map(|(trips, _)| trips);
    let second = run_fleet(scenario).map(|(trips, _)| trips);
    let same = match (&first, &second) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    };
    results.push(TestResult {
        name: "same_seed_same_trips".into(),
        passed: same,
        detail: "two runs from the same seed hand out identical actions".into(),
    });

    results
}
