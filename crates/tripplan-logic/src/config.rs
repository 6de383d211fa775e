//! Strategy configuration: the data model a scenario file deserializes into,
//! validation that reports every broken bound at once, and the builder that
//! turns a valid configuration into a ready [`PlannedStrategy`].
//!
//! ```
//! use tripplan_logic::config::{build_strategy, validate, StrategyConfig};
//! use tripplan_logic::geography::{DistanceMetric, GridMap};
//!
//! let config = StrategyConfig::default();
//! assert!(validate(&config).is_empty());
//!
//! let map = GridMap::new(10, 10, 1.0, DistanceMetric::Euclidean);
//! let strategy = build_strategy(&config, &map).unwrap();
//! assert_eq!(strategy.trips_planned(), 0);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::biology::Association;
use crate::generators::{FadRanking, FadRankingSettings, LocationWeightedSampler};
use crate::geography::{SeaMap, SquareDiscretization, Tile};
use crate::modules::{FadSelectionPolicy, PileWeighting, PlanningModule, Proposal};
use crate::planned_action::{AssociatedSet, OpportunisticSearch, DEFAULT_SET_DURATION};
use crate::planner::{
    DrawThenCheapestInsertionPlanner, DEFAULT_MAX_FAILURES, DEFAULT_MAX_FAILURES_WITH_OVERRIDE,
};
use crate::regulation::ActionType;
use crate::strategy::PlannedStrategy;

/// Biases are turned into odds; these keep the odds finite.
const MIN_BIAS: f64 = 0.0001;
const MAX_BIAS: f64 = 0.9999;

/// A tile and how attractive it is for one action type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationValue {
    pub tile: Tile,
    pub value: f64,
}

/// Which zone-selection rule the own-FAD module uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum FadModuleConfig {
    Greedy {
        #[serde(default)]
        look_ahead: usize,
    },
    MarginalValue,
    CentroidDistance {
        distance_penalty: f64,
    },
    ValuePerSet {
        dampen: f64,
    },
    WeightedPile {
        weighting: PileWeighting,
        exponent: f64,
    },
}

impl Default for FadModuleConfig {
    fn default() -> Self {
        FadModuleConfig::Greedy { look_ahead: 0 }
    }
}

impl FadModuleConfig {
    pub fn to_policy(&self) -> FadSelectionPolicy {
        match self {
            FadModuleConfig::Greedy { look_ahead } => FadSelectionPolicy::Greedy {
                look_ahead: *look_ahead,
            },
            FadModuleConfig::MarginalValue => FadSelectionPolicy::MarginalValue { last_zone: None },
            FadModuleConfig::CentroidDistance { distance_penalty } => {
                FadSelectionPolicy::CentroidDistance {
                    distance_penalty: *distance_penalty,
                }
            }
            FadModuleConfig::ValuePerSet { dampen } => {
                FadSelectionPolicy::ValuePerSet { dampen: *dampen }
            }
            FadModuleConfig::WeightedPile {
                weighting,
                exponent,
            } => FadSelectionPolicy::WeightedPile {
                weighting: *weighting,
                exponent: *exponent,
            },
        }
    }
}

/// Own-FAD module settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnFadConfig {
    pub module: FadModuleConfig,
    /// FADs worth less than this are left in the water.
    pub minimum_value: f64,
    pub vertical_splits: u32,
    pub horizontal_splits: u32,
    /// Inclusive corners of a rectangle never set in.
    pub banned_area: Option<[Tile; 2]>,
    pub filter_illegal: bool,
    pub bad_reading_probability: f64,
    /// Skip a planned own-FAD set whose value has dropped below this.
    pub minimum_value_to_set: f64,
}

impl Default for OwnFadConfig {
    fn default() -> Self {
        Self {
            module: FadModuleConfig::default(),
            minimum_value: 0.0,
            vertical_splits: 2,
            horizontal_splits: 2,
            banned_area: None,
            filter_illegal: true,
            bad_reading_probability: 0.0,
            minimum_value_to_set: 0.0,
        }
    }
}

/// Template for opportunistic searches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub set_hours: f64,
    pub wasted_hours_if_empty: f64,
    pub minimum_value: f64,
    pub probability_of_finding: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            set_hours: 1.0,
            wasted_hours_if_empty: 1.0,
            minimum_value: 0.0,
            probability_of_finding: 1.0,
        }
    }
}

/// Template for dolphin and non-associated sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociatedSetConfig {
    pub set_hours: f64,
    pub dolphin_search_hours: f64,
    pub non_associated_search_hours: f64,
    pub can_poach_fads: bool,
    pub range_in_tiles: i32,
}

impl Default for AssociatedSetConfig {
    fn default() -> Self {
        Self {
            set_hours: DEFAULT_SET_DURATION,
            dolphin_search_hours: 0.0,
            non_associated_search_hours: 0.0,
            can_poach_fads: false,
            range_in_tiles: 0,
        }
    }
}

/// Everything needed to build one vessel's planned strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub max_hours_per_trip: f64,
    /// Each trip's budget is drawn from `[this × max, max]`.
    pub minimum_percentage_of_trip_duration: f64,
    pub planning_horizon_hours: f64,
    pub action_weights: BTreeMap<ActionType, f64>,
    /// Probabilities in `[0, 1]`; a weight is scaled by its bias's odds.
    pub action_biases: BTreeMap<ActionType, f64>,
    pub override_order: Vec<ActionType>,
    pub purge_illegal_actions_immediately: bool,
    pub max_failures: u32,
    pub max_failures_with_override: u32,
    pub deployment_delay_hours: f64,
    pub fishing_delay_hours: f64,
    /// Replace the fishing module with a random legal-tile baseline.
    pub dummy_fishing_attempts: Option<u32>,
    pub location_values: BTreeMap<ActionType, Vec<LocationValue>>,
    pub search: SearchConfig,
    pub associated_sets: AssociatedSetConfig,
    pub own_fad: OwnFadConfig,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            max_hours_per_trip: 24.0 * 60.0,
            minimum_percentage_of_trip_duration: 1.0,
            planning_horizon_hours: 24.0 * 20.0,
            action_weights: BTreeMap::from([(ActionType::Fishing, 1.0)]),
            action_biases: BTreeMap::new(),
            override_order: Vec::new(),
            purge_illegal_actions_immediately: true,
            max_failures: DEFAULT_MAX_FAILURES,
            max_failures_with_override: DEFAULT_MAX_FAILURES_WITH_OVERRIDE,
            deployment_delay_hours: 0.0,
            fishing_delay_hours: 0.0,
            dummy_fishing_attempts: None,
            location_values: BTreeMap::new(),
            search: SearchConfig::default(),
            associated_sets: AssociatedSetConfig::default(),
            own_fad: OwnFadConfig::default(),
        }
    }
}

impl StrategyConfig {
    /// Weights after applying each type's bias: `w × b / (1 − b)`.
    pub fn effective_weights(&self) -> BTreeMap<ActionType, f64> {
        self.action_weights
            .iter()
            .map(|(action_type, weight)| {
                let weight = match self.action_biases.get(action_type) {
                    Some(bias) => {
                        let bias = bias.clamp(MIN_BIAS, MAX_BIAS);
                        weight * bias / (1.0 - bias)
                    }
                    None => *weight,
                };
                (*action_type, weight)
            })
            .collect()
    }

    /// Types that need a planning module: weighted or forced first.
    fn planned_types(&self) -> Vec<ActionType> {
        let weights = self.effective_weights();
        ActionType::ALL
            .into_iter()
            .filter(|t| weights.get(t).is_some_and(|w| *w > 0.0) || self.override_order.contains(t))
            .collect()
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("trip budget must be positive, got {0} hours")]
    NonPositiveTripHours(f64),
    #[error("minimum trip fraction must lie in [0, 1], got {0}")]
    TripFractionOutOfRange(f64),
    #[error("planning horizon must be positive, got {0} hours")]
    NonPositiveHorizon(f64),
    #[error("weight of {0} is negative: {1}")]
    NegativeWeight(ActionType, f64),
    #[error("bias of {0} must lie in [0, 1], got {1}")]
    BiasOutOfRange(ActionType, f64),
    #[error("no action type has a positive weight and nothing is forced first")]
    NothingToPlan,
    #[error("{what} cannot be negative, got {hours} hours")]
    NegativeHours { what: &'static str, hours: f64 },
    #[error("{what} must be a probability, got {value}")]
    ProbabilityOutOfRange { what: &'static str, value: f64 },
    #[error("dampen must lie in [0, 1], got {0}")]
    DampenOutOfRange(f64),
    #[error("failure budget must be at least one")]
    ZeroFailureBudget,
    #[error("banned area corners are reversed: {0} .. {1}")]
    InvalidBannedArea(Tile, Tile),
    #[error("search range cannot be negative, got {0} tiles")]
    NegativeRange(i32),
    #[error("{} configuration errors: {}", .0.len(), join(.0))]
    Multiple(Vec<ConfigError>),
}

fn join(errors: &[ConfigError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
}

fn is_probability(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

/// Validate a strategy configuration, returning all errors found.
pub fn validate(config: &StrategyConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if !(config.max_hours_per_trip > 0.0 && config.max_hours_per_trip.is_finite()) {
        errors.push(ConfigError::NonPositiveTripHours(config.max_hours_per_trip));
    }
    if !is_probability(config.minimum_percentage_of_trip_duration) {
        errors.push(ConfigError::TripFractionOutOfRange(
            config.minimum_percentage_of_trip_duration,
        ));
    }
    if !(config.planning_horizon_hours > 0.0) {
        errors.push(ConfigError::NonPositiveHorizon(config.planning_horizon_hours));
    }

    for (action_type, weight) in &config.action_weights {
        if !(*weight >= 0.0) {
            errors.push(ConfigError::NegativeWeight(*action_type, *weight));
        }
    }
    for (action_type, bias) in &config.action_biases {
        if !is_probability(*bias) {
            errors.push(ConfigError::BiasOutOfRange(*action_type, *bias));
        }
    }
    if config.planned_types().is_empty() {
        errors.push(ConfigError::NothingToPlan);
    }

    let hours = [
        ("deployment delay", config.deployment_delay_hours),
        ("fishing delay", config.fishing_delay_hours),
        ("search set duration", config.search.set_hours),
        ("wasted search time", config.search.wasted_hours_if_empty),
        ("associated set duration", config.associated_sets.set_hours),
        ("dolphin search time", config.associated_sets.dolphin_search_hours),
        ("non-associated search time", config.associated_sets.non_associated_search_hours),
    ];
    for (what, hours) in hours {
        if !(hours >= 0.0) {
            errors.push(ConfigError::NegativeHours { what, hours });
        }
    }

    let probabilities = [
        ("probability of finding a foreign FAD", config.search.probability_of_finding),
        ("bad reading probability", config.own_fad.bad_reading_probability),
    ];
    for (what, value) in probabilities {
        if !is_probability(value) {
            errors.push(ConfigError::ProbabilityOutOfRange { what, value });
        }
    }

    if let FadModuleConfig::ValuePerSet { dampen } = config.own_fad.module {
        if !is_probability(dampen) {
            errors.push(ConfigError::DampenOutOfRange(dampen));
        }
    }
    if config.max_failures == 0 || config.max_failures_with_override == 0 {
        errors.push(ConfigError::ZeroFailureBudget);
    }
    if let Some([low, high]) = config.own_fad.banned_area {
        if low.x > high.x || low.y > high.y {
            errors.push(ConfigError::InvalidBannedArea(low, high));
        }
    }
    if config.associated_sets.range_in_tiles < 0 {
        errors.push(ConfigError::NegativeRange(config.associated_sets.range_in_tiles));
    }

    errors
}

fn location_sampler(config: &StrategyConfig, action_type: ActionType) -> LocationWeightedSampler {
    let values: BTreeMap<Tile, f64> = config
        .location_values
        .get(&action_type)
        .map(|values| values.iter().map(|v| (v.tile, v.value)).collect())
        .unwrap_or_default();
    if values.is_empty() {
        log::warn!(
            "{} has no location values; candidates will be drawn uniformly over water",
            action_type
        );
    }
    LocationWeightedSampler::new(values)
}

fn associated_set(config: &AssociatedSetConfig, association: Association) -> AssociatedSet {
    let search_hours = match association {
        Association::Dolphin => config.dolphin_search_hours,
        Association::NonAssociated => config.non_associated_search_hours,
    };
    AssociatedSet {
        set_hours: config.set_hours,
        can_poach_fads: config.can_poach_fads,
        range_in_tiles: config.range_in_tiles,
        ..AssociatedSet::new(association, Tile::new(0, 0), search_hours)
    }
}

fn build_module(
    config: &StrategyConfig,
    action_type: ActionType,
    map: &dyn SeaMap,
) -> PlanningModule {
    let location_value = |proposal: Proposal| {
        PlanningModule::location_value(location_sampler(config, action_type), proposal)
    };
    match action_type {
        ActionType::Deployment => location_value(Proposal::Deploy {
            delay_hours: config.deployment_delay_hours,
        }),
        ActionType::Fishing => match config.dummy_fishing_attempts {
            Some(attempts) => PlanningModule::dummy(attempts, config.fishing_delay_hours),
            None => location_value(Proposal::Fishing {
                delay_hours: config.fishing_delay_hours,
            }),
        },
        ActionType::OpportunisticFadSet => location_value(Proposal::Search(OpportunisticSearch {
            tile: Tile::new(0, 0),
            set_hours: config.search.set_hours,
            wasted_hours_if_empty: config.search.wasted_hours_if_empty,
            minimum_value: config.search.minimum_value,
            probability_of_finding: config.search.probability_of_finding,
        })),
        ActionType::DolphinSet => location_value(Proposal::Set(associated_set(
            &config.associated_sets,
            Association::Dolphin,
        ))),
        ActionType::NonAssociatedSet => location_value(Proposal::Set(associated_set(
            &config.associated_sets,
            Association::NonAssociated,
        ))),
        ActionType::OwnFadSet => {
            let own = &config.own_fad;
            let discretization =
                SquareDiscretization::for_map(map, own.vertical_splits, own.horizontal_splits);
            let settings = FadRankingSettings {
                minimum_value: own.minimum_value,
                banned: own.banned_area.map(|[low, high]| (low, high)),
                filter_illegal: own.filter_illegal,
                bad_reading_probability: own.bad_reading_probability,
            };
            PlanningModule::own_fad(
                FadRanking::new(Box::new(discretization), settings),
                own.module.to_policy(),
            )
        }
    }
}

/// Build a strategy from a configuration, rejecting it if it does not
/// validate. A single problem comes back as itself, several as `Multiple`.
pub fn build_strategy(
    config: &StrategyConfig,
    map: &dyn SeaMap,
) -> Result<PlannedStrategy, ConfigError> {
    let mut errors = validate(config);
    match errors.len() {
        0 => {}
        1 => return Err(errors.remove(0)),
        _ => return Err(ConfigError::Multiple(errors)),
    }

    let modules: BTreeMap<ActionType, PlanningModule> = config
        .planned_types()
        .into_iter()
        .map(|action_type| (action_type, build_module(config, action_type, map)))
        .collect();
    log::debug!(
        "building strategy with modules for {:?}",
        modules.keys().collect::<Vec<_>>()
    );

    let planner = DrawThenCheapestInsertionPlanner::new(
        config.max_hours_per_trip,
        config.effective_weights(),
        modules,
    )
    .with_override_order(config.override_order.clone())
    .with_minimum_percentage_of_trip_duration(config.minimum_percentage_of_trip_duration)
    .with_purge_illegal_actions_immediately(config.purge_illegal_actions_immediately)
    .with_failure_budgets(config.max_failures, config.max_failures_with_override);

    Ok(PlannedStrategy::new(
        planner,
        config.planning_horizon_hours,
        config.own_fad.minimum_value_to_set,
    ))
}
