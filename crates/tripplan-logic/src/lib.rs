//! Pure trip planning logic for purse-seine vessels.
//!
//! This crate plans and executes fishing trips: before each trip a vessel
//! draws a route of deployments, FAD sets, searches and other sets, then
//! walks it one stop at a time, replanning when the plan goes stale and
//! heading home when the hold fills up. Nothing here owns a clock, a map or
//! a fleet; the caller passes those in through [`context::SimContext`],
//! which keeps every function testable without a running simulation.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`actions`] | Atomic actions handed to the stepping framework |
//! | [`biology`] | Biomass, catch valuation and empirical catch samplers |
//! | [`config`] | Strategy configuration, validation and builder |
//! | [`context`] | Per-call view of the world (map, rules, market, rng) |
//! | [`generators`] | Location-weighted sampler and per-zone FAD ranking |
//! | [`geography`] | Grid tiles, distances and map discretizations |
//! | [`modules`] | One planning module per action type |
//! | [`plan`] | Ordered route between two arrival markers |
//! | [`planned_action`] | Plan steps: duration, legality, expansion |
//! | [`planner`] | Draw-then-cheapest-insertion trip planner |
//! | [`regulation`] | Action types, legality and permit counts |
//! | [`strategy`] | Executes plans step by step for one vessel |
//! | [`vessel`] | Vessel state, FADs and trip costs |

pub mod actions;
pub mod biology;
pub mod config;
pub mod context;
pub mod generators;
pub mod geography;
pub mod modules;
pub mod plan;
pub mod planned_action;
pub mod planner;
pub mod regulation;
pub mod strategy;
pub mod vessel;
