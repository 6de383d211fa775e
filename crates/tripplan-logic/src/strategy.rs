//! Per-vessel execution of trip plans.
//!
//! The stepping framework calls two things on every tick:
//!
//! - [`PlannedStrategy::choose_destination`] to learn where to steam to;
//! - [`PlannedStrategy::act`] once the vessel is there, to get the next
//!   atomic action.
//!
//! Between them the strategy walks the plan one planned action at a time,
//! draining each action's atomic sub-actions, replanning when the plan has
//! gone stale and sending the vessel home when the hold is full or the trip
//! has run long.

use std::collections::VecDeque;

use crate::actions::{ActionResult, AtomicAction};
use crate::context::SimContext;
use crate::geography::Tile;
use crate::plan::Plan;
use crate::planned_action::PlannedAction;
use crate::planner::DrawThenCheapestInsertionPlanner;
use crate::vessel::Vessel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripPhase {
    /// No active trip.
    AtPort,
    /// Working through the plan.
    Executing,
    /// Plan abandoned, heading straight home.
    ReturningHome,
}

#[derive(Debug)]
pub struct PlannedStrategy {
    planner: DrawThenCheapestInsertionPlanner,
    /// Hours after the last (re)plan before the plan counts as stale.
    pub planning_horizon_hours: f64,
    /// Own-FAD sets worth less than this when the vessel gets there are skipped.
    pub minimum_value_own_fad_set: f64,
    phase: TripPhase,
    plan: Option<Plan>,
    in_progress: Option<PlannedAction>,
    /// Sub-actions of `in_progress`; `None` until the vessel reaches it.
    queue: Option<VecDeque<AtomicAction>>,
    last_handed_fad_set: bool,
    trip_started_at: f64,
    last_replan_at: f64,
    trips: u32,
    replans: u32,
}

impl PlannedStrategy {
    pub fn new(
        planner: DrawThenCheapestInsertionPlanner,
        planning_horizon_hours: f64,
        minimum_value_own_fad_set: f64,
    ) -> Self {
        Self {
            planner,
            planning_horizon_hours,
            minimum_value_own_fad_set,
            phase: TripPhase::AtPort,
            plan: None,
            in_progress: None,
            queue: None,
            last_handed_fad_set: false,
            trip_started_at: 0.0,
            last_replan_at: 0.0,
            trips: 0,
            replans: 0,
        }
    }

    pub fn phase(&self) -> TripPhase {
        self.phase
    }

    /// What is left of the current plan, excluding the action in progress.
    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    pub fn action_in_progress(&self) -> Option<&PlannedAction> {
        self.in_progress.as_ref()
    }

    pub fn planner(&self) -> &DrawThenCheapestInsertionPlanner {
        &self.planner
    }

    pub fn trips_planned(&self) -> u32 {
        self.trips
    }

    pub fn replans(&self) -> u32 {
        self.replans
    }

    /// Hours since the current trip was planned.
    pub fn trip_duration(&self, ctx: &SimContext) -> f64 {
        ctx.hours_since_start - self.trip_started_at
    }

    /// Keep fishing while there is room in the hold.
    pub fn should_fish(&self, vessel: &Vessel) -> bool {
        !vessel.is_hold_full()
    }

    /// Full hold, or the trip has outlasted its budget while something other
    /// than the trip's own arrival was in progress.
    pub fn wants_to_go_home(&self, ctx: &SimContext, vessel: &Vessel) -> bool {
        let target = self.planner.this_trip_target_hours();
        let too_late = self.in_progress.as_ref().is_some_and(|a| !a.is_arrival())
            && target > 0.0
            && target < self.trip_duration(ctx);
        vessel.is_hold_full() || too_late
    }

    /// Where the vessel should be heading. `current_action` is what the
    /// framework is doing right now; `None` means docked.
    pub fn choose_destination(
        &mut self,
        ctx: &mut SimContext,
        vessel: &Vessel,
        current_action: Option<&AtomicAction>,
    ) -> Tile {
        if self.phase == TripPhase::ReturningHome {
            return vessel.home_port;
        }
        if !vessel.is_at_port() && self.wants_to_go_home(ctx, vessel) {
            log::debug!("vessel {} cutting the trip short", vessel.id);
            self.phase = TripPhase::ReturningHome;
            return vessel.home_port;
        }

        if current_action.is_none() || self.phase == TripPhase::AtPort {
            self.start_trip(ctx, vessel);
        } else if !self.in_progress_is_valid(ctx, vessel) {
            // the FAD just set on is gone; finish the set where we are
            let still_setting = matches!(current_action, Some(AtomicAction::SetOnFad { .. }));
            if self.last_handed_fad_set && still_setting {
                return vessel.location;
            }
            if !vessel.is_at_port() || vessel.hours_at_sea <= 0.0 {
                self.replan(ctx, vessel);
            } else {
                self.phase = TripPhase::ReturningHome;
                return vessel.home_port;
            }
        }

        self.in_progress
            .as_ref()
            .and_then(|a| a.live_location(vessel))
            .unwrap_or(vessel.home_port)
    }

    fn in_progress_is_valid(&self, ctx: &SimContext, vessel: &Vessel) -> bool {
        match &self.in_progress {
            Some(action) => {
                action.live_location(vessel).is_some()
                    && action.is_allowed_now(vessel, ctx.regulations)
            }
            None => false,
        }
    }

    /// The next atomic action, called once the vessel has reached the
    /// destination it was given.
    pub fn act(&mut self, ctx: &mut SimContext, vessel: &Vessel, hours_left: f64) -> ActionResult {
        if self.phase == TripPhase::ReturningHome {
            if vessel.is_at_port() {
                self.end_trip();
                return ActionResult::new(AtomicAction::Arriving, hours_left);
            }
            return ActionResult::new(AtomicAction::Moving, hours_left);
        }

        loop {
            let Some(in_progress) = self.in_progress.as_ref() else {
                self.end_trip();
                return ActionResult::new(AtomicAction::Arriving, hours_left);
            };
            let queue = self.queue.get_or_insert_with(|| {
                if in_progress.is_allowed_now(vessel, ctx.regulations) {
                    in_progress.actuate().into()
                } else {
                    VecDeque::new()
                }
            });

            if let Some(next) = queue.pop_front() {
                if !vessel.is_gear_safe(&next) || !self.is_still_desirable(&next, ctx, vessel) {
                    continue;
                }
                self.last_handed_fad_set = matches!(next, AtomicAction::SetOnFad { .. });
                if next == AtomicAction::Arriving {
                    self.end_trip();
                    return ActionResult::new(next, hours_left);
                }
                return ActionResult::new(Self::commit(next, ctx), hours_left);
            }

            self.queue = None;
            let stale = ctx.hours_since_start - self.last_replan_at > self.planning_horizon_hours;
            if stale && !vessel.is_at_port() {
                self.replan(ctx, vessel);
            } else {
                self.in_progress = self.plan.as_mut().and_then(|p| p.poll_next_action());
            }

            match self.in_progress.as_ref().map(|a| a.live_location(vessel)) {
                Some(Some(tile)) if tile == vessel.location => continue,
                None => continue,
                _ => return ActionResult::new(AtomicAction::Moving, hours_left),
            }
        }
    }

    fn is_still_desirable(&self, action: &AtomicAction, ctx: &SimContext, vessel: &Vessel) -> bool {
        match action {
            AtomicAction::SetOnFad { fad, .. } => vessel.fad(*fad).is_some_and(|f| {
                ctx.valuation.value_of(&f.biology, ctx.prices) >= self.minimum_value_own_fad_set
            }),
            _ => true,
        }
    }

    /// Draw the catch of a deferred set at the last possible moment.
    fn commit(action: AtomicAction, ctx: &mut SimContext) -> AtomicAction {
        match action {
            AtomicAction::PendingSet(set) => AtomicAction::CatchSet(set.commit(
                ctx.biomass,
                ctx.samplers.as_deref_mut(),
                &mut *ctx.rng,
            )),
            other => other,
        }
    }

    fn start_trip(&mut self, ctx: &mut SimContext, vessel: &Vessel) {
        self.trip_started_at = ctx.hours_since_start;
        self.last_replan_at = ctx.hours_since_start;
        let plan = self.planner.plan_new_trip(ctx, vessel);
        self.trips += 1;
        self.adopt(plan);
    }

    fn replan(&mut self, ctx: &mut SimContext, vessel: &Vessel) {
        let spent = self.trip_duration(ctx);
        self.last_replan_at = ctx.hours_since_start;
        let previous = self
            .plan
            .take()
            .unwrap_or_else(|| Plan::new(vessel.location, vessel.home_port));
        let plan = self.planner.replan(ctx, vessel, &previous, spent);
        self.replans += 1;
        self.adopt(plan);
    }

    /// Take over a fresh plan, skipping its start marker.
    fn adopt(&mut self, mut plan: Plan) {
        debug_assert!(plan
            .peek_next_action()
            .is_some_and(|a| a.is_arrival() && !a.is_end_of_trip()));
        plan.poll_next_action();
        self.in_progress = plan.poll_next_action();
        self.plan = Some(plan);
        self.queue = None;
        self.last_handed_fad_set = false;
        self.phase = TripPhase::Executing;
    }

    fn end_trip(&mut self) {
        self.phase = TripPhase::AtPort;
        self.plan = None;
        self.in_progress = None;
        self.queue = None;
        self.last_handed_fad_set = false;
    }

    pub fn turn_off(&mut self) {
        self.end_trip();
        self.planner.turn_off();
    }
}
