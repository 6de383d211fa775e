//! The trip plan: an ordered route framed by two arrival markers.

use std::collections::VecDeque;

use crate::geography::{SeaMap, Tile};
use crate::planned_action::PlannedAction;

/// Running mean that supports removing previously added values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IncrementalMean {
    mean: f64,
    count: usize,
}

impl IncrementalMean {
    pub fn add(&mut self, value: f64) {
        self.count += 1;
        self.mean += (value - self.mean) / self.count as f64;
    }

    pub fn remove(&mut self, value: f64) {
        match self.count {
            0 => {}
            1 => *self = Self::default(),
            n => {
                self.mean = (self.mean * n as f64 - value) / (n - 1) as f64;
                self.count = n - 1;
            }
        }
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// Ordered list of planned actions.
///
/// Always starts and ends with an `Arrival` while it is being built; the
/// execution side then consumes it from the front.
#[derive(Debug, Clone)]
pub struct Plan {
    actions: VecDeque<PlannedAction>,
    x: IncrementalMean,
    y: IncrementalMean,
    hours_estimated: f64,
}

impl Plan {
    /// A plan that leaves `start` and ends at `end`, with nothing in between.
    pub fn new(start: Tile, end: Tile) -> Self {
        let mut plan = Self {
            actions: VecDeque::with_capacity(8),
            x: IncrementalMean::default(),
            y: IncrementalMean::default(),
            hours_estimated: 0.0,
        };
        plan.push_tracked(PlannedAction::arrival(start, false), 0);
        plan.push_tracked(PlannedAction::arrival(end, true), 1);
        plan
    }

    fn push_tracked(&mut self, action: PlannedAction, index: usize) {
        if let Some(tile) = action.location() {
            self.x.add(tile.x as f64);
            self.y.add(tile.y as f64);
        }
        self.actions.insert(index, action);
    }

    /// Insert `action` at `index`, which must lie strictly after the start
    /// marker and no later than the end marker's current position.
    ///
    /// # Panics
    /// When `index` would displace the start marker or land after the end.
    pub fn insert_action(&mut self, action: PlannedAction, index: usize) {
        assert!(
            index > 0 && index < self.actions.len(),
            "cannot insert at {} in a plan of {} steps",
            index,
            self.actions.len()
        );
        self.push_tracked(action, index);
    }

    /// Insert and account for the hours the insertion costs.
    pub fn insert_action_with_hours(&mut self, action: PlannedAction, index: usize, hours: f64) {
        self.insert_action(action, index);
        self.hours_estimated += hours;
    }

    pub fn add_hours_estimated(&mut self, hours: f64) {
        self.hours_estimated += hours;
    }

    /// Hours of travel and work the plan is expected to take.
    pub fn hours_estimated(&self) -> f64 {
        self.hours_estimated
    }

    pub fn poll_next_action(&mut self) -> Option<PlannedAction> {
        let action = self.actions.pop_front()?;
        if let Some(tile) = action.location() {
            self.x.remove(tile.x as f64);
            self.y.remove(tile.y as f64);
        }
        if self.actions.is_empty() {
            self.x = IncrementalMean::default();
            self.y = IncrementalMean::default();
        }
        Some(action)
    }

    pub fn peek_next_action(&self) -> Option<&PlannedAction> {
        self.actions.front()
    }

    pub fn peek_last_action(&self) -> Option<&PlannedAction> {
        self.actions.back()
    }

    pub fn look_at_plan(&self) -> &VecDeque<PlannedAction> {
        &self.actions
    }

    pub fn get(&self, index: usize) -> Option<&PlannedAction> {
        self.actions.get(index)
    }

    pub fn number_of_steps(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Mean grid x of all located actions; 0 when the plan is empty.
    pub fn grid_x_centroid(&self) -> f64 {
        self.x.mean()
    }

    /// Mean grid y of all located actions; 0 when the plan is empty.
    pub fn grid_y_centroid(&self) -> f64 {
        self.y.mean()
    }

    /// The centroid snapped to the nearest tile.
    pub fn centroid_tile(&self) -> Tile {
        Tile::new(
            self.grid_x_centroid().round() as i32,
            self.grid_y_centroid().round() as i32,
        )
    }

    /// How many actions of a given kind the plan holds.
    pub fn count_matching(&self, predicate: impl Fn(&PlannedAction) -> bool) -> usize {
        self.actions.iter().filter(|a| predicate(a)).count()
    }

    /// Cheapest place to slot a stop at `tile`: the index to insert at and
    /// the extra steaming hours the detour costs.
    ///
    /// A stop that coincides with an existing one is free and taken at once.
    /// Two co-located neighbours are never split by a stop elsewhere.
    /// `None` when no gap qualifies.
    pub fn cheapest_insertion(
        &self,
        tile: Tile,
        map: &dyn SeaMap,
        speed_kph: f64,
    ) -> Option<(usize, f64)> {
        assert!(speed_kph > 0.0, "speed must be positive");
        let size = self.actions.len();
        assert!(size >= 2, "plan must hold both arrival markers");

        let mut best: Option<(usize, f64)> = None;
        for index in 1..size {
            let (Some(from), Some(to)) = (
                self.actions[index - 1].location(),
                self.actions[index].location(),
            ) else {
                continue;
            };
            if size > 2 && from == to && from != tile {
                continue;
            }
            let first_leg = map.distance(from, tile);
            if first_leg == 0.0 {
                return Some((index, 0.0));
            }
            let detour = (first_leg + map.distance(tile, to) - map.distance(from, to)) / speed_kph;
            if best.map_or(true, |(_, hours)| detour < hours) {
                best = Some((index, detour));
            }
        }
        best
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Plan[{:.1}h]:", self.hours_estimated)?;
        for action in &self.actions {
            let kind = match action.action_type() {
                Some(t) => t.code(),
                None if action.is_end_of_trip() => "END",
                None => "START",
            };
            match action.location() {
                Some(tile) => write!(f, " {}@{}", kind, tile)?,
                None => write!(f, " {}@lost", kind)?,
            }
        }
        Ok(())
    }
}
