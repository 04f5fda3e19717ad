#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Path recalculation scheduler for the pursuer fleet.
//!
//! Re-planning every pursuer every tick would put the planner's full cost
//! on every frame. Instead the scheduler collects the pursuers that want a
//! fresh plan, shuffles them for fairness, and plans for at most a fixed
//! budget per tick. Deferred pursuers keep steering along their slightly
//! stale paths until their turn comes around.

use std::time::Duration;

use curfew_core::{
    Command, Event, GridView, PlanningView, PursuerSnapshot, PursuerState, PursuerView,
    TargetSnapshot,
};
use log::debug;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Default number of planner invocations allowed per tick.
const DEFAULT_BUDGET: usize = 3;

/// Default age at which a cached plan is refreshed.
const DEFAULT_REPLAN_INTERVAL: Duration = Duration::from_millis(400);

/// Configuration parameters required to construct the scheduler.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    budget: usize,
    replan_interval: Duration,
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided budget, refresh
    /// interval, and fairness seed.
    #[must_use]
    pub const fn new(budget: usize, replan_interval: Duration, rng_seed: u64) -> Self {
        Self {
            budget,
            replan_interval,
            rng_seed,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_BUDGET, DEFAULT_REPLAN_INTERVAL, 0)
    }
}

/// Pure system that amortizes path planning across the pursuer fleet.
#[derive(Debug)]
pub struct Scheduler {
    budget: usize,
    replan_interval: Duration,
    rng: ChaCha8Rng,
}

impl Scheduler {
    /// Creates a new scheduler using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            budget: config.budget,
            replan_interval: config.replan_interval,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Consumes events and immutable views to emit path commands.
    ///
    /// Runs once per [`Event::TimeAdvanced`] batch and never invokes the
    /// planner more than the configured budget allows.
    pub fn handle(
        &mut self,
        events: &[Event],
        pursuers: &PursuerView,
        grid: &GridView<'_>,
        planning: &PlanningView<'_>,
        target: Option<&TargetSnapshot>,
        out: &mut Vec<Command>,
    ) {
        if !events
            .iter()
            .any(|event| matches!(event, Event::TimeAdvanced { .. }))
        {
            return;
        }

        let Some(target) = target else {
            return;
        };

        if !grid.is_ready() || !planning.is_ready() {
            return;
        }

        let Some(target_cell) = grid.world_to_cell(target.position) else {
            return;
        };

        let mut wanting: Vec<&PursuerSnapshot> = pursuers
            .iter()
            .filter(|pursuer| self.wants_replan(pursuer, target_cell))
            .collect();
        if wanting.is_empty() {
            return;
        }

        // Shuffle so deferral rotates across the fleet instead of starving
        // the same tail every tick.
        wanting.shuffle(&mut self.rng);

        for pursuer in wanting.into_iter().take(self.budget) {
            let Some(from_cell) = grid.world_to_cell(pursuer.position) else {
                continue;
            };

            let goal_point = pursuer
                .kind
                .pursuit_goal(target.position, target.velocity);
            // A led goal can point off the map; fall back to the live cell.
            let goal_cell = grid.world_to_cell(goal_point).unwrap_or(target_cell);

            match curfew_system_pathfinding::find_path(planning, from_cell, goal_cell) {
                Some(path) => {
                    out.push(Command::AssignPursuerPath {
                        pursuer: pursuer.id,
                        path,
                        target_cell,
                    });
                }
                None => {
                    debug!(
                        "no path for pursuer {} toward {:?}",
                        pursuer.id.get(),
                        goal_cell
                    );
                    // Drop the stale path; pursuit degrades to direct
                    // steering or holds position.
                    if pursuer.has_path {
                        out.push(Command::ClearPursuerPath {
                            pursuer: pursuer.id,
                        });
                    }
                }
            }
        }
    }

    /// A pursuer wants a fresh plan when it is hunting and has no path, the
    /// target changed tiles since the last plan, or the plan aged past the
    /// refresh interval.
    fn wants_replan(&self, pursuer: &PursuerSnapshot, target_cell: curfew_core::CellCoord) -> bool {
        if pursuer.state == PursuerState::Idle {
            return false;
        }

        if !pursuer.frozen_remaining.is_zero() {
            return false;
        }

        if !pursuer.has_path {
            return true;
        }

        if pursuer.target_cell_at_plan != Some(target_cell) {
            return true;
        }

        pursuer.since_plan >= self.replan_interval
    }
}
