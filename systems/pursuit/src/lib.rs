#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pursuer decision system: state machine, steering, and separation.
//!
//! The system is pure over world snapshots. Each tick it consults a
//! priority ladder of overrides (freeze, lost lock, stuck kick) before the
//! IDLE/CHASE/ATTACK state machine, picks a steering velocity per pursuer,
//! blends in separation from nearby pursuers, and emits state-transition
//! and steering commands for the world to validate and apply.

use std::time::Duration;

use curfew_core::{
    Command, Event, GridView, PursuerId, PursuerKind, PursuerSnapshot, PursuerState, PursuerView,
    TargetSnapshot,
};
use glam::Vec2;
use log::debug;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Factor applied to the detect and attack radii on the way out, so agents
/// do not flap across state boundaries.
const HYSTERESIS_EXIT: f32 = 1.5;

/// Duration of a forced direction change after stuck detection trips.
const KICK_DURATION: Duration = Duration::from_millis(600);

/// Duration of one random-walk leg while navigation is unavailable.
const WANDER_LEG: Duration = Duration::from_millis(1_000);

/// Minimum and maximum sample counts for the direct-line check.
const LINE_SAMPLES_MIN: u32 = 5;
const LINE_SAMPLES_MAX: u32 = 20;

/// Tuning knobs for the pursuer brain.
#[derive(Clone, Copy, Debug)]
pub struct PursuitTuning {
    /// Distance at which an idle pursuer notices the target.
    pub detect_radius: f32,
    /// Distance at which a chasing pursuer presses the attack.
    pub attack_radius: f32,
    /// Commanded speed in world units per second.
    pub speed: f32,
    /// Radius of the pairwise separation force between pursuers.
    pub separation_radius: f32,
    /// Peak magnitude of the separation nudge in world units per second.
    pub separation_gain: f32,
    /// Distance below which a blocker backs off instead of colliding.
    pub backoff_radius: f32,
    /// Rolling window over which displacement is measured for stuck
    /// detection.
    pub stuck_window: Duration,
    /// Displacement below which a commanded pursuer counts as stuck.
    pub stuck_min_displacement: f32,
}

impl Default for PursuitTuning {
    fn default() -> Self {
        Self {
            detect_radius: 1_000.0,
            attack_radius: 250.0,
            speed: 180.0,
            separation_radius: 120.0,
            separation_gain: 60.0,
            backoff_radius: 150.0,
            stuck_window: Duration::from_millis(800),
            stuck_min_displacement: 12.0,
        }
    }
}

/// Configuration parameters required to construct the pursuit system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    tuning: PursuitTuning,
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided tuning and seed.
    #[must_use]
    pub const fn new(tuning: PursuitTuning, rng_seed: u64) -> Self {
        Self { tuning, rng_seed }
    }
}

/// Pure system that reacts to world snapshots and emits pursuer commands.
#[derive(Debug)]
pub struct Pursuit {
    tuning: PursuitTuning,
    rng: ChaCha8Rng,
    scratch: ScratchTable,
}

impl Pursuit {
    /// Creates a new pursuit system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            tuning: config.tuning,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            scratch: ScratchTable::default(),
        }
    }

    /// Consumes events and immutable views to emit pursuer commands.
    pub fn handle(
        &mut self,
        events: &[Event],
        pursuers: &PursuerView,
        grid: &GridView<'_>,
        target: Option<&TargetSnapshot>,
        out: &mut Vec<Command>,
    ) {
        let dt = elapsed_time(events);
        if dt.is_zero() {
            return;
        }

        let ordered: Vec<&PursuerSnapshot> = pursuers.iter().collect();
        self.scratch.begin_tick(&ordered);

        for (index, pursuer) in ordered.iter().copied().enumerate() {
            // A frozen pursuer suppresses every other behavior.
            if !pursuer.frozen_remaining.is_zero() {
                continue;
            }

            let mut velocity = self.decide_velocity(index, pursuer, grid, target, dt, out);
            velocity += self.separation_force(pursuer, &ordered);

            out.push(Command::SteerPursuer {
                pursuer: pursuer.id,
                velocity,
            });
        }
    }

    fn decide_velocity(
        &mut self,
        index: usize,
        pursuer: &PursuerSnapshot,
        grid: &GridView<'_>,
        target: Option<&TargetSnapshot>,
        dt: Duration,
        out: &mut Vec<Command>,
    ) -> Vec2 {
        // Lost lock fully overrides the state machine: the pursuer drags
        // itself toward the stale position until the override expires.
        if let Some(lock) = pursuer.lost_lock {
            return steer_toward(pursuer.position, lock.position, self.tuning.speed);
        }

        if let Some(kick) = self.scratch.tick_kick(index, dt) {
            return kick * self.tuning.speed;
        }

        let Some(target) = target else {
            // Nothing to hunt; degrade to idle rather than fault.
            self.request_state(pursuer, PursuerState::Idle, out);
            return Vec2::ZERO;
        };

        if !grid.is_ready() {
            // Navigation is unavailable; wander instead of faulting.
            let direction = self.scratch.wander_direction(index, dt, &mut self.rng);
            return direction * self.tuning.speed;
        }

        let distance = pursuer.position.distance(target.position);
        let state = self.transition_state(pursuer, distance, out);
        let velocity = self.state_velocity(pursuer, state, grid, target, distance);
        self.detect_stuck(index, pursuer, velocity, dt, out)
    }

    /// Applies the hysteresis-guarded state machine and returns the state
    /// the pursuer should act with this tick.
    fn transition_state(
        &self,
        pursuer: &PursuerSnapshot,
        distance: f32,
        out: &mut Vec<Command>,
    ) -> PursuerState {
        let next = match pursuer.state {
            PursuerState::Idle if distance <= self.tuning.detect_radius => PursuerState::Chase,
            PursuerState::Chase if distance <= self.tuning.attack_radius => PursuerState::Attack,
            PursuerState::Chase
                if distance >= self.tuning.detect_radius * HYSTERESIS_EXIT =>
            {
                PursuerState::Idle
            }
            PursuerState::Attack
                if distance >= self.tuning.attack_radius * HYSTERESIS_EXIT =>
            {
                PursuerState::Chase
            }
            current => current,
        };

        if next != pursuer.state {
            self.request_state(pursuer, next, out);
        }
        next
    }

    fn request_state(
        &self,
        pursuer: &PursuerSnapshot,
        state: PursuerState,
        out: &mut Vec<Command>,
    ) {
        if pursuer.state != state {
            out.push(Command::SetPursuerState {
                pursuer: pursuer.id,
                state,
            });
        }
    }

    fn state_velocity(
        &self,
        pursuer: &PursuerSnapshot,
        state: PursuerState,
        grid: &GridView<'_>,
        target: &TargetSnapshot,
        distance: f32,
    ) -> Vec2 {
        // Kind behaviors that trump regular chase movement.
        if pursuer.kind == PursuerKind::Sticker && !pursuer.contact_cooldown.is_zero() {
            return steer_away(pursuer.position, target.position, self.tuning.speed);
        }

        if pursuer.kind == PursuerKind::Blocker
            && state != PursuerState::Idle
            && distance < self.tuning.backoff_radius
        {
            return self.blocker_backoff(pursuer, target);
        }

        match state {
            PursuerState::Idle => Vec2::ZERO,
            PursuerState::Chase => {
                let goal = pursuer
                    .kind
                    .pursuit_goal(target.position, target.velocity);
                self.chase_velocity(pursuer, grid, goal, false)
            }
            PursuerState::Attack => {
                // In attack range the live position is the goal; leading
                // would overshoot at close quarters.
                self.chase_velocity(pursuer, grid, target.position, true)
            }
        }
    }

    /// Direct steering when the line is clear, cached-path waypoints
    /// otherwise. With `prefer_direct`, a pursuer that has neither keeps
    /// closing directly instead of holding position.
    fn chase_velocity(
        &self,
        pursuer: &PursuerSnapshot,
        grid: &GridView<'_>,
        goal: Vec2,
        prefer_direct: bool,
    ) -> Vec2 {
        let direct = has_direct_line(grid, pursuer.position, goal);
        if direct {
            return steer_toward(pursuer.position, goal, self.tuning.speed);
        }

        if let Some(waypoint) = pursuer.next_waypoint {
            return steer_toward(pursuer.position, grid.cell_center(waypoint), self.tuning.speed);
        }

        if prefer_direct {
            // No path and no clear line; close the gap anyway rather than
            // stand inside attack range doing nothing.
            return steer_toward(pursuer.position, goal, self.tuning.speed);
        }

        // Hold position until the scheduler provides a path.
        Vec2::ZERO
    }

    /// Off-axis retreat used by blockers that drifted too close: back away
    /// rotated 45 degrees so the retreat does not mirror the target's
    /// approach line. The rotation side is fixed per pursuer.
    fn blocker_backoff(&self, pursuer: &PursuerSnapshot, target: &TargetSnapshot) -> Vec2 {
        let away = push_apart(pursuer.position, target.position);
        let angle = if pursuer.id.get() % 2 == 0 {
            std::f32::consts::FRAC_PI_4
        } else {
            -std::f32::consts::FRAC_PI_4
        };
        rotate(away, angle) * self.tuning.speed
    }

    /// Rolling-window stuck detection: low displacement while commanded to
    /// move clears the cached path and forces a randomized direction.
    fn detect_stuck(
        &mut self,
        index: usize,
        pursuer: &PursuerSnapshot,
        velocity: Vec2,
        dt: Duration,
        out: &mut Vec<Command>,
    ) -> Vec2 {
        let commanded = velocity.length_squared() > f32::EPSILON;
        let tripped = self.scratch.advance_window(
            index,
            pursuer.position,
            commanded,
            dt,
            self.tuning.stuck_window,
            self.tuning.stuck_min_displacement,
        );

        if !tripped {
            return velocity;
        }

        debug!("pursuer {} looks stuck, repathing", pursuer.id.get());
        if pursuer.has_path {
            out.push(Command::ClearPursuerPath {
                pursuer: pursuer.id,
            });
        }

        let kick = random_direction(&mut self.rng);
        self.scratch.set_kick(index, kick, KICK_DURATION);
        kick * self.tuning.speed
    }

    fn separation_force(&self, pursuer: &PursuerSnapshot, all: &[&PursuerSnapshot]) -> Vec2 {
        let radius = self.tuning.separation_radius;
        let mut force = Vec2::ZERO;

        for other in all {
            if other.id == pursuer.id {
                continue;
            }

            let distance = pursuer.position.distance(other.position);
            if distance >= radius {
                continue;
            }

            let falloff = 1.0 - distance / radius;
            force += push_apart(pursuer.position, other.position) * falloff;
        }

        force * self.tuning.separation_gain
    }
}

/// Reports whether an agent can travel the straight segment unobstructed.
///
/// Samples between 5 and 20 interpolated points proportional to the
/// segment length. A sample is clear when its containing cell and all four
/// cardinal neighbors are walkable, so a grazing pass along a wall still
/// counts as obstructed.
#[must_use]
pub fn has_direct_line(grid: &GridView<'_>, from: Vec2, to: Vec2) -> bool {
    if !grid.is_ready() {
        return false;
    }

    let distance = from.distance(to);
    let tiles = if grid.tile_length() > 0.0 {
        (distance / grid.tile_length()).ceil() as u32
    } else {
        LINE_SAMPLES_MAX
    };
    let samples = tiles.clamp(LINE_SAMPLES_MIN, LINE_SAMPLES_MAX);

    for step in 0..=samples {
        let fraction = step as f32 / samples as f32;
        let point = from.lerp(to, fraction);
        if !sample_clear(grid, point) {
            return false;
        }
    }

    true
}

fn sample_clear(grid: &GridView<'_>, point: Vec2) -> bool {
    let Some(cell) = grid.world_to_cell(point) else {
        return false;
    };

    if !grid.is_walkable(cell) {
        return false;
    }

    let (columns, rows) = grid.dimensions();
    for direction in curfew_core::Direction::ALL {
        match cell.stepped(direction, columns, rows) {
            Some(neighbor) => {
                if !grid.is_walkable(neighbor) {
                    return false;
                }
            }
            // The map edge counts as obstruction.
            None => return false,
        }
    }

    true
}

fn elapsed_time(events: &[Event]) -> Duration {
    let mut elapsed = Duration::ZERO;
    for event in events {
        if let Event::TimeAdvanced { dt } = event {
            elapsed = elapsed.saturating_add(*dt);
        }
    }
    elapsed
}

fn steer_toward(from: Vec2, to: Vec2, speed: f32) -> Vec2 {
    let delta = to - from;
    if delta.length_squared() <= f32::EPSILON {
        return Vec2::ZERO;
    }
    delta.normalize() * speed
}

fn steer_away(from: Vec2, threat: Vec2, speed: f32) -> Vec2 {
    push_apart(from, threat) * speed
}

/// Unit vector pushing `position` away from `other`; falls back to +x when
/// the two coincide.
fn push_apart(position: Vec2, other: Vec2) -> Vec2 {
    let delta = position - other;
    if delta.length_squared() > f32::EPSILON {
        delta.normalize()
    } else {
        Vec2::new(1.0, 0.0)
    }
}

fn rotate(vector: Vec2, angle: f32) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(
        vector.x * cos - vector.y * sin,
        vector.x * sin + vector.y * cos,
    )
}

fn random_direction(rng: &mut ChaCha8Rng) -> Vec2 {
    let angle: f32 = rng.gen_range(0.0..std::f32::consts::TAU);
    Vec2::new(angle.cos(), angle.sin())
}

/// Per-pursuer scratch state kept across ticks, index-aligned with the
/// sorted snapshot order and resynchronized whenever identities change.
#[derive(Debug, Default)]
struct ScratchTable {
    ids: Vec<Option<PursuerId>>,
    window_origin: Vec<Vec2>,
    window_elapsed: Vec<Duration>,
    kick_direction: Vec<Vec2>,
    kick_remaining: Vec<Duration>,
    wander_direction: Vec<Vec2>,
    wander_remaining: Vec<Duration>,
}

impl ScratchTable {
    fn begin_tick(&mut self, ordered: &[&PursuerSnapshot]) {
        let count = ordered.len();
        self.ids.resize(count, None);
        self.window_origin.resize(count, Vec2::ZERO);
        self.window_elapsed.resize(count, Duration::ZERO);
        self.kick_direction.resize(count, Vec2::ZERO);
        self.kick_remaining.resize(count, Duration::ZERO);
        self.wander_direction.resize(count, Vec2::ZERO);
        self.wander_remaining.resize(count, Duration::ZERO);

        for (index, pursuer) in ordered.iter().enumerate() {
            if self.ids[index] != Some(pursuer.id) {
                self.ids[index] = Some(pursuer.id);
                self.window_origin[index] = pursuer.position;
                self.window_elapsed[index] = Duration::ZERO;
                self.kick_remaining[index] = Duration::ZERO;
                self.wander_remaining[index] = Duration::ZERO;
            }
        }
    }

    /// Advances an active kick and returns its direction while it lasts.
    fn tick_kick(&mut self, index: usize, dt: Duration) -> Option<Vec2> {
        if self.kick_remaining[index].is_zero() {
            return None;
        }
        self.kick_remaining[index] = self.kick_remaining[index].saturating_sub(dt);
        Some(self.kick_direction[index])
    }

    fn set_kick(&mut self, index: usize, direction: Vec2, duration: Duration) {
        self.kick_direction[index] = direction;
        self.kick_remaining[index] = duration;
    }

    /// Current wander leg direction, drawing a fresh one when the previous
    /// leg ran out.
    fn wander_direction(&mut self, index: usize, dt: Duration, rng: &mut ChaCha8Rng) -> Vec2 {
        self.wander_remaining[index] = self.wander_remaining[index].saturating_sub(dt);
        if self.wander_remaining[index].is_zero() {
            self.wander_direction[index] = random_direction(rng);
            self.wander_remaining[index] = WANDER_LEG;
        }
        self.wander_direction[index]
    }

    /// Returns true when the rolling displacement window closes on a
    /// commanded pursuer that barely moved.
    fn advance_window(
        &mut self,
        index: usize,
        position: Vec2,
        commanded: bool,
        dt: Duration,
        window: Duration,
        min_displacement: f32,
    ) -> bool {
        self.window_elapsed[index] = self.window_elapsed[index].saturating_add(dt);
        if self.window_elapsed[index] < window {
            return false;
        }

        let displacement = position.distance(self.window_origin[index]);
        self.window_origin[index] = position;
        self.window_elapsed[index] = Duration::ZERO;

        commanded && displacement < min_displacement
    }
}
