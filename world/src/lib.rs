#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for the Curfew pursuit core.
//!
//! The world owns the walkability grid, every pursuer and vehicle, and the
//! tracked target's live motion record. All mutation flows through
//! [`apply`], which executes one [`Command`] deterministically and appends
//! the resulting [`Event`] values for systems and presentation
//! collaborators. Read access flows through the [`query`] module.

use std::time::Duration;

use curfew_core::{
    Command, DespawnReason, Event, LostLock, PursuerId, PursuerKind, PursuerState, StrikeVictim,
    TargetEffects, TilePath, VehicleId, VehiclePhase,
};
use glam::Vec2;
use log::debug;

mod grid;

use grid::WalkGrid;

const RNG_SEED: u64 = 0x5ca1_ab1e_0b57_ac1e;
const RNG_MULTIPLIER: u64 = 6_364_136_223_846_793_005;
const RNG_INCREMENT: u64 = 1;

/// Distance at which a pursuer counts as touching the target.
const CONTACT_RADIUS: f32 = 40.0;
/// Distance at which a path waypoint counts as reached.
const WAYPOINT_TOLERANCE: f32 = 30.0;
/// Distance at which a moving vehicle strikes the target or a pursuer.
const STRIKE_RADIUS: f32 = 60.0;
/// Freeze applied to anything a vehicle strikes.
const STRIKE_FREEZE: Duration = Duration::from_millis(600);
/// Knockback magnitude range for vehicle strikes, in world units.
const KNOCKBACK_MIN: f32 = 80.0;
const KNOCKBACK_MAX: f32 = 160.0;
/// Base freeze duration for a two-vehicle accident before jitter.
const ACCIDENT_BASE: Duration = Duration::from_millis(2_500);
/// Post-accident window during which further collisions are ignored.
const ACCIDENT_COOLDOWN: Duration = Duration::from_millis(1_500);
/// Center distance below which two vehicles collide.
const VEHICLE_ACCIDENT_RADIUS: f32 = 60.0;
/// Ring-search radius used to pull a stranded vehicle back onto a road.
const VEHICLE_HEAL_RADIUS: u32 = 5;

/// Timed speed reduction applied to a pursuer.
#[derive(Clone, Copy, Debug)]
struct SpeedDebuff {
    multiplier: f32,
    remaining: Duration,
}

#[derive(Clone, Debug)]
struct Pursuer {
    id: PursuerId,
    kind: PursuerKind,
    state: PursuerState,
    position: Vec2,
    velocity: Vec2,
    path: Option<TilePath>,
    path_cursor: usize,
    target_cell_at_plan: Option<curfew_core::CellCoord>,
    since_plan: Duration,
    frozen_remaining: Duration,
    lost_lock: Option<LostLock>,
    contact_cooldown: Duration,
    debuffs: Vec<SpeedDebuff>,
}

impl Pursuer {
    fn new(id: PursuerId, kind: PursuerKind, position: Vec2) -> Self {
        Self {
            id,
            kind,
            state: PursuerState::Idle,
            position,
            velocity: Vec2::ZERO,
            path: None,
            path_cursor: 0,
            target_cell_at_plan: None,
            since_plan: Duration::ZERO,
            frozen_remaining: Duration::ZERO,
            lost_lock: None,
            contact_cooldown: Duration::ZERO,
            debuffs: Vec::new(),
        }
    }

    /// Effective speed multiplier: the minimum across active debuffs, never
    /// their product.
    fn effective_multiplier(&self) -> f32 {
        self.debuffs
            .iter()
            .map(|debuff| debuff.multiplier)
            .fold(1.0, f32::min)
    }

    fn next_waypoint(&self) -> Option<curfew_core::CellCoord> {
        self.path
            .as_ref()
            .and_then(|path| path.cells().get(self.path_cursor).copied())
    }

    fn clear_path(&mut self) {
        self.path = None;
        self.path_cursor = 0;
        self.target_cell_at_plan = None;
    }

    fn assign_path(&mut self, path: TilePath, target_cell: curfew_core::CellCoord) {
        self.path = Some(path);
        self.path_cursor = 0;
        self.target_cell_at_plan = Some(target_cell);
        self.since_plan = Duration::ZERO;
    }
}

#[derive(Clone, Debug)]
struct Vehicle {
    id: VehicleId,
    position: Vec2,
    velocity: Vec2,
    heading: curfew_core::Direction,
    phase: VehiclePhase,
    cruise_speed: f32,
}

/// Default vehicle cruise speed in world units per second.
const VEHICLE_CRUISE_SPEED: f32 = 220.0;

#[derive(Clone, Copy, Debug)]
struct TargetTrack {
    position: Vec2,
    velocity: Vec2,
}

/// Effect queued for delivery to the externally-owned target.
#[derive(Clone, Copy, Debug)]
enum TargetEffect {
    Knockback(Vec2),
    Freeze(Duration),
}

/// Represents the authoritative Curfew simulation state.
#[derive(Debug)]
pub struct World {
    grid: WalkGrid,
    pursuers: Vec<Pursuer>,
    vehicles: Vec<Vehicle>,
    target: Option<TargetTrack>,
    pending_target_effects: Vec<TargetEffect>,
    next_pursuer_id: u32,
    next_vehicle_id: u32,
    frame_dt: Duration,
    tick_index: u64,
    rng_state: u64,
    target_strike_cooldown: Duration,
}

impl World {
    /// Creates a new, unconfigured world ready for simulation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            grid: WalkGrid::default(),
            pursuers: Vec::new(),
            vehicles: Vec::new(),
            target: None,
            pending_target_effects: Vec::new(),
            next_pursuer_id: 0,
            next_vehicle_id: 0,
            frame_dt: Duration::ZERO,
            tick_index: 0,
            rng_state: RNG_SEED,
            target_strike_cooldown: Duration::ZERO,
        }
    }

    fn next_random(&mut self) -> u64 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(RNG_MULTIPLIER)
            .wrapping_add(RNG_INCREMENT);
        self.rng_state
    }

    /// Uniform draw in [0, 1) from the world's deterministic generator.
    fn rand_unit(&mut self) -> f32 {
        ((self.next_random() >> 40) as f32) / ((1u64 << 24) as f32)
    }

    fn rand_range(&mut self, low: f32, high: f32) -> f32 {
        low + (high - low) * self.rand_unit()
    }

    fn pursuer_index(&self, pursuer: PursuerId) -> Option<usize> {
        self.pursuers.iter().position(|entry| entry.id == pursuer)
    }

    fn vehicle_index(&self, vehicle: VehicleId) -> Option<usize> {
        self.vehicles.iter().position(|entry| entry.id == vehicle)
    }

    fn advance_clock(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.tick_index = self.tick_index.saturating_add(1);
        self.frame_dt = dt;
        self.target_strike_cooldown = self.target_strike_cooldown.saturating_sub(dt);
        out_events.push(Event::TimeAdvanced { dt });

        for pursuer in &mut self.pursuers {
            pursuer.since_plan = pursuer.since_plan.saturating_add(dt);
            pursuer.contact_cooldown = pursuer.contact_cooldown.saturating_sub(dt);
            pursuer.frozen_remaining = pursuer.frozen_remaining.saturating_sub(dt);
            if !pursuer.frozen_remaining.is_zero() {
                pursuer.velocity = Vec2::ZERO;
            }

            pursuer.debuffs.retain_mut(|debuff| {
                debuff.remaining = debuff.remaining.saturating_sub(dt);
                !debuff.remaining.is_zero()
            });

            if let Some(lock) = &mut pursuer.lost_lock {
                lock.remaining = lock.remaining.saturating_sub(dt);
                if lock.remaining.is_zero() {
                    pursuer.lost_lock = None;
                }
            }
        }

        self.advance_vehicle_phases(dt, out_events);
        self.heal_stranded_vehicles(out_events);
    }

    fn advance_vehicle_phases(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        for vehicle in &mut self.vehicles {
            match vehicle.phase {
                VehiclePhase::Normal => {}
                VehiclePhase::Accident { remaining } => {
                    let remaining = remaining.saturating_sub(dt);
                    if remaining.is_zero() {
                        vehicle.phase = VehiclePhase::AccidentCooldown {
                            remaining: ACCIDENT_COOLDOWN,
                        };
                        out_events.push(Event::VehicleAccidentCleared {
                            vehicle: vehicle.id,
                        });
                    } else {
                        vehicle.phase = VehiclePhase::Accident { remaining };
                        vehicle.velocity = Vec2::ZERO;
                    }
                }
                VehiclePhase::AccidentCooldown { remaining } => {
                    let remaining = remaining.saturating_sub(dt);
                    vehicle.phase = if remaining.is_zero() {
                        VehiclePhase::Normal
                    } else {
                        VehiclePhase::AccidentCooldown { remaining }
                    };
                }
            }
        }
    }

    /// Pulls vehicles whose cell became impassable back onto the nearest
    /// road cell, despawning any that cannot recover.
    fn heal_stranded_vehicles(&mut self, out_events: &mut Vec<Event>) {
        let mut index = 0;
        while index < self.vehicles.len() {
            let position = self.vehicles[index].position;
            let id = self.vehicles[index].id;

            let Some(cell) = self.grid.world_to_cell(position) else {
                debug!("vehicle {} drifted out of bounds", id.get());
                let _ = self.vehicles.remove(index);
                out_events.push(Event::VehicleDespawned {
                    vehicle: id,
                    reason: DespawnReason::OutOfBounds,
                });
                continue;
            };

            if self.grid.is_walkable(cell) && self.grid.has_road(cell) {
                index += 1;
                continue;
            }

            match self.grid.nearest_road_cell(cell, VEHICLE_HEAL_RADIUS) {
                Some(destination) => {
                    self.vehicles[index].position = self.grid.cell_center(destination);
                    self.vehicles[index].velocity = Vec2::ZERO;
                    out_events.push(Event::VehicleRelocated {
                        vehicle: id,
                        from: cell,
                        to: destination,
                    });
                    index += 1;
                }
                None => {
                    let _ = self.vehicles.remove(index);
                    out_events.push(Event::VehicleDespawned {
                        vehicle: id,
                        reason: DespawnReason::OutOfBounds,
                    });
                }
            }
        }
    }

    fn spawn_pursuer(&mut self, kind: PursuerKind, position: Vec2, out_events: &mut Vec<Event>) {
        if self.grid.world_to_cell(position).is_none() {
            debug!("rejected pursuer spawn outside the grid");
            return;
        }

        let id = PursuerId::new(self.next_pursuer_id);
        self.next_pursuer_id = self.next_pursuer_id.saturating_add(1);
        self.pursuers.push(Pursuer::new(id, kind, position));
        out_events.push(Event::PursuerSpawned {
            pursuer: id,
            kind,
            position,
        });
    }

    fn spawn_vehicle(
        &mut self,
        position: Vec2,
        heading: curfew_core::Direction,
        out_events: &mut Vec<Event>,
    ) {
        if self.grid.world_to_cell(position).is_none() {
            debug!("rejected vehicle spawn outside the grid");
            return;
        }

        let id = VehicleId::new(self.next_vehicle_id);
        self.next_vehicle_id = self.next_vehicle_id.saturating_add(1);
        self.vehicles.push(Vehicle {
            id,
            position,
            velocity: Vec2::ZERO,
            heading,
            phase: VehiclePhase::Normal,
            cruise_speed: VEHICLE_CRUISE_SPEED,
        });
        out_events.push(Event::VehicleSpawned {
            vehicle: id,
            position,
            heading,
        });
    }

    /// Moves a pursuer by the commanded velocity, re-validating walkability
    /// against the live grid at move time and sliding along blocked axes.
    fn steer_pursuer(&mut self, pursuer: PursuerId, velocity: Vec2, out_events: &mut Vec<Event>) {
        let Some(index) = self.pursuer_index(pursuer) else {
            return;
        };

        if !self.pursuers[index].frozen_remaining.is_zero() {
            self.pursuers[index].velocity = Vec2::ZERO;
            return;
        }

        // Waypoints already reached at the start position are consumed
        // before moving so the pursuer never chases a waypoint behind it.
        self.advance_waypoint_cursor(index);

        let dt = self.frame_dt.as_secs_f32();
        let multiplier = self.pursuers[index].effective_multiplier();
        let from = self.pursuers[index].position;
        let desired = from + velocity * multiplier * dt;
        let resolved = self.resolve_walkable_move(from, desired);

        self.pursuers[index].position = resolved;
        self.pursuers[index].velocity = if dt > 0.0 {
            (resolved - from) / dt
        } else {
            Vec2::ZERO
        };

        self.advance_waypoint_cursor(index);
        self.resolve_target_contact(index, out_events);
    }

    /// Clamps a pursuer move to walkable terrain: full move first, then
    /// each axis alone, then hold.
    fn resolve_walkable_move(&self, from: Vec2, to: Vec2) -> Vec2 {
        let from_cell = self.grid.world_to_cell(from);
        let passable = |point: Vec2| -> bool {
            match self.grid.world_to_cell(point) {
                Some(cell) => self.grid.is_walkable(cell) || Some(cell) == from_cell,
                None => false,
            }
        };

        if passable(to) {
            return to;
        }

        let x_only = Vec2::new(to.x, from.y);
        if passable(x_only) {
            return x_only;
        }

        let y_only = Vec2::new(from.x, to.y);
        if passable(y_only) {
            return y_only;
        }

        from
    }

    fn advance_waypoint_cursor(&mut self, index: usize) {
        let position = self.pursuers[index].position;
        loop {
            let Some(waypoint) = self.pursuers[index].next_waypoint() else {
                break;
            };

            if position.distance(self.grid.cell_center(waypoint)) > WAYPOINT_TOLERANCE {
                break;
            }

            self.pursuers[index].path_cursor += 1;
        }

        let cursor = self.pursuers[index].path_cursor;
        let consumed = self.pursuers[index]
            .path
            .as_ref()
            .map_or(false, |path| cursor >= path.len());
        if consumed {
            self.pursuers[index].clear_path();
        }
    }

    fn resolve_target_contact(&mut self, index: usize, out_events: &mut Vec<Event>) {
        let Some(target) = self.target else {
            return;
        };

        if !self.pursuers[index].contact_cooldown.is_zero() {
            return;
        }

        if self.pursuers[index].position.distance(target.position) > CONTACT_RADIUS {
            return;
        }

        let kind = self.pursuers[index].kind;
        self.pursuers[index].contact_cooldown = kind.contact_cooldown();
        out_events.push(Event::PursuerContactedTarget {
            pursuer: self.pursuers[index].id,
            kind,
        });
    }

    /// Moves a vehicle, verifying the cell one step ahead stays on the road
    /// network, then resolves accidents and strikes.
    fn drive_vehicle(
        &mut self,
        vehicle: VehicleId,
        heading: curfew_core::Direction,
        velocity: Vec2,
        out_events: &mut Vec<Event>,
    ) {
        let Some(index) = self.vehicle_index(vehicle) else {
            return;
        };

        if matches!(self.vehicles[index].phase, VehiclePhase::Accident { .. }) {
            self.vehicles[index].velocity = Vec2::ZERO;
            return;
        }

        self.vehicles[index].heading = heading;

        let dt = self.frame_dt.as_secs_f32();
        let from = self.vehicles[index].position;
        let to = from + velocity * dt;

        let from_cell = self.grid.world_to_cell(from);
        let Some(to_cell) = self.grid.world_to_cell(to) else {
            // Drove off the edge of the map.
            let id = self.vehicles[index].id;
            debug!("vehicle {} left the grid", id.get());
            let _ = self.vehicles.remove(index);
            out_events.push(Event::VehicleDespawned {
                vehicle: id,
                reason: DespawnReason::OutOfBounds,
            });
            return;
        };

        if Some(to_cell) != from_cell {
            if !self.grid.is_walkable(to_cell) || !self.grid.has_road(to_cell) {
                self.vehicles[index].velocity = Vec2::ZERO;
                return;
            }

            if let Some(occupant) = self.vehicle_occupying(to_cell, index) {
                self.begin_accident(index, occupant, out_events);
                return;
            }
        }

        self.vehicles[index].position = to;
        self.vehicles[index].velocity = if dt > 0.0 { (to - from) / dt } else { Vec2::ZERO };

        if let Some(other) = self.vehicle_in_collision_range(index) {
            self.begin_accident(index, other, out_events);
            return;
        }

        self.resolve_vehicle_strikes(index, out_events);
    }

    fn vehicle_occupying(&self, cell: curfew_core::CellCoord, skip: usize) -> Option<usize> {
        self.vehicles.iter().enumerate().find_map(|(index, other)| {
            if index == skip {
                return None;
            }
            if !matches!(other.phase, VehiclePhase::Normal) {
                return None;
            }
            (self.grid.world_to_cell(other.position) == Some(cell)).then_some(index)
        })
    }

    fn vehicle_in_collision_range(&self, index: usize) -> Option<usize> {
        if !matches!(self.vehicles[index].phase, VehiclePhase::Normal) {
            return None;
        }

        let position = self.vehicles[index].position;
        self.vehicles.iter().enumerate().find_map(|(other, entry)| {
            if other == index {
                return None;
            }
            if !matches!(entry.phase, VehiclePhase::Normal) {
                return None;
            }
            (entry.position.distance(position) <= VEHICLE_ACCIDENT_RADIUS).then_some(other)
        })
    }

    /// Freezes both vehicles for the same randomized duration. Each picks a
    /// fresh direction independently once the freeze clears.
    fn begin_accident(&mut self, first: usize, second: usize, out_events: &mut Vec<Event>) {
        let jitter = self.rand_range(0.9, 1.1);
        let remaining = ACCIDENT_BASE.mul_f32(jitter);
        let first_id = self.vehicles[first].id;
        let second_id = self.vehicles[second].id;
        debug!(
            "vehicles {} and {} collided",
            first_id.get(),
            second_id.get()
        );

        for index in [first, second] {
            self.vehicles[index].phase = VehiclePhase::Accident { remaining };
            self.vehicles[index].velocity = Vec2::ZERO;
        }

        out_events.push(Event::VehicleCollision {
            first: first_id,
            second: second_id,
        });
    }

    /// Applies randomized knockback plus a timed freeze to the target or a
    /// pursuer that a moving vehicle ran into. Both effects travel through
    /// the same pipeline pursuer effects use.
    fn resolve_vehicle_strikes(&mut self, index: usize, out_events: &mut Vec<Event>) {
        let vehicle_position = self.vehicles[index].position;
        let vehicle_id = self.vehicles[index].id;

        if let Some(target) = self.target {
            if self.target_strike_cooldown.is_zero()
                && vehicle_position.distance(target.position) <= STRIKE_RADIUS
            {
                let magnitude = self.rand_range(KNOCKBACK_MIN, KNOCKBACK_MAX);
                let direction = push_direction(vehicle_position, target.position);
                let knockback = direction * magnitude;
                self.pending_target_effects
                    .push(TargetEffect::Knockback(knockback));
                self.pending_target_effects
                    .push(TargetEffect::Freeze(STRIKE_FREEZE));
                self.target_strike_cooldown = STRIKE_FREEZE;
                out_events.push(Event::TargetStruck {
                    knockback,
                    freeze: STRIKE_FREEZE,
                });
                out_events.push(Event::VehicleStruck {
                    vehicle: vehicle_id,
                    victim: StrikeVictim::Target,
                });
            }
        }

        let mut pursuer_index = 0;
        while pursuer_index < self.pursuers.len() {
            let struck = self.pursuers[pursuer_index].frozen_remaining.is_zero()
                && vehicle_position.distance(self.pursuers[pursuer_index].position)
                    <= STRIKE_RADIUS;
            if !struck {
                pursuer_index += 1;
                continue;
            }

            let magnitude = self.rand_range(KNOCKBACK_MIN, KNOCKBACK_MAX);
            let direction = push_direction(vehicle_position, self.pursuers[pursuer_index].position);
            self.pursuers[pursuer_index].position += direction * magnitude;
            self.pursuers[pursuer_index].frozen_remaining = STRIKE_FREEZE;
            self.pursuers[pursuer_index].velocity = Vec2::ZERO;
            let id = self.pursuers[pursuer_index].id;
            out_events.push(Event::VehicleStruck {
                vehicle: vehicle_id,
                victim: StrikeVictim::Pursuer(id),
            });

            // Knockback may have shoved the pursuer outside the world.
            if self
                .grid
                .world_to_cell(self.pursuers[pursuer_index].position)
                .is_none()
            {
                let _ = self.pursuers.remove(pursuer_index);
                out_events.push(Event::PursuerDespawned {
                    pursuer: id,
                    reason: DespawnReason::OutOfBounds,
                });
                continue;
            }

            pursuer_index += 1;
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Direction in which a strike at `from` pushes a victim at `at`.
fn push_direction(from: Vec2, at: Vec2) -> Vec2 {
    let delta = at - from;
    if delta.length_squared() > f32::EPSILON {
        delta.normalize()
    } else {
        Vec2::new(1.0, 0.0)
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureGrid { descriptor } => match WalkGrid::from_descriptor(&descriptor) {
            Ok(grid) => {
                world.grid = grid;
                world.pursuers.clear();
                world.vehicles.clear();
                world.next_pursuer_id = 0;
                world.next_vehicle_id = 0;
                out_events.push(Event::GridConfigured {
                    columns: descriptor.columns,
                    rows: descriptor.rows,
                    tile_length: descriptor.tile_length,
                });
            }
            Err(reason) => {
                out_events.push(Event::GridConfigurationRejected { reason });
            }
        },
        Command::SetCellWalkable { cell, walkable } => {
            world.grid.set_walkable(cell, walkable);
        }
        Command::Tick { dt } => {
            world.advance_clock(dt, out_events);
        }
        Command::TrackTarget { position, velocity } => {
            world.target = Some(TargetTrack { position, velocity });
        }
        Command::SpawnPursuer { kind, position } => {
            world.spawn_pursuer(kind, position, out_events);
        }
        Command::SpawnVehicle { position, heading } => {
            world.spawn_vehicle(position, heading, out_events);
        }
        Command::SetPursuerState { pursuer, state } => {
            if let Some(index) = world.pursuer_index(pursuer) {
                let from = world.pursuers[index].state;
                if from != state {
                    world.pursuers[index].state = state;
                    out_events.push(Event::PursuerStateChanged {
                        pursuer,
                        from,
                        to: state,
                    });
                }
            }
        }
        Command::SteerPursuer { pursuer, velocity } => {
            world.steer_pursuer(pursuer, velocity, out_events);
        }
        Command::AssignPursuerPath {
            pursuer,
            path,
            target_cell,
        } => {
            if let Some(index) = world.pursuer_index(pursuer) {
                match path.goal() {
                    Some(goal) => {
                        world.pursuers[index].assign_path(path, target_cell);
                        out_events.push(Event::PursuerPathAssigned { pursuer, goal });
                    }
                    None => {
                        world.pursuers[index].clear_path();
                        out_events.push(Event::PursuerPathCleared { pursuer });
                    }
                }
            }
        }
        Command::ClearPursuerPath { pursuer } => {
            if let Some(index) = world.pursuer_index(pursuer) {
                if world.pursuers[index].path.is_some() {
                    world.pursuers[index].clear_path();
                    out_events.push(Event::PursuerPathCleared { pursuer });
                }
            }
        }
        Command::ApplySpeedDebuff {
            pursuer,
            multiplier,
            duration,
        } => {
            if let Some(index) = world.pursuer_index(pursuer) {
                if !duration.is_zero() {
                    world.pursuers[index].debuffs.push(SpeedDebuff {
                        multiplier: multiplier.clamp(0.0, 1.0),
                        remaining: duration,
                    });
                }
            }
        }
        Command::FreezePursuer { pursuer, duration } => {
            if let Some(index) = world.pursuer_index(pursuer) {
                world.pursuers[index].frozen_remaining =
                    world.pursuers[index].frozen_remaining.max(duration);
                world.pursuers[index].velocity = Vec2::ZERO;
            }
        }
        Command::SetLostLock {
            pursuer,
            position,
            duration,
        } => {
            if let Some(index) = world.pursuer_index(pursuer) {
                world.pursuers[index].lost_lock = (!duration.is_zero()).then_some(LostLock {
                    position,
                    remaining: duration,
                });
            }
        }
        Command::DriveVehicle {
            vehicle,
            heading,
            velocity,
        } => {
            world.drive_vehicle(vehicle, heading, velocity, out_events);
        }
    }
}

/// Delivers queued knockback and freeze effects to the externally-owned
/// target through its narrow effect interface.
pub fn drain_target_effects(world: &mut World, target: &mut dyn TargetEffects) {
    for effect in world.pending_target_effects.drain(..) {
        match effect {
            TargetEffect::Knockback(delta) => target.apply_knockback(delta),
            TargetEffect::Freeze(duration) => target.set_frozen(duration),
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use curfew_core::{
        GridView, PlanningView, PursuerSnapshot, PursuerView, TargetSnapshot, VehicleSnapshot,
        VehicleView,
    };

    use super::World;

    /// Provides a view over the live walkability grid.
    #[must_use]
    pub fn grid_view(world: &World) -> GridView<'_> {
        world.grid.view()
    }

    /// Provides a view over the planning mesh snapshotted at configuration.
    #[must_use]
    pub fn planning_view(world: &World) -> PlanningView<'_> {
        world.grid.planning_view()
    }

    /// Captures a read-only view of every pursuer in the simulation.
    #[must_use]
    pub fn pursuer_view(world: &World) -> PursuerView {
        let snapshots = world
            .pursuers
            .iter()
            .map(|pursuer| PursuerSnapshot {
                id: pursuer.id,
                kind: pursuer.kind,
                state: pursuer.state,
                position: pursuer.position,
                velocity: pursuer.velocity,
                frozen_remaining: pursuer.frozen_remaining,
                lost_lock: pursuer.lost_lock,
                contact_cooldown: pursuer.contact_cooldown,
                speed_multiplier: pursuer.effective_multiplier(),
                has_path: pursuer.path.is_some(),
                next_waypoint: pursuer.next_waypoint(),
                path_goal: pursuer.path.as_ref().and_then(|path| path.goal()),
                target_cell_at_plan: pursuer.target_cell_at_plan,
                since_plan: pursuer.since_plan,
            })
            .collect();
        PursuerView::from_snapshots(snapshots)
    }

    /// Captures a read-only view of every vehicle in the simulation.
    #[must_use]
    pub fn vehicle_view(world: &World) -> VehicleView {
        let snapshots = world
            .vehicles
            .iter()
            .map(|vehicle| VehicleSnapshot {
                id: vehicle.id,
                position: vehicle.position,
                velocity: vehicle.velocity,
                heading: vehicle.heading,
                phase: vehicle.phase,
                cruise_speed: vehicle.cruise_speed,
            })
            .collect();
        VehicleView::from_snapshots(snapshots)
    }

    /// Latest tracked motion of the target, if any was recorded.
    #[must_use]
    pub fn target(world: &World) -> Option<TargetSnapshot> {
        world.target.map(|track| TargetSnapshot {
            position: track.position,
            velocity: track.velocity,
        })
    }

    /// Number of ticks processed since the world was created.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }
}
