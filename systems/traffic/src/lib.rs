#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Vehicle decision system: lane keeping, following distance, redirection.
//!
//! Vehicles are independent of pursuit logic; they share only the
//! walkability grid. Each tick the system stops vehicles tailgating
//! another vehicle, turns vehicles whose next tile leaves the road
//! network, nudges them toward the widest stretch of their lane, and picks
//! fresh directions for vehicles recovering from accidents or stuck spots.
//! Every decision lands as a `DriveVehicle` command the world validates.

use std::time::Duration;

use curfew_core::{
    CellCoord, Command, Direction, Event, GridView, VehicleId, VehiclePhase, VehicleSnapshot,
    VehicleView,
};
use glam::Vec2;
use log::debug;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Tuning knobs for the vehicle brain.
#[derive(Clone, Copy, Debug)]
pub struct TrafficTuning {
    /// Gap at which a vehicle stops behind another vehicle ahead.
    pub following_distance: f32,
    /// Lateral half-width inside which a vehicle counts as "directly
    /// ahead".
    pub lane_width: f32,
    /// Lateral deviation tolerated before lane keeping corrects.
    pub lane_tolerance: f32,
    /// Magnitude of the lateral lane-keeping nudge in world units per
    /// second.
    pub lane_gain: f32,
    /// Maximum cells scanned to each side when measuring the lane.
    pub lane_scan: u32,
    /// Rolling window over which displacement is measured for stuck
    /// detection.
    pub stuck_window: Duration,
    /// Displacement below which a driving vehicle counts as stuck.
    pub stuck_min_displacement: f32,
}

impl Default for TrafficTuning {
    fn default() -> Self {
        Self {
            following_distance: 150.0,
            lane_width: 60.0,
            lane_tolerance: 15.0,
            lane_gain: 40.0,
            lane_scan: 3,
            stuck_window: Duration::from_millis(1_000),
            stuck_min_displacement: 10.0,
        }
    }
}

/// Configuration parameters required to construct the traffic system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    tuning: TrafficTuning,
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration using the provided tuning and seed.
    #[must_use]
    pub const fn new(tuning: TrafficTuning, rng_seed: u64) -> Self {
        Self { tuning, rng_seed }
    }
}

/// Pure system that reacts to world snapshots and emits vehicle commands.
#[derive(Debug)]
pub struct Traffic {
    tuning: TrafficTuning,
    rng: ChaCha8Rng,
    scratch: ScratchTable,
}

impl Traffic {
    /// Creates a new traffic system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            tuning: config.tuning,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            scratch: ScratchTable::default(),
        }
    }

    /// Consumes events and immutable views to emit vehicle commands.
    pub fn handle(
        &mut self,
        events: &[Event],
        vehicles: &VehicleView,
        grid: &GridView<'_>,
        out: &mut Vec<Command>,
    ) {
        let dt = elapsed_time(events);
        if dt.is_zero() {
            return;
        }

        if !grid.is_ready() {
            return;
        }

        let recovered: Vec<VehicleId> = events
            .iter()
            .filter_map(|event| match event {
                Event::VehicleAccidentCleared { vehicle } => Some(*vehicle),
                _ => None,
            })
            .collect();

        let ordered: Vec<&VehicleSnapshot> = vehicles.iter().collect();
        self.scratch.begin_tick(&ordered);

        for (index, vehicle) in ordered.iter().copied().enumerate() {
            if matches!(vehicle.phase, VehiclePhase::Accident { .. }) {
                continue;
            }

            let Some(cell) = grid.world_to_cell(vehicle.position) else {
                // The world heals or despawns stranded vehicles on tick.
                continue;
            };

            let stuck = self.scratch.advance_window(
                index,
                vehicle.position,
                vehicle.velocity.length_squared() > f32::EPSILON,
                dt,
                self.tuning.stuck_window,
                self.tuning.stuck_min_displacement,
            );
            if stuck {
                debug!("vehicle {} looks stuck, redirecting", vehicle.id.get());
            }

            let needs_redirect =
                stuck || recovered.contains(&vehicle.id) || !self.road_ahead(grid, cell, vehicle.heading);

            let heading = if needs_redirect {
                match self.pick_direction(grid, cell, vehicle.heading) {
                    Some(direction) => direction,
                    None => {
                        // Boxed in on every side except backwards: idle.
                        out.push(Command::DriveVehicle {
                            vehicle: vehicle.id,
                            heading: vehicle.heading,
                            velocity: Vec2::ZERO,
                        });
                        continue;
                    }
                }
            } else {
                vehicle.heading
            };

            if self.blocked_by_leader(vehicle, heading, &ordered) {
                out.push(Command::DriveVehicle {
                    vehicle: vehicle.id,
                    heading,
                    velocity: Vec2::ZERO,
                });
                continue;
            }

            let velocity = heading.unit() * vehicle.cruise_speed
                + self.lane_keeping_bias(grid, vehicle, cell, heading);
            out.push(Command::DriveVehicle {
                vehicle: vehicle.id,
                heading,
                velocity,
            });
        }
    }

    fn road_ahead(&self, grid: &GridView<'_>, cell: CellCoord, heading: Direction) -> bool {
        let (columns, rows) = grid.dimensions();
        match cell.stepped(heading, columns, rows) {
            Some(ahead) => grid.is_walkable(ahead) && grid.has_road(ahead),
            // The map edge: keep driving and let the world despawn the
            // vehicle once it actually leaves.
            None => true,
        }
    }

    /// Picks a random available direction, never the direct reverse of the
    /// current heading.
    fn pick_direction(
        &mut self,
        grid: &GridView<'_>,
        cell: CellCoord,
        heading: Direction,
    ) -> Option<Direction> {
        let (columns, rows) = grid.dimensions();
        let reverse = heading.reverse();
        let candidates: Vec<Direction> = Direction::ALL
            .into_iter()
            .filter(|direction| *direction != reverse)
            .filter(|direction| {
                cell.stepped(*direction, columns, rows)
                    .map_or(false, |ahead| grid.is_walkable(ahead) && grid.has_road(ahead))
            })
            .collect();

        if candidates.is_empty() {
            return None;
        }

        let index = self.rng.gen_range(0..candidates.len());
        Some(candidates[index])
    }

    /// Reports whether another vehicle sits directly ahead within the
    /// following-distance threshold.
    fn blocked_by_leader(
        &self,
        vehicle: &VehicleSnapshot,
        heading: Direction,
        all: &[&VehicleSnapshot],
    ) -> bool {
        let forward = heading.unit();
        let lateral_axis = forward.perp();

        all.iter().any(|other| {
            if other.id == vehicle.id {
                return false;
            }

            let relative = other.position - vehicle.position;
            let ahead = relative.dot(forward);
            let lateral = relative.dot(lateral_axis).abs();
            ahead > 0.0 && ahead < self.tuning.following_distance && lateral < self.tuning.lane_width
        })
    }

    /// Lateral nudge toward the preferred offset of the current lane.
    ///
    /// Scans outward along both perpendicular axes for the farthest
    /// contiguous road cells, prefers the middle of that span, and only
    /// corrects once the deviation leaves the tolerance band.
    fn lane_keeping_bias(
        &self,
        grid: &GridView<'_>,
        vehicle: &VehicleSnapshot,
        cell: CellCoord,
        heading: Direction,
    ) -> Vec2 {
        let (positive, negative) = perpendicular_pair(heading);
        let positive_span = self.scan_road(grid, cell, positive);
        let negative_span = self.scan_road(grid, cell, negative);
        if positive_span == negative_span {
            return Vec2::ZERO;
        }

        let axis = positive.unit();
        let offset_cells = (positive_span as f32 - negative_span as f32) / 2.0;
        let preferred = grid.cell_center(cell) + axis * offset_cells * grid.tile_length();
        let deviation = (preferred - vehicle.position).dot(axis);

        if deviation.abs() <= self.tuning.lane_tolerance {
            return Vec2::ZERO;
        }

        axis * deviation.signum() * self.tuning.lane_gain
    }

    /// Number of contiguous road cells extending from `cell` in
    /// `direction`, capped by the scan limit.
    fn scan_road(&self, grid: &GridView<'_>, cell: CellCoord, direction: Direction) -> u32 {
        let (columns, rows) = grid.dimensions();
        let mut span = 0;
        let mut cursor = cell;

        while span < self.tuning.lane_scan {
            match cursor.stepped(direction, columns, rows) {
                Some(next) if grid.is_walkable(next) && grid.has_road(next) => {
                    cursor = next;
                    span += 1;
                }
                _ => break,
            }
        }

        span
    }
}

/// Perpendicular direction pair for a heading: (positive axis, negative
/// axis) with the positive axis matching `heading.unit().perp()`.
fn perpendicular_pair(heading: Direction) -> (Direction, Direction) {
    match heading {
        // perp() of east (+x) is (0, 1): south in row-major world space.
        Direction::East => (Direction::South, Direction::North),
        Direction::West => (Direction::North, Direction::South),
        Direction::North => (Direction::East, Direction::West),
        Direction::South => (Direction::West, Direction::East),
    }
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

/// Per-vehicle scratch state kept across ticks, index-aligned with the
/// sorted snapshot order and resynchronized whenever identities change.
#[derive(Debug, Default)]
struct ScratchTable {
    ids: Vec<Option<VehicleId>>,
    window_origin: Vec<Vec2>,
    window_elapsed: Vec<Duration>,
}

impl ScratchTable {
    fn begin_tick(&mut self, ordered: &[&VehicleSnapshot]) {
        let count = ordered.len();
        self.ids.resize(count, None);
        self.window_origin.resize(count, Vec2::ZERO);
        self.window_elapsed.resize(count, Duration::ZERO);

        for (index, vehicle) in ordered.iter().enumerate() {
            if self.ids[index] != Some(vehicle.id) {
                self.ids[index] = Some(vehicle.id);
                self.window_origin[index] = vehicle.position;
                self.window_elapsed[index] = Duration::ZERO;
            }
        }
    }

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

#[cfg(test)]
mod tests {
    use super::*;

    const TILE: f32 = 100.0;

    fn vehicle(id: u32, position: Vec2, heading: Direction) -> VehicleSnapshot {
        VehicleSnapshot {
            id: VehicleId::new(id),
            position,
            velocity: heading.unit() * 220.0,
            heading,
            phase: VehiclePhase::Normal,
            cruise_speed: 220.0,
        }
    }

    fn tick_events() -> Vec<Event> {
        vec![Event::TimeAdvanced {
            dt: Duration::from_millis(100),
        }]
    }

    fn system(seed: u64) -> Traffic {
        Traffic::new(Config::new(TrafficTuning::default(), seed))
    }

    fn drive_command(commands: &[Command], id: u32) -> (Direction, Vec2) {
        commands
            .iter()
            .find_map(|command| match command {
                Command::DriveVehicle {
                    vehicle,
                    heading,
                    velocity,
                } if vehicle.get() == id => Some((*heading, *velocity)),
                _ => None,
            })
            .unwrap_or_else(|| panic!("no drive command for vehicle {id}"))
    }

    #[test]
    fn open_road_keeps_heading_and_cruise_speed() {
        let cells = 25;
        let walkable = vec![true; cells];
        let road = vec![true; cells];
        let grid = GridView::new(&walkable, &road, 5, 5, TILE);
        let mut traffic = system(3);
        let view = VehicleView::from_snapshots(vec![vehicle(
            0,
            Vec2::new(250.0, 250.0),
            Direction::East,
        )]);

        let mut out = Vec::new();
        traffic.handle(&tick_events(), &view, &grid, &mut out);

        let (heading, velocity) = drive_command(&out, 0);
        assert_eq!(heading, Direction::East);
        assert!((velocity.x - 220.0).abs() < 1e-3);
        assert!(velocity.y.abs() < 1e-3, "open symmetric road must not bias");
    }

    #[test]
    fn tailgating_vehicle_stops() {
        let cells = 25;
        let walkable = vec![true; cells];
        let road = vec![true; cells];
        let grid = GridView::new(&walkable, &road, 5, 5, TILE);
        let mut traffic = system(3);
        let view = VehicleView::from_snapshots(vec![
            vehicle(0, Vec2::new(150.0, 250.0), Direction::East),
            vehicle(1, Vec2::new(260.0, 250.0), Direction::East),
        ]);

        let mut out = Vec::new();
        traffic.handle(&tick_events(), &view, &grid, &mut out);

        let (_, follower) = drive_command(&out, 0);
        assert_eq!(follower, Vec2::ZERO, "follower must stop behind the leader");
        let (_, leader) = drive_command(&out, 1);
        assert!(leader.x > 0.0, "leader keeps driving");
    }

    #[test]
    fn blocked_forward_tile_turns_without_reversing() {
        // A 3x3 cross: road only on the middle row and column.
        let columns = 3;
        let rows = 3;
        let walkable = vec![true; 9];
        let mut road = vec![false; 9];
        for index in [1, 3, 4, 5, 7] {
            road[index] = true;
        }
        let grid = GridView::new(&walkable, &road, columns, rows, TILE);
        let mut traffic = system(5);
        // Heading east on the cross's north arm: the tile ahead is
        // walkable but off-road, so the vehicle must turn. The only road
        // neighbor that is not the direct reverse lies to the south.
        let view = VehicleView::from_snapshots(vec![vehicle(
            0,
            Vec2::new(150.0, 50.0),
            Direction::East,
        )]);

        let mut out = Vec::new();
        traffic.handle(&tick_events(), &view, &grid, &mut out);

        let (heading, velocity) = drive_command(&out, 0);
        assert_eq!(heading, Direction::South);
        assert!(velocity.y > 0.0);
    }

    #[test]
    fn dead_end_idles_in_place() {
        // Single road cell surrounded by off-road tiles.
        let walkable = vec![true; 9];
        let mut road = vec![false; 9];
        road[4] = true;
        let grid = GridView::new(&walkable, &road, 3, 3, TILE);
        let mut traffic = system(5);
        let view = VehicleView::from_snapshots(vec![vehicle(
            0,
            Vec2::new(150.0, 150.0),
            Direction::East,
        )]);

        let mut out = Vec::new();
        traffic.handle(&tick_events(), &view, &grid, &mut out);

        let (heading, velocity) = drive_command(&out, 0);
        assert_eq!(heading, Direction::East);
        assert_eq!(velocity, Vec2::ZERO);
    }

    #[test]
    fn lane_keeping_biases_toward_wider_side() {
        // A 5x4 strip where rows 1..4 are road; the vehicle drives east in
        // the top road row, so the wider span lies to the south.
        let columns = 5;
        let rows = 4;
        let walkable = vec![true; 20];
        let mut road = vec![true; 20];
        for column in 0..columns {
            road[column as usize] = false;
        }
        let grid = GridView::new(&walkable, &road, columns, rows, TILE);
        let mut traffic = system(5);
        let view = VehicleView::from_snapshots(vec![vehicle(
            0,
            Vec2::new(250.0, 150.0),
            Direction::East,
        )]);

        let mut out = Vec::new();
        traffic.handle(&tick_events(), &view, &grid, &mut out);

        let (_, velocity) = drive_command(&out, 0);
        assert!(
            velocity.y > 0.0,
            "expected southward lane correction, got {velocity:?}"
        );
        assert!((velocity.x - 220.0).abs() < 1e-3);
    }

    #[test]
    fn accident_recovery_triggers_redirect() {
        let cells = 25;
        let walkable = vec![true; cells];
        let road = vec![true; cells];
        let grid = GridView::new(&walkable, &road, 5, 5, TILE);
        let mut traffic = system(9);
        let mut snapshot = vehicle(0, Vec2::new(250.0, 250.0), Direction::East);
        snapshot.phase = VehiclePhase::AccidentCooldown {
            remaining: Duration::from_secs(1),
        };
        let view = VehicleView::from_snapshots(vec![snapshot]);
        let events = vec![
            Event::TimeAdvanced {
                dt: Duration::from_millis(100),
            },
            Event::VehicleAccidentCleared {
                vehicle: VehicleId::new(0),
            },
        ];

        let mut out = Vec::new();
        traffic.handle(&events, &view, &grid, &mut out);

        let (heading, velocity) = drive_command(&out, 0);
        assert_ne!(heading, Direction::West, "reverse stays excluded");
        assert!(velocity.length() > 0.0);
    }

    #[test]
    fn vehicles_in_accident_phase_receive_no_commands() {
        let cells = 25;
        let walkable = vec![true; cells];
        let road = vec![true; cells];
        let grid = GridView::new(&walkable, &road, 5, 5, TILE);
        let mut traffic = system(3);
        let mut snapshot = vehicle(0, Vec2::new(250.0, 250.0), Direction::East);
        snapshot.phase = VehiclePhase::Accident {
            remaining: Duration::from_secs(1),
        };
        let view = VehicleView::from_snapshots(vec![snapshot]);

        let mut out = Vec::new();
        traffic.handle(&tick_events(), &view, &grid, &mut out);

        assert!(out.is_empty());
    }
}
