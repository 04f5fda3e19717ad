#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Curfew pursuit core.
//!
//! This crate defines the message surface that connects the external game
//! loop, the authoritative world, and the pure decision systems. The loop
//! submits [`Command`] values describing desired mutations, the world
//! executes those commands via its `apply` entry point, and then broadcasts
//! [`Event`] values for systems and presentation collaborators to react to
//! deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Unique identifier assigned to a pursuer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PursuerId(u32);

impl PursuerId {
    /// Creates a new pursuer identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a traffic vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleId(u32);

impl VehicleId {
    /// Creates a new vehicle identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }

    /// Computes the Chebyshev distance between two cell coordinates.
    ///
    /// Adjacent cells, including diagonal neighbors, sit at distance one.
    #[must_use]
    pub fn chebyshev_distance(self, other: CellCoord) -> u32 {
        self.column
            .abs_diff(other.column)
            .max(self.row.abs_diff(other.row))
    }

    /// Steps the cell one unit in the provided direction.
    ///
    /// Returns `None` when the step would leave the `columns` by `rows`
    /// bounds.
    #[must_use]
    pub fn stepped(self, direction: Direction, columns: u32, rows: u32) -> Option<CellCoord> {
        let (column, row) = match direction {
            Direction::North => (Some(self.column), self.row.checked_sub(1)),
            Direction::East => (self.column.checked_add(1), Some(self.row)),
            Direction::South => (Some(self.column), self.row.checked_add(1)),
            Direction::West => (self.column.checked_sub(1), Some(self.row)),
        };

        match (column, row) {
            (Some(column), Some(row)) if column < columns && row < rows => {
                Some(CellCoord::new(column, row))
            }
            _ => None,
        }
    }
}

/// Cardinal travel directions available to vehicles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Travel toward decreasing row indices.
    North,
    /// Travel toward increasing column indices.
    East,
    /// Travel toward increasing row indices.
    South,
    /// Travel toward decreasing column indices.
    West,
}

impl Direction {
    /// Every cardinal direction in clockwise order starting at north.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Direction pointing directly opposite to this one.
    #[must_use]
    pub const fn reverse(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// Unit vector for this direction in world space.
    ///
    /// Rows grow downward, so north maps to negative y.
    #[must_use]
    pub fn unit(self) -> Vec2 {
        match self {
            Direction::North => Vec2::new(0.0, -1.0),
            Direction::East => Vec2::new(1.0, 0.0),
            Direction::South => Vec2::new(0.0, 1.0),
            Direction::West => Vec2::new(-1.0, 0.0),
        }
    }
}

/// Behavioral variants a pursuer can be spawned with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PursuerKind {
    /// Predictive interceptor that leads the target's velocity and backs off
    /// at an off-axis angle instead of colliding.
    Blocker,
    /// Contact attacker that touches the target, then retreats for a
    /// cooldown before resuming pursuit.
    Sticker,
}

impl PursuerKind {
    /// Distance in world units by which this kind leads a moving target.
    ///
    /// Only the blocker intercepts ahead of the target; the sticker chases
    /// the live position.
    #[must_use]
    pub const fn lead_distance(self) -> f32 {
        match self {
            Self::Blocker => 300.0,
            Self::Sticker => 0.0,
        }
    }

    /// Target speed below which the target counts as standing still and no
    /// lead is applied.
    #[must_use]
    pub const fn standstill_speed(self) -> f32 {
        match self {
            Self::Blocker | Self::Sticker => 20.0,
        }
    }

    /// Minimum interval between contact reports for this kind.
    ///
    /// The sticker's interval doubles as its forced-retreat window; the
    /// blocker only debounces repeated contact while overlapping.
    #[must_use]
    pub const fn contact_cooldown(self) -> Duration {
        match self {
            Self::Blocker => Duration::from_millis(400),
            Self::Sticker => Duration::from_millis(1_200),
        }
    }

    /// Computes the world-space point this kind pursues for a target at the
    /// provided position and velocity.
    ///
    /// The blocker projects the target forward along its velocity by
    /// [`PursuerKind::lead_distance`] whenever the target moves faster than
    /// the standstill threshold. Every other combination yields the live
    /// position.
    #[must_use]
    pub fn pursuit_goal(self, target_position: Vec2, target_velocity: Vec2) -> Vec2 {
        let lead = self.lead_distance();
        if lead <= 0.0 {
            return target_position;
        }

        let speed = target_velocity.length();
        if speed <= self.standstill_speed() {
            return target_position;
        }

        target_position + (target_velocity / speed) * lead
    }
}

/// Hunting states a pursuer moves through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PursuerState {
    /// Target beyond detection radius; the pursuer holds position.
    Idle,
    /// Target detected but outside attack range; the pursuer closes in.
    Chase,
    /// Target within attack range; the pursuer presses the attack.
    Attack,
}

/// Driving phases a vehicle moves through after collisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VehiclePhase {
    /// Regular road travel.
    Normal,
    /// Frozen in place after a collision.
    Accident {
        /// Time left before the vehicle recovers and redirects.
        remaining: Duration,
    },
    /// Brief post-accident window during which further collisions are
    /// ignored.
    AccidentCooldown {
        /// Time left before the vehicle returns to the normal phase.
        remaining: Duration,
    },
}

/// Forced-movement override steering a pursuer toward a stale position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LostLock {
    /// Last known target position the pursuer is drawn toward.
    pub position: Vec2,
    /// Time left before the override expires.
    pub remaining: Duration,
}

/// Ordered sequence of grid cells from start to goal inclusive.
///
/// Paths are immutable once computed and replaced wholesale; the cursor
/// tracking progress lives on the owning agent, not on the path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TilePath {
    cells: Vec<CellCoord>,
}

impl TilePath {
    /// Creates a path from the provided cell sequence.
    #[must_use]
    pub fn from_cells(cells: Vec<CellCoord>) -> Self {
        Self { cells }
    }

    /// Cells composing the path in travel order.
    #[must_use]
    pub fn cells(&self) -> &[CellCoord] {
        &self.cells
    }

    /// Number of cells in the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether the path holds no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Final cell of the path, if any.
    #[must_use]
    pub fn goal(&self) -> Option<CellCoord> {
        self.cells.last().copied()
    }
}

/// Static description of the tile map handed to the world at configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridDescriptor {
    /// Number of tile columns laid out in the grid.
    pub columns: u32,
    /// Number of tile rows laid out in the grid.
    pub rows: u32,
    /// Length of each square tile measured in world units.
    pub tile_length: f32,
    /// Row-major per-cell passability flags.
    pub walkable: Vec<bool>,
    /// Row-major per-cell road flags; vehicles keep to road cells.
    pub road: Vec<bool>,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Configures the world grid from the provided map description.
    ConfigureGrid {
        /// Static tile map the world should adopt.
        descriptor: GridDescriptor,
    },
    /// Mutates the live passability of a single cell (destroyed scenery).
    SetCellWalkable {
        /// Cell whose passability changes.
        cell: CellCoord,
        /// New passability value for the cell.
        walkable: bool,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Records the tracked target's live position and velocity for the tick.
    TrackTarget {
        /// World-space position of the target.
        position: Vec2,
        /// World-space velocity of the target.
        velocity: Vec2,
    },
    /// Requests that a pursuer be created at the provided position.
    SpawnPursuer {
        /// Behavioral variant of the pursuer.
        kind: PursuerKind,
        /// World-space spawn position.
        position: Vec2,
    },
    /// Requests that a vehicle be created at the provided position.
    SpawnVehicle {
        /// World-space spawn position.
        position: Vec2,
        /// Initial travel heading.
        heading: Direction,
    },
    /// Requests a pursuer state machine transition.
    SetPursuerState {
        /// Identifier of the pursuer transitioning.
        pursuer: PursuerId,
        /// State the pursuer should adopt.
        state: PursuerState,
    },
    /// Requests that a pursuer move with the provided velocity this tick.
    SteerPursuer {
        /// Identifier of the pursuer being steered.
        pursuer: PursuerId,
        /// Desired world-space velocity before debuff scaling.
        velocity: Vec2,
    },
    /// Replaces a pursuer's cached path with a freshly planned one.
    AssignPursuerPath {
        /// Identifier of the pursuer receiving the path.
        pursuer: PursuerId,
        /// Planned path from the pursuer toward its goal.
        path: TilePath,
        /// Cell the target occupied when the path was planned.
        target_cell: CellCoord,
    },
    /// Discards a pursuer's cached path.
    ClearPursuerPath {
        /// Identifier of the pursuer losing its path.
        pursuer: PursuerId,
    },
    /// Applies a timed speed debuff to a pursuer.
    ApplySpeedDebuff {
        /// Identifier of the affected pursuer.
        pursuer: PursuerId,
        /// Speed multiplier in (0, 1]; the minimum of all active debuffs
        /// wins.
        multiplier: f32,
        /// Time the debuff stays active.
        duration: Duration,
    },
    /// Freezes a pursuer in place for the provided duration.
    FreezePursuer {
        /// Identifier of the affected pursuer.
        pursuer: PursuerId,
        /// Time the freeze stays active.
        duration: Duration,
    },
    /// Forces a pursuer toward a stale position, overriding its state
    /// machine while active.
    SetLostLock {
        /// Identifier of the affected pursuer.
        pursuer: PursuerId,
        /// Last known position the pursuer should investigate.
        position: Vec2,
        /// Time the override stays active.
        duration: Duration,
    },
    /// Requests that a vehicle adopt a heading and move with the provided
    /// velocity this tick.
    DriveVehicle {
        /// Identifier of the vehicle being driven.
        vehicle: VehicleId,
        /// Heading the vehicle should adopt.
        heading: Direction,
        /// Desired world-space velocity.
        velocity: Vec2,
    },
}

/// Reasons a grid configuration request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GridConfigError {
    /// The walkable or road cell buffers do not match the grid dimensions.
    CellCountMismatch,
    /// The tile length is zero or negative.
    InvalidTileLength,
}

/// Reasons the world removes an agent from the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DespawnReason {
    /// The agent ended up outside the world bounds.
    OutOfBounds,
}

/// Entity on the receiving end of a vehicle strike.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrikeVictim {
    /// The tracked target was struck.
    Target,
    /// A pursuer was struck.
    Pursuer(PursuerId),
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that the world adopted a new grid configuration.
    GridConfigured {
        /// Number of tile columns in the adopted grid.
        columns: u32,
        /// Number of tile rows in the adopted grid.
        rows: u32,
        /// Tile edge length of the adopted grid in world units.
        tile_length: f32,
    },
    /// Reports that a grid configuration request was rejected.
    GridConfigurationRejected {
        /// Specific reason the configuration failed.
        reason: GridConfigError,
    },
    /// Confirms that a pursuer was created.
    PursuerSpawned {
        /// Identifier assigned to the pursuer by the world.
        pursuer: PursuerId,
        /// Behavioral variant of the pursuer.
        kind: PursuerKind,
        /// World-space position the pursuer spawned at.
        position: Vec2,
    },
    /// Confirms that a vehicle was created.
    VehicleSpawned {
        /// Identifier assigned to the vehicle by the world.
        vehicle: VehicleId,
        /// World-space position the vehicle spawned at.
        position: Vec2,
        /// Initial travel heading.
        heading: Direction,
    },
    /// Announces a pursuer state machine transition.
    PursuerStateChanged {
        /// Identifier of the pursuer that transitioned.
        pursuer: PursuerId,
        /// State the pursuer left.
        from: PursuerState,
        /// State the pursuer entered.
        to: PursuerState,
    },
    /// Confirms that a pursuer received a freshly planned path.
    PursuerPathAssigned {
        /// Identifier of the pursuer that received the path.
        pursuer: PursuerId,
        /// Final cell of the assigned path.
        goal: CellCoord,
    },
    /// Confirms that a pursuer's cached path was discarded.
    PursuerPathCleared {
        /// Identifier of the pursuer that lost its path.
        pursuer: PursuerId,
    },
    /// Reports that a pursuer touched the tracked target.
    PursuerContactedTarget {
        /// Identifier of the pursuer making contact.
        pursuer: PursuerId,
        /// Behavioral variant of the pursuer making contact.
        kind: PursuerKind,
    },
    /// Reports that the tracked target was struck and which effects were
    /// queued for it.
    TargetStruck {
        /// Position delta queued for the target.
        knockback: Vec2,
        /// Freeze duration queued for the target.
        freeze: Duration,
    },
    /// Reports that two vehicles collided and entered the accident phase.
    VehicleCollision {
        /// First vehicle involved in the collision.
        first: VehicleId,
        /// Second vehicle involved in the collision.
        second: VehicleId,
    },
    /// Reports that a vehicle struck the target or a pursuer.
    VehicleStruck {
        /// Vehicle that dealt the strike.
        vehicle: VehicleId,
        /// Entity on the receiving end.
        victim: StrikeVictim,
    },
    /// Announces that a vehicle finished its accident freeze and needs a
    /// fresh direction.
    VehicleAccidentCleared {
        /// Identifier of the recovered vehicle.
        vehicle: VehicleId,
    },
    /// Reports that a vehicle was snapped back onto the road network after
    /// its cell became impassable.
    VehicleRelocated {
        /// Identifier of the relocated vehicle.
        vehicle: VehicleId,
        /// Cell the vehicle was lifted from.
        from: CellCoord,
        /// Cell the vehicle was placed onto.
        to: CellCoord,
    },
    /// Confirms that a pursuer was removed from the simulation.
    PursuerDespawned {
        /// Identifier of the removed pursuer.
        pursuer: PursuerId,
        /// Specific reason for the removal.
        reason: DespawnReason,
    },
    /// Confirms that a vehicle was removed from the simulation.
    VehicleDespawned {
        /// Identifier of the removed vehicle.
        vehicle: VehicleId,
        /// Specific reason for the removal.
        reason: DespawnReason,
    },
}

/// Narrow interface implemented by the externally-owned tracked target.
///
/// The core never reaches into the target's internals; queued effects are
/// delivered through these two entry points by the owning game loop.
pub trait TargetEffects {
    /// Shifts the target's position by the provided world-space delta.
    fn apply_knockback(&mut self, delta: Vec2);
    /// Freezes the target in place for the provided duration.
    fn set_frozen(&mut self, duration: Duration);
}

/// Immutable representation of a single pursuer's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct PursuerSnapshot {
    /// Unique identifier assigned to the pursuer.
    pub id: PursuerId,
    /// Behavioral variant of the pursuer.
    pub kind: PursuerKind,
    /// Current hunting state.
    pub state: PursuerState,
    /// World-space position.
    pub position: Vec2,
    /// World-space velocity applied during the last movement.
    pub velocity: Vec2,
    /// Time left on the freeze effect; zero when unfrozen.
    pub frozen_remaining: Duration,
    /// Active lost-lock override, if any.
    pub lost_lock: Option<LostLock>,
    /// Time left on the post-contact retreat cooldown; zero when inactive.
    pub contact_cooldown: Duration,
    /// Effective speed multiplier after combining active debuffs.
    pub speed_multiplier: f32,
    /// Reports whether the pursuer holds a cached path.
    pub has_path: bool,
    /// Next waypoint of the cached path, if one remains.
    pub next_waypoint: Option<CellCoord>,
    /// Final cell of the cached path, if any.
    pub path_goal: Option<CellCoord>,
    /// Cell the target occupied when the cached path was planned.
    pub target_cell_at_plan: Option<CellCoord>,
    /// Time elapsed since the cached path was planned.
    pub since_plan: Duration,
}

/// Read-only snapshot describing all pursuers in the simulation.
#[derive(Clone, Debug, Default)]
pub struct PursuerView {
    snapshots: Vec<PursuerSnapshot>,
}

impl PursuerView {
    /// Creates a new pursuer view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<PursuerSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &PursuerSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<PursuerSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single vehicle's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct VehicleSnapshot {
    /// Unique identifier assigned to the vehicle.
    pub id: VehicleId,
    /// World-space position.
    pub position: Vec2,
    /// World-space velocity applied during the last movement.
    pub velocity: Vec2,
    /// Current travel heading.
    pub heading: Direction,
    /// Current driving phase.
    pub phase: VehiclePhase,
    /// Cruise speed in world units per second.
    pub cruise_speed: f32,
}

/// Read-only snapshot describing all vehicles in the simulation.
#[derive(Clone, Debug, Default)]
pub struct VehicleView {
    snapshots: Vec<VehicleSnapshot>,
}

impl VehicleView {
    /// Creates a new vehicle view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<VehicleSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &VehicleSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<VehicleSnapshot> {
        self.snapshots
    }
}

/// Read-only record of the tracked target's live motion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetSnapshot {
    /// World-space position of the target.
    pub position: Vec2,
    /// World-space velocity of the target.
    pub velocity: Vec2,
}

/// Read-only view over the live walkability grid.
///
/// Queries accept sub-tile world coordinates and reflect scenery mutations
/// immediately; the planning mesh used by the path planner is a separate
/// one-time snapshot exposed through [`PlanningView`].
#[derive(Clone, Copy, Debug)]
pub struct GridView<'a> {
    walkable: &'a [bool],
    road: &'a [bool],
    columns: u32,
    rows: u32,
    tile_length: f32,
}

impl<'a> GridView<'a> {
    /// Captures a new grid view backed by the provided cell slices.
    #[must_use]
    pub fn new(
        walkable: &'a [bool],
        road: &'a [bool],
        columns: u32,
        rows: u32,
        tile_length: f32,
    ) -> Self {
        Self {
            walkable,
            road,
            columns,
            rows,
            tile_length,
        }
    }

    /// Provides the dimensions of the underlying grid in cells.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Tile edge length in world units.
    #[must_use]
    pub const fn tile_length(&self) -> f32 {
        self.tile_length
    }

    /// Reports whether a usable grid was configured.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.columns > 0 && self.rows > 0
    }

    /// Reports whether the cell lies within the grid bounds.
    #[must_use]
    pub const fn in_bounds(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Reports whether the cell can be traversed. Out-of-bounds cells are
    /// never walkable.
    #[must_use]
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .and_then(|index| self.walkable.get(index).copied())
            .unwrap_or(false)
    }

    /// Reports whether the cell belongs to the road network.
    #[must_use]
    pub fn has_road(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .and_then(|index| self.road.get(index).copied())
            .unwrap_or(false)
    }

    /// Converts a world-space position to the cell containing it.
    ///
    /// Returns `None` for positions outside the grid.
    #[must_use]
    pub fn world_to_cell(&self, position: Vec2) -> Option<CellCoord> {
        if self.tile_length <= 0.0 || position.x < 0.0 || position.y < 0.0 {
            return None;
        }

        let column = (position.x / self.tile_length) as u32;
        let row = (position.y / self.tile_length) as u32;
        let cell = CellCoord::new(column, row);
        self.in_bounds(cell).then_some(cell)
    }

    /// World-space center of the provided cell.
    #[must_use]
    pub fn cell_center(&self, cell: CellCoord) -> Vec2 {
        Vec2::new(
            (cell.column() as f32 + 0.5) * self.tile_length,
            (cell.row() as f32 + 0.5) * self.tile_length,
        )
    }

    /// Reports whether the world-space position sits on a walkable cell.
    #[must_use]
    pub fn is_walkable_world(&self, position: Vec2) -> bool {
        self.world_to_cell(position)
            .map_or(false, |cell| self.is_walkable(cell))
    }

    /// Reports whether the world-space position sits on a road cell.
    #[must_use]
    pub fn has_road_world(&self, position: Vec2) -> bool {
        self.world_to_cell(position)
            .map_or(false, |cell| self.has_road(cell))
    }

    /// Total extent of the grid in world units.
    #[must_use]
    pub fn world_bounds(&self) -> Vec2 {
        Vec2::new(
            self.columns as f32 * self.tile_length,
            self.rows as f32 * self.tile_length,
        )
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.in_bounds(cell) {
            return None;
        }

        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}

/// Read-only view over the planning mesh snapshotted at configuration time.
///
/// The mesh intentionally does not track later scenery mutations; movement
/// re-validates against the live grid instead.
#[derive(Clone, Copy, Debug)]
pub struct PlanningView<'a> {
    walkable: &'a [bool],
    columns: u32,
    rows: u32,
}

impl<'a> PlanningView<'a> {
    /// Captures a new planning view backed by the provided mesh slice.
    #[must_use]
    pub fn new(walkable: &'a [bool], columns: u32, rows: u32) -> Self {
        Self {
            walkable,
            columns,
            rows,
        }
    }

    /// Provides the dimensions of the underlying mesh in cells.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Reports whether a usable mesh was captured.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.columns > 0 && self.rows > 0
    }

    /// Reports whether the cell lies within the mesh bounds.
    #[must_use]
    pub const fn in_bounds(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Reports whether the cell was walkable when the mesh was captured.
    #[must_use]
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        if !self.in_bounds(cell) {
            return false;
        }

        let row = usize::try_from(cell.row()).unwrap_or(usize::MAX);
        let column = usize::try_from(cell.column()).unwrap_or(usize::MAX);
        let width = usize::try_from(self.columns).unwrap_or(0);
        row.checked_mul(width)
            .and_then(|base| base.checked_add(column))
            .and_then(|index| self.walkable.get(index).copied())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = CellCoord::new(1, 1);
        let destination = CellCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    #[test]
    fn chebyshev_distance_treats_diagonals_as_one() {
        let origin = CellCoord::new(2, 2);
        assert_eq!(origin.chebyshev_distance(CellCoord::new(3, 3)), 1);
        assert_eq!(origin.chebyshev_distance(CellCoord::new(5, 3)), 3);
    }

    #[test]
    fn stepped_respects_bounds() {
        let cell = CellCoord::new(0, 0);
        assert_eq!(cell.stepped(Direction::North, 4, 4), None);
        assert_eq!(cell.stepped(Direction::West, 4, 4), None);
        assert_eq!(
            cell.stepped(Direction::East, 4, 4),
            Some(CellCoord::new(1, 0))
        );
        assert_eq!(
            CellCoord::new(3, 3).stepped(Direction::South, 4, 4),
            None
        );
    }

    #[test]
    fn direction_reverse_round_trips() {
        for direction in Direction::ALL {
            assert_eq!(direction.reverse().reverse(), direction);
            assert_ne!(direction.reverse(), direction);
        }
    }

    #[test]
    fn blocker_leads_moving_target() {
        let goal = PursuerKind::Blocker.pursuit_goal(Vec2::new(100.0, 100.0), Vec2::new(50.0, 0.0));
        assert!((goal.x - 400.0).abs() < 1e-3);
        assert!((goal.y - 100.0).abs() < 1e-3);
    }

    #[test]
    fn blocker_ignores_standing_target() {
        let position = Vec2::new(100.0, 100.0);
        let goal = PursuerKind::Blocker.pursuit_goal(position, Vec2::new(5.0, 0.0));
        assert_eq!(goal, position);
    }

    #[test]
    fn sticker_chases_live_position() {
        let position = Vec2::new(10.0, 20.0);
        let goal = PursuerKind::Sticker.pursuit_goal(position, Vec2::new(500.0, 0.0));
        assert_eq!(goal, position);
    }

    #[test]
    fn grid_view_converts_world_coordinates() {
        let walkable = vec![true; 16];
        let road = vec![false; 16];
        let view = GridView::new(&walkable, &road, 4, 4, 100.0);

        assert_eq!(
            view.world_to_cell(Vec2::new(150.0, 250.0)),
            Some(CellCoord::new(1, 2))
        );
        assert_eq!(view.world_to_cell(Vec2::new(-1.0, 0.0)), None);
        assert_eq!(view.world_to_cell(Vec2::new(400.0, 0.0)), None);
        assert_eq!(view.cell_center(CellCoord::new(1, 2)), Vec2::new(150.0, 250.0));
    }

    #[test]
    fn grid_view_rejects_out_of_bounds_queries() {
        let walkable = vec![true; 4];
        let road = vec![true; 4];
        let view = GridView::new(&walkable, &road, 2, 2, 50.0);

        assert!(!view.is_walkable(CellCoord::new(2, 0)));
        assert!(!view.has_road(CellCoord::new(0, 2)));
        assert!(view.is_walkable(CellCoord::new(1, 1)));
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn pursuer_id_round_trips_through_bincode() {
        assert_round_trip(&PursuerId::new(42));
    }

    #[test]
    fn cell_coord_round_trips_through_bincode() {
        assert_round_trip(&CellCoord::new(5, 7));
    }

    #[test]
    fn pursuer_kind_round_trips_through_bincode() {
        assert_round_trip(&PursuerKind::Blocker);
        assert_round_trip(&PursuerKind::Sticker);
    }

    #[test]
    fn grid_descriptor_round_trips_through_bincode() {
        let descriptor = GridDescriptor {
            columns: 2,
            rows: 2,
            tile_length: 64.0,
            walkable: vec![true, false, true, true],
            road: vec![false, false, true, true],
        };
        assert_round_trip(&descriptor);
    }
}
