#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless command-line runner that stands in for the excluded game loop.
//!
//! Loads an ASCII street map, spawns the marked agents, scripts the
//! target's patrol, and drives the fixed-tick command/event loop: tick the
//! world, run the scheduler, pursuit, and traffic systems in order, apply
//! their command batches, and deliver queued target effects. Notable
//! events are printed as they happen, with a digest at the end.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use curfew_core::{Command, Event, PursuerKind, PursuerState, TargetEffects};
use curfew_system_pursuit::{Pursuit, PursuitTuning};
use curfew_system_scheduling::Scheduler;
use curfew_system_traffic::{Traffic, TrafficTuning};
use curfew_world::{self as world, query, World};
use glam::Vec2;

mod street_map;

/// Tile edge length used by the runner, in world units.
const TILE_LENGTH: f32 = 100.0;

/// Patrol speed of the scripted target in world units per second.
const TARGET_SPEED: f32 = 160.0;

/// Half-width of the target's patrol leg in world units.
const TARGET_PATROL_SPAN: f32 = 250.0;

#[derive(Debug, Parser)]
#[command(name = "curfew", about = "Headless runner for the Curfew pursuit core")]
struct Args {
    /// Number of fixed simulation ticks to run.
    #[arg(long, default_value_t = 300)]
    ticks: u32,

    /// Length of one tick in milliseconds.
    #[arg(long, default_value_t = 50)]
    tick_ms: u64,

    /// Seed for the deterministic decision systems.
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Path to an ASCII street map; the built-in map is used when omitted.
    #[arg(long)]
    map: Option<PathBuf>,
}

/// Scripted stand-in for the player-owned target: patrols east-west and
/// honors knockback and freeze through the core's narrow effect interface.
struct ScriptedTarget {
    position: Vec2,
    velocity: Vec2,
    origin_x: f32,
    frozen_remaining: Duration,
    moving_east: bool,
}

impl ScriptedTarget {
    fn new(start: Vec2) -> Self {
        Self {
            position: start,
            velocity: Vec2::ZERO,
            origin_x: start.x,
            frozen_remaining: Duration::ZERO,
            moving_east: true,
        }
    }

    fn update(&mut self, dt: Duration) {
        if !self.frozen_remaining.is_zero() {
            self.frozen_remaining = self.frozen_remaining.saturating_sub(dt);
            self.velocity = Vec2::ZERO;
            return;
        }

        if self.position.x >= self.origin_x + TARGET_PATROL_SPAN {
            self.moving_east = false;
        } else if self.position.x <= self.origin_x - TARGET_PATROL_SPAN {
            self.moving_east = true;
        }

        let direction = if self.moving_east { 1.0 } else { -1.0 };
        self.velocity = Vec2::new(direction * TARGET_SPEED, 0.0);
        self.position += self.velocity * dt.as_secs_f32();
    }
}

impl TargetEffects for ScriptedTarget {
    fn apply_knockback(&mut self, delta: Vec2) {
        self.position += delta;
    }

    fn set_frozen(&mut self, duration: Duration) {
        self.frozen_remaining = self.frozen_remaining.max(duration);
    }
}

/// Running tallies of the events worth summarizing after the run.
#[derive(Debug, Default)]
struct EventDigest {
    attacks_entered: u32,
    target_contacts: u32,
    target_strikes: u32,
    vehicle_collisions: u32,
    paths_assigned: u32,
    despawns: u32,
}

impl EventDigest {
    fn record(&mut self, tick: u32, events: &[Event]) {
        for event in events {
            match event {
                Event::PursuerStateChanged {
                    pursuer,
                    to: PursuerState::Attack,
                    ..
                } => {
                    self.attacks_entered += 1;
                    println!("[{tick:>4}] pursuer {} entered attack", pursuer.get());
                }
                Event::PursuerContactedTarget { pursuer, kind } => {
                    self.target_contacts += 1;
                    println!(
                        "[{tick:>4}] pursuer {} ({kind:?}) touched the target",
                        pursuer.get()
                    );
                }
                Event::TargetStruck { knockback, freeze } => {
                    self.target_strikes += 1;
                    println!(
                        "[{tick:>4}] target struck: knockback ({:.0}, {:.0}), frozen {}ms",
                        knockback.x,
                        knockback.y,
                        freeze.as_millis()
                    );
                }
                Event::VehicleCollision { first, second } => {
                    self.vehicle_collisions += 1;
                    println!(
                        "[{tick:>4}] vehicles {} and {} collided",
                        first.get(),
                        second.get()
                    );
                }
                Event::PursuerPathAssigned { .. } => {
                    self.paths_assigned += 1;
                }
                Event::PursuerDespawned { pursuer, reason } => {
                    self.despawns += 1;
                    println!(
                        "[{tick:>4}] pursuer {} despawned ({reason:?})",
                        pursuer.get()
                    );
                }
                Event::VehicleDespawned { vehicle, reason } => {
                    self.despawns += 1;
                    println!(
                        "[{tick:>4}] vehicle {} despawned ({reason:?})",
                        vehicle.get()
                    );
                }
                _ => {}
            }
        }
    }

    fn print_summary(&self, ticks: u32) {
        println!("--- {ticks} ticks simulated ---");
        println!("paths assigned:     {}", self.paths_assigned);
        println!("attacks entered:    {}", self.attacks_entered);
        println!("target contacts:    {}", self.target_contacts);
        println!("target strikes:     {}", self.target_strikes);
        println!("vehicle collisions: {}", self.vehicle_collisions);
        println!("agents despawned:   {}", self.despawns);
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let text = match &args.map {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read street map {}", path.display()))?,
        None => street_map::DEFAULT_MAP.to_owned(),
    };
    let map = street_map::parse(&text, TILE_LENGTH).context("failed to parse street map")?;

    let mut world = World::new();
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::ConfigureGrid {
            descriptor: map.descriptor.clone(),
        },
        &mut events,
    );
    if !events
        .iter()
        .any(|event| matches!(event, Event::GridConfigured { .. }))
    {
        bail!("the street map was rejected by the world: {events:?}");
    }

    for (index, position) in map.pursuer_spawns.iter().enumerate() {
        let kind = if index % 2 == 0 {
            PursuerKind::Blocker
        } else {
            PursuerKind::Sticker
        };
        world::apply(
            &mut world,
            Command::SpawnPursuer {
                kind,
                position: *position,
            },
            &mut events,
        );
    }
    for (position, heading) in &map.vehicle_spawns {
        world::apply(
            &mut world,
            Command::SpawnVehicle {
                position: *position,
                heading: *heading,
            },
            &mut events,
        );
    }

    let mut scheduler = Scheduler::new(curfew_system_scheduling::Config::default());
    let mut pursuit = Pursuit::new(curfew_system_pursuit::Config::new(
        PursuitTuning::default(),
        args.seed,
    ));
    let mut traffic = Traffic::new(curfew_system_traffic::Config::new(
        TrafficTuning::default(),
        args.seed.wrapping_add(1),
    ));
    let mut target = ScriptedTarget::new(map.target_start);
    let mut digest = EventDigest::default();
    let dt = Duration::from_millis(args.tick_ms);

    for tick in 0..args.ticks {
        target.update(dt);

        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::TrackTarget {
                position: target.position,
                velocity: target.velocity,
            },
            &mut events,
        );
        world::apply(&mut world, Command::Tick { dt }, &mut events);

        // Scheduler first so freshly planned paths are visible to pursuit
        // within the same tick.
        let snapshot = events.clone();
        let mut commands = Vec::new();
        scheduler.handle(
            &snapshot,
            &query::pursuer_view(&world),
            &query::grid_view(&world),
            &query::planning_view(&world),
            query::target(&world).as_ref(),
            &mut commands,
        );
        apply_commands(&mut world, commands, &mut events);

        let snapshot = events.clone();
        let mut commands = Vec::new();
        pursuit.handle(
            &snapshot,
            &query::pursuer_view(&world),
            &query::grid_view(&world),
            query::target(&world).as_ref(),
            &mut commands,
        );
        apply_commands(&mut world, commands, &mut events);

        let snapshot = events.clone();
        let mut commands = Vec::new();
        traffic.handle(
            &snapshot,
            &query::vehicle_view(&world),
            &query::grid_view(&world),
            &mut commands,
        );
        apply_commands(&mut world, commands, &mut events);

        world::drain_target_effects(&mut world, &mut target);
        digest.record(tick, &events);
    }

    digest.print_summary(args.ticks);
    Ok(())
}

/// Applies a system's command batch, appending generated events to the
/// tick log.
fn apply_commands(world: &mut World, commands: Vec<Command>, events: &mut Vec<Event>) {
    for command in commands {
        let mut generated = Vec::new();
        world::apply(world, command, &mut generated);
        events.extend(generated);
    }
}
