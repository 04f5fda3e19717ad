use std::time::Duration;

use curfew_core::{Command, Direction, Event, GridDescriptor};
use curfew_system_traffic::{Config, Traffic, TrafficTuning};
use curfew_world::{self as world, query, World};
use glam::Vec2;

fn run_tick(world: &mut World, traffic: &mut Traffic, dt: Duration, log: &mut Vec<Event>) {
    let mut events = Vec::new();
    world::apply(world, Command::Tick { dt }, &mut events);
    log.extend(events.iter().cloned());

    let vehicles = query::vehicle_view(world);
    let grid = query::grid_view(world);
    let mut commands = Vec::new();
    traffic.handle(&events, &vehicles, &grid, &mut commands);

    for command in commands {
        let mut generated = Vec::new();
        world::apply(world, command, &mut generated);
        log.extend(generated.iter().cloned());
    }
}

#[test]
fn lone_vehicle_crosses_the_grid_and_despawns() {
    let mut world = World::new();
    let mut log = Vec::new();
    let cells = 25;
    world::apply(
        &mut world,
        Command::ConfigureGrid {
            descriptor: GridDescriptor {
                columns: 5,
                rows: 5,
                tile_length: 100.0,
                walkable: vec![true; cells],
                road: vec![true; cells],
            },
        },
        &mut log,
    );
    world::apply(
        &mut world,
        Command::SpawnVehicle {
            position: Vec2::new(250.0, 250.0),
            heading: Direction::East,
        },
        &mut log,
    );

    let mut traffic = Traffic::new(Config::new(TrafficTuning::default(), 17));
    let mut last_x = 250.0;
    let mut despawned = false;

    for _ in 0..40 {
        run_tick(&mut world, &mut traffic, Duration::from_millis(100), &mut log);

        let view = query::vehicle_view(&world).into_vec();
        match view.first() {
            Some(vehicle) => {
                assert!(
                    vehicle.position.x >= last_x,
                    "vehicle moved backwards: {} -> {}",
                    last_x,
                    vehicle.position.x
                );
                assert!((vehicle.position.y - 250.0).abs() < 1.0, "vehicle left its lane");
                last_x = vehicle.position.x;
            }
            None => {
                despawned = true;
                break;
            }
        }
    }

    assert!(despawned, "vehicle should leave the grid and despawn");
    assert!(log.iter().any(|event| matches!(
        event,
        Event::VehicleDespawned {
            reason: curfew_core::DespawnReason::OutOfBounds,
            ..
        }
    )));
}

#[test]
fn vehicle_follows_an_l_shaped_road() {
    let mut world = World::new();
    let mut log = Vec::new();
    // 6x6 map: road runs east along row 2 to column 4, then south down
    // column 4. Everything else is walkable but off-road.
    let columns = 6u32;
    let rows = 6u32;
    let mut road = vec![false; (columns * rows) as usize];
    for column in 0..=4u32 {
        road[(2 * columns + column) as usize] = true;
    }
    for row in 2..rows {
        road[(row * columns + 4) as usize] = true;
    }
    world::apply(
        &mut world,
        Command::ConfigureGrid {
            descriptor: GridDescriptor {
                columns,
                rows,
                tile_length: 100.0,
                walkable: vec![true; (columns * rows) as usize],
                road,
            },
        },
        &mut log,
    );
    world::apply(
        &mut world,
        Command::SpawnVehicle {
            position: Vec2::new(50.0, 250.0),
            heading: Direction::East,
        },
        &mut log,
    );

    let mut traffic = Traffic::new(Config::new(TrafficTuning::default(), 17));
    let mut turned_south = false;

    for _ in 0..60 {
        run_tick(&mut world, &mut traffic, Duration::from_millis(100), &mut log);

        let view = query::vehicle_view(&world).into_vec();
        let Some(vehicle) = view.first() else {
            break;
        };

        let grid = query::grid_view(&world);
        let cell = grid
            .world_to_cell(vehicle.position)
            .expect("vehicle stays in bounds");
        assert!(grid.has_road(cell), "vehicle left the road at {cell:?}");

        if vehicle.heading == Direction::South {
            turned_south = true;
        }
    }

    assert!(turned_south, "vehicle should turn south at the corner");
}
