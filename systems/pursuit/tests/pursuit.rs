use std::time::Duration;

use curfew_core::{Command, Event, GridDescriptor, PursuerKind, PursuerState};
use curfew_system_pursuit::{Config, Pursuit, PursuitTuning};
use curfew_world::{self as world, query, World};
use glam::Vec2;

fn open_descriptor(columns: u32, rows: u32) -> GridDescriptor {
    let cells = (columns * rows) as usize;
    GridDescriptor {
        columns,
        rows,
        tile_length: 100.0,
        walkable: vec![true; cells],
        road: vec![true; cells],
    }
}

fn run_tick(
    world: &mut World,
    pursuit: &mut Pursuit,
    target_position: Vec2,
    dt: Duration,
    log: &mut Vec<Event>,
) {
    let mut events = Vec::new();
    world::apply(
        world,
        Command::TrackTarget {
            position: target_position,
            velocity: Vec2::ZERO,
        },
        &mut events,
    );
    world::apply(world, Command::Tick { dt }, &mut events);
    log.extend(events.iter().cloned());

    let pursuers = query::pursuer_view(world);
    let grid = query::grid_view(world);
    let target = query::target(world);
    let mut commands = Vec::new();
    pursuit.handle(&events, &pursuers, &grid, target.as_ref(), &mut commands);

    for command in commands {
        let mut generated = Vec::new();
        world::apply(world, command, &mut generated);
        log.extend(generated.iter().cloned());
    }
}

#[test]
fn chase_closes_the_distance_tick_over_tick() {
    let mut world = World::new();
    let mut log = Vec::new();
    world::apply(
        &mut world,
        Command::ConfigureGrid {
            descriptor: open_descriptor(30, 30),
        },
        &mut log,
    );
    world::apply(
        &mut world,
        Command::SpawnPursuer {
            kind: PursuerKind::Sticker,
            position: Vec2::new(500.0, 1_500.0),
        },
        &mut log,
    );

    let mut pursuit = Pursuit::new(Config::new(PursuitTuning::default(), 11));
    let target_position = Vec2::new(1_400.0, 1_500.0);
    let initial_distance = 900.0;

    for _ in 0..20 {
        run_tick(
            &mut world,
            &mut pursuit,
            target_position,
            Duration::from_millis(100),
            &mut log,
        );
    }

    let view = query::pursuer_view(&world).into_vec();
    let final_distance = view[0].position.distance(target_position);
    assert!(
        final_distance < initial_distance - 200.0,
        "pursuer failed to close: {final_distance}"
    );
    assert!(
        log.iter().any(|event| matches!(
            event,
            Event::PursuerStateChanged {
                to: PursuerState::Chase,
                ..
            }
        )),
        "pursuer never entered chase"
    );
}

#[test]
fn attack_state_reached_in_close_quarters() {
    let mut world = World::new();
    let mut log = Vec::new();
    world::apply(
        &mut world,
        Command::ConfigureGrid {
            descriptor: open_descriptor(30, 30),
        },
        &mut log,
    );
    world::apply(
        &mut world,
        Command::SpawnPursuer {
            kind: PursuerKind::Sticker,
            position: Vec2::new(1_200.0, 1_500.0),
        },
        &mut log,
    );

    let mut pursuit = Pursuit::new(Config::new(PursuitTuning::default(), 11));
    for _ in 0..10 {
        run_tick(
            &mut world,
            &mut pursuit,
            Vec2::new(1_400.0, 1_500.0),
            Duration::from_millis(100),
            &mut log,
        );
    }

    assert!(log.iter().any(|event| matches!(
        event,
        Event::PursuerStateChanged {
            to: PursuerState::Attack,
            ..
        }
    )));
}

#[test]
fn replay_produces_identical_event_logs() {
    let run = || {
        let mut world = World::new();
        let mut log = Vec::new();
        world::apply(
            &mut world,
            Command::ConfigureGrid {
                descriptor: open_descriptor(20, 20),
            },
            &mut log,
        );
        world::apply(
            &mut world,
            Command::SpawnPursuer {
                kind: PursuerKind::Blocker,
                position: Vec2::new(300.0, 300.0),
            },
            &mut log,
        );
        world::apply(
            &mut world,
            Command::SpawnPursuer {
                kind: PursuerKind::Sticker,
                position: Vec2::new(1_700.0, 300.0),
            },
            &mut log,
        );

        let mut pursuit = Pursuit::new(Config::new(PursuitTuning::default(), 99));
        for step in 0..30 {
            let target = Vec2::new(1_000.0, 1_000.0 + (step as f32) * 10.0);
            run_tick(
                &mut world,
                &mut pursuit,
                target,
                Duration::from_millis(50),
                &mut log,
            );
        }

        let positions: Vec<Vec2> = query::pursuer_view(&world)
            .into_vec()
            .into_iter()
            .map(|snapshot| snapshot.position)
            .collect();
        (log, positions)
    };

    let (first_log, first_positions) = run();
    let (second_log, second_positions) = run();
    assert_eq!(first_log, second_log, "event logs diverged between runs");
    assert_eq!(first_positions, second_positions);
}
