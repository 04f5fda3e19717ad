use std::time::Duration;

use curfew_core::{
    CellCoord, Command, Event, GridView, PlanningView, PursuerId, PursuerKind, PursuerSnapshot,
    PursuerState, PursuerView, TargetSnapshot,
};
use curfew_system_scheduling::{Config, Scheduler};
use glam::Vec2;

const COLUMNS: u32 = 20;
const ROWS: u32 = 20;
const TILE: f32 = 100.0;

fn open_buffers() -> (Vec<bool>, Vec<bool>) {
    let cells = (COLUMNS * ROWS) as usize;
    (vec![true; cells], vec![true; cells])
}

fn chasing(id: u32, position: Vec2) -> PursuerSnapshot {
    PursuerSnapshot {
        id: PursuerId::new(id),
        kind: PursuerKind::Sticker,
        state: PursuerState::Chase,
        position,
        velocity: Vec2::ZERO,
        frozen_remaining: Duration::ZERO,
        lost_lock: None,
        contact_cooldown: Duration::ZERO,
        speed_multiplier: 1.0,
        has_path: false,
        next_waypoint: None,
        path_goal: None,
        target_cell_at_plan: None,
        since_plan: Duration::ZERO,
    }
}

fn target_at(position: Vec2) -> TargetSnapshot {
    TargetSnapshot {
        position,
        velocity: Vec2::ZERO,
    }
}

fn tick_events() -> Vec<Event> {
    vec![Event::TimeAdvanced {
        dt: Duration::from_millis(100),
    }]
}

fn path_commands(commands: &[Command]) -> usize {
    commands
        .iter()
        .filter(|command| {
            matches!(
                command,
                Command::AssignPursuerPath { .. } | Command::ClearPursuerPath { .. }
            )
        })
        .count()
}

#[test]
fn budget_caps_planner_invocations_per_tick() {
    let (walkable, road) = open_buffers();
    let grid = GridView::new(&walkable, &road, COLUMNS, ROWS, TILE);
    let planning = PlanningView::new(&walkable, COLUMNS, ROWS);
    let mut scheduler = Scheduler::new(Config::default());

    let snapshots: Vec<PursuerSnapshot> = (0..10)
        .map(|id| chasing(id, Vec2::new(150.0 + 100.0 * id as f32, 150.0)))
        .collect();
    let view = PursuerView::from_snapshots(snapshots);
    let target = target_at(Vec2::new(1_550.0, 1_550.0));

    let mut out = Vec::new();
    scheduler.handle(&tick_events(), &view, &grid, &planning, Some(&target), &mut out);

    assert_eq!(path_commands(&out), 3, "budget of three must hold");
    assert!(out
        .iter()
        .all(|command| matches!(command, Command::AssignPursuerPath { .. })));
}

#[test]
fn deferred_pursuers_get_their_turn_on_later_ticks() {
    let (walkable, road) = open_buffers();
    let grid = GridView::new(&walkable, &road, COLUMNS, ROWS, TILE);
    let planning = PlanningView::new(&walkable, COLUMNS, ROWS);
    let mut scheduler = Scheduler::new(Config::default());
    let target = target_at(Vec2::new(1_550.0, 1_550.0));
    let target_cell = CellCoord::new(15, 15);

    let mut snapshots: Vec<PursuerSnapshot> = (0..7)
        .map(|id| chasing(id, Vec2::new(150.0 + 100.0 * id as f32, 150.0)))
        .collect();

    let mut planned: Vec<PursuerId> = Vec::new();
    for _ in 0..3 {
        let view = PursuerView::from_snapshots(snapshots.clone());
        let mut out = Vec::new();
        scheduler.handle(&tick_events(), &view, &grid, &planning, Some(&target), &mut out);

        for command in &out {
            if let Command::AssignPursuerPath { pursuer, .. } = command {
                planned.push(*pursuer);
                let snapshot = snapshots
                    .iter_mut()
                    .find(|snapshot| snapshot.id == *pursuer)
                    .expect("known pursuer");
                snapshot.has_path = true;
                snapshot.target_cell_at_plan = Some(target_cell);
                snapshot.since_plan = Duration::ZERO;
            }
        }
    }

    planned.sort();
    planned.dedup();
    assert_eq!(planned.len(), 7, "every pursuer must be planned within three ticks");
}

#[test]
fn unreachable_goal_clears_stale_paths_only() {
    let (mut walkable, road) = open_buffers();
    // Seal the target inside a 1-cell chamber at (15, 15).
    for (column, row) in [
        (14u32, 14u32),
        (15, 14),
        (16, 14),
        (14, 15),
        (16, 15),
        (14, 16),
        (15, 16),
        (16, 16),
    ] {
        walkable[(row * COLUMNS + column) as usize] = false;
    }
    let grid = GridView::new(&walkable, &road, COLUMNS, ROWS, TILE);
    let planning = PlanningView::new(&walkable, COLUMNS, ROWS);
    let mut scheduler = Scheduler::new(Config::default());

    let mut with_path = chasing(0, Vec2::new(150.0, 150.0));
    with_path.has_path = true;
    with_path.target_cell_at_plan = Some(CellCoord::new(10, 10));
    let without_path = chasing(1, Vec2::new(250.0, 150.0));
    let view = PursuerView::from_snapshots(vec![with_path, without_path]);
    let target = target_at(Vec2::new(1_550.0, 1_550.0));

    let mut out = Vec::new();
    scheduler.handle(&tick_events(), &view, &grid, &planning, Some(&target), &mut out);

    assert_eq!(
        out,
        vec![Command::ClearPursuerPath {
            pursuer: PursuerId::new(0)
        }]
    );
}

#[test]
fn quiet_when_no_target_is_tracked() {
    let (walkable, road) = open_buffers();
    let grid = GridView::new(&walkable, &road, COLUMNS, ROWS, TILE);
    let planning = PlanningView::new(&walkable, COLUMNS, ROWS);
    let mut scheduler = Scheduler::new(Config::default());
    let view = PursuerView::from_snapshots(vec![chasing(0, Vec2::new(150.0, 150.0))]);

    let mut out = Vec::new();
    scheduler.handle(&tick_events(), &view, &grid, &planning, None, &mut out);

    assert!(out.is_empty());
}

#[test]
fn same_seed_selects_the_same_pursuers() {
    let (walkable, road) = open_buffers();
    let grid = GridView::new(&walkable, &road, COLUMNS, ROWS, TILE);
    let planning = PlanningView::new(&walkable, COLUMNS, ROWS);
    let snapshots: Vec<PursuerSnapshot> = (0..10)
        .map(|id| chasing(id, Vec2::new(150.0 + 100.0 * id as f32, 150.0)))
        .collect();
    let view = PursuerView::from_snapshots(snapshots);
    let target = target_at(Vec2::new(1_550.0, 1_550.0));

    let run = |seed: u64| {
        let mut scheduler = Scheduler::new(Config::new(3, Duration::from_millis(400), seed));
        let mut out = Vec::new();
        scheduler.handle(&tick_events(), &view, &grid, &planning, Some(&target), &mut out);
        out
    };

    assert_eq!(run(42), run(42));
}
