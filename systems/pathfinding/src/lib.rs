#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Grid path planner used by the pursuit scheduler.
//!
//! Plans over the planning mesh captured at configuration time, never the
//! live grid; movement re-validates walkability at move time, so a slightly
//! stale path degrades behavior without ever faulting.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use curfew_core::{CellCoord, PlanningView, TilePath};

/// Ring-search radius used to substitute unwalkable endpoints.
const ENDPOINT_SNAP_RADIUS: u32 = 5;

/// Octile distance factor applied to the diagonal component.
const OCTILE_DIAGONAL: f32 = std::f32::consts::SQRT_2 - 1.0;

/// Plans a path between two cells over the provided planning mesh.
///
/// Both endpoints are substituted with the nearest walkable cell within
/// [`ENDPOINT_SNAP_RADIUS`] rings when blocked. The search expands eight
/// neighbors per cell with uniform step cost, breaks f-score ties toward
/// the lower heuristic, and gives up after `width * height` expansions so
/// unreachable goals terminate. Returns `None` when no path exists; callers
/// hold position or fall back to direct steering.
#[must_use]
pub fn find_path(view: &PlanningView<'_>, from: CellCoord, to: CellCoord) -> Option<TilePath> {
    let (columns, rows) = view.dimensions();
    if columns == 0 || rows == 0 {
        return None;
    }

    let start = nearest_walkable(view, clamp_to_bounds(from, columns, rows))?;
    let goal = nearest_walkable(view, clamp_to_bounds(to, columns, rows))?;

    if start == goal {
        return Some(TilePath::from_cells(vec![start]));
    }

    let cell_count = usize::try_from(u64::from(columns) * u64::from(rows)).ok()?;
    let mut closed = vec![false; cell_count];
    let mut best_g = vec![u32::MAX; cell_count];
    let mut parents = vec![u32::MAX; cell_count];
    let mut open = BinaryHeap::new();

    let start_index = index_of(start, columns);
    best_g[start_index] = 0;
    open.push(OpenNode {
        f: octile(start, goal),
        h: octile(start, goal),
        g: 0,
        cell: start,
    });

    let mut expansions = 0usize;
    while let Some(node) = open.pop() {
        let node_index = index_of(node.cell, columns);
        if closed[node_index] {
            continue;
        }
        closed[node_index] = true;

        if node.cell == goal {
            return Some(reconstruct(&parents, start, goal, columns));
        }

        expansions += 1;
        if expansions > cell_count {
            // Cap reached; the goal is unreachable from here.
            return None;
        }

        for neighbor in eight_neighbors(node.cell, columns, rows) {
            if !view.is_walkable(neighbor) {
                continue;
            }

            let neighbor_index = index_of(neighbor, columns);
            if closed[neighbor_index] {
                continue;
            }

            // Diagonal and orthogonal steps cost the same. The original
            // tuning shipped with this simplification, so it stays.
            let tentative_g = node.g.saturating_add(1);
            if tentative_g >= best_g[neighbor_index] {
                continue;
            }

            best_g[neighbor_index] = tentative_g;
            parents[neighbor_index] = node_index as u32;
            let h = octile(neighbor, goal);
            open.push(OpenNode {
                f: tentative_g as f32 + h,
                h,
                g: tentative_g,
                cell: neighbor,
            });
        }
    }

    None
}

/// Octile distance between two cells: `max + (sqrt(2) - 1) * min`.
#[must_use]
pub fn octile(a: CellCoord, b: CellCoord) -> f32 {
    let dx = a.column().abs_diff(b.column()) as f32;
    let dy = a.row().abs_diff(b.row()) as f32;
    dx.max(dy) + OCTILE_DIAGONAL * dx.min(dy)
}

#[derive(Clone, Copy, Debug)]
struct OpenNode {
    f: f32,
    h: f32,
    g: u32,
    cell: CellCoord,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    /// Reversed so the binary max-heap pops the lowest f-score; equal
    /// f-scores fall to the node with the lower heuristic.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.h.total_cmp(&self.h))
    }
}

fn clamp_to_bounds(cell: CellCoord, columns: u32, rows: u32) -> CellCoord {
    CellCoord::new(
        cell.column().min(columns.saturating_sub(1)),
        cell.row().min(rows.saturating_sub(1)),
    )
}

fn index_of(cell: CellCoord, columns: u32) -> usize {
    cell.row() as usize * columns as usize + cell.column() as usize
}

/// Substitutes a blocked endpoint with the closest walkable cell found by
/// an expanding ring search, in deterministic row-major order per ring.
fn nearest_walkable(view: &PlanningView<'_>, cell: CellCoord) -> Option<CellCoord> {
    if view.is_walkable(cell) {
        return Some(cell);
    }

    let (columns, rows) = view.dimensions();
    for radius in 1..=ENDPOINT_SNAP_RADIUS {
        let radius = i64::from(radius);
        let center_column = i64::from(cell.column());
        let center_row = i64::from(cell.row());

        for row_offset in -radius..=radius {
            for column_offset in -radius..=radius {
                if row_offset.abs() != radius && column_offset.abs() != radius {
                    continue;
                }

                let column = center_column + column_offset;
                let row = center_row + row_offset;
                if column < 0 || row < 0 || column >= i64::from(columns) || row >= i64::from(rows)
                {
                    continue;
                }

                let candidate = CellCoord::new(column as u32, row as u32);
                if view.is_walkable(candidate) {
                    return Some(candidate);
                }
            }
        }
    }

    None
}

fn eight_neighbors(cell: CellCoord, columns: u32, rows: u32) -> impl Iterator<Item = CellCoord> {
    const OFFSETS: [(i64, i64); 8] = [
        (-1, -1),
        (0, -1),
        (1, -1),
        (-1, 0),
        (1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
    ];

    let column = i64::from(cell.column());
    let row = i64::from(cell.row());
    OFFSETS.into_iter().filter_map(move |(dx, dy)| {
        let next_column = column + dx;
        let next_row = row + dy;
        if next_column < 0
            || next_row < 0
            || next_column >= i64::from(columns)
            || next_row >= i64::from(rows)
        {
            None
        } else {
            Some(CellCoord::new(next_column as u32, next_row as u32))
        }
    })
}

fn reconstruct(parents: &[u32], start: CellCoord, goal: CellCoord, columns: u32) -> TilePath {
    let mut cells = vec![goal];
    let mut cursor = index_of(goal, columns);
    let start_index = index_of(start, columns);

    while cursor != start_index {
        let parent = parents[cursor];
        if parent == u32::MAX {
            break;
        }
        cursor = parent as usize;
        let column = (cursor % columns as usize) as u32;
        let row = (cursor / columns as usize) as u32;
        cells.push(CellCoord::new(column, row));
    }

    cells.reverse();
    TilePath::from_cells(cells)
}
