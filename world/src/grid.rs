//! Walkability storage backing the authoritative world.

use curfew_core::{CellCoord, GridConfigError, GridDescriptor, GridView, PlanningView};
use glam::Vec2;

/// Dense per-cell passability and road flags plus the planning mesh.
///
/// The live buffers reflect scenery mutations immediately. The planning
/// mesh is captured once at configuration time and handed to the path
/// planner unchanged for the rest of the session; movement re-validates
/// against the live buffers instead.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct WalkGrid {
    columns: u32,
    rows: u32,
    tile_length: f32,
    walkable: Vec<bool>,
    road: Vec<bool>,
    planning_mesh: Vec<bool>,
}

impl WalkGrid {
    /// Builds a grid from a validated descriptor.
    pub(crate) fn from_descriptor(descriptor: &GridDescriptor) -> Result<Self, GridConfigError> {
        if descriptor.tile_length <= 0.0 {
            return Err(GridConfigError::InvalidTileLength);
        }

        let cell_count_u64 = u64::from(descriptor.columns) * u64::from(descriptor.rows);
        let cell_count = usize::try_from(cell_count_u64).unwrap_or(usize::MAX);
        if descriptor.walkable.len() != cell_count || descriptor.road.len() != cell_count {
            return Err(GridConfigError::CellCountMismatch);
        }

        Ok(Self {
            columns: descriptor.columns,
            rows: descriptor.rows,
            tile_length: descriptor.tile_length,
            walkable: descriptor.walkable.clone(),
            road: descriptor.road.clone(),
            planning_mesh: descriptor.walkable.clone(),
        })
    }

    pub(crate) fn view(&self) -> GridView<'_> {
        GridView::new(
            &self.walkable,
            &self.road,
            self.columns,
            self.rows,
            self.tile_length,
        )
    }

    pub(crate) fn planning_view(&self) -> PlanningView<'_> {
        PlanningView::new(&self.planning_mesh, self.columns, self.rows)
    }

    pub(crate) fn set_walkable(&mut self, cell: CellCoord, walkable: bool) {
        if let Some(index) = self.index(cell) {
            if let Some(slot) = self.walkable.get_mut(index) {
                *slot = walkable;
            }
        }
    }

    pub(crate) fn is_walkable(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .and_then(|index| self.walkable.get(index).copied())
            .unwrap_or(false)
    }

    pub(crate) fn has_road(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .and_then(|index| self.road.get(index).copied())
            .unwrap_or(false)
    }

    pub(crate) fn world_to_cell(&self, position: Vec2) -> Option<CellCoord> {
        self.view().world_to_cell(position)
    }

    pub(crate) fn cell_center(&self, cell: CellCoord) -> Vec2 {
        self.view().cell_center(cell)
    }

    /// Finds the closest road cell to `from` within `max_radius` rings.
    ///
    /// The search expands ring by ring so the first hit is the nearest by
    /// Chebyshev distance; ties resolve in row-major order for determinism.
    pub(crate) fn nearest_road_cell(&self, from: CellCoord, max_radius: u32) -> Option<CellCoord> {
        for radius in 0..=max_radius {
            let mut found: Option<CellCoord> = None;
            for_each_ring_cell(from, radius, self.columns, self.rows, |cell| {
                if found.is_none() && self.is_walkable(cell) && self.has_road(cell) {
                    found = Some(cell);
                }
            });
            if found.is_some() {
                return found;
            }
        }
        None
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() >= self.columns || cell.row() >= self.rows {
            return None;
        }

        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}

/// Visits every in-bounds cell at exactly `radius` Chebyshev distance from
/// `center`, in row-major order.
fn for_each_ring_cell<F>(center: CellCoord, radius: u32, columns: u32, rows: u32, mut visit: F)
where
    F: FnMut(CellCoord),
{
    let radius = i64::from(radius);
    let center_column = i64::from(center.column());
    let center_row = i64::from(center.row());

    for row_offset in -radius..=radius {
        for column_offset in -radius..=radius {
            if row_offset.abs() != radius && column_offset.abs() != radius {
                continue;
            }

            let column = center_column + column_offset;
            let row = center_row + row_offset;
            if column < 0 || row < 0 || column >= i64::from(columns) || row >= i64::from(rows) {
                continue;
            }

            visit(CellCoord::new(column as u32, row as u32));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn rejects_mismatched_cell_buffers() {
        let mut descriptor = open_descriptor(3, 3);
        let _ = descriptor.walkable.pop();
        assert_eq!(
            WalkGrid::from_descriptor(&descriptor),
            Err(GridConfigError::CellCountMismatch)
        );
    }

    #[test]
    fn rejects_non_positive_tile_length() {
        let mut descriptor = open_descriptor(2, 2);
        descriptor.tile_length = 0.0;
        assert_eq!(
            WalkGrid::from_descriptor(&descriptor),
            Err(GridConfigError::InvalidTileLength)
        );
    }

    #[test]
    fn planning_mesh_ignores_live_mutations() {
        let descriptor = open_descriptor(3, 3);
        let mut grid = WalkGrid::from_descriptor(&descriptor).expect("grid");
        let cell = CellCoord::new(1, 1);

        grid.set_walkable(cell, false);

        assert!(!grid.is_walkable(cell));
        assert!(grid.planning_view().is_walkable(cell));
    }

    #[test]
    fn nearest_road_cell_prefers_inner_rings() {
        let mut descriptor = open_descriptor(5, 5);
        for flag in descriptor.road.iter_mut() {
            *flag = false;
        }
        // Road at distance 1 and distance 2; the closer one must win.
        descriptor.road[1 * 5 + 3] = true;
        descriptor.road[0 * 5 + 4] = true;
        let grid = WalkGrid::from_descriptor(&descriptor).expect("grid");

        assert_eq!(
            grid.nearest_road_cell(CellCoord::new(2, 1), 4),
            Some(CellCoord::new(3, 1))
        );
    }

    #[test]
    fn nearest_road_cell_gives_up_outside_radius() {
        let mut descriptor = open_descriptor(5, 5);
        for flag in descriptor.road.iter_mut() {
            *flag = false;
        }
        let grid = WalkGrid::from_descriptor(&descriptor).expect("grid");

        assert_eq!(grid.nearest_road_cell(CellCoord::new(2, 2), 4), None);
    }
}
