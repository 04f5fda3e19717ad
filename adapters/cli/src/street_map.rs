//! ASCII street-map loader for the headless runner.
//!
//! Glyphs: `#` wall, `.` open ground, `=` road, `P` pursuer spawn,
//! `V` vehicle spawn (on road), `T` target start. Spawn glyphs count as
//! the terrain they stand on.

use curfew_core::{Direction, GridDescriptor};
use glam::Vec2;
use thiserror::Error;

/// Built-in map: a road ring around an open plaza, four pursuers, two
/// vehicles, and the target in the middle.
pub(crate) const DEFAULT_MAP: &str = "\
################
#..............#
#.==========V=.#
#.=..........=.#
#.=..P....P..=.#
#.=....T.....=.#
#.=..........=.#
#.=..P....P..=.#
#.=..........=.#
#.=V==========.#
#..............#
################
";

/// Errors produced while parsing an ASCII street map.
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum StreetMapError {
    /// The map contained no rows.
    #[error("the street map is empty")]
    Empty,
    /// A row's width disagreed with the first row.
    #[error("line {line} is {actual} cells wide, expected {expected}")]
    RaggedLine {
        /// One-based line number of the offending row.
        line: usize,
        /// Width found on the offending row.
        actual: usize,
        /// Width established by the first row.
        expected: usize,
    },
    /// The map used a glyph outside the supported alphabet.
    #[error("unknown map glyph '{glyph}' on line {line}")]
    UnknownGlyph {
        /// The unsupported character.
        glyph: char,
        /// One-based line number the glyph appeared on.
        line: usize,
    },
    /// The map never placed the target marker.
    #[error("the street map does not place the target ('T')")]
    MissingTarget,
}

/// Parsed street map: the grid descriptor plus every spawn marker.
#[derive(Clone, Debug)]
pub(crate) struct StreetMap {
    pub(crate) descriptor: GridDescriptor,
    pub(crate) pursuer_spawns: Vec<Vec2>,
    pub(crate) vehicle_spawns: Vec<(Vec2, Direction)>,
    pub(crate) target_start: Vec2,
}

/// Parses an ASCII street map into a grid descriptor and spawn markers.
pub(crate) fn parse(text: &str, tile_length: f32) -> Result<StreetMap, StreetMapError> {
    let lines: Vec<&str> = text.lines().filter(|line| !line.is_empty()).collect();
    if lines.is_empty() {
        return Err(StreetMapError::Empty);
    }

    let columns = lines[0].chars().count();
    let rows = lines.len();
    let mut walkable = Vec::with_capacity(columns * rows);
    let mut road = Vec::with_capacity(columns * rows);
    let mut pursuer_spawns = Vec::new();
    let mut vehicle_spawns = Vec::new();
    let mut target_start = None;

    for (row, line) in lines.iter().enumerate() {
        let width = line.chars().count();
        if width != columns {
            return Err(StreetMapError::RaggedLine {
                line: row + 1,
                actual: width,
                expected: columns,
            });
        }

        for (column, glyph) in line.chars().enumerate() {
            let center = Vec2::new(
                (column as f32 + 0.5) * tile_length,
                (row as f32 + 0.5) * tile_length,
            );
            let (cell_walkable, cell_road) = match glyph {
                '#' => (false, false),
                '.' => (true, false),
                '=' => (true, true),
                'P' => {
                    pursuer_spawns.push(center);
                    (true, false)
                }
                'V' => {
                    vehicle_spawns.push((center, Direction::East));
                    (true, true)
                }
                'T' => {
                    target_start = Some(center);
                    (true, false)
                }
                other => {
                    return Err(StreetMapError::UnknownGlyph {
                        glyph: other,
                        line: row + 1,
                    })
                }
            };
            walkable.push(cell_walkable);
            road.push(cell_road);
        }
    }

    let target_start = target_start.ok_or(StreetMapError::MissingTarget)?;

    Ok(StreetMap {
        descriptor: GridDescriptor {
            columns: columns as u32,
            rows: rows as u32,
            tile_length,
            walkable,
            road,
        },
        pursuer_spawns,
        vehicle_spawns,
        target_start,
    })
}
