//! Grid snapshot records and loading.
//!
//! A snapshot is the layout handed to the planner by whatever owns the
//! warehouse data. It is validated once, when the [`Grid`] is built.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SnapshotError;
use crate::grid::{Cell, Coord, Grid};

/// One cell as it appears in a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellRecord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub floor: i32,
    pub is_obstacle: bool,
    pub is_road: bool,
    pub is_slot: bool,
    pub is_elevator: bool,
    pub is_expedition_zone: bool,
    pub product_id: Option<String>,
    pub quantity: u32,
    pub is_occupied: bool,
}

impl CellRecord {
    pub fn coord(&self) -> Coord {
        Coord::new(self.x, self.y, self.floor)
    }
}

/// Designates a floor's canonical elevator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElevatorRecord {
    pub x: i32,
    pub y: i32,
    pub floor: i32,
}

/// Full warehouse layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSnapshot {
    pub width: i32,
    pub height: i32,
    pub cells: Vec<CellRecord>,
    pub elevators: Vec<ElevatorRecord>,
}

impl GridSnapshot {
    pub fn from_json_str(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    /// Combines two snapshots, e.g. storage floors with the ground floor.
    ///
    /// Dimensions take the larger of both; duplicate cells are left for
    /// validation to reject.
    pub fn merge(mut self, other: GridSnapshot) -> Self {
        self.width = self.width.max(other.width);
        self.height = self.height.max(other.height);
        self.cells.extend(other.cells);
        self.elevators.extend(other.elevators);
        self
    }
}

impl Grid {
    /// Builds and validates a grid.
    ///
    /// Rejects duplicate coordinates, cells outside `width` x `height`,
    /// elevators with no counterpart on another floor (multi-floor grids
    /// only) and canonical elevators that do not point at an elevator cell.
    pub fn from_snapshot(snapshot: GridSnapshot) -> Result<Self, SnapshotError> {
        let GridSnapshot {
            width,
            height,
            cells: records,
            elevators,
        } = snapshot;

        let mut cells = BTreeMap::new();
        for record in records {
            let coord = record.coord();
            if coord.x < 0 || coord.y < 0 || coord.x >= width || coord.y >= height {
                return Err(SnapshotError::OutOfBounds {
                    coord,
                    width,
                    height,
                });
            }
            if cells.contains_key(&coord) {
                return Err(SnapshotError::DuplicateCell(coord));
            }
            cells.insert(coord, cell_from(record));
        }

        check_elevator_pairs(&cells)?;

        let mut designated = Vec::with_capacity(elevators.len());
        for record in elevators {
            let coord = Coord::new(record.x, record.y, record.floor);
            match cells.get(&coord) {
                Some(cell) if cell.is_elevator => designated.push(coord),
                _ => return Err(SnapshotError::CanonicalElevatorMissing(coord)),
            }
        }

        debug!(cells = cells.len(), width, height, "grid loaded");
        Ok(Grid::assemble(width, height, cells, &designated))
    }
}

fn cell_from(record: CellRecord) -> Cell {
    let mut cell = Cell::new(record.coord());
    cell.z = record.z;
    cell.is_obstacle = record.is_obstacle;
    cell.is_road = record.is_road;
    cell.is_slot = record.is_slot;
    cell.is_elevator = record.is_elevator;
    cell.is_expedition_zone = record.is_expedition_zone;
    cell.product_id = record.product_id;
    cell.quantity = record.quantity;
    cell.occupied = record.is_occupied || record.quantity > 0;
    cell
}

fn check_elevator_pairs(cells: &BTreeMap<Coord, Cell>) -> Result<(), SnapshotError> {
    let floors: BTreeSet<i32> = cells.keys().map(|coord| coord.floor).collect();
    if floors.len() < 2 {
        return Ok(());
    }

    let mut shafts: BTreeMap<(i32, i32), Vec<Coord>> = BTreeMap::new();
    for cell in cells.values().filter(|cell| cell.is_elevator) {
        shafts
            .entry((cell.coord.x, cell.coord.y))
            .or_default()
            .push(cell.coord);
    }

    match shafts.values().find(|stops| stops.len() < 2) {
        Some(lonely) => Err(SnapshotError::UnpairedElevator(lonely[0])),
        None => Ok(()),
    }
}
