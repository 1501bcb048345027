//! Test fixtures for warehouse-planner.
//!
//! Provides:
//! - an ASCII-map grid builder
//! - ready-made warehouse layouts
//! - a seeded generator for random maps
//! - a tracing subscriber for test output

#![allow(dead_code)]

pub mod layouts;

pub use layouts::*;

use tracing_subscriber::EnvFilter;
use warehouse_planner::Coord;
use warehouse_planner::grid::Grid;
use warehouse_planner::snapshot::{CellRecord, ElevatorRecord, GridSnapshot};

/// Routes planner logs through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

pub fn at(x: i32, y: i32, floor: i32) -> Coord {
    Coord::new(x, y, floor)
}

/// Tiny deterministic generator so random maps are reproducible.
pub struct Lcg(pub u64);

impl Lcg {
    pub fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    /// Uniform-ish value in `0..bound`.
    pub fn below(&mut self, bound: u64) -> u64 {
        self.next() % bound
    }
}

/// Builds grids from ASCII rows, one call per floor.
///
/// `.` road, `#` obstacle, `S` slot, `0`-`9` slot at that shelf level,
/// `E` elevator, `X` expedition zone, space = no cell.
#[derive(Debug, Clone, Default)]
pub struct GridBuilder {
    snapshot: GridSnapshot,
}

impl GridBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn floor(mut self, floor: i32, rows: &[&str]) -> Self {
        for (y, row) in rows.iter().enumerate() {
            self.snapshot.height = self.snapshot.height.max(y as i32 + 1);
            for (x, ch) in row.chars().enumerate() {
                self.snapshot.width = self.snapshot.width.max(x as i32 + 1);
                let mut record = CellRecord {
                    x: x as i32,
                    y: y as i32,
                    floor,
                    ..CellRecord::default()
                };
                match ch {
                    '.' => record.is_road = true,
                    '#' => record.is_obstacle = true,
                    'S' => record.is_slot = true,
                    'E' => record.is_elevator = true,
                    'X' => record.is_expedition_zone = true,
                    '0'..='9' => {
                        record.is_slot = true;
                        record.z = ch as i32 - '0' as i32;
                    }
                    ' ' => continue,
                    other => panic!("unknown map symbol {:?}", other),
                }
                self.snapshot.cells.push(record);
            }
        }
        self
    }

    fn record(&mut self, coord: Coord) -> &mut CellRecord {
        self.snapshot
            .cells
            .iter_mut()
            .find(|record| record.coord() == coord)
            .unwrap_or_else(|| panic!("no cell at {}", coord))
    }

    /// Puts stock into an existing slot.
    pub fn stock(mut self, coord: Coord, product_id: &str, quantity: u32) -> Self {
        let record = self.record(coord);
        assert!(record.is_slot, "{} is not a slot", coord);
        record.product_id = Some(product_id.to_string());
        record.quantity = quantity;
        record.is_occupied = quantity > 0;
        self
    }

    /// Marks a slot occupied without stock details.
    pub fn occupied(mut self, coord: Coord) -> Self {
        self.record(coord).is_occupied = true;
        self
    }

    pub fn canonical_elevator(mut self, coord: Coord) -> Self {
        self.snapshot.elevators.push(ElevatorRecord {
            x: coord.x,
            y: coord.y,
            floor: coord.floor,
        });
        self
    }

    pub fn snapshot(self) -> GridSnapshot {
        self.snapshot
    }

    pub fn build(self) -> Grid {
        Grid::from_snapshot(self.snapshot).expect("fixture grid is valid")
    }
}
