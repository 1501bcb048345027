//! Warehouse layouts shared by the integration tests.
//!
//! Two storage floors above a ground floor. Every floor has elevators at
//! (0, 0) and (0, 4); the ground floor holds 4-level picking racks and an
//! expedition strip along the bottom row.

use warehouse_planner::grid::Grid;

use super::{GridBuilder, at};

/// Storage floor: two rack blocks per aisle pair.
pub const STORAGE: &[&str] = &[
    "E.........",
    ".SS..SS...",
    "..........",
    ".SS..SS...",
    "E.........",
];

/// Ground floor: racks with shelf levels 0-3, expedition zone at y = 4.
pub const GROUND: &[&str] = &[
    "E.........",
    ".0123.0123",
    "..........",
    ".3210.3210",
    "E...XXXX..",
];

/// Empty three-floor warehouse.
pub fn warehouse() -> GridBuilder {
    GridBuilder::new()
        .floor(0, GROUND)
        .floor(1, STORAGE)
        .floor(2, STORAGE)
}

/// Warehouse with three products spread over the storage floors.
///
/// - "31798": 120 at (1, 1, 1), 100 at (6, 3, 2)
/// - "31858": 60 at (5, 1, 1)
/// - "31860": 10 at (2, 1, 1), 15 at (1, 3, 1), 20 at (2, 3, 2)
pub fn stocked_warehouse() -> Grid {
    warehouse()
        .stock(at(1, 1, 1), "31798", 120)
        .stock(at(6, 3, 2), "31798", 100)
        .stock(at(5, 1, 1), "31858", 60)
        .stock(at(2, 1, 1), "31860", 10)
        .stock(at(1, 3, 1), "31860", 15)
        .stock(at(2, 3, 2), "31860", 20)
        .build()
}
