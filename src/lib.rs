//! warehouse-planner core
//!
//! Pathfinding and allocation for a multi-floor grid warehouse: shortest
//! paths through elevators, picking routes, rack slot assignment,
//! expedition runs and route congestion checks.

pub mod traits;
pub mod error;
pub mod grid;
pub mod snapshot;
pub mod path;
pub mod cost;
pub mod search;
pub mod picking;
pub mod racks;
pub mod expedition;
pub mod congestion;

pub use error::{Lookup, PlanError, SnapshotError};
pub use grid::{Cell, Coord, Grid, WalkPolicy};
pub use path::Path;
