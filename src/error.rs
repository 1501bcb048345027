//! Error types for planning and snapshot loading.

use std::fmt;

use thiserror::Error;

use crate::grid::Coord;

/// What a failed lookup was looking for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Cell(Coord),
    Product(String),
    Elevator { floor: i32 },
    ExpeditionZone { floor: i32 },
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Cell(coord) => write!(f, "cell {}", coord),
            Lookup::Product(id) => write!(f, "product '{}'", id),
            Lookup::Elevator { floor } => write!(f, "elevator on floor {}", floor),
            Lookup::ExpeditionZone { floor } => write!(f, "expedition zone on floor {}", floor),
        }
    }
}

/// Expected, recoverable planning failures.
///
/// Batch operations record these per item and keep going.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("not found: {0}")]
    NotFound(Lookup),

    #[error("only {available} of product '{product_id}' available, {requested} requested")]
    InsufficientStock {
        product_id: String,
        requested: u32,
        available: u32,
    },

    #[error("cannot reach more slots for product '{product_id}': picked {picked}, still need {remaining}")]
    Unreachable {
        product_id: String,
        picked: u32,
        remaining: u32,
    },

    #[error("no path from {from} to {to}")]
    NoPath { from: Coord, to: Coord },

    #[error("no available slots for product '{product_id}'")]
    NoAvailableSlots { product_id: String },

    #[error("requested quantity for product '{product_id}' must be positive")]
    InvalidQuantity { product_id: String },
}

/// Structural problems in a grid snapshot, reported at load time.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("duplicate cell at {0}")]
    DuplicateCell(Coord),

    #[error("cell {coord} lies outside the {width}x{height} grid")]
    OutOfBounds { coord: Coord, width: i32, height: i32 },

    #[error("elevator at {0} has no counterpart on another floor")]
    UnpairedElevator(Coord),

    #[error("canonical elevator {0} is not an elevator cell")]
    CanonicalElevatorMissing(Coord),

    #[error("invalid snapshot json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot read snapshot: {0}")]
    Io(#[from] std::io::Error),
}
