//! Core seams for the warehouse planner.
//!
//! These are intentionally minimal. Callers can plug their own identifiers,
//! walkability rules and plan types into the search and congestion code.

use std::collections::BTreeSet;
use std::hash::Hash;

use crate::grid::{Cell, Coord};

/// Unique identifier for planner entities (carts, orders, pickers).
pub trait Id: Clone + Eq + Hash {}

impl<T> Id for T where T: Clone + Eq + Hash {}

/// Decides whether a cell may be traversed by a search.
///
/// Implemented by [`crate::grid::WalkPolicy`] and by any `Fn(&Cell) -> bool`.
pub trait Walkability {
    fn is_walkable(&self, cell: &Cell) -> bool;
}

impl<F> Walkability for F
where
    F: Fn(&Cell) -> bool,
{
    fn is_walkable(&self, cell: &Cell) -> bool {
        self(cell)
    }
}

/// A plan that moves something across the grid.
pub trait Traversal {
    /// Every coordinate touched by the plan, pick paths and exit paths alike.
    fn footprint(&self) -> BTreeSet<Coord>;
}
