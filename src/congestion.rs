//! Congestion detection between concurrently planned routes.
//!
//! The detector only reports shared cells; deciding who waits is left to the
//! caller.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::grid::Coord;
use crate::traits::{Id, Traversal};

/// Two plans sharing at least one cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict<I> {
    pub first: I,
    pub second: I,
    pub cells: Vec<Coord>,
    pub floors: BTreeSet<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CongestionReport<I: Ord> {
    /// Cells touched by more than one plan, with every plan touching them.
    pub cells: BTreeMap<Coord, BTreeSet<I>>,
}

impl<I: Id + Ord> CongestionReport<I> {
    pub fn is_clear(&self) -> bool {
        self.cells.is_empty()
    }

    /// Plans involved at `coord`, empty when the cell is not contested.
    pub fn involved(&self, coord: Coord) -> Vec<&I> {
        self.cells
            .get(&coord)
            .map(|ids| ids.iter().collect())
            .unwrap_or_default()
    }

    /// Pairwise view of the report, pairs in id order.
    pub fn pairs(&self) -> Vec<Conflict<I>> {
        let mut shared: BTreeMap<(I, I), Vec<Coord>> = BTreeMap::new();
        for (coord, ids) in &self.cells {
            let ids: Vec<&I> = ids.iter().collect();
            for (i, first) in ids.iter().enumerate() {
                for second in &ids[i + 1..] {
                    shared
                        .entry(((*first).clone(), (*second).clone()))
                        .or_default()
                        .push(*coord);
                }
            }
        }

        shared
            .into_iter()
            .map(|((first, second), cells)| Conflict {
                floors: cells.iter().map(|coord| coord.floor).collect(),
                first,
                second,
                cells,
            })
            .collect()
    }
}

/// Finds every cell used by two or more of `plans`.
pub fn detect<I, T>(plans: &BTreeMap<I, T>) -> CongestionReport<I>
where
    I: Id + Ord,
    T: Traversal,
{
    let mut users: BTreeMap<Coord, BTreeSet<I>> = BTreeMap::new();
    for (id, plan) in plans {
        for coord in plan.footprint() {
            users.entry(coord).or_default().insert(id.clone());
        }
    }
    users.retain(|_, ids| ids.len() > 1);

    debug!(plans = plans.len(), contested = users.len(), "congestion check");
    CongestionReport { cells: users }
}
