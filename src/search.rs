//! Shortest-path search over the warehouse grid.
//!
//! [`astar`] is the single-floor search every planner builds on; it takes the
//! walkability rule as a parameter instead of hardcoding one. [`find_path`]
//! composes single-floor searches through elevator shafts when start and goal
//! sit on different floors.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cost::{self, CARDINAL_COST, DEFAULT_ELEVATOR_COST, DIAGONAL_COST};
use crate::error::PlanError;
use crate::grid::{Coord, Grid, WalkPolicy};
use crate::path::Path;
use crate::traits::Walkability;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Terrain a search may pass through.
    pub walk: WalkPolicy,
    /// Cost added once per elevator ride.
    pub elevator_cost: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            walk: WalkPolicy::all(),
            elevator_cost: DEFAULT_ELEVATOR_COST,
        }
    }
}

impl SearchOptions {
    pub fn with_walk(walk: WalkPolicy) -> Self {
        Self {
            walk,
            ..Self::default()
        }
    }
}

/// Frontier entry. Lowest `f` first; equal `f` pops in insertion order.
#[derive(Debug, Clone, Copy)]
struct Frontier {
    f: f64,
    seq: u64,
    at: Coord,
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

/// Single-floor A* with the octile heuristic.
///
/// Returns an empty path when the goal cannot be reached (or lies on another
/// floor) and `NotFound` when either endpoint is missing from the grid. The
/// goal may be entered even if `walk` rejects it, as long as it is not an
/// obstacle, so slots can serve as goals without being thoroughfares.
pub fn astar<W>(grid: &Grid, start: Coord, goal: Coord, walk: &W) -> Result<Path, PlanError>
where
    W: Walkability + ?Sized,
{
    grid.require(start)?;
    let goal_cell = grid.require(goal)?;

    if start == goal {
        return Ok(Path::single(start));
    }
    if start.floor != goal.floor {
        return Ok(Path::empty());
    }
    let goal_enterable = !goal_cell.is_obstacle;

    let mut open = BinaryHeap::new();
    let mut seq: u64 = 0;
    let mut g_score: HashMap<Coord, f64> = HashMap::new();
    let mut came_from: HashMap<Coord, Coord> = HashMap::new();
    let mut closed: HashSet<Coord> = HashSet::new();

    g_score.insert(start, 0.0);
    open.push(Frontier {
        f: cost::octile(start, goal),
        seq,
        at: start,
    });

    while let Some(Frontier { at, .. }) = open.pop() {
        if at == goal {
            let total = g_score.get(&goal).copied().unwrap_or_default();
            return Ok(Path::new(reconstruct(&came_from, start, goal), total));
        }
        if !closed.insert(at) {
            continue;
        }

        let g = g_score.get(&at).copied().unwrap_or(f64::INFINITY);
        for (cell, dx, dy) in grid.adjacent(at) {
            let next = cell.coord;
            if closed.contains(&next) {
                continue;
            }
            if !walk.is_walkable(cell) && !(next == goal && goal_enterable) {
                continue;
            }

            let step = if dx != 0 && dy != 0 {
                DIAGONAL_COST
            } else {
                CARDINAL_COST
            };
            let tentative = g + step;
            if tentative < g_score.get(&next).copied().unwrap_or(f64::INFINITY) {
                g_score.insert(next, tentative);
                came_from.insert(next, at);
                seq += 1;
                open.push(Frontier {
                    f: tentative + cost::octile(next, goal),
                    seq,
                    at: next,
                });
            }
        }
    }

    Ok(Path::empty())
}

fn reconstruct(came_from: &HashMap<Coord, Coord>, start: Coord, goal: Coord) -> Vec<Coord> {
    let mut points = vec![goal];
    let mut current = goal;
    while current != start {
        match came_from.get(&current) {
            Some(&previous) => {
                points.push(previous);
                current = previous;
            }
            None => break,
        }
    }
    points.reverse();
    points
}

/// Shortest path between any two cells, riding elevators between floors.
///
/// Across floors, every elevator on the start floor with a matching elevator
/// at the same `x`, `y` on the goal floor is tried; the cheapest
/// `walk + elevator_cost + walk` wins, first shaft in coordinate order on ties.
pub fn find_path(
    grid: &Grid,
    start: Coord,
    goal: Coord,
    options: &SearchOptions,
) -> Result<Path, PlanError> {
    grid.require(start)?;
    grid.require(goal)?;

    if start.floor == goal.floor {
        let path = astar(grid, start, goal, &options.walk)?;
        if path.is_empty() {
            return Err(PlanError::NoPath {
                from: start,
                to: goal,
            });
        }
        return Ok(path);
    }

    let mut best: Option<Path> = None;
    for &departure in grid.elevators_on(start.floor) {
        let arrival = departure.on_floor(goal.floor);
        if !grid.cell(arrival).is_some_and(|cell| cell.is_elevator) {
            continue;
        }

        let to_lift = astar(grid, start, departure, &options.walk)?;
        if to_lift.is_empty() {
            continue;
        }
        let from_lift = astar(grid, arrival, goal, &options.walk)?;
        if from_lift.is_empty() {
            continue;
        }

        let total = to_lift.cost() + options.elevator_cost + from_lift.cost();
        if best.as_ref().is_none_or(|current| total < current.cost()) {
            debug!(%departure, total, "cheaper elevator shaft");
            best = Some(to_lift.chain(from_lift, options.elevator_cost));
        }
    }

    best.ok_or(PlanError::NoPath {
        from: start,
        to: goal,
    })
}

/// Cheapest reachable target from `from`, first in slice order on ties.
///
/// Targets without a route are skipped; `None` when none is reachable.
pub fn nearest(
    grid: &Grid,
    from: Coord,
    targets: &[Coord],
    options: &SearchOptions,
) -> Result<Option<(Coord, Path)>, PlanError> {
    let mut best: Option<(Coord, Path)> = None;
    for &target in targets {
        let path = match find_path(grid, from, target, options) {
            Ok(path) => path,
            Err(PlanError::NoPath { .. }) => continue,
            Err(err) => return Err(err),
        };
        if best
            .as_ref()
            .is_none_or(|(_, current)| path.cost() < current.cost())
        {
            best = Some((target, path));
        }
    }
    Ok(best)
}
