//! Picking planner: collect a product quantity from storage slots.
//!
//! A single slot that covers the whole quantity always wins when it can be
//! walked to, whether or not an elevator is reachable from it. Otherwise stops
//! are chosen greedily, staying on the current floor as long as it has
//! reachable stock, and consecutive same-floor stops share one elevator exit.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::congestion::{self, CongestionReport};
use crate::error::{Lookup, PlanError};
use crate::grid::{Cell, Coord, Grid, WalkPolicy};
use crate::path::Path;
use crate::search::{self, SearchOptions};
use crate::traits::{Id, Traversal};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickOptions {
    pub search: SearchOptions,
}

impl Default for PickOptions {
    fn default() -> Self {
        Self {
            search: SearchOptions::with_walk(WalkPolicy::picking()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PickMode {
    /// One slot covers the whole quantity.
    Single,
    /// Several slots, grouped by floor.
    Multi,
}

/// One visit to a slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stop {
    pub slot: Coord,
    /// Shelf level of the slot.
    pub level: i32,
    pub taken: u32,
    /// Units still needed after this stop.
    pub remaining: u32,
    pub path: Path,
}

impl Stop {
    pub fn cost(&self) -> f64 {
        self.path.cost()
    }
}

/// Walk from a floor group's last stop to the nearest elevator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElevatorExit {
    pub elevator: Coord,
    pub path: Path,
}

/// Consecutive stops on one floor, left through one elevator trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloorGroup {
    pub floor: i32,
    pub stops: Vec<Stop>,
    /// `None` when no elevator on the floor is reachable from the last stop.
    pub exit: Option<ElevatorExit>,
}

impl FloorGroup {
    pub fn exit_cost(&self) -> f64 {
        self.exit.as_ref().map_or(0.0, |exit| exit.path.cost())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub product_id: String,
    pub requested: u32,
    pub mode: PickMode,
    pub groups: Vec<FloorGroup>,
    pub total_cost: f64,
}

impl Route {
    pub fn stops(&self) -> impl Iterator<Item = &Stop> {
        self.groups.iter().flat_map(|group| group.stops.iter())
    }

    pub fn stop_count(&self) -> usize {
        self.groups.iter().map(|group| group.stops.len()).sum()
    }

    pub fn total_taken(&self) -> u32 {
        self.stops().map(|stop| stop.taken).sum()
    }

    /// Removes the picked units from the grid.
    ///
    /// Every stop is checked before anything is written, so a failure leaves
    /// the grid untouched.
    pub fn commit(&self, grid: &mut Grid) -> Result<(), PlanError> {
        let mut needed: BTreeMap<Coord, u32> = BTreeMap::new();
        for stop in self.stops() {
            *needed.entry(stop.slot).or_default() += stop.taken;
        }
        for (&slot, &taken) in &needed {
            let cell = grid.require(slot)?;
            if !cell.holds(&self.product_id) || cell.quantity < taken {
                return Err(PlanError::InsufficientStock {
                    product_id: self.product_id.clone(),
                    requested: taken,
                    available: if cell.holds(&self.product_id) { cell.quantity } else { 0 },
                });
            }
        }
        for (slot, taken) in needed {
            grid.take(slot, taken)?;
        }
        Ok(())
    }
}

impl Traversal for Route {
    fn footprint(&self) -> BTreeSet<Coord> {
        let mut cells = BTreeSet::new();
        for group in &self.groups {
            for stop in &group.stops {
                cells.extend(stop.path.points().iter().copied());
            }
            if let Some(exit) = &group.exit {
                cells.extend(exit.path.points().iter().copied());
            }
        }
        cells
    }
}

/// Plans how to pick `quantity` units of `product_id` starting at `start`.
pub fn plan_route(
    grid: &Grid,
    product_id: &str,
    quantity: u32,
    start: Coord,
    options: &PickOptions,
) -> Result<Route, PlanError> {
    if quantity == 0 {
        return Err(PlanError::InvalidQuantity {
            product_id: product_id.to_string(),
        });
    }
    grid.require(start)?;

    let slots = grid.product_slots(product_id);
    if slots.is_empty() {
        return Err(PlanError::NotFound(Lookup::Product(product_id.to_string())));
    }

    let available: u32 = slots.iter().map(|slot| slot.quantity).sum();
    if available < quantity {
        return Err(PlanError::InsufficientStock {
            product_id: product_id.to_string(),
            requested: quantity,
            available,
        });
    }

    if let Some(route) = single_stop(grid, product_id, quantity, start, &slots, options)? {
        info!(
            product_id,
            slot = %route.groups[0].stops[0].slot,
            total_cost = route.total_cost,
            "single-slot route"
        );
        return Ok(route);
    }

    let stops = multi_stop(grid, product_id, quantity, start, &slots, options)?;
    let groups = group_by_floor(grid, stops, options)?;
    let total_cost = total_cost(&groups);

    let route = Route {
        product_id: product_id.to_string(),
        requested: quantity,
        mode: PickMode::Multi,
        groups,
        total_cost,
    };
    info!(
        product_id,
        stops = route.stop_count(),
        floors = route.groups.len(),
        total_cost,
        "multi-slot route"
    );
    Ok(route)
}

/// Where a walk to `slot` begins: the current position on the same floor,
/// otherwise the canonical elevator of the slot's floor.
fn entry_point(grid: &Grid, current: Coord, slot: Coord) -> Option<Coord> {
    if current.floor == slot.floor {
        Some(current)
    } else {
        grid.canonical_elevator(slot.floor)
    }
}

/// Walk to a slot, `None` when there is no entry point or no route.
fn walk_to(
    grid: &Grid,
    current: Coord,
    slot: Coord,
    options: &PickOptions,
) -> Result<Option<Path>, PlanError> {
    let Some(entry) = entry_point(grid, current, slot) else {
        return Ok(None);
    };
    match search::find_path(grid, entry, slot, &options.search) {
        Ok(path) => Ok(Some(path)),
        Err(PlanError::NoPath { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

fn elevator_exit(
    grid: &Grid,
    from: Coord,
    options: &PickOptions,
) -> Result<Option<ElevatorExit>, PlanError> {
    let found = search::nearest(grid, from, grid.elevators_on(from.floor), &options.search)?;
    Ok(found.map(|(elevator, path)| ElevatorExit { elevator, path }))
}

fn single_stop(
    grid: &Grid,
    product_id: &str,
    quantity: u32,
    start: Coord,
    slots: &[&Cell],
    options: &PickOptions,
) -> Result<Option<Route>, PlanError> {
    let mut best: Option<(f64, &Cell, Path, Option<ElevatorExit>)> = None;

    for &slot in slots.iter().filter(|slot| slot.quantity >= quantity) {
        let Some(path) = walk_to(grid, start, slot.coord, options)? else {
            debug!(slot = %slot.coord, "single-slot candidate unreachable");
            continue;
        };
        // A slot with no reachable elevator is still picked; the exit costs 0.
        let exit = elevator_exit(grid, slot.coord, options)?;
        if exit.is_none() {
            warn!(product_id, slot = %slot.coord, "no elevator reachable from slot");
        }

        let total = path.cost() + exit.as_ref().map_or(0.0, |exit| exit.path.cost());
        if best.as_ref().is_none_or(|(cost, ..)| total < *cost) {
            best = Some((total, slot, path, exit));
        }
    }

    Ok(best.map(|(total_cost, slot, path, exit)| Route {
        product_id: product_id.to_string(),
        requested: quantity,
        mode: PickMode::Single,
        groups: vec![FloorGroup {
            floor: slot.coord.floor,
            stops: vec![Stop {
                slot: slot.coord,
                level: slot.z,
                taken: quantity,
                remaining: 0,
                path,
            }],
            exit,
        }],
        total_cost,
    }))
}

fn multi_stop(
    grid: &Grid,
    product_id: &str,
    quantity: u32,
    start: Coord,
    slots: &[&Cell],
    options: &PickOptions,
) -> Result<Vec<Stop>, PlanError> {
    let mut remaining = quantity;
    let mut current = start;
    let mut visited: HashSet<Coord> = HashSet::new();
    let mut stops = Vec::new();

    while remaining > 0 {
        let mut best: Option<((i32, f64), &Cell, Path)> = None;

        for &slot in slots.iter().filter(|slot| !visited.contains(&slot.coord)) {
            let Some(path) = walk_to(grid, current, slot.coord, options)? else {
                continue;
            };
            let key = ((slot.coord.floor - current.floor).abs(), path.cost());
            let better = match &best {
                None => true,
                Some(((floors, cost), ..)) => {
                    key.0 < *floors || (key.0 == *floors && key.1 < *cost)
                }
            };
            if better {
                best = Some((key, slot, path));
            }
        }

        let Some((_, slot, path)) = best else {
            warn!(product_id, remaining, "no reachable slot left");
            return Err(PlanError::Unreachable {
                product_id: product_id.to_string(),
                picked: quantity - remaining,
                remaining,
            });
        };

        let taken = slot.quantity.min(remaining);
        remaining -= taken;
        visited.insert(slot.coord);
        debug!(slot = %slot.coord, taken, remaining, "pick stop");

        stops.push(Stop {
            slot: slot.coord,
            level: slot.z,
            taken,
            remaining,
            path,
        });
        current = slot.coord;
    }

    Ok(stops)
}

fn group_by_floor(
    grid: &Grid,
    stops: Vec<Stop>,
    options: &PickOptions,
) -> Result<Vec<FloorGroup>, PlanError> {
    let mut groups: Vec<FloorGroup> = Vec::new();
    for stop in stops {
        match groups.last_mut() {
            Some(group) if group.floor == stop.slot.floor => group.stops.push(stop),
            _ => groups.push(FloorGroup {
                floor: stop.slot.floor,
                stops: vec![stop],
                exit: None,
            }),
        }
    }

    for group in &mut groups {
        if let Some(last) = group.stops.last() {
            group.exit = elevator_exit(grid, last.slot, options)?;
            if group.exit.is_none() {
                warn!(floor = group.floor, slot = %last.slot, "no elevator reachable from floor group");
            }
        }
    }
    Ok(groups)
}

fn total_cost(groups: &[FloorGroup]) -> f64 {
    let picking: f64 = groups
        .iter()
        .flat_map(|group| group.stops.iter())
        .map(Stop::cost)
        .sum();
    let exits: f64 = groups.iter().map(FloorGroup::exit_cost).sum();
    picking + exits
}

/// One cart's picking job in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickRequest<I> {
    pub id: I,
    pub product_id: String,
    pub quantity: u32,
}

impl<I> PickRequest<I> {
    pub fn new(id: I, product_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            id,
            product_id: product_id.into(),
            quantity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchRoutes<I: Ord> {
    pub routes: BTreeMap<I, Route>,
    pub failures: BTreeMap<I, PlanError>,
}

impl<I: Id + Ord> BatchRoutes<I> {
    /// Overlapping cells between the planned routes.
    pub fn congestion(&self) -> CongestionReport<I> {
        congestion::detect(&self.routes)
    }
}

/// Plans independent picking jobs in parallel against the same grid.
///
/// Jobs do not see each other's picks; failures are recorded per job.
pub fn plan_routes<I>(
    grid: &Grid,
    requests: &[PickRequest<I>],
    start: Coord,
    options: &PickOptions,
) -> BatchRoutes<I>
where
    I: Id + Ord + Send + Sync,
{
    let outcomes: Vec<(I, Result<Route, PlanError>)> = requests
        .par_iter()
        .map(|request| {
            let outcome = plan_route(grid, &request.product_id, request.quantity, start, options);
            (request.id.clone(), outcome)
        })
        .collect();

    let mut batch = BatchRoutes {
        routes: BTreeMap::new(),
        failures: BTreeMap::new(),
    };
    for (id, outcome) in outcomes {
        match outcome {
            Ok(route) => {
                batch.routes.insert(id, route);
            }
            Err(err) => {
                warn!(error = %err, "picking request failed");
                batch.failures.insert(id, err);
            }
        }
    }
    batch
}
