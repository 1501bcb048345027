//! Expedition runs: pick order lines from ground-floor racks and deliver
//! them to the expedition zone.
//!
//! Missing stock does not fail an order. Each line records what it could
//! collect and the run still ends at the expedition zone.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Lookup, PlanError};
use crate::grid::{Coord, Grid, WalkPolicy};
use crate::path::Path;
use crate::picking::Stop;
use crate::search::{self, SearchOptions};
use crate::traits::{Id, Traversal};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpeditionOptions {
    pub search: SearchOptions,
    pub ground_floor: i32,
}

impl Default for ExpeditionOptions {
    fn default() -> Self {
        Self {
            search: SearchOptions::with_walk(WalkPolicy::expedition()),
            ground_floor: 0,
        }
    }
}

/// One product line of a customer order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: String,
    pub quantity: u32,
}

impl OrderLine {
    pub fn new(product_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// What was collected for one order line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinePick {
    pub product_id: String,
    pub requested: u32,
    pub collected: u32,
    pub stops: Vec<Stop>,
}

impl LinePick {
    pub fn shortfall(&self) -> u32 {
        self.requested - self.collected
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpeditionPlan {
    pub lines: Vec<LinePick>,
    /// Expedition cell the run ends at.
    pub zone: Coord,
    pub path_to_zone: Path,
    pub total_cost: f64,
}

impl ExpeditionPlan {
    /// Every line fully collected.
    pub fn is_complete(&self) -> bool {
        self.lines.iter().all(|line| line.shortfall() == 0)
    }

    pub fn stop_count(&self) -> usize {
        self.lines.iter().map(|line| line.stops.len()).sum()
    }
}

impl Traversal for ExpeditionPlan {
    fn footprint(&self) -> BTreeSet<Coord> {
        self.lines
            .iter()
            .flat_map(|line| line.stops.iter())
            .flat_map(|stop| stop.path.points().iter().copied())
            .chain(self.path_to_zone.points().iter().copied())
            .collect()
    }
}

/// Plans one delivery run.
///
/// Starts at `start`, or at the first expedition cell when `None`.
pub fn plan_expedition(
    grid: &Grid,
    lines: &[OrderLine],
    start: Option<Coord>,
    options: &ExpeditionOptions,
) -> Result<ExpeditionPlan, PlanError> {
    let ground = options.ground_floor;
    let zones: Vec<Coord> = grid
        .expedition_zones(ground)
        .into_iter()
        .map(|cell| cell.coord)
        .collect();
    let Some(&first_zone) = zones.first() else {
        return Err(PlanError::NotFound(Lookup::ExpeditionZone { floor: ground }));
    };

    let mut current = match start {
        Some(coord) => grid.require(coord)?.coord,
        None => first_zone,
    };
    let mut drawn: HashMap<Coord, u32> = HashMap::new();
    let mut picks = Vec::with_capacity(lines.len());
    let mut total_cost = 0.0;

    for line in lines {
        let mut remaining = line.quantity;
        let mut stops = Vec::new();
        let mut racks: Vec<Coord> = grid
            .cells_on(ground)
            .filter(|cell| cell.holds(&line.product_id))
            .map(|cell| cell.coord)
            .collect();

        if racks.is_empty() {
            warn!(product_id = %line.product_id, "product not found in any rack");
        }

        while remaining > 0 {
            racks.retain(|rack| available(grid, &drawn, *rack) > 0);
            let Some((rack, path)) = search::nearest(grid, current, &racks, &options.search)? else {
                break;
            };

            let taken = available(grid, &drawn, rack).min(remaining);
            remaining -= taken;
            *drawn.entry(rack).or_default() += taken;
            total_cost += path.cost();
            debug!(product_id = %line.product_id, %rack, taken, remaining, "expedition stop");

            let level = grid.cell(rack).map_or(0, |cell| cell.z);
            stops.push(Stop {
                slot: rack,
                level,
                taken,
                remaining,
                path,
            });
            current = rack;
        }

        if remaining > 0 {
            warn!(product_id = %line.product_id, remaining, "order line short");
        }
        picks.push(LinePick {
            product_id: line.product_id.clone(),
            requested: line.quantity,
            collected: line.quantity - remaining,
            stops,
        });
    }

    let Some((zone, path_to_zone)) = search::nearest(grid, current, &zones, &options.search)? else {
        return Err(PlanError::NoPath {
            from: current,
            to: first_zone,
        });
    };
    total_cost += path_to_zone.cost();

    let plan = ExpeditionPlan {
        lines: picks,
        zone,
        path_to_zone,
        total_cost,
    };
    info!(
        stops = plan.stop_count(),
        complete = plan.is_complete(),
        total_cost,
        "expedition run"
    );
    Ok(plan)
}

/// Units left in `rack` after what this run already drew from it.
fn available(grid: &Grid, drawn: &HashMap<Coord, u32>, rack: Coord) -> u32 {
    let stocked = grid.cell(rack).map_or(0, |cell| cell.quantity);
    stocked.saturating_sub(drawn.get(&rack).copied().unwrap_or(0))
}

/// One customer order in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpeditionOrder<I> {
    pub id: I,
    pub lines: Vec<OrderLine>,
}

#[derive(Debug, Clone)]
pub struct BatchExpeditions<I: Ord> {
    pub plans: BTreeMap<I, ExpeditionPlan>,
    pub failures: BTreeMap<I, PlanError>,
}

impl<I: Ord> BatchExpeditions<I> {
    pub fn total_cost(&self) -> f64 {
        self.plans.values().map(|plan| plan.total_cost).sum()
    }
}

/// Plans independent orders in parallel, one worker per order, each from
/// the expedition zone.
pub fn plan_expeditions<I>(
    grid: &Grid,
    orders: &[ExpeditionOrder<I>],
    options: &ExpeditionOptions,
) -> BatchExpeditions<I>
where
    I: Id + Ord + Send + Sync,
{
    let outcomes: Vec<(I, Result<ExpeditionPlan, PlanError>)> = orders
        .par_iter()
        .map(|order| {
            (
                order.id.clone(),
                plan_expedition(grid, &order.lines, None, options),
            )
        })
        .collect();

    let mut batch = BatchExpeditions {
        plans: BTreeMap::new(),
        failures: BTreeMap::new(),
    };
    for (id, outcome) in outcomes {
        match outcome {
            Ok(plan) => {
                batch.plans.insert(id, plan);
            }
            Err(err) => {
                warn!(error = %err, "expedition order failed");
                batch.failures.insert(id, err);
            }
        }
    }
    batch
}
