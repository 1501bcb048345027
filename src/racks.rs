//! Rack slot assignment for products arriving on the ground floor.
//!
//! Free ground-floor slots are scored on three signals:
//! - closeness to the expedition zone,
//! - how well the shelf level suits the product weight (heavy goes low),
//! - demand frequency weighted by closeness to expedition.
//!
//! Each assigned slot holds one unit. Batch assignment shares one
//! [`Reservations`] overlay so no slot is handed out twice; nothing reaches
//! the grid until [`BatchPlacement::commit`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cost;
use crate::error::{Lookup, PlanError};
use crate::grid::{Cell, Coord, Grid, Reservations, WalkPolicy};
use crate::path::Path;
use crate::search::{self, SearchOptions};

/// Relative weight of each score component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RackWeights {
    pub distance: f64,
    pub weight: f64,
    pub frequency: f64,
}

impl Default for RackWeights {
    fn default() -> Self {
        Self {
            distance: 0.4,
            weight: 0.3,
            frequency: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RackOptions {
    pub weights: RackWeights,
    /// Weight (kg) at and above which a product counts as fully heavy.
    pub max_weight: f64,
    /// Picks per day at and above which a product counts as top demand.
    pub max_frequency: f64,
    /// Highest shelf level; levels run from 0 (ground) to this.
    pub top_level: i32,
    pub ground_floor: i32,
    pub search: SearchOptions,
}

impl Default for RackOptions {
    fn default() -> Self {
        Self {
            weights: RackWeights::default(),
            max_weight: 100.0,
            max_frequency: 100.0,
            top_level: 3,
            ground_floor: 0,
            search: SearchOptions::with_walk(WalkPolicy::picking()),
        }
    }
}

/// What is known about an incoming product batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    /// Unit weight in kg.
    pub weight: f64,
    /// Picks per day.
    pub frequency: f64,
    /// Slots wanted (one unit per slot).
    pub quantity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub distance_score: f64,
    pub weight_score: f64,
    pub frequency_score: f64,
    pub distance_to_expedition: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    /// 1-based rank among the selected slots.
    pub order: usize,
    pub slot: Coord,
    pub level: i32,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    /// From the reference elevator to the slot.
    pub path: Path,
}

/// Slots chosen for one product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub product_id: String,
    pub requested: u32,
    pub assignments: Vec<Assignment>,
}

impl Placement {
    pub fn assigned(&self) -> usize {
        self.assignments.len()
    }

    /// Fewer slots than requested, which is still a usable result.
    pub fn is_partial(&self) -> bool {
        self.assignments.len() < self.requested as usize
    }

    pub fn total_distance(&self) -> f64 {
        self.assignments.iter().map(|a| a.path.cost()).sum()
    }

    pub fn average_distance(&self) -> f64 {
        if self.assignments.is_empty() {
            0.0
        } else {
            self.total_distance() / self.assignments.len() as f64
        }
    }
}

/// Scores one slot for a product.
///
/// `expedition` must not be empty.
pub fn score_slot(
    slot: &Cell,
    info: &ProductInfo,
    expedition: &[Coord],
    options: &RackOptions,
) -> (f64, ScoreBreakdown) {
    let distance = expedition
        .iter()
        .map(|zone| cost::euclidean_xy(slot.coord, *zone))
        .fold(f64::INFINITY, f64::min);
    let distance_score = 1.0 / (1.0 + distance);

    let top = options.top_level.max(1);
    let heaviness = (info.weight / options.max_weight).clamp(0.0, 1.0);
    let ideal_level = top - (heaviness * top as f64).floor() as i32;
    let weight_score = 1.0 - (slot.z - ideal_level).abs() as f64 / top as f64;

    let demand = (info.frequency / options.max_frequency).clamp(0.0, 1.0);
    let frequency_score = demand / (1.0 + distance);

    let weights = options.weights;
    let score = weights.distance * distance_score
        + weights.weight * weight_score
        + weights.frequency * frequency_score;

    (
        score,
        ScoreBreakdown {
            distance_score,
            weight_score,
            frequency_score,
            distance_to_expedition: distance,
        },
    )
}

/// Picks ground-floor slots for one product, walking in from `elevator`.
pub fn assign(
    grid: &Grid,
    product_id: &str,
    info: &ProductInfo,
    elevator: Coord,
    options: &RackOptions,
) -> Result<Placement, PlanError> {
    assign_with(grid, product_id, info, elevator, &Reservations::new(), options)
}

/// Like [`assign`], treating `reserved` slots as occupied.
pub fn assign_with(
    grid: &Grid,
    product_id: &str,
    info: &ProductInfo,
    elevator: Coord,
    reserved: &Reservations,
    options: &RackOptions,
) -> Result<Placement, PlanError> {
    if info.quantity == 0 {
        return Err(PlanError::InvalidQuantity {
            product_id: product_id.to_string(),
        });
    }

    let ground = options.ground_floor;
    let expedition: Vec<Coord> = grid
        .expedition_zones(ground)
        .into_iter()
        .map(|cell| cell.coord)
        .collect();
    if expedition.is_empty() {
        return Err(PlanError::NotFound(Lookup::ExpeditionZone { floor: ground }));
    }

    let mut scored: Vec<(f64, &Cell, ScoreBreakdown)> = grid
        .cells_on(ground)
        .filter(|cell| cell.is_slot && !cell.is_obstacle && reserved.is_free(cell))
        .map(|cell| {
            let (score, breakdown) = score_slot(cell, info, &expedition, options);
            (score, cell, breakdown)
        })
        .collect();
    if scored.is_empty() {
        return Err(PlanError::NoAvailableSlots {
            product_id: product_id.to_string(),
        });
    }

    // Stable: equal scores keep grid order.
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.truncate(info.quantity as usize);

    grid.require(elevator)?;

    let mut assignments = Vec::with_capacity(scored.len());
    for (rank, (score, cell, breakdown)) in scored.into_iter().enumerate() {
        let path = match search::find_path(grid, elevator, cell.coord, &options.search) {
            Ok(path) => path,
            Err(PlanError::NoPath { .. }) => {
                warn!(product_id, slot = %cell.coord, "slot unreachable from elevator, dropped");
                continue;
            }
            Err(err) => return Err(err),
        };
        debug!(product_id, slot = %cell.coord, score, "slot assigned");
        assignments.push(Assignment {
            order: rank + 1,
            slot: cell.coord,
            level: cell.z,
            score,
            breakdown,
            path,
        });
    }

    if assignments.is_empty() {
        return Err(PlanError::NoAvailableSlots {
            product_id: product_id.to_string(),
        });
    }

    let placement = Placement {
        product_id: product_id.to_string(),
        requested: info.quantity,
        assignments,
    };
    info!(
        product_id,
        requested = placement.requested,
        assigned = placement.assigned(),
        total_distance = placement.total_distance(),
        "rack placement"
    );
    Ok(placement)
}

#[derive(Debug, Clone, Default)]
pub struct BatchPlacement {
    pub placements: BTreeMap<String, Placement>,
    pub failures: BTreeMap<String, PlanError>,
}

impl BatchPlacement {
    pub fn slots_used(&self) -> usize {
        self.placements.values().map(Placement::assigned).sum()
    }

    /// Writes every assignment into the grid: one unit per slot.
    ///
    /// All slots are checked first; on failure the grid is left untouched.
    pub fn commit(&self, grid: &mut Grid) -> Result<(), PlanError> {
        for placement in self.placements.values() {
            for assignment in &placement.assignments {
                let cell = grid.require(assignment.slot)?;
                if !cell.is_slot || cell.is_occupied() {
                    return Err(PlanError::NoAvailableSlots {
                        product_id: placement.product_id.clone(),
                    });
                }
            }
        }
        for placement in self.placements.values() {
            for assignment in &placement.assignments {
                grid.store(assignment.slot, &placement.product_id, 1)?;
            }
        }
        Ok(())
    }
}

/// Assigns several products, highest demand frequency first.
///
/// Earlier products get the better slots; a slot taken by one product is
/// reserved for the rest of the batch. The grid itself is not modified.
pub fn assign_batch(
    grid: &Grid,
    products: &BTreeMap<String, ProductInfo>,
    elevator: Coord,
    options: &RackOptions,
) -> BatchPlacement {
    let mut ordered: Vec<(&String, &ProductInfo)> = products.iter().collect();
    ordered.sort_by(|a, b| b.1.frequency.total_cmp(&a.1.frequency));

    let mut reserved = Reservations::new();
    let mut batch = BatchPlacement::default();

    for (product_id, info) in ordered {
        match assign_with(grid, product_id, info, elevator, &reserved, options) {
            Ok(placement) => {
                for assignment in &placement.assignments {
                    reserved.reserve(assignment.slot);
                }
                batch.placements.insert(product_id.clone(), placement);
            }
            Err(err) => {
                warn!(product_id = %product_id, error = %err, "rack assignment failed");
                batch.failures.insert(product_id.clone(), err);
            }
        }
    }

    info!(
        products = products.len(),
        slots = batch.slots_used(),
        failures = batch.failures.len(),
        "batch rack assignment"
    );
    batch
}
