//! Warehouse grid model.
//!
//! The grid is a sparse map of cells keyed by `(x, y, floor)`. Floors share
//! the same `(x, y)` plane; elevator cells stacked at the same `(x, y)` are the
//! only way between floors, and that hop is handled by [`crate::search`], never
//! by [`Grid::neighbors`].

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Lookup, PlanError};
use crate::traits::Walkability;

/// 8-directional moves: cardinals first, then diagonals.
pub const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// A grid coordinate.
///
/// Ordered by floor, then row, then column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
    pub floor: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32, floor: i32) -> Self {
        Self { x, y, floor }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.floor)
    }

    pub fn on_floor(&self, floor: i32) -> Self {
        Self::new(self.x, self.y, floor)
    }

    pub fn same_xy(&self, other: &Coord) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl Ord for Coord {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.floor, self.y, self.x).cmp(&(other.floor, other.y, other.x))
    }
}

impl PartialOrd for Coord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, floor {})", self.x, self.y, self.floor)
    }
}

/// One addressable grid location with terrain flags and stock.
///
/// Serializes in the same flat shape as a snapshot `CellRecord`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    #[serde(flatten)]
    pub coord: Coord,
    /// Shelf level for rack cells, 0 = ground.
    pub z: i32,
    pub is_obstacle: bool,
    pub is_road: bool,
    pub is_slot: bool,
    pub is_elevator: bool,
    pub is_expedition_zone: bool,
    pub product_id: Option<String>,
    pub quantity: u32,
    #[serde(rename = "is_occupied")]
    pub(crate) occupied: bool,
}

impl Cell {
    /// A bare cell with no terrain flags.
    pub fn new(coord: Coord) -> Self {
        Self {
            coord,
            z: 0,
            is_obstacle: false,
            is_road: false,
            is_slot: false,
            is_elevator: false,
            is_expedition_zone: false,
            product_id: None,
            quantity: 0,
            occupied: false,
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.occupied || self.quantity > 0
    }

    pub fn holds(&self, product_id: &str) -> bool {
        self.is_slot && self.quantity > 0 && self.product_id.as_deref() == Some(product_id)
    }
}

/// Which terrain kinds a search may walk through.
///
/// Obstacles are never walkable, whatever else the cell is flagged as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkPolicy {
    pub roads: bool,
    pub slots: bool,
    pub elevators: bool,
    pub expedition_zones: bool,
}

impl Default for WalkPolicy {
    fn default() -> Self {
        Self::all()
    }
}

impl WalkPolicy {
    pub const fn all() -> Self {
        Self {
            roads: true,
            slots: true,
            elevators: true,
            expedition_zones: true,
        }
    }

    /// Storage-floor picking: aisles, racks and elevators.
    pub const fn picking() -> Self {
        Self {
            roads: true,
            slots: true,
            elevators: true,
            expedition_zones: false,
        }
    }

    /// Ground-floor delivery runs: aisles, racks and the expedition area.
    pub const fn expedition() -> Self {
        Self {
            roads: true,
            slots: true,
            elevators: false,
            expedition_zones: true,
        }
    }

    /// Aisles and elevators only; slots can still be reached as goals.
    pub const fn aisles_only() -> Self {
        Self {
            roads: true,
            slots: false,
            elevators: true,
            expedition_zones: false,
        }
    }

    pub fn allows(&self, cell: &Cell) -> bool {
        if cell.is_obstacle {
            return false;
        }
        (self.roads && cell.is_road)
            || (self.slots && cell.is_slot)
            || (self.elevators && cell.is_elevator)
            || (self.expedition_zones && cell.is_expedition_zone)
    }
}

impl Walkability for WalkPolicy {
    fn is_walkable(&self, cell: &Cell) -> bool {
        self.allows(cell)
    }
}

/// The warehouse grid for one planning session.
#[derive(Debug, Clone)]
pub struct Grid {
    width: i32,
    height: i32,
    cells: BTreeMap<Coord, Cell>,
    elevators: BTreeMap<i32, Vec<Coord>>,
    canonical: BTreeMap<i32, Coord>,
}

impl Grid {
    /// Builds the grid and its elevator index. Validation lives in
    /// [`Grid::from_snapshot`](crate::snapshot).
    pub(crate) fn assemble(
        width: i32,
        height: i32,
        cells: BTreeMap<Coord, Cell>,
        designated: &[Coord],
    ) -> Self {
        let mut elevators: BTreeMap<i32, Vec<Coord>> = BTreeMap::new();
        for cell in cells.values().filter(|cell| cell.is_elevator) {
            elevators.entry(cell.coord.floor).or_default().push(cell.coord);
        }

        let mut canonical = BTreeMap::new();
        for coord in designated {
            canonical.entry(coord.floor).or_insert(*coord);
        }
        for (floor, coords) in &elevators {
            if let Some(first) = coords.first() {
                canonical.entry(*floor).or_insert(*first);
            }
        }

        Self {
            width,
            height,
            cells,
            elevators,
            canonical,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, coord: Coord) -> Option<&Cell> {
        self.cells.get(&coord)
    }

    pub fn contains(&self, coord: Coord) -> bool {
        self.cells.contains_key(&coord)
    }

    /// Looks a cell up, failing with `NotFound` when absent.
    pub fn require(&self, coord: Coord) -> Result<&Cell, PlanError> {
        self.cells
            .get(&coord)
            .ok_or(PlanError::NotFound(Lookup::Cell(coord)))
    }

    /// All cells in coordinate order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    pub fn floors(&self) -> Vec<i32> {
        let mut floors: Vec<i32> = self.cells.keys().map(|coord| coord.floor).collect();
        floors.dedup();
        floors
    }

    /// Every existing same-floor neighbour, walkable or not, with its move.
    pub fn adjacent(&self, at: Coord) -> impl Iterator<Item = (&Cell, i32, i32)> {
        DIRECTIONS.iter().filter_map(move |&(dx, dy)| {
            self.cells.get(&at.offset(dx, dy)).map(|cell| (cell, dx, dy))
        })
    }

    /// Up to eight walkable same-floor neighbours of `at`.
    pub fn neighbors<'g, W>(&'g self, at: Coord, walk: &'g W) -> impl Iterator<Item = &'g Cell>
    where
        W: Walkability + ?Sized,
    {
        self.adjacent(at)
            .filter(move |(cell, _, _)| walk.is_walkable(cell))
            .map(|(cell, _, _)| cell)
    }

    pub fn elevators_on(&self, floor: i32) -> &[Coord] {
        self.elevators.get(&floor).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// The floor's designated entry/exit elevator.
    pub fn canonical_elevator(&self, floor: i32) -> Option<Coord> {
        self.canonical.get(&floor).copied()
    }

    pub fn expedition_zones(&self, floor: i32) -> Vec<&Cell> {
        self.cells_on(floor)
            .filter(|cell| cell.is_expedition_zone)
            .collect()
    }

    /// Slot cells holding a positive quantity of `product_id`.
    pub fn product_slots(&self, product_id: &str) -> Vec<&Cell> {
        self.cells.values().filter(|cell| cell.holds(product_id)).collect()
    }

    pub fn cells_on(&self, floor: i32) -> impl Iterator<Item = &Cell> {
        self.cells
            .range(Coord::new(i32::MIN, i32::MIN, floor)..=Coord::new(i32::MAX, i32::MAX, floor))
            .map(|(_, cell)| cell)
    }

    /// Removes `quantity` units from a slot after a pick.
    pub fn take(&mut self, coord: Coord, quantity: u32) -> Result<(), PlanError> {
        let cell = self
            .cells
            .get_mut(&coord)
            .ok_or(PlanError::NotFound(Lookup::Cell(coord)))?;

        if cell.quantity < quantity {
            return Err(PlanError::InsufficientStock {
                product_id: cell.product_id.clone().unwrap_or_default(),
                requested: quantity,
                available: cell.quantity,
            });
        }

        cell.quantity -= quantity;
        if cell.quantity == 0 {
            cell.product_id = None;
            cell.occupied = false;
        }
        Ok(())
    }

    /// Puts `quantity` units of `product_id` into a slot.
    ///
    /// Fails when the cell is not a slot or already holds another product.
    pub fn store(&mut self, coord: Coord, product_id: &str, quantity: u32) -> Result<(), PlanError> {
        let cell = self
            .cells
            .get_mut(&coord)
            .ok_or(PlanError::NotFound(Lookup::Cell(coord)))?;

        let foreign = cell.is_occupied() && cell.product_id.as_deref() != Some(product_id);
        if !cell.is_slot || cell.is_obstacle || foreign {
            return Err(PlanError::NoAvailableSlots {
                product_id: product_id.to_string(),
            });
        }

        cell.product_id = Some(product_id.to_string());
        cell.quantity += quantity;
        cell.occupied = true;
        Ok(())
    }
}

/// Slots provisionally taken during one batch call.
///
/// Checked alongside real occupancy; never written to the grid by itself.
#[derive(Debug, Clone, Default)]
pub struct Reservations {
    slots: HashSet<Coord>,
}

impl Reservations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the slot was already reserved.
    pub fn reserve(&mut self, coord: Coord) -> bool {
        self.slots.insert(coord)
    }

    pub fn is_reserved(&self, coord: Coord) -> bool {
        self.slots.contains(&coord)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Free when neither stocked in the grid nor reserved here.
    pub fn is_free(&self, cell: &Cell) -> bool {
        !cell.is_occupied() && !self.is_reserved(cell.coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn road(x: i32, y: i32) -> Cell {
        let mut cell = Cell::new(Coord::new(x, y, 0));
        cell.is_road = true;
        cell
    }

    fn grid_of(cells: Vec<Cell>) -> Grid {
        let map = cells.into_iter().map(|cell| (cell.coord, cell)).collect();
        Grid::assemble(3, 3, map, &[])
    }

    #[test]
    fn test_obstacle_never_walkable() {
        let mut cell = road(0, 0);
        cell.is_obstacle = true;
        cell.is_elevator = true;
        assert!(!WalkPolicy::all().allows(&cell));
    }

    #[test]
    fn test_aisles_only_excludes_slots() {
        let mut cell = Cell::new(Coord::new(0, 0, 0));
        cell.is_slot = true;
        assert!(WalkPolicy::picking().allows(&cell));
        assert!(!WalkPolicy::aisles_only().allows(&cell));
    }

    #[test]
    fn test_neighbors_center_of_open_grid() {
        let mut cells = Vec::new();
        for y in 0..3 {
            for x in 0..3 {
                cells.push(road(x, y));
            }
        }
        let grid = grid_of(cells);
        let policy = WalkPolicy::all();
        let around: Vec<Coord> = grid
            .neighbors(Coord::new(1, 1, 0), &policy)
            .map(|cell| cell.coord)
            .collect();
        assert_eq!(around.len(), 8);
        assert_eq!(around[0], Coord::new(2, 1, 0));
        assert_eq!(around[7], Coord::new(0, 0, 0));
    }

    #[test]
    fn test_neighbors_skip_other_floors() {
        let mut upper = road(1, 0);
        upper.coord.floor = 1;
        let grid = grid_of(vec![road(0, 0), upper]);
        let policy = WalkPolicy::all();
        assert_eq!(grid.neighbors(Coord::new(0, 0, 0), &policy).count(), 0);
    }

    #[test]
    fn test_coord_order_is_floor_row_column() {
        let mut coords = vec![
            Coord::new(0, 0, 1),
            Coord::new(1, 0, 0),
            Coord::new(0, 1, 0),
        ];
        coords.sort();
        assert_eq!(
            coords,
            vec![Coord::new(1, 0, 0), Coord::new(0, 1, 0), Coord::new(0, 0, 1)]
        );
    }

    #[test]
    fn test_take_clears_empty_slot() {
        let mut slot = Cell::new(Coord::new(0, 0, 0));
        slot.is_slot = true;
        slot.product_id = Some("P1".to_string());
        slot.quantity = 2;
        let mut grid = grid_of(vec![slot]);

        grid.take(Coord::new(0, 0, 0), 2).unwrap();
        let cell = grid.cell(Coord::new(0, 0, 0)).unwrap();
        assert_eq!(cell.quantity, 0);
        assert!(cell.product_id.is_none());
        assert!(!cell.is_occupied());
    }

    #[test]
    fn test_take_more_than_stocked() {
        let mut slot = Cell::new(Coord::new(0, 0, 0));
        slot.is_slot = true;
        slot.product_id = Some("P1".to_string());
        slot.quantity = 1;
        let mut grid = grid_of(vec![slot]);

        let err = grid.take(Coord::new(0, 0, 0), 3).unwrap_err();
        assert!(matches!(err, PlanError::InsufficientStock { available: 1, .. }));
    }

    #[test]
    fn test_store_rejects_foreign_product() {
        let mut slot = Cell::new(Coord::new(0, 0, 0));
        slot.is_slot = true;
        let mut grid = grid_of(vec![slot]);

        grid.store(Coord::new(0, 0, 0), "A", 1).unwrap();
        assert!(grid.store(Coord::new(0, 0, 0), "B", 1).is_err());
        grid.store(Coord::new(0, 0, 0), "A", 2).unwrap();
        assert_eq!(grid.cell(Coord::new(0, 0, 0)).unwrap().quantity, 3);
    }

    #[test]
    fn test_reservations_mark_slots_busy() {
        let mut slot = Cell::new(Coord::new(0, 0, 0));
        slot.is_slot = true;
        let mut reservations = Reservations::new();
        assert!(reservations.is_free(&slot));
        assert!(reservations.reserve(slot.coord));
        assert!(!reservations.reserve(slot.coord));
        assert!(!reservations.is_free(&slot));
    }
}
