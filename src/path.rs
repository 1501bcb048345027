//! Path representation for search results.
//!
//! A path is the ordered list of coordinates walked from start to goal, both
//! inclusive, together with the cost the search accumulated while building
//! it. Paths are never edited after construction.

use serde::Serialize;

use crate::cost;
use crate::grid::Coord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Path {
    points: Vec<Coord>,
    cost: f64,
}

impl Path {
    /// Creates a path from coordinates and the cost the search computed.
    pub fn new(points: Vec<Coord>, cost: f64) -> Self {
        Self { points, cost }
    }

    /// The "no route" path.
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0.0)
    }

    /// Start equals goal.
    pub fn single(at: Coord) -> Self {
        Self::new(vec![at], 0.0)
    }

    pub fn points(&self) -> &[Coord] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Coord> {
        self.points
    }

    /// Cost accumulated during search, elevator transitions included.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn start(&self) -> Option<Coord> {
        self.points.first().copied()
    }

    pub fn goal(&self) -> Option<Coord> {
        self.points.last().copied()
    }

    pub fn contains(&self, coord: Coord) -> bool {
        self.points.contains(&coord)
    }

    pub fn floor_transitions(&self) -> usize {
        cost::floor_transitions(&self.points)
    }

    /// Appends a path that continues on another floor of the same shaft.
    ///
    /// `next` must start where `self` ends in `x`, `y`; `transit_cost` is the
    /// price of the ride.
    pub(crate) fn chain(mut self, next: Path, transit_cost: f64) -> Path {
        self.cost = self.cost + transit_cost + next.cost;
        self.points.extend(next.points);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_points() {
        let points = vec![Coord::new(0, 0, 0), Coord::new(1, 1, 0)];
        let path = Path::new(points.clone(), std::f64::consts::SQRT_2);
        assert_eq!(path.points(), &points[..]);
        assert_eq!(path.start(), Some(Coord::new(0, 0, 0)));
        assert_eq!(path.goal(), Some(Coord::new(1, 1, 0)));
    }

    #[test]
    fn test_empty_path() {
        let path = Path::empty();
        assert!(path.is_empty());
        assert_eq!(path.goal(), None);
        assert_eq!(path.cost(), 0.0);
    }

    #[test]
    fn test_single_point_path() {
        let path = Path::single(Coord::new(2, 2, 1));
        assert_eq!(path.len(), 1);
        assert_eq!(path.start(), path.goal());
    }

    #[test]
    fn test_chain_across_floors() {
        let down = Path::new(vec![Coord::new(0, 0, 1), Coord::new(1, 0, 1)], 1.0);
        let ground = Path::new(vec![Coord::new(1, 0, 0), Coord::new(2, 0, 0)], 1.0);
        let joined = down.chain(ground, 1.0);

        assert_eq!(joined.len(), 4);
        assert_eq!(joined.cost(), 3.0);
        assert_eq!(joined.floor_transitions(), 1);
        assert_eq!(cost::route_cost(joined.points(), 1.0), joined.cost());
    }
}
