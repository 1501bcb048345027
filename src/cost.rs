//! Route cost model for 8-directional grid movement.
//!
//! Walking costs 1 per cardinal step and √2 per diagonal step. Changing floor
//! inside an elevator shaft costs a fixed [`DEFAULT_ELEVATOR_COST`] per
//! transition regardless of how many floors are crossed; searches add it once,
//! [`path_cost`] never does.

use std::f64::consts::SQRT_2;

use crate::grid::Coord;

pub const CARDINAL_COST: f64 = 1.0;

pub const DIAGONAL_COST: f64 = SQRT_2;

/// Fixed cost of one elevator transition.
pub const DEFAULT_ELEVATOR_COST: f64 = 1.0;

/// Cost of moving between two consecutive path coordinates.
///
/// A pure floor change (same `x`, `y`) walks nowhere and costs nothing here.
pub fn step_cost(from: Coord, to: Coord) -> f64 {
    let dx = (to.x - from.x).abs();
    let dy = (to.y - from.y).abs();
    match (dx, dy) {
        (0, 0) => 0.0,
        (0, _) | (_, 0) => CARDINAL_COST,
        _ => DIAGONAL_COST,
    }
}

/// Walking cost of a coordinate sequence, elevator transitions excluded.
pub fn path_cost(points: &[Coord]) -> f64 {
    points
        .windows(2)
        .map(|pair| step_cost(pair[0], pair[1]))
        .sum()
}

/// Number of floor changes along a coordinate sequence.
pub fn floor_transitions(points: &[Coord]) -> usize {
    points
        .windows(2)
        .filter(|pair| pair[0].floor != pair[1].floor)
        .count()
}

/// Walking cost plus `elevator_cost` per floor change.
///
/// Equals the cost a search reports for the same path.
pub fn route_cost(points: &[Coord], elevator_cost: f64) -> f64 {
    path_cost(points) + floor_transitions(points) as f64 * elevator_cost
}

/// Octile distance: admissible and consistent for 8-directional moves.
pub fn octile(a: Coord, b: Coord) -> f64 {
    let dx = (a.x - b.x).abs() as f64;
    let dy = (a.y - b.y).abs() as f64;
    dx.max(dy) + (SQRT_2 - 1.0) * dx.min(dy)
}

/// Straight-line distance in the `x`, `y` plane.
pub fn euclidean_xy(a: Coord, b: Coord) -> f64 {
    let dx = (a.x - b.x) as f64;
    let dy = (a.y - b.y) as f64;
    dx.hypot(dy)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_step_costs() {
        let origin = Coord::new(0, 0, 0);
        assert_eq!(step_cost(origin, Coord::new(1, 0, 0)), 1.0);
        assert_eq!(step_cost(origin, Coord::new(0, -1, 0)), 1.0);
        assert!((step_cost(origin, Coord::new(1, 1, 0)) - SQRT_2).abs() < EPS);
        assert_eq!(step_cost(origin, Coord::new(0, 0, 3)), 0.0);
    }

    #[test]
    fn test_path_cost_ignores_elevator() {
        let points = [
            Coord::new(0, 0, 0),
            Coord::new(1, 0, 0),
            Coord::new(1, 0, 1),
            Coord::new(2, 1, 1),
        ];
        assert!((path_cost(&points) - (1.0 + SQRT_2)).abs() < EPS);
        assert_eq!(floor_transitions(&points), 1);
        assert!((route_cost(&points, 1.0) - (2.0 + SQRT_2)).abs() < EPS);
    }

    #[test]
    fn test_empty_and_single_point() {
        assert_eq!(path_cost(&[]), 0.0);
        assert_eq!(path_cost(&[Coord::new(4, 4, 0)]), 0.0);
    }

    #[test]
    fn test_octile_matches_free_movement() {
        let a = Coord::new(0, 0, 0);
        let b = Coord::new(3, 1, 0);
        assert!((octile(a, b) - (2.0 + SQRT_2)).abs() < EPS);
        assert_eq!(octile(a, a), 0.0);
    }

    #[test]
    fn test_euclidean_ignores_floor() {
        let d = euclidean_xy(Coord::new(0, 0, 0), Coord::new(3, 4, 2));
        assert!((d - 5.0).abs() < EPS);
    }
}
