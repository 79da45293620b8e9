//! Distance functions and search heuristics.

use gridstar_core::Point;

use crate::grid::GridMeta;
use crate::vertex::Positioned;

/// Manhattan (L1) distance between two points.
#[inline]
pub fn manhattan(a: Point, b: Point) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

/// Chebyshev (L∞) distance between two points.
#[inline]
pub fn chebyshev(a: Point, b: Point) -> i32 {
    (a.x - b.x).abs().max((a.y - b.y).abs())
}

/// Distance between two coordinates on an axis of length `size` whose ends
/// are glued together.
#[inline]
pub fn wrapped_delta(a: i32, b: i32, size: i32) -> i32 {
    let d = b - a;
    d.abs().min(d + size).min(size - d)
}

/// Tuning shared by the heuristics.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeuristicOptions {
    /// Cost of one straight step.
    pub multiplier: f64,
    /// Cost of one diagonal step, used by [`Heuristic::Diagonal`].
    pub diagonal_multiplier: f64,
    /// Map size when both axes wrap around.
    pub torus: Option<Point>,
}

impl Default for HeuristicOptions {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            diagonal_multiplier: 1.4,
            torus: None,
        }
    }
}

impl HeuristicOptions {
    /// Per-axis distances between `a` and `b`.
    fn deltas(&self, a: Point, b: Point) -> (f64, f64) {
        let (dx, dy) = match self.torus {
            Some(size) => (wrapped_delta(a.x, b.x, size.x), wrapped_delta(a.y, b.y, size.y)),
            None => ((b.x - a.x).abs(), (b.y - a.y).abs()),
        };
        (f64::from(dx), f64::from(dy))
    }
}

/// Heuristic family.
///
/// Estimates must never exceed the real remaining cost for A* to return
/// shortest paths; picking a heuristic that matches the movement rules and
/// edge costs of the graph is up to the caller.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Heuristic {
    /// Always 0: the search degrades to Dijkstra.
    Zero,
    /// `m * (dx + dy)`.
    #[default]
    Manhattan,
    /// Octile distance: `m * (dx + dy) + (dm - 2m) * min(dx, dy)`.
    Diagonal,
    /// `m * sqrt(dx² + dy²)`.
    Euclidean,
}

impl Heuristic {
    /// Estimated cost between two cells.
    pub fn estimate(self, a: Point, b: Point, options: &HeuristicOptions) -> f64 {
        let m = options.multiplier;
        let (dx, dy) = options.deltas(a, b);
        match self {
            Heuristic::Zero => 0.0,
            Heuristic::Manhattan => m * (dx + dy),
            Heuristic::Diagonal => m * (dx + dy) + (options.diagonal_multiplier - 2.0 * m) * dx.min(dy),
            Heuristic::Euclidean => m * (dx * dx + dy * dy).sqrt(),
        }
    }
}

/// Something that estimates the remaining cost between two payloads.
pub trait Estimate<D> {
    fn estimate(&self, from: &D, to: &D) -> f64;
}

impl<D, F> Estimate<D> for F
where
    F: Fn(&D, &D) -> f64,
{
    #[inline]
    fn estimate(&self, from: &D, to: &D) -> f64 {
        self(from, to)
    }
}

/// A [`Heuristic`] bound to its options, estimating between positioned
/// payloads.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Estimator {
    pub heuristic: Heuristic,
    pub options: HeuristicOptions,
}

impl Estimator {
    pub fn new(heuristic: Heuristic, options: HeuristicOptions) -> Self {
        Self { heuristic, options }
    }

    /// Default estimator for a grid layer: Manhattan distance on 4-way
    /// grids, Chebyshev distance (unit diagonal steps) on 8-way grids,
    /// wrapped when the grid is a torus.
    pub fn for_grid(meta: &GridMeta) -> Self {
        let torus = meta.torus.then(|| meta.size());
        if meta.diagonals {
            Self::new(
                Heuristic::Diagonal,
                HeuristicOptions {
                    diagonal_multiplier: 1.0,
                    torus,
                    ..HeuristicOptions::default()
                },
            )
        } else {
            Self::new(
                Heuristic::Manhattan,
                HeuristicOptions {
                    torus,
                    ..HeuristicOptions::default()
                },
            )
        }
    }
}

impl<D: Positioned> Estimate<D> for Estimator {
    #[inline]
    fn estimate(&self, from: &D, to: &D) -> f64 {
        self.heuristic
            .estimate(from.position(), to.position(), &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Cutting, Order};
    use gridstar_core::Range;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn integer_helpers() {
        let a = Point::new(1, 1);
        let b = Point::new(4, 3);
        assert_eq!(manhattan(a, b), 5);
        assert_eq!(chebyshev(a, b), 3);
        assert_eq!(manhattan(a, a), 0);
    }

    #[test]
    fn plane_heuristics() {
        let a = Point::new(5, 5);
        let b = Point::new(7, 9);
        let opts = HeuristicOptions::default();
        assert_eq!(Heuristic::Manhattan.estimate(a, b, &opts), 6.0);
        assert!(close(Heuristic::Diagonal.estimate(a, b, &opts), 4.8));
        assert!(close(Heuristic::Euclidean.estimate(a, b, &opts), 20f64.sqrt()));
        assert_eq!(Heuristic::Zero.estimate(a, b, &opts), 0.0);
    }

    #[test]
    fn multipliers_scale_estimates() {
        let a = Point::new(0, 0);
        let b = Point::new(3, 1);
        let opts = HeuristicOptions {
            multiplier: 2.0,
            diagonal_multiplier: 3.0,
            torus: None,
        };
        assert_eq!(Heuristic::Manhattan.estimate(a, b, &opts), 8.0);
        // 2 * 4 + (3 - 4) * 1
        assert_eq!(Heuristic::Diagonal.estimate(a, b, &opts), 7.0);
    }

    #[test]
    fn torus_takes_the_short_way_round() {
        let opts = HeuristicOptions {
            torus: Some(Point::new(10, 10)),
            ..HeuristicOptions::default()
        };
        let a = Point::new(1, 9);
        let b = Point::new(9, 9);
        assert_eq!(Heuristic::Manhattan.estimate(a, b, &opts), 2.0);
        assert_eq!(Heuristic::Manhattan.estimate(b, a, &opts), 2.0);
        assert_eq!(
            Heuristic::Manhattan.estimate(Point::new(2, 3), Point::new(5, 4), &opts),
            4.0
        );
        assert_eq!(wrapped_delta(0, 5, 10), 5);
        assert_eq!(wrapped_delta(8, 1, 10), 3);
    }

    #[test]
    fn closures_and_estimators_share_a_trait() {
        fn run<E: Estimate<Point>>(e: &E) -> f64 {
            e.estimate(&Point::new(0, 0), &Point::new(2, 2))
        }
        assert_eq!(run(&|_: &Point, _: &Point| 42.0), 42.0);
        assert_eq!(run(&Estimator::default()), 4.0);
    }

    #[test]
    fn grid_defaults() {
        let mut meta = GridMeta {
            bounds: Range::sized(10, 10),
            torus: false,
            diagonals: true,
            cutting: Cutting::Loose,
            order: Order::Yx,
        };
        let e = Estimator::for_grid(&meta);
        assert_eq!(e.heuristic, Heuristic::Diagonal);
        assert_eq!(e.estimate(&Point::new(0, 0), &Point::new(3, 7)), 7.0);

        meta.diagonals = false;
        meta.torus = true;
        let e = Estimator::for_grid(&meta);
        assert_eq!(e.heuristic, Heuristic::Manhattan);
        assert_eq!(e.options.torus, Some(Point::new(10, 10)));
        assert_eq!(e.estimate(&Point::new(0, 0), &Point::new(9, 9)), 2.0);
    }
}
