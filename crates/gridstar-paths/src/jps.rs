//! Jump Point Search (JPS) on uniform-cost grid layers.
//!
//! JPS replaces neighbour expansion in A*: from a vertex it scans along
//! straight and diagonal lines and only hands the search the *jump points*
//! found there, i.e. the goal or cells with forced neighbours. Pruning and
//! forced neighbour rules depend on how the layer was linked: 4-way, or
//! 8-way under one of the [`Cutting`] policies.
//!
//! A cell is walkable when some edge leads into it; whether a single step
//! is allowed is read from the adjacency of the layer.

use gridstar_core::Point;

use crate::astar::{PathResult, Successors, endpoints, run};
use crate::distance::Estimate;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::grid::{Cutting, GridMeta};
use crate::vertex::{Positioned, VertexId, VertexRef};

/// Movement policy of a grid layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Movement {
    /// 4-way.
    Cardinal,
    /// 8-way, corners can always be cut.
    Always,
    /// 8-way, at most one of the two laterals may be blocked.
    Loose,
    /// 8-way, both laterals must be open.
    Strict,
}

impl Movement {
    fn of(meta: &GridMeta) -> Self {
        if !meta.diagonals {
            return Movement::Cardinal;
        }
        match meta.cutting {
            Cutting::Always => Movement::Always,
            Cutting::Loose => Movement::Loose,
            Cutting::Strict => Movement::Strict,
        }
    }
}

/// Compute a path from `start` to `goal` with jump point search.
///
/// The layer must come from the grid builder and must not be toroidal.
/// Edge costs are summed along each jump, but the pruning rules are only
/// sound when every allowed step costs the same.
pub fn jps<K, D, E>(
    graph: &Graph<K, D>,
    start: &VertexRef<K, D>,
    goal: &VertexRef<K, D>,
    estimate: &E,
    precheck: bool,
) -> Result<PathResult<K, D>>
where
    K: VertexId,
    D: Positioned,
    E: Estimate<D> + ?Sized,
{
    let meta = graph
        .grid()
        .ok_or_else(|| Error::Unsupported("jump point search needs a grid layer".into()))?;
    if meta.torus {
        return Err(Error::Unsupported(
            "jump point search does not support toroidal grids".into(),
        ));
    }
    let (s, g) = endpoints(graph, start, goal)?;
    let strategy = JumpPoints::new(graph, meta);
    Ok(run(graph, s, g, estimate, &strategy, precheck))
}

/// Successor strategy yielding jump points.
pub(crate) struct JumpPoints {
    movement: Movement,
    /// Cell of each slot.
    cells: Vec<Option<Point>>,
}

impl JumpPoints {
    fn new<K: VertexId, D: Positioned>(graph: &Graph<K, D>, meta: &GridMeta) -> Self {
        let cells = (0..graph.slot_capacity())
            .map(|s| graph.vertex_at_slot(s).map(|v| v.data().position()))
            .collect();
        Self {
            movement: Movement::of(meta),
            cells,
        }
    }

    fn cell(&self, slot: usize) -> Option<Point> {
        self.cells.get(slot).copied().flatten()
    }

    fn walkable<K: VertexId, D>(graph: &Graph<K, D>, p: Point) -> bool {
        graph.cell_slot(p).is_some_and(|s| graph.has_incoming(s))
    }

    /// Pruned set of directions to jump towards from `p`, which was entered
    /// moving along `d`.
    fn prune_dirs<K: VertexId, D>(&self, graph: &Graph<K, D>, p: Point, d: Point) -> Vec<Point> {
        let w = |dx: i32, dy: i32| Self::walkable(graph, p.shift(dx, dy));
        let mut dirs = Vec::with_capacity(8);
        let mut push = |dx: i32, dy: i32| dirs.push(Point::new(dx, dy));

        match self.movement {
            Movement::Cardinal => {
                if d.x != 0 {
                    if w(0, -1) {
                        push(0, -1);
                    }
                    if w(0, 1) {
                        push(0, 1);
                    }
                    if w(d.x, 0) {
                        push(d.x, 0);
                    }
                } else {
                    if w(-1, 0) {
                        push(-1, 0);
                    }
                    if w(1, 0) {
                        push(1, 0);
                    }
                    if w(0, d.y) {
                        push(0, d.y);
                    }
                }
            }
            Movement::Always | Movement::Loose if d.is_diagonal() => {
                let loose = self.movement == Movement::Loose;
                let (side_y, side_x) = (w(0, d.y), w(d.x, 0));
                if side_y {
                    push(0, d.y);
                }
                if side_x {
                    push(d.x, 0);
                }
                if !loose || side_y || side_x {
                    push(d.x, d.y);
                }
                // Forced neighbours
                if !w(-d.x, 0) && (!loose || side_y) {
                    push(-d.x, d.y);
                }
                if !w(0, -d.y) && (!loose || side_x) {
                    push(d.x, -d.y);
                }
            }
            Movement::Always | Movement::Loose => {
                let loose = self.movement == Movement::Loose;
                let ahead = w(d.x, d.y);
                if ahead {
                    push(d.x, d.y);
                }
                if !loose || ahead {
                    // Sides of the move, blocked ones force a diagonal.
                    for side in [Point::new(d.y, d.x), Point::new(-d.y, -d.x)] {
                        if !w(side.x, side.y) {
                            push(d.x + side.x, d.y + side.y);
                        }
                    }
                }
            }
            Movement::Strict if d.is_diagonal() => {
                let (side_y, side_x) = (w(0, d.y), w(d.x, 0));
                if side_y {
                    push(0, d.y);
                }
                if side_x {
                    push(d.x, 0);
                }
                if side_y && side_x {
                    push(d.x, d.y);
                }
            }
            Movement::Strict => {
                let sides = [Point::new(d.y, d.x), Point::new(-d.y, -d.x)];
                let open_sides: Vec<Point> = sides.into_iter().filter(|s| w(s.x, s.y)).collect();
                if w(d.x, d.y) {
                    push(d.x, d.y);
                    for s in &open_sides {
                        push(d.x + s.x, d.y + s.y);
                    }
                }
                for s in &open_sides {
                    push(s.x, s.y);
                }
            }
        }
        dirs
    }

    /// Whether the cell `p`, entered moving along `d`, has a forced
    /// neighbour.
    fn forced<K: VertexId, D>(&self, graph: &Graph<K, D>, p: Point, d: Point) -> bool {
        let w = |dx: i32, dy: i32| Self::walkable(graph, p.shift(dx, dy));
        match self.movement {
            Movement::Strict if d.is_diagonal() => false,
            Movement::Always | Movement::Loose if d.is_diagonal() => {
                (w(-d.x, d.y) && !w(-d.x, 0)) || (w(d.x, -d.y) && !w(0, -d.y))
            }
            Movement::Always | Movement::Loose => {
                // Side cells blocked next to us but open one step ahead.
                [Point::new(d.y, d.x), Point::new(-d.y, -d.x)]
                    .into_iter()
                    .any(|s| w(d.x + s.x, d.y + s.y) && !w(s.x, s.y))
            }
            Movement::Cardinal | Movement::Strict => {
                // Side cells open next to us but blocked one step behind.
                [Point::new(d.y, d.x), Point::new(-d.y, -d.x)]
                    .into_iter()
                    .any(|s| w(s.x, s.y) && !w(s.x - d.x, s.y - d.y))
            }
        }
    }

    /// Straight directions scanned from each cell of a ray along `d`.
    fn sub_rays(&self, d: Point) -> Option<[Point; 2]> {
        match self.movement {
            Movement::Cardinal if d.y != 0 => Some([Point::new(1, 0), Point::new(-1, 0)]),
            Movement::Cardinal => None,
            _ if d.is_diagonal() => Some([Point::new(d.x, 0), Point::new(0, d.y)]),
            _ => None,
        }
    }

    /// Scan from `from` along `d` until a jump point is met.
    ///
    /// Returns the jump point and the summed cost of the steps taken, or
    /// `None` when the ray runs into a blocked step. With `probe` set, the
    /// sub-rays of each cell are scanned too; the sub-rays themselves never
    /// probe further.
    fn ray<K: VertexId, D>(
        &self,
        graph: &Graph<K, D>,
        from: usize,
        d: Point,
        goal: usize,
        probe: bool,
    ) -> Option<(usize, f64)> {
        let mut prev = from;
        let mut p = self.cell(from)?;
        let mut cost = 0.0;
        loop {
            p = p + d;
            let cur = graph.cell_slot(p)?;
            let step = graph.slot_cost(prev, cur);
            if step.is_nan() {
                return None;
            }
            cost += step;
            if cur == goal || self.forced(graph, p, d) {
                return Some((cur, cost));
            }
            if probe {
                if let Some(rays) = self.sub_rays(d) {
                    if rays
                        .iter()
                        .any(|&r| self.ray(graph, cur, r, goal, false).is_some())
                    {
                        return Some((cur, cost));
                    }
                }
            }
            if d.is_diagonal() {
                let w = |dx: i32, dy: i32| Self::walkable(graph, p.shift(dx, dy));
                let go_on = match self.movement {
                    Movement::Loose => w(d.x, 0) || w(0, d.y),
                    Movement::Strict => w(d.x, 0) && w(0, d.y),
                    _ => true,
                };
                if !go_on {
                    return None;
                }
            }
            prev = cur;
        }
    }
}

impl<K: VertexId, D> Successors<K, D> for JumpPoints {
    fn successors(
        &self,
        graph: &Graph<K, D>,
        current: usize,
        parent: Option<usize>,
        goal: usize,
        out: &mut Vec<(usize, f64)>,
    ) {
        let Some(p) = self.cell(current) else {
            return;
        };
        let dirs = match parent.and_then(|s| self.cell(s)) {
            Some(pp) => self.prune_dirs(graph, p, p.direction_from(pp)),
            None => graph
                .outgoing(current)
                .iter()
                .filter_map(|&(t, _)| self.cell(t))
                .map(|q| q.direction_from(p))
                .collect(),
        };
        for d in dirs {
            if let Some(jump) = self.ray(graph, current, d, goal, true) {
                out.push(jump);
            }
        }
    }

    fn fill(&self, graph: &Graph<K, D>, from: usize, to: usize, out: &mut Vec<usize>) {
        let (Some(mut p), Some(end)) = (self.cell(from), self.cell(to)) else {
            return;
        };
        let d = end.direction_from(p);
        loop {
            p = p + d;
            if p == end {
                break;
            }
            match graph.cell_slot(p) {
                Some(s) => out.push(s),
                None => break,
            }
        }
    }

    fn jumps(&self) -> bool {
        true
    }
}
