//! A* search over [`Graph`]s.
//!
//! The search loop is shared with jump point search: both run [`run`] and
//! differ only in the [`Successors`] strategy that lists what to expand
//! from a vertex.

use std::collections::HashMap;
use std::rc::Rc;

use gridstar_core::{Point, ScoredHeap};

use crate::distance::Estimate;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::vertex::{Positioned, VertexId, VertexRef};

/// Search record of a vertex reached during a query.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Score<K> {
    /// Cost of the best known route from the start.
    pub cost: f64,
    /// Predecessor on that route. For jump point search this is the
    /// previous jump point, not necessarily a neighbour.
    pub from: Option<K>,
    /// Whether the vertex was reached by a jump.
    pub jumped: bool,
}

/// Outcome of a path query.
#[derive(Debug)]
pub struct PathResult<K, D> {
    /// Vertices from start to goal, both included. Empty when no path
    /// exists.
    pub path: Vec<VertexRef<K, D>>,
    /// Records of every vertex the search reached, keyed by id.
    pub scores: HashMap<K, Score<K>>,
}

impl<K: VertexId, D> PathResult<K, D> {
    fn unreachable() -> Self {
        Self {
            path: Vec::new(),
            scores: HashMap::new(),
        }
    }

    /// Whether a path was found.
    pub fn is_found(&self) -> bool {
        !self.path.is_empty()
    }

    /// Total cost of the path, `None` when no path was found.
    pub fn cost(&self) -> Option<f64> {
        let goal = self.path.last()?;
        self.scores.get(goal.id()).map(|s| s.cost)
    }

    /// Ids along the path.
    pub fn ids(&self) -> Vec<K> {
        self.path.iter().map(|v| v.id().clone()).collect()
    }
}

impl<K, D: Positioned> PathResult<K, D> {
    /// Cells along the path.
    pub fn positions(&self) -> Vec<Point> {
        self.path.iter().map(|v| v.data().position()).collect()
    }
}

// ---------------------------------------------------------------------------
// Strategy seam
// ---------------------------------------------------------------------------

/// Lists the moves to consider from a vertex.
pub(crate) trait Successors<K, D> {
    /// Append `(slot, cost)` moves out of `current`, which was reached from
    /// `parent`.
    fn successors(
        &self,
        graph: &Graph<K, D>,
        current: usize,
        parent: Option<usize>,
        goal: usize,
        out: &mut Vec<(usize, f64)>,
    );

    /// Append the slots strictly between two consecutive path vertices.
    fn fill(&self, _graph: &Graph<K, D>, _from: usize, _to: usize, _out: &mut Vec<usize>) {}

    /// Whether moves skip over intermediate vertices.
    fn jumps(&self) -> bool {
        false
    }
}

/// Plain neighbour expansion.
pub(crate) struct Adjacent;

impl<K: VertexId, D> Successors<K, D> for Adjacent {
    fn successors(
        &self,
        graph: &Graph<K, D>,
        current: usize,
        _parent: Option<usize>,
        _goal: usize,
        out: &mut Vec<(usize, f64)>,
    ) {
        out.extend_from_slice(graph.outgoing(current));
    }
}

// ---------------------------------------------------------------------------
// Search loop
// ---------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    Unseen,
    Open,
    Closed,
}

#[derive(Copy, Clone, Debug)]
struct Record {
    g: f64,
    from: Option<usize>,
    state: State,
}

const UNSEEN: Record = Record {
    g: f64::INFINITY,
    from: None,
    state: State::Unseen,
};

/// Open list entry. Identity is the slot, so updating an entry with a new
/// estimate replaces the old one.
#[derive(Copy, Clone, Debug)]
struct Open {
    slot: usize,
    f: f64,
}

impl PartialEq for Open {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
    }
}

/// Compute the cheapest path from `start` to `goal` in `graph` with A*.
///
/// `estimate` must not overestimate the remaining cost for the result to be
/// a shortest path. When `precheck` is set and the connectivity markers of
/// the endpoints are known and differ, the search is skipped. An
/// unreachable goal yields an empty path.
pub fn astar<K, D, E>(
    graph: &Graph<K, D>,
    start: &VertexRef<K, D>,
    goal: &VertexRef<K, D>,
    estimate: &E,
    precheck: bool,
) -> Result<PathResult<K, D>>
where
    K: VertexId,
    E: Estimate<D> + ?Sized,
{
    let (s, g) = endpoints(graph, start, goal)?;
    Ok(run(graph, s, g, estimate, &Adjacent, precheck))
}

pub(crate) fn endpoints<K: VertexId, D>(
    graph: &Graph<K, D>,
    start: &VertexRef<K, D>,
    goal: &VertexRef<K, D>,
) -> Result<(usize, usize)> {
    let unknown = |v: &VertexRef<K, D>| Error::UnknownVertex(format!("{:?}", v.id()));
    let s = graph.slot_of(start).ok_or_else(|| unknown(start))?;
    let g = graph.slot_of(goal).ok_or_else(|| unknown(goal))?;
    Ok((s, g))
}

pub(crate) fn run<K, D, E, S>(
    graph: &Graph<K, D>,
    start: usize,
    goal: usize,
    estimate: &E,
    strategy: &S,
    precheck: bool,
) -> PathResult<K, D>
where
    K: VertexId,
    E: Estimate<D> + ?Sized,
    S: Successors<K, D>,
{
    let (Some(goal_vertex), Some(start_vertex)) =
        (graph.vertex_at_slot(goal), graph.vertex_at_slot(start))
    else {
        return PathResult::unreachable();
    };
    let mut records = vec![UNSEEN; graph.slot_capacity()];
    records[start] = Record {
        g: 0.0,
        from: None,
        state: State::Open,
    };

    if precheck && !graph.may_connect(start, goal) {
        log::debug!(
            "{:?} and {:?} lie in different components",
            start_vertex.id(),
            goal_vertex.id()
        );
        return collect(graph, &records, strategy, None);
    }

    let found = {
        let goal_data = goal_vertex.data();
        let h = |slot: usize| {
            graph
                .vertex_at_slot(slot)
                .map_or(0.0, |v| estimate.estimate(&v.data(), &goal_data))
        };
        let mut open = ScoredHeap::new(|o: &Open| o.f);
        open.push(Open {
            slot: start,
            f: h(start),
        });
        let mut moves = Vec::new();
        let mut expanded = 0usize;
        let mut found = false;

        while let Some(Open { slot: current, .. }) = open.pop() {
            if current == goal {
                found = true;
                break;
            }
            expanded += 1;
            records[current].state = State::Closed;
            let base = records[current].g;
            moves.clear();
            strategy.successors(graph, current, records[current].from, goal, &mut moves);
            for &(next, cost) in &moves {
                if cost.is_nan() {
                    continue;
                }
                let g = base + cost;
                if g < records[next].g {
                    records[next] = Record {
                        g,
                        from: Some(current),
                        state: State::Open,
                    };
                    open.update(Open {
                        slot: next,
                        f: g + h(next),
                    });
                }
            }
        }
        log::trace!("search expanded {expanded} vertices, found: {found}");
        found
    };

    collect(graph, &records, strategy, found.then_some(goal))
}

/// Turn the slot records into a [`PathResult`], reconstructing the path
/// back from `goal` when one was found.
fn collect<K, D, S>(
    graph: &Graph<K, D>,
    records: &[Record],
    strategy: &S,
    goal: Option<usize>,
) -> PathResult<K, D>
where
    K: VertexId,
    S: Successors<K, D>,
{
    let id_of = |slot: usize| graph.vertex_at_slot(slot).map(|v| v.id().clone());
    let scores = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.state != State::Unseen)
        .filter_map(|(slot, r)| {
            let score = Score {
                cost: r.g,
                from: r.from.and_then(id_of),
                jumped: strategy.jumps() && r.from.is_some(),
            };
            Some((id_of(slot)?, score))
        })
        .collect();

    let Some(goal) = goal else {
        return PathResult {
            path: Vec::new(),
            scores,
        };
    };

    let mut chain = vec![goal];
    let mut cur = goal;
    while let Some(prev) = records[cur].from {
        // Predecessor chains cannot be longer than the graph unless costs
        // were negative.
        if chain.len() > records.len() {
            log::warn!("predecessor cycle detected while rebuilding a path");
            break;
        }
        chain.push(prev);
        cur = prev;
    }
    chain.reverse();

    let mut slots = Vec::with_capacity(chain.len());
    for pair in chain.windows(2) {
        slots.push(pair[0]);
        strategy.fill(graph, pair[0], pair[1], &mut slots);
    }
    slots.push(goal);

    let path = slots
        .into_iter()
        .filter_map(|s| graph.vertex_at_slot(s).map(Rc::clone))
        .collect();
    PathResult { path, scores }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{Estimator, Heuristic, HeuristicOptions};
    use crate::grid::{GridOptions, Tile, from_array};
    use crate::vertex::Vertex;
    use rand::rngs::StdRng;
    use rand::{RngExt, SeedableRng};

    type Layer = Graph<usize, Tile<u8>>;

    fn open_cost() -> GridOptions<u8> {
        GridOptions::<u8>::new().cost(|a, b| {
            if a.value == b'#' || b.value == b'#' { f64::NAN } else { 1.0 }
        })
    }

    fn grid(rows: &[&str], diagonals: bool) -> Layer {
        let array: Vec<&[u8]> = rows.iter().map(|r| r.as_bytes()).collect();
        let mut graphs = from_array(&array, &open_cost().diagonals(diagonals)).unwrap();
        graphs.remove(0)
    }

    fn find(g: &Layer, from: (i32, i32), to: (i32, i32), e: &Estimator) -> PathResult<usize, Tile<u8>> {
        let (a, b) = (g.at(from.0, from.1).unwrap(), g.at(to.0, to.1).unwrap());
        astar(g, a, b, e, true).unwrap()
    }

    fn assert_walkable(g: &Layer, res: &PathResult<usize, Tile<u8>>) {
        for w in res.path.windows(2) {
            assert!(g.adjacent(&w[0], &w[1]), "{:?} -> {:?}", w[0].id(), w[1].id());
        }
    }

    #[test]
    fn routes_around_a_wall() {
        let g = grid(&["....", ".##.", "...."], false);
        let e = Estimator::for_grid(g.grid().unwrap());
        let res = find(&g, (0, 1), (3, 1), &e);
        assert_eq!(res.path.len(), 6);
        assert_eq!(res.cost(), Some(5.0));
        assert_eq!(res.positions()[0], Point::new(0, 1));
        assert_eq!(res.positions()[5], Point::new(3, 1));
        assert_walkable(&g, &res);
        let start = &res.scores[&4];
        assert_eq!(start.cost, 0.0);
        assert_eq!(start.from, None);
        assert!(!start.jumped);
    }

    #[test]
    fn diagonal_moves_shorten_paths() {
        let g = grid(&[".....", ".....", "....."], true);
        let e = Estimator::for_grid(g.grid().unwrap());
        let res = find(&g, (0, 0), (4, 2), &e);
        assert_eq!(res.path.len(), 5);
        assert_eq!(res.cost(), Some(4.0));
        assert_walkable(&g, &res);
    }

    #[test]
    fn start_equals_goal() {
        let g = grid(&["..", ".."], false);
        let res = find(&g, (1, 1), (1, 1), &Estimator::default());
        assert_eq!(res.ids(), vec![3]);
        assert_eq!(res.cost(), Some(0.0));
    }

    #[test]
    fn unreachable_goal_gives_empty_path() {
        let g = grid(&[".#.", ".#.", ".#."], false);
        let res = find(&g, (0, 0), (2, 2), &Estimator::default());
        assert!(!res.is_found());
        assert_eq!(res.cost(), None);
        // The pre-check stops before expanding anything.
        assert_eq!(res.scores.len(), 1);

        let (a, b) = (g.at(0, 0).unwrap(), g.at(2, 2).unwrap());
        let res = astar(&g, a, b, &Estimator::default(), false).unwrap();
        assert!(!res.is_found());
        assert_eq!(res.scores.len(), 3);
    }

    #[test]
    fn one_way_edges_are_respected() {
        let vs: Vec<_> = (0..3).map(|i| Vertex::new(i, Point::new(i as i32, 0))).collect();
        let mut g = Graph::new();
        g.add(vs.iter().cloned());
        g.edge(&vs[0], &vs[1], 1.0, f64::NAN).unwrap();
        g.edge(&vs[1], &vs[2], 1.0, f64::NAN).unwrap();
        g.connect();
        let e = Estimator::default();
        assert_eq!(astar(&g, &vs[0], &vs[2], &e, true).unwrap().ids(), vec![0, 1, 2]);
        assert!(!astar(&g, &vs[2], &vs[0], &e, true).unwrap().is_found());
    }

    #[test]
    fn cheaper_detour_wins() {
        // a -5-> d, or a -1-> b -1-> c -1-> d
        let vs: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|s| Vertex::new(s.to_string(), ()))
            .collect();
        let mut g = Graph::new();
        g.add(vs.iter().cloned());
        g.edge(&vs[0], &vs[3], 5.0, 5.0).unwrap();
        g.edge(&vs[0], &vs[1], 1.0, 1.0).unwrap();
        g.edge(&vs[1], &vs[2], 1.0, 1.0).unwrap();
        g.edge(&vs[2], &vs[3], 1.0, 1.0).unwrap();
        let zero = |_: &(), _: &()| 0.0;
        let res = astar(&g, &vs[0], &vs[3], &zero, true).unwrap();
        assert_eq!(res.ids(), vec!["a", "b", "c", "d"]);
        assert_eq!(res.cost(), Some(3.0));
        assert_eq!(res.scores["d"].from.as_deref(), Some("c"));
    }

    #[test]
    fn unknown_vertex_is_an_error() {
        let g = grid(&[".."], false);
        let stray = Vertex::new(0, Tile { pos: Point::ZERO, value: b'.' });
        let res = astar(&g, &stray, g.at(1, 0).unwrap(), &Estimator::default(), true);
        assert!(matches!(res, Err(Error::UnknownVertex(_))));
    }

    #[test]
    fn torus_paths_wrap_around() {
        let array = vec![vec![b'.'; 10]; 3];
        let mut graphs = from_array(&array, &open_cost().torus(true)).unwrap();
        let g = graphs.remove(0);
        let e = Estimator::for_grid(g.grid().unwrap());
        let res = find(&g, (1, 1), (9, 1), &e);
        assert_eq!(res.cost(), Some(2.0));
        assert_eq!(res.ids(), vec![11, 10, 19]);
    }

    #[test]
    fn random_maps_match_dijkstra() {
        let mut rng = StdRng::seed_from_u64(42);
        for round in 0..30 {
            let (w, h) = (12, 9);
            let rows: Vec<Vec<u8>> = (0..h)
                .map(|_| {
                    (0..w)
                        .map(|_| if rng.random_range(0..100) < 25 { b'#' } else { b'.' })
                        .collect()
                })
                .collect();
            let diagonals = round % 2 == 1;
            let mut graphs = from_array(&rows, &open_cost().diagonals(diagonals)).unwrap();
            let g = graphs.remove(0);
            let heuristic = Estimator::for_grid(g.grid().unwrap());
            let dijkstra = Estimator::new(Heuristic::Zero, HeuristicOptions::default());
            for _ in 0..20 {
                let a = g.at(rng.random_range(0..w), rng.random_range(0..h)).unwrap();
                let b = g.at(rng.random_range(0..w), rng.random_range(0..h)).unwrap();
                let fast = astar(&g, a, b, &heuristic, true).unwrap();
                let slow = astar(&g, a, b, &dijkstra, false).unwrap();
                assert_eq!(fast.cost(), slow.cost());
                assert_eq!(fast.is_found(), g.connected(a, b, true));
                assert_walkable(&g, &fast);
            }
        }
    }
}
