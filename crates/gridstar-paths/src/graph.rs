//! Weighted directed graphs over shared vertices.
//!
//! A [`Graph`] owns the adjacency table of each registered vertex in a slot
//! arena. The slot a vertex occupies is recorded on the vertex itself, so a
//! vertex can sit in several graphs (cost layers) with a separate table in
//! each.

use std::borrow::Borrow;
use std::collections::{HashMap, VecDeque};
use std::fmt::{self, Write as _};
use std::hash::Hash;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use gridstar_core::Point;

use crate::error::{Error, Result};
use crate::grid::GridMeta;
use crate::vertex::{GraphId, VertexId, VertexRef};

static NEXT_GRAPH: AtomicU64 = AtomicU64::new(1);

struct Entry<K, D> {
    vertex: VertexRef<K, D>,
    /// Outgoing edges `(target slot, cost)` in creation order.
    outgoing: Vec<(usize, f64)>,
    /// Slots with an edge pointing here.
    incoming: Vec<usize>,
    marker: Option<u32>,
}

/// Grid metadata plus the cell → slot table.
struct Lattice {
    meta: GridMeta,
    cells: Vec<Option<usize>>,
}

/// A weighted directed graph.
///
/// Costs are `f64`. `NaN` is the "no edge" sentinel: setting a direction to
/// `NaN` removes it, and [`cost`](Self::cost) reports `NaN` for non-adjacent
/// pairs.
///
/// Connectivity markers computed by [`connect`](Self::connect) are a cache:
/// they are not refreshed when edges change afterwards.
pub struct Graph<K, D> {
    id: GraphId,
    registry: HashMap<K, usize>,
    entries: Vec<Option<Entry<K, D>>>,
    free: Vec<usize>,
    lattice: Option<Lattice>,
}

impl<K: VertexId, D> Default for Graph<K, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: VertexId, D> Graph<K, D> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            id: GraphId(NEXT_GRAPH.fetch_add(1, Ordering::Relaxed)),
            registry: HashMap::new(),
            entries: Vec::new(),
            free: Vec::new(),
            lattice: None,
        }
    }

    /// Handle identifying this graph on its vertices.
    #[inline]
    pub fn id(&self) -> GraphId {
        self.id
    }

    /// Number of registered vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Register vertices. Ids that are already registered are skipped.
    pub fn add<I>(&mut self, vertices: I) -> &mut Self
    where
        I: IntoIterator<Item = VertexRef<K, D>>,
    {
        for vertex in vertices {
            if self.registry.contains_key(vertex.id()) {
                continue;
            }
            let entry = Entry {
                vertex: Rc::clone(&vertex),
                outgoing: Vec::new(),
                incoming: Vec::new(),
                marker: None,
            };
            let slot = match self.free.pop() {
                Some(slot) => {
                    self.entries[slot] = Some(entry);
                    slot
                }
                None => {
                    self.entries.push(Some(entry));
                    self.entries.len() - 1
                }
            };
            vertex.attach(self.id, slot);
            self.registry.insert(vertex.id().clone(), slot);
        }
        self
    }

    /// Unregister vertices, dropping every edge that starts or ends at them.
    /// Vertices that are not registered are ignored.
    pub fn delete<'a, I>(&mut self, vertices: I) -> &mut Self
    where
        I: IntoIterator<Item = &'a VertexRef<K, D>>,
        K: 'a,
        D: 'a,
    {
        for vertex in vertices {
            let Some(slot) = self.slot_of(vertex) else {
                continue;
            };
            let Some(entry) = self.entries[slot].take() else {
                continue;
            };
            for &(target, _) in &entry.outgoing {
                if let Some(t) = self.entries[target].as_mut() {
                    t.incoming.retain(|&s| s != slot);
                }
            }
            for &source in &entry.incoming {
                if let Some(s) = self.entries[source].as_mut() {
                    s.outgoing.retain(|&(t, _)| t != slot);
                }
            }
            if let Some(lattice) = self.lattice.as_mut() {
                for cell in lattice.cells.iter_mut().filter(|c| **c == Some(slot)) {
                    *cell = None;
                }
            }
            self.registry.remove(vertex.id());
            vertex.detach(self.id);
            self.free.push(slot);
        }
        self
    }

    /// Set the cost of both directions between `a` and `b`.
    ///
    /// `ab` is the cost of moving from `a` to `b` and `ba` the reverse; a
    /// `NaN` removes that direction. Fails without touching the graph when
    /// either vertex is not registered here.
    pub fn edge(
        &mut self,
        a: &VertexRef<K, D>,
        b: &VertexRef<K, D>,
        ab: f64,
        ba: f64,
    ) -> Result<&mut Self> {
        let (sa, sb) = self.pair(a, b)?;
        self.link(sa, sb, ab);
        self.link(sb, sa, ba);
        Ok(self)
    }

    /// Set the cost of the single direction `a → b`. `NaN` removes it.
    pub fn set_cost(
        &mut self,
        a: &VertexRef<K, D>,
        b: &VertexRef<K, D>,
        cost: f64,
    ) -> Result<&mut Self> {
        let (sa, sb) = self.pair(a, b)?;
        self.link(sa, sb, cost);
        Ok(self)
    }

    /// Cost of moving from `a` to `b`, `NaN` when not adjacent.
    pub fn cost(&self, a: &VertexRef<K, D>, b: &VertexRef<K, D>) -> f64 {
        match (self.slot_of(a), self.slot_of(b)) {
            (Some(sa), Some(sb)) => self.slot_cost(sa, sb),
            _ => f64::NAN,
        }
    }

    /// Whether an edge `a → b` exists.
    pub fn adjacent(&self, a: &VertexRef<K, D>, b: &VertexRef<K, D>) -> bool {
        !self.cost(a, b).is_nan()
    }

    /// Like [`adjacent`](Self::adjacent), with a missing target never
    /// adjacent. Handy when probing cells that may be off the grid.
    pub fn adjacent_opt(&self, a: &VertexRef<K, D>, b: Option<&VertexRef<K, D>>) -> bool {
        b.is_some_and(|b| self.adjacent(a, b))
    }

    /// Targets of the outgoing edges of `v`, in edge creation order.
    ///
    /// Updating an existing edge keeps its position; removing and recreating
    /// it moves it last.
    pub fn neighbors(&self, v: &VertexRef<K, D>) -> Neighbors<'_, K, D> {
        Neighbors(self.edges(v))
    }

    /// Outgoing edges of `v` with their costs.
    pub fn edges(&self, v: &VertexRef<K, D>) -> Edges<'_, K, D> {
        let outgoing = self
            .slot_of(v)
            .map(|s| self.outgoing(s))
            .unwrap_or_default();
        Edges {
            graph: self,
            iter: outgoing.iter(),
        }
    }

    /// Registered vertex with the given id.
    pub fn get<Q>(&self, id: &Q) -> Option<&VertexRef<K, D>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = *self.registry.get(id)?;
        self.vertex_at_slot(slot)
    }

    /// Whether a vertex with the given id is registered.
    pub fn contains<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.registry.contains_key(id)
    }

    /// Whether this exact vertex is registered.
    pub fn contains_vertex(&self, v: &VertexRef<K, D>) -> bool {
        self.slot_of(v).is_some()
    }

    /// Iterate over the registered vertices in slot order.
    pub fn vertices(&self) -> impl Iterator<Item = &VertexRef<K, D>> {
        self.entries.iter().flatten().map(|e| &e.vertex)
    }

    // -----------------------------------------------------------------------
    // Connectivity
    // -----------------------------------------------------------------------

    /// Label weakly connected components, ignoring edge direction.
    ///
    /// Every registered vertex receives a marker starting from 1; returns
    /// the number of components.
    pub fn connect(&mut self) -> u32 {
        for entry in self.entries.iter_mut().flatten() {
            entry.marker = None;
        }
        let mut marker = 0;
        let mut stack = Vec::new();
        for start in 0..self.entries.len() {
            if !matches!(&self.entries[start], Some(e) if e.marker.is_none()) {
                continue;
            }
            marker += 1;
            stack.push(start);
            while let Some(slot) = stack.pop() {
                let Some(entry) = self.entries[slot].as_mut() else {
                    continue;
                };
                if entry.marker.is_some() {
                    continue;
                }
                entry.marker = Some(marker);
                stack.extend(entry.outgoing.iter().map(|&(t, _)| t));
                stack.extend(entry.incoming.iter().copied());
            }
        }
        log::debug!("labelled {} vertices into {marker} components", self.len());
        marker
    }

    /// Connectivity marker of `v` from the last [`connect`](Self::connect).
    pub fn marker(&self, v: &VertexRef<K, D>) -> Option<u32> {
        self.entries[self.slot_of(v)?].as_ref()?.marker
    }

    /// Whether `b` may be reached from `a`.
    ///
    /// With `exact = false` this compares the markers, which only proves
    /// weak connectivity. With `exact = true` a breadth-first search over
    /// outgoing edges, restricted to the shared component, confirms a
    /// directed route. Vertices without a marker are always searched.
    pub fn connected(&self, a: &VertexRef<K, D>, b: &VertexRef<K, D>, exact: bool) -> bool {
        let (Some(sa), Some(sb)) = (self.slot_of(a), self.slot_of(b)) else {
            return false;
        };
        if sa == sb {
            return true;
        }
        match (self.slot_marker(sa), self.slot_marker(sb)) {
            (Some(ma), Some(mb)) if ma != mb => false,
            (Some(_), Some(_)) if !exact => true,
            (Some(m), Some(_)) => self.reaches(sa, sb, Some(m)),
            _ => self.reaches(sa, sb, None),
        }
    }

    fn reaches(&self, from: usize, to: usize, within: Option<u32>) -> bool {
        let mut seen = vec![false; self.entries.len()];
        let mut queue = VecDeque::new();
        seen[from] = true;
        queue.push_back(from);
        while let Some(slot) = queue.pop_front() {
            if slot == to {
                return true;
            }
            for &(next, _) in self.outgoing(slot) {
                if seen[next] {
                    continue;
                }
                if within.is_some() && self.slot_marker(next) != within {
                    continue;
                }
                seen[next] = true;
                queue.push_back(next);
            }
        }
        false
    }

    // -----------------------------------------------------------------------
    // Grid access
    // -----------------------------------------------------------------------

    /// Grid metadata, when this graph was produced by the grid builder.
    pub fn grid(&self) -> Option<&GridMeta> {
        self.lattice.as_ref().map(|l| &l.meta)
    }

    /// Vertex at grid coordinates `(x, y)`. Coordinates wrap on a torus and
    /// are otherwise `None` when out of bounds.
    pub fn at(&self, x: i32, y: i32) -> Option<&VertexRef<K, D>> {
        self.vertex_at_slot(self.cell_slot(Point::new(x, y))?)
    }

    /// Id of the vertex at grid coordinates `(x, y)`.
    pub fn id_at(&self, x: i32, y: i32) -> Option<&K> {
        self.at(x, y).map(|v| v.id())
    }

    // -----------------------------------------------------------------------
    // Crate internals
    // -----------------------------------------------------------------------

    fn pair(&self, a: &VertexRef<K, D>, b: &VertexRef<K, D>) -> Result<(usize, usize)> {
        match (self.slot_of(a), self.slot_of(b)) {
            (Some(sa), Some(sb)) => Ok((sa, sb)),
            _ => Err(Error::Structural {
                a: format!("{:?}", a.id()),
                b: format!("{:?}", b.id()),
            }),
        }
    }

    fn link(&mut self, from: usize, to: usize, cost: f64) {
        let Some(source) = self.entries[from].as_mut() else {
            return;
        };
        let existing = source.outgoing.iter().position(|&(t, _)| t == to);
        match (existing, cost.is_nan()) {
            (Some(i), false) => source.outgoing[i].1 = cost,
            (None, false) => {
                source.outgoing.push((to, cost));
                if let Some(target) = self.entries[to].as_mut() {
                    target.incoming.push(from);
                }
            }
            (Some(i), true) => {
                source.outgoing.remove(i);
                if let Some(target) = self.entries[to].as_mut() {
                    target.incoming.retain(|&s| s != from);
                }
            }
            (None, true) => {}
        }
    }

    fn slot_marker(&self, slot: usize) -> Option<u32> {
        self.entries.get(slot)?.as_ref()?.marker
    }

    /// Slot of `v` in this graph, if registered.
    pub(crate) fn slot_of(&self, v: &VertexRef<K, D>) -> Option<usize> {
        let slot = v.slot(self.id)?;
        match self.entries.get(slot)? {
            Some(e) if Rc::ptr_eq(&e.vertex, v) => Some(slot),
            _ => None,
        }
    }

    pub(crate) fn slot_of_id(&self, id: &K) -> Option<usize> {
        self.registry.get(id).copied()
    }

    pub(crate) fn vertex_at_slot(&self, slot: usize) -> Option<&VertexRef<K, D>> {
        self.entries.get(slot)?.as_ref().map(|e| &e.vertex)
    }

    pub(crate) fn outgoing(&self, slot: usize) -> &[(usize, f64)] {
        match self.entries.get(slot) {
            Some(Some(e)) => &e.outgoing,
            _ => &[],
        }
    }

    pub(crate) fn has_incoming(&self, slot: usize) -> bool {
        matches!(self.entries.get(slot), Some(Some(e)) if !e.incoming.is_empty())
    }

    pub(crate) fn slot_cost(&self, from: usize, to: usize) -> f64 {
        self.outgoing(from)
            .iter()
            .find(|&&(t, _)| t == to)
            .map_or(f64::NAN, |&(_, c)| c)
    }

    /// Upper bound (exclusive) of slot numbers, for per-slot scratch tables.
    pub(crate) fn slot_capacity(&self) -> usize {
        self.entries.len()
    }

    /// Fast search pre-check: false only when both markers are known and
    /// differ.
    pub(crate) fn may_connect(&self, a: usize, b: usize) -> bool {
        match (self.slot_marker(a), self.slot_marker(b)) {
            (Some(ma), Some(mb)) => ma == mb,
            _ => true,
        }
    }

    pub(crate) fn cell_slot(&self, p: Point) -> Option<usize> {
        let lattice = self.lattice.as_ref()?;
        let bounds = lattice.meta.bounds;
        let p = if lattice.meta.torus { bounds.wrap(p)? } else { p };
        lattice.cells.get(bounds.index(p)?).copied().flatten()
    }

    pub(crate) fn set_grid(&mut self, meta: GridMeta, cells: Vec<Option<usize>>) {
        self.lattice = Some(Lattice { meta, cells });
    }
}

impl<K: VertexId, D> Graph<K, D> {
    /// Human readable dump of the adjacency tables, one vertex per line.
    pub fn debug_table(&self) -> String {
        let mut out = String::new();
        for entry in self.entries.iter().flatten() {
            let _ = write!(out, "{:?}", entry.vertex.id());
            if let Some(m) = entry.marker {
                let _ = write!(out, " #{m}");
            }
            out.push_str(" ->");
            for &(target, cost) in &entry.outgoing {
                if let Some(t) = self.vertex_at_slot(target) {
                    let _ = write!(out, " {:?}:{cost}", t.id());
                }
            }
            out.push('\n');
        }
        out
    }
}

impl<K, D> Drop for Graph<K, D> {
    fn drop(&mut self) {
        for entry in self.entries.iter().flatten() {
            entry.vertex.detach(self.id);
        }
    }
}

impl<K: fmt::Debug, D> fmt::Debug for Graph<K, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.id)
            .field("vertices", &self.registry.len())
            .field("grid", &self.lattice.as_ref().map(|l| l.meta))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Iterators
// ---------------------------------------------------------------------------

/// Outgoing edges of a vertex as `(target, cost)` pairs.
pub struct Edges<'a, K, D> {
    graph: &'a Graph<K, D>,
    iter: std::slice::Iter<'a, (usize, f64)>,
}

impl<'a, K: VertexId, D> Iterator for Edges<'a, K, D> {
    type Item = (&'a VertexRef<K, D>, f64);

    fn next(&mut self) -> Option<Self::Item> {
        let &(slot, cost) = self.iter.next()?;
        self.graph.vertex_at_slot(slot).map(|v| (v, cost))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

/// Targets of the outgoing edges of a vertex.
pub struct Neighbors<'a, K, D>(Edges<'a, K, D>);

impl<'a, K: VertexId, D> Iterator for Neighbors<'a, K, D> {
    type Item = &'a VertexRef<K, D>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(v, _)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}
