//! Vertices shared between graphs.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use gridstar_core::Point;

/// Identity type usable as a vertex id.
///
/// Blanket-implemented for every `Eq + Hash + Clone + Debug` type, so plain
/// integers and strings both work.
pub trait VertexId: Eq + Hash + Clone + fmt::Debug {}

impl<T: Eq + Hash + Clone + fmt::Debug> VertexId for T {}

/// Opaque handle identifying one [`Graph`](crate::Graph) instance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphId(pub(crate) u64);

/// Shared reference to a vertex. The same vertex may sit in several graphs.
pub type VertexRef<K, D> = Rc<Vertex<K, D>>;

/// A vertex: an id, a payload and the slot it occupies in each graph it
/// belongs to.
///
/// Edges are not stored here. Every graph keeps the adjacency table of its
/// members in its own arena, addressed by the slot recorded on the vertex,
/// so one vertex can carry independent edge sets in several layers while
/// its payload stays shared.
pub struct Vertex<K, D> {
    id: K,
    data: RefCell<D>,
    slots: RefCell<Vec<(GraphId, usize)>>,
}

impl<K, D> Vertex<K, D> {
    /// Create a vertex that does not belong to any graph yet.
    pub fn new(id: K, data: D) -> VertexRef<K, D> {
        Rc::new(Self {
            id,
            data: RefCell::new(data),
            slots: RefCell::new(Vec::new()),
        })
    }

    /// Vertex id.
    #[inline]
    pub fn id(&self) -> &K {
        &self.id
    }

    /// Borrow the payload.
    ///
    /// # Panics
    ///
    /// Panics if the payload is currently mutably borrowed.
    #[inline]
    pub fn data(&self) -> Ref<'_, D> {
        self.data.borrow()
    }

    /// Mutably borrow the payload. Changes are visible from every graph
    /// holding this vertex.
    ///
    /// # Panics
    ///
    /// Panics if the payload is currently borrowed.
    #[inline]
    pub fn data_mut(&self) -> RefMut<'_, D> {
        self.data.borrow_mut()
    }

    /// Replace the payload, returning the previous one.
    pub fn replace_data(&self, data: D) -> D {
        self.data.replace(data)
    }

    /// Number of graphs this vertex is registered in.
    pub fn graph_count(&self) -> usize {
        self.slots.borrow().len()
    }

    /// Whether this vertex is registered in `graph`.
    pub fn belongs_to(&self, graph: GraphId) -> bool {
        self.slot(graph).is_some()
    }

    pub(crate) fn slot(&self, graph: GraphId) -> Option<usize> {
        self.slots
            .borrow()
            .iter()
            .find(|(g, _)| *g == graph)
            .map(|&(_, s)| s)
    }

    pub(crate) fn attach(&self, graph: GraphId, slot: usize) {
        let mut slots = self.slots.borrow_mut();
        match slots.iter_mut().find(|(g, _)| *g == graph) {
            Some(entry) => entry.1 = slot,
            None => slots.push((graph, slot)),
        }
    }

    pub(crate) fn detach(&self, graph: GraphId) {
        self.slots.borrow_mut().retain(|(g, _)| *g != graph);
    }
}

impl<K: fmt::Debug, D: fmt::Debug> fmt::Debug for Vertex<K, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vertex")
            .field("id", &self.id)
            .field("data", &self.data)
            .field("graphs", &self.slots.borrow().len())
            .finish()
    }
}

/// Payloads that carry grid coordinates.
///
/// Heuristics and jump point search read positions through this trait.
pub trait Positioned {
    fn position(&self) -> Point;
}

impl Positioned for Point {
    #[inline]
    fn position(&self) -> Point {
        *self
    }
}
