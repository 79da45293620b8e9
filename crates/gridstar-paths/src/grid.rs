//! Building graph layers from 2D arrays.
//!
//! [`from_array`] turns a rectangular array into one [`Graph`] per layer.
//! Every layer links the same vertices (one per cell, id `y * width + x`)
//! with its own cost function and movement options.

use std::fmt;
use std::rc::Rc;

use gridstar_core::{Point, Range};

use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::vertex::{Positioned, Vertex, VertexRef};

/// Payload of a grid vertex: its cell and the array value found there.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tile<T> {
    pub pos: Point,
    pub value: T,
}

impl<T> Positioned for Tile<T> {
    #[inline]
    fn position(&self) -> Point {
        self.pos
    }
}

/// Array access order.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Order {
    /// `array[y][x]`: rows are outer.
    #[default]
    Yx,
    /// `array[x][y]`: columns are outer.
    Xy,
}

/// Corner cutting policy for diagonal moves.
///
/// The policy looks at the two lateral cells sharing an edge with both the
/// origin and the diagonal target, and at whether the origin links to them.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Cutting {
    /// Link the diagonal when at least one lateral is linked.
    #[default]
    Loose,
    /// Always link the diagonal.
    Always,
    /// Link the diagonal only when both laterals are linked.
    Strict,
}

impl From<Option<bool>> for Cutting {
    /// `Some(false)` is loose, `Some(true)` always cuts and `None` is strict.
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(false) => Cutting::Loose,
            Some(true) => Cutting::Always,
            None => Cutting::Strict,
        }
    }
}

/// Cost of moving between two neighbouring tiles. `NaN` means "no edge".
pub type CostFn<T> = Rc<dyn Fn(&Tile<T>, &Tile<T>) -> f64>;

/// Options for [`from_array`].
#[derive(Clone)]
pub struct GridOptions<T> {
    pub order: Order,
    /// Cost function, uniform `1.0` when `None`.
    pub cost: Option<CostFn<T>>,
    pub torus: bool,
    pub diagonals: bool,
    pub cutting: Cutting,
    /// Per-layer overrides. An empty list builds a single layer.
    pub layers: Vec<LayerOptions<T>>,
}

impl<T> Default for GridOptions<T> {
    fn default() -> Self {
        Self {
            order: Order::Yx,
            cost: None,
            torus: false,
            diagonals: false,
            cutting: Cutting::Loose,
            layers: Vec::new(),
        }
    }
}

impl<T> GridOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn cost(mut self, cost: impl Fn(&Tile<T>, &Tile<T>) -> f64 + 'static) -> Self {
        self.cost = Some(Rc::new(cost));
        self
    }

    pub fn torus(mut self, torus: bool) -> Self {
        self.torus = torus;
        self
    }

    pub fn diagonals(mut self, diagonals: bool) -> Self {
        self.diagonals = diagonals;
        self
    }

    pub fn cutting(mut self, cutting: impl Into<Cutting>) -> Self {
        self.cutting = cutting.into();
        self
    }

    /// Append a layer. Unset fields fall back to the base options.
    pub fn layer(mut self, layer: LayerOptions<T>) -> Self {
        self.layers.push(layer);
        self
    }
}

impl<T> fmt::Debug for GridOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridOptions")
            .field("order", &self.order)
            .field("torus", &self.torus)
            .field("diagonals", &self.diagonals)
            .field("cutting", &self.cutting)
            .field("layers", &self.layers)
            .finish_non_exhaustive()
    }
}

/// Partial override of [`GridOptions`] for one layer.
#[derive(Clone)]
pub struct LayerOptions<T> {
    pub cost: Option<CostFn<T>>,
    pub torus: Option<bool>,
    pub diagonals: Option<bool>,
    pub cutting: Option<Cutting>,
}

impl<T> Default for LayerOptions<T> {
    fn default() -> Self {
        Self {
            cost: None,
            torus: None,
            diagonals: None,
            cutting: None,
        }
    }
}

impl<T> LayerOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cost(mut self, cost: impl Fn(&Tile<T>, &Tile<T>) -> f64 + 'static) -> Self {
        self.cost = Some(Rc::new(cost));
        self
    }

    pub fn torus(mut self, torus: bool) -> Self {
        self.torus = Some(torus);
        self
    }

    pub fn diagonals(mut self, diagonals: bool) -> Self {
        self.diagonals = Some(diagonals);
        self
    }

    pub fn cutting(mut self, cutting: impl Into<Cutting>) -> Self {
        self.cutting = Some(cutting.into());
        self
    }
}

impl<T> fmt::Debug for LayerOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerOptions")
            .field("custom_cost", &self.cost.is_some())
            .field("torus", &self.torus)
            .field("diagonals", &self.diagonals)
            .field("cutting", &self.cutting)
            .finish()
    }
}

/// Shape and movement options a grid layer was built with.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridMeta {
    pub bounds: Range,
    pub torus: bool,
    pub diagonals: bool,
    pub cutting: Cutting,
    pub order: Order,
}

impl GridMeta {
    /// Map size as `(width, height)`.
    #[inline]
    pub fn size(&self) -> Point {
        self.bounds.size()
    }

    /// Vertex id of cell `p`, wrapping on a torus.
    pub fn id(&self, p: Point) -> Option<usize> {
        let p = if self.torus { self.bounds.wrap(p)? } else { p };
        self.bounds.index(p)
    }

    /// Cell of vertex id `id`.
    #[inline]
    pub fn point(&self, id: usize) -> Point {
        self.bounds.point(id)
    }
}

/// A grid vertex.
pub type TileRef<T> = VertexRef<usize, Tile<T>>;

/// Build one graph per layer from a rectangular array.
///
/// All layers share the vertices created for the first one, so payload
/// edits are visible everywhere while each layer keeps its own edges.
/// Straight neighbours are linked first; diagonals are then linked
/// according to the layer's [`Cutting`] policy, judged from the straight
/// edges of the vertex. Each link asks the cost function for both
/// directions.
pub fn from_array<T, R>(array: &[R], options: &GridOptions<T>) -> Result<Vec<Graph<usize, Tile<T>>>>
where
    T: Clone,
    R: AsRef<[T]>,
{
    let outer = array.len();
    let inner = array.first().map_or(0, |r| r.as_ref().len());
    if outer == 0 || inner == 0 {
        return Err(Error::InvalidGrid("empty array".into()));
    }
    if let Some((i, row)) = array
        .iter()
        .enumerate()
        .find(|(_, r)| r.as_ref().len() != inner)
    {
        return Err(Error::InvalidGrid(format!(
            "line {i} has {} cells, expected {inner}",
            row.as_ref().len()
        )));
    }
    let (width, height) = match options.order {
        Order::Yx => (inner, outer),
        Order::Xy => (outer, inner),
    };
    let (Ok(w), Ok(h)) = (i32::try_from(width), i32::try_from(height)) else {
        return Err(Error::InvalidGrid(format!("{width}x{height} is too large")));
    };
    let bounds = Range::sized(w, h);
    let value_at = |p: Point| -> T {
        let (x, y) = (p.x as usize, p.y as usize);
        match options.order {
            Order::Yx => array[y].as_ref()[x].clone(),
            Order::Xy => array[x].as_ref()[y].clone(),
        }
    };

    let base = [LayerOptions::default()];
    let layers = if options.layers.is_empty() {
        &base[..]
    } else {
        &options.layers[..]
    };

    let mut graphs: Vec<Graph<usize, Tile<T>>> = Vec::with_capacity(layers.len());
    for (n, layer) in layers.iter().enumerate() {
        let meta = GridMeta {
            bounds,
            torus: layer.torus.unwrap_or(options.torus),
            diagonals: layer.diagonals.unwrap_or(options.diagonals),
            cutting: layer.cutting.unwrap_or(options.cutting),
            order: options.order,
        };
        let cost = layer.cost.as_ref().or(options.cost.as_ref());
        let mut graph = Graph::new();

        for x in 0..w {
            for y in 0..h {
                let p = Point::new(x, y);
                let id = y as usize * width + x as usize;
                let vertex = match graphs.first().and_then(|g| g.get(&id)) {
                    Some(v) => Rc::clone(v),
                    None => Vertex::new(
                        id,
                        Tile {
                            pos: p,
                            value: value_at(p),
                        },
                    ),
                };
                graph.add([Rc::clone(&vertex)]);
                for q in p.neighbors_4() {
                    link(&mut graph, cost, &vertex, meta.id(q))?;
                }
            }
        }

        if meta.diagonals {
            for x in 0..w {
                for y in 0..h {
                    let p = Point::new(x, y);
                    let Some(vertex) = meta.id(p).and_then(|id| graph.get(&id)).cloned() else {
                        continue;
                    };
                    let lateral = |dx: i32, dy: i32| {
                        graph.adjacent_opt(
                            &vertex,
                            meta.id(p.shift(dx, dy)).and_then(|id| graph.get(&id)),
                        )
                    };
                    let (lx, rx, oy, uy) = (lateral(-1, 0), lateral(1, 0), lateral(0, -1), lateral(0, 1));
                    let laterals = [(lx, oy), (lx, uy), (rx, oy), (rx, uy)];
                    for (q, (across, along)) in p.diagonals().into_iter().zip(laterals) {
                        let linked = match meta.cutting {
                            Cutting::Strict => across && along,
                            Cutting::Loose => across || along,
                            Cutting::Always => true,
                        };
                        if linked {
                            link(&mut graph, cost, &vertex, meta.id(q))?;
                        }
                    }
                }
            }
        }

        let components = graph.connect();
        let cells = (0..bounds.len()).map(|id| graph.slot_of_id(&id)).collect();
        graph.set_grid(meta, cells);
        log::debug!(
            "grid layer {n}: {width}x{height}, torus={}, diagonals={}, cutting={:?}, {components} components",
            meta.torus,
            meta.diagonals,
            meta.cutting,
        );
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("grid layer {n} adjacency:\n{}", graph.debug_table());
        }
        graphs.push(graph);
    }
    Ok(graphs)
}

/// Link `a` with the vertex registered as `b`, if any, in both directions.
fn link<T>(
    graph: &mut Graph<usize, Tile<T>>,
    cost: Option<&CostFn<T>>,
    a: &TileRef<T>,
    b: Option<usize>,
) -> Result<()> {
    let Some(b) = b.and_then(|id| graph.get(&id)).cloned() else {
        return Ok(());
    };
    // Tiny tori wrap onto themselves.
    if Rc::ptr_eq(a, &b) {
        return Ok(());
    }
    let (ab, ba) = match cost {
        Some(cost) => {
            let (ta, tb) = (a.data(), b.data());
            (cost(&ta, &tb), cost(&tb, &ta))
        }
        None => (1.0, 1.0),
    };
    graph.edge(a, &b, ab, ba)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    type Layer = Graph<usize, Tile<i32>>;

    const OPEN: [[i32; 3]; 3] = [[0, 1, 0], [0, 2, 1], [0, 0, 0]];
    const SLOPE: [[i32; 3]; 3] = [[0, 1, 0], [0, 0, 1], [0, 0, 2]];

    fn ascending() -> GridOptions<i32> {
        GridOptions::<i32>::new().cost(|a, b| if a.value <= b.value { 1.0 } else { f64::NAN })
    }

    /// Neighbour counts in row-major order.
    fn counts(g: &Layer) -> Vec<usize> {
        let mut out = Vec::new();
        for y in 0..3 {
            for x in 0..3 {
                out.push(g.neighbors(g.at(x, y).unwrap()).count());
            }
        }
        out
    }

    #[test]
    fn straight_links() {
        let graphs = from_array(&OPEN, &ascending()).unwrap();
        assert_eq!(graphs.len(), 1);
        let g = &graphs[0];
        let v = g.at(2, 1).unwrap();
        assert_eq!(v.data().pos, Point::new(2, 1));
        assert_eq!(v.data().value, 1);
        assert_eq!(*v.id(), 5);
        assert_eq!(g.id_at(1, 2), Some(&7));
        assert!(g.at(3, 0).is_none());
        assert_eq!(counts(g), vec![2, 1, 2, 3, 0, 1, 2, 3, 2]);
    }

    #[test]
    fn diagonal_layers_share_vertices() {
        let options = ascending()
            .diagonals(true)
            .layer(LayerOptions::new().cutting(Some(false)))
            .layer(LayerOptions::new().cutting(Some(true)));
        let graphs = from_array(&SLOPE, &options).unwrap();
        assert_eq!(graphs.len(), 2);
        assert_eq!(counts(&graphs[0]), vec![3, 0, 3, 5, 8, 1, 3, 5, 0]);
        assert_eq!(counts(&graphs[1]), vec![3, 1, 3, 5, 8, 2, 3, 5, 0]);
        assert_eq!(graphs[1].grid().map(|m| m.cutting), Some(Cutting::Always));

        let a = graphs[0].at(1, 1).unwrap();
        let b = graphs[1].at(1, 1).unwrap();
        assert!(Rc::ptr_eq(a, b));
        assert_eq!(a.graph_count(), 2);
    }

    #[test]
    fn strict_diagonals() {
        let map = [[0, 1, 0], [0, 1, 1], [1, 1, 1]];
        let options = GridOptions::new()
            .cost(|a: &Tile<i32>, b: &Tile<i32>| if a.value == b.value { 1.0 } else { f64::NAN })
            .diagonals(true)
            .cutting(None::<bool>);
        let graphs = from_array(&map, &options).unwrap();
        assert_eq!(counts(&graphs[0]), vec![1, 1, 0, 1, 4, 3, 1, 4, 3]);
    }

    #[test]
    fn torus_wraps_links_and_lookups() {
        let graphs = from_array(&OPEN, &ascending().torus(true)).unwrap();
        let g = &graphs[0];
        assert_eq!(counts(g), vec![4, 1, 4, 4, 0, 1, 4, 4, 4]);
        assert_eq!(g.id_at(-1, 0), Some(&2));
        assert_eq!(g.id_at(3, 4), Some(&3));
    }

    #[test]
    fn torus_diagonals() {
        let options = ascending()
            .torus(true)
            .diagonals(true)
            .layer(LayerOptions::new().cutting(Some(false)))
            .layer(LayerOptions::new().cutting(Some(true)));
        let graphs = from_array(&SLOPE, &options).unwrap();
        assert_eq!(counts(&graphs[0]), vec![8, 0, 8, 8, 8, 1, 8, 8, 0]);
        assert_eq!(counts(&graphs[1]), vec![8, 2, 8, 8, 8, 2, 8, 8, 0]);
    }

    #[test]
    fn column_major_order() {
        // Two columns of three cells.
        let map = vec![vec![1, 2, 3], vec![4, 5, 6]];
        let graphs = from_array(&map, &GridOptions::<i32>::new().order(Order::Xy)).unwrap();
        let g = &graphs[0];
        let meta = g.grid().unwrap();
        assert_eq!(meta.size(), Point::new(2, 3));
        assert_eq!(g.at(1, 0).unwrap().data().value, 4);
        assert_eq!(g.at(0, 2).unwrap().data().value, 3);
        assert_eq!(*g.at(1, 2).unwrap().id(), 5);
        // Uniform default cost.
        let (a, b) = (g.at(0, 0).unwrap(), g.at(1, 0).unwrap());
        assert_eq!(g.cost(a, b), 1.0);
        assert_eq!(g.cost(b, a), 1.0);
    }

    #[test]
    fn layer_overrides_cost_and_connects() {
        let map = [[0, 9, 0]];
        let options = GridOptions::<i32>::new()
            .layer(LayerOptions::new())
            .layer(LayerOptions::new().cost(|a, b| {
                if a.value > 5 || b.value > 5 { f64::NAN } else { 1.0 }
            }));
        let graphs = from_array(&map, &options).unwrap();
        let (walk, wade) = (&graphs[0], &graphs[1]);
        let (a, c) = (walk.at(0, 0).unwrap(), walk.at(2, 0).unwrap());
        assert_eq!(walk.marker(a), walk.marker(c));
        assert!(walk.connected(a, c, true));
        assert_ne!(wade.marker(a), wade.marker(c));
        assert!(!wade.connected(a, c, false));
    }

    #[test]
    fn single_cell_torus_has_no_self_loops() {
        let graphs = from_array(&[[7]], &GridOptions::<i32>::new().torus(true).diagonals(true)).unwrap();
        let v = graphs[0].at(5, -3).unwrap();
        assert_eq!(graphs[0].neighbors(v).count(), 0);
    }

    #[test]
    fn rejects_empty_and_ragged_arrays() {
        let empty: [[i32; 0]; 0] = [];
        assert!(matches!(
            from_array(&empty, &GridOptions::<i32>::new()),
            Err(Error::InvalidGrid(_))
        ));
        let ragged = vec![vec![0, 0], vec![0]];
        let err = from_array(&ragged, &GridOptions::<i32>::new()).unwrap_err();
        assert_eq!(err.to_string(), "invalid grid: line 1 has 1 cells, expected 2");
    }

    #[test]
    fn cutting_from_tristate() {
        assert_eq!(Cutting::from(Some(false)), Cutting::Loose);
        assert_eq!(Cutting::from(Some(true)), Cutting::Always);
        assert_eq!(Cutting::from(None), Cutting::Strict);
    }
}

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn grid_meta_roundtrip() {
        let meta = GridMeta {
            bounds: Range::sized(4, 2),
            torus: true,
            diagonals: true,
            cutting: Cutting::Strict,
            order: Order::Xy,
        };
        let json = serde_json::to_string(&meta).unwrap();
        let back: GridMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
    }
}
