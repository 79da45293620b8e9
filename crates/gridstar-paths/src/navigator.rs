//! Query facade over the cost layers of one map.

use crate::astar::{PathResult, astar};
use crate::distance::{Estimate, Estimator, Heuristic, HeuristicOptions};
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::grid::{GridOptions, Tile, from_array};
use crate::jps::jps;
use crate::vertex::{Positioned, VertexId};

/// Options of a path query.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PathOptions {
    /// Index of the cost layer to search.
    pub layer: usize,
    /// Heuristic to use. `None` picks one from the grid metadata of the
    /// layer, or Manhattan distance for layers without one.
    pub heuristic: Option<Heuristic>,
    /// Tuning of the heuristic. `None` uses the options that come with the
    /// chosen heuristic.
    pub heuristic_options: Option<HeuristicOptions>,
    /// Use jump point search instead of plain A*.
    pub jps: bool,
    /// Report a missing path as [`Error::PathNotFound`] instead of an empty
    /// result.
    pub fail: bool,
    /// Skip the search when connectivity markers rule a path out.
    pub precheck: bool,
}

impl Default for PathOptions {
    fn default() -> Self {
        Self {
            layer: 0,
            heuristic: None,
            heuristic_options: None,
            jps: false,
            fail: false,
            precheck: true,
        }
    }
}

impl PathOptions {
    pub fn layer(mut self, layer: usize) -> Self {
        self.layer = layer;
        self
    }

    pub fn heuristic(mut self, heuristic: Heuristic) -> Self {
        self.heuristic = Some(heuristic);
        self
    }

    pub fn heuristic_options(mut self, options: HeuristicOptions) -> Self {
        self.heuristic_options = Some(options);
        self
    }

    pub fn jps(mut self, jps: bool) -> Self {
        self.jps = jps;
        self
    }

    pub fn fail(mut self, fail: bool) -> Self {
        self.fail = fail;
        self
    }

    pub fn precheck(mut self, precheck: bool) -> Self {
        self.precheck = precheck;
        self
    }
}

/// The cost layers of a map, queried by vertex id.
///
/// Layers normally share their vertices (see [`from_array`]), so a path
/// found on one layer is made of the same vertex objects as the others.
#[derive(Debug)]
pub struct Navigator<K, D> {
    layers: Vec<Graph<K, D>>,
}

impl<K: VertexId, D> Navigator<K, D> {
    pub fn new(layers: Vec<Graph<K, D>>) -> Self {
        Self { layers }
    }

    pub fn layers(&self) -> &[Graph<K, D>] {
        &self.layers
    }

    pub fn layer(&self, layer: usize) -> Result<&Graph<K, D>> {
        let layers = self.layers.len();
        self.layers
            .get(layer)
            .ok_or(Error::UnknownLayer { layer, layers })
    }

    /// Mutable access to a layer, e.g. to edit edges. Call
    /// [`Graph::connect`] afterwards to refresh its markers.
    pub fn layer_mut(&mut self, layer: usize) -> Result<&mut Graph<K, D>> {
        let layers = self.layers.len();
        self.layers
            .get_mut(layer)
            .ok_or(Error::UnknownLayer { layer, layers })
    }

    pub fn into_layers(self) -> Vec<Graph<K, D>> {
        self.layers
    }
}

impl<T: Clone> Navigator<usize, Tile<T>> {
    /// Build the layers of a 2D array with [`from_array`].
    pub fn from_grid<R: AsRef<[T]>>(array: &[R], options: &GridOptions<T>) -> Result<Self> {
        Ok(Self::new(from_array(array, options)?))
    }
}

impl<K: VertexId, D: Positioned> Navigator<K, D> {
    /// Estimator a query with `options` runs with on `graph`.
    ///
    /// Without explicit heuristic options, a toroidal layer lends its size
    /// to whichever heuristic is used.
    pub fn estimator(graph: &Graph<K, D>, options: &PathOptions) -> Estimator {
        let mut estimator = match (options.heuristic, graph.grid()) {
            (None, Some(meta)) => Estimator::for_grid(meta),
            (heuristic, meta) => Estimator::new(
                heuristic.unwrap_or(Heuristic::Manhattan),
                HeuristicOptions {
                    torus: meta.and_then(|m| m.torus.then(|| m.size())),
                    ..HeuristicOptions::default()
                },
            ),
        };
        if let Some(tuning) = options.heuristic_options {
            estimator.options = tuning;
        }
        estimator
    }

    /// Find a path between two vertex ids.
    pub fn path(&self, start: &K, goal: &K, options: &PathOptions) -> Result<PathResult<K, D>> {
        let graph = self.layer(options.layer)?;
        let estimator = Self::estimator(graph, options);
        log::debug!(
            "path {start:?} -> {goal:?} on layer {} with {:?}",
            options.layer,
            estimator.heuristic
        );
        self.path_with(start, goal, &estimator, options)
    }

    /// Find a path with a custom estimate. The heuristic fields of
    /// `options` are ignored.
    pub fn path_with<E>(
        &self,
        start: &K,
        goal: &K,
        estimate: &E,
        options: &PathOptions,
    ) -> Result<PathResult<K, D>>
    where
        E: Estimate<D> + ?Sized,
    {
        let graph = self.layer(options.layer)?;
        let lookup = |id: &K| {
            graph
                .get(id)
                .ok_or_else(|| Error::UnknownVertex(format!("{id:?}")))
        };
        let (s, g) = (lookup(start)?, lookup(goal)?);
        let found = if options.jps {
            jps(graph, s, g, estimate, options.precheck)?
        } else {
            astar(graph, s, g, estimate, options.precheck)?
        };
        if options.fail && !found.is_found() {
            return Err(Error::PathNotFound {
                start: format!("{start:?}"),
                goal: format!("{goal:?}"),
            });
        }
        Ok(found)
    }
}
