//! Pathfinding over layered weighted graphs.
//!
//! A set of [`Vertex`]es can be registered in several [`Graph`]s at once,
//! each graph holding its own directed, weighted edges. The grid builder
//! ([`from_array`]) turns a 2D array into one graph per cost layer, all
//! sharing the same vertices.
//!
//! - **A\*** shortest-path search ([`astar`])
//! - **Jump Point Search** for uniform-cost grid layers ([`jps`])
//! - **Connectivity markers** for fast "no path" answers
//!   ([`Graph::connect`], [`Graph::connected`])
//! - **Heuristics** with torus-aware variants ([`Heuristic`], [`Estimator`])
//!
//! [`Navigator`] bundles the layers of a map and answers queries by id.
//!
//! ```
//! use gridstar_paths::{GridOptions, Navigator, PathOptions};
//!
//! let map = ["..#", "...", "#.."];
//! let rows: Vec<Vec<char>> = map.iter().map(|r| r.chars().collect()).collect();
//! let options = GridOptions::<char>::new()
//!     .cost(|a, b| if a.value == '#' || b.value == '#' { f64::NAN } else { 1.0 });
//! let nav = Navigator::from_grid(&rows, &options).unwrap();
//! let found = nav.path(&0, &8, &PathOptions::default()).unwrap();
//! assert_eq!(found.cost(), Some(4.0));
//! ```

mod astar;
mod distance;
mod error;
mod graph;
mod grid;
mod jps;
mod navigator;
mod vertex;

pub use astar::{PathResult, Score, astar};
pub use distance::{Estimate, Estimator, Heuristic, HeuristicOptions, chebyshev, manhattan, wrapped_delta};
pub use error::{Error, Result};
pub use graph::{Edges, Graph, Neighbors};
pub use grid::{CostFn, Cutting, GridMeta, GridOptions, LayerOptions, Order, Tile, TileRef, from_array};
pub use jps::jps;
pub use navigator::{Navigator, PathOptions};
pub use vertex::{GraphId, Positioned, Vertex, VertexId, VertexRef};

pub use gridstar_core::Point;
