use thiserror::Error;

/// Convenient result alias for graph construction and path queries.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by graph mutation, grid construction and path queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// An edge was requested between vertices that are not both registered
    /// in the graph. The graph is left untouched.
    #[error("vertices must share a graph: {a} and {b}")]
    Structural { a: String, b: String },

    /// No route exists between the endpoints and the caller asked for a
    /// hard failure instead of an empty path.
    #[error("no path found between {start} and {goal}")]
    PathNotFound { start: String, goal: String },

    /// The requested search variant cannot run on this graph.
    #[error("unsupported configuration: {0}")]
    Unsupported(String),

    /// A query referenced an id that is not registered in the layer.
    #[error("unknown vertex {0}")]
    UnknownVertex(String),

    /// A query referenced a layer that does not exist.
    #[error("layer {layer} does not exist ({layers} layers available)")]
    UnknownLayer { layer: usize, layers: usize },

    /// The input array cannot be turned into a grid.
    #[error("invalid grid: {0}")]
    InvalidGrid(String),
}
