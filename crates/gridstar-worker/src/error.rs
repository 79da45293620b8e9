use thiserror::Error;

/// Result alias for planner and worker operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The worker could not be started, or stopped before answering.
    #[error("worker transport failed: {0}")]
    Transport(String),

    /// The worker answered with an error.
    #[error("worker reported: {0}")]
    Remote(String),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Paths(#[from] gridstar_paths::Error),

    /// A [`CostRule::Named`](crate::CostRule::Named) rule is missing from
    /// the registry.
    #[error("no cost rule registered as {0:?}")]
    UnknownRule(String),

    /// A path was requested before any grid was constructed.
    #[error("no grid has been constructed yet")]
    NotConstructed,
}
