//! One entry point for both execution modes.

use crate::envelope::{Constructed, GridSpec, PathArgs, PathOutput};
use crate::error::Result;
use crate::rules::RuleRegistry;
use crate::session::Session;
use crate::worker::Worker;

/// Where a planner runs its searches.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExecutionMode {
    /// On the calling thread.
    #[default]
    Local,
    /// On a dedicated [`Worker`] thread.
    Offloaded,
}

enum Backend {
    Local(Session),
    Offloaded(Worker),
}

/// Builds a grid and answers path queries, locally or through a worker.
///
/// The mode is chosen by the caller and never inferred. Both modes take
/// the same [`GridSpec`] and [`PathArgs`] and return the same outputs.
pub struct Planner {
    backend: Backend,
}

impl Planner {
    pub fn new(mode: ExecutionMode, registry: RuleRegistry) -> Result<Self> {
        let backend = match mode {
            ExecutionMode::Local => Backend::Local(Session::new(registry)),
            ExecutionMode::Offloaded => Backend::Offloaded(Worker::spawn(registry)?),
        };
        log::debug!("planner running {mode:?}");
        Ok(Self { backend })
    }

    pub fn local(registry: RuleRegistry) -> Self {
        Self {
            backend: Backend::Local(Session::new(registry)),
        }
    }

    pub fn offloaded(registry: RuleRegistry) -> Result<Self> {
        Self::new(ExecutionMode::Offloaded, registry)
    }

    pub fn mode(&self) -> ExecutionMode {
        match self.backend {
            Backend::Local(_) => ExecutionMode::Local,
            Backend::Offloaded(_) => ExecutionMode::Offloaded,
        }
    }

    /// Build the grid later queries run on.
    pub fn construct(&mut self, spec: &GridSpec) -> Result<Constructed> {
        match &mut self.backend {
            Backend::Local(session) => session.construct(spec),
            Backend::Offloaded(worker) => worker.construct(spec)?.wait(),
        }
    }

    pub fn path(&mut self, args: &PathArgs) -> Result<PathOutput> {
        match &mut self.backend {
            Backend::Local(session) => session.path(args),
            Backend::Offloaded(worker) => worker.path(args)?.wait(),
        }
    }

    /// The worker behind an offloaded planner, to queue several requests
    /// before waiting on them.
    pub fn worker(&self) -> Option<&Worker> {
        match &self.backend {
            Backend::Local(_) => None,
            Backend::Offloaded(worker) => Some(worker),
        }
    }
}
