//! The state a planner searches: one constructed grid at a time.

use gridstar_paths::{Navigator, Tile};
use serde_json::Value;

use crate::envelope::{Constructed, GridSpec, Method, PathArgs, PathOutput, Request, Response};
use crate::error::{Error, Result};
use crate::rules::RuleRegistry;

/// Owns the grid layers and answers construct and path calls.
///
/// Local planners hold a session directly; offloaded ones run it inside the
/// worker thread, where the graphs are built and stay.
#[derive(Debug)]
pub struct Session {
    registry: RuleRegistry,
    navigator: Option<Navigator<usize, Tile<f64>>>,
}

impl Session {
    pub fn new(registry: RuleRegistry) -> Self {
        Self {
            registry,
            navigator: None,
        }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn navigator(&self) -> Option<&Navigator<usize, Tile<f64>>> {
        self.navigator.as_ref()
    }

    /// Build a grid, replacing the current one. On error the current grid
    /// is kept.
    pub fn construct(&mut self, spec: &GridSpec) -> Result<Constructed> {
        let navigator = spec.build(&self.registry)?;
        let summary = Constructed {
            layers: navigator.layers().len(),
            cells: navigator.layers().first().map_or(0, |g| g.len()),
        };
        log::debug!("constructed {} layer(s) of {} cells", summary.layers, summary.cells);
        self.navigator = Some(navigator);
        Ok(summary)
    }

    pub fn path(&self, args: &PathArgs) -> Result<PathOutput> {
        let navigator = self.navigator.as_ref().ok_or(Error::NotConstructed)?;
        let found = navigator.path(&args.start, &args.goal, &args.options)?;
        Ok(found.into())
    }

    /// Answer a request envelope. Failures are reported in the response.
    pub fn handle(&mut self, request: Request) -> Response {
        let Request { method, id, args } = request;
        match self.dispatch(method, args) {
            Ok(output) => Response::ok(method, id, output),
            Err(e) => {
                log::debug!("request {id} ({method:?}) failed: {e}");
                Response::failed(method, id, e)
            }
        }
    }

    fn dispatch(&mut self, method: Method, args: Value) -> Result<Value> {
        let output = match method {
            Method::Construct => {
                let spec: GridSpec = serde_json::from_value(args)?;
                serde_json::to_value(self.construct(&spec)?)?
            }
            Method::Path => {
                let args: PathArgs = serde_json::from_value(args)?;
                serde_json::to_value(self.path(&args)?)?
            }
        };
        Ok(output)
    }
}
