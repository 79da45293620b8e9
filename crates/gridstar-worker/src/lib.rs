//! Run gridstar path queries locally or on a dedicated worker thread.
//!
//! Graphs are not `Send`, so an offloaded grid is built inside the worker
//! from a serializable [`GridSpec`] and stays there. Cost logic is picked
//! from the closed [`CostRule`] set, or registered by name in a
//! [`RuleRegistry`] before the worker starts.
//!
//! ```no_run
//! use gridstar_worker::{CostRule, GridSpec, PathArgs, Planner, RuleRegistry};
//!
//! let mut planner = Planner::offloaded(RuleRegistry::new())?;
//! planner.construct(&GridSpec::new(vec![vec![0.0; 8]; 8]).cost(CostRule::Uniform))?;
//! let out = planner.path(&PathArgs { start: 0, goal: 63, options: Default::default() })?;
//! assert_eq!(out.cost, Some(14.0));
//! # Ok::<(), gridstar_worker::Error>(())
//! ```

mod envelope;
mod error;
mod planner;
mod rules;
mod session;
mod worker;

pub use envelope::{Constructed, GridSpec, LayerSpec, Method, PathArgs, PathOutput, Request, Response};
pub use error::{Error, Result};
pub use planner::{ExecutionMode, Planner};
pub use rules::{CostRule, RuleRegistry, SharedRule};
pub use session::Session;
pub use worker::{Ticket, Worker};
