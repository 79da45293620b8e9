//! Cost rules that can cross a thread boundary.
//!
//! Cost closures cannot be sent to the worker, so a grid names its rule: one
//! of the built-in variants, or a closure registered under a name in the
//! [`RuleRegistry`] the worker was spawned with.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use gridstar_paths::{CostFn, Tile};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Cost of moving between two cells of a numeric grid.
///
/// Every built-in rule yields `1.0` for an allowed move and `NaN` (no edge)
/// otherwise, except [`Terrain`](CostRule::Terrain).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostRule {
    /// Every move is allowed.
    #[default]
    Uniform,
    /// Moves never go down: allowed when `a <= b`.
    Ascending,
    /// Both cells must hold at most `max`.
    Passable { max: f64 },
    /// Entering a cell costs its value; negative values are walls.
    Terrain,
    /// A closure from the registry.
    Named(String),
}

impl CostRule {
    /// Turn the rule into a cost function for the grid builder.
    pub fn resolve(&self, registry: &RuleRegistry) -> Result<CostFn<f64>> {
        let cost = match *self {
            CostRule::Uniform => cost_fn(|_, _| 1.0),
            CostRule::Ascending => cost_fn(|a, b| if a.value <= b.value { 1.0 } else { f64::NAN }),
            CostRule::Passable { max } => cost_fn(move |a, b| {
                if a.value <= max && b.value <= max {
                    1.0
                } else {
                    f64::NAN
                }
            }),
            CostRule::Terrain => cost_fn(|_, b| if b.value < 0.0 { f64::NAN } else { b.value }),
            CostRule::Named(ref name) => {
                let rule = registry
                    .get(name)
                    .ok_or_else(|| Error::UnknownRule(name.clone()))?;
                cost_fn(move |a, b| rule(a, b))
            }
        };
        Ok(cost)
    }
}

fn cost_fn(f: impl Fn(&Tile<f64>, &Tile<f64>) -> f64 + 'static) -> CostFn<f64> {
    Rc::new(f)
}

/// A cost closure that may be shared with the worker thread.
pub type SharedRule = Arc<dyn Fn(&Tile<f64>, &Tile<f64>) -> f64 + Send + Sync>;

/// Cost closures addressable by name.
///
/// Both execution modes resolve [`CostRule::Named`] through the registry
/// the planner was created with, so a rule must be registered before the
/// planner or worker starts.
#[derive(Clone, Default)]
pub struct RuleRegistry {
    rules: HashMap<String, SharedRule>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `rule` under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, rule: F) -> &mut Self
    where
        F: Fn(&Tile<f64>, &Tile<f64>) -> f64 + Send + Sync + 'static,
    {
        self.rules.insert(name.into(), Arc::new(rule));
        self
    }

    /// Builder flavour of [`register`](Self::register).
    pub fn with<F>(mut self, name: impl Into<String>, rule: F) -> Self
    where
        F: Fn(&Tile<f64>, &Tile<f64>) -> f64 + Send + Sync + 'static,
    {
        self.register(name, rule);
        self
    }

    pub fn get(&self, name: &str) -> Option<SharedRule> {
        self.rules.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("RuleRegistry").field("rules", &names).finish()
    }
}
