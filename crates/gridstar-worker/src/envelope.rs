//! JSON messages exchanged with the worker thread.

use gridstar_core::Point;
use gridstar_paths::{Cutting, GridOptions, LayerOptions, Navigator, Order, PathOptions, PathResult, Score, Tile};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::rules::{CostRule, RuleRegistry};

/// Operation carried by an envelope.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Build the grid searched by later path requests, replacing any
    /// previous one. Arguments: [`GridSpec`].
    Construct,
    /// Search the current grid. Arguments: [`PathArgs`].
    Path,
}

/// Host to worker message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub method: Method,
    /// Correlation id, echoed by the response.
    pub id: u64,
    pub args: Value,
}

impl Request {
    pub fn new<A: Serialize>(method: Method, id: u64, args: &A) -> Result<Self> {
        Ok(Self {
            method,
            id,
            args: serde_json::to_value(args)?,
        })
    }
}

/// Worker to host message. Exactly one of `output` and `error` is set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub method: Method,
    pub id: u64,
    pub output: Option<Value>,
    pub error: Option<String>,
}

impl Response {
    pub fn ok(method: Method, id: u64, output: Value) -> Self {
        Self {
            method,
            id,
            output: Some(output),
            error: None,
        }
    }

    pub fn failed(method: Method, id: u64, error: impl ToString) -> Self {
        Self {
            method,
            id,
            output: None,
            error: Some(error.to_string()),
        }
    }
}

/// Overrides for one cost layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerSpec {
    pub cost: Option<CostRule>,
    pub torus: Option<bool>,
    pub diagonals: Option<bool>,
    pub cutting: Option<Cutting>,
}

/// A numeric grid and the options to link it with.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSpec {
    pub cells: Vec<Vec<f64>>,
    pub order: Order,
    pub cost: CostRule,
    pub torus: bool,
    pub diagonals: bool,
    pub cutting: Cutting,
    /// One graph per entry; none means a single layer with the options
    /// above.
    pub layers: Vec<LayerSpec>,
}

impl GridSpec {
    pub fn new(cells: Vec<Vec<f64>>) -> Self {
        Self {
            cells,
            ..Self::default()
        }
    }

    pub fn cost(mut self, cost: CostRule) -> Self {
        self.cost = cost;
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

    pub fn cutting(mut self, cutting: Cutting) -> Self {
        self.cutting = cutting;
        self
    }

    pub fn layer(mut self, layer: LayerSpec) -> Self {
        self.layers.push(layer);
        self
    }

    /// Build the layers, resolving cost rules through `registry`.
    pub fn build(&self, registry: &RuleRegistry) -> Result<Navigator<usize, Tile<f64>>> {
        let mut options = GridOptions::<f64>::new()
            .order(self.order)
            .torus(self.torus)
            .diagonals(self.diagonals)
            .cutting(self.cutting);
        options.cost = Some(self.cost.resolve(registry)?);
        for spec in &self.layers {
            let mut layer = LayerOptions::new();
            layer.cost = spec.cost.as_ref().map(|c| c.resolve(registry)).transpose()?;
            layer.torus = spec.torus;
            layer.diagonals = spec.diagonals;
            layer.cutting = spec.cutting;
            options = options.layer(layer);
        }
        Ok(Navigator::from_grid(&self.cells, &options)?)
    }
}

/// Reply to [`Method::Construct`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constructed {
    pub layers: usize,
    pub cells: usize,
}

/// Arguments of [`Method::Path`]. Vertex ids are the cell ids of the grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathArgs {
    pub start: usize,
    pub goal: usize,
    #[serde(default)]
    pub options: PathOptions,
}

/// Reply to [`Method::Path`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PathOutput {
    /// Cell ids from start to goal, empty when there is no path.
    pub ids: Vec<usize>,
    pub positions: Vec<Point>,
    pub cost: Option<f64>,
    /// Search records as `(id, score)` pairs sorted by id.
    pub scores: Vec<(usize, Score<usize>)>,
}

impl From<PathResult<usize, Tile<f64>>> for PathOutput {
    fn from(result: PathResult<usize, Tile<f64>>) -> Self {
        let mut scores: Vec<_> = result.scores.iter().map(|(k, s)| (*k, s.clone())).collect();
        scores.sort_unstable_by_key(|(k, _)| *k);
        Self {
            ids: result.ids(),
            positions: result.positions(),
            cost: result.cost(),
            scores,
        }
    }
}
