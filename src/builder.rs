//! Assemble a model from named nodes at runtime.
//!
//! A model is a list of nodes:
//!
//! - coordinates: unknown parameters with a [`Prior`],
//! - derived: unknowns drawn from a [`Conditional`] that depends on the
//!   coordinates; they are redrawn by `from_prior` only, never perturbed,
//!   and are not printed,
//! - prior info: named constants,
//! - data: observed values with a [`Conditional`] distribution that depends
//!   on the coordinates and constants.
//!
//! [`ModelBuilder::build`] turns the nodes into a [`BuiltModel`], which
//! implements [`Model`] generically: all coordinates are drawn from their
//! priors (then the derived nodes, in insertion order), each proposal moves one coordinate chosen uniformly at random,
//! and the log likelihood is the sum over the data nodes.
//!
//! ```
//! use dnest_models::builder::{indexed, ModelBuilder};
//! use dnest_models::{Conditional, Model, Prior};
//!
//! let model = ModelBuilder::new()
//!     .coordinate("mu", Prior::uniform(-10., 10.)?)
//!     .prior_info("scale", 2.)
//!     .data(indexed("y", 0), 1.5, |p| Conditional::Normal {
//!         mu: p["mu"],
//!         sigma: p["scale"],
//!     })
//!     .build()?;
//! assert_eq!(model.description(), "mu");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::{self, Write};
use std::ops::Index;
use std::sync::Arc;

use itertools::Itertools;
use log::debug;
use rand::Rng;
use thiserror::Error;

use crate::data::Dataset;
use crate::linear::LinearPriors;
use crate::model::Model;
use crate::prior::{Conditional, Prior, PriorError};
use crate::rng::DNestRng;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("Node name {0:?} is used more than once")]
    DuplicateName(String),
    #[error("A model needs at least one coordinate")]
    NoCoordinates,
    #[error("No coordinate named {0:?}")]
    UnknownCoordinate(String),
    #[error("Value {value} is outside the prior support of {name:?}")]
    OutsideSupport { name: String, value: f64 },
    #[error("Invalid prior for coordinate {name:?}")]
    InvalidPrior {
        name: String,
        #[source]
        source: PriorError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Coordinate,
    Derived,
    PriorInfo,
    Data,
}

/// Name of element `index` of a vector node, e.g. `y[3]`.
pub fn indexed(name: &str, index: usize) -> String {
    format!("{}[{}]", name, index)
}

type DistributionFn = Box<dyn Fn(&Params) -> Conditional + Send + Sync>;

struct DataNode {
    name: String,
    value: f64,
    distribution: DistributionFn,
}

struct DerivedNode {
    name: String,
    distribution: DistributionFn,
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Coordinate(usize),
    Derived(usize),
    Constant(usize),
}

struct Graph {
    coordinates: Vec<(String, Prior)>,
    derived: Vec<DerivedNode>,
    constants: Vec<(String, f64)>,
    data: Vec<DataNode>,
    lookup: HashMap<String, Slot>,
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("coordinates", &self.coordinates)
            .field(
                "derived",
                &self.derived.iter().map(|node| &node.name).collect::<Vec<_>>(),
            )
            .field("constants", &self.constants)
            .field(
                "data",
                &self.data.iter().map(|node| &node.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Read access to coordinate values, derived values and constants by name.
///
/// Indexing with a name that is none of those panics, like indexing a
/// `HashMap` with a missing key. Data nodes are not readable.
pub struct Params<'a> {
    graph: &'a Graph,
    values: &'a [f64],
    derived: &'a [f64],
}

impl Params<'_> {
    pub fn get(&self, name: &str) -> Option<f64> {
        match self.graph.lookup.get(name)? {
            Slot::Coordinate(i) => Some(self.values[*i]),
            Slot::Derived(i) => Some(self.derived[*i]),
            Slot::Constant(i) => Some(self.graph.constants[*i].1),
        }
    }
}

impl Index<&str> for Params<'_> {
    type Output = f64;

    fn index(&self, name: &str) -> &f64 {
        match self.graph.lookup.get(name) {
            Some(Slot::Coordinate(i)) => &self.values[*i],
            Some(Slot::Derived(i)) => &self.derived[*i],
            Some(Slot::Constant(i)) => &self.graph.constants[*i].1,
            None => panic!("No coordinate, derived node or prior info named {:?}", name),
        }
    }
}

enum Node {
    Coordinate(String, Prior),
    Derived(DerivedNode),
    PriorInfo(String, f64),
    Data(DataNode),
}

impl Node {
    fn name(&self) -> &str {
        match self {
            Node::Coordinate(name, _) | Node::PriorInfo(name, _) => name,
            Node::Derived(node) => &node.name,
            Node::Data(node) => &node.name,
        }
    }
}

#[derive(Default)]
pub struct ModelBuilder {
    nodes: Vec<Node>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coordinate(mut self, name: impl Into<String>, prior: Prior) -> Self {
        self.nodes.push(Node::Coordinate(name.into(), prior));
        self
    }

    /// Add an unknown that is drawn after all coordinates in `from_prior`,
    /// from a distribution computed from the current parameters. It keeps
    /// its value across `perturb`.
    pub fn derived<F>(mut self, name: impl Into<String>, distribution: F) -> Self
    where
        F: Fn(&Params) -> Conditional + Send + Sync + 'static,
    {
        self.nodes.push(Node::Derived(DerivedNode {
            name: name.into(),
            distribution: Box::new(distribution),
        }));
        self
    }

    pub fn prior_info(mut self, name: impl Into<String>, value: f64) -> Self {
        self.nodes.push(Node::PriorInfo(name.into(), value));
        self
    }

    /// Add an observation whose distribution is computed from the current
    /// parameters on every likelihood evaluation.
    pub fn data<F>(mut self, name: impl Into<String>, value: f64, distribution: F) -> Self
    where
        F: Fn(&Params) -> Conditional + Send + Sync + 'static,
    {
        self.nodes.push(Node::Data(DataNode {
            name: name.into(),
            value,
            distribution: Box::new(distribution),
        }));
        self
    }

    pub fn build(self) -> Result<BuiltModel, BuildError> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.name()) {
                return Err(BuildError::DuplicateName(node.name().to_string()));
            }
        }

        let mut graph = Graph {
            coordinates: Vec::new(),
            derived: Vec::new(),
            constants: Vec::new(),
            data: Vec::new(),
            lookup: HashMap::new(),
        };
        for node in self.nodes {
            match node {
                Node::Coordinate(name, prior) => {
                    if let Err(source) = prior.validate() {
                        return Err(BuildError::InvalidPrior { name, source });
                    }
                    let slot = Slot::Coordinate(graph.coordinates.len());
                    graph.lookup.insert(name.clone(), slot);
                    graph.coordinates.push((name, prior));
                }
                Node::Derived(node) => {
                    let slot = Slot::Derived(graph.derived.len());
                    graph.lookup.insert(node.name.clone(), slot);
                    graph.derived.push(node);
                }
                Node::PriorInfo(name, value) => {
                    let slot = Slot::Constant(graph.constants.len());
                    graph.lookup.insert(name.clone(), slot);
                    graph.constants.push((name, value));
                }
                Node::Data(node) => graph.data.push(node),
            }
        }
        if graph.coordinates.is_empty() {
            return Err(BuildError::NoCoordinates);
        }

        debug!(
            "Built model with {} coordinates, {} derived, {} constants and {} data nodes",
            graph.coordinates.len(),
            graph.derived.len(),
            graph.constants.len(),
            graph.data.len()
        );
        let values = graph
            .coordinates
            .iter()
            .map(|(_, prior)| initial_value(prior))
            .collect();
        let mut model = BuiltModel {
            derived: vec![f64::NAN; graph.derived.len()],
            graph: Arc::new(graph),
            values,
        };
        for i in 0..model.derived.len() {
            let conditional = (model.graph.derived[i].distribution)(&model.params());
            model.derived[i] = centre(&conditional);
        }
        Ok(model)
    }
}

/// A point inside the support, used until the first `from_prior`.
fn initial_value(prior: &Prior) -> f64 {
    match *prior {
        Prior::Uniform { lower, upper } => 0.5 * (lower + upper),
        Prior::Normal { mu, .. } => mu,
        Prior::LogUniform { lower, upper } => (lower * upper).sqrt(),
    }
}

fn centre(conditional: &Conditional) -> f64 {
    match *conditional {
        Conditional::Normal { mu, .. } => mu,
        Conditional::Uniform { lower, upper } => 0.5 * (lower + upper),
    }
}

/// Model assembled by [`ModelBuilder`].
///
/// Clones share the node graph and only copy the coordinate and derived
/// values.
#[derive(Debug, Clone)]
pub struct BuiltModel {
    graph: Arc<Graph>,
    values: Vec<f64>,
    derived: Vec<f64>,
}

impl BuiltModel {
    pub fn coordinate_names(&self) -> impl Iterator<Item = &str> {
        self.graph.coordinates.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Values of the derived nodes, in insertion order.
    pub fn derived_values(&self) -> &[f64] {
        &self.derived
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&str, NodeType)> {
        let coordinates = self
            .graph
            .coordinates
            .iter()
            .map(|(name, _)| (name.as_str(), NodeType::Coordinate));
        let derived = self
            .graph
            .derived
            .iter()
            .map(|node| (node.name.as_str(), NodeType::Derived));
        let constants = self
            .graph
            .constants
            .iter()
            .map(|(name, _)| (name.as_str(), NodeType::PriorInfo));
        let data = self
            .graph
            .data
            .iter()
            .map(|node| (node.name.as_str(), NodeType::Data));
        coordinates.chain(derived).chain(constants).chain(data)
    }

    pub fn params(&self) -> Params<'_> {
        Params {
            graph: &self.graph,
            values: &self.values,
            derived: &self.derived,
        }
    }

    /// Set a coordinate by name. The value must lie inside its prior.
    pub fn set(&mut self, name: &str, value: f64) -> Result<(), BuildError> {
        let Some(&Slot::Coordinate(i)) = self.graph.lookup.get(name) else {
            return Err(BuildError::UnknownCoordinate(name.to_string()));
        };
        if !self.graph.coordinates[i].1.contains(value) {
            return Err(BuildError::OutsideSupport {
                name: name.to_string(),
                value,
            });
        }
        self.values[i] = value;
        Ok(())
    }

    /// Sum of the prior log densities of all coordinates.
    pub fn log_prior(&self) -> f64 {
        self.graph
            .coordinates
            .iter()
            .zip(&self.values)
            .map(|((_, prior), &x)| prior.log_density(x))
            .sum()
    }
}

impl Model for BuiltModel {
    fn from_prior<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for ((_, prior), value) in self.graph.coordinates.iter().zip(self.values.iter_mut()) {
            *value = prior.sample(rng);
        }
        for i in 0..self.derived.len() {
            let conditional = (self.graph.derived[i].distribution)(&self.params());
            self.derived[i] = conditional.sample(rng);
        }
    }

    fn perturb<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        let which = rng.rand_int(self.values.len());
        let (_, prior) = &self.graph.coordinates[which];
        prior.perturb(&mut self.values[which], rng)
    }

    fn log_likelihood(&self) -> f64 {
        let params = self.params();
        self.graph
            .data
            .iter()
            .map(|node| (node.distribution)(&params).log_density(node.value))
            .sum()
    }

    fn print<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "{}", self.values.iter().join(" "))
    }

    fn description(&self) -> String {
        self.coordinate_names().join(", ")
    }
}

/// Straight line fit `y_i ~ Normal(m * x_i + b, sigma)` as a node graph.
///
/// Equivalent to [`crate::LinearRegression`]; the `x` values become prior
/// info nodes `x[i]` and the `y` values data nodes `y[i]`.
pub fn linear_regression(data: &Dataset, priors: &LinearPriors) -> Result<BuiltModel, BuildError> {
    let mut builder = ModelBuilder::new()
        .coordinate("m", *priors.m())
        .coordinate("b", *priors.b())
        .coordinate("sigma", *priors.sigma());

    for (i, (x, y)) in data.iter().enumerate() {
        let x_name = indexed("x", i);
        builder = builder.prior_info(x_name.clone(), x).data(
            indexed("y", i),
            y,
            move |p| Conditional::Normal {
                mu: p["m"] * p[x_name.as_str()] + p["b"],
                sigma: p["sigma"],
            },
        );
    }
    builder.build()
}
