//! A small rewrite engine for DAGs of typed "producer" nodes.
//!
//! A pipeline is staged as a [`DagBuilder`](dag::DagBuilder) graph of
//! [`Node`](node::Node) values, reduced to a fixed point by a
//! [`ReduceDriver`](driver::ReduceDriver) applying [`Rule`](rule::Rule)s
//! through a [`RewriteContext`](context::RewriteContext), and read back
//! out as a [`ReducedDag`](dag::ReducedDag).
//!
//! See the crate README for the node/rewrite model this implements.

mod capabilities;
mod context;
mod dag;
mod driver;
mod error;
mod fx;
mod graph;
mod node;
mod rule;
pub mod rules;
mod trace;

pub use capabilities::{Capability, NodeCapabilities};
pub use context::RewriteContext;
pub use dag::{Dag, DagBuilder, ReducedDag};
pub use driver::{ReduceConfig, ReduceDriver, ReduceStats};
pub use error::{ReduceError, ReduceResult};
pub use graph::{Chain, PreparedDagMode, Replacement, WorkingGraph};
pub use node::{ArityError, Node, NodeId, NodeKind, ResultType};
pub use rule::{ancestry_of, Importance, Rule, RuleRegistry, Tag};
