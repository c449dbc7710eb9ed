//! The DAG facade: the outward-facing API collaborators use to stage a
//! graph of nodes, reduce it, and read the result back out.

use crate::driver::{ReduceConfig, ReduceDriver, ReduceStats};
use crate::error::{ReduceError, ReduceResult};
use crate::graph::{Chain, WorkingGraph};
use crate::node::{Node, NodeId};
use crate::rule::RuleRegistry;
use dagcore_entity::PrimaryMap;
use std::collections::HashMap;

/// Stages nodes into a dense arena, handing back the [`NodeId`] each
/// one is assigned so later nodes can reference it as a parent.
///
/// A node's parents must already have been `add`ed before it, since a
/// node's own `stored_parents()` are only meaningful relative to the
/// arena they were assigned in.
#[derive(Default)]
pub struct DagBuilder {
    arena: PrimaryMap<NodeId, Box<dyn Node>>,
}

impl DagBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self { arena: PrimaryMap::new() }
    }

    /// Stage `node`, returning the handle it was assigned.
    pub fn add(&mut self, node: impl Node + 'static) -> NodeId {
        self.arena.push(Box::new(node))
    }

    /// Like [`Self::add`], but for a node already boxed, e.g. one read
    /// back from [`ReducedDag::materialize`] while re-staging a
    /// previously reduced graph.
    pub fn add_boxed(&mut self, node: Box<dyn Node>) -> NodeId {
        self.arena.push(node)
    }

    /// Finish staging and declare the graph's outputs, producing an
    /// unreduced [`Dag`]. Placeholders are whichever staged
    /// `Placeholder`-kind nodes are reachable from `outputs`; name them
    /// with [`Dag::with_input`] afterward if collaborators need to look
    /// them up by name.
    pub fn with_outputs(self, outputs: Vec<NodeId>) -> ReduceResult<Dag> {
        let placeholders = self
            .arena
            .iter()
            .filter_map(|(id, node)| {
                if node.kind() == crate::node::NodeKind::Placeholder {
                    Some(id)
                } else {
                    None
                }
            })
            .collect();
        Dag::new(self.arena, outputs, placeholders)
    }
}

/// An unreduced DAG: a dense node arena plus its declared outputs and
/// placeholders, not yet driven through any rewrite rules.
pub struct Dag {
    graph: WorkingGraph,
    input_names: HashMap<String, NodeId>,
}

impl Dag {
    fn new(
        arena: PrimaryMap<NodeId, Box<dyn Node>>,
        outputs: Vec<NodeId>,
        placeholders: Vec<NodeId>,
    ) -> ReduceResult<Self> {
        let graph = WorkingGraph::build(arena, outputs, placeholders)?;
        Ok(Self {
            graph,
            input_names: HashMap::new(),
        })
    }

    /// Bind a name to one of this DAG's placeholders, so it can later
    /// be looked up by name rather than by handle.
    pub fn with_input(mut self, name: impl Into<String>, placeholder: NodeId) -> ReduceResult<Self> {
        if !self.graph.placeholders().contains(&placeholder) {
            return Err(ReduceError::MalformedNode {
                node: placeholder,
                reason: "with_input target is not one of this DAG's declared placeholders"
                    .to_string(),
            });
        }
        self.input_names.insert(name.into(), placeholder);
        Ok(self)
    }

    /// The handle bound to `name` via [`Self::with_input`], if any.
    pub fn input(&self, name: &str) -> Option<NodeId> {
        self.input_names.get(name).copied()
    }

    /// This DAG's declared outputs.
    pub fn outputs(&self) -> &[NodeId] {
        self.graph.outputs()
    }

    /// This DAG's declared placeholders.
    pub fn placeholders(&self) -> &[NodeId] {
        self.graph.placeholders()
    }

    /// Drive the working graph to a fixed point (or until
    /// `config.pass_budget` is exhausted) against `registry`.
    pub fn reduce(
        mut self,
        registry: &RuleRegistry,
        config: &ReduceConfig,
    ) -> ReduceResult<ReducedDag> {
        let stats = ReduceDriver::run(&mut self.graph, registry, config)?;
        Ok(ReducedDag {
            graph: self.graph,
            input_names: self.input_names,
            stats,
        })
    }
}

/// A DAG that has been driven to (at least an attempted) fixed point.
pub struct ReducedDag {
    graph: WorkingGraph,
    input_names: HashMap<String, NodeId>,
    stats: ReduceStats,
}

impl ReducedDag {
    /// Counters describing the reduction that produced this DAG.
    pub fn stats(&self) -> ReduceStats {
        self.stats
    }

    /// This DAG's (possibly rewritten) outputs.
    pub fn outputs(&self) -> &[NodeId] {
        self.graph.outputs()
    }

    /// This DAG's (possibly rewritten) placeholders.
    pub fn placeholders(&self) -> &[NodeId] {
        self.graph.placeholders()
    }

    /// The handle bound to `name` via [`Dag::with_input`], if it
    /// survived reduction unchanged in identity. Rewrites that replace
    /// a placeholder (renaming it) invalidate this lookup; collaborators
    /// that need a stable name-to-handle mapping across a rewrite
    /// should re-resolve it from [`Self::placeholders`] instead.
    pub fn input(&self, name: &str) -> Option<NodeId> {
        self.input_names.get(name).copied()
    }

    /// Read out the node currently standing at `id`.
    pub fn node(&self, id: NodeId) -> Option<&dyn Node> {
        self.graph.node(id)
    }

    /// Materialise the reduced graph back into owned node values whose
    /// stored parents match the working graph's edges exactly, ready
    /// to hand back to whatever constructed the original nodes.
    pub fn materialize(&self) -> ReduceResult<Vec<(NodeId, Box<dyn Node>)>> {
        self.graph
            .live_ids()
            .into_iter()
            .map(|id| Ok((id, self.graph.with_current_parents(id)?)))
            .collect()
    }

    /// One shortest descent chain from each output to every node
    /// reachable from it, for inspection and testing.
    pub fn producers(&self) -> Vec<Chain> {
        self.graph.producer_chains()
    }
}
