//! The tightly-scoped façade a rule sees: read-only queries over the
//! working graph plus exactly five mutation primitives, all bound to a
//! single rule invocation's target node.

use crate::driver::ReduceConfig;
use crate::error::{ReduceError, ReduceResult};
use crate::graph::{Chain, PreparedDagMode, Replacement, WorkingGraph};
use crate::node::{Node, NodeId};
use crate::rule::{Importance, Rule, RuleRegistry, Tag};

/// The context a [`Rule`](crate::rule::Rule) is handed while being
/// applied to `target`. Every mutation primitive is scoped to this one
/// target: `existing` arguments must be `target` itself or one of its
/// current ancestors, never an arbitrary node elsewhere in the graph.
pub struct RewriteContext<'a> {
    graph: &'a mut WorkingGraph,
    registry: &'a RuleRegistry,
    config: &'a ReduceConfig,
    target: NodeId,
    rule_name: &'a str,
    dirty: bool,
}

impl<'a> RewriteContext<'a> {
    pub(crate) fn new(
        graph: &'a mut WorkingGraph,
        registry: &'a RuleRegistry,
        config: &'a ReduceConfig,
        target: NodeId,
        rule_name: &'a str,
    ) -> Self {
        Self {
            graph,
            registry,
            config,
            target,
            rule_name,
            dirty: false,
        }
    }

    /// Did any mutation primitive succeed during this invocation?
    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn require_target_or_ancestor(&self, existing: NodeId) -> ReduceResult<()> {
        if existing == self.target {
            return Ok(());
        }
        let reachable = self
            .graph
            .ancestors_shortest_paths(self.target, usize::MAX)
            .into_iter()
            .any(|chain| chain.end() == existing);
        if reachable {
            Ok(())
        } else {
            Err(ReduceError::DanglingReference {
                rule: self.rule_name.to_string(),
                existing,
            })
        }
    }

    // --- Read-only queries -------------------------------------------------

    /// The importance floor the driver is currently running at; a rule
    /// may consult this to skip work it knows the driver wouldn't keep
    /// anyway, though the registry already filters on it.
    pub fn minimum_importance(&self) -> Importance {
        self.config.importance_floor
    }

    /// Is the driver configured to reduce until no rule at or above the
    /// floor applies anywhere (`true`), or to stop after the
    /// configured pass budget regardless (`false`)?
    pub fn is_complete_reduction(&self) -> bool {
        self.config.complete_reduction
    }

    /// Must the working graph never contain a `PreparableTransformer`?
    pub fn is_prepared_dag(&self) -> bool {
        self.config.prepared_dag_mode == PreparedDagMode::Strict
    }

    /// Does `node` currently have at least one `TransformerView` child?
    pub fn is_viewed(&self, node: NodeId) -> bool {
        self.graph.is_viewed(node)
    }

    /// Would the registry apply a rule value-equal to `rule`, via its
    /// class rule table, to a node whose ancestry includes `tag`?
    pub fn has_class_rule(&self, tag: Tag, rule: &dyn Rule) -> bool {
        self.registry.has_class_rule(tag, rule)
    }

    /// The node currently standing at `id`, if it is live.
    pub fn node(&self, id: NodeId) -> Option<&dyn Node> {
        self.graph.node(id)
    }

    /// The current working-graph parents of `node`.
    pub fn parents(&self, node: NodeId) -> &[NodeId] {
        self.graph.parents(node)
    }

    /// The current working-graph parents of `node` whose ancestry
    /// contains `tag`.
    pub fn parents_by_kind(&self, node: NodeId, tag: Tag) -> Vec<NodeId> {
        self.graph.parents_by_kind(node, tag)
    }

    /// Ancestors of `node` (via working-graph parent edges) up to
    /// `max_depth` edges away whose ancestry contains `tag`.
    pub fn ancestors_by_kind(&self, node: NodeId, tag: Tag, max_depth: usize) -> Vec<NodeId> {
        self.graph.ancestors_by_kind(node, tag, max_depth)
    }

    /// One shortest descent chain to each ancestor of `node` up to
    /// `max_depth` edges away.
    pub fn ancestors_shortest_paths(&self, node: NodeId, max_depth: usize) -> Vec<Chain> {
        self.graph.ancestors_shortest_paths(node, max_depth)
    }

    /// A node value-equal to `node`'s current node but whose stored
    /// parents reflect the working graph's current edges for it,
    /// suitable as the `replacement` for a mutation primitive that
    /// otherwise leaves `node` untouched.
    pub fn with_current_parents(&self, node: NodeId) -> ReduceResult<Box<dyn Node>> {
        self.graph.with_current_parents(node)
    }

    // --- Mutation primitives -------------------------------------------------

    /// `existing` and `replacement` must share kind and arity, and
    /// `replacement`'s parents must match `existing`'s current
    /// working-graph edges exactly. For property edits that leave the
    /// graph's shape untouched.
    pub fn replace_same_kind(
        &mut self,
        existing: NodeId,
        replacement: Box<dyn Node>,
    ) -> ReduceResult<()> {
        self.require_target_or_ancestor(existing)?;
        self.graph.replace_same_kind(existing, replacement)?;
        crate::trace!("{}: replace_same_kind({:?})", self.rule_name, existing);
        self.dirty = true;
        Ok(())
    }

    /// General replacement: `replacement`'s stored parents become its
    /// working-graph parents, unless it is reference-equal to a node
    /// already in the graph, in which case that node's current parents
    /// are kept.
    pub fn replace(
        &mut self,
        existing: NodeId,
        replacement: impl Into<Replacement>,
    ) -> ReduceResult<NodeId> {
        self.require_target_or_ancestor(existing)?;
        let id = self
            .graph
            .replace(existing, replacement.into(), self.config.prepared_dag_mode)?;
        crate::trace!("{}: replace({:?} -> {:?})", self.rule_name, existing, id);
        self.dirty = true;
        Ok(id)
    }

    /// Like [`Self::replace`], but `existing` must currently be a
    /// `TransformerView`.
    pub fn replace_view(
        &mut self,
        existing: NodeId,
        replacement: impl Into<Replacement>,
    ) -> ReduceResult<NodeId> {
        self.require_target_or_ancestor(existing)?;
        let id =
            self.graph
                .replace_view(existing, replacement.into(), self.config.prepared_dag_mode)?;
        crate::trace!("{}: replace_view({:?} -> {:?})", self.rule_name, existing, id);
        self.dirty = true;
        Ok(id)
    }

    /// Swap one `PreparableTransformer` for another whose result type
    /// matches.
    pub fn replace_preparable(
        &mut self,
        existing: NodeId,
        replacement: Box<dyn Node>,
    ) -> ReduceResult<NodeId> {
        self.require_target_or_ancestor(existing)?;
        let id = self.graph.replace_preparable(existing, replacement)?;
        crate::trace!("{}: replace_preparable({:?} -> {:?})", self.rule_name, existing, id);
        self.dirty = true;
        Ok(id)
    }

    /// Like [`Self::replace`], but fails with
    /// [`ReduceError::ViewedNode`] if `existing` still has any
    /// `TransformerView` children.
    pub fn replace_unviewed(
        &mut self,
        existing: NodeId,
        replacement: impl Into<Replacement>,
    ) -> ReduceResult<NodeId> {
        self.require_target_or_ancestor(existing)?;
        let id = self.graph.replace_unviewed(
            existing,
            replacement.into(),
            self.config.prepared_dag_mode,
        )?;
        crate::trace!("{}: replace_unviewed({:?} -> {:?})", self.rule_name, existing, id);
        self.dirty = true;
        Ok(id)
    }

    /// Like [`Self::replace_unviewed`], but reports failure as `false`
    /// rather than an error, and never evaluates `supplier` when
    /// `existing` is viewed or is not the target or one of its
    /// ancestors.
    pub fn try_replace_unviewed(
        &mut self,
        existing: NodeId,
        supplier: impl FnOnce() -> Replacement,
    ) -> bool {
        if self.require_target_or_ancestor(existing).is_err() {
            return false;
        }
        let succeeded =
            self.graph
                .try_replace_unviewed(existing, self.config.prepared_dag_mode, supplier);
        if succeeded {
            crate::trace!("{}: try_replace_unviewed({:?}) succeeded", self.rule_name, existing);
            self.dirty = true;
        }
        succeeded
    }
}
