//! The working graph: the authoritative, handle-indexed adjacency
//! structure the driver rewrites, kept independent of whatever parent
//! lists the node values themselves remember.

use crate::error::{ReduceError, ReduceResult};
use crate::fx::FxHashSet;
use crate::node::{Node, NodeId, NodeKind};
use crate::rule::Tag;
use dagcore_entity::{PrimaryMap, SecondaryMap};

/// One shortest descent chain from a starting node down to one of its
/// ancestors, ordered `[start, .., ancestor]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chain(pub Vec<NodeId>);

impl Chain {
    /// The node the chain descends from.
    pub fn start(&self) -> NodeId {
        self.0[0]
    }

    /// The ancestor the chain ends at.
    pub fn end(&self) -> NodeId {
        *self.0.last().unwrap()
    }
}

/// Either an existing node already in the working graph, or a freshly
/// constructed node value to insert as a new entry.
///
/// Mirrors the source's allowance for a replacement to be
/// "reference-equal to a node already in `N`": in that case the
/// existing node's current working-graph parents are kept rather than
/// being reset from the replacement's stored parents.
pub enum Replacement {
    /// Redirect edges to an already-present node.
    Existing(NodeId),
    /// Insert this value as a new node and redirect edges to it.
    New(Box<dyn Node>),
}

impl From<NodeId> for Replacement {
    fn from(id: NodeId) -> Self {
        Replacement::Existing(id)
    }
}

impl From<Box<dyn Node>> for Replacement {
    fn from(node: Box<dyn Node>) -> Self {
        Replacement::New(node)
    }
}

/// Whether the driver is running over a DAG that must never contain a
/// `PreparableTransformer`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreparedDagMode {
    /// Preparable nodes are forbidden; introducing one is an error.
    Strict,
    /// Preparable nodes are allowed.
    Permissive,
}

#[derive(Clone, Debug, Default)]
struct GraphEntry {
    parents: Vec<NodeId>,
    children: Vec<NodeId>,
}

/// The mutable adjacency structure a reduction rewrites.
///
/// Node payloads live in a dense, handle-indexed arena; edges live in
/// parallel `parents`/`children` maps keyed by the same [`NodeId`]
/// handles rather than by any pointer identity of the node values
/// themselves.
pub struct WorkingGraph {
    arena: PrimaryMap<NodeId, Option<Box<dyn Node>>>,
    entries: SecondaryMap<NodeId, GraphEntry>,
    outputs: Vec<NodeId>,
    placeholders: Vec<NodeId>,
    nodes_created: usize,
    nodes_retired: usize,
}

impl WorkingGraph {
    /// Build a working graph from a dense arena of nodes and a set of
    /// outputs, traversing the outputs' stored-parent closure to
    /// determine which arena entries are actually live. Entries not
    /// reachable from `outputs` are dropped rather than inserted.
    pub fn build(
        arena: PrimaryMap<NodeId, Box<dyn Node>>,
        outputs: Vec<NodeId>,
        placeholders: Vec<NodeId>,
    ) -> ReduceResult<Self> {
        let mut reachable: FxHashSet<NodeId> = FxHashSet::default();
        let mut worklist: Vec<NodeId> = outputs.clone();
        while let Some(id) = worklist.pop() {
            if !reachable.insert(id) {
                continue;
            }
            let node = arena.get(id).ok_or_else(|| ReduceError::MalformedNode {
                node: id,
                reason: "output or parent refers to a node not present in the arena".to_string(),
            })?;
            worklist.extend(node.stored_parents().iter().copied());
        }

        let mut live_arena: PrimaryMap<NodeId, Option<Box<dyn Node>>> =
            PrimaryMap::with_capacity(arena.len());
        let mut entries: SecondaryMap<NodeId, GraphEntry> = SecondaryMap::new();
        for (id, node) in arena.into_iter() {
            if reachable.contains(&id) {
                let parents = node.stored_parents().to_vec();
                let pushed = live_arena.push(Some(node));
                debug_assert_eq!(pushed, id);
                entries.set(id, GraphEntry {
                    parents,
                    children: Vec::new(),
                });
            } else {
                let pushed = live_arena.push(None);
                debug_assert_eq!(pushed, id);
            }
        }
        for id in reachable.iter().copied() {
            for &parent in entries[id].parents.clone().iter() {
                entries[parent].children.push(id);
            }
        }

        let mut graph = Self {
            arena: live_arena,
            entries,
            outputs,
            placeholders,
            nodes_created: 0,
            nodes_retired: 0,
        };
        graph.validate_placeholder_closure()?;
        Ok(graph)
    }

    fn validate_placeholder_closure(&self) -> ReduceResult<()> {
        for id in self.live_ids() {
            let is_placeholder = matches!(self.kind_of(id), Some(NodeKind::Placeholder));
            let declared = self.placeholders.contains(&id);
            if is_placeholder && !declared {
                return Err(ReduceError::MalformedNode {
                    node: id,
                    reason: "placeholder is reachable from the outputs but was not declared"
                        .to_string(),
                });
            }
            if !is_placeholder && declared {
                return Err(ReduceError::MalformedNode {
                    node: id,
                    reason: "declared as a placeholder but is not Placeholder-kind".to_string(),
                });
            }
        }
        Ok(())
    }

    /// The node at `id`, if it is currently live.
    pub fn node(&self, id: NodeId) -> Option<&dyn Node> {
        self.arena.get(id).and_then(|slot| slot.as_deref())
    }

    fn kind_of(&self, id: NodeId) -> Option<NodeKind> {
        self.node(id).map(|n| n.kind())
    }

    /// Is `id` currently a live member of the graph?
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// All currently-live node handles, in ascending (insertion) order.
    pub fn live_ids(&self) -> Vec<NodeId> {
        self.arena
            .iter()
            .filter_map(|(id, slot)| slot.as_ref().map(|_| id))
            .collect()
    }

    /// The graph's ordered outputs.
    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    /// The graph's declared placeholders, in the order they were
    /// declared or introduced.
    pub fn placeholders(&self) -> &[NodeId] {
        &self.placeholders
    }

    /// The working-graph parents of `id` (may differ from
    /// `node.stored_parents()` until materialisation).
    pub fn parents(&self, id: NodeId) -> &[NodeId] {
        &self.entries[id].parents
    }

    /// The working-graph parents of `id` whose kind's ancestry
    /// contains `tag`.
    pub fn parents_by_kind(&self, id: NodeId, tag: Tag) -> Vec<NodeId> {
        self.parents(id)
            .iter()
            .copied()
            .filter(|&p| self.ancestry_contains(p, tag))
            .collect()
    }

    fn ancestry_contains(&self, id: NodeId, tag: Tag) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        crate::rule::ancestry_of(node.kind(), node.capabilities()).contains(&tag)
    }

    /// Ancestors of `id` (via working-graph parent edges) up to
    /// `max_depth`, filtered to those whose ancestry contains `tag`.
    pub fn ancestors_by_kind(&self, id: NodeId, tag: Tag, max_depth: usize) -> Vec<NodeId> {
        self.ancestors_shortest_paths(id, max_depth)
            .into_iter()
            .map(|chain| chain.end())
            .filter(|&a| self.ancestry_contains(a, tag))
            .collect()
    }

    /// BFS over working-graph parent edges yielding one shortest
    /// descent chain per visited ancestor (excluding `id` itself),
    /// bounded to `max_depth` edges.
    pub fn ancestors_shortest_paths(&self, id: NodeId, max_depth: usize) -> Vec<Chain> {
        let mut visited: FxHashSet<NodeId> = FxHashSet::default();
        visited.insert(id);
        let mut frontier: Vec<Vec<NodeId>> = vec![vec![id]];
        let mut out = Vec::new();
        for _ in 0..max_depth {
            let mut next = Vec::new();
            for chain in &frontier {
                let head = *chain.last().unwrap();
                for &parent in self.parents(head) {
                    if visited.insert(parent) {
                        let mut extended = chain.clone();
                        extended.push(parent);
                        out.push(Chain(extended.clone()));
                        next.push(extended);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        out
    }

    /// Does `id` have at least one `TransformerView` child?
    pub fn is_viewed(&self, id: NodeId) -> bool {
        self.entries[id]
            .children
            .iter()
            .any(|&c| matches!(self.kind_of(c), Some(NodeKind::TransformerView)))
    }

    /// A topological order over the live nodes: every node follows all
    /// of its parents. Ties are broken by ascending `NodeId`, which is
    /// assigned in first-seen order during `build`, giving a stable
    /// tie-break with no auxiliary sort key.
    pub fn topo_order(&self) -> Vec<NodeId> {
        let ids = self.live_ids();
        let mut remaining_parents: SecondaryMap<NodeId, usize> = SecondaryMap::new();
        for &id in &ids {
            remaining_parents.set(id, self.parents(id).len());
        }
        let mut ready: std::collections::BTreeSet<NodeId> = ids
            .iter()
            .copied()
            .filter(|&id| self.parents(id).is_empty())
            .collect();
        let mut order = Vec::with_capacity(ids.len());
        while let Some(&id) = ready.iter().next() {
            ready.remove(&id);
            order.push(id);
            for &child in &self.entries[id].children {
                if !self.contains(child) {
                    continue;
                }
                let remaining = &mut remaining_parents[child];
                *remaining -= 1;
                if *remaining == 0 {
                    ready.insert(child);
                }
            }
        }
        order
    }

    /// One shortest chain from each graph output down to every node
    /// reachable from it, used for inspection and testing.
    pub fn producer_chains(&self) -> Vec<Chain> {
        let mut visited: FxHashSet<NodeId> = FxHashSet::default();
        let mut frontier: Vec<Vec<NodeId>> = Vec::new();
        let mut out = Vec::new();
        for &root in &self.outputs {
            if visited.insert(root) {
                out.push(Chain(vec![root]));
                frontier.push(vec![root]);
            }
        }
        loop {
            let mut next = Vec::new();
            for chain in &frontier {
                let head = *chain.last().unwrap();
                for &parent in self.parents(head) {
                    if visited.insert(parent) {
                        let mut extended = chain.clone();
                        extended.push(parent);
                        out.push(Chain(extended.clone()));
                        next.push(extended);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
        out
    }

    /// Number of nodes inserted into this graph over its lifetime
    /// (since [`Self::build`]), for [`crate::driver::ReduceStats`].
    pub fn nodes_created(&self) -> usize {
        self.nodes_created
    }

    /// Number of nodes garbage-collected from this graph over its
    /// lifetime (since [`Self::build`]), for
    /// [`crate::driver::ReduceStats`].
    pub fn nodes_retired(&self) -> usize {
        self.nodes_retired
    }

    /// Insert a brand-new node, returning the handle that now owns it.
    /// Does not wire up any edges; callers are responsible for that.
    fn insert(&mut self, node: Box<dyn Node>) -> NodeId {
        let is_placeholder = node.kind() == NodeKind::Placeholder;
        let parents = node.stored_parents().to_vec();
        self.nodes_created += 1;
        let id = self.arena.push(Some(node));
        self.entries.set(
            id,
            GraphEntry {
                parents: parents.clone(),
                children: Vec::new(),
            },
        );
        for &parent in &parents {
            self.entries[parent].children.push(id);
        }
        if is_placeholder {
            self.placeholders.push(id);
        }
        id
    }

    fn resolve_replacement(
        &mut self,
        existing: NodeId,
        replacement: Replacement,
        prepared_dag_mode: PreparedDagMode,
    ) -> ReduceResult<NodeId> {
        match replacement {
            Replacement::Existing(id) => {
                if !self.contains(id) {
                    return Err(ReduceError::MalformedNode {
                        node: id,
                        reason: "replacement refers to a node no longer in the graph".to_string(),
                    });
                }
                Ok(id)
            }
            Replacement::New(node) => {
                self.check_replacement_preconditions(existing, node.as_ref(), prepared_dag_mode)?;
                for &parent in node.stored_parents() {
                    if !self.contains(parent) {
                        return Err(ReduceError::MalformedNode {
                            node: existing,
                            reason: "replacement refers to a parent not present in the graph"
                                .to_string(),
                        });
                    }
                }
                Ok(self.insert(node))
            }
        }
    }

    fn check_replacement_preconditions(
        &self,
        existing: NodeId,
        replacement: &dyn Node,
        prepared_dag_mode: PreparedDagMode,
    ) -> ReduceResult<()> {
        let existing_kind = self.kind_of(existing);
        if replacement.kind() == NodeKind::Placeholder
            && existing_kind != Some(NodeKind::Placeholder)
        {
            return Err(ReduceError::PlaceholderInjection { existing });
        }
        if prepared_dag_mode == PreparedDagMode::Strict
            && replacement.kind() == NodeKind::PreparableTransformer
            && existing_kind != Some(NodeKind::PreparableTransformer)
        {
            return Err(ReduceError::PreparableInjection { existing });
        }
        Ok(())
    }

    /// `existing` and `replacement` must share kind and arity, and
    /// `replacement`'s parents must match `existing`'s current
    /// working-graph edges exactly. Used for property edits that do
    /// not move edges.
    pub fn replace_same_kind(
        &mut self,
        existing: NodeId,
        replacement: Box<dyn Node>,
    ) -> ReduceResult<()> {
        let existing_kind = self.kind_of(existing).ok_or_else(|| ReduceError::MalformedNode {
            node: existing,
            reason: "target of replace_same_kind is not in the graph".to_string(),
        })?;
        if replacement.kind() != existing_kind {
            return Err(ReduceError::MalformedNode {
                node: existing,
                reason: format!(
                    "replace_same_kind requires matching kinds, found {:?} and {:?}",
                    existing_kind,
                    replacement.kind()
                ),
            });
        }
        if replacement.stored_parents() != self.parents(existing) {
            return Err(ReduceError::MalformedNode {
                node: existing,
                reason: "replace_same_kind requires the replacement's parents to match the \
                         existing edges exactly"
                    .to_string(),
            });
        }
        let new_id = self.resolve_replacement(existing, Replacement::New(replacement), PreparedDagMode::Permissive)?;
        self.redirect(existing, new_id)
    }

    /// General replacement: `replacement`'s stored parents become its
    /// working-graph parents, unless it is reference-equal to a node
    /// already in the graph, in which case that node's current parents
    /// are kept.
    pub fn replace(
        &mut self,
        existing: NodeId,
        replacement: Replacement,
        prepared_dag_mode: PreparedDagMode,
    ) -> ReduceResult<NodeId> {
        let new_id = self.resolve_replacement(existing, replacement, prepared_dag_mode)?;
        self.redirect(existing, new_id)?;
        Ok(new_id)
    }

    /// Like [`Self::replace`], but `existing` must currently be a
    /// `TransformerView`.
    pub fn replace_view(
        &mut self,
        existing: NodeId,
        replacement: Replacement,
        prepared_dag_mode: PreparedDagMode,
    ) -> ReduceResult<NodeId> {
        if self.kind_of(existing) != Some(NodeKind::TransformerView) {
            return Err(ReduceError::MalformedNode {
                node: existing,
                reason: "replace_view requires the target to be a TransformerView".to_string(),
            });
        }
        self.replace(existing, replacement, prepared_dag_mode)
    }

    /// Swap one `PreparableTransformer` for another whose result type
    /// matches, since preparation does not change the type of value a
    /// node ultimately yields.
    pub fn replace_preparable(
        &mut self,
        existing: NodeId,
        replacement: Box<dyn Node>,
    ) -> ReduceResult<NodeId> {
        if self.kind_of(existing) != Some(NodeKind::PreparableTransformer) {
            return Err(ReduceError::MalformedNode {
                node: existing,
                reason: "replace_preparable requires the target to be a PreparableTransformer"
                    .to_string(),
            });
        }
        if replacement.kind() != NodeKind::PreparableTransformer {
            return Err(ReduceError::MalformedNode {
                node: existing,
                reason: "replace_preparable requires the replacement to be a \
                         PreparableTransformer"
                    .to_string(),
            });
        }
        let existing_result_type = self
            .node(existing)
            .expect("kind_of returned Some above")
            .result_type();
        if replacement.result_type() != existing_result_type {
            return Err(ReduceError::MalformedNode {
                node: existing,
                reason: "replace_preparable requires the replacement's result type to match \
                         the existing node's"
                    .to_string(),
            });
        }
        self.replace(
            existing,
            Replacement::New(replacement),
            PreparedDagMode::Permissive,
        )
    }

    /// Like [`Self::replace`], but fails if `existing` still has any
    /// `TransformerView` children.
    pub fn replace_unviewed(
        &mut self,
        existing: NodeId,
        replacement: Replacement,
        prepared_dag_mode: PreparedDagMode,
    ) -> ReduceResult<NodeId> {
        if self.is_viewed(existing) {
            return Err(ReduceError::ViewedNode { node: existing });
        }
        self.replace(existing, replacement, prepared_dag_mode)
    }

    /// Like [`Self::replace_unviewed`], but reports failure as `false`
    /// rather than an error, and does not evaluate `supplier` at all
    /// when the replacement would fail.
    pub fn try_replace_unviewed(
        &mut self,
        existing: NodeId,
        prepared_dag_mode: PreparedDagMode,
        supplier: impl FnOnce() -> Replacement,
    ) -> bool {
        if self.is_viewed(existing) {
            return false;
        }
        self.replace(existing, supplier(), prepared_dag_mode).is_ok()
    }

    /// Redirect every edge pointing at `existing` to point at `new_id`
    /// instead, then garbage-collect anything that is now unreachable.
    fn redirect(&mut self, existing: NodeId, new_id: NodeId) -> ReduceResult<()> {
        if existing == new_id {
            return Ok(());
        }
        let dependents = std::mem::take(&mut self.entries[existing].children);
        for &child in &dependents {
            if !self.contains(child) {
                continue;
            }
            for parent_slot in self.entries[child].parents.iter_mut() {
                if *parent_slot == existing {
                    *parent_slot = new_id;
                }
            }
        }
        self.entries[new_id].children.extend(dependents);
        for slot in self.outputs.iter_mut() {
            if *slot == existing {
                *slot = new_id;
            }
        }
        self.gc_from(existing);
        Ok(())
    }

    /// Incrementally retire nodes that have become unreachable,
    /// starting from `start`, propagating to ancestors that lose their
    /// last remaining dependent.
    fn gc_from(&mut self, start: NodeId) {
        let mut worklist = vec![start];
        while let Some(id) = worklist.pop() {
            if !self.contains(id) {
                continue;
            }
            let is_output = self.outputs.contains(&id);
            let has_dependents = !self.entries[id].children.is_empty();
            if is_output || has_dependents {
                continue;
            }
            let parents = std::mem::take(&mut self.entries[id].parents);
            for &parent in &parents {
                if self.contains(parent) {
                    self.entries[parent].children.retain(|&c| c != id);
                    worklist.push(parent);
                }
            }
            if matches!(self.kind_of(id), Some(NodeKind::Placeholder)) {
                self.placeholders.retain(|&p| p != id);
            }
            self.arena[id] = None;
            self.nodes_retired += 1;
        }
    }

    /// Produce a node value-equal to `id`'s current node but whose
    /// stored parents reflect the working graph's current edges for
    /// it (a no-op if they already agree).
    pub fn with_current_parents(&self, id: NodeId) -> ReduceResult<Box<dyn Node>> {
        let node = self.node(id).ok_or_else(|| ReduceError::MalformedNode {
            node: id,
            reason: "with_current_parents target is not in the graph".to_string(),
        })?;
        clone_via_with_new_parents(node, self.parents(id).to_vec(), id)
    }
}

fn clone_via_with_new_parents(
    node: &dyn Node,
    parents: Vec<NodeId>,
    id: NodeId,
) -> ReduceResult<Box<dyn Node>> {
    node.with_new_parents(parents)
        .map_err(|e| ReduceError::MalformedNode { node: id, reason: e.0 })
}
