//! The node model: the closed set of shapes every vertex in the DAG can
//! take, and the trait concrete node types implement to participate in
//! reduction.

use crate::capabilities::NodeCapabilities;
use crate::rule::Rule;
use core::any::Any;
use core::fmt;
use std::any::TypeId;
use std::sync::Arc;

/// The dense handle assigned to a node on entry into a
/// [`WorkingGraph`](crate::graph::WorkingGraph). Replaces
/// reference/pointer identity as the graph's indexing key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

dagcore_entity::entity_impl!(NodeId);

impl dagcore_entity::ReservedValue for NodeId {
    fn reserved_value() -> Self {
        NodeId(u32::MAX)
    }

    fn is_reserved_value(&self) -> bool {
        self.0 == u32::MAX
    }
}

/// The closed set of shapes a node may take. Orthogonal to this, each
/// node also carries a [`NodeCapabilities`] bitset and arbitrary
/// kind-specific configuration hidden behind the [`Node`] trait.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A named external input to the DAG. No parents.
    Placeholder,
    /// Produces a value purely as a function of the example index. No
    /// parents.
    Generator,
    /// A pure function of its ordered parents.
    PreparedTransformer,
    /// A two-phase node: preparation consumes parent values to produce
    /// a `PreparedTransformer` (its *prepared projection*); application
    /// behaves as that projection.
    PreparableTransformer,
    /// Depends structurally on a single `PreparableTransformer` parent
    /// and observes its prepared projection rather than its values.
    TransformerView,
}

impl NodeKind {
    /// Whether nodes of this kind may have zero parents by
    /// construction (`Placeholder`/`Generator`) as opposed to having
    /// zero parents incidentally.
    pub fn is_source(self) -> bool {
        matches!(self, NodeKind::Placeholder | NodeKind::Generator)
    }
}

/// An opaque token standing in for the result type a node produces.
/// Two nodes are "type compatible" for the purposes of a mutation
/// primitive iff their `ResultType`s are equal.
pub type ResultType = TypeId;

/// Failure produced by [`Node::with_new_parents`] when given a parent
/// list of the wrong arity or containing a parent of an incompatible
/// kind. Independent of whatever [`NodeId`] (if any) the node
/// currently occupies in a working graph; the caller that does know
/// the id wraps this into [`crate::error::ReduceError::MalformedNode`].
#[derive(Clone, Debug)]
pub struct ArityError(pub String);

impl fmt::Display for ArityError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The interface every concrete node type in a pipeline DAG implements
/// to participate in reduction.
///
/// The reduction engine never constructs a `dyn Node` itself except by
/// calling [`Node::with_new_parents`] on an existing one; all other
/// node construction happens outside this crate.
pub trait Node: Any + fmt::Debug + Send + Sync {
    /// Which of the five closed shapes this node has.
    fn kind(&self) -> NodeKind;

    /// The parent list this node instance remembers. May diverge from
    /// the working graph's edges for this node; callers that need the
    /// authoritative parents go through
    /// [`RewriteContext::parents`](crate::context::RewriteContext::parents)
    /// or [`RewriteContext::with_current_parents`](crate::context::RewriteContext::with_current_parents).
    fn stored_parents(&self) -> &[NodeId];

    /// Number of parents this node instance remembers.
    fn arity(&self) -> usize {
        self.stored_parents().len()
    }

    /// Produce a copy of this node whose stored parents are `parents`,
    /// preserving kind, configuration, and value-equality class.
    ///
    /// Implementors must reject a `parents` list of the wrong length,
    /// or containing a parent of a kind incompatible with a slot, with
    /// [`ArityError`] rather than panicking.
    fn with_new_parents(&self, parents: Vec<NodeId>) -> Result<Box<dyn Node>, ArityError>;

    /// The capability flags this node asserts about itself.
    fn capabilities(&self) -> NodeCapabilities;

    /// The opaque result type this node produces, used by the
    /// mutation primitives to check that a replacement is
    /// type-compatible with what it replaces. For a
    /// `PreparableTransformer` this is also the result type of its
    /// prepared projection, since preparation does not change the
    /// type of value the node ultimately yields.
    fn result_type(&self) -> ResultType;

    /// The rewrite rules this specific node instance contributes,
    /// beyond whatever class rules its kind or capabilities pull in
    /// from the registry's class rule table. Most node kinds
    /// contribute none.
    fn instance_rules(&self) -> Vec<Arc<dyn Rule>> {
        Vec::new()
    }

    /// Value equality: are `self` and `other` the same kind, same
    /// configuration, and pointwise-equal on parents? Nodes that only
    /// support handle equality should always return `false` here
    /// (two reference-distinct nodes are simply never value-equal).
    fn value_eq(&self, other: &dyn Node) -> bool;

    /// Support downcasting a `&dyn Node` back to its concrete type,
    /// e.g. from within a rule that only fires for one node kind.
    fn as_any(&self) -> &dyn Any;
}
