//! Typed failures surfaced by the working graph and the rewrite driver.

use crate::node::NodeId;
use thiserror::Error;

/// Everything that can go wrong while building, rewriting, or
/// materialising a working graph.
///
/// All failures propagate out of the reduction; none of them are
/// recoverable mid-reduction, since the working graph may be
/// partway through a mutation by the time one is detected.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReduceError {
    /// A node reported an arity or parent-kind violation, e.g. a
    /// `with_new_parents` call was given the wrong number of parents,
    /// or a parent of a kind incompatible with a slot.
    #[error("node {node:?} is malformed: {reason}")]
    MalformedNode {
        /// The offending node.
        node: NodeId,
        /// A human-readable description of the violation.
        reason: String,
    },

    /// A replacement would introduce a new `Placeholder` that isn't
    /// already present in the graph's declared placeholder list.
    #[error("replacement for node {existing:?} would introduce a new placeholder")]
    PlaceholderInjection {
        /// The node the replacement targeted.
        existing: NodeId,
    },

    /// A replacement would introduce a `PreparableTransformer` while
    /// the driver is running in strict prepared-DAG mode.
    #[error(
        "replacement for node {existing:?} would introduce a preparable transformer \
         while prepared_dag_mode is Strict"
    )]
    PreparableInjection {
        /// The node the replacement targeted.
        existing: NodeId,
    },

    /// `replace_unviewed` (or the general mutation primitives, which
    /// share this precondition with it) was invoked on a node that
    /// still has `TransformerView` children.
    #[error("node {node:?} cannot be replaced unviewed: it still has view children")]
    ViewedNode {
        /// The node that is still viewed.
        node: NodeId,
    },

    /// A rule passed an `existing` node to a mutation primitive that
    /// is neither the rule's target nor one of the target's ancestors
    /// in the working graph.
    #[error(
        "rule {rule} passed node {existing:?}, which is not the current target \
         or one of its ancestors"
    )]
    DanglingReference {
        /// The name of the rule that made the call.
        rule: String,
        /// The node it incorrectly referenced.
        existing: NodeId,
    },

    /// A rule raised an error during `apply`. The working graph must
    /// be considered invalid from this point on.
    #[error("rule {rule} aborted the reduction of node {node:?}: {source}")]
    ReductionAborted {
        /// The rule whose `apply` call failed.
        rule: String,
        /// The node it was applied to.
        node: NodeId,
        /// The underlying failure.
        #[source]
        source: Box<ReduceError>,
    },
}

/// A `Result` defaulted to [`ReduceError`].
pub type ReduceResult<T> = Result<T, ReduceError>;
