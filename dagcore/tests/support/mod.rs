//! Toy node kinds used only by the integration suite: just enough of a
//! pipeline vocabulary to exercise the reduction engine end to end
//! without depending on any real transformer implementation.

use dagcore::rules::{AssociativeClassReducer, InverseClassReducer, RemoveIfUnaryReducer};
use dagcore::{ArityError, Importance, Node, NodeCapabilities, NodeId, NodeKind, ResultType, Rule, Tag};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// A fixed value, independent of the example index and of any parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constant(pub i64);

impl Node for Constant {
    fn kind(&self) -> NodeKind {
        NodeKind::PreparedTransformer
    }

    fn stored_parents(&self) -> &[NodeId] {
        &[]
    }

    fn with_new_parents(&self, parents: Vec<NodeId>) -> Result<Box<dyn Node>, ArityError> {
        if !parents.is_empty() {
            return Err(ArityError(format!("Constant takes no parents, got {}", parents.len())));
        }
        Ok(Box::new(*self))
    }

    fn capabilities(&self) -> NodeCapabilities {
        NodeCapabilities::none()
            .with_constant_result(true)
            .with_always_constant_result(true)
            .with_has_trivial_equality(true)
    }

    fn result_type(&self) -> ResultType {
        TypeId::of::<i64>()
    }

    fn value_eq(&self, other: &dyn Node) -> bool {
        other.as_any().downcast_ref::<Constant>().map_or(false, |o| o == self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A named external input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder(pub String);

impl Node for Placeholder {
    fn kind(&self) -> NodeKind {
        NodeKind::Placeholder
    }

    fn stored_parents(&self) -> &[NodeId] {
        &[]
    }

    fn with_new_parents(&self, parents: Vec<NodeId>) -> Result<Box<dyn Node>, ArityError> {
        if !parents.is_empty() {
            return Err(ArityError(format!("Placeholder takes no parents, got {}", parents.len())));
        }
        Ok(Box::new(self.clone()))
    }

    fn capabilities(&self) -> NodeCapabilities {
        NodeCapabilities::none()
    }

    fn result_type(&self) -> ResultType {
        TypeId::of::<i64>()
    }

    fn value_eq(&self, other: &dyn Node) -> bool {
        other.as_any().downcast_ref::<Placeholder>().map_or(false, |o| o == self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Variadic integer sum of its parents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sum(pub Vec<NodeId>);

impl Node for Sum {
    fn kind(&self) -> NodeKind {
        NodeKind::PreparedTransformer
    }

    fn stored_parents(&self) -> &[NodeId] {
        &self.0
    }

    fn with_new_parents(&self, parents: Vec<NodeId>) -> Result<Box<dyn Node>, ArityError> {
        Ok(Box::new(Sum(parents)))
    }

    fn capabilities(&self) -> NodeCapabilities {
        NodeCapabilities::none()
    }

    fn result_type(&self) -> ResultType {
        TypeId::of::<i64>()
    }

    fn value_eq(&self, other: &dyn Node) -> bool {
        other.as_any().downcast_ref::<Sum>().map_or(false, |o| o == self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A variadic node that, at arity one, behaves as the identity on its
/// sole parent (e.g. a "concatenate" operator applied to one input).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariadicIdentity(pub Vec<NodeId>);

impl Node for VariadicIdentity {
    fn kind(&self) -> NodeKind {
        NodeKind::PreparedTransformer
    }

    fn stored_parents(&self) -> &[NodeId] {
        &self.0
    }

    fn with_new_parents(&self, parents: Vec<NodeId>) -> Result<Box<dyn Node>, ArityError> {
        Ok(Box::new(VariadicIdentity(parents)))
    }

    fn capabilities(&self) -> NodeCapabilities {
        NodeCapabilities::none()
    }

    fn result_type(&self) -> ResultType {
        TypeId::of::<i64>()
    }

    fn instance_rules(&self) -> Vec<Arc<dyn Rule>> {
        vec![Arc::new(RemoveIfUnaryReducer::new(
            "variadic_identity_is_identity_when_unary",
            Tag::Kind(NodeKind::PreparedTransformer),
            Importance::Essential,
            |n| n.as_any().downcast_ref::<VariadicIdentity>().is_some(),
        ))]
    }

    fn value_eq(&self, other: &dyn Node) -> bool {
        other.as_any().downcast_ref::<VariadicIdentity>().map_or(false, |o| o == self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A variadic "narrow" combinator other operators can flatten into;
/// stands in for something like a horizontal array concatenation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composite(pub Vec<NodeId>);

impl Node for Composite {
    fn kind(&self) -> NodeKind {
        NodeKind::PreparedTransformer
    }

    fn stored_parents(&self) -> &[NodeId] {
        &self.0
    }

    fn with_new_parents(&self, parents: Vec<NodeId>) -> Result<Box<dyn Node>, ArityError> {
        Ok(Box::new(Composite(parents)))
    }

    fn capabilities(&self) -> NodeCapabilities {
        NodeCapabilities::none()
    }

    fn result_type(&self) -> ResultType {
        TypeId::of::<Vec<i64>>()
    }

    fn value_eq(&self, other: &dyn Node) -> bool {
        other.as_any().downcast_ref::<Composite>().map_or(false, |o| o == self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A variadic combinator that is associative with respect to
/// [`Composite`]: a `Composite` parent's own parents can be spliced
/// directly into a `Densify`'s parent list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Densify(pub Vec<NodeId>);

impl Node for Densify {
    fn kind(&self) -> NodeKind {
        NodeKind::PreparedTransformer
    }

    fn stored_parents(&self) -> &[NodeId] {
        &self.0
    }

    fn with_new_parents(&self, parents: Vec<NodeId>) -> Result<Box<dyn Node>, ArityError> {
        Ok(Box::new(Densify(parents)))
    }

    fn capabilities(&self) -> NodeCapabilities {
        NodeCapabilities::none()
    }

    fn result_type(&self) -> ResultType {
        TypeId::of::<Vec<i64>>()
    }

    fn instance_rules(&self) -> Vec<Arc<dyn Rule>> {
        vec![Arc::new(AssociativeClassReducer::new(
            "densify_absorbs_composite",
            Tag::Kind(NodeKind::PreparedTransformer),
            Importance::Essential,
            |_target_kind, parent| parent.as_any().downcast_ref::<Composite>().is_some(),
        ))]
    }

    fn value_eq(&self, other: &dyn Node) -> bool {
        other.as_any().downcast_ref::<Densify>().map_or(false, |o| o == self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Pairs its two parents into a 2-tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tupled2(pub [NodeId; 2]);

impl Node for Tupled2 {
    fn kind(&self) -> NodeKind {
        NodeKind::PreparedTransformer
    }

    fn stored_parents(&self) -> &[NodeId] {
        &self.0
    }

    fn with_new_parents(&self, parents: Vec<NodeId>) -> Result<Box<dyn Node>, ArityError> {
        match parents.as_slice() {
            &[a, b] => Ok(Box::new(Tupled2([a, b]))),
            _ => Err(ArityError(format!("Tupled2 takes 2 parents, got {}", parents.len()))),
        }
    }

    fn capabilities(&self) -> NodeCapabilities {
        NodeCapabilities::none()
    }

    fn result_type(&self) -> ResultType {
        TypeId::of::<(i64, i64)>()
    }

    fn value_eq(&self, other: &dyn Node) -> bool {
        other.as_any().downcast_ref::<Tupled2>().map_or(false, |o| o == self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Extracts the second element of a [`Tupled2`] parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecondOfTuple(pub NodeId);

impl Node for SecondOfTuple {
    fn kind(&self) -> NodeKind {
        NodeKind::PreparedTransformer
    }

    fn stored_parents(&self) -> &[NodeId] {
        std::slice::from_ref(&self.0)
    }

    fn with_new_parents(&self, parents: Vec<NodeId>) -> Result<Box<dyn Node>, ArityError> {
        match parents.as_slice() {
            &[p] => Ok(Box::new(SecondOfTuple(p))),
            _ => Err(ArityError(format!("SecondOfTuple takes 1 parent, got {}", parents.len()))),
        }
    }

    fn capabilities(&self) -> NodeCapabilities {
        NodeCapabilities::none()
    }

    fn result_type(&self) -> ResultType {
        TypeId::of::<i64>()
    }

    fn instance_rules(&self) -> Vec<Arc<dyn Rule>> {
        vec![Arc::new(InverseClassReducer::new(
            "second_of_tupled2_collapses",
            Tag::Kind(NodeKind::PreparedTransformer),
            Importance::Essential,
            1,
            |_target_kind, parent| parent.as_any().downcast_ref::<Tupled2>().is_some(),
        ))]
    }

    fn value_eq(&self, other: &dyn Node) -> bool {
        other.as_any().downcast_ref::<SecondOfTuple>().map_or(false, |o| o == self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A two-phase node: stands in for a transformer whose preparation
/// consumes parent values to yield a prepared projection. The toy
/// evaluator never actually prepares one; only its presence/absence
/// under `prepared_dag_mode` is exercised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preparable(pub Vec<NodeId>, pub &'static str);

impl Node for Preparable {
    fn kind(&self) -> NodeKind {
        NodeKind::PreparableTransformer
    }

    fn stored_parents(&self) -> &[NodeId] {
        &self.0
    }

    fn with_new_parents(&self, parents: Vec<NodeId>) -> Result<Box<dyn Node>, ArityError> {
        Ok(Box::new(Preparable(parents, self.1)))
    }

    fn capabilities(&self) -> NodeCapabilities {
        NodeCapabilities::none()
    }

    fn result_type(&self) -> ResultType {
        TypeId::of::<i64>()
    }

    fn value_eq(&self, other: &dyn Node) -> bool {
        other.as_any().downcast_ref::<Preparable>().map_or(false, |o| o == self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Observes a [`Preparable`] parent's prepared projection rather than
/// its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct View(pub NodeId);

impl Node for View {
    fn kind(&self) -> NodeKind {
        NodeKind::TransformerView
    }

    fn stored_parents(&self) -> &[NodeId] {
        std::slice::from_ref(&self.0)
    }

    fn with_new_parents(&self, parents: Vec<NodeId>) -> Result<Box<dyn Node>, ArityError> {
        match parents.as_slice() {
            &[p] => Ok(Box::new(View(p))),
            _ => Err(ArityError(format!("View takes 1 parent, got {}", parents.len()))),
        }
    }

    fn capabilities(&self) -> NodeCapabilities {
        NodeCapabilities::none()
    }

    fn result_type(&self) -> ResultType {
        TypeId::of::<i64>()
    }

    fn value_eq(&self, other: &dyn Node) -> bool {
        other.as_any().downcast_ref::<View>().map_or(false, |o| o == self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Folds a [`Sum`] all of whose current parents are live [`Constant`]
/// nodes into a single `Constant` of their total. Not part of the
/// crate's built-in rule library: constant folding needs to inspect
/// parent *values*, which the generic, node-local
/// [`dagcore::rules::ReplacementReducer`] has no way to do, so this
/// suite writes it out by hand the way a collaborator would for their
/// own node kind.
pub struct FoldConstantSum;

impl Rule for FoldConstantSum {
    fn name(&self) -> &str {
        "fold_constant_sum"
    }

    fn importance(&self) -> dagcore::Importance {
        dagcore::Importance::Normal
    }

    fn apply(&self, target: NodeId, ctx: &mut dagcore::RewriteContext) -> dagcore::ReduceResult<()> {
        let Some(node) = ctx.node(target) else {
            return Ok(());
        };
        if node.as_any().downcast_ref::<Sum>().is_none() {
            return Ok(());
        }
        let parents = ctx.parents(target).to_vec();
        if parents.is_empty() {
            return Ok(());
        }
        let mut total = 0i64;
        for &p in &parents {
            let Some(pn) = ctx.node(p) else { return Ok(()) };
            let Some(c) = pn.as_any().downcast_ref::<Constant>() else {
                return Ok(());
            };
            total += c.0;
        }
        ctx.replace(target, Box::new(Constant(total)) as Box<dyn Node>)?;
        Ok(())
    }

    fn rule_eq(&self, other: &dyn Rule) -> bool {
        other.as_any().downcast_ref::<Self>().is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A tiny in-tree evaluator for the `i64`-valued subset of these toy
/// node kinds (`Placeholder`, `Constant`, `Sum`, `VariadicIdentity`),
/// used only to check observational equivalence between a reduced and
/// an unreduced DAG. Never exposed outside the test suite.
pub fn evaluate_i64(
    dag: &dagcore::ReducedDag,
    node: NodeId,
    inputs: &HashMap<String, i64>,
    names: &HashMap<NodeId, String>,
) -> i64 {
    let n = dag.node(node).expect("node is live");
    if let Some(c) = n.as_any().downcast_ref::<Constant>() {
        return c.0;
    }
    if n.as_any().downcast_ref::<Placeholder>().is_some() {
        let name = names.get(&node).expect("placeholder has a bound name");
        return *inputs.get(name).expect("input value provided");
    }
    if let Some(s) = n.as_any().downcast_ref::<Sum>() {
        return s.0.iter().map(|&p| evaluate_i64(dag, p, inputs, names)).sum();
    }
    if let Some(v) = n.as_any().downcast_ref::<VariadicIdentity>() {
        assert_eq!(v.0.len(), 1, "toy evaluator only handles unary VariadicIdentity");
        return evaluate_i64(dag, v.0[0], inputs, names);
    }
    panic!("evaluate_i64 does not know how to evaluate {n:?}");
}

pub fn essential_registry_i64() -> dagcore::RuleRegistry {
    let mut registry = dagcore::RuleRegistry::new();
    registry.register(
        dagcore::Tag::Kind(NodeKind::PreparedTransformer),
        Arc::new(FoldConstantSum) as Arc<dyn Rule>,
    );
    registry
}
