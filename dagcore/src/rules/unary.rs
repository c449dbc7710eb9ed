use crate::context::RewriteContext;
use crate::error::ReduceResult;
use crate::node::{Node, NodeId};
use crate::rule::{ancestry_of, Importance, Rule, Tag};
use std::any::Any;
use std::sync::Arc;

/// Removes a node that, at its current arity, is the identity: when a
/// unary target satisfies `is_identity_when_unary`, it is replaced by
/// its sole parent directly.
///
/// For example, a variadic "concatenate" node applied to a single
/// input is the identity at that arity and can be dropped.
pub struct RemoveIfUnaryReducer {
    name: String,
    tag: Tag,
    importance: Importance,
    is_identity_when_unary: Arc<dyn Fn(&dyn Node) -> bool + Send + Sync>,
}

impl RemoveIfUnaryReducer {
    /// `tag` selects which nodes this rule is offered.
    /// `is_identity_when_unary` decides, given the target node, whether
    /// it behaves as the identity function when it has exactly one
    /// parent.
    pub fn new(
        name: impl Into<String>,
        tag: Tag,
        importance: Importance,
        is_identity_when_unary: impl Fn(&dyn Node) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            tag,
            importance,
            is_identity_when_unary: Arc::new(is_identity_when_unary),
        }
    }
}

impl Rule for RemoveIfUnaryReducer {
    fn name(&self) -> &str {
        &self.name
    }

    fn importance(&self) -> Importance {
        self.importance
    }

    fn apply(&self, target: NodeId, ctx: &mut RewriteContext) -> ReduceResult<()> {
        let is_match = match ctx.node(target) {
            Some(n) => {
                ancestry_of(n.kind(), n.capabilities()).contains(&self.tag)
                    && (self.is_identity_when_unary)(n)
            }
            None => false,
        };
        if !is_match {
            return Ok(());
        }

        let parents = ctx.parents(target);
        if parents.len() != 1 {
            return Ok(());
        }
        let sole_parent = parents[0];

        ctx.try_replace_unviewed(target, || sole_parent.into());
        Ok(())
    }

    fn rule_eq(&self, other: &dyn Rule) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .map_or(false, |o| {
                o.name == self.name
                    && o.tag == self.tag
                    && Arc::ptr_eq(&o.is_identity_when_unary, &self.is_identity_when_unary)
            })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
