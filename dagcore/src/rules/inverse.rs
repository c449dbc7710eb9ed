use crate::context::RewriteContext;
use crate::error::ReduceResult;
use crate::node::{Node, NodeId, NodeKind};
use crate::rule::{ancestry_of, Importance, Rule, Tag};
use std::any::Any;
use std::sync::Arc;

/// Collapses an operator applied directly to the constructor it
/// extracts from: when a unary target's sole parent is recognized by
/// `is_inverse_of_target` as that constructor, the target is replaced
/// by the grandparent at `parent_input_index` directly.
///
/// For example, given a recognizer for a 2-ary "Pair" constructor and
/// `parent_input_index = 1`, `SecondOfPair(Pair(a, b))` reduces to `b`
/// in one application. A unary constructor with `parent_input_index =
/// 0` models the `Negate(Negate(x))` -> `x` shape as a special case.
pub struct InverseClassReducer {
    name: String,
    tag: Tag,
    importance: Importance,
    parent_input_index: usize,
    is_inverse_of_target: Arc<dyn Fn(NodeKind, &dyn Node) -> bool + Send + Sync>,
}

impl InverseClassReducer {
    /// `tag` selects which nodes this rule is offered.
    /// `is_inverse_of_target` decides, given the target's kind and its
    /// sole parent, whether that parent is the constructor this target
    /// extracts from. `parent_input_index` is which of that
    /// constructor's own parents the target collapses to.
    pub fn new(
        name: impl Into<String>,
        tag: Tag,
        importance: Importance,
        parent_input_index: usize,
        is_inverse_of_target: impl Fn(NodeKind, &dyn Node) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            tag,
            importance,
            parent_input_index,
            is_inverse_of_target: Arc::new(is_inverse_of_target),
        }
    }
}

impl Rule for InverseClassReducer {
    fn name(&self) -> &str {
        &self.name
    }

    fn importance(&self) -> Importance {
        self.importance
    }

    fn apply(&self, target: NodeId, ctx: &mut RewriteContext) -> ReduceResult<()> {
        let target_kind = match ctx.node(target) {
            Some(n) if ancestry_of(n.kind(), n.capabilities()).contains(&self.tag) => n.kind(),
            _ => return Ok(()),
        };

        let parents = ctx.parents(target);
        if parents.len() != 1 {
            return Ok(());
        }
        let parent = parents[0];

        let is_inverse = match ctx.node(parent) {
            Some(pn) => (self.is_inverse_of_target)(target_kind, pn),
            None => false,
        };
        if !is_inverse {
            return Ok(());
        }

        let grandparents = ctx.parents(parent);
        let Some(&inner) = grandparents.get(self.parent_input_index) else {
            return Ok(());
        };

        ctx.try_replace_unviewed(target, || inner.into());
        Ok(())
    }

    fn rule_eq(&self, other: &dyn Rule) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .map_or(false, |o| {
                o.name == self.name
                    && o.tag == self.tag
                    && o.parent_input_index == self.parent_input_index
                    && Arc::ptr_eq(&o.is_inverse_of_target, &self.is_inverse_of_target)
            })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
