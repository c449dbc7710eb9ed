use crate::context::RewriteContext;
use crate::error::{ReduceError, ReduceResult};
use crate::node::{Node, NodeId, NodeKind};
use crate::rule::{ancestry_of, Importance, Rule, Tag};
use std::any::Any;
use std::sync::Arc;

/// Flattens nested applications of an associative operator: when a
/// target node has a parent that is itself an instance of the same
/// operator, that parent's own parents are spliced into the target's
/// parent list in its place.
///
/// For example, given `is_same_operator` recognizing a "Sum" node,
/// `Sum(Sum(a, b), c)` reduces to `Sum(a, b, c)` in one application.
pub struct AssociativeClassReducer {
    name: String,
    tag: Tag,
    importance: Importance,
    is_same_operator: Arc<dyn Fn(NodeKind, &dyn Node) -> bool + Send + Sync>,
}

impl AssociativeClassReducer {
    /// `tag` selects which nodes this rule is offered (typically
    /// `Tag::Kind` of the associative operator's own kind).
    /// `is_same_operator` decides, given the target's kind and a
    /// candidate parent, whether that parent is an instance of the
    /// same operator and should be flattened into the target.
    pub fn new(
        name: impl Into<String>,
        tag: Tag,
        importance: Importance,
        is_same_operator: impl Fn(NodeKind, &dyn Node) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            tag,
            importance,
            is_same_operator: Arc::new(is_same_operator),
        }
    }
}

impl Rule for AssociativeClassReducer {
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

        let parents = ctx.parents(target).to_vec();
        let mut new_parents = Vec::with_capacity(parents.len());
        let mut flattened = false;
        for p in parents {
            let is_same = match ctx.node(p) {
                Some(pn) => (self.is_same_operator)(target_kind, pn),
                None => false,
            };
            if is_same {
                flattened = true;
                new_parents.extend(ctx.parents(p).iter().copied());
            } else {
                new_parents.push(p);
            }
        }
        if !flattened {
            return Ok(());
        }

        let target_clone = ctx.with_current_parents(target)?;
        let replacement = target_clone
            .with_new_parents(new_parents)
            .map_err(|e| ReduceError::MalformedNode { node: target, reason: e.0 })?;
        ctx.replace(target, replacement)?;
        Ok(())
    }

    fn rule_eq(&self, other: &dyn Rule) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .map_or(false, |o| {
                o.name == self.name
                    && o.tag == self.tag
                    && Arc::ptr_eq(&o.is_same_operator, &self.is_same_operator)
            })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
