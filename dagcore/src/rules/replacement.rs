use crate::context::RewriteContext;
use crate::error::ReduceResult;
use crate::node::{Node, NodeId};
use crate::rule::{ancestry_of, Importance, Rule, Tag};
use std::any::Any;
use std::sync::Arc;

/// A general property edit: call `transform` on the target's current
/// (up-to-date-parents) node value, and if the result isn't
/// value-equal to what went in, install it via `replace_same_kind`.
///
/// Because `replace_same_kind` requires the replacement to keep the
/// same kind, arity, and edges, `transform` may change a node's
/// configuration but not its shape. Reach for a hand-written [`Rule`]
/// impl instead when a rewrite needs to change what a node is
/// connected to or what kind it is.
pub struct ReplacementReducer {
    name: String,
    tag: Tag,
    importance: Importance,
    transform: Arc<dyn Fn(&dyn Node) -> Box<dyn Node> + Send + Sync>,
}

impl ReplacementReducer {
    pub fn new(
        name: impl Into<String>,
        tag: Tag,
        importance: Importance,
        transform: impl Fn(&dyn Node) -> Box<dyn Node> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            tag,
            importance,
            transform: Arc::new(transform),
        }
    }
}

impl Rule for ReplacementReducer {
    fn name(&self) -> &str {
        &self.name
    }

    fn importance(&self) -> Importance {
        self.importance
    }

    fn apply(&self, target: NodeId, ctx: &mut RewriteContext) -> ReduceResult<()> {
        let matches = match ctx.node(target) {
            Some(n) => ancestry_of(n.kind(), n.capabilities()).contains(&self.tag),
            None => false,
        };
        if !matches {
            return Ok(());
        }

        let current = ctx.with_current_parents(target)?;
        let replacement = (self.transform)(current.as_ref());
        if !current.value_eq(replacement.as_ref()) {
            ctx.replace_same_kind(target, replacement)?;
        }
        Ok(())
    }

    fn rule_eq(&self, other: &dyn Rule) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .map_or(false, |o| {
                o.name == self.name && o.tag == self.tag && Arc::ptr_eq(&o.transform, &self.transform)
            })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
