//! Rewrite rules and the registry that dispatches them to nodes.

use crate::capabilities::Capability;
use crate::context::RewriteContext;
use crate::error::ReduceResult;
use crate::fx::FxHashMap;
use crate::node::{Node, NodeKind};
use core::any::Any;
use core::fmt;
use smallvec::SmallVec;
use std::sync::Arc;

/// The cost/benefit tier a rule is registered at. Ordered so that
/// `Expensive < Normal < Essential`; an
/// [`importance floor`](crate::driver::ReduceConfig::importance_floor)
/// admits a rule iff the rule's importance is greater than or equal to
/// the floor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Importance {
    /// Worth trying even when it rarely pays off; skipped once the
    /// floor is raised above it.
    Expensive,
    /// The default tier for rules with a clear, usually-positive
    /// payoff.
    Normal,
    /// Required for correctness or for invariants downstream
    /// consumers depend on (e.g. removing a node kind a stricter mode
    /// forbids). Always applied regardless of floor.
    Essential,
}

/// A tag used to look up rules in the registry's class rule table:
/// either a node's kind, or one of the capabilities it asserts.
/// "Ancestry" for a node is the small, fixed-length set of tags
/// `{Tag::Kind(node.kind())} ∪ {Tag::Capability(c) : c is asserted}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Applies to every node of this kind.
    Kind(NodeKind),
    /// Applies to every node asserting this capability, regardless of
    /// kind.
    Capability(Capability),
}

/// Compute the ancestry of a node: the tags its kind and capabilities
/// satisfy, used to look up class rules that apply to it.
pub fn ancestry_of(kind: NodeKind, caps: crate::capabilities::NodeCapabilities) -> SmallVec<[Tag; 5]> {
    let mut tags = SmallVec::new();
    tags.push(Tag::Kind(kind));
    tags.extend(caps.tags().into_iter().map(Tag::Capability));
    tags
}

/// A local rewrite: given a target node and a context bound to it,
/// either do nothing or invoke exactly one of the context's mutation
/// primitives describing the rewrite.
///
/// Rules must be stateless, immutable, and deterministic, and must not
/// capture references to nodes across invocations; the `&self`
/// receiver is never mutated. Every rule type must also be `Send +
/// Sync`, since independent reductions over different graphs may run
/// concurrently even though a single reduction never invokes rules
/// concurrently with itself.
pub trait Rule: Any + Send + Sync {
    /// A short, stable name used in error messages and trace logging.
    fn name(&self) -> &str;

    /// The cost/benefit tier this rule is registered at.
    fn importance(&self) -> Importance;

    /// Attempt the rewrite. A no-op return is always valid; rules are
    /// expected to precheck applicability internally rather than rely
    /// on a separate `applies_to` call.
    fn apply(&self, target: crate::node::NodeId, ctx: &mut RewriteContext) -> ReduceResult<()>;

    /// Value equality between two rule instances, used by
    /// [`RewriteContext::has_class_rule`] to answer "will the driver
    /// apply this exact rule (not just this rule type) to matching
    /// descendants". Rules with no configuration can simply check the
    /// concrete type; parameterized rules (e.g.
    /// [`crate::rules::AssociativeClassReducer`]) must also compare
    /// their configuration.
    fn rule_eq(&self, other: &dyn Rule) -> bool;

    /// Support downcasting, mirroring [`Node::as_any`].
    fn as_any(&self) -> &dyn Any;
}

impl fmt::Debug for dyn Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Rule({}, {:?})", self.name(), self.importance())
    }
}

/// The catalogue of rules available to a reduction: a class rule
/// table (tag -> rules) plus, implicitly, whatever instance rules each
/// node contributes for itself.
#[derive(Default)]
pub struct RuleRegistry {
    class_rules: FxHashMap<Tag, Vec<Arc<dyn Rule>>>,
}

impl RuleRegistry {
    /// An empty registry with no class rules registered.
    pub fn new() -> Self {
        Self {
            class_rules: FxHashMap::default(),
        }
    }

    /// Register `rule` against `tag`: it will be considered for every
    /// node whose ancestry includes `tag`.
    pub fn register(&mut self, tag: Tag, rule: Arc<dyn Rule>) -> &mut Self {
        self.class_rules.entry(tag).or_default().push(rule);
        self
    }

    /// All class rules registered against any tag in `ancestry`.
    pub fn class_rules_for(&self, ancestry: &[Tag]) -> Vec<Arc<dyn Rule>> {
        let mut rules = Vec::new();
        for tag in ancestry {
            if let Some(for_tag) = self.class_rules.get(tag) {
                rules.extend(for_tag.iter().cloned());
            }
        }
        rules
    }

    /// The rules applicable to `node`: its instance rules plus the
    /// class rules registered against its ancestry, filtered to those
    /// at or above `floor`.
    pub fn applicable_rules(&self, node: &dyn Node, floor: Importance) -> Vec<Arc<dyn Rule>> {
        let ancestry = ancestry_of(node.kind(), node.capabilities());
        let mut rules = self.class_rules_for(&ancestry);
        rules.extend(node.instance_rules());
        rules.retain(|r| r.importance() >= floor);
        rules
    }

    /// Does this registry contain a rule value-equal to `rule`,
    /// registered against `tag`?
    pub fn has_class_rule(&self, tag: Tag, rule: &dyn Rule) -> bool {
        self.class_rules
            .get(&tag)
            .map_or(false, |rules| rules.iter().any(|r| r.rule_eq(rule)))
    }

    /// Would this registry apply a rule value-equal to `rule` to
    /// `node`, either as one of `node`'s own instance rules or as a
    /// class rule registered against `node`'s ancestry? Exposed for
    /// external collaborators to sanity-check their own rule wiring
    /// without needing to drive a full reduction.
    pub fn contains_rule_for(&self, node: &dyn Node, rule: &dyn Rule) -> bool {
        if node.instance_rules().iter().any(|r| r.rule_eq(rule)) {
            return true;
        }
        let ancestry = ancestry_of(node.kind(), node.capabilities());
        ancestry.iter().any(|&tag| self.has_class_rule(tag, rule))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn importance_orders_expensive_below_essential() {
        assert!(Importance::Expensive < Importance::Normal);
        assert!(Importance::Normal < Importance::Essential);
    }

    #[test]
    fn ancestry_includes_kind_and_capability_tags() {
        let caps = crate::capabilities::NodeCapabilities::none().with_constant_result(true);
        let tags = ancestry_of(NodeKind::PreparedTransformer, caps);
        assert!(tags.contains(&Tag::Kind(NodeKind::PreparedTransformer)));
        assert!(tags.contains(&Tag::Capability(Capability::ConstantResult)));
        assert_eq!(tags.len(), 2);
    }

    struct NoOpRule(&'static str);

    impl Rule for NoOpRule {
        fn name(&self) -> &str {
            self.0
        }

        fn importance(&self) -> Importance {
            Importance::Normal
        }

        fn apply(&self, _target: crate::node::NodeId, _ctx: &mut RewriteContext) -> ReduceResult<()> {
            Ok(())
        }

        fn rule_eq(&self, other: &dyn Rule) -> bool {
            other.as_any().downcast_ref::<Self>().map_or(false, |o| o.0 == self.0)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn contains_rule_for_finds_a_class_rule_via_ancestry() {
        use crate::node::test_support::Leaf;

        let mut registry = RuleRegistry::new();
        let rule: Arc<dyn Rule> = Arc::new(NoOpRule("placeholder_rule"));
        registry.register(Tag::Kind(NodeKind::Placeholder), rule.clone());

        let placeholder = Leaf {
            kind: NodeKind::Placeholder,
            tag: "p",
        };
        let generator = Leaf {
            kind: NodeKind::Generator,
            tag: "g",
        };
        assert!(registry.contains_rule_for(&placeholder, rule.as_ref()));
        assert!(!registry.contains_rule_for(&generator, rule.as_ref()));
    }

    #[test]
    fn contains_rule_for_finds_an_instance_rule() {
        struct WithInstanceRule;
        impl fmt::Debug for WithInstanceRule {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "WithInstanceRule")
            }
        }
        impl Node for WithInstanceRule {
            fn kind(&self) -> NodeKind {
                NodeKind::Generator
            }
            fn stored_parents(&self) -> &[crate::node::NodeId] {
                &[]
            }
            fn with_new_parents(
                &self,
                parents: Vec<crate::node::NodeId>,
            ) -> Result<Box<dyn Node>, crate::node::ArityError> {
                if !parents.is_empty() {
                    return Err(crate::node::ArityError("no parents expected".to_string()));
                }
                Ok(Box::new(WithInstanceRule))
            }
            fn capabilities(&self) -> crate::capabilities::NodeCapabilities {
                crate::capabilities::NodeCapabilities::none()
            }
            fn result_type(&self) -> crate::node::ResultType {
                std::any::TypeId::of::<()>()
            }
            fn instance_rules(&self) -> Vec<Arc<dyn Rule>> {
                vec![Arc::new(NoOpRule("instance_rule"))]
            }
            fn value_eq(&self, _other: &dyn Node) -> bool {
                false
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        let registry = RuleRegistry::new();
        let node = WithInstanceRule;
        let rule = node.instance_rules().into_iter().next().unwrap();
        assert!(registry.contains_rule_for(&node, rule.as_ref()));
        assert!(!registry.contains_rule_for(&node, &NoOpRule("unrelated") as &dyn Rule));
    }

    #[test]
    fn rule_and_registry_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RuleRegistry>();
        assert_send_sync::<Arc<dyn Rule>>();
    }
}
