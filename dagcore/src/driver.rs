//! The outer pass loop: repeatedly sweep the working graph in
//! topological order, offering each live node's applicable rules a
//! chance to rewrite it, until a pass makes no change or the pass
//! budget is exhausted.

use crate::context::RewriteContext;
use crate::error::{ReduceError, ReduceResult};
use crate::graph::{PreparedDagMode, WorkingGraph};
use crate::node::NodeKind;
use crate::rule::{Importance, RuleRegistry};

/// How a reduction should run.
#[derive(Clone, Debug)]
pub struct ReduceConfig {
    /// Rules below this tier are never offered a node, regardless of
    /// what the registry has on file for it.
    pub importance_floor: Importance,
    /// Whether the working graph must never contain a
    /// `PreparableTransformer`.
    pub prepared_dag_mode: PreparedDagMode,
    /// Whether the driver should keep sweeping until a pass makes no
    /// change (`true`), or treat `pass_budget` as the expected number
    /// of passes rather than just a safety cap (`false`).
    pub complete_reduction: bool,
    /// The maximum number of sweeps to run before giving up on
    /// reaching a fixed point.
    pub pass_budget: usize,
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self {
            importance_floor: Importance::Normal,
            prepared_dag_mode: PreparedDagMode::Permissive,
            complete_reduction: true,
            pass_budget: 64,
        }
    }
}

/// Counters describing how a reduction ran, useful for tests and for
/// diagnosing a reduction that didn't converge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReduceStats {
    /// Number of sweeps performed.
    pub passes: usize,
    /// Number of node visits across all sweeps (a node visited in
    /// multiple passes is counted once per pass).
    pub nodes_visited: usize,
    /// Number of times a rule's `apply` was invoked, regardless of
    /// whether it ended up mutating anything.
    pub rules_attempted: usize,
    /// Number of rule applications that actually mutated the graph.
    pub rule_applications: usize,
    /// Number of nodes inserted into the working graph over the run
    /// (initial construction is not a rule application and is not
    /// counted here; see [`crate::graph::WorkingGraph::nodes_created`]).
    pub nodes_created: usize,
    /// Number of nodes garbage-collected from the working graph over
    /// the run.
    pub nodes_retired: usize,
    /// Whether the final sweep made no change, i.e. a fixed point was
    /// reached before `pass_budget` was exhausted.
    pub reached_fixpoint: bool,
}

/// Drives a [`WorkingGraph`] to a fixed point (or until the configured
/// pass budget is exhausted) against a [`RuleRegistry`].
pub struct ReduceDriver;

impl ReduceDriver {
    /// Run the reduction in place.
    pub fn run(
        graph: &mut WorkingGraph,
        registry: &RuleRegistry,
        config: &ReduceConfig,
    ) -> ReduceResult<ReduceStats> {
        let mut stats = ReduceStats::default();
        loop {
            if stats.passes >= config.pass_budget {
                stats.reached_fixpoint = false;
                log::debug!(
                    "reduction stopped at pass budget {} without reaching a fixed point",
                    config.pass_budget
                );
                break;
            }
            stats.passes += 1;
            let changed = Self::sweep(graph, registry, config, &mut stats)?;
            if !changed {
                stats.reached_fixpoint = true;
                break;
            }
        }
        stats.nodes_created = graph.nodes_created();
        stats.nodes_retired = graph.nodes_retired();
        log::debug!(
            "reduction finished after {} pass(es), {} rule attempt(s), {} rule application(s), \
             {} node(s) created, {} node(s) retired, fixpoint={}",
            stats.passes,
            stats.rules_attempted,
            stats.rule_applications,
            stats.nodes_created,
            stats.nodes_retired,
            stats.reached_fixpoint
        );
        if config.prepared_dag_mode == PreparedDagMode::Strict {
            if let Some(survivor) = graph
                .live_ids()
                .into_iter()
                .find(|&id| matches!(graph.node(id).map(|n| n.kind()), Some(NodeKind::PreparableTransformer)))
            {
                return Err(ReduceError::MalformedNode {
                    node: survivor,
                    reason: "prepared_dag_mode is Strict but a PreparableTransformer survived \
                             reduction to a fixed point"
                        .to_string(),
                });
            }
        }
        Ok(stats)
    }

    fn sweep(
        graph: &mut WorkingGraph,
        registry: &RuleRegistry,
        config: &ReduceConfig,
        stats: &mut ReduceStats,
    ) -> ReduceResult<bool> {
        let order = graph.topo_order();
        let order_len = order.len();
        stats.nodes_visited += order_len;
        let mut changed = false;
        for node_id in order {
            if !graph.contains(node_id) {
                continue;
            }
            let rules = {
                let node = match graph.node(node_id) {
                    Some(node) => node,
                    None => continue,
                };
                registry.applicable_rules(node, config.importance_floor)
            };
            for rule in rules {
                if !graph.contains(node_id) {
                    break;
                }
                crate::trace!("pass {}: trying rule {} on {:?}", stats.passes, rule.name(), node_id);
                let mut ctx =
                    RewriteContext::new(graph, registry, config, node_id, rule.name());
                stats.rules_attempted += 1;
                rule.apply(node_id, &mut ctx).map_err(|source| {
                    ReduceError::ReductionAborted {
                        rule: rule.name().to_string(),
                        node: node_id,
                        source: Box::new(source),
                    }
                })?;
                if ctx.is_dirty() {
                    crate::trace!("pass {}: rule {} mutated {:?}", stats.passes, rule.name(), node_id);
                    changed = true;
                    stats.rule_applications += 1;
                }
            }
        }
        log::debug!(
            "pass {} visited {} node(s), mutated={}",
            stats.passes,
            order_len,
            changed
        );
        Ok(changed)
    }
}
