//! Introspective context selection
//!
//! A context-insensitive pre-analysis measures how much points-to information
//! flows through each call site and allocation site. Sites whose numbers stay
//! under the thresholds get one level of context; the rest stay insensitive.
//!
//! Heuristic A refines an allocation site unless many variables point to its
//! objects, and a call site unless its argument in-flow or the callee's
//! field points-to sets are large. Heuristic B looks at the callee's total
//! points-to volume and at allocation sites' field points-to weighted by the
//! number of pointing variables.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::analyzer::SemiSparsePointerAnalysis;
use super::result::PointsToResult;
use crate::config::{AnalysisConfig, ContextPolicyConfig};
use crate::errors::Result;
use crate::features::annotation::PointerEffect;
use crate::features::context::{AdaptiveContext, ContextSensitivity, SelectiveKcfa};
use crate::features::memory_model::MemoryObjectId;
use crate::features::points_to::domain::PtsSet;
use crate::features::points_to::ports::PointsToQueries;
use crate::shared::models::{CfgNodeKind, FunctionId, NodeRef, Program, ValueId, ValueKind};

/// Depth given to refined sites
const REFINED_K: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Heuristic {
    #[default]
    A,
    B,
}

/// What the selection produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionTarget {
    /// Selective k-CFA with per-site bounds
    #[default]
    Selective,
    /// Adaptive policy tracking the refined call sites
    Adaptive { max_depth: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntrospectiveThresholds {
    /// K: variables pointing to an allocation site's objects (A)
    pub pointed_by_vars: usize,
    /// L: points-to in-flow of a call site's arguments (A)
    pub in_flow: usize,
    /// M: largest field points-to set seen by the callee (A)
    pub max_var_field_pts: usize,
    /// P: callee's total points-to volume (B)
    pub total_volume: usize,
    /// Q: field points-to times pointing variables of an allocation site (B)
    pub field_pts_by_vars: usize,
}

impl Default for IntrospectiveThresholds {
    fn default() -> Self {
        Self {
            pointed_by_vars: 50,
            in_flow: 100,
            max_var_field_pts: 75,
            total_volume: 200,
            field_pts_by_vars: 5000,
        }
    }
}

/// Pre-analysis measurements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntrospectiveMetrics {
    pub call_site_in_flow: FxHashMap<NodeRef, usize>,
    pub function_volume: FxHashMap<FunctionId, usize>,
    pub function_max_var_field_pts: FxHashMap<FunctionId, usize>,
    pub alloc_site_pointed_by_vars: FxHashMap<NodeRef, usize>,
    pub alloc_site_total_field_pts: FxHashMap<NodeRef, usize>,
}

#[derive(Debug, Clone, Default)]
pub struct IntrospectiveSelection {
    config: AnalysisConfig,
    heuristic: Heuristic,
    thresholds: IntrospectiveThresholds,
    target: SelectionTarget,
}

impl IntrospectiveSelection {
    /// `config` supplies the entry function, effect table and budgets of the
    /// pre-analysis; its context policy is ignored.
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn heuristic(mut self, heuristic: Heuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn thresholds(mut self, thresholds: IntrospectiveThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn target(mut self, target: SelectionTarget) -> Self {
        self.target = target;
        self
    }

    /// Run the pre-analysis on `program` and derive a policy from it
    pub fn select(&self, program: &Program) -> Result<ContextSensitivity> {
        let config = self.config.clone().with_policy(ContextPolicyConfig::None);
        let pre = SemiSparsePointerAnalysis::new(config).run(program)?;
        let metrics = self.measure(&pre);
        Ok(self.apply(program, &metrics))
    }

    /// Compute every metric from a finished (ideally insensitive) run
    pub fn measure(&self, result: &PointsToResult<'_>) -> IntrospectiveMetrics {
        let program = result.program();
        let field_pts = FieldPtsIndex::new(result);
        let mut metrics = IntrospectiveMetrics::default();

        for function in program.functions() {
            let Some(cfg) = function.cfg.as_ref() else {
                continue;
            };
            let params = program.pointer_params(function.id);

            let mut volume = 0;
            let mut max_field = 0;
            for &param in &params {
                let pts = result.points_to(None, param);
                volume += pts.len();
                max_field = max_field.max(field_pts.max_over(&pts));
            }

            for node in cfg.nodes() {
                let site = NodeRef::new(function.id, node.id);
                if let Some(dest) = node.kind.defined_value().filter(|&d| program.is_pointer(d)) {
                    let pts = result.points_to(None, dest);
                    volume += pts.len();
                    max_field = max_field.max(field_pts.max_over(&pts));
                }
                volume += node
                    .kind
                    .used_values()
                    .into_iter()
                    .filter(|&v| program.is_pointer(v) && is_variable(program, v))
                    .map(|v| result.points_to(None, v).len())
                    .sum::<usize>();

                if let CfgNodeKind::Call { args, .. } = &node.kind {
                    let in_flow = program
                        .pointer_args(args)
                        .map(|arg| result.points_to(None, arg).len())
                        .sum();
                    metrics.call_site_in_flow.insert(site, in_flow);
                }

                if let Some(dest) = allocation_dest(result, &node.kind) {
                    let objects = result.points_to(None, dest);
                    let mut vars: FxHashSet<ValueId> = FxHashSet::default();
                    let mut total_field = 0;
                    for object in objects.iter().filter(|o| !o.is_special()) {
                        vars.extend(result.pointed_by(object).into_iter().map(|p| result.pointer_value(p).value));
                        total_field += field_pts.total(object);
                    }
                    metrics.alloc_site_pointed_by_vars.insert(site, vars.len());
                    metrics.alloc_site_total_field_pts.insert(site, total_field);
                }
            }

            metrics.function_volume.insert(function.id, volume);
            metrics.function_max_var_field_pts.insert(function.id, max_field);
        }
        metrics
    }

    /// Turn metrics into a policy
    pub fn apply(&self, program: &Program, metrics: &IntrospectiveMetrics) -> ContextSensitivity {
        let t = &self.thresholds;
        let mut policy = SelectiveKcfa::new(0);
        let mut refined_calls = Vec::new();

        for (&site, &in_flow) in &metrics.call_site_in_flow {
            let Some(callee) = direct_defined_callee(program, site) else {
                continue;
            };
            let exceeds = match self.heuristic {
                Heuristic::A => {
                    let max_field = metrics.function_max_var_field_pts.get(&callee).copied().unwrap_or(0);
                    in_flow > t.in_flow || max_field > t.max_var_field_pts
                }
                Heuristic::B => metrics.function_volume.get(&callee).copied().unwrap_or(0) > t.total_volume,
            };
            let k = if exceeds { 0 } else { REFINED_K };
            policy.set_call_site_limit(site, k);
            if k > 0 {
                refined_calls.push(site);
            }
        }

        for (&site, &pointed_by) in &metrics.alloc_site_pointed_by_vars {
            let exceeds = match self.heuristic {
                Heuristic::A => pointed_by > t.pointed_by_vars,
                Heuristic::B => {
                    let total_field = metrics.alloc_site_total_field_pts.get(&site).copied().unwrap_or(0);
                    total_field.saturating_mul(pointed_by) > t.field_pts_by_vars
                }
            };
            policy.set_alloc_site_limit(site, if exceeds { 0 } else { REFINED_K });
        }

        let stats = policy.stats();
        info!(
            heuristic = ?self.heuristic,
            call_sites = stats.call_sites,
            refined_call_sites = refined_calls.len(),
            alloc_sites = stats.alloc_sites,
            "introspective selection done"
        );

        match self.target {
            SelectionTarget::Selective => ContextSensitivity::Selective(policy),
            SelectionTarget::Adaptive { max_depth } => {
                debug!(tracked = refined_calls.len(), max_depth, "tracking refined call sites");
                ContextSensitivity::Adaptive(AdaptiveContext::new(refined_calls, max_depth))
            }
        }
    }
}

/// Field pointers (values defined by offset nodes) grouped by target object,
/// with their points-to sizes cached
struct FieldPtsIndex {
    by_object: FxHashMap<MemoryObjectId, Vec<usize>>,
}

impl FieldPtsIndex {
    fn new(result: &PointsToResult<'_>) -> Self {
        let program = result.program();
        let mut by_object: FxHashMap<MemoryObjectId, Vec<usize>> = FxHashMap::default();
        let field_values = program.defined_nodes().filter_map(|(_, node)| match node.kind {
            CfgNodeKind::Offset { dest, .. } => Some(dest),
            _ => None,
        });
        for value in field_values {
            let pts = result.points_to(None, value);
            for object in pts.iter() {
                by_object.entry(object).or_default().push(pts.len());
            }
        }
        Self { by_object }
    }

    /// Largest field points-to set reaching one of the objects in `pts`
    fn max_over(&self, pts: &PtsSet) -> usize {
        pts.iter()
            .filter_map(|object| self.by_object.get(&object))
            .flat_map(|sizes| sizes.iter().copied())
            .max()
            .unwrap_or(0)
    }

    fn total(&self, object: MemoryObjectId) -> usize {
        self.by_object.get(&object).map_or(0, |sizes| sizes.iter().sum())
    }
}

/// Parameters and node-defined values, not constants or globals
fn is_variable(program: &Program, value: ValueId) -> bool {
    matches!(
        program.value(value).kind,
        ValueKind::Argument { .. } | ValueKind::Local { .. }
    )
}

/// Destination of an allocation: a stack alloc, or a call to an external
/// whose effects allocate
fn allocation_dest(result: &PointsToResult<'_>, kind: &CfgNodeKind) -> Option<ValueId> {
    match kind {
        CfgNodeKind::Alloc { dest, .. } => Some(*dest),
        CfgNodeKind::Call {
            dest: Some(dest),
            callee,
            ..
        } => {
            let program = result.program();
            let function = program.function(program.function_of_value(*callee)?);
            let effects = result.externals().lookup(&function.name)?;
            effects
                .iter()
                .any(|e| matches!(e, PointerEffect::Alloc { .. }))
                .then_some(*dest)
        }
        _ => None,
    }
}

fn direct_defined_callee(program: &Program, site: NodeRef) -> Option<FunctionId> {
    let CfgNodeKind::Call { callee, .. } = &program.node(site)?.kind else {
        return None;
    };
    let function = program.function_of_value(*callee)?;
    (!program.function(function).is_declaration()).then_some(function)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::ProgramBuilder;

    /// main calls `id` twice; `id` returns its argument
    fn two_calls() -> (Program, NodeRef, NodeRef) {
        let mut b = ProgramBuilder::new();
        let main = b.declare_function("main", &[], false);
        let id = b.declare_function("id", &[true], true);
        let int = b.layouts_mut().scalar(4);
        let x = b.local(main, "x", true);
        let y = b.local(main, "y", true);
        let r1 = b.local(main, "r1", true);
        let r2 = b.local(main, "r2", true);
        let id_value = b.function_value(id);
        let arg = b.param(id, 0);

        let mut body = b.body(main);
        body.alloc(x, int);
        body.alloc(y, int);
        let first = body.call(Some(r1), id_value, &[x]);
        let second = body.call(Some(r2), id_value, &[y]);
        body.ret(None);
        b.define(main, body);

        let mut body = b.body(id);
        body.ret(Some(arg));
        b.define(id, body);

        (b.build().unwrap(), NodeRef::new(main, first), NodeRef::new(main, second))
    }

    #[test]
    fn test_measure_in_flow() {
        let (program, first, _) = two_calls();
        let pre = SemiSparsePointerAnalysis::new(AnalysisConfig::default().with_policy(ContextPolicyConfig::None))
            .run(&program)
            .unwrap();
        let metrics = IntrospectiveSelection::default().measure(&pre);
        assert_eq!(metrics.call_site_in_flow.get(&first), Some(&1));
        assert_eq!(metrics.alloc_site_pointed_by_vars.len(), 2);
    }

    #[test]
    fn test_heuristic_a_thresholds() {
        let (program, first, second) = two_calls();
        let mut metrics = IntrospectiveMetrics::default();
        metrics.call_site_in_flow.insert(first, 1);
        metrics.call_site_in_flow.insert(second, 500);

        let policy = IntrospectiveSelection::default().apply(&program, &metrics);
        let ContextSensitivity::Selective(selective) = policy else {
            panic!("expected a selective policy");
        };
        assert_eq!(selective.call_site_limit(first), 1);
        assert_eq!(selective.call_site_limit(second), 0);
    }

    #[test]
    fn test_heuristic_b_uses_volume() {
        let (program, first, _) = two_calls();
        let id = program.function_by_name("id").unwrap();
        let mut metrics = IntrospectiveMetrics::default();
        metrics.call_site_in_flow.insert(first, 1);
        metrics.function_volume.insert(id, 1000);

        let policy = IntrospectiveSelection::default()
            .heuristic(Heuristic::B)
            .apply(&program, &metrics);
        let ContextSensitivity::Selective(selective) = policy else {
            panic!("expected a selective policy");
        };
        assert_eq!(selective.call_site_limit(first), 0);
    }

    #[test]
    fn test_selection_separates_call_sites() {
        let (program, _, _) = two_calls();
        let policy = IntrospectiveSelection::default().select(&program).unwrap();
        let result = SemiSparsePointerAnalysis::default()
            .with_policy(policy)
            .run(&program)
            .unwrap();
        assert!(result.converged());
        // global plus one context per refined call site
        assert_eq!(result.stats().contexts, 3);
    }
}
