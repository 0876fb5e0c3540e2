//! Context policy behavior on a shared identity function

mod common;

use common::*;
use fscs_pta::config::SiteRef;
use fscs_pta::{
    AnalysisConfig, ContextId, ContextPolicyConfig, ContextSensitivity, ContextTable,
    PointsToQueries, PointsToResult, ProgramBuilder, SemiSparsePointerAnalysis,
};
use pretty_assertions::assert_eq;

fn run_with(fixture: &IdentityCalls, policy: ContextPolicyConfig) -> PointsToResult<'_> {
    let config = AnalysisConfig::default().with_policy(policy);
    let result = SemiSparsePointerAnalysis::new(config)
        .run(&fixture.program)
        .unwrap();
    assert_converged(&result);
    result
}

fn targets(fixture: &IdentityCalls, result: &PointsToResult<'_>) -> [Vec<fscs_pta::MemoryObjectId>; 3] {
    fixture
        .results
        .map(|r| objects(&result.points_to(None, r)))
}

#[test]
fn test_uniform_one_separates_every_call() {
    let fixture = identity_calls();
    let result = run_with(&fixture, ContextPolicyConfig::uniform(1));

    let [r0, r1, r2] = targets(&fixture, &result);
    for (i, got) in [r0, r1, r2].into_iter().enumerate() {
        let expected = single_target(&result, fixture.args[i]);
        assert_eq!(got, vec![expected]);
    }
    // One context per call site plus the global one
    assert_eq!(result.contexts().len(), 4);
}

#[test]
fn test_insensitive_merges_every_call() {
    let fixture = identity_calls();
    let result = run_with(&fixture, ContextPolicyConfig::none());

    let [r0, r1, r2] = targets(&fixture, &result);
    assert_eq!(r0.len(), 3);
    assert_eq!(r0, r1);
    assert_eq!(r1, r2);
    assert_eq!(result.contexts().len(), 1);
}

#[test]
fn test_selective_refines_only_the_configured_site() {
    let fixture = identity_calls();
    let first = fixture.sites[0];
    let policy = ContextPolicyConfig::selective(0)
        .call_site("main", first.node.0, 1)
        .into();
    let result = run_with(&fixture, policy);

    let ox = single_target(&result, fixture.args[0]);
    let oy = single_target(&result, fixture.args[1]);
    let oz = single_target(&result, fixture.args[2]);

    let [r0, r1, r2] = targets(&fixture, &result);
    assert_eq!(r0, vec![ox]);
    let mut merged = vec![oy, oz];
    merged.sort();
    assert_eq!(r1, merged);
    assert_eq!(r2, merged);
}

#[test]
fn test_adaptive_tracks_like_selective() {
    let fixture = identity_calls();
    let first = fixture.sites[0];
    let policy = ContextPolicyConfig::adaptive(vec![SiteRef {
        function: "main".to_string(),
        node: first.node.0,
    }]);
    let result = run_with(&fixture, policy);

    let ox = single_target(&result, fixture.args[0]);
    let [r0, r1, _] = targets(&fixture, &result);
    assert_eq!(r0, vec![ox]);
    assert_eq!(r1.len(), 2);
    assert_eq!(result.contexts().len(), 2);
}

#[test]
fn test_selective_rejects_unknown_site() {
    let fixture = identity_calls();
    let policy: ContextPolicyConfig = ContextPolicyConfig::selective(0)
        .call_site("main", 999, 1)
        .into();
    let config = AnalysisConfig::default().with_policy(policy);
    assert!(SemiSparsePointerAnalysis::new(config)
        .run(&fixture.program)
        .is_err());
}

#[test]
fn test_resolved_policy_overrides_config() {
    let fixture = identity_calls();
    let result = SemiSparsePointerAnalysis::new(AnalysisConfig::default().uniform_k(1))
        .with_policy(ContextSensitivity::insensitive())
        .run(&fixture.program)
        .unwrap();

    assert_eq!(result.contexts().len(), 1);
    assert_eq!(result.stats().policy, "uniform-k");
}

#[test]
fn test_context_push_is_idempotent_at_the_bound() {
    let mut table = ContextTable::new();
    let policy = ContextSensitivity::k_limit(2);
    let fixture = identity_calls();
    let [s0, s1, s2] = fixture.sites;

    let c1 = policy.push_context(&mut table, ContextId::GLOBAL, Some(s0));
    let c2 = policy.push_context(&mut table, c1, Some(s1));
    let c3 = policy.push_context(&mut table, c2, Some(s2));
    assert_eq!(table.depth(c2), 2);
    assert_eq!(c3, c2);
    assert_eq!(policy.push_context(&mut table, c3, Some(s2)), c2);

    // Calls that may not extend a context keep the caller's
    assert_eq!(policy.push_context(&mut table, c1, None), c1);
}

#[test]
fn test_preserved_global_contexts_keep_results() {
    let mut b = ProgramBuilder::new();
    let main = b.declare_function("main", &[], false);
    let get = b.declare_function("get", &[], true);
    let ptr = b.layouts_mut().pointer(8);
    let int = b.layouts_mut().scalar(4);
    let target = b.global("target", int);
    let slot = b.global("slot", ptr);
    b.global_initializer(slot, 0, target);
    let loaded = b.local(get, "loaded", true);
    let result_value = b.local(main, "r", true);
    let get_value = b.function_value(get);

    let mut body = b.body(get);
    body.load(loaded, slot);
    body.ret(Some(loaded));
    b.define(get, body);

    let mut body = b.body(main);
    body.call(Some(result_value), get_value, &[]);
    body.ret(None);
    b.define(main, body);
    let program = b.build().unwrap();

    let normalized = SemiSparsePointerAnalysis::new(AnalysisConfig::default())
        .run(&program)
        .unwrap();
    let preserved =
        SemiSparsePointerAnalysis::new(AnalysisConfig::default().preserve_global_contexts(true))
            .run(&program)
            .unwrap();

    let expected = normalized.object_of(target).unwrap();
    assert_eq!(objects(&normalized.points_to(None, result_value)), vec![expected]);
    assert_eq!(
        normalized.points_to(None, result_value),
        preserved.points_to(None, result_value)
    );
}
