//! Property-based tests
//!
//! Invariants that should hold for all inputs:
//! - Points-to sets form a join semilattice with the universal object on top
//! - Array offsets fold into the first element
//! - Call strings never grow past their bound
//! - On straight-line copy programs the result is the exact closure

use fscs_pta::config::MAX_CONTEXT_DEPTH;
use fscs_pta::{
    AnalysisConfig, ContextId, ContextSensitivity, ContextTable, FunctionId, MemoryObjectId,
    NodeId, NodeRef, PointsToQueries, ProgramBuilder, PtsSet, SemiSparsePointerAnalysis,
    TypeLayoutTable, ValueId,
};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn pts_from(ids: &[u32]) -> PtsSet {
    ids.iter()
        .fold(PtsSet::empty(), |set, &id| set.insert(MemoryObjectId(id)))
}

// ============================================================================
// PtsSet lattice
// ============================================================================

proptest! {
    #[test]
    fn prop_union_is_commutative_and_idempotent(
        a in prop::collection::vec(2u32..64, 0..12),
        b in prop::collection::vec(2u32..64, 0..12),
    ) {
        let (a, b) = (pts_from(&a), pts_from(&b));
        prop_assert_eq!(a.union(&b), b.union(&a));
        prop_assert_eq!(a.union(&a), a.clone());
        prop_assert!(a.union(&b).includes(&a));
        prop_assert!(a.union(&b).includes(&b));
    }

    #[test]
    fn prop_universal_absorbs(ids in prop::collection::vec(1u32..64, 0..12)) {
        let set = pts_from(&ids);
        let joined = set.union(&PtsSet::universal());
        prop_assert_eq!(joined.len(), 1);
        prop_assert!(joined.contains_universal());
        prop_assert_eq!(set.insert(MemoryObjectId::UNIVERSAL), PtsSet::universal());
    }

    #[test]
    fn prop_merge_all_matches_pairwise_union(
        sets in prop::collection::vec(prop::collection::vec(2u32..32, 0..6), 0..6),
    ) {
        let sets: Vec<PtsSet> = sets.iter().map(|ids| pts_from(ids)).collect();
        let pairwise = sets.iter().fold(PtsSet::empty(), |acc, s| acc.union(s));
        prop_assert_eq!(PtsSet::merge_all(&sets), pairwise);
    }
}

// ============================================================================
// Layout folding
// ============================================================================

proptest! {
    #[test]
    fn prop_array_offsets_fold_into_first_element(
        elem_size in 1u64..64,
        count in 1u64..32,
        index in 0u64..32,
        within in 0u64..64,
    ) {
        prop_assume!(index < count && within < elem_size);
        let mut layouts = TypeLayoutTable::new();
        let elem = layouts.scalar(elem_size);
        let array = layouts.array_of(elem, count);

        let offset = index * elem_size + within;
        let (folded, summary) = layouts.get(array).offset_into(offset);
        prop_assert_eq!(folded, within);
        prop_assert!(summary);
    }
}

// ============================================================================
// Call-string bounds
// ============================================================================

proptest! {
    #[test]
    fn prop_push_never_exceeds_bound(
        k in 0usize..=MAX_CONTEXT_DEPTH,
        sites in prop::collection::vec(0u32..8, 0..40),
    ) {
        let mut table = ContextTable::new();
        let policy = ContextSensitivity::k_limit(k);
        let mut ctx = ContextId::GLOBAL;
        for site in sites {
            let site = NodeRef::new(FunctionId(0), NodeId(site));
            let next = policy.push_context(&mut table, ctx, Some(site));
            prop_assert!(table.depth(next) <= k);
            if table.depth(ctx) == k {
                prop_assert_eq!(next, ctx);
            }
            ctx = next;
        }
    }

    #[test]
    fn prop_truncate_keeps_most_recent_sites(
        sites in prop::collection::vec(0u32..8, 0..12),
        k in 0usize..12,
    ) {
        let mut table = ContextTable::new();
        let mut ctx = ContextId::GLOBAL;
        for &site in &sites {
            ctx = table.push(ctx, NodeRef::new(FunctionId(0), NodeId(site)));
        }
        let truncated = table.truncate(ctx, k);
        let full = table.call_sites(ctx);
        let kept = table.call_sites(truncated);
        prop_assert_eq!(kept.len(), full.len().min(k));
        prop_assert_eq!(&kept[..], &full[..kept.len()]);
    }
}

// ============================================================================
// Straight-line copy programs
// ============================================================================

/// Each copy defines a fresh value from earlier values
fn copy_program() -> impl Strategy<Value = (usize, Vec<Vec<usize>>)> {
    (1usize..5).prop_flat_map(|allocs| {
        let copies = prop::collection::vec(prop::collection::vec(any::<prop::sample::Index>(), 1..4), 0..10);
        (Just(allocs), copies).prop_map(|(allocs, copies)| {
            let sources = copies
                .into_iter()
                .enumerate()
                .map(|(i, picks)| picks.into_iter().map(|p| p.index(allocs + i)).collect())
                .collect();
            (allocs, sources)
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_copy_closure_is_exact((allocs, copies) in copy_program()) {
        let mut b = ProgramBuilder::new();
        let main = b.declare_function("main", &[], false);
        let int = b.layouts_mut().scalar(4);
        let values: Vec<ValueId> = (0..allocs + copies.len())
            .map(|i| b.local(main, &format!("v{}", i), true))
            .collect();

        let mut body = b.body(main);
        for &value in &values[..allocs] {
            body.alloc(value, int);
        }
        for (i, sources) in copies.iter().enumerate() {
            let srcs: Vec<ValueId> = sources.iter().map(|&s| values[s]).collect();
            body.copy(values[allocs + i], &srcs);
        }
        body.ret(None);
        b.define(main, body);
        let program = b.build().unwrap();

        // Expected: the allocations each value transitively copies from
        let mut expected: Vec<BTreeSet<usize>> = (0..allocs).map(|i| BTreeSet::from([i])).collect();
        for sources in &copies {
            let set = sources.iter().flat_map(|&s| expected[s].clone()).collect();
            expected.push(set);
        }

        for k in [0, 1] {
            let result = SemiSparsePointerAnalysis::new(AnalysisConfig::default().uniform_k(k))
                .run(&program)
                .unwrap();
            prop_assert!(result.converged());

            let objects: Vec<MemoryObjectId> = values[..allocs]
                .iter()
                .map(|&v| result.points_to(None, v).single().unwrap())
                .collect();
            for (value, want) in values.iter().zip(&expected) {
                let want: BTreeSet<MemoryObjectId> = want.iter().map(|&i| objects[i]).collect();
                let got: BTreeSet<MemoryObjectId> = result.points_to(None, *value).iter().collect();
                prop_assert_eq!(got, want);
            }
        }
    }
}
