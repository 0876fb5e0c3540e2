//! Query ports
//!
//! `PointsToQueries` is the read-only surface every converged engine exposes.
//! Clients that only need value-level answers go through `QueryAdapter`,
//! which works over any implementation behind a trait object.

use crate::features::context::ContextId;
use crate::features::memory_model::{MemoryObjectId, Pointer, PointerId};
use crate::features::points_to::domain::PtsSet;
use crate::shared::models::{FunctionId, NodeRef, ValueId};

/// Read-only queries over a converged points-to solution
///
/// # Example
/// ```ignore
/// fn report<Q: PointsToQueries + ?Sized>(queries: &Q, value: ValueId) {
///     for object in queries.points_to(None, value).iter() {
///         println!("{} -> {}", value, object);
///     }
/// }
/// ```
pub trait PointsToQueries {
    /// Points-to set of `value` under `ctx`, or merged over every context
    /// when `ctx` is `None`. Unknown values yield the empty set.
    fn points_to(&self, ctx: Option<ContextId>, value: ValueId) -> PtsSet;

    /// Interned pointer for `value` under `ctx`, if the analysis created one
    fn pointer(&self, ctx: ContextId, value: ValueId) -> Option<PointerId>;

    /// The `(context, value)` pair behind a pointer handle
    fn pointer_value(&self, pointer: PointerId) -> Pointer;

    fn pointer_pts(&self, pointer: PointerId) -> PtsSet;

    fn may_alias(&self, a: PointerId, b: PointerId) -> bool {
        sets_may_alias(&self.pointer_pts(a), &self.pointer_pts(b))
    }

    /// Functions the call at `site` may invoke, under `ctx` or any context
    fn callees(&self, site: NodeRef, ctx: Option<ContextId>) -> Vec<FunctionId>;

    /// Pointers whose points-to set contains `object`
    fn pointed_by(&self, object: MemoryObjectId) -> Vec<PointerId>;

    /// Pointers that may alias `pointer`, excluding itself
    fn alias_set(&self, pointer: PointerId) -> Vec<PointerId>;
}

/// Alias test on two points-to sets. The universal object aliases anything
/// non-empty; the null object aliases nothing.
pub fn sets_may_alias(a: &PtsSet, b: &PtsSet) -> bool {
    let only_null = |set: &PtsSet| set.iter().all(|object| object.is_null());
    if only_null(a) || only_null(b) {
        return false;
    }
    if a.contains_universal() || b.contains_universal() {
        return true;
    }
    a.iter().any(|object| !object.is_null() && b.has(object))
}

/// Value-level helpers over any `PointsToQueries` implementation
pub struct QueryAdapter<'a> {
    queries: &'a dyn PointsToQueries,
}

impl<'a> QueryAdapter<'a> {
    pub fn new(queries: &'a dyn PointsToQueries) -> Self {
        Self { queries }
    }

    /// Context-insensitive alias test on two program values
    pub fn may_alias_values(&self, a: ValueId, b: ValueId) -> bool {
        sets_may_alias(&self.queries.points_to(None, a), &self.queries.points_to(None, b))
    }

    /// Values among `candidates` that may alias `value`
    pub fn alias_set_of_value(&self, value: ValueId, candidates: &[ValueId]) -> Vec<ValueId> {
        let target = self.queries.points_to(None, value);
        candidates
            .iter()
            .copied()
            .filter(|&other| other != value)
            .filter(|&other| sets_may_alias(&target, &self.queries.points_to(None, other)))
            .collect()
    }

    /// Every unordered pair of `values` that may alias
    pub fn all_aliasing_pairs(&self, values: &[ValueId]) -> Vec<(ValueId, ValueId)> {
        let sets: Vec<PtsSet> = values.iter().map(|&v| self.queries.points_to(None, v)).collect();
        let mut pairs = Vec::new();
        for i in 0..values.len() {
            for j in (i + 1)..values.len() {
                if sets_may_alias(&sets[i], &sets[j]) {
                    pairs.push((values[i], values[j]));
                }
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sets_may_alias() {
        let a = PtsSet::singleton(MemoryObjectId(5));
        let b = PtsSet::singleton(MemoryObjectId(5)).insert(MemoryObjectId(6));
        let c = PtsSet::singleton(MemoryObjectId(7));

        assert!(sets_may_alias(&a, &b));
        assert!(!sets_may_alias(&a, &c));
        assert!(!sets_may_alias(&a, &PtsSet::empty()));
        assert!(sets_may_alias(&c, &PtsSet::universal()));
        assert!(!sets_may_alias(&PtsSet::null(), &PtsSet::null()));
    }

    #[test]
    fn test_null_never_aliases_universal() {
        assert!(!sets_may_alias(&PtsSet::universal(), &PtsSet::null()));
        assert!(!sets_may_alias(&PtsSet::null(), &PtsSet::universal()));

        let maybe_null = PtsSet::null().insert(MemoryObjectId(7));
        assert!(sets_may_alias(&PtsSet::universal(), &maybe_null));
    }
}
