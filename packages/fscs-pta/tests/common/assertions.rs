//! Domain assertions

use fscs_pta::{MemoryObjectId, PointsToQueries, PointsToResult, PtsSet, ValueId};

/// The single object `value` points to anywhere in the program
pub fn single_target(result: &PointsToResult<'_>, value: ValueId) -> MemoryObjectId {
    let pts = result.points_to(None, value);
    pts.single()
        .unwrap_or_else(|| panic!("expected {} to have one target, got {:?}", value, pts))
}

pub fn assert_same_targets(result: &PointsToResult<'_>, a: ValueId, b: ValueId) {
    let (pa, pb) = (result.points_to(None, a), result.points_to(None, b));
    assert_eq!(pa, pb, "points-to sets of {} and {} differ", a, b);
}

pub fn assert_converged(result: &PointsToResult<'_>) {
    assert!(
        result.converged(),
        "analysis stopped early: {:?}",
        result.termination()
    );
}

pub fn objects(pts: &PtsSet) -> Vec<MemoryObjectId> {
    pts.iter().collect()
}
