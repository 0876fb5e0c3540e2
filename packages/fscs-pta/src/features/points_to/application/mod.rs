pub mod analyzer;
pub mod introspective;
pub mod result;

pub use analyzer::{SemiSparsePointerAnalysis, Termination};
pub use introspective::{
    Heuristic, IntrospectiveMetrics, IntrospectiveSelection, IntrospectiveThresholds, SelectionTarget,
};
pub use result::{AnalysisStats, PointsToResult};
