//! # Semi-sparse flow- and context-sensitive points-to analysis
//!
//! Pointers live in a flow-insensitive, context-qualified environment; memory
//! contents live in per-program-point stores. Nodes that only define
//! pointers propagate along def-use edges without touching a store, while
//! loads, stores, calls and returns carry stores along the sparse
//! control-flow graph.
//!
//! ## Architecture
//! - `domain`: `PtsSet`, `Env`, `Store`, `Memo`, `CallGraph`, diagnostics
//! - `infrastructure`: shared state, transfer functions, worklist, pruning
//! - `application`: the fixpoint driver, results, introspective selection
//! - `ports`: `PointsToQueries` and the `QueryAdapter` facade
//!
//! ## Usage
//! ```text
//! let result = SemiSparsePointerAnalysis::new(AnalysisConfig::default()).run(&program)?;
//! if result.may_alias(p, q) { ... }
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use application::{
    AnalysisStats, Heuristic, IntrospectiveSelection, IntrospectiveThresholds, PointsToResult,
    SelectionTarget, SemiSparsePointerAnalysis, Termination,
};
pub use domain::{CallGraph, Diagnostic, PtsSet, Store};
pub use ports::{PointsToQueries, QueryAdapter};
