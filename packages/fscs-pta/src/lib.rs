/*
 * FSCS Pointer Analysis - Semi-Sparse Flow/Context/Field-Sensitive Points-To Engine
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Program model consumed from the front-end (values, functions, CFGs)
 * - features/    : Vertical slices (context → memory_model → annotation → points_to)
 * - config/      : Analysis configuration (YAML v1 schema, presets, validation)
 *
 * Engine:
 * - Interned contexts, pointers and memory objects (arena index = identity)
 * - Two-level worklist with top-level / memory-level propagation
 * - Context-bounded store pruning at call boundaries
 */

#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::module_inception)] // Module naming intentional
#![allow(clippy::too_many_arguments)] // Transfer helpers thread many handles

pub mod config;
pub mod errors;
pub mod features;
pub mod shared;

pub use config::{AnalysisConfig, ContextPolicyConfig, Preset};
pub use errors::{FscsError, Result};
pub use features::annotation::{ExternalPointerTable, PointerEffect};
pub use features::context::{ContextId, ContextSensitivity, ContextTable, ProgramPoint};
pub use features::memory_model::{MemoryObjectId, PointerId, TypeLayoutTable};
pub use features::points_to::{
    AnalysisStats, Diagnostic, IntrospectiveSelection, PointsToQueries, PointsToResult, PtsSet,
    QueryAdapter, SemiSparsePointerAnalysis, Termination,
};
pub use shared::models::{Cfg, CfgBuilder, FunctionId, NodeId, NodeRef, Program, ProgramBuilder, ValueId};
