//! Feature slices, leaves first:
//! - `context`: call-string contexts and precision policies
//! - `memory_model`: interned pointers, memory blocks and objects
//! - `annotation`: external-function effect tables
//! - `points_to`: state containers, transfer functions and the fixpoint engine

pub mod annotation;
pub mod context;
pub mod memory_model;
pub mod points_to;
