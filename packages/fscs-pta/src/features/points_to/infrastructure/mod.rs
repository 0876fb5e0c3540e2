//! Engine internals: shared state, transfer functions, worklist, propagation

pub mod eval_result;
pub mod global_init;
pub mod global_state;
pub mod initializer;
pub mod propagator;
pub mod store_pruner;
pub mod transfer;
pub mod worklist;

pub use eval_result::{EvalResult, StoreHandle, Successor};
pub use global_init::GlobalPointerAnalysis;
pub use global_state::GlobalState;
pub use initializer::Initializer;
pub use propagator::Propagator;
pub use store_pruner::StorePruner;
pub use transfer::TransferFunction;
pub use worklist::Worklist;
