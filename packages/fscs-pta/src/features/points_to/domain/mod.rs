pub mod call_graph;
pub mod diagnostic;
pub mod env;
pub mod memo;
pub mod pts_set;
pub mod store;

pub use call_graph::CallGraph;
pub use diagnostic::{Diagnostic, Diagnostics};
pub use env::Env;
pub use memo::Memo;
pub use pts_set::PtsSet;
pub use store::Store;
