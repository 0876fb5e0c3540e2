pub mod context;
pub mod policy;
pub mod program_point;

pub use context::{Context, ContextId, ContextTable};
pub use policy::ContextPolicy;
pub use program_point::{FunctionContext, ProgramPoint};
