//! Program model: values, functions, CFGs and type layouts

pub mod builder;
pub mod cfg;
pub mod ids;
pub mod program;
pub mod type_layout;

pub use builder::ProgramBuilder;
pub use cfg::{Cfg, CfgBuilder, CfgNode, CfgNodeKind};
pub use ids::{FunctionId, NodeId, NodeRef, TypeLayoutId, ValueId};
pub use program::{Function, GlobalVariable, Program, ValueInfo, ValueKind};
pub use type_layout::{ArrayLayout, ArrayTriple, PointerLayout, TypeLayout, TypeLayoutTable};
