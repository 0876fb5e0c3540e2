//! Program points and function contexts

use serde::{Deserialize, Serialize};
use std::fmt;

use super::context::ContextId;
use crate::shared::models::{FunctionId, NodeRef};

/// A CFG node analysed under a context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProgramPoint {
    pub ctx: ContextId,
    pub node: NodeRef,
}

impl ProgramPoint {
    #[inline]
    pub fn new(ctx: ContextId, node: NodeRef) -> Self {
        Self { ctx, node }
    }

    #[inline]
    pub fn function_context(&self) -> FunctionContext {
        FunctionContext::new(self.ctx, self.node.function)
    }
}

impl fmt::Display for ProgramPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.ctx, self.node)
    }
}

/// A function analysed under a context; the unit of outer worklist scheduling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionContext {
    pub ctx: ContextId,
    pub function: FunctionId,
}

impl FunctionContext {
    #[inline]
    pub fn new(ctx: ContextId, function: FunctionId) -> Self {
        Self { ctx, function }
    }
}
