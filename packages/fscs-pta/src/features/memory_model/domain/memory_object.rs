//! Memory blocks and memory objects

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::features::context::ContextId;
use crate::shared::models::{FunctionId, TypeLayoutId, ValueId};

/// Memory object handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemoryObjectId(pub u32);

impl MemoryObjectId {
    /// Unknown target; may alias anything
    pub const UNIVERSAL: MemoryObjectId = MemoryObjectId(0);
    /// Target of the null pointer
    pub const NULL: MemoryObjectId = MemoryObjectId(1);

    #[inline]
    pub fn is_universal(self) -> bool {
        self == Self::UNIVERSAL
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self == Self::NULL
    }

    /// Universal and null objects are never updated
    #[inline]
    pub fn is_special(self) -> bool {
        self.is_universal() || self.is_null()
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for MemoryObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::UNIVERSAL => write!(f, "universal"),
            Self::NULL => write!(f, "null"),
            MemoryObjectId(id) => write!(f, "obj{}", id),
        }
    }
}

/// Memory block handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u32);

impl BlockId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Allocation site of a block. Stack and heap sites are context-qualified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AllocSite {
    Universal,
    Null,
    Global(ValueId),
    Function(FunctionId),
    Stack { ctx: ContextId, value: ValueId },
    Heap { ctx: ContextId, value: ValueId },
}

impl AllocSite {
    pub fn is_stack(&self) -> bool {
        matches!(self, AllocSite::Stack { .. })
    }

    pub fn is_heap(&self) -> bool {
        matches!(self, AllocSite::Heap { .. })
    }

    pub fn is_global(&self) -> bool {
        matches!(self, AllocSite::Global(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, AllocSite::Function(_))
    }

    pub fn context(&self) -> Option<ContextId> {
        match self {
            AllocSite::Stack { ctx, .. } | AllocSite::Heap { ctx, .. } => Some(*ctx),
            _ => None,
        }
    }

    /// The program value that names the allocation, if any
    pub fn value(&self) -> Option<ValueId> {
        match self {
            AllocSite::Global(value)
            | AllocSite::Stack { value, .. }
            | AllocSite::Heap { value, .. } => Some(*value),
            _ => None,
        }
    }
}

/// One allocation site with a fixed layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryBlock {
    pub site: AllocSite,
    pub layout: TypeLayoutId,
}

/// A location inside a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryObject {
    pub block: BlockId,
    pub offset: u64,
    /// Stands for an unbounded family of runtime locations
    pub summary: bool,
}
