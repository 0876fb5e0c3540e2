//! Abstract pointers

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::features::context::ContextId;
use crate::shared::models::ValueId;

/// Pointer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointerId(pub u32);

impl PointerId {
    /// Points to the universal object
    pub const UNIVERSAL: PointerId = PointerId(0);
    /// Points to the null object
    pub const NULL: PointerId = PointerId(1);

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PointerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ptr{}", self.0)
    }
}

/// A pointer-typed program value under a context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pointer {
    pub ctx: ContextId,
    pub value: ValueId,
}
