//! Memory & pointer abstraction
//!
//! Pointers are `(context, value)` pairs; memory objects are
//! `(block, offset, summary)` triples where a block is one allocation site.
//! Both are interned, so handle equality is identity.

pub mod domain;
pub mod infrastructure;

pub use crate::shared::models::{ArrayLayout, PointerLayout, TypeLayout, TypeLayoutTable};
pub use domain::{AllocSite, BlockId, MemoryBlock, MemoryObject, MemoryObjectId, Pointer, PointerId};
pub use infrastructure::{MemoryManager, PointerManager};
