pub mod memory_object;
pub mod pointer;

pub use memory_object::{AllocSite, BlockId, MemoryBlock, MemoryObject, MemoryObjectId};
pub use pointer::{Pointer, PointerId};
