pub mod memory_manager;
pub mod pointer_manager;

pub use memory_manager::MemoryManager;
pub use pointer_manager::PointerManager;
