pub mod table_loader;

pub use table_loader::ExternalPointerTable;
