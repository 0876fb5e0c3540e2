pub mod sensitivity;

pub use sensitivity::ContextSensitivity;
