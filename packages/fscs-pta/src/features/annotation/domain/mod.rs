pub mod effect;

pub use effect::{CopyDest, CopySource, PointerEffect, Position};
