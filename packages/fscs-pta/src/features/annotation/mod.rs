//! External function effects
//!
//! Functions without a body are modeled by an effect table keyed by name.
//! Each entry is an ordered list of `alloc`, `copy` and `exit` effects.
//!
//! ```yaml
//! version: 1
//! functions:
//!   strdup:
//!     - effect: alloc
//!     - effect: copy
//!       from: "*[arg0 + x]"
//!       to: "*[ret + x]"
//! ```

pub mod domain;
pub mod infrastructure;

pub use domain::{CopyDest, CopySource, PointerEffect, Position};
pub use infrastructure::ExternalPointerTable;
