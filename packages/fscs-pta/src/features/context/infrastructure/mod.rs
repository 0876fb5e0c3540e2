pub mod adaptive;
pub mod k_limit;
pub mod selective_kcfa;

pub use adaptive::AdaptiveContext;
pub use k_limit::KLimitContext;
pub use selective_kcfa::{SelectiveKcfa, SelectiveStats};
