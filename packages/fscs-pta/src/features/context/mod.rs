//! Context model
//!
//! Contexts are interned call strings. A policy decides, per call site, whether
//! the callee gets a longer call string or shares the caller's context.
//!
//! ## Architecture
//! - `domain`: `ContextTable`, `ProgramPoint`, the `ContextPolicy` trait
//! - `infrastructure`: uniform k-limit, selective k-CFA, adaptive policies
//! - `application`: `ContextSensitivity`, the configured policy switch

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::ContextSensitivity;
pub use domain::{Context, ContextId, ContextPolicy, ContextTable, FunctionContext, ProgramPoint};
pub use infrastructure::{AdaptiveContext, KLimitContext, SelectiveKcfa, SelectiveStats};
