//! Shared program model
//!
//! Types produced by the front-end collaborator and consumed by every
//! analysis feature.

pub mod models;
