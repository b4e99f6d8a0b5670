//! Orchestrator - day-cycle scheduler
//!
//! Drives the three-phase day loop and the run-until-stable outer loop.
//!
//! See `engine.rs` for full implementation.

pub mod engine;

pub use engine::{DayResult, Orchestrator, RunReport};
