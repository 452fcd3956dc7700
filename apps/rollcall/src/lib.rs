//! # Rollcall Library
//!
//! This library exposes the Rollcall server modules for testing and integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod cli;
pub mod config;

// Re-export rollcall_core for convenience
pub use rollcall_core;
