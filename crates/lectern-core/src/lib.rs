//! Shared types, constants, configuration, and the core error type for the
//! Lectern scheduling engine.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
