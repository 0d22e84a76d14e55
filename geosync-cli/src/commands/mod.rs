//! CLI command implementations.

pub mod common;
pub mod config;
pub mod status;
pub mod sweep;
pub mod sync;
