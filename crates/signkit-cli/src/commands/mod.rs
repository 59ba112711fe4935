//! CLI command implementations.

pub mod assets;
pub mod config;
pub mod doctor;
pub mod patch;
pub mod setup;
