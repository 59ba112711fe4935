//! signkit core library
//!
//! Release signing setup for Flutter Android projects: keystore generation,
//! key.properties, Firebase config backup and Gradle build script patching.

pub mod assets;
pub mod config;
pub mod error;
pub mod flutter;
pub mod gradle;
pub mod models;
pub mod signing;
pub mod staging;

pub use config::SetupConfig;
pub use error::{Result, SignkitError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
