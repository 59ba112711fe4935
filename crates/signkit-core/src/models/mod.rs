//! Data models shared by the setup components.

pub mod asset;
pub mod identity;
pub mod signing;

pub use asset::*;
pub use identity::*;
pub use signing::*;
