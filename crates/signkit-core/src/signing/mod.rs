//! Android release signing material.
//!
//! This module provides functionality for:
//! - locating keytool and generating the upload keystore
//! - key.properties generation
//! - the setup completion marker

pub mod android;
pub mod keytool;

pub use android::*;
pub use keytool::*;
