//! Shared types for the service starter test harness
//!
//! Contains the types that both the harness library and its binary need:
//! property pairs, artifact coordinates, discovery records, the run-wide key
//! pair, and the logging setup.

pub mod errors;
pub mod keys;
pub mod logging;
pub mod types;

pub use errors::*;
pub use keys::KeyPair;
pub use types::*;
