//! Common test utilities for servicestarter integration tests
//!
//! Provides fixtures and a builder for instances launched through fake
//! runtime scripts out of a throwaway artifact repository.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
