//! Service starter library for integration tests
//!
//! Launches service artifacts as child processes with isolated environments,
//! waits for them to register with discovery, exposes typed clients to test
//! code, and tears the processes down again.

pub mod config;
pub mod environment;
pub mod error;
pub mod initialized;
pub mod microservice;
pub mod pool;
pub mod process;
pub mod readiness;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use config::StarterConfig;
pub use environment::ProcessEnvironment;
pub use error::{StarterError, StarterResult};
pub use initialized::InitializedMicroservice;
pub use microservice::{DebugMode, Microservice, MicroserviceConfig};
pub use pool::IntegrationTestEnvironment;
pub use process::{DebugSettings, LaunchCommand, ServiceProcess};
pub use readiness::wait_until_registered;
pub use traits::{ApiFactory, ArtifactLocator, DiscoveryClient, ResourcePool, TenantInitializer};
