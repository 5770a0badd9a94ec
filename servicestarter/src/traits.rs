//! Trait definitions with mockall annotations for testing
//!
//! The collaborators the harness does not own itself: artifact retrieval, the
//! discovery registry, the tenant bootstrap, the run-wide resource pool, and
//! typed client construction. Production implementations live in
//! [`crate::services`] and [`crate::pool`].

use std::path::PathBuf;

use shared::{ArtifactCoordinates, KeyPair, ServiceInstanceRecord};

use crate::error::StarterResult;

/// Resolves versioned artifacts to local files
#[mockall::automock]
#[async_trait::async_trait]
pub trait ArtifactLocator: Send + Sync {
    /// Resolve group, name, classifier and version to a local, runnable file
    ///
    /// # Errors
    /// `StarterError::ArtifactResolution` when the artifact cannot be found.
    async fn resolve(&self, coordinates: &ArtifactCoordinates) -> StarterResult<PathBuf>;
}

/// Read access to the discovery registry
#[mockall::automock]
#[async_trait::async_trait]
pub trait DiscoveryClient: Send + Sync {
    /// All currently registered instances of `application`; empty when it has
    /// not registered yet
    async fn get_instances(&self, application: &str) -> StarterResult<Vec<ServiceInstanceRecord>>;
}

/// Tenant/security bootstrap run against a freshly started service
#[mockall::automock]
#[async_trait::async_trait]
pub trait TenantInitializer: Send + Sync {
    async fn initialize_tenant(&self, application: &str, server_uri: &str) -> StarterResult<()>;
}

/// Run-wide pool of ports and key material shared by all instances
///
/// Every allocation must be atomic so concurrently constructed instances never
/// receive the same port.
#[mockall::automock]
pub trait ResourcePool: Send + Sync {
    /// A service port no other instance of this run has received
    ///
    /// # Errors
    /// `StarterError::Configuration` once the port range is exhausted.
    fn fresh_port(&self) -> StarterResult<u16>;

    /// A debug-agent port no other instance of this run has received
    ///
    /// # Errors
    /// `StarterError::Configuration` once the port range is exhausted.
    fn fresh_debug_port(&self) -> StarterResult<u16>;

    /// The key pair shared by every service of this run
    fn key_pair(&self) -> KeyPair;

    /// Record that `application` takes part in this run
    fn register_application(&self, application: &str);
}

/// Builds typed clients bound to a base URI
pub trait ApiFactory<T>: Send + Sync {
    fn create(&self, base_uri: &str) -> T;
}

impl<T, F> ApiFactory<T> for F
where
    F: Fn(&str) -> T + Send + Sync,
{
    fn create(&self, base_uri: &str) -> T {
        self(base_uri)
    }
}
