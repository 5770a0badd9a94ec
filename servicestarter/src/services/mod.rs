//! Service implementations
//!
//! Production implementations of the collaborator traits that talk to the
//! outside world: the local artifact repository, the discovery registry, and
//! HTTP clients for the services under test.

pub mod api;
pub mod artifact;
pub mod discovery;

// Re-export all service implementations
pub use api::{ApiClient, HttpApiFactory, RestClient};
pub use artifact::LocalRepositoryLocator;
pub use discovery::EurekaDiscoveryClient;
