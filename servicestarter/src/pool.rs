//! Run-wide resource pool
//!
//! One `IntegrationTestEnvironment` is created per test run and shared by
//! `Arc` with every service instance. It hands out service and debug ports
//! from two separate counters and owns the key pair all services trust.
//! Counters never wrap; once a range passes 65535 allocation fails.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use shared::{ArtifactCoordinates, KeyPair};

use crate::config::{StarterConfig, DEBUG_PORT_BASE_VAR, PORT_BASE_VAR};
use crate::error::{StarterError, StarterResult};
use crate::microservice::MicroserviceConfig;
use crate::traits::ResourcePool;

pub struct IntegrationTestEnvironment {
    config: StarterConfig,
    next_port: AtomicU32,
    next_debug_port: AtomicU32,
    key_pair: KeyPair,
    applications: Mutex<BTreeSet<String>>,
}

impl IntegrationTestEnvironment {
    /// Create the pool for a new test run, generating its key pair
    pub fn new(config: StarterConfig) -> Self {
        Self::build(config, KeyPair::generate())
    }

    /// Create the pool around an existing key pair
    ///
    /// # Errors
    /// `StarterError::Shared` when the pair does not decode or its halves do
    /// not belong together.
    pub fn with_key_pair(config: StarterConfig, key_pair: KeyPair) -> StarterResult<Self> {
        let verifying = key_pair.verifying_key()?;
        if key_pair.signing_key()?.verifying_key() != verifying {
            return Err(shared::SharedError::InvalidKeyMaterial {
                message: "public key does not match private key".to_string(),
            }
            .into());
        }
        Ok(Self::build(config, key_pair))
    }

    fn build(config: StarterConfig, key_pair: KeyPair) -> Self {
        tracing::debug!(
            "Test environment ports from {}, debug ports from {}",
            config.port_base,
            config.debug_port_base
        );

        Self {
            next_port: AtomicU32::new(config.port_base.into()),
            next_debug_port: AtomicU32::new(config.debug_port_base.into()),
            key_pair,
            applications: Mutex::new(BTreeSet::new()),
            config,
        }
    }

    /// Convenience for sharing the pool between instances
    pub fn shared(config: StarterConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    pub fn config(&self) -> &StarterConfig {
        &self.config
    }

    /// Instance configuration seeded with this run's runtime, wait budget and
    /// kill grace
    pub fn microservice_config(
        &self,
        application_name: impl Into<String>,
        artifact: ArtifactCoordinates,
    ) -> MicroserviceConfig {
        MicroserviceConfig::new(application_name, artifact)
            .with_runtime(self.config.runtime.clone())
            .with_max_wait(self.config.max_wait)
            .with_kill_grace(self.config.kill_grace)
            .with_discovery_zone(self.config.discovery_url.clone())
    }

    /// Applications registered so far, in name order
    pub fn applications(&self) -> Vec<String> {
        self.applications
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}

fn allocate(counter: &AtomicU32, field: &str) -> StarterResult<u16> {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |next| {
            (next <= u32::from(u16::MAX)).then_some(next + 1)
        })
        .map(|port| port as u16)
        .map_err(|_| StarterError::configuration(field, "port range exhausted above 65535"))
}

impl ResourcePool for IntegrationTestEnvironment {
    fn fresh_port(&self) -> StarterResult<u16> {
        allocate(&self.next_port, PORT_BASE_VAR)
    }

    fn fresh_debug_port(&self) -> StarterResult<u16> {
        allocate(&self.next_debug_port, DEBUG_PORT_BASE_VAR)
    }

    fn key_pair(&self) -> KeyPair {
        self.key_pair.clone()
    }

    fn register_application(&self, application: &str) {
        self.applications
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(application.to_string());
    }
}
