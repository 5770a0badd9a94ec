//! Per-instance runtime environment
//!
//! A `ProcessEnvironment` is the complete property set handed to one spawned
//! service as its process environment. Construction reserves a port from the
//! run's pool, installs the shared key pair, and bakes in discovery and broker
//! defaults tuned for fast registration. Everything can be overridden with
//! later property applications. Once the process is started the environment is
//! only read.

use std::collections::HashMap;

use shared::{KeyPair, KeyValuePair};

use crate::error::StarterResult;
use crate::traits::ResourcePool;

pub const APPLICATION_NAME_PROPERTY: &str = "spring.application.name";
pub const SERVER_PORT_PROPERTY: &str = "server.port";
pub const SERVER_ADDRESS_PROPERTY: &str = "server.address";
pub const DISCOVERY_ENABLED_PROPERTY: &str = "spring.cloud.discovery.enabled";
pub const RIBBON_USES_DISCOVERY_PROPERTY: &str = "ribbon.eureka.enabled";
pub const DISCOVERY_ZONE_PROPERTY: &str = "eureka.client.serviceUrl.defaultZone";
pub const BROKER_URL_PROPERTY: &str = "activemq.brokerUrl";

pub const KEY_TIMESTAMP_PROPERTY: &str = "system.publicKey.timestamp";
pub const PUBLIC_KEY_PROPERTY: &str = "system.publicKey.key";
pub const PRIVATE_KEY_PROPERTY: &str = "system.privateKey.key";

pub const DEFAULT_DISCOVERY_ZONE: &str = "http://localhost:8761/eureka/";
pub const DEFAULT_BROKER_URL: &str = "tcp://localhost:61616";
pub const DEFAULT_HOST: &str = "localhost";

/// Registration tuning applied to every instance; short intervals make
/// services show up in discovery within a second or two.
const DISCOVERY_DEFAULTS: &[(&str, &str)] = &[
    (DISCOVERY_ENABLED_PROPERTY, "true"),
    ("eureka.instance.hostname", DEFAULT_HOST),
    ("eureka.client.fetchRegistry", "true"),
    ("eureka.registration.enabled", "true"),
    ("eureka.instance.leaseRenewalIntervalInSeconds", "1"),
    ("eureka.client.initialInstanceInfoReplicationIntervalSeconds", "0"),
    ("eureka.client.instanceInfoReplicationIntervalSeconds", "1"),
    (RIBBON_USES_DISCOVERY_PROPERTY, "true"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEnvironment {
    application_name: String,
    properties: HashMap<String, String>,
}

impl ProcessEnvironment {
    /// Build the default environment for `application_name`, drawing its port
    /// and key pair from `pool`
    ///
    /// # Errors
    /// Fails only when the pool has no port left to hand out.
    pub fn new(application_name: impl Into<String>, pool: &dyn ResourcePool) -> StarterResult<Self> {
        let application_name = application_name.into();
        let mut env = Self {
            properties: HashMap::new(),
            application_name,
        };

        env.set_property(APPLICATION_NAME_PROPERTY, env.application_name.clone());
        env.set_property(SERVER_PORT_PROPERTY, pool.fresh_port()?.to_string());
        env.set_key_pair(&pool.key_pair());

        env.set_property(DISCOVERY_ZONE_PROPERTY, DEFAULT_DISCOVERY_ZONE);
        for (key, value) in DISCOVERY_DEFAULTS {
            env.set_property(*key, *value);
        }
        env.set_property(BROKER_URL_PROPERTY, DEFAULT_BROKER_URL);

        Ok(env)
    }

    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    /// Overlay externally supplied properties; later keys win, untouched
    /// defaults stay
    pub fn add_properties<I>(&mut self, properties: I) -> &mut Self
    where
        I: IntoIterator<Item = KeyValuePair>,
    {
        for pair in properties {
            self.properties.insert(pair.key, pair.value);
        }
        self
    }

    pub fn set_key_pair(&mut self, key_pair: &KeyPair) {
        self.set_property(KEY_TIMESTAMP_PROPERTY, key_pair.timestamp.clone());
        self.set_property(PUBLIC_KEY_PROPERTY, key_pair.public_key.clone());
        self.set_property(PRIVATE_KEY_PROPERTY, key_pair.private_key.clone());
    }

    /// The key pair currently configured, if all three parts are present
    pub fn key_pair(&self) -> Option<KeyPair> {
        Some(KeyPair {
            timestamp: self.property(KEY_TIMESTAMP_PROPERTY)?.to_string(),
            public_key: self.property(PUBLIC_KEY_PROPERTY)?.to_string(),
            private_key: self.property(PRIVATE_KEY_PROPERTY)?.to_string(),
        })
    }

    /// The assigned port, unless it was overridden with something unparsable
    pub fn server_port(&self) -> Option<u16> {
        self.property(SERVER_PORT_PROPERTY)?.parse().ok()
    }

    pub fn server_uri(&self) -> String {
        let host = self.property(SERVER_ADDRESS_PROPERTY).unwrap_or(DEFAULT_HOST);
        let port = self.property(SERVER_PORT_PROPERTY).unwrap_or_default();
        format!("http://{host}:{port}")
    }
}
