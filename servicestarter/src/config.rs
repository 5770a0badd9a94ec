//! Harness configuration loaded from the environment
//!
//! Values come from process environment variables, optionally seeded from a
//! `.env` file. The `servicestarter` binary can override each of them on the
//! command line.

use std::path::PathBuf;
use std::time::Duration;

use crate::environment::DEFAULT_DISCOVERY_ZONE;
use crate::error::{StarterError, StarterResult};

pub const RUNTIME_VAR: &str = "SERVICESTARTER_RUNTIME";
pub const ARTIFACT_ROOT_VAR: &str = "SERVICESTARTER_ARTIFACT_ROOT";
pub const PORT_BASE_VAR: &str = "SERVICESTARTER_PORT_BASE";
pub const DEBUG_PORT_BASE_VAR: &str = "SERVICESTARTER_DEBUG_PORT_BASE";
pub const MAX_WAIT_VAR: &str = "SERVICESTARTER_MAX_WAIT_SECS";
pub const KILL_GRACE_VAR: &str = "SERVICESTARTER_KILL_GRACE_SECS";
pub const DISCOVERY_URL_VAR: &str = "SERVICESTARTER_DISCOVERY_URL";

pub const DEFAULT_PORT_BASE: u16 = 2020;
pub const DEFAULT_DEBUG_PORT_BASE: u16 = 5005;
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(150);
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(30);

/// Settings shared by every instance of one test run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarterConfig {
    /// Program used to launch service artifacts
    pub runtime: PathBuf,
    /// Root of the local artifact repository
    pub artifact_root: PathBuf,
    /// First service port handed out by the pool
    pub port_base: u16,
    /// First debug-agent port handed out by the pool
    pub debug_port_base: u16,
    /// Default registration wait budget
    pub max_wait: Duration,
    /// How long `kill` waits after the termination request before forcing it
    pub kill_grace: Duration,
    /// Discovery registry the services register with
    pub discovery_url: String,
}

impl Default for StarterConfig {
    fn default() -> Self {
        Self {
            runtime: PathBuf::from("java"),
            artifact_root: PathBuf::from(".m2").join("repository"),
            port_base: DEFAULT_PORT_BASE,
            debug_port_base: DEFAULT_DEBUG_PORT_BASE,
            max_wait: DEFAULT_MAX_WAIT,
            kill_grace: DEFAULT_KILL_GRACE,
            discovery_url: DEFAULT_DISCOVERY_ZONE.to_string(),
        }
    }
}

impl StarterConfig {
    /// Load from the process environment after applying any `.env` file
    pub fn from_env() -> StarterResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> StarterResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let runtime = match lookup(RUNTIME_VAR) {
            Some(runtime) => PathBuf::from(runtime),
            None => match lookup("JAVA_HOME") {
                Some(home) => PathBuf::from(home).join("bin").join("java"),
                None => defaults.runtime,
            },
        };

        let artifact_root = match lookup(ARTIFACT_ROOT_VAR) {
            Some(root) => PathBuf::from(root),
            None => match lookup("HOME") {
                Some(home) => PathBuf::from(home).join(".m2").join("repository"),
                None => defaults.artifact_root,
            },
        };

        Ok(Self {
            runtime,
            artifact_root,
            port_base: parse_or(&lookup, PORT_BASE_VAR, defaults.port_base)?,
            debug_port_base: parse_or(&lookup, DEBUG_PORT_BASE_VAR, defaults.debug_port_base)?,
            max_wait: parse_or(&lookup, MAX_WAIT_VAR, defaults.max_wait.as_secs()).map(Duration::from_secs)?,
            kill_grace: parse_or(&lookup, KILL_GRACE_VAR, defaults.kill_grace.as_secs()).map(Duration::from_secs)?,
            discovery_url: lookup(DISCOVERY_URL_VAR).unwrap_or(defaults.discovery_url),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> StarterResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| StarterError::configuration(key, format!("{raw:?}: {e}"))),
        None => Ok(default),
    }
}
