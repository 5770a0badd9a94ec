//! Service instance facade
//!
//! A `Microservice<T>` is one service under test: its configuration, its
//! process environment, the one process it may launch, and a lazily built
//! typed client of type `T`. Test setup calls [`Microservice::start`] and
//! usually [`Microservice::wait_until_registered`]; teardown calls
//! [`Microservice::shutdown`].

use std::cell::OnceCell;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use shared::logging::{log_failure, log_starting, log_stopped, Stage};
use shared::{instance_warn, ArtifactCoordinates, ExtraProperties, KeyValuePair};

use crate::config::{DEFAULT_KILL_GRACE, DEFAULT_MAX_WAIT};
use crate::environment::{ProcessEnvironment, DISCOVERY_ZONE_PROPERTY};
use crate::error::{StarterError, StarterResult};
use crate::process::{DebugSettings, LaunchCommand, ServiceProcess};
use crate::readiness;
use crate::traits::{ApiFactory, ArtifactLocator, DiscoveryClient, ResourcePool};

/// How an instance should expose a debug agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugMode {
    /// Listen on an explicit port
    Port { port: u16, suspend: bool },
    /// Listen on a fresh port from the pool, without suspending
    Fresh,
}

/// Everything an instance needs before its single start
#[derive(Debug, Clone)]
pub struct MicroserviceConfig {
    pub application_name: String,
    pub artifact: ArtifactCoordinates,
    /// Program used to launch the artifact
    pub runtime: PathBuf,
    pub debug: Option<DebugMode>,
    /// Registration wait budget
    pub max_wait: Duration,
    pub kill_grace: Duration,
    /// Overrides the default discovery zone when set
    pub discovery_zone: Option<String>,
    /// Applied on top of the environment defaults, in order
    pub properties: ExtraProperties,
}

impl MicroserviceConfig {
    pub fn new(application_name: impl Into<String>, artifact: ArtifactCoordinates) -> Self {
        Self {
            application_name: application_name.into(),
            artifact,
            runtime: PathBuf::from("java"),
            debug: None,
            max_wait: DEFAULT_MAX_WAIT,
            kill_grace: DEFAULT_KILL_GRACE,
            discovery_zone: None,
            properties: Vec::new(),
        }
    }

    pub fn with_runtime(mut self, runtime: impl Into<PathBuf>) -> Self {
        self.runtime = runtime.into();
        self
    }

    /// Debug agent on `port`, optionally suspending until a debugger attaches
    pub fn debug(mut self, suspend: bool, port: u16) -> Self {
        self.debug = Some(DebugMode::Port { port, suspend });
        self
    }

    /// Debug agent on a fresh pool port, not suspended
    pub fn run_in_debug(mut self) -> Self {
        self.debug = Some(DebugMode::Fresh);
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_kill_grace(mut self, kill_grace: Duration) -> Self {
        self.kill_grace = kill_grace;
        self
    }

    pub fn with_discovery_zone(mut self, zone: impl Into<String>) -> Self {
        self.discovery_zone = Some(zone.into());
        self
    }

    pub fn add_properties<I, P>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<KeyValuePair>,
    {
        self.properties.extend(properties.into_iter().map(Into::into));
        self
    }
}

pub struct Microservice<T> {
    application_name: String,
    artifact: ArtifactCoordinates,
    runtime: PathBuf,
    debug: Option<DebugSettings>,
    max_wait: Duration,
    environment: ProcessEnvironment,
    pool: Arc<dyn ResourcePool>,
    locator: Arc<dyn ArtifactLocator>,
    api_factory: Option<Arc<dyn ApiFactory<T>>>,
    process: ServiceProcess,
    api: OnceCell<T>,
}

impl<T> Microservice<T> {
    /// Reserve ports and build the process environment for `config`
    ///
    /// # Errors
    /// `StarterError::Configuration` when the pool has run out of ports.
    pub fn new(
        config: MicroserviceConfig,
        pool: Arc<dyn ResourcePool>,
        locator: Arc<dyn ArtifactLocator>,
    ) -> StarterResult<Self> {
        let mut environment = ProcessEnvironment::new(config.application_name.clone(), pool.as_ref())?;
        if let Some(zone) = config.discovery_zone {
            environment.set_property(DISCOVERY_ZONE_PROPERTY, zone);
        }
        environment.add_properties(config.properties);

        let debug = match config.debug {
            None => None,
            Some(DebugMode::Port { port, suspend }) => Some(DebugSettings { port, suspend }),
            Some(DebugMode::Fresh) => Some(DebugSettings {
                port: pool.fresh_debug_port()?,
                suspend: false,
            }),
        };

        Ok(Self {
            process: ServiceProcess::new(config.application_name.clone(), config.kill_grace),
            application_name: config.application_name,
            artifact: config.artifact,
            runtime: config.runtime,
            debug,
            max_wait: config.max_wait,
            environment,
            pool,
            locator,
            api_factory: None,
            api: OnceCell::new(),
        })
    }

    /// Factory used by [`Microservice::api`]
    pub fn with_api_factory(mut self, factory: impl ApiFactory<T> + 'static) -> Self {
        self.api_factory = Some(Arc::new(factory));
        self
    }

    /// Resolve the artifact and launch it with this instance's environment
    ///
    /// Returns as soon as the OS process exists. No retries: a resolution or
    /// spawn failure ends this instance's startup.
    pub async fn start(&mut self) -> StarterResult<()> {
        self.process.ensure_unused()?;
        log_starting(&self.application_name, &*self);

        let artifact = match self.locator.resolve(&self.artifact).await {
            Ok(artifact) => artifact,
            Err(e) => {
                self.process.mark_failed();
                log_failure(&self.application_name, Stage::ArtifactResolution, &e);
                return Err(e);
            }
        };

        let command = LaunchCommand::for_artifact(&self.runtime, &artifact, self.debug.as_ref());
        if let Err(e) = self.process.start(&command, &self.environment) {
            log_failure(&self.application_name, Stage::Launch, &e);
            return Err(e);
        }
        Ok(())
    }

    /// Terminate the process and return its exit code
    pub async fn kill(&mut self) -> StarterResult<i32> {
        self.process.kill().await
    }

    /// Best-effort teardown: kill the process, logging instead of failing
    ///
    /// Returns the exit code when there was a process to stop.
    pub async fn shutdown(&mut self) -> Option<i32> {
        match self.kill().await {
            Ok(code) => {
                log_stopped(&self.application_name, Some(code));
                Some(code)
            }
            Err(StarterError::NotStarted { .. }) => {
                instance_warn!(self.application_name, "⚠️ Never started, nothing to stop");
                None
            }
            Err(StarterError::Interrupted { message, .. }) => {
                instance_warn!(
                    self.application_name,
                    "⚠️ Interrupted while stopping ({}), but the service is already going down, ignoring",
                    message
                );
                None
            }
            Err(e) => {
                log_failure(&self.application_name, Stage::Teardown, &e);
                None
            }
        }
    }

    /// Wait for this application to appear in discovery within its budget
    pub async fn wait_until_registered(&self, discovery: Option<&dyn DiscoveryClient>) -> bool {
        readiness::wait_until_registered(discovery, &self.application_name, self.max_wait).await
    }

    /// The typed client, built on first use and cached afterwards
    pub fn api(&self) -> StarterResult<&T> {
        if let Some(api) = self.api.get() {
            return Ok(api);
        }

        let factory = self.api_factory.as_ref().ok_or_else(|| StarterError::MissingApiFactory {
            application: self.application_name.clone(),
        })?;
        Ok(self.api.get_or_init(|| factory.create(&self.uri())))
    }

    pub fn name(&self) -> &str {
        &self.application_name
    }

    pub fn uri(&self) -> String {
        self.environment.server_uri()
    }

    pub fn debugging_port(&self) -> Option<u16> {
        self.debug.map(|debug| debug.port)
    }

    pub fn debug_settings(&self) -> Option<&DebugSettings> {
        self.debug.as_ref()
    }

    pub fn artifact(&self) -> &ArtifactCoordinates {
        &self.artifact
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    pub fn environment(&self) -> &ProcessEnvironment {
        &self.environment
    }

    pub fn pool(&self) -> &Arc<dyn ResourcePool> {
        &self.pool
    }

    /// Child process id while it runs
    pub fn process_id(&self) -> Option<u32> {
        self.process.id()
    }

    pub fn is_running(&mut self) -> bool {
        self.process.is_running()
    }
}

impl<T> fmt::Display for Microservice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} address:{}", self.application_name, self.uri())?;
        if let Some(port) = self.debugging_port() {
            write!(f, ", debuggingPort: {port}")?;
        }
        Ok(())
    }
}
