//! Main entry point for the servicestarter binary
//!
//! Launches one service artifact the way an integration test would, waits for
//! it to register with discovery, and keeps it running until Ctrl+C.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::signal;

use servicestarter::services::{EurekaDiscoveryClient, LocalRepositoryLocator};
use servicestarter::{DiscoveryClient, IntegrationTestEnvironment, Microservice, StarterConfig};
use shared::logging::{self, Stage};
use shared::{instance_info, instance_warn, ArtifactCoordinates, KeyValuePair};

/// Launch a service artifact for manual integration testing
#[derive(Parser)]
#[command(name = "servicestarter")]
#[command(about = "Starts a service artifact with a test environment and waits for discovery registration")]
pub struct Args {
    /// Artifact name, e.g. ledger
    #[arg(long)]
    pub artifact: String,

    /// Artifact version
    #[arg(long)]
    pub version: String,

    /// Artifact group (defaults to the artifact name)
    #[arg(long)]
    pub group: Option<String>,

    /// Artifact classifier
    #[arg(long, default_value = shared::ArtifactCoordinates::SERVICE_BOOT)]
    pub classifier: String,

    /// Application name used for discovery (defaults to the artifact name)
    #[arg(long)]
    pub application: Option<String>,

    /// Program used to run the artifact
    #[arg(long)]
    pub runtime: Option<PathBuf>,

    /// Local artifact repository root
    #[arg(long)]
    pub artifact_root: Option<PathBuf>,

    /// Discovery registry URL
    #[arg(long)]
    pub discovery_url: Option<String>,

    /// Skip the registration wait
    #[arg(long)]
    pub no_discovery: bool,

    /// Registration wait budget in seconds
    #[arg(long)]
    pub max_wait: Option<u64>,

    /// Debug agent port
    #[arg(long)]
    pub debug_port: Option<u16>,

    /// Suspend at startup until a debugger attaches (requires --debug-port)
    #[arg(long, requires = "debug_port")]
    pub suspend: bool,

    /// Extra environment properties as key=value
    #[arg(long = "property", short = 'D')]
    pub properties: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logging::init_tracing(Some(&args.log_level));

    let mut config = StarterConfig::from_env().context("Loading configuration")?;
    if let Some(runtime) = args.runtime.clone() {
        config.runtime = runtime;
    }
    if let Some(root) = args.artifact_root.clone() {
        config.artifact_root = root;
    }
    if let Some(url) = args.discovery_url.clone() {
        config.discovery_url = url;
    }
    if let Some(secs) = args.max_wait {
        config.max_wait = Duration::from_secs(secs);
    }

    let properties = args
        .properties
        .iter()
        .map(|raw| KeyValuePair::parse(raw))
        .collect::<Result<Vec<_>, _>>()
        .context("Parsing --property")?;

    let application = args.application.clone().unwrap_or_else(|| args.artifact.clone());
    let group = args.group.clone().unwrap_or_else(|| args.artifact.clone());
    let classifier = Some(args.classifier.clone()).filter(|c| !c.is_empty());
    let coordinates =
        ArtifactCoordinates::service(group, args.artifact.clone(), args.version.clone()).with_classifier(classifier);

    let environment = IntegrationTestEnvironment::shared(config);
    let mut service_config = environment
        .microservice_config(application.clone(), coordinates)
        .add_properties(properties);
    if let Some(port) = args.debug_port {
        service_config = service_config.debug(args.suspend, port);
    }

    let locator = Arc::new(LocalRepositoryLocator::new(environment.config().artifact_root.clone()));
    let mut service: Microservice<()> =
        Microservice::new(service_config, environment.clone(), locator).context("Preparing service environment")?;

    service.start().await.context("Starting service")?;

    if !args.no_discovery {
        let discovery = EurekaDiscoveryClient::new(&environment.config().discovery_url)?;
        let discovery: &dyn DiscoveryClient = &discovery;
        if service.wait_until_registered(Some(discovery)).await {
            instance_info!(application, "✅ Ready: {}", service);
        } else {
            instance_warn!(application, "⚠️ Not registered within {:?}: {}", service.max_wait(), service);
        }
    }

    tokio::select! {
        result = signal::ctrl_c() => {
            match result {
                Ok(()) => instance_info!(application, "🛑 Received Ctrl+C signal"),
                Err(err) => logging::log_failure(&application, Stage::SignalHandling, &err),
            }
        }
        _ = wait_for_exit(&mut service) => {
            instance_warn!(application, "⚠️ Service exited on its own");
        }
    }

    let exit_code = service.shutdown().await;
    logging::log_stopped(&application, exit_code);
    Ok(())
}

/// Resolve once the child process is gone
async fn wait_for_exit(service: &mut Microservice<()>) {
    while service.is_running() {
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}
