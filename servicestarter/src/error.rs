//! Service-starter error types

use shared::SharedError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StarterError {
    #[error("Artifact could not be resolved: {coordinates}: {reason}")]
    ArtifactResolution { coordinates: String, reason: String },

    #[error("Failed to start process for {application} from {artifact}: {source}")]
    ProcessStart {
        application: String,
        artifact: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Process for {application} was never started")]
    NotStarted { application: String },

    #[error("Process for {application} was already started; instances are single-use")]
    AlreadyStarted { application: String },

    #[error("Interrupted while waiting for {application} to exit: {message}")]
    Interrupted { application: String, message: String },

    #[error("Discovery query failed: {message}")]
    Discovery { message: String },

    #[error("Tenant initialization failed for {application}: {message}")]
    TenantInitialization { application: String, message: String },

    #[error("Api call {path} failed: {message}")]
    Api { path: String, message: String },

    #[error("No api factory configured for {application}")]
    MissingApiFactory { application: String },

    #[error("Configuration error: {field}: {message}")]
    Configuration { field: String, message: String },

    #[error("Shared component error: {0}")]
    Shared(#[from] SharedError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StarterError {
    pub fn configuration(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn discovery(message: impl Into<String>) -> Self {
        Self::Discovery { message: message.into() }
    }
}

pub type StarterResult<T> = Result<T, StarterError>;
