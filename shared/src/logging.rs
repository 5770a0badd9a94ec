//! Shared logging utilities for consistent tracing across harness components
//!
//! Every event about a service instance carries an `instance` field holding
//! its application name, so interleaved output from several instances can be
//! filtered per service.

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{error, info};

/// Default filter directives for the harness crates
fn filter_directives(base_level: &str) -> String {
    format!("servicestarter={base_level},shared={base_level},reqwest=warn,hyper=warn")
}

/// Initialize tracing subscriber with an optional log level
///
/// `RUST_LOG` takes precedence when set. Calling this more than once is
/// harmless; only the first subscriber is installed.
pub fn init_tracing(log_level: Option<&str>) {
    use tracing_subscriber::{fmt, EnvFilter};

    let base_level = log_level.unwrap_or("info");
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directives(base_level)));

    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .try_init();
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Event at `$level` tagged with the instance it concerns
#[macro_export]
macro_rules! instance_event {
    ($level:expr, $instance:expr, $($arg:tt)*) => {
        tracing::event!(
            $level,
            instance = %$instance,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        )
    };
}

#[macro_export]
macro_rules! instance_info {
    ($instance:expr, $($arg:tt)*) => {
        $crate::instance_event!(tracing::Level::INFO, $instance, $($arg)*)
    };
}

#[macro_export]
macro_rules! instance_warn {
    ($instance:expr, $($arg:tt)*) => {
        $crate::instance_event!(tracing::Level::WARN, $instance, $($arg)*)
    };
}

#[macro_export]
macro_rules! instance_error {
    ($instance:expr, $($arg:tt)*) => {
        $crate::instance_event!(tracing::Level::ERROR, $instance, $($arg)*)
    };
}

#[macro_export]
macro_rules! instance_debug {
    ($instance:expr, $($arg:tt)*) => {
        $crate::instance_event!(tracing::Level::DEBUG, $instance, $($arg)*)
    };
}

/// Point in an instance's lifecycle where something went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ArtifactResolution,
    Launch,
    TenantInitialization,
    Teardown,
    SignalHandling,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ArtifactResolution => "artifact resolution",
            Stage::Launch => "launch",
            Stage::TenantInitialization => "tenant initialization",
            Stage::Teardown => "teardown",
            Stage::SignalHandling => "signal handling",
        };
        f.write_str(name)
    }
}

/// An instance is about to be launched; `description` is its Display form
pub fn log_starting(instance: &str, description: &dyn fmt::Display) {
    info!(
        instance = %instance,
        timestamp = format_timestamp(),
        "🚀 Starting {}",
        description
    );
}

/// An instance was stopped; `exit_code` is `None` when no process existed
pub fn log_stopped(instance: &str, exit_code: Option<i32>) {
    match exit_code {
        Some(code) => info!(
            instance = %instance,
            timestamp = format_timestamp(),
            exit_code = code,
            "🛑 Stopped with exit code {}",
            code
        ),
        None => info!(
            instance = %instance,
            timestamp = format_timestamp(),
            "🛑 Stopped, no process was running"
        ),
    }
}

/// A lifecycle stage failed for an instance
pub fn log_failure(instance: &str, stage: Stage, error: &dyn fmt::Display) {
    error!(
        instance = %instance,
        timestamp = format_timestamp(),
        stage = %stage,
        error = %error,
        "❌ {} failed: {}",
        stage,
        error
    );
}
