//! Eureka discovery client
//!
//! Queries the registry's REST API for the instances of one application.
//! Eureka answers 404 for applications that have not registered yet, which is
//! reported as an empty instance list.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

use shared::ServiceInstanceRecord;

use crate::error::{StarterError, StarterResult};
use crate::traits::DiscoveryClient;

/// Per-request timeout for registry queries
const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct EurekaDiscoveryClient {
    http: reqwest::Client,
    /// Registry base, e.g. `http://localhost:8761/eureka/`
    base: Url,
}

impl EurekaDiscoveryClient {
    pub fn new(zone: &str) -> StarterResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(QUERY_TIMEOUT)
            .build()
            .map_err(|e| StarterError::discovery(format!("Failed to build http client: {e}")))?;
        Self::with_client(zone, http)
    }

    pub fn with_client(zone: &str, http: reqwest::Client) -> StarterResult<Self> {
        // Url::join drops the last path segment unless the base ends in '/'.
        let normalized = if zone.ends_with('/') {
            zone.to_string()
        } else {
            format!("{zone}/")
        };
        let base = Url::parse(&normalized).map_err(|e| StarterError::configuration("discovery zone", format!("{zone:?}: {e}")))?;

        Ok(Self { http, base })
    }

    /// `{base}apps/{APPLICATION}`; Eureka keys applications in upper case
    pub fn application_url(&self, application: &str) -> StarterResult<Url> {
        self.base
            .join(&format!("apps/{}", application.to_uppercase()))
            .map_err(|e| StarterError::discovery(format!("Invalid application name {application:?}: {e}")))
    }
}

#[async_trait]
impl DiscoveryClient for EurekaDiscoveryClient {
    async fn get_instances(&self, application: &str) -> StarterResult<Vec<ServiceInstanceRecord>> {
        let url = self.application_url(application)?;

        let response = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| StarterError::discovery(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(Vec::new()),
            status if !status.is_success() => {
                return Err(StarterError::discovery(format!("Registry answered {status}")));
            }
            _ => {}
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| StarterError::discovery(format!("Failed to parse registry response: {e}")))?;

        Ok(parse_application(&body))
    }
}

/// Extract instance records from an `apps/{APP}` response body
///
/// Instances come as an array, or as a bare object when the registry
/// serializes a single instance.
pub fn parse_application(body: &serde_json::Value) -> Vec<ServiceInstanceRecord> {
    let Some(application) = body.get("application") else {
        return Vec::new();
    };
    let name = application.get("name").and_then(|n| n.as_str()).unwrap_or_default();

    let instances = match application.get("instance") {
        Some(serde_json::Value::Array(items)) => items.iter().collect::<Vec<_>>(),
        Some(item @ serde_json::Value::Object(_)) => vec![item],
        _ => Vec::new(),
    };

    instances
        .into_iter()
        .map(|instance| {
            let text = |key: &str| {
                instance
                    .get(key)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            };
            let port = instance
                .get("port")
                .and_then(|p| p.get("$"))
                .and_then(|p| p.as_u64().or_else(|| p.as_str().and_then(|s| s.parse().ok())))
                .and_then(|p| u16::try_from(p).ok())
                .unwrap_or(0);

            let app = text("app");
            ServiceInstanceRecord {
                application: if app.is_empty() { name.to_string() } else { app },
                instance_id: text("instanceId"),
                host_name: text("hostName"),
                port,
                status: text("status"),
            }
        })
        .collect()
}
