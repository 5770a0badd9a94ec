//! HTTP client construction for services under test
//!
//! `HttpApiFactory` builds any [`ApiClient`] over one shared `reqwest::Client`.
//! [`RestClient`] is the minimal typed client: a base URI plus JSON helpers.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{StarterError, StarterResult};
use crate::traits::ApiFactory;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A client that can be bound to a service's base URI
pub trait ApiClient: Sized {
    fn bind(base_uri: &str, http: reqwest::Client) -> Self;
}

/// Factory producing clients over a shared connection pool
#[derive(Clone)]
pub struct HttpApiFactory {
    http: reqwest::Client,
}

impl HttpApiFactory {
    pub fn new() -> StarterResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StarterError::configuration("http client", e.to_string()))?;
        Ok(Self { http })
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl<T: ApiClient> ApiFactory<T> for HttpApiFactory {
    fn create(&self, base_uri: &str) -> T {
        T::bind(base_uri, self.http.clone())
    }
}

/// JSON-over-HTTP client rooted at one service
#[derive(Debug, Clone)]
pub struct RestClient {
    base_uri: String,
    http: reqwest::Client,
}

impl ApiClient for RestClient {
    fn bind(base_uri: &str, http: reqwest::Client) -> Self {
        Self {
            base_uri: base_uri.trim_end_matches('/').to_string(),
            http,
        }
    }
}

impl RestClient {
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Absolute URL for `path` under the base URI
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_uri, path.trim_start_matches('/'))
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> StarterResult<R> {
        let response = self.http.get(self.url(path)).send().await;
        Self::decode(path, response).await
    }

    pub async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(&self, path: &str, body: &B) -> StarterResult<R> {
        let response = self.http.post(self.url(path)).json(body).send().await;
        Self::decode(path, response).await
    }

    async fn decode<R: DeserializeOwned>(
        path: &str,
        response: Result<reqwest::Response, reqwest::Error>,
    ) -> StarterResult<R> {
        let api_error = |e: reqwest::Error| StarterError::Api {
            path: path.to_string(),
            message: e.to_string(),
        };

        let response = response.and_then(|r| r.error_for_status()).map_err(api_error)?;
        response.json().await.map_err(api_error)
    }
}
