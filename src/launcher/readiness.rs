// Readiness probes for the FastChat components

use anyhow::{Context, Result};
use reqwest::{Client, Method};
use std::time::Duration;

use super::Component;
use crate::config::Config;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// HTTP request that succeeds once a component is serving
#[derive(Debug, Clone)]
pub struct ReadinessProbe {
    client: Client,
    method: Method,
    url: String,
}

impl ReadinessProbe {
    pub fn new(method: Method, url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            method,
            url: url.into(),
        })
    }

    /// Probe for `component` at the addresses in `config`
    pub fn for_component(component: Component, config: &Config) -> Result<Self> {
        let (method, url) = match component {
            Component::Router => (Method::POST, format!("{}/list_models", config.controller.url())),
            Component::Worker => (
                Method::POST,
                format!("{}/worker_get_status", config.worker.url()),
            ),
            Component::ApiServer => (Method::GET, format!("{}/v1/models", config.api_server.url())),
            Component::WebUi => {
                // A wildcard bind is reachable on loopback
                let host = match config.web.host.as_str() {
                    "0.0.0.0" | "::" => "127.0.0.1",
                    other => other,
                };
                (Method::GET, format!("http://{}:{}/", host, config.web.port))
            }
        };
        Self::new(method, url)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// True if the endpoint answered with a success status
    pub async fn check(&self) -> bool {
        match self.client.request(self.method.clone(), &self.url).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(url = %self.url, "Readiness probe succeeded");
                true
            }
            Ok(response) => {
                tracing::debug!(url = %self.url, status = %response.status(), "Readiness probe failed");
                false
            }
            Err(e) => {
                tracing::debug!(url = %self.url, error = %e, "Readiness probe request failed");
                false
            }
        }
    }
}
