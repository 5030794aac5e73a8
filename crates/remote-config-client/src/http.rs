// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP transport talking to the local Datadog agent.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use tracing::debug;

use crate::config::RemoteConfigSettings;
use crate::protocol::{AgentInfo, ConfigPayload, ConfigRequest};
use crate::transport::{ConfigResponse, InfoResponse, Transport, TransportError};

/// Agent endpoint serving tracer remote configuration.
pub const CONFIG_ENDPOINT: &str = "/v0.7/config";
/// Agent endpoint describing the features the agent supports.
pub const INFO_ENDPOINT: &str = "/info";

/// [`Transport`] over HTTP to the agent trace intake.
#[derive(Debug, Clone)]
pub struct AgentTransport {
    client: Client,
    base_url: Url,
}

impl AgentTransport {
    /// Creates a transport for the agent at `base_url`.
    ///
    /// `timeout` bounds every request, connection included.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let base_url =
            Url::parse(base_url).map_err(|_| TransportError::InvalidUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::InvalidUrl(base_url.to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("Datadog-Meta-Lang", HeaderValue::from_static("rust"));
        headers.insert(
            "Datadog-Meta-Tracer-Version",
            HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, base_url })
    }

    /// Uses `agent_url` and `agent_timeout` from `settings`.
    pub fn from_settings(settings: &RemoteConfigSettings) -> Result<Self, TransportError> {
        Self::new(&settings.agent_url, settings.agent_timeout)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path)
            .map_err(|_| TransportError::InvalidUrl(format!("{}{path}", self.base_url)))
    }
}

#[async_trait]
impl Transport for AgentTransport {
    async fn send_info(&self) -> Result<InfoResponse, TransportError> {
        let response = self.client.get(self.endpoint(INFO_ENDPOINT)?).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        match status {
            StatusCode::OK => {
                let info: AgentInfo = serde_json::from_slice(&body)?;
                Ok(InfoResponse::Ok(info))
            }
            StatusCode::NOT_FOUND => Ok(InfoResponse::NotFound),
            other => Ok(InfoResponse::Unexpected {
                status: other.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            }),
        }
    }

    async fn send_config(&self, request: &ConfigRequest) -> Result<ConfigResponse, TransportError> {
        let body = serde_json::to_vec(request)?;
        let response = self
            .client
            .post(self.endpoint(CONFIG_ENDPOINT)?)
            .body(body)
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;
        if status != StatusCode::OK {
            debug!(status = status.as_u16(), "remote-config: agent rejected config request");
            return Ok(ConfigResponse::Unexpected {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let value: Value = serde_json::from_slice(&body)?;
        if value.as_object().is_some_and(|object| object.is_empty()) {
            return Ok(ConfigResponse::Empty);
        }
        let payload: ConfigPayload = serde_json::from_value(value)?;
        Ok(ConfigResponse::Ok(payload))
    }
}
