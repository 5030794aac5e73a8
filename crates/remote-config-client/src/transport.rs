// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Boundary between the synchronisation logic and the agent connection.

use async_trait::async_trait;
use thiserror::Error;

use crate::protocol::{AgentInfo, ConfigPayload, ConfigRequest};

/// Outcome of a `/v0.7/config` call that reached the agent.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigResponse {
    Ok(ConfigPayload),
    /// The agent has no instruction for this client (`{}`).
    Empty,
    Unexpected { status: u16, body: String },
}

/// Outcome of an `/info` call that reached the agent.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoResponse {
    Ok(AgentInfo),
    /// The agent predates the info endpoint.
    NotFound,
    Unexpected { status: u16, body: String },
}

/// A request that did not produce a response from the agent.
#[derive(Debug, Error)]
pub enum TransportError {
    /// DNS, connect or timeout failure: the agent could not be reached at all.
    #[error("agent unreachable: {0}")]
    Unreachable(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("failed to decode agent response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid agent url '{0}'")]
    InvalidUrl(String),
}

impl TransportError {
    /// Whether the agent itself could not be reached.
    pub fn is_network_error(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::Unreachable(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Connection to the local agent used by negotiation and the client.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches the agent capability descriptor.
    async fn send_info(&self) -> Result<InfoResponse, TransportError>;

    /// Polls for the configuration applicable to the described client.
    async fn send_config(&self, request: &ConfigRequest) -> Result<ConfigResponse, TransportError>;
}
