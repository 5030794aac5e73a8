// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures for client, negotiation and component tests.

#![cfg(test)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::http::CONFIG_ENDPOINT;
use crate::protocol::{AgentInfo, ConfigPayload, ConfigRequest, TargetFile};
use crate::transport::{ConfigResponse, InfoResponse, Transport, TransportError};

/// Transport replaying queued responses.
///
/// Once a queue is drained, `/info` advertises the config endpoint and
/// `/v0.7/config` answers "empty".
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    info: Mutex<VecDeque<Result<InfoResponse, TransportError>>>,
    config: Mutex<VecDeque<Result<ConfigResponse, TransportError>>>,
    requests: Mutex<Vec<ConfigRequest>>,
    info_calls: AtomicUsize,
}

impl ScriptedTransport {
    pub(crate) fn push_info(&self, response: Result<InfoResponse, TransportError>) {
        self.info.lock().unwrap().push_back(response);
    }

    pub(crate) fn push_config(&self, response: Result<ConfigResponse, TransportError>) {
        self.config.lock().unwrap().push_back(response);
    }

    pub(crate) fn requests(&self) -> Vec<ConfigRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send_info(&self) -> Result<InfoResponse, TransportError> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        self.info
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(info_with(&[CONFIG_ENDPOINT])))
    }

    async fn send_config(&self, request: &ConfigRequest) -> Result<ConfigResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.config
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(ConfigResponse::Empty))
    }
}

pub(crate) fn info_with(endpoints: &[&str]) -> InfoResponse {
    InfoResponse::Ok(AgentInfo {
        endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
        version: Some("7.50.0".into()),
    })
}

pub(crate) fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Builds a config payload applying `entries` (path, content) at `version`.
pub(crate) fn payload(entries: &[(&str, &str)], version: u64) -> ConfigPayload {
    let mut targets = Map::new();
    for (path, data) in entries {
        targets.insert(
            path.to_string(),
            json!({
                "custom": { "v": version },
                "hashes": { "sha256": sha256_hex(data.as_bytes()) },
                "length": data.len(),
            }),
        );
    }
    let document = json!({
        "signed": {
            "_type": "targets",
            "custom": { "opaque_backend_state": format!("state-{version}") },
            "targets": Value::Object(targets),
            "version": version,
        }
    });

    ConfigPayload {
        targets: serde_json::to_vec(&document).unwrap(),
        target_files: entries
            .iter()
            .map(|(path, data)| TargetFile {
                path: path.to_string(),
                raw: data.as_bytes().to_vec(),
            })
            .collect(),
        client_configs: entries.iter().map(|(path, _)| path.to_string()).collect(),
    }
}
