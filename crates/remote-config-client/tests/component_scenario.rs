// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use remote_config_client::protocol::{AgentInfo, ConfigPayload, ConfigRequest, TargetFile};
use remote_config_client::{
    Capabilities, Change, ChangeKind, Component, ConfigResponse, InfoResponse,
    RemoteConfigSettings, Repository, Transport, TransportError, WaitResult, CONFIG_ENDPOINT,
};
use serde_json::{json, Map};
use sha2::{Digest, Sha256};

const PATH_A: &str = "datadog/2/ASM_DD/a/config";
const POLL_INTERVAL: Duration = Duration::from_secs(5);

struct Agent {
    responses: Mutex<VecDeque<ConfigPayload>>,
    requests: Mutex<Vec<ConfigRequest>>,
}

#[async_trait]
impl Transport for Agent {
    async fn send_info(&self) -> Result<InfoResponse, TransportError> {
        Ok(InfoResponse::Ok(AgentInfo {
            endpoints: vec![CONFIG_ENDPOINT.to_string()],
            version: None,
        }))
    }

    async fn send_config(&self, request: &ConfigRequest) -> Result<ConfigResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(match self.responses.lock().unwrap().pop_front() {
            Some(payload) => ConfigResponse::Ok(payload),
            None => ConfigResponse::Empty,
        })
    }
}

fn manifest(entries: &[(&str, &str)], version: u64) -> ConfigPayload {
    let mut targets = Map::new();
    for (path, data) in entries {
        targets.insert(
            path.to_string(),
            json!({
                "custom": { "v": version },
                "hashes": { "sha256": hex::encode(Sha256::digest(data.as_bytes())) },
                "length": data.len(),
            }),
        );
    }
    ConfigPayload {
        targets: serde_json::to_vec(&json!({
            "signed": {
                "custom": { "opaque_backend_state": "opaque" },
                "targets": targets,
                "version": version,
            }
        }))
        .unwrap(),
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

type Calls = Arc<Mutex<Vec<Vec<(ChangeKind, String)>>>>;

fn recorder(
    calls: &Calls,
) -> impl Fn(&mut Repository, &[Change]) -> anyhow::Result<()> + Send + Sync + 'static {
    let calls = Arc::clone(calls);
    move |_: &mut Repository, changes: &[Change]| {
        calls.lock().unwrap().push(
            changes
                .iter()
                .map(|change| (change.kind, change.path.to_string()))
                .collect(),
        );
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn insert_then_noop_then_delete() {
    let agent = Arc::new(Agent {
        responses: Mutex::new(VecDeque::from([
            manifest(&[(PATH_A, "{\"enabled\":true}")], 1),
            manifest(&[(PATH_A, "{\"enabled\":true}")], 1),
            manifest(&[], 2),
        ])),
        requests: Mutex::new(Vec::new()),
    });
    let asm_calls: Calls = Arc::default();
    let tracing_calls: Calls = Arc::default();
    let capabilities = Capabilities::new()
        .with_receiver(["ASM_DD"], recorder(&asm_calls))
        .with_receiver(["APM_TRACING"], recorder(&tracing_calls));
    let settings = RemoteConfigSettings {
        poll_interval: POLL_INTERVAL,
        ..Default::default()
    };
    let transport = Arc::clone(&agent) as Arc<dyn Transport>;
    let component = Component::new(settings, transport, capabilities).unwrap();

    assert_eq!(component.barrier_once().await, WaitResult::Lift);
    assert_eq!(
        *asm_calls.lock().unwrap(),
        vec![vec![(ChangeKind::Insert, PATH_A.to_string())]]
    );
    assert!(component.is_healthy());

    tokio::time::sleep(POLL_INTERVAL + Duration::from_millis(500)).await;
    assert_eq!(asm_calls.lock().unwrap().len(), 1);
    assert_eq!(component.repository().len(), 1);

    tokio::time::sleep(POLL_INTERVAL).await;
    assert_eq!(
        asm_calls.lock().unwrap()[1..],
        [vec![(ChangeKind::Delete, PATH_A.to_string())]]
    );
    assert!(component.repository().is_empty());
    assert!(tracing_calls.lock().unwrap().is_empty());

    component.shutdown().await;
    let requests = agent.requests.lock().unwrap();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].client.state.targets_version, 1);
    assert_eq!(requests[1].client.state.backend_client_state, "opaque");
    assert_eq!(requests[2].client.state.config_states.len(), 1);
    assert!(requests
        .iter()
        .all(|request| request.client.id == requests[0].client.id));
}

#[tokio::test(start_paused = true)]
async fn barrier_passes_once_lifted() {
    let agent = Arc::new(Agent {
        responses: Mutex::new(VecDeque::new()),
        requests: Mutex::new(Vec::new()),
    });
    let component = Component::new(
        RemoteConfigSettings::default(),
        agent as Arc<dyn Transport>,
        Capabilities::new(),
    )
    .unwrap();
    assert_eq!(component.barrier_once().await, WaitResult::Lift);
    assert_eq!(component.barrier_once().await, WaitResult::Pass);
    component.shutdown().await;
}
