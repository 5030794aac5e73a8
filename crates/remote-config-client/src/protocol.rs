// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! JSON wire models for the agent `/v0.7/config` and `/info` endpoints.
//!
//! Binary blobs travel as base64 strings; the helpers below handle the
//! conversion so the rest of the crate only sees bytes.

use serde::{Deserialize, Serialize};

pub(crate) mod serde_base64 {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded = base64::engine::general_purpose::STANDARD.encode(value);
        serializer.serialize_str(&encoded)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        // The agent sends `null` for absent blobs on some versions.
        let s = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        base64::engine::general_purpose::STANDARD
            .decode(s.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

// Treats `null` collections as empty ones.
pub(crate) mod null_as_default {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Default + Deserialize<'de>,
    {
        let opt = Option::<T>::deserialize(deserializer)?;
        Ok(opt.unwrap_or_default())
    }
}

/// Body of a `POST /v0.7/config` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigRequest {
    pub client: ClientDescriptor,
    pub cached_target_files: Vec<CachedTargetFile>,
}

/// Identity and state of the requesting client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientDescriptor {
    pub state: ClientState,
    pub id: String,
    pub products: Vec<String>,
    pub is_tracer: bool,
    pub is_agent: bool,
    pub client_tracer: ClientTracer,
    #[serde(with = "serde_base64")]
    pub capabilities: Vec<u8>,
}

/// Applied-state summary echoed back to the agent on every poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientState {
    pub root_version: u64,
    pub targets_version: u64,
    pub config_states: Vec<ConfigState>,
    pub has_error: bool,
    pub error: String,
    pub backend_client_state: String,
}

/// Applied version and status of one config.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigState {
    pub id: String,
    pub version: u64,
    pub product: String,
    pub apply_state: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apply_error: Option<String>,
}

/// Tracer metadata the agent uses to select configs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientTracer {
    pub runtime_id: String,
    pub language: String,
    pub tracer_version: String,
    pub service: String,
    pub env: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedTargetFile {
    pub path: String,
    pub length: u64,
    pub hashes: Vec<CachedTargetFileHash>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedTargetFileHash {
    pub algorithm: String,
    pub hash: String,
}

/// Non-empty body of a successful `/v0.7/config` response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigPayload {
    /// Raw `targets.json` document.
    #[serde(default, with = "serde_base64")]
    pub targets: Vec<u8>,
    #[serde(default, deserialize_with = "null_as_default::deserialize")]
    pub target_files: Vec<TargetFile>,
    /// Paths the agent wants this client to have applied.
    #[serde(default, deserialize_with = "null_as_default::deserialize")]
    pub client_configs: Vec<String>,
}

/// One config payload as sent by the agent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TargetFile {
    pub path: String,
    #[serde(with = "serde_base64")]
    pub raw: Vec<u8>,
}

/// Subset of the agent `/info` document used for negotiation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AgentInfo {
    #[serde(default, deserialize_with = "null_as_default::deserialize")]
    pub endpoints: Vec<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serialises_capabilities_as_base64() {
        let request = ConfigRequest {
            client: ClientDescriptor {
                state: ClientState {
                    root_version: 1,
                    ..Default::default()
                },
                id: "client-id".into(),
                products: vec!["ASM_DD".into()],
                is_tracer: true,
                is_agent: false,
                client_tracer: ClientTracer {
                    runtime_id: "runtime-id".into(),
                    language: "rust".into(),
                    ..Default::default()
                },
                capabilities: vec![0x01, 0x02],
            },
            cached_target_files: Vec::new(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["client"]["capabilities"], json!("AQI="));
        assert_eq!(value["client"]["state"]["root_version"], json!(1));
        assert_eq!(value["client"]["state"]["backend_client_state"], json!(""));
        assert_eq!(value["client"]["client_tracer"]["tags"], json!([]));
        assert!(value["client"]["client_tracer"].get("app_version").is_none());
        assert_eq!(value["cached_target_files"], json!([]));
    }

    #[test]
    fn payload_decodes_base64_fields() {
        let payload: ConfigPayload = serde_json::from_value(json!({
            "roots": [],
            "targets": "e30=",
            "target_files": [{ "path": "datadog/2/ASM/x/config", "raw": "aGVsbG8=" }],
            "client_configs": ["datadog/2/ASM/x/config"]
        }))
        .unwrap();
        assert_eq!(payload.targets, b"{}");
        assert_eq!(payload.target_files[0].raw, b"hello");
        assert_eq!(payload.client_configs, vec!["datadog/2/ASM/x/config"]);
    }

    #[test]
    fn payload_tolerates_null_collections() {
        let payload: ConfigPayload = serde_json::from_value(json!({
            "targets": null,
            "target_files": null,
            "client_configs": null
        }))
        .unwrap();
        assert!(payload.targets.is_empty());
        assert!(payload.target_files.is_empty());
        assert!(payload.client_configs.is_empty());
    }
}
