// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! TUF targets metadata as delivered by the agent.
//!
//! The `targets` field of a config response is a base64-encoded
//! `targets.json` document. Only the parts reconciliation relies on are
//! modelled: per-path integrity descriptors, the opaque backend state and the
//! manifest version.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::path::{ConfigPath, PathError};

#[derive(Debug, Error)]
pub enum TargetsError {
    #[error("targets metadata is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("targets metadata lists an invalid path: {0}")]
    Path(#[from] PathError),
}

/// Integrity and version descriptor of the content expected at a path.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Target {
    /// Advertised content length.
    #[serde(default)]
    pub length: u64,
    /// Content hashes keyed by algorithm (e.g., `sha256`).
    #[serde(default)]
    pub hashes: BTreeMap<String, String>,
    /// Free-form custom metadata, `{"v": <config version>}` in practice.
    #[serde(default)]
    pub custom: Option<Value>,
}

impl Target {
    /// Config version advertised in `custom.v`, zero when absent.
    pub fn version(&self) -> u64 {
        self.custom
            .as_ref()
            .and_then(|custom| custom.get("v"))
            .and_then(Value::as_u64)
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct TargetsDocument {
    signed: TargetsSigned,
}

#[derive(Debug, Deserialize)]
struct TargetsSigned {
    #[serde(default)]
    targets: BTreeMap<String, Target>,
    #[serde(default)]
    custom: Option<TargetsSignedCustom>,
    #[serde(default)]
    version: u64,
}

#[derive(Debug, Default, Deserialize)]
struct TargetsSignedCustom {
    #[serde(default)]
    opaque_backend_state: Option<String>,
}

/// All targets of one manifest plus its manifest-level fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetMap {
    targets: HashMap<ConfigPath, Target>,
    opaque_backend_state: String,
    version: u64,
}

impl TargetMap {
    /// Parses a raw `targets.json` document.
    pub fn parse(bytes: &[u8]) -> Result<Self, TargetsError> {
        let document: TargetsDocument = serde_json::from_slice(bytes)?;
        let targets = document
            .signed
            .targets
            .into_iter()
            .map(|(path, target)| Ok((ConfigPath::parse(&path)?, target)))
            .collect::<Result<HashMap<_, _>, PathError>>()?;
        Ok(Self {
            targets,
            opaque_backend_state: document
                .signed
                .custom
                .and_then(|custom| custom.opaque_backend_state)
                .unwrap_or_default(),
            version: document.signed.version,
        })
    }

    pub fn get(&self, path: &ConfigPath) -> Option<&Target> {
        self.targets.get(path)
    }

    pub fn opaque_backend_state(&self) -> &str {
        &self.opaque_backend_state
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
impl TargetMap {
    pub(crate) fn from_parts(
        targets: impl IntoIterator<Item = (ConfigPath, Target)>,
        opaque_backend_state: &str,
        version: u64,
    ) -> Self {
        Self {
            targets: targets.into_iter().collect(),
            opaque_backend_state: opaque_backend_state.to_string(),
            version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_targets_document() {
        let document = json!({
            "signatures": [],
            "signed": {
                "_type": "targets",
                "custom": { "opaque_backend_state": "b3BhcXVl" },
                "expires": "2030-01-01T00:00:00Z",
                "spec_version": "1.0.0",
                "targets": {
                    "datadog/2/ASM_DD/rules/config": {
                        "custom": { "v": 7 },
                        "hashes": { "sha256": "abcd" },
                        "length": 12
                    }
                },
                "version": 42
            }
        });
        let map = TargetMap::parse(document.to_string().as_bytes()).unwrap();
        assert_eq!(map.version(), 42);
        assert_eq!(map.opaque_backend_state(), "b3BhcXVl");
        let path = ConfigPath::parse("datadog/2/ASM_DD/rules/config").unwrap();
        let target = map.get(&path).unwrap();
        assert_eq!(target.length, 12);
        assert_eq!(target.version(), 7);
        assert_eq!(target.hashes.get("sha256").map(String::as_str), Some("abcd"));
    }

    #[test]
    fn missing_custom_section_defaults() {
        let document = json!({ "signed": { "targets": {}, "version": 1 } });
        let map = TargetMap::parse(document.to_string().as_bytes()).unwrap();
        assert!(map.is_empty());
        assert_eq!(map.opaque_backend_state(), "");
    }

    #[test]
    fn rejects_invalid_target_path() {
        let document = json!({ "signed": { "targets": { "bogus": {} }, "version": 1 } });
        assert!(matches!(
            TargetMap::parse(document.to_string().as_bytes()),
            Err(TargetsError::Path(_))
        ));
    }
}
