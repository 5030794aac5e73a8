// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Remote Config target paths.
//!
//! The agent addresses every configuration file with a path in one of two
//! layouts: `datadog/<org>/<product>/<config_id>/<name>` for Datadog-managed
//! configs and `employee/<product>/<config_id>/<name>` for internal ones.
//! [`ConfigPath`] is the parsed form and the key used by reconciliation.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use thiserror::Error;

/// Namespace a config path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPathSource {
    /// Datadog-managed configs scoped to an organisation.
    Datadog { org_id: u64 },
    /// Internal employee configs.
    Employee,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("config path '{0}' has unknown source")]
    UnknownSource(String),
    #[error("config path '{0}' has wrong format")]
    WrongFormat(String),
    #[error("could not parse org id '{org}' in config path '{path}'")]
    InvalidOrgId { path: String, org: String },
    #[error("config path '{0}' has an empty segment")]
    EmptySegment(String),
}

/// Structured view of a Remote Config target path.
///
/// Equality, ordering and hashing only consider the raw string so that two
/// paths are the same key exactly when the agent sent the same bytes.
#[derive(Debug, Clone)]
pub struct ConfigPath {
    raw: String,
    source: ConfigPathSource,
    product: String,
    config_id: String,
    name: String,
}

impl ConfigPath {
    /// Parses a target path, rejecting unknown namespaces and malformed layouts.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let segments: Vec<&str> = path.split('/').collect();
        let (source, rest) = match segments.first() {
            Some(&"datadog") => {
                if segments.len() != 5 {
                    return Err(PathError::WrongFormat(path.to_string()));
                }
                let org_id = segments[1]
                    .parse::<u64>()
                    .map_err(|_| PathError::InvalidOrgId {
                        path: path.to_string(),
                        org: segments[1].to_string(),
                    })?;
                (ConfigPathSource::Datadog { org_id }, &segments[2..])
            }
            Some(&"employee") => {
                if segments.len() != 4 {
                    return Err(PathError::WrongFormat(path.to_string()));
                }
                (ConfigPathSource::Employee, &segments[1..])
            }
            _ => return Err(PathError::UnknownSource(path.to_string())),
        };
        if rest.iter().any(|segment| segment.is_empty()) {
            return Err(PathError::EmptySegment(path.to_string()));
        }
        Ok(Self {
            raw: path.to_string(),
            source,
            product: rest[0].to_string(),
            config_id: rest[1].to_string(),
            name: rest[2].to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn source(&self) -> ConfigPathSource {
        self.source
    }

    /// Product segment, used to route changes to receivers.
    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn config_id(&self) -> &str {
        &self.config_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for ConfigPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for ConfigPath {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for ConfigPath {}

impl Hash for ConfigPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl PartialOrd for ConfigPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ConfigPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_datadog_path() {
        let path = ConfigPath::parse("datadog/2/ASM_DD/blocking/config").unwrap();
        assert_eq!(path.source(), ConfigPathSource::Datadog { org_id: 2 });
        assert_eq!(path.product(), "ASM_DD");
        assert_eq!(path.config_id(), "blocking");
        assert_eq!(path.name(), "config");
        assert_eq!(path.to_string(), "datadog/2/ASM_DD/blocking/config");
    }

    #[test]
    fn parses_employee_path() {
        let path: ConfigPath = "employee/APM_TRACING/sampling/config".parse().unwrap();
        assert_eq!(path.source(), ConfigPathSource::Employee);
        assert_eq!(path.product(), "APM_TRACING");
    }

    #[test]
    fn rejects_malformed_paths() {
        assert!(matches!(
            ConfigPath::parse("other/2/ASM/x/config"),
            Err(PathError::UnknownSource(_))
        ));
        assert!(matches!(
            ConfigPath::parse("datadog/2/ASM/config"),
            Err(PathError::WrongFormat(_))
        ));
        assert!(matches!(
            ConfigPath::parse("datadog/org/ASM/x/config"),
            Err(PathError::InvalidOrgId { .. })
        ));
        assert!(matches!(
            ConfigPath::parse("employee//x/config"),
            Err(PathError::EmptySegment(_))
        ));
    }

    #[test]
    fn equality_follows_raw_string() {
        let a = ConfigPath::parse("datadog/2/ASM/x/config").unwrap();
        let b = ConfigPath::parse("datadog/2/ASM/x/config").unwrap();
        let c = ConfigPath::parse("datadog/2/ASM/y/config").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a < c);
    }
}
