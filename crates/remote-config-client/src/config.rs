// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Environment-driven settings for the remote configuration client.
//!
//! Defaults follow the tracer conventions: remote configuration is enabled,
//! the agent is polled every five seconds on `http://localhost:8126`, and a
//! host blocking on the first synchronisation waits at most one second.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use uuid::Uuid;

/// Name of the environment variable toggling remote configuration.
const ENV_ENABLED: &str = "DD_REMOTE_CONFIGURATION_ENABLED";
/// Poll interval, in (possibly fractional) seconds.
const ENV_POLL_INTERVAL: &str = "DD_REMOTE_CONFIG_POLL_INTERVAL_SECONDS";
/// Upper bound for hosts blocking on the first synchronisation.
const ENV_BOOT_TIMEOUT: &str = "DD_REMOTE_CONFIG_BOOT_TIMEOUT_SECONDS";
/// Full agent URL, takes precedence over host and port.
const ENV_AGENT_URL: &str = "DD_TRACE_AGENT_URL";
const ENV_AGENT_HOST: &str = "DD_AGENT_HOST";
const ENV_AGENT_PORT: &str = "DD_TRACE_AGENT_PORT";
const ENV_AGENT_TIMEOUT: &str = "DD_TRACE_AGENT_TIMEOUT_SECONDS";
const ENV_SERVICE: &str = "DD_SERVICE";
const ENV_ENV: &str = "DD_ENV";
const ENV_VERSION: &str = "DD_VERSION";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_BOOT_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_AGENT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_AGENT_HOST: &str = "localhost";
const DEFAULT_AGENT_PORT: u16 = 8126;

/// Settings needed to run remote configuration inside a traced process.
#[derive(Debug, Clone)]
pub struct RemoteConfigSettings {
    /// Whether remote configuration is enabled. Defaults to `true`.
    pub enabled: bool,
    /// Delay between two synchronisation attempts.
    pub poll_interval: Duration,
    /// Maximum time a host waits for the first synchronisation attempt.
    pub boot_timeout: Duration,
    /// Base URL of the local agent.
    pub agent_url: String,
    /// Timeout applied to every agent request.
    pub agent_timeout: Duration,
    /// Identifier of this process, stable across client resets.
    pub runtime_id: String,
    pub service: String,
    pub env: String,
    pub app_version: Option<String>,
}

impl Default for RemoteConfigSettings {
    fn default() -> Self {
        Self::from_env_iter::<Vec<(String, String)>, _, _>(Vec::new())
    }
}

impl RemoteConfigSettings {
    /// Builds settings from the current process environment.
    pub fn from_os_env() -> Self {
        Self::from_env_iter(env::vars())
    }

    /// Builds settings from an iterator of key/value pairs (typically for tests).
    pub fn from_env_iter<I, K, V>(iter: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: HashMap<String, String> = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let get = |key: &str| map.get(key).and_then(|value| sanitize_non_empty(value));

        let agent_url = get(ENV_AGENT_URL).unwrap_or_else(|| {
            let host = get(ENV_AGENT_HOST).unwrap_or_else(|| DEFAULT_AGENT_HOST.to_string());
            let port = get(ENV_AGENT_PORT)
                .and_then(|port| port.parse::<u16>().ok())
                .unwrap_or(DEFAULT_AGENT_PORT);
            format!("http://{host}:{port}")
        });

        Self {
            enabled: parse_bool(map.get(ENV_ENABLED).map(String::as_str), true),
            poll_interval: parse_seconds(get(ENV_POLL_INTERVAL), DEFAULT_POLL_INTERVAL),
            boot_timeout: parse_seconds(get(ENV_BOOT_TIMEOUT), DEFAULT_BOOT_TIMEOUT),
            agent_url,
            agent_timeout: parse_seconds(get(ENV_AGENT_TIMEOUT), DEFAULT_AGENT_TIMEOUT),
            runtime_id: Uuid::new_v4().to_string(),
            service: get(ENV_SERVICE).unwrap_or_default(),
            env: get(ENV_ENV).unwrap_or_default(),
            app_version: get(ENV_VERSION),
        }
    }
}

/// Helper trimming whitespace and discarding empty values.
fn sanitize_non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parses boolean values from strings, falling back to the provided default.
fn parse_bool(value: Option<&str>, default: bool) -> bool {
    match value.map(|s| s.trim().to_ascii_lowercase()) {
        Some(ref v) if ["1", "true", "t", "yes", "y"].contains(&v.as_str()) => true,
        Some(ref v) if ["0", "false", "f", "no", "n"].contains(&v.as_str()) => false,
        _ => default,
    }
}

/// Parses a positive, finite number of seconds.
fn parse_seconds(value: Option<String>, default: Duration) -> Duration {
    value
        .and_then(|raw| raw.parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = RemoteConfigSettings::default();
        assert!(settings.enabled);
        assert_eq!(settings.poll_interval, Duration::from_secs(5));
        assert_eq!(settings.boot_timeout, Duration::from_secs(1));
        assert_eq!(settings.agent_url, "http://localhost:8126");
        assert_eq!(settings.agent_timeout, Duration::from_secs(30));
        assert!(settings.service.is_empty());
        assert!(settings.app_version.is_none());
        assert!(Uuid::parse_str(&settings.runtime_id).is_ok());
    }

    #[test]
    fn reads_overrides() {
        let settings = RemoteConfigSettings::from_env_iter([
            ("DD_REMOTE_CONFIGURATION_ENABLED", "false"),
            ("DD_REMOTE_CONFIG_POLL_INTERVAL_SECONDS", "0.5"),
            ("DD_REMOTE_CONFIG_BOOT_TIMEOUT_SECONDS", "2"),
            ("DD_AGENT_HOST", "agent.local"),
            ("DD_TRACE_AGENT_PORT", "9126"),
            ("DD_SERVICE", " checkout "),
            ("DD_ENV", "prod"),
            ("DD_VERSION", "1.2.3"),
        ]);
        assert!(!settings.enabled);
        assert_eq!(settings.poll_interval, Duration::from_millis(500));
        assert_eq!(settings.boot_timeout, Duration::from_secs(2));
        assert_eq!(settings.agent_url, "http://agent.local:9126");
        assert_eq!(settings.service, "checkout");
        assert_eq!(settings.env, "prod");
        assert_eq!(settings.app_version.as_deref(), Some("1.2.3"));
    }

    #[test]
    fn agent_url_wins_over_host_and_port() {
        let settings = RemoteConfigSettings::from_env_iter([
            ("DD_TRACE_AGENT_URL", "http://10.0.0.1:8126"),
            ("DD_AGENT_HOST", "ignored"),
        ]);
        assert_eq!(settings.agent_url, "http://10.0.0.1:8126");
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let settings = RemoteConfigSettings::from_env_iter([
            ("DD_REMOTE_CONFIG_POLL_INTERVAL_SECONDS", "-1"),
            ("DD_REMOTE_CONFIG_BOOT_TIMEOUT_SECONDS", "soon"),
            ("DD_TRACE_AGENT_PORT", "99999"),
        ]);
        assert_eq!(settings.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(settings.boot_timeout, DEFAULT_BOOT_TIMEOUT);
        assert_eq!(settings.agent_url, "http://localhost:8126");
    }

    #[test]
    fn parse_bool_permits_common_variants() {
        assert!(parse_bool(Some("Yes"), false));
        assert!(!parse_bool(Some("0"), true));
        assert!(parse_bool(Some("maybe"), true));
        assert!(!parse_bool(None, false));
    }
}
