// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Agent capability discovery through the `/info` endpoint.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::transport::{InfoResponse, Transport};

/// Reasons an agent may not be usable for remote configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegotiationFailure {
    /// Connection refused or timed out.
    AgentUnreachable,
    /// The agent answered `/info` with a 404.
    NoInfoEndpoint,
    UnexpectedResponse,
    /// `/info` does not list the requested endpoint.
    MissingCapability,
}

/// Checks whether the agent can serve remote configuration.
///
/// Warnings are latched per failure category so that an agent without the
/// feature does not flood the logs every poll interval. A new instance starts
/// with a clean latch.
pub struct Negotiation {
    transport: Arc<dyn Transport>,
    /// Failure categories already reported at warning level.
    reported: HashSet<NegotiationFailure>,
}

impl Negotiation {
    /// Creates a negotiation that has not reported anything yet.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            reported: HashSet::new(),
        }
    }

    /// Whether the agent advertises `path` among its endpoints.
    ///
    /// Each failure category is reported at most once per instance.
    pub async fn endpoint(&mut self, path: &str) -> bool {
        let info = match self.transport.send_info().await {
            Ok(InfoResponse::Ok(info)) => info,
            Ok(InfoResponse::NotFound) => {
                self.report(NegotiationFailure::NoInfoEndpoint, || {
                    warn!(
                        "remote-config: agent does not expose /info, \
                         remote configuration disabled"
                    )
                });
                return false;
            }
            Ok(InfoResponse::Unexpected { status, body }) => {
                self.report(NegotiationFailure::UnexpectedResponse, || {
                    warn!(status, body = %body, "remote-config: unexpected agent /info response")
                });
                return false;
            }
            Err(err) if err.is_network_error() => {
                self.report(NegotiationFailure::AgentUnreachable, || {
                    warn!("remote-config: agent unreachable: {err}")
                });
                return false;
            }
            Err(err) => {
                self.report(NegotiationFailure::UnexpectedResponse, || {
                    warn!("remote-config: agent /info request failed: {err}")
                });
                return false;
            }
        };

        if info.endpoints.iter().any(|endpoint| endpoint == path) {
            debug!(path, agent_version = ?info.version, "remote-config: agent supports endpoint");
            true
        } else {
            self.report(NegotiationFailure::MissingCapability, || {
                warn!(path, "remote-config: agent does not support remote configuration")
            });
            false
        }
    }

    /// Whether `failure` was already logged at warning level.
    pub fn has_reported(&self, failure: NegotiationFailure) -> bool {
        self.reported.contains(&failure)
    }

    fn report(&mut self, failure: NegotiationFailure, log: impl FnOnce()) {
        if self.reported.insert(failure) {
            log();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::CONFIG_ENDPOINT;
    use crate::test_support::{info_with, ScriptedTransport};
    use crate::transport::TransportError;
    use tracing_test::traced_test;

    fn negotiation(transport: &Arc<ScriptedTransport>) -> Negotiation {
        Negotiation::new(Arc::clone(transport) as Arc<dyn Transport>)
    }

    fn expect_lines(lines: &[&str], needle: &str, expected: usize) -> Result<(), String> {
        let found = lines.iter().filter(|line| line.contains(needle)).count();
        if found == expected {
            Ok(())
        } else {
            Err(format!("expected {expected} lines with '{needle}', found {found}"))
        }
    }

    #[tokio::test]
    async fn advertised_endpoint_is_supported() {
        let transport = Arc::new(ScriptedTransport::default());
        let mut negotiation = negotiation(&transport);
        assert!(negotiation.endpoint(CONFIG_ENDPOINT).await);
        assert!(!negotiation.has_reported(NegotiationFailure::MissingCapability));
    }

    #[tokio::test]
    #[traced_test]
    async fn unreachable_agent_warns_once() {
        let transport = Arc::new(ScriptedTransport::default());
        for _ in 0..3 {
            transport.push_info(Err(TransportError::Unreachable("connection refused".into())));
        }
        let mut negotiation = negotiation(&transport);
        for _ in 0..3 {
            assert!(!negotiation.endpoint(CONFIG_ENDPOINT).await);
        }
        assert!(negotiation.has_reported(NegotiationFailure::AgentUnreachable));
        logs_assert(|lines: &[&str]| expect_lines(lines, "agent unreachable", 1));
    }

    #[tokio::test]
    #[traced_test]
    async fn each_category_has_its_own_latch() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push_info(Ok(InfoResponse::NotFound));
        transport.push_info(Ok(InfoResponse::NotFound));
        transport.push_info(Ok(info_with(&["/v0.4/traces"])));
        transport.push_info(Ok(info_with(&["/v0.4/traces"])));
        transport.push_info(Ok(InfoResponse::Unexpected {
            status: 500,
            body: "boom".into(),
        }));
        let mut negotiation = negotiation(&transport);
        for _ in 0..5 {
            assert!(!negotiation.endpoint(CONFIG_ENDPOINT).await);
        }
        logs_assert(|lines: &[&str]| expect_lines(lines, "does not expose /info", 1));
        logs_assert(|lines: &[&str]| {
            expect_lines(lines, "does not support remote configuration", 1)
        });
        logs_assert(|lines: &[&str]| expect_lines(lines, "unexpected agent /info response", 1));
        assert!(!negotiation.has_reported(NegotiationFailure::AgentUnreachable));
    }

    #[tokio::test]
    #[traced_test]
    async fn success_is_logged_every_time() {
        let transport = Arc::new(ScriptedTransport::default());
        let mut negotiation = negotiation(&transport);
        assert!(negotiation.endpoint(CONFIG_ENDPOINT).await);
        assert!(negotiation.endpoint(CONFIG_ENDPOINT).await);
        logs_assert(|lines: &[&str]| expect_lines(lines, "agent supports endpoint", 2));
    }

    #[tokio::test]
    #[traced_test]
    async fn fresh_instance_reports_again() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push_info(Err(TransportError::Unreachable("refused".into())));
        transport.push_info(Err(TransportError::Unreachable("refused".into())));
        assert!(!negotiation(&transport).endpoint(CONFIG_ENDPOINT).await);
        assert!(!negotiation(&transport).endpoint(CONFIG_ENDPOINT).await);
        logs_assert(|lines: &[&str]| expect_lines(lines, "agent unreachable", 2));
    }
}
