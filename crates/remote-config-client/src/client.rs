// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! One synchronisation cycle against the agent.
//!
//! [`Client::sync`] sends the current repository state, turns the agent answer
//! into paths, targets and contents, reconciles them and dispatches whatever
//! changed to the registered receivers.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::capabilities::Capabilities;
use crate::config::RemoteConfigSettings;
use crate::content::ContentList;
use crate::dispatcher::Dispatcher;
use crate::error::{ClientError, SyncError};
use crate::path::ConfigPath;
use crate::protocol::{ClientDescriptor, ClientTracer, ConfigRequest};
use crate::repository::Repository;
use crate::targets::TargetMap;
use crate::transport::{ConfigResponse, Transport};

/// Tracer language reported in `client_tracer.language`.
pub const LANGUAGE: &str = "rust";

/// Static identity a client presents on every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    /// Random per-client id, regenerated whenever the client is rebuilt.
    pub id: String,
    pub runtime_id: String,
    pub tracer_version: String,
    pub service: String,
    pub env: String,
    pub app_version: Option<String>,
}

impl ClientIdentity {
    /// Identity for `settings` with a freshly generated client id.
    pub fn from_settings(settings: &RemoteConfigSettings) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            runtime_id: settings.runtime_id.clone(),
            tracer_version: env!("CARGO_PKG_VERSION").to_string(),
            service: settings.service.clone(),
            env: settings.env.clone(),
            app_version: settings.app_version.clone(),
        }
    }
}

/// Tracer-side remote configuration client.
///
/// Holds the applied [`Repository`] and the receivers it dispatches to. A
/// client is never reused across resets: the component builds a new one,
/// which gets a new id and an empty repository.
pub struct Client {
    transport: Arc<dyn Transport>,
    identity: ClientIdentity,
    products: Vec<String>,
    capabilities: Vec<u8>,
    repository: Repository,
    dispatcher: Dispatcher,
}

impl Client {
    pub fn new(
        transport: Arc<dyn Transport>,
        settings: &RemoteConfigSettings,
        capabilities: &Capabilities,
    ) -> Self {
        // Products, capability bits and receivers are fixed for the client's lifetime.
        Self {
            transport,
            identity: ClientIdentity::from_settings(settings),
            products: capabilities.products().map(str::to_string).collect(),
            capabilities: capabilities.encoded(),
            repository: Repository::new(),
            dispatcher: capabilities.dispatcher(),
        }
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    /// Configuration applied so far.
    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Request describing this client and its applied state.
    pub fn build_request(&self) -> ConfigRequest {
        ConfigRequest {
            client: ClientDescriptor {
                state: self.repository.client_state(),
                id: self.identity.id.clone(),
                products: self.products.clone(),
                is_tracer: true,
                is_agent: false,
                client_tracer: ClientTracer {
                    runtime_id: self.identity.runtime_id.clone(),
                    language: LANGUAGE.to_string(),
                    tracer_version: self.identity.tracer_version.clone(),
                    service: self.identity.service.clone(),
                    env: self.identity.env.clone(),
                    app_version: self.identity.app_version.clone(),
                    tags: Vec::new(),
                },
                capabilities: self.capabilities.clone(),
            },
            cached_target_files: Vec::new(),
        }
    }

    /// Polls the agent once and applies the answer.
    ///
    /// A [`SyncError`], including a failed agent request, leaves the
    /// repository untouched. Receivers run after the new state is committed.
    pub async fn sync(&mut self) -> Result<(), ClientError> {
        let request = self.build_request();
        let response = self
            .transport
            .send_config(&request)
            .await
            .map_err(SyncError::from)?;
        let payload = match response {
            ConfigResponse::Ok(payload) => payload,
            ConfigResponse::Empty => {
                debug!("remote-config: agent has no configuration for this client");
                return Ok(());
            }
            ConfigResponse::Unexpected { status, body } => {
                return Err(SyncError::UnexpectedResponse { status, body }.into());
            }
        };

        let paths = payload
            .client_configs
            .iter()
            .map(|path| ConfigPath::parse(path))
            .collect::<Result<Vec<_>, _>>()?;
        let targets = TargetMap::parse(&payload.targets)?;
        let contents = ContentList::from_target_files(payload.target_files)?;

        let changes = self.repository.transaction(&paths, &targets, &contents)?;
        if changes.is_empty() {
            return Ok(());
        }
        debug!(
            changes = changes.len(),
            targets_version = self.repository.targets_version(),
            "remote-config: dispatching configuration changes"
        );
        self.dispatcher
            .dispatch(&changes, &mut self.repository)
            .map_err(ClientError::Receiver)
    }
}
