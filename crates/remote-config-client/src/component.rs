// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Remote configuration as run inside a traced process.
//!
//! The component polls the agent from a background [`Worker`]. Until one
//! synchronisation has succeeded it first checks that the agent advertises
//! the config endpoint. Sync errors are retried on the next interval with the
//! current state; any other failure rebuilds the negotiation and the client
//! from scratch. Every iteration lifts the boot [`Barrier`].
//!
//! The health flag and the applied configuration are published outside the
//! state lock, so inspecting a component never waits on agent I/O.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, warn};

use crate::barrier::{Barrier, LiftOnDrop, WaitResult};
use crate::capabilities::Capabilities;
use crate::client::Client;
use crate::config::RemoteConfigSettings;
use crate::error::ComponentError;
use crate::http::{AgentTransport, CONFIG_ENDPOINT};
use crate::negotiation::Negotiation;
use crate::repository::Repository;
use crate::transport::Transport;
use crate::worker::Worker;

struct State {
    negotiation: Negotiation,
    client: Client,
}

struct Shared {
    transport: Arc<dyn Transport>,
    settings: RemoteConfigSettings,
    capabilities: Capabilities,
    barrier: Barrier,
    /// Held for a whole iteration, including agent round trips.
    state: Mutex<State>,
    /// Sticky once a sync has succeeded, cleared by a reset.
    healthy: AtomicBool,
    /// Applied configuration as of the end of the last iteration.
    snapshot: watch::Sender<Repository>,
}

impl Shared {
    fn fresh_state(
        transport: &Arc<dyn Transport>,
        settings: &RemoteConfigSettings,
        capabilities: &Capabilities,
    ) -> State {
        State {
            negotiation: Negotiation::new(Arc::clone(transport)),
            client: Client::new(Arc::clone(transport), settings, capabilities),
        }
    }

    async fn iterate(&self) {
        let _lift = LiftOnDrop(&self.barrier);
        let mut state = self.state.lock().await;

        let healthy = self.healthy.load(Ordering::Acquire);
        if !healthy && !state.negotiation.endpoint(CONFIG_ENDPOINT).await {
            return;
        }

        match state.client.sync().await {
            Ok(()) => self.healthy.store(true, Ordering::Release),
            Err(err) if err.is_recoverable() => {
                warn!("remote-config: sync failed, retrying next interval: {err}");
            }
            Err(err) => {
                error!("remote-config: sync failed, resetting client: {err}");
                *state = Self::fresh_state(&self.transport, &self.settings, &self.capabilities);
                self.healthy.store(false, Ordering::Release);
            }
        }
        self.publish(state.client.repository());
    }

    fn publish(&self, repository: &Repository) {
        self.snapshot.send_if_modified(|current| {
            if *current == *repository {
                return false;
            }
            *current = repository.clone();
            true
        });
    }
}

/// Remote configuration for one traced process.
///
/// Owns the poll [`Worker`] and the boot [`Barrier`]. Dropping the component
/// stops polling.
pub struct Component {
    shared: Arc<Shared>,
    worker: Worker,
}

impl Component {
    /// Builds a component talking to the agent over HTTP.
    ///
    /// Returns `Ok(None)` when remote configuration is disabled.
    pub fn build(
        settings: RemoteConfigSettings,
        capabilities: Capabilities,
    ) -> Result<Option<Self>, ComponentError> {
        if !settings.enabled {
            debug!("remote-config: disabled by configuration");
            return Ok(None);
        }
        let transport = Arc::new(AgentTransport::from_settings(&settings)?);
        Self::new(settings, transport, capabilities).map(Some)
    }

    /// Builds a component on the current tokio runtime.
    pub fn new(
        settings: RemoteConfigSettings,
        transport: Arc<dyn Transport>,
        capabilities: Capabilities,
    ) -> Result<Self, ComponentError> {
        let runtime = Handle::try_current()?;
        Ok(Self::with_runtime(settings, transport, capabilities, runtime))
    }

    /// Builds a component whose worker runs on `runtime`.
    pub fn with_runtime(
        settings: RemoteConfigSettings,
        transport: Arc<dyn Transport>,
        capabilities: Capabilities,
        runtime: Handle,
    ) -> Self {
        let state = Shared::fresh_state(&transport, &settings, &capabilities);
        let (snapshot, _) = watch::channel(Repository::new());
        let shared = Arc::new(Shared {
            barrier: Barrier::new(Some(settings.boot_timeout)),
            transport,
            settings,
            capabilities,
            state: Mutex::new(state),
            healthy: AtomicBool::new(false),
            snapshot,
        });

        let iteration_shared = Arc::clone(&shared);
        let worker = Worker::new(shared.settings.poll_interval, runtime, move || {
            let shared = Arc::clone(&iteration_shared);
            async move { shared.iterate().await }
        });
        Self { shared, worker }
    }

    /// Starts polling. Idempotent.
    pub fn start(&self) {
        self.worker.start();
    }

    pub fn is_started(&self) -> bool {
        self.worker.is_started()
    }

    /// Stops polling without waiting for an in-flight iteration.
    pub fn stop(&self) {
        self.worker.stop();
    }

    /// Stops polling and waits for the poll task to exit.
    pub async fn shutdown(&self) {
        self.worker.shutdown().await;
    }

    /// Starts polling if needed, then waits for the first attempt to finish,
    /// at most for the configured boot timeout.
    pub async fn barrier_once(&self) -> WaitResult {
        self.start();
        self.shared
            .barrier
            .wait_once(Some(self.shared.settings.boot_timeout))
            .await
    }

    /// Whether a sync succeeded since the client was last (re)built.
    pub fn is_healthy(&self) -> bool {
        self.shared.healthy.load(Ordering::Acquire)
    }

    /// Configuration applied as of the last finished iteration.
    pub fn repository(&self) -> Repository {
        self.shared.snapshot.borrow().clone()
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("worker", &self.worker)
            .field("barrier_lifted", &self.shared.barrier.is_lifted())
            .finish_non_exhaustive()
    }
}
