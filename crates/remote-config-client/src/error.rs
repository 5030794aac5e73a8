// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy of a synchronisation cycle.
//!
//! | Error | Recoverable | Effect on the poll loop |
//! |-------|-------------|-------------------------|
//! | [`SyncError`] | Yes | logged, retried on the next interval, state kept |
//! | any other [`ClientError`] | No | negotiation and client are rebuilt from scratch |

use thiserror::Error;

use crate::path::{ConfigPath, PathError};
use crate::targets::TargetsError;
use crate::transport::TransportError;

/// Per-cycle failure that never mutates the repository.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("no target for path {0}")]
    MissingTarget(ConfigPath),
    #[error("no valid content for target at path {0}")]
    MissingContent(ConfigPath),
    #[error("unexpected agent response: status {status}")]
    UnexpectedResponse { status: u16, body: String },
    /// The config request never produced a usable response (connection,
    /// timeout or undecodable body).
    #[error("agent request failed: {0}")]
    Transport(String),
}

impl From<TransportError> for SyncError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Failure raised by [`Client::sync`](crate::client::Client::sync).
#[derive(Debug, Error)]
pub enum ClientError {
    /// Retried on the next interval with the current state.
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("invalid config path: {0}")]
    Path(#[from] PathError),
    #[error("invalid targets metadata: {0}")]
    Targets(#[from] TargetsError),
    /// Raised after the repository transaction was committed.
    #[error("receiver failed: {0:#}")]
    Receiver(anyhow::Error),
}

impl ClientError {
    /// Whether the error leaves internal state trustworthy.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Sync(_))
    }
}

/// Failure constructing a [`Component`](crate::component::Component).
#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("remote configuration requires a tokio runtime: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),
    #[error("failed to build agent transport: {0}")]
    Transport(#[from] TransportError),
}
