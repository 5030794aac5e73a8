// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Tracer-side Remote Configuration client.
//!
//! A [`Component`] polls the local Datadog agent, reconciles the returned
//! manifest against the configuration already applied and hands every
//! insert, update or delete to the receivers registered in [`Capabilities`].
//! Hosts that need configuration before serving traffic can block on
//! [`Component::barrier_once`], which never waits longer than the boot timeout.

pub mod barrier;
pub mod capabilities;
pub mod client;
pub mod component;
pub mod config;
pub mod content;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod negotiation;
pub mod path;
pub mod protocol;
pub mod repository;
pub mod targets;
mod test_support;
pub mod transport;
pub mod worker;

pub use barrier::{Barrier, WaitResult};
pub use capabilities::Capabilities;
pub use client::{Client, ClientIdentity};
pub use component::Component;
pub use config::RemoteConfigSettings;
pub use content::{Content, ContentList};
pub use dispatcher::{Dispatcher, Matcher, ProductMatcher, Receiver};
pub use error::{ClientError, ComponentError, SyncError};
pub use http::{AgentTransport, CONFIG_ENDPOINT, INFO_ENDPOINT};
pub use negotiation::{Negotiation, NegotiationFailure};
pub use path::{ConfigPath, ConfigPathSource, PathError};
pub use repository::{ApplyState, AppliedConfig, Change, ChangeKind, Repository};
pub use targets::{Target, TargetMap, TargetsError};
pub use transport::{ConfigResponse, InfoResponse, Transport, TransportError};
pub use worker::{Worker, WorkerState};
