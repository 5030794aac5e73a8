// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Products and capability bits a tracer advertises, with their receivers.

use std::collections::BTreeSet;

use crate::dispatcher::{Dispatcher, ProductMatcher, Receiver};
use crate::path::ConfigPath;
use crate::repository::{Change, Repository};

// Capability bits, as numbered by the agent protocol. Bit 0 is reserved.

/// The client can turn ASM on and off remotely.
pub const ASM_ACTIVATION: u64 = 1 << 1;
pub const ASM_IP_BLOCKING: u64 = 1 << 2;
pub const ASM_DD_RULES: u64 = 1 << 3;
pub const ASM_EXCLUSIONS: u64 = 1 << 4;
pub const ASM_REQUEST_BLOCKING: u64 = 1 << 5;
pub const ASM_RESPONSE_BLOCKING: u64 = 1 << 6;
pub const ASM_USER_BLOCKING: u64 = 1 << 7;
pub const ASM_CUSTOM_RULES: u64 = 1 << 8;
pub const ASM_CUSTOM_BLOCKING_RESPONSE: u64 = 1 << 9;
pub const ASM_TRUSTED_IPS: u64 = 1 << 10;
pub const ASM_API_SECURITY_SAMPLE_RATE: u64 = 1 << 11;
pub const APM_TRACING_SAMPLE_RATE: u64 = 1 << 12;
pub const APM_TRACING_LOGS_INJECTION: u64 = 1 << 13;
pub const APM_TRACING_HTTP_HEADER_TAGS: u64 = 1 << 14;
pub const APM_TRACING_CUSTOM_TAGS: u64 = 1 << 15;
pub const APM_TRACING_TRACING_ENABLED: u64 = 1 << 19;
pub const APM_TRACING_SAMPLE_RULES: u64 = 1 << 29;

/// What this client asks the agent for and who consumes the answers.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    products: BTreeSet<String>,
    bits: u64,
    receivers: Vec<Receiver>,
}

impl Capabilities {
    /// No products, no capability bits and no receivers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertises `product` without subscribing to it.
    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.products.insert(product.into());
        self
    }

    /// ORs `bits` into the advertised capability set.
    pub fn with_capability(mut self, bits: u64) -> Self {
        self.bits |= bits;
        self
    }

    /// Subscribes `callback` to the changes of `products`, which are also
    /// advertised to the agent.
    pub fn with_receiver<I, S, F>(mut self, products: I, callback: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&mut Repository, &[Change]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let matcher = ProductMatcher::new(products);
        self.products.extend(matcher.products().map(str::to_string));
        self.receivers.push(Receiver::new(matcher, callback));
        self
    }

    /// Registers a receiver with a custom matcher. Products must be
    /// advertised separately.
    pub fn with_matcher<M, F>(mut self, matcher: M, callback: F) -> Self
    where
        M: Fn(&ConfigPath) -> bool + Send + Sync + 'static,
        F: Fn(&mut Repository, &[Change]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.receivers.push(Receiver::new(matcher, callback));
        self
    }

    /// Advertised products in sorted order.
    pub fn products(&self) -> impl Iterator<Item = &str> {
        self.products.iter().map(String::as_str)
    }

    pub fn bits(&self) -> u64 {
        self.bits
    }

    /// Capability bitset as minimal big-endian bytes, at least one byte long.
    pub fn encoded(&self) -> Vec<u8> {
        let bytes = self.bits.to_be_bytes();
        let first = bytes
            .iter()
            .position(|byte| *byte != 0)
            .unwrap_or(bytes.len() - 1);
        bytes[first..].to_vec()
    }

    /// Dispatcher over the registered receivers, in registration order.
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.receivers.clone())
    }
}
