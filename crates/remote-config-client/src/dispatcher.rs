// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Routing of reconciled changes to product receivers.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use anyhow::Context;

use crate::path::ConfigPath;
use crate::repository::{Change, Repository};

/// Predicate selecting the config paths a receiver is interested in.
pub trait Matcher: Send + Sync {
    /// Whether changes to `path` should reach the receiver.
    fn matches(&self, path: &ConfigPath) -> bool;
}

impl<F> Matcher for F
where
    F: Fn(&ConfigPath) -> bool + Send + Sync,
{
    fn matches(&self, path: &ConfigPath) -> bool {
        self(path)
    }
}

/// Matches paths whose product is one of a fixed set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductMatcher {
    products: BTreeSet<String>,
}

impl ProductMatcher {
    pub fn new<I, S>(products: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            products: products.into_iter().map(Into::into).collect(),
        }
    }

    /// Products in sorted order.
    pub fn products(&self) -> impl Iterator<Item = &str> {
        self.products.iter().map(String::as_str)
    }
}

impl Matcher for ProductMatcher {
    fn matches(&self, path: &ConfigPath) -> bool {
        self.products.contains(path.product())
    }
}

type Callback = dyn Fn(&mut Repository, &[Change]) -> anyhow::Result<()> + Send + Sync;

/// A matcher paired with the callback consuming its changes.
///
/// The callback gets mutable access to the repository so it can record
/// apply statuses with [`Repository::set_apply_state`].
#[derive(Clone)]
pub struct Receiver {
    matcher: Arc<dyn Matcher>,
    callback: Arc<Callback>,
}

impl Receiver {
    pub fn new<M, F>(matcher: M, callback: F) -> Self
    where
        M: Matcher + 'static,
        F: Fn(&mut Repository, &[Change]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            matcher: Arc::new(matcher),
            callback: Arc::new(callback),
        }
    }

    pub fn matches(&self, path: &ConfigPath) -> bool {
        self.matcher.matches(path)
    }
}

impl fmt::Debug for Receiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver").finish_non_exhaustive()
    }
}

/// Ordered set of receivers a client reports its changes to.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    receivers: Vec<Receiver>,
}

impl Dispatcher {
    pub fn new(receivers: Vec<Receiver>) -> Self {
        Self { receivers }
    }

    /// Appends `receiver`. It is called after every receiver already registered.
    pub fn register(&mut self, receiver: Receiver) {
        self.receivers.push(receiver);
    }

    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }

    /// Hands each receiver, in registration order, the changes it matches.
    ///
    /// Receivers matching none of `changes` are skipped. The first failing
    /// receiver stops the dispatch.
    pub fn dispatch(&self, changes: &[Change], repository: &mut Repository) -> anyhow::Result<()> {
        for (index, receiver) in self.receivers.iter().enumerate() {
            let matching: Vec<Change> = changes
                .iter()
                .filter(|change| receiver.matches(&change.path))
                .cloned()
                .collect();
            if matching.is_empty() {
                continue;
            }
            (receiver.callback)(repository, &matching).with_context(|| {
                format!("receiver {index} rejected {} change(s)", matching.len())
            })?;
        }
        Ok(())
    }
}
