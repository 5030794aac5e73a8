// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Applied configuration state and transactional reconciliation.
//!
//! [`reconcile`] is a pure function from the current [`Repository`] and a
//! freshly received manifest to either the next repository plus the ordered
//! change list, or a [`SyncError`]. [`Repository::transaction`] only swaps the
//! result in on success, so a failed reconciliation leaves no trace.

use std::collections::{BTreeMap, HashSet};

use crate::content::{Content, ContentList};
use crate::error::SyncError;
use crate::path::ConfigPath;
use crate::protocol::{ClientState, ConfigState};
use crate::targets::{Target, TargetMap};

/// Root metadata version advertised by tracer clients, which never rotate roots.
const ROOT_VERSION: u64 = 1;

/// Outcome of applying a config, as reported back to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ApplyState {
    #[default]
    Unknown,
    Unacknowledged,
    Acknowledged,
    Error(String),
}

impl ApplyState {
    /// Numeric code used on the wire.
    pub fn code(&self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Unacknowledged => 1,
            Self::Acknowledged => 2,
            Self::Error(_) => 3,
        }
    }

    fn error(&self) -> Option<String> {
        match self {
            Self::Error(message) => Some(message.clone()),
            _ => None,
        }
    }
}

/// A config currently applied at some path.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedConfig {
    target: Target,
    content: Content,
    apply_state: ApplyState,
}

impl AppliedConfig {
    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn apply_state(&self) -> &ApplyState {
        &self.apply_state
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One reconciled difference between two manifests.
///
/// For deletes, `target` and `content` are the ones that were applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub kind: ChangeKind,
    pub path: ConfigPath,
    pub target: Target,
    pub content: Content,
}

/// Currently applied configs plus the aggregate state echoed to the agent.
#[derive(Debug, Clone, PartialEq)]
pub struct Repository {
    configs: BTreeMap<ConfigPath, AppliedConfig>,
    root_version: u64,
    targets_version: u64,
    has_error: bool,
    error: String,
    opaque_backend_state: String,
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository {
    pub fn new() -> Self {
        Self {
            configs: BTreeMap::new(),
            root_version: ROOT_VERSION,
            targets_version: 0,
            has_error: false,
            error: String::new(),
            opaque_backend_state: String::new(),
        }
    }

    /// Reconciles against a new manifest, committing only if every path validates.
    pub fn transaction(
        &mut self,
        new_paths: &[ConfigPath],
        targets: &TargetMap,
        contents: &ContentList,
    ) -> Result<Vec<Change>, SyncError> {
        let (next, changes) = reconcile(self, new_paths, targets, contents)?;
        *self = next;
        Ok(changes)
    }

    pub fn get(&self, path: &ConfigPath) -> Option<&AppliedConfig> {
        self.configs.get(path)
    }

    pub fn contains(&self, path: &ConfigPath) -> bool {
        self.configs.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &ConfigPath> {
        self.configs.keys()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn root_version(&self) -> u64 {
        self.root_version
    }

    pub fn targets_version(&self) -> u64 {
        self.targets_version
    }

    pub fn opaque_backend_state(&self) -> &str {
        &self.opaque_backend_state
    }

    /// Records how a receiver handled the config at `path`.
    ///
    /// Returns `false` when nothing is applied at `path`.
    pub fn set_apply_state(&mut self, path: &ConfigPath, state: ApplyState) -> bool {
        match self.configs.get_mut(path) {
            Some(applied) => {
                applied.apply_state = state;
                true
            }
            None => false,
        }
    }

    /// Per-config states, in path order.
    pub fn config_states(&self) -> Vec<ConfigState> {
        self.configs
            .iter()
            .map(|(path, applied)| ConfigState {
                id: path.config_id().to_string(),
                version: applied.target.version(),
                product: path.product().to_string(),
                apply_state: applied.apply_state.code(),
                apply_error: applied.apply_state.error(),
            })
            .collect()
    }

    /// Client state block sent with every config request.
    pub fn client_state(&self) -> ClientState {
        ClientState {
            root_version: self.root_version,
            targets_version: self.targets_version,
            config_states: self.config_states(),
            has_error: self.has_error,
            error: self.error.clone(),
            backend_client_state: self.opaque_backend_state.clone(),
        }
    }
}

/// Computes the repository that results from applying a manifest to `current`.
///
/// Changes are ordered deletes first (path order), then inserts and updates in
/// manifest order. Paths listed more than once are reconciled once.
pub fn reconcile(
    current: &Repository,
    new_paths: &[ConfigPath],
    targets: &TargetMap,
    contents: &ContentList,
) -> Result<(Repository, Vec<Change>), SyncError> {
    let wanted: HashSet<&ConfigPath> = new_paths.iter().collect();
    let mut changes: Vec<Change> = current
        .configs
        .iter()
        .filter(|(path, _)| !wanted.contains(path))
        .map(|(path, applied)| Change {
            kind: ChangeKind::Delete,
            path: path.clone(),
            target: applied.target.clone(),
            content: applied.content.clone(),
        })
        .collect();

    let mut next = current.clone();
    let mut seen = HashSet::new();
    for path in new_paths {
        if !seen.insert(path) {
            continue;
        }
        let target = targets
            .get(path)
            .ok_or_else(|| SyncError::MissingTarget(path.clone()))?;
        let kind = match current.configs.get(path) {
            None => ChangeKind::Insert,
            Some(applied) if !applied.content.matches_hashes(target) => ChangeKind::Update,
            Some(_) => {
                // Same content, possibly under a newer config version.
                if let Some(applied) = next.configs.get_mut(path) {
                    applied.target = target.clone();
                }
                continue;
            }
        };
        let content = contents
            .find_content(path, target)
            .ok_or_else(|| SyncError::MissingContent(path.clone()))?;
        changes.push(Change {
            kind,
            path: path.clone(),
            target: target.clone(),
            content: content.clone(),
        });
    }

    for change in &changes {
        match change.kind {
            ChangeKind::Delete => {
                next.configs.remove(&change.path);
            }
            ChangeKind::Insert | ChangeKind::Update => {
                next.configs.insert(
                    change.path.clone(),
                    AppliedConfig {
                        target: change.target.clone(),
                        content: change.content.clone(),
                        apply_state: ApplyState::Unacknowledged,
                    },
                );
            }
        }
    }
    next.opaque_backend_state = targets.opaque_backend_state().to_string();
    next.targets_version = targets.version();

    Ok((next, changes))
}
