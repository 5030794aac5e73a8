// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Raw configuration payloads and their integrity checks.

use bytes::Bytes;
use sha2::{Digest, Sha256, Sha512};

use crate::path::{ConfigPath, PathError};
use crate::protocol::TargetFile;
use crate::targets::Target;

/// Raw configuration payload delivered for a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    path: ConfigPath,
    data: Bytes,
}

impl Content {
    pub fn new(path: ConfigPath, data: impl Into<Bytes>) -> Self {
        Self {
            path,
            data: data.into(),
        }
    }

    pub fn path(&self) -> &ConfigPath {
        &self.path
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Hex digest of the payload for `algorithm`, `None` if unsupported.
    pub fn hexdigest(&self, algorithm: &str) -> Option<String> {
        match algorithm {
            "sha256" => Some(hex::encode(Sha256::digest(&self.data))),
            "sha512" => Some(hex::encode(Sha512::digest(&self.data))),
            _ => None,
        }
    }

    /// Whether every hash advertised by `target` matches this payload.
    pub fn matches_hashes(&self, target: &Target) -> bool {
        target
            .hashes
            .iter()
            .all(|(algorithm, expected)| self.hexdigest(algorithm).as_deref() == Some(expected))
    }

    /// Whether this payload is the one `target` describes (length and hashes).
    pub fn satisfies(&self, target: &Target) -> bool {
        self.data.len() as u64 == target.length && self.matches_hashes(target)
    }
}

/// All payloads shipped with one manifest.
#[derive(Debug, Clone, Default)]
pub struct ContentList {
    contents: Vec<Content>,
}

impl ContentList {
    /// Builds the list from decoded `target_files` entries.
    pub fn from_target_files(files: Vec<TargetFile>) -> Result<Self, PathError> {
        let contents = files
            .into_iter()
            .map(|file| Ok(Content::new(ConfigPath::parse(&file.path)?, file.raw)))
            .collect::<Result<Vec<_>, PathError>>()?;
        Ok(Self { contents })
    }

    /// Returns the content at `path` that satisfies `target`'s integrity descriptor.
    pub fn find_content(&self, path: &ConfigPath, target: &Target) -> Option<&Content> {
        self.contents
            .iter()
            .find(|content| content.path() == path && content.satisfies(target))
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

impl FromIterator<Content> for ContentList {
    fn from_iter<I: IntoIterator<Item = Content>>(iter: I) -> Self {
        Self {
            contents: iter.into_iter().collect(),
        }
    }
}
