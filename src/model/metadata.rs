// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Name/value metadata

use serde::{Deserialize, Serialize};

/// One metadata entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub value: String,
}

/// Ordered metadata entries attached to a document, an object, or the registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataGroup {
    entries: Vec<Metadata>,
}

impl MetadataGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; duplicates are kept in insertion order
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push(Metadata {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Value of the first entry called `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value.as_str())
    }

    pub fn remove(&mut self, index: usize) -> Option<Metadata> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Metadata> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a MetadataGroup {
    type Item = &'a Metadata;
    type IntoIter = std::slice::Iter<'a, Metadata>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
