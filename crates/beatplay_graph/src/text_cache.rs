// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shaped-text cache keyed by object identity.
//!
//! Text shaping belongs to an external collaborator; this cache only keeps
//! the opaque handles it returns. Entries are invalidated by hand when an
//! object's text changes or the object is removed.

use crate::identifier::Identifier;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;

/// Opaque handle to shaped text owned by the render registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TextHandle(pub u64);

/// Identity-keyed cache of shaped text, shared by pipeline workers
#[derive(Debug, Default)]
pub struct ShapedTextCache {
    entries: RwLock<HashMap<Identifier, TextHandle>>,
}

impl ShapedTextCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached handle for `id`, shaping `text` on a miss.
    ///
    /// Failed shaping is not cached.
    pub fn get_or_shape(
        &self,
        id: &Identifier,
        text: &str,
        shape: impl FnOnce(&str) -> Option<TextHandle>,
    ) -> Option<TextHandle> {
        if let Some(handle) = self.entries.read().get(id) {
            return Some(*handle);
        }
        let handle = shape(text)?;
        self.entries.write().entry(id.clone()).or_insert(handle);
        Some(handle)
    }

    /// Cached handle for `id` without shaping
    pub fn get(&self, id: &Identifier) -> Option<TextHandle> {
        self.entries.read().get(id).copied()
    }

    /// Drop the entry for `id`
    pub fn invalidate(&self, id: &Identifier) {
        self.entries.write().remove(id);
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
