// SPDX-License-Identifier: MIT OR Apache-2.0
//! Stable identifiers for runtime objects.

use std::fmt;
use std::sync::Arc;
use xxhash_rust::xxh32::Xxh32;

/// Stable, hashable, combinable key of a runtime object
///
/// Main objects use their document id as a plain local id. Objects cloned for
/// a prefab instance combine the instance id (namespace) with the original
/// object id (local).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    namespace: Option<Arc<str>>,
    local: Arc<str>,
}

impl Identifier {
    /// Plain identifier without namespace
    pub fn new(local: impl AsRef<str>) -> Self {
        Self {
            namespace: None,
            local: Arc::from(local.as_ref()),
        }
    }

    /// Namespaced identifier, e.g. a prefab clone `combine(instance, original)`
    pub fn combine(namespace: impl AsRef<str>, local: impl AsRef<str>) -> Self {
        Self {
            namespace: Some(Arc::from(namespace.as_ref())),
            local: Arc::from(local.as_ref()),
        }
    }

    /// Namespace, if any
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Local id
    pub fn local(&self) -> &str {
        &self.local
    }

    /// Bytes identifying this key, used as randomization identity
    pub fn key_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.local.len() + 1 + self.namespace.as_ref().map_or(0, |n| n.len()));
        if let Some(namespace) = &self.namespace {
            bytes.extend_from_slice(namespace.as_bytes());
            bytes.push(0xff);
        }
        bytes.extend_from_slice(self.local.as_bytes());
        bytes
    }

    /// Platform-independent 32-bit hash
    pub fn stable_hash(&self) -> u32 {
        let mut hasher = Xxh32::new(0);
        hasher.update(&self.key_bytes());
        hasher.digest()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{namespace}/{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_differs_from_plain() {
        let plain = Identifier::new("a");
        let combined = Identifier::combine("inst", "a");
        assert_ne!(plain, combined);
        assert_eq!(combined.local(), "a");
        assert_eq!(combined.namespace(), Some("inst"));
        assert_eq!(combined.to_string(), "inst/a");
    }

    #[test]
    fn test_stable_hash_is_deterministic() {
        let a = Identifier::combine("inst", "obj");
        let b = Identifier::combine("inst", "obj");
        assert_eq!(a.stable_hash(), b.stable_hash());
        assert_ne!(a.stable_hash(), Identifier::new("obj").stable_hash());
    }
}
