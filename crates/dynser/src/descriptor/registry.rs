// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynser contributors

//! In-memory descriptor table, the read-only face of the external metadata
//! database.
//!
//! Descriptors live in one ascending-hash array so lookups are the same
//! O(log n) binary search the serializer uses everywhere else. The registry
//! is populated once at startup by whatever loads the metadata; the walkers
//! only ever query it.

use crate::descriptor::types::{BasicKind, TypeDescriptor, BASIC_KINDS};
use crate::hash::name_hash;
use crate::lookup::find_named;
use std::sync::Arc;

/// Hash-sorted table of type descriptors.
#[derive(Debug, Default)]
pub struct DescriptorRegistry {
    types: Vec<Arc<TypeDescriptor>>,
}

impl DescriptorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { types: Vec::new() }
    }

    /// Create a registry seeded with the built-in numeric types.
    pub fn with_basics() -> Self {
        let mut registry = Self::new();
        for kind in BASIC_KINDS {
            registry.register(TypeDescriptor::basic(kind));
        }
        registry
    }

    /// Register a descriptor, keeping the table hash-sorted.
    ///
    /// # Panics
    ///
    /// Two distinct names hashing to the same value is a metadata integrity
    /// violation, not a runtime condition.
    pub fn register(&mut self, ty: Arc<TypeDescriptor>) {
        match self.types.binary_search_by_key(&ty.hash, |t| t.hash) {
            Ok(index) => {
                assert!(
                    self.types[index].name == ty.name,
                    "name hash collision: {} vs {}",
                    self.types[index].name,
                    ty.name
                );
                self.types[index] = ty;
            }
            Err(index) => self.types.insert(index, ty),
        }
    }

    /// Find a descriptor by name hash.
    pub fn find(&self, hash: u32) -> Option<&Arc<TypeDescriptor>> {
        find_named(&self.types, hash)
    }

    /// Find a descriptor by name.
    pub fn find_by_name(&self, name: &str) -> Option<&Arc<TypeDescriptor>> {
        self.find(name_hash(name))
    }

    /// Find a built-in numeric descriptor.
    pub fn basic(&self, kind: BasicKind) -> Option<&Arc<TypeDescriptor>> {
        self.find(name_hash(kind.name()))
    }

    /// Number of registered descriptors.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate all descriptors in ascending hash order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TypeDescriptor>> {
        self.types.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::builder::ClassBuilder;

    #[test]
    fn test_basics_resolvable() {
        let registry = DescriptorRegistry::with_basics();
        assert_eq!(registry.len(), 12);
        for kind in BASIC_KINDS {
            let ty = registry.basic(kind).expect("built-in registered");
            assert_eq!(ty.name, kind.name());
        }
    }

    #[test]
    fn test_register_keeps_sorted_order() {
        let mut registry = DescriptorRegistry::with_basics();
        registry.register(
            ClassBuilder::new("Transform")
                .field("x", &TypeDescriptor::basic(BasicKind::F32))
                .build(),
        );
        registry.register(
            ClassBuilder::new("Camera")
                .field("fov", &TypeDescriptor::basic(BasicKind::F32))
                .build(),
        );

        let hashes: Vec<u32> = registry.iter().map(|t| t.hash).collect();
        assert!(hashes.windows(2).all(|w| w[0] < w[1]));
        assert!(registry.find_by_name("Transform").is_some());
        assert!(registry.find_by_name("Camera").is_some());
        assert!(registry.find_by_name("Missing").is_none());
    }

    #[test]
    fn test_reregister_replaces() {
        let mut registry = DescriptorRegistry::new();
        registry.register(
            ClassBuilder::new("Config")
                .field("a", &TypeDescriptor::basic(BasicKind::U32))
                .build(),
        );
        registry.register(
            ClassBuilder::new("Config")
                .field("a", &TypeDescriptor::basic(BasicKind::U32))
                .field("b", &TypeDescriptor::basic(BasicKind::U32))
                .build(),
        );
        assert_eq!(registry.len(), 1);
        let ty = registry.find_by_name("Config").expect("registered");
        assert_eq!(ty.as_class().expect("class").fields.len(), 2);
    }
}
