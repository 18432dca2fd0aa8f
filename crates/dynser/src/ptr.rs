// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynser contributors

//! Pointer-identity policy.
//!
//! Pointer-qualified fields store the stable u32 identity an external
//! object database assigned to the target; raw addresses never reach the
//! wire. The policy is injected per save call and decides, pointer by
//! pointer, what is eligible and how its identity is emitted. Load stores
//! incoming identities verbatim; reconciling them back into live objects
//! is the owning database's job, after the load returns.
//!
//! Implementations must be reentrant-safe: the walker calls them from
//! nested recursion.

use crate::descriptor::{FieldDescriptor, TypeDescriptor};

/// Capability interface consulted for every pointer-qualified field or
/// container element during save.
pub trait PointerPolicy {
    /// Whether this pointer should be serialized at all. Refusal is a
    /// normal omission, not an error: the field or element is simply
    /// absent from the output.
    fn can_save(
        &self,
        identity: u32,
        field: Option<&FieldDescriptor>,
        ty: &TypeDescriptor,
    ) -> bool;

    /// Map the stored identity to the identity written to the output.
    fn save(&self, identity: u32) -> u32;
}

/// Policy that serializes every non-zero identity unchanged. Zero is the
/// anonymous/untracked identity and is never worth writing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SaveAllPointers;

impl PointerPolicy for SaveAllPointers {
    fn can_save(
        &self,
        identity: u32,
        _field: Option<&FieldDescriptor>,
        _ty: &TypeDescriptor,
    ) -> bool {
        identity != 0
    }

    fn save(&self, identity: u32) -> u32 {
        identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{BasicKind, TypeDescriptor};

    #[test]
    fn test_save_all_refuses_zero() {
        let ty = TypeDescriptor::basic(BasicKind::U32);
        let policy = SaveAllPointers;
        assert!(!policy.can_save(0, None, &ty));
        assert!(policy.can_save(17, None, &ty));
        assert_eq!(policy.save(17), 17);
    }
}
