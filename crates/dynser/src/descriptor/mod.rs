// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynser contributors

//! Descriptor graph: the metadata every walker in this crate is driven by.
//!
//! - **types**: descriptor records and the closed `TypeKind` sum
//! - **builder**: fluent assembly with automatic layout
//! - **registry**: the hash-sorted process-wide descriptor table

mod builder;
mod registry;
mod types;

pub use builder::{ClassBuilder, EnumBuilder};
pub use registry::DescriptorRegistry;
pub use types::{
    AttributeDescriptor, BasicKind, ClassDescriptor, CustomLoadFn, CustomSaveFn, EnumConstant,
    EnumDescriptor, FieldDescriptor, HookFn, HookValue, ObjectHookFn, Qualifier,
    TemplateDescriptor, TypeDescriptor, TypeKind, ATTR_CUSTOM_LOAD, ATTR_CUSTOM_SAVE,
    ATTR_POST_LOAD, ATTR_PRE_SAVE, BASIC_KINDS, FLAG_CUSTOM_LOAD, FLAG_CUSTOM_SAVE, FLAG_POST_LOAD,
    FLAG_PRE_SAVE,
};
