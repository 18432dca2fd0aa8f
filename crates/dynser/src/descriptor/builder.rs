// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynser contributors

//! Fluent builders for class and enum descriptors.
//!
//! Producers that extract metadata from source carry their own layout; these
//! builders compute one for descriptors assembled by hand (tests, tools,
//! bridges). Layout follows natural alignment: each field is aligned to its
//! own requirement and the class size is padded to the class alignment.

use crate::descriptor::types::{
    AttributeDescriptor, ClassDescriptor, CustomLoadFn, CustomSaveFn, EnumConstant, EnumDescriptor,
    FieldDescriptor, HookFn, ObjectHookFn, Qualifier, TypeDescriptor, TypeKind, ATTR_CUSTOM_LOAD,
    ATTR_CUSTOM_SAVE, ATTR_POST_LOAD, ATTR_PRE_SAVE, FLAG_CUSTOM_LOAD, FLAG_CUSTOM_SAVE,
    FLAG_POST_LOAD, FLAG_PRE_SAVE,
};
use crate::hash::name_hash;
use std::sync::Arc;

fn align_up(offset: usize, alignment: usize) -> usize {
    (offset + alignment - 1) & !(alignment - 1)
}

/// Builder for class type descriptors.
#[derive(Debug)]
pub struct ClassBuilder {
    name: String,
    bases: Vec<Arc<TypeDescriptor>>,
    fields: Vec<FieldDescriptor>,
    attributes: Vec<AttributeDescriptor>,
    flag_attributes: u32,
    cursor: usize,
    alignment: usize,
}

impl ClassBuilder {
    /// Create a new builder for a class type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bases: Vec::new(),
            fields: Vec::new(),
            attributes: Vec::new(),
            flag_attributes: 0,
            cursor: 0,
            alignment: 1,
        }
    }

    /// Derive from a base class. The base's storage occupies the front of the
    /// instance so its field offsets stay valid against derived instances;
    /// call before adding fields. Producers with multi-base layouts must
    /// supply pre-adjusted offsets via [`Self::field_at`].
    pub fn base(mut self, base: &Arc<TypeDescriptor>) -> Self {
        assert!(
            self.fields.is_empty() && self.bases.is_empty(),
            "base must be the first layout entry"
        );
        self.cursor = base.size();
        self.alignment = self.alignment.max(base.alignment());
        self.bases.push(base.clone());
        self
    }

    /// Add a value field.
    pub fn field(self, name: impl Into<String>, ty: &Arc<TypeDescriptor>) -> Self {
        self.push_field(name, ty, Qualifier::Value, None, false)
    }

    /// Add a reference field (serialized like a value).
    pub fn reference_field(self, name: impl Into<String>, ty: &Arc<TypeDescriptor>) -> Self {
        self.push_field(name, ty, Qualifier::Reference, None, false)
    }

    /// Add a pointer field. The slot stores the object-database identity.
    pub fn pointer_field(self, name: impl Into<String>, ty: &Arc<TypeDescriptor>) -> Self {
        self.push_field(name, ty, Qualifier::Pointer, None, false)
    }

    /// Add a fixed inline array field.
    pub fn array_field(
        self,
        name: impl Into<String>,
        ty: &Arc<TypeDescriptor>,
        count: usize,
    ) -> Self {
        self.push_field(name, ty, Qualifier::Value, Some(count), false)
    }

    /// Add a transient value field (never serialized).
    pub fn transient_field(self, name: impl Into<String>, ty: &Arc<TypeDescriptor>) -> Self {
        self.push_field(name, ty, Qualifier::Value, None, true)
    }

    /// Add a field at an explicit offset, bypassing layout computation.
    pub fn field_at(
        mut self,
        name: impl Into<String>,
        ty: &Arc<TypeDescriptor>,
        qualifier: Qualifier,
        offset: usize,
    ) -> Self {
        let name = name.into();
        let hash = name_hash(&name);
        let field = FieldDescriptor {
            name,
            hash,
            ty: ty.clone(),
            qualifier,
            offset,
            array_count: None,
            transient: false,
        };
        self.cursor = self.cursor.max(offset + field.value_size());
        self.alignment = self.alignment.max(field.value_alignment());
        self.fields.push(field);
        self
    }

    fn push_field(
        mut self,
        name: impl Into<String>,
        ty: &Arc<TypeDescriptor>,
        qualifier: Qualifier,
        array_count: Option<usize>,
        transient: bool,
    ) -> Self {
        let name = name.into();
        let hash = name_hash(&name);
        let mut field = FieldDescriptor {
            name,
            hash,
            ty: ty.clone(),
            qualifier,
            offset: 0,
            array_count,
            transient,
        };
        let alignment = field.value_alignment();
        field.offset = align_up(self.cursor, alignment);
        self.cursor = field.offset + field.value_size();
        self.alignment = self.alignment.max(alignment);
        self.fields.push(field);
        self
    }

    /// Attach a custom JSON load hook.
    pub fn custom_load(self, hook: CustomLoadFn) -> Self {
        self.attribute_with_flag(ATTR_CUSTOM_LOAD, HookFn::CustomLoad(hook), FLAG_CUSTOM_LOAD)
    }

    /// Attach a custom JSON save hook.
    pub fn custom_save(self, hook: CustomSaveFn) -> Self {
        self.attribute_with_flag(ATTR_CUSTOM_SAVE, HookFn::CustomSave(hook), FLAG_CUSTOM_SAVE)
    }

    /// Attach a pre-save hook.
    pub fn pre_save(self, hook: ObjectHookFn) -> Self {
        self.attribute_with_flag(ATTR_PRE_SAVE, HookFn::Object(hook), FLAG_PRE_SAVE)
    }

    /// Attach a post-load hook.
    pub fn post_load(self, hook: ObjectHookFn) -> Self {
        self.attribute_with_flag(ATTR_POST_LOAD, HookFn::Object(hook), FLAG_POST_LOAD)
    }

    /// Attach an arbitrary named function attribute.
    pub fn attribute(mut self, name: impl Into<String>, hook: HookFn) -> Self {
        let name = name.into();
        let hash = name_hash(&name);
        self.attributes.push(AttributeDescriptor { name, hash, hook });
        self
    }

    fn attribute_with_flag(mut self, name: &str, hook: HookFn, flag: u32) -> Self {
        self.flag_attributes |= flag;
        self = self.attribute(name, hook);
        self
    }

    /// Build the descriptor. Fields and attributes are hash-sorted so the
    /// lookup primitive can binary search them.
    pub fn build(mut self) -> Arc<TypeDescriptor> {
        self.fields.sort_by_key(|f| f.hash);
        self.attributes.sort_by_key(|a| a.hash);
        let size = align_up(self.cursor, self.alignment);
        Arc::new(TypeDescriptor::new(
            self.name,
            TypeKind::Class(ClassDescriptor {
                fields: self.fields,
                bases: self.bases,
                attributes: self.attributes,
                flag_attributes: self.flag_attributes,
                size,
                alignment: self.alignment,
            }),
        ))
    }
}

/// Builder for enum type descriptors.
#[derive(Debug)]
pub struct EnumBuilder {
    name: String,
    constants: Vec<EnumConstant>,
    next_value: i32,
}

impl EnumBuilder {
    /// Create a new enum builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constants: Vec::new(),
            next_value: 0,
        }
    }

    /// Add a constant with auto-incrementing value.
    pub fn constant(mut self, name: impl Into<String>) -> Self {
        self.constants.push(EnumConstant::new(name, self.next_value));
        self.next_value += 1;
        self
    }

    /// Add a constant with explicit value.
    pub fn constant_value(mut self, name: impl Into<String>, value: i32) -> Self {
        self.constants.push(EnumConstant::new(name, value));
        self.next_value = value + 1;
        self
    }

    /// Build the descriptor with hash-sorted constants.
    pub fn build(mut self) -> Arc<TypeDescriptor> {
        self.constants.sort_by_key(|c| c.hash);
        Arc::new(TypeDescriptor::new(
            self.name,
            TypeKind::Enum(EnumDescriptor {
                constants: self.constants,
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::types::BasicKind;

    #[test]
    fn test_layout_aligns_fields() {
        let ty = ClassBuilder::new("Mixed")
            .field("a", &TypeDescriptor::basic(BasicKind::U8))
            .field("b", &TypeDescriptor::basic(BasicKind::U32))
            .field("c", &TypeDescriptor::basic(BasicKind::U16))
            .build();

        let class = ty.as_class().expect("class descriptor");
        let offset_of = |name: &str| {
            class
                .fields
                .iter()
                .find(|f| f.name == name)
                .expect("field")
                .offset
        };
        assert_eq!(offset_of("a"), 0);
        assert_eq!(offset_of("b"), 4);
        assert_eq!(offset_of("c"), 8);
        assert_eq!(class.size, 12);
        assert_eq!(class.alignment, 4);
    }

    #[test]
    fn test_base_precedes_own_fields() {
        let base = ClassBuilder::new("Base")
            .field("a", &TypeDescriptor::basic(BasicKind::U32))
            .build();
        let derived = ClassBuilder::new("Derived")
            .base(&base)
            .field("b", &TypeDescriptor::basic(BasicKind::U32))
            .build();

        let class = derived.as_class().expect("class descriptor");
        assert_eq!(class.bases.len(), 1);
        assert_eq!(class.fields[0].offset, 4);
        assert_eq!(class.size, 8);

        // Base field offsets resolve against derived instances.
        let inherited = derived.find_field(name_hash("a")).expect("inherited field");
        assert_eq!(inherited.offset, 0);
    }

    #[test]
    fn test_fields_hash_sorted_after_build() {
        let ty = ClassBuilder::new("Sorted")
            .field("zeta", &TypeDescriptor::basic(BasicKind::U32))
            .field("alpha", &TypeDescriptor::basic(BasicKind::U32))
            .field("mid", &TypeDescriptor::basic(BasicKind::U32))
            .build();
        let class = ty.as_class().expect("class descriptor");
        assert!(class.fields.windows(2).all(|w| w[0].hash <= w[1].hash));
    }

    #[test]
    fn test_enum_builder_values() {
        let ty = EnumBuilder::new("Mode")
            .constant("Off")
            .constant("On")
            .constant_value("Auto", 10)
            .constant("Manual")
            .build();
        let desc = ty.as_enum().expect("enum descriptor");
        assert_eq!(desc.constant_by_value(0).map(|c| c.name.as_str()), Some("Off"));
        assert_eq!(desc.constant_by_value(10).map(|c| c.name.as_str()), Some("Auto"));
        assert_eq!(
            desc.constant_by_value(11).map(|c| c.name.as_str()),
            Some("Manual")
        );
    }

    #[test]
    fn test_array_field_footprint() {
        let ty = ClassBuilder::new("Fixed")
            .array_field("xs", &TypeDescriptor::basic(BasicKind::I16), 5)
            .field("tail", &TypeDescriptor::basic(BasicKind::U8))
            .build();
        let class = ty.as_class().expect("class descriptor");
        let xs = class.fields.iter().find(|f| f.name == "xs").expect("xs");
        assert_eq!(xs.value_size(), 10);
        let tail = class.fields.iter().find(|f| f.name == "tail").expect("tail");
        assert_eq!(tail.offset, 10);
    }
}
