// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynser contributors

//! Type descriptors for runtime reflection.
//!
//! Descriptors are produced once by an external scanner/loader, shared via
//! `Arc`, and treated as immutable by every walker in this crate.

use crate::hash::name_hash;
use crate::instance::{Addr, Instance, HANDLE_SIZE, POINTER_SIZE};
use crate::json::lexer::JsonToken;
use crate::lookup::{find_named, Named};
use std::sync::Arc;

/// Built-in numeric type kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Bool,
    Char,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

/// The closed set of built-in numeric types, in registration order.
pub const BASIC_KINDS: [BasicKind; 12] = [
    BasicKind::Bool,
    BasicKind::Char,
    BasicKind::U8,
    BasicKind::U16,
    BasicKind::U32,
    BasicKind::U64,
    BasicKind::I8,
    BasicKind::I16,
    BasicKind::I32,
    BasicKind::I64,
    BasicKind::F32,
    BasicKind::F64,
];

impl BasicKind {
    /// Get the size in bytes. Char is a 4-byte unicode scalar.
    pub fn size(&self) -> usize {
        match self {
            Self::Bool | Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::Char | Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }

    /// Get the alignment requirement within an instance image.
    pub fn alignment(&self) -> usize {
        self.size()
    }

    /// Canonical type name (the key of the dispatch table).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Char => "char",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }
}

/// How a field or container element refers to its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualifier {
    /// Stored inline in the owning instance.
    Value,
    /// Stored as a stable u32 identity assigned by the external object
    /// database; never a raw address.
    Pointer,
    /// Serialized exactly like a value.
    Reference,
}

/// Type kind enumeration.
#[derive(Debug)]
pub enum TypeKind {
    /// Terminal numeric/bool/char type.
    Basic(BasicKind),
    /// Named integer constants.
    Enum(EnumDescriptor),
    /// Fields, bases, attributes.
    Class(ClassDescriptor),
    /// Single-value-type dynamic container.
    Template(TemplateDescriptor),
}

/// A complete type descriptor.
#[derive(Debug)]
pub struct TypeDescriptor {
    /// Type name.
    pub name: String,
    /// FNV-1a hash of the name; the key every lookup resolves.
    pub hash: u32,
    /// Type kind.
    pub kind: TypeKind,
}

impl TypeDescriptor {
    /// Create a new type descriptor.
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        let name = name.into();
        let hash = name_hash(&name);
        Self { name, hash, kind }
    }

    /// Create a built-in numeric type descriptor.
    pub fn basic(kind: BasicKind) -> Arc<Self> {
        Arc::new(Self::new(kind.name(), TypeKind::Basic(kind)))
    }

    /// Create a dynamic container descriptor.
    pub fn template(
        name: impl Into<String>,
        value_type: Arc<TypeDescriptor>,
        value_is_ptr: bool,
    ) -> Arc<Self> {
        Arc::new(Self::new(
            name,
            TypeKind::Template(TemplateDescriptor {
                value_type,
                value_is_ptr,
            }),
        ))
    }

    /// Instance footprint in bytes. Dynamic containers occupy a handle slot.
    pub fn size(&self) -> usize {
        match &self.kind {
            TypeKind::Basic(k) => k.size(),
            TypeKind::Enum(_) => 4,
            TypeKind::Class(c) => c.size,
            TypeKind::Template(_) => HANDLE_SIZE,
        }
    }

    /// Alignment requirement within an instance image.
    pub fn alignment(&self) -> usize {
        match &self.kind {
            TypeKind::Basic(k) => k.alignment(),
            TypeKind::Enum(_) => 4,
            TypeKind::Class(c) => c.alignment,
            TypeKind::Template(_) => HANDLE_SIZE,
        }
    }

    /// Get the class descriptor if this is a class.
    pub fn as_class(&self) -> Option<&ClassDescriptor> {
        match &self.kind {
            TypeKind::Class(c) => Some(c),
            _ => None,
        }
    }

    /// Get the enum descriptor if this is an enum.
    pub fn as_enum(&self) -> Option<&EnumDescriptor> {
        match &self.kind {
            TypeKind::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// Get the template descriptor if this is a dynamic container.
    pub fn as_template(&self) -> Option<&TemplateDescriptor> {
        match &self.kind {
            TypeKind::Template(t) => Some(t),
            _ => None,
        }
    }

    /// Check if this is a built-in numeric type.
    pub fn is_basic(&self) -> bool {
        matches!(self.kind, TypeKind::Basic(_))
    }

    /// Find a field by name hash, searching this class and then its bases
    /// depth-first. First match wins.
    pub fn find_field(&self, hash: u32) -> Option<&FieldDescriptor> {
        let class = self.as_class()?;
        if let Some(field) = find_named(&class.fields, hash) {
            return Some(field);
        }
        for base in &class.bases {
            if let Some(field) = base.find_field(hash) {
                return Some(field);
            }
        }
        None
    }
}

impl Named for Arc<TypeDescriptor> {
    fn name_hash(&self) -> u32 {
        self.hash
    }
}

/// Field descriptor for class members.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Field name.
    pub name: String,
    /// FNV-1a hash of the name.
    pub hash: u32,
    /// Value type.
    pub ty: Arc<TypeDescriptor>,
    /// Value, pointer, or reference.
    pub qualifier: Qualifier,
    /// Byte offset within an instance of the owning class or a derived class.
    pub offset: usize,
    /// Element count when the field is a fixed inline array.
    pub array_count: Option<usize>,
    /// Transient fields never appear in serialized output and are never
    /// written during load.
    pub transient: bool,
}

impl FieldDescriptor {
    /// Footprint of the field's storage within the instance image.
    pub fn value_size(&self) -> usize {
        let elem = match self.qualifier {
            Qualifier::Pointer => POINTER_SIZE,
            Qualifier::Value | Qualifier::Reference => self.ty.size(),
        };
        match self.array_count {
            Some(count) => elem * count,
            None => elem,
        }
    }

    /// Alignment of the field's storage.
    pub fn value_alignment(&self) -> usize {
        match self.qualifier {
            Qualifier::Pointer => POINTER_SIZE,
            Qualifier::Value | Qualifier::Reference => self.ty.alignment(),
        }
    }
}

impl Named for FieldDescriptor {
    fn name_hash(&self) -> u32 {
        self.hash
    }
}

/// Enumeration type descriptor.
#[derive(Debug)]
pub struct EnumDescriptor {
    /// Constants, sorted ascending by name hash.
    pub constants: Vec<EnumConstant>,
}

impl EnumDescriptor {
    /// Get a constant by name hash (binary search).
    pub fn constant_by_hash(&self, hash: u32) -> Option<&EnumConstant> {
        find_named(&self.constants, hash)
    }

    /// Get the first constant with a matching value (linear scan).
    pub fn constant_by_value(&self, value: i32) -> Option<&EnumConstant> {
        self.constants.iter().find(|c| c.value == value)
    }
}

/// A single named enum constant.
#[derive(Debug, Clone)]
pub struct EnumConstant {
    /// Constant name.
    pub name: String,
    /// FNV-1a hash of the name.
    pub hash: u32,
    /// Constant value.
    pub value: i32,
}

impl EnumConstant {
    /// Create an enum constant.
    pub fn new(name: impl Into<String>, value: i32) -> Self {
        let name = name.into();
        let hash = name_hash(&name);
        Self { name, hash, value }
    }
}

impl Named for EnumConstant {
    fn name_hash(&self) -> u32 {
        self.hash
    }
}

/// Hook presence bits on [`ClassDescriptor::flag_attributes`].
///
/// Checked before any attribute lookup so classes without hooks pay nothing.
pub const FLAG_CUSTOM_LOAD: u32 = 0x01;
pub const FLAG_CUSTOM_SAVE: u32 = 0x02;
pub const FLAG_PRE_SAVE: u32 = 0x04;
pub const FLAG_POST_LOAD: u32 = 0x08;

/// Attribute names the generic walker consumes.
pub const ATTR_CUSTOM_LOAD: &str = "load_json";
pub const ATTR_CUSTOM_SAVE: &str = "save_json";
pub const ATTR_PRE_SAVE: &str = "pre_save";
pub const ATTR_POST_LOAD: &str = "post_load";

/// Class type descriptor.
#[derive(Debug)]
pub struct ClassDescriptor {
    /// Fields, sorted ascending by name hash. This array order is the
    /// declaration order used by the save path.
    pub fields: Vec<FieldDescriptor>,
    /// Base types; field offsets of a base remain valid against a derived
    /// instance.
    pub bases: Vec<Arc<TypeDescriptor>>,
    /// Named attributes, sorted ascending by name hash.
    pub attributes: Vec<AttributeDescriptor>,
    /// Bitmask of FLAG_* hook bits present in `attributes`.
    pub flag_attributes: u32,
    /// Instance footprint in bytes, including embedded bases.
    pub size: usize,
    /// Alignment requirement.
    pub alignment: usize,
}

impl ClassDescriptor {
    /// Probe for a named attribute.
    pub fn attribute(&self, hash: u32) -> Option<&AttributeDescriptor> {
        find_named(&self.attributes, hash)
    }
}

/// A named attribute carrying a callable hook.
#[derive(Debug)]
pub struct AttributeDescriptor {
    /// Attribute name.
    pub name: String,
    /// FNV-1a hash of the name.
    pub hash: u32,
    /// The attached callable.
    pub hook: HookFn,
}

impl Named for AttributeDescriptor {
    fn name_hash(&self) -> u32 {
        self.hash
    }
}

/// Custom load hook: consumes exactly one value-shaped token and populates
/// the object region itself.
pub type CustomLoadFn = fn(&JsonToken<'_>, &mut Instance, Addr);

/// Custom save hook: produces the single token serialized in place of the
/// object's generic field iteration.
pub type CustomSaveFn = fn(&Instance, Addr) -> HookValue;

/// Pre-save / post-load hook over a fully addressed object region.
pub type ObjectHookFn = fn(&mut Instance, Addr);

/// The callable attached to an attribute.
#[derive(Debug, Clone, Copy)]
pub enum HookFn {
    CustomLoad(CustomLoadFn),
    CustomSave(CustomSaveFn),
    Object(ObjectHookFn),
}

/// Token value returned by a custom save hook.
#[derive(Debug, Clone, PartialEq)]
pub enum HookValue {
    String(String),
    Integer(i64),
    Decimal(f64),
}

/// Dynamic container type descriptor.
#[derive(Debug)]
pub struct TemplateDescriptor {
    /// Element type.
    pub value_type: Arc<TypeDescriptor>,
    /// Whether elements are pointer-qualified identities.
    pub value_is_ptr: bool,
}

impl TemplateDescriptor {
    /// Storage footprint of one element in the container pool.
    pub fn element_size(&self) -> usize {
        if self.value_is_ptr {
            POINTER_SIZE
        } else {
            self.value_type.size()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_sizes() {
        assert_eq!(BasicKind::Bool.size(), 1);
        assert_eq!(BasicKind::U16.size(), 2);
        assert_eq!(BasicKind::Char.size(), 4);
        assert_eq!(BasicKind::F64.size(), 8);
    }

    #[test]
    fn test_basic_names_cover_dispatch_set() {
        for kind in BASIC_KINDS {
            assert!(!kind.name().is_empty());
            assert_eq!(TypeDescriptor::basic(kind).size(), kind.size());
        }
    }

    #[test]
    fn test_enum_lookup() {
        let mut constants = vec![
            EnumConstant::new("Red", 0),
            EnumConstant::new("Green", 1),
            EnumConstant::new("Blue", 2),
        ];
        constants.sort_by_key(|c| c.hash);
        let desc = EnumDescriptor { constants };

        assert_eq!(
            desc.constant_by_hash(name_hash("Green")).map(|c| c.value),
            Some(1)
        );
        assert_eq!(
            desc.constant_by_value(2).map(|c| c.name.as_str()),
            Some("Blue")
        );
        assert!(desc.constant_by_value(9).is_none());
        assert!(desc.constant_by_hash(name_hash("Purple")).is_none());
    }

    #[test]
    fn test_template_element_size() {
        let tmpl = TemplateDescriptor {
            value_type: TypeDescriptor::basic(BasicKind::F64),
            value_is_ptr: false,
        };
        assert_eq!(tmpl.element_size(), 8);

        let ptr_tmpl = TemplateDescriptor {
            value_type: TypeDescriptor::basic(BasicKind::F64),
            value_is_ptr: true,
        };
        assert_eq!(ptr_tmpl.element_size(), POINTER_SIZE);
    }
}
