// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynser contributors

//! Byte-image object instances.
//!
//! An [`Instance`] is the caller-owned destination/source region one load or
//! save call operates on: a fixed-layout byte image laid out by the class
//! descriptor, plus side pools holding the elements of dynamic containers.
//! A container field occupies a 4-byte slot storing a pool handle (0 =
//! empty); a pointer-qualified field occupies a 4-byte slot storing the
//! stable identity assigned by the external object database. All access goes
//! through [`Addr`] and bounds-checked slices; there is no pointer
//! arithmetic anywhere in the walkers.

use crate::descriptor::{BasicKind, TypeDescriptor, TypeKind};
use crate::hash::name_hash;
use std::fmt;
use std::sync::Arc;

/// Footprint of a pointer-qualified slot (a u32 identity).
pub const POINTER_SIZE: usize = 4;
/// Footprint of a dynamic-container slot (a u32 pool handle).
pub const HANDLE_SIZE: usize = 4;

/// Location of a value: a pool selector (0 = the root image) and a byte
/// offset within that region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Addr {
    pub pool: u32,
    pub offset: usize,
}

impl Addr {
    /// The root of the instance image.
    pub fn root() -> Self {
        Self { pool: 0, offset: 0 }
    }

    /// Address `rel` bytes further into the same region.
    pub fn at(self, rel: usize) -> Self {
        Self {
            pool: self.pool,
            offset: self.offset + rel,
        }
    }
}

/// Errors for name-based instance access.
#[derive(Debug)]
pub enum InstanceError {
    FieldNotFound(String),
    TypeMismatch { expected: String, found: String },
    NotAClass(String),
    NotAContainer(String),
}

impl fmt::Display for InstanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldNotFound(name) => write!(f, "field not found: {}", name),
            Self::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {}, found {}", expected, found)
            }
            Self::NotAClass(name) => write!(f, "type is not a class: {}", name),
            Self::NotAContainer(name) => write!(f, "field is not a container: {}", name),
        }
    }
}

impl std::error::Error for InstanceError {}

/// Element storage for one dynamic container.
#[derive(Debug, Clone)]
struct Pool {
    elem_size: usize,
    count: usize,
    bytes: Vec<u8>,
}

/// A byte-image object described by a type descriptor.
#[derive(Debug, Clone)]
pub struct Instance {
    ty: Arc<TypeDescriptor>,
    bytes: Vec<u8>,
    pools: Vec<Pool>,
}

impl Instance {
    /// Create a zeroed instance of the given type.
    pub fn new(ty: &Arc<TypeDescriptor>) -> Self {
        Self {
            ty: ty.clone(),
            bytes: vec![0; ty.size()],
            pools: Vec::new(),
        }
    }

    /// The instance's static type.
    pub fn ty(&self) -> &Arc<TypeDescriptor> {
        &self.ty
    }

    /// Address of the root object.
    pub fn root(&self) -> Addr {
        Addr::root()
    }

    fn region(&self, pool: u32) -> &[u8] {
        if pool == 0 {
            &self.bytes
        } else {
            &self.pools[pool as usize - 1].bytes
        }
    }

    fn region_mut(&mut self, pool: u32) -> &mut [u8] {
        if pool == 0 {
            &mut self.bytes
        } else {
            &mut self.pools[pool as usize - 1].bytes
        }
    }

    /// Borrow `len` bytes at `at`. Panics on out-of-range access; a bad
    /// offset means corrupt metadata, which is an integrity violation.
    pub fn read(&self, at: Addr, len: usize) -> &[u8] {
        &self.region(at.pool)[at.offset..at.offset + len]
    }

    /// Mutably borrow `len` bytes at `at`.
    pub fn read_mut(&mut self, at: Addr, len: usize) -> &mut [u8] {
        &mut self.region_mut(at.pool)[at.offset..at.offset + len]
    }

    /// Copy `src` into the image at `at`.
    pub fn write(&mut self, at: Addr, src: &[u8]) {
        self.read_mut(at, src.len()).copy_from_slice(src);
    }

    /// Read a typed scalar at an address.
    pub fn get_at<T: Scalar>(&self, at: Addr) -> T {
        T::read_le(self.read(at, T::SIZE))
    }

    /// Write a typed scalar at an address.
    pub fn set_at<T: Scalar>(&mut self, at: Addr, value: T) {
        value.write_le(self.read_mut(at, T::SIZE));
    }

    /// Allocate a zeroed container pool; returns its handle (index + 1 so
    /// that 0 keeps meaning "empty").
    pub fn alloc_pool(&mut self, elem_size: usize, count: usize) -> u32 {
        self.pools.push(Pool {
            elem_size,
            count,
            bytes: vec![0; elem_size * count],
        });
        self.pools.len() as u32
    }

    /// Element count of a pool; handle 0 is the empty container.
    pub fn pool_count(&self, handle: u32) -> usize {
        if handle == 0 {
            0
        } else {
            self.pools[handle as usize - 1].count
        }
    }

    /// Element stride of a pool.
    pub fn pool_elem_size(&self, handle: u32) -> usize {
        if handle == 0 {
            0
        } else {
            self.pools[handle as usize - 1].elem_size
        }
    }

    /// Address of one pool element.
    pub fn element_addr(&self, handle: u32, index: usize) -> Addr {
        Addr {
            pool: handle,
            offset: self.pool_elem_size(handle) * index,
        }
    }

    /// Resolve a root-level field (searching base classes) to its address.
    pub fn addr_of(&self, field_name: &str) -> Result<Addr, InstanceError> {
        let field = self
            .ty
            .find_field(name_hash(field_name))
            .ok_or_else(|| InstanceError::FieldNotFound(field_name.to_string()))?;
        Ok(Addr::root().at(field.offset))
    }

    /// Read a root-level scalar field by name.
    pub fn get_field<T: Scalar>(&self, field_name: &str) -> Result<T, InstanceError> {
        let at = self.checked_field::<T>(field_name)?;
        Ok(self.get_at(at))
    }

    /// Write a root-level scalar field by name.
    pub fn set_field<T: Scalar>(&mut self, field_name: &str, value: T) -> Result<(), InstanceError> {
        let at = self.checked_field::<T>(field_name)?;
        self.set_at(at, value);
        Ok(())
    }

    fn checked_field<T: Scalar>(&self, field_name: &str) -> Result<Addr, InstanceError> {
        if self.ty.as_class().is_none() {
            return Err(InstanceError::NotAClass(self.ty.name.clone()));
        }
        let field = self
            .ty
            .find_field(name_hash(field_name))
            .ok_or_else(|| InstanceError::FieldNotFound(field_name.to_string()))?;
        match &field.ty.kind {
            TypeKind::Basic(kind) if *kind == T::KIND => Ok(Addr::root().at(field.offset)),
            _ => Err(InstanceError::TypeMismatch {
                expected: T::KIND.name().to_string(),
                found: field.ty.name.clone(),
            }),
        }
    }

    /// Allocate and attach a container pool to a root-level container field,
    /// returning its handle. The field must be template-typed.
    pub fn make_container(
        &mut self,
        field_name: &str,
        count: usize,
    ) -> Result<u32, InstanceError> {
        let field = self
            .ty
            .find_field(name_hash(field_name))
            .ok_or_else(|| InstanceError::FieldNotFound(field_name.to_string()))?;
        let slot = Addr::root().at(field.offset);
        let elem_size = field
            .ty
            .as_template()
            .ok_or_else(|| InstanceError::NotAContainer(field_name.to_string()))?
            .element_size();
        let handle = self.alloc_pool(elem_size, count);
        self.set_at::<u32>(slot, handle);
        Ok(handle)
    }
}

/// Fixed-width values storable in an instance image, little-endian.
pub trait Scalar: Copy {
    const SIZE: usize;
    const KIND: BasicKind;
    fn write_le(self, dst: &mut [u8]);
    fn read_le(src: &[u8]) -> Self;
}

/// Generate Scalar impls for primitive types (eliminates code duplication)
macro_rules! impl_scalar {
    ($ty:ty, $kind:ident, $size:expr) => {
        impl Scalar for $ty {
            const SIZE: usize = $size;
            const KIND: BasicKind = BasicKind::$kind;

            fn write_le(self, dst: &mut [u8]) {
                dst[..$size].copy_from_slice(&self.to_le_bytes());
            }

            fn read_le(src: &[u8]) -> Self {
                let mut bytes = [0u8; $size];
                bytes.copy_from_slice(&src[..$size]);
                <$ty>::from_le_bytes(bytes)
            }
        }
    };
}

impl_scalar!(u8, U8, 1);
impl_scalar!(u16, U16, 2);
impl_scalar!(u32, U32, 4);
impl_scalar!(u64, U64, 8);
impl_scalar!(i8, I8, 1);
impl_scalar!(i16, I16, 2);
impl_scalar!(i32, I32, 4);
impl_scalar!(i64, I64, 8);
impl_scalar!(f32, F32, 4);
impl_scalar!(f64, F64, 8);

impl Scalar for bool {
    const SIZE: usize = 1;
    const KIND: BasicKind = BasicKind::Bool;

    fn write_le(self, dst: &mut [u8]) {
        dst[0] = u8::from(self);
    }

    fn read_le(src: &[u8]) -> Self {
        src[0] != 0
    }
}

impl Scalar for char {
    const SIZE: usize = 4;
    const KIND: BasicKind = BasicKind::Char;

    fn write_le(self, dst: &mut [u8]) {
        dst[..4].copy_from_slice(&(self as u32).to_le_bytes());
    }

    fn read_le(src: &[u8]) -> Self {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&src[..4]);
        char::from_u32(u32::from_le_bytes(bytes)).unwrap_or('\0')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ClassBuilder;

    fn point() -> Arc<TypeDescriptor> {
        ClassBuilder::new("Point")
            .field("x", &TypeDescriptor::basic(BasicKind::I32))
            .field("y", &TypeDescriptor::basic(BasicKind::F64))
            .field("tag", &TypeDescriptor::basic(BasicKind::U8))
            .build()
    }

    #[test]
    fn test_zeroed_on_create() {
        let ty = point();
        let inst = Instance::new(&ty);
        assert_eq!(inst.get_field::<i32>("x").expect("get x"), 0);
        assert_eq!(inst.get_field::<f64>("y").expect("get y"), 0.0);
    }

    #[test]
    fn test_scalar_field_roundtrip() {
        let ty = point();
        let mut inst = Instance::new(&ty);
        inst.set_field("x", -42i32).expect("set x");
        inst.set_field("y", 2.5f64).expect("set y");
        inst.set_field("tag", 9u8).expect("set tag");

        assert_eq!(inst.get_field::<i32>("x").expect("get x"), -42);
        assert_eq!(inst.get_field::<f64>("y").expect("get y"), 2.5);
        assert_eq!(inst.get_field::<u8>("tag").expect("get tag"), 9);
    }

    #[test]
    fn test_field_type_checked() {
        let ty = point();
        let mut inst = Instance::new(&ty);
        assert!(matches!(
            inst.set_field("x", 1.0f32),
            Err(InstanceError::TypeMismatch { .. })
        ));
        assert!(matches!(
            inst.set_field("missing", 1i32),
            Err(InstanceError::FieldNotFound(_))
        ));
    }

    #[test]
    fn test_pool_allocation() {
        let ty = point();
        let mut inst = Instance::new(&ty);
        let handle = inst.alloc_pool(4, 3);
        assert_eq!(inst.pool_count(handle), 3);
        assert_eq!(inst.pool_count(0), 0);

        let at = inst.element_addr(handle, 2);
        inst.set_at(at, 7u32);
        assert_eq!(inst.get_at::<u32>(at), 7);
        assert_eq!(inst.get_at::<u32>(inst.element_addr(handle, 0)), 0);
    }

    #[test]
    fn test_char_scalar() {
        let ty = ClassBuilder::new("Glyph")
            .field("c", &TypeDescriptor::basic(BasicKind::Char))
            .build();
        let mut inst = Instance::new(&ty);
        inst.set_field("c", 'é').expect("set c");
        assert_eq!(inst.get_field::<char>("c").expect("get c"), 'é');
    }
}
