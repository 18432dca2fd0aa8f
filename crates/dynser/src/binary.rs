// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynser contributors

//! Compact binary encoding of object graphs.
//!
//! Schema-driven: field names never reach the wire, both sides walk the
//! same descriptors in the same order (a class's own fields in array order,
//! then its bases). Primitives are little-endian at their natural width,
//! enums are i32, containers are a u32 count followed by elements, pointer
//! fields are the u32 identity (0 when the policy refuses the pointer — a
//! positional record cannot omit fields). Transient fields are skipped in
//! both directions. Pre-save and post-load hooks run as in the JSON path;
//! the JSON-specific custom load/save hooks do not apply here.

use crate::buffer::WriteBuffer;
use crate::descriptor::{
    FieldDescriptor, HookFn, Qualifier, TypeDescriptor, TypeKind, ATTR_POST_LOAD, ATTR_PRE_SAVE,
    FLAG_POST_LOAD, FLAG_PRE_SAVE,
};
use crate::hash::name_hash;
use crate::instance::{Addr, Instance};
use crate::iter::{ReadIter, WriteIter};
use crate::ptr::PointerPolicy;
use std::fmt;
use std::sync::Arc;

/// Errors for binary decoding.
#[derive(Debug)]
pub enum BinaryError {
    Truncated { need: usize, have: usize },
}

impl fmt::Display for BinaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { need, have } => {
                write!(f, "input truncated: need {} bytes, have {}", need, have)
            }
        }
    }
}

impl std::error::Error for BinaryError {}

/// Append an instance's binary form to the output buffer.
pub fn save_binary(out: &mut WriteBuffer, inst: &mut Instance, policy: Option<&dyn PointerPolicy>) {
    let ty = inst.ty().clone();
    encode_value(out, inst, Addr::root(), &ty, policy);
}

/// Decode one binary-encoded object into an instance of its static type.
///
/// On error the instance may be partially populated.
pub fn load_binary(input: &[u8], inst: &mut Instance) -> Result<(), BinaryError> {
    let ty = inst.ty().clone();
    let mut reader = Reader::new(input);
    decode_value(&mut reader, inst, Addr::root(), &ty)
}

fn encode_value(
    out: &mut WriteBuffer,
    inst: &mut Instance,
    at: Addr,
    ty: &Arc<TypeDescriptor>,
    policy: Option<&dyn PointerPolicy>,
) {
    match &ty.kind {
        TypeKind::Basic(_) => out.write_bytes(inst.read(at, ty.size())),
        TypeKind::Enum(_) => out.write_bytes(inst.read(at, 4)),
        TypeKind::Class(class) => {
            if class.flag_attributes & FLAG_PRE_SAVE != 0 {
                if let Some(attr) = class.attribute(name_hash(ATTR_PRE_SAVE)) {
                    if let HookFn::Object(hook) = attr.hook {
                        hook(inst, at);
                    }
                }
            }
            encode_class_fields(out, inst, at, ty, policy);
        }
        TypeKind::Template(template) => {
            let mut reader = ReadIter::for_template(inst, at, template);
            out.write_bytes(&(reader.count() as u32).to_le_bytes());
            while reader.remaining() > 0 {
                let elem_at = reader.value_addr();
                if reader.value_is_ptr() {
                    encode_pointer(out, inst, elem_at, None, reader.value_type(), policy);
                } else {
                    let elem_ty = reader.value_type().clone();
                    encode_value(out, inst, elem_at, &elem_ty, policy);
                }
                reader.advance();
            }
        }
    }
}

fn encode_class_fields(
    out: &mut WriteBuffer,
    inst: &mut Instance,
    at: Addr,
    ty: &Arc<TypeDescriptor>,
    policy: Option<&dyn PointerPolicy>,
) {
    let Some(class) = ty.as_class() else { return };
    for field in &class.fields {
        if field.transient {
            continue;
        }
        encode_field(out, inst, at.at(field.offset), field, policy);
    }
    for base in &class.bases {
        encode_class_fields(out, inst, at, base, policy);
    }
}

fn encode_field(
    out: &mut WriteBuffer,
    inst: &mut Instance,
    at: Addr,
    field: &FieldDescriptor,
    policy: Option<&dyn PointerPolicy>,
) {
    if let Some(count) = field.array_count {
        let mut reader = ReadIter::for_field(at, field);
        debug_assert_eq!(reader.count(), count);
        while reader.remaining() > 0 {
            let elem_at = reader.value_addr();
            if reader.value_is_ptr() {
                encode_pointer(out, inst, elem_at, Some(field), &field.ty, policy);
            } else {
                let elem_ty = field.ty.clone();
                encode_value(out, inst, elem_at, &elem_ty, policy);
            }
            reader.advance();
        }
        return;
    }
    if field.qualifier == Qualifier::Pointer {
        encode_pointer(out, inst, at, Some(field), &field.ty, policy);
        return;
    }
    let ty = field.ty.clone();
    encode_value(out, inst, at, &ty, policy);
}

fn encode_pointer(
    out: &mut WriteBuffer,
    inst: &Instance,
    at: Addr,
    field: Option<&FieldDescriptor>,
    ty: &Arc<TypeDescriptor>,
    policy: Option<&dyn PointerPolicy>,
) {
    let identity = inst.get_at::<u32>(at);
    let identity = match policy {
        Some(p) if p.can_save(identity, field, ty) => p.save(identity),
        _ => 0,
    };
    out.write_bytes(&identity.to_le_bytes());
}

/// Bounds-checked read cursor over the input bytes.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], BinaryError> {
        if self.pos + len > self.buf.len() {
            return Err(BinaryError::Truncated {
                need: len,
                have: self.buf.len() - self.pos,
            });
        }
        let span = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(span)
    }

    fn read_u32(&mut self) -> Result<u32, BinaryError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

fn decode_value(
    reader: &mut Reader<'_>,
    inst: &mut Instance,
    at: Addr,
    ty: &Arc<TypeDescriptor>,
) -> Result<(), BinaryError> {
    match &ty.kind {
        TypeKind::Basic(_) => {
            let bytes = reader.read_bytes(ty.size())?;
            inst.write(at, bytes);
            Ok(())
        }
        TypeKind::Enum(_) => {
            let bytes = reader.read_bytes(4)?;
            inst.write(at, bytes);
            Ok(())
        }
        TypeKind::Class(class) => {
            decode_class_fields(reader, inst, at, ty)?;
            if class.flag_attributes & FLAG_POST_LOAD != 0 {
                if let Some(attr) = class.attribute(name_hash(ATTR_POST_LOAD)) {
                    if let HookFn::Object(hook) = attr.hook {
                        hook(inst, at);
                    }
                }
            }
            Ok(())
        }
        TypeKind::Template(template) => {
            let count = reader.read_u32()? as usize;
            let mut writer = WriteIter::for_template(inst, at, template, count);
            while let Some(elem_at) = writer.add_empty() {
                if writer.value_is_ptr() {
                    let identity = reader.read_u32()?;
                    inst.set_at::<u32>(elem_at, identity);
                } else {
                    let elem_ty = writer.value_type().clone();
                    decode_value(reader, inst, elem_at, &elem_ty)?;
                }
            }
            Ok(())
        }
    }
}

fn decode_class_fields(
    reader: &mut Reader<'_>,
    inst: &mut Instance,
    at: Addr,
    ty: &Arc<TypeDescriptor>,
) -> Result<(), BinaryError> {
    let Some(class) = ty.as_class() else {
        return Ok(());
    };
    for field in &class.fields {
        if field.transient {
            continue;
        }
        decode_field(reader, inst, at.at(field.offset), field)?;
    }
    for base in &class.bases {
        decode_class_fields(reader, inst, at, base)?;
    }
    Ok(())
}

fn decode_field(
    reader: &mut Reader<'_>,
    inst: &mut Instance,
    at: Addr,
    field: &FieldDescriptor,
) -> Result<(), BinaryError> {
    if field.array_count.is_some() {
        let mut writer = WriteIter::for_field(at, field);
        while let Some(elem_at) = writer.add_empty() {
            if writer.value_is_ptr() {
                let identity = reader.read_u32()?;
                inst.set_at::<u32>(elem_at, identity);
            } else {
                let elem_ty = field.ty.clone();
                decode_value(reader, inst, elem_at, &elem_ty)?;
            }
        }
        return Ok(());
    }
    if field.qualifier == Qualifier::Pointer {
        let identity = reader.read_u32()?;
        inst.set_at::<u32>(at, identity);
        return Ok(());
    }
    let ty = field.ty.clone();
    decode_value(reader, inst, at, &ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{BasicKind, ClassBuilder};
    use crate::ptr::SaveAllPointers;

    #[test]
    fn test_encode_decode_primitives() {
        let ty = ClassBuilder::new("Primitives")
            .field("b", &TypeDescriptor::basic(BasicKind::Bool))
            .field("u8", &TypeDescriptor::basic(BasicKind::U8))
            .field("u32", &TypeDescriptor::basic(BasicKind::U32))
            .field("f64", &TypeDescriptor::basic(BasicKind::F64))
            .build();

        let mut inst = Instance::new(&ty);
        inst.set_field("b", true).expect("set b");
        inst.set_field("u8", 42u8).expect("set u8");
        inst.set_field("u32", 12345u32).expect("set u32");
        inst.set_field("f64", std::f64::consts::E).expect("set f64");

        let mut out = WriteBuffer::new();
        save_binary(&mut out, &mut inst, None);

        let mut decoded = Instance::new(&ty);
        load_binary(out.as_bytes(), &mut decoded).expect("decode");

        assert!(decoded.get_field::<bool>("b").expect("b"));
        assert_eq!(decoded.get_field::<u8>("u8").expect("u8"), 42);
        assert_eq!(decoded.get_field::<u32>("u32").expect("u32"), 12345);
        assert_eq!(
            decoded.get_field::<f64>("f64").expect("f64"),
            std::f64::consts::E
        );
    }

    #[test]
    fn test_encode_decode_container() {
        let elem = TypeDescriptor::basic(BasicKind::I32);
        let list = TypeDescriptor::template("list<i32>", elem, false);
        let ty = ClassBuilder::new("Packet")
            .field("id", &TypeDescriptor::basic(BasicKind::U32))
            .field("data", &list)
            .build();

        let mut inst = Instance::new(&ty);
        inst.set_field("id", 100u32).expect("set id");
        let handle = inst.make_container("data", 3).expect("make data");
        for i in 0..3 {
            inst.set_at(inst.element_addr(handle, i), (i as i32) * 10);
        }

        let mut out = WriteBuffer::new();
        save_binary(&mut out, &mut inst, None);

        let mut decoded = Instance::new(&ty);
        load_binary(out.as_bytes(), &mut decoded).expect("decode");

        assert_eq!(decoded.get_field::<u32>("id").expect("id"), 100);
        let at = decoded.addr_of("data").expect("data addr");
        let got = decoded.get_at::<u32>(at);
        assert_eq!(decoded.pool_count(got), 3);
        assert_eq!(decoded.get_at::<i32>(decoded.element_addr(got, 2)), 20);
    }

    #[test]
    fn test_truncated_input_is_error() {
        let ty = ClassBuilder::new("Wide")
            .field("v", &TypeDescriptor::basic(BasicKind::U64))
            .build();
        let mut inst = Instance::new(&ty);
        let err = load_binary(&[1, 2, 3], &mut inst).expect_err("decode should fail");
        assert!(matches!(err, BinaryError::Truncated { .. }));
    }

    #[test]
    fn test_refused_pointer_encodes_zero() {
        let target = ClassBuilder::new("Target").build();
        let ty = ClassBuilder::new("Owner").pointer_field("link", &target).build();

        let mut inst = Instance::new(&ty);
        inst.set_at(inst.addr_of("link").expect("addr"), 55u32);

        // No policy: every pointer refused, identity 0 on the wire
        let mut out = WriteBuffer::new();
        save_binary(&mut out, &mut inst, None);
        assert_eq!(out.as_bytes(), &0u32.to_le_bytes());

        let mut allowed = WriteBuffer::new();
        save_binary(&mut allowed, &mut inst, Some(&SaveAllPointers));
        assert_eq!(allowed.as_bytes(), &55u32.to_le_bytes());
    }
}
