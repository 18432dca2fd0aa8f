// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynser contributors

//! Metadata-guided JSON writer.
//!
//! Dispatch is driven by the type descriptor's kind, so the writer needs no
//! token-level branching. The indentation counter for pretty output lives
//! in the low byte of the flags word; scope open/close adjust it in place.

use crate::buffer::WriteBuffer;
use crate::descriptor::{
    ClassDescriptor, FieldDescriptor, HookFn, HookValue, Qualifier, TemplateDescriptor,
    TypeDescriptor, TypeKind, ATTR_CUSTOM_SAVE, ATTR_PRE_SAVE, FLAG_CUSTOM_SAVE, FLAG_PRE_SAVE,
};
use crate::dispatch::{self, write_decimal, write_hex, write_integer, write_unsigned};
use crate::hash::name_hash;
use crate::instance::{Addr, Instance};
use crate::iter::ReadIter;
use crate::json::{EMIT_HEX_POINTERS, FORMAT_OUTPUT, INDENT_MASK, SORT_FIELDS_BY_OFFSET};
use crate::ptr::PointerPolicy;
use std::sync::Arc;

/// Written when an enum field holds a value no constant matches.
pub const ENUM_SENTINEL: &str = "EnumValueNotFound";

/// Append an instance's JSON form to the output buffer.
///
/// The instance is borrowed exclusively so pre-save hooks may update
/// derived fields before their class is emitted. There are no recoverable
/// failure modes: malformed metadata is an integrity panic, and a pointer
/// the policy refuses is a normal omission.
pub fn save_json(
    out: &mut WriteBuffer,
    inst: &mut Instance,
    policy: Option<&dyn PointerPolicy>,
    flags: u32,
) {
    dispatch::initialize();
    let ty = inst.ty().clone();
    let mut flags = flags;
    save_object(out, inst, Addr::root(), None, &ty, policy, &mut flags);
}

/// Append a single field's JSON form to the output buffer.
pub fn save_json_field(
    out: &mut WriteBuffer,
    inst: &mut Instance,
    at: Addr,
    field: &FieldDescriptor,
    policy: Option<&dyn PointerPolicy>,
    flags: u32,
) {
    dispatch::initialize();
    let mut flags = flags;
    save_field_object(out, inst, at, field, policy, &mut flags);
}

fn save_object(
    out: &mut WriteBuffer,
    inst: &mut Instance,
    at: Addr,
    field: Option<&FieldDescriptor>,
    ty: &Arc<TypeDescriptor>,
    policy: Option<&dyn PointerPolicy>,
    flags: &mut u32,
) {
    match &ty.kind {
        TypeKind::Basic(_) => save_basic(out, inst, at, ty, *flags),
        TypeKind::Enum(_) => save_enum(out, inst, at, ty),
        TypeKind::Class(class) => save_class(out, inst, at, ty, class, policy, flags),
        TypeKind::Template(template) => {
            save_template(out, inst, at, field, template, policy, flags);
        }
    }
}

fn save_basic(out: &mut WriteBuffer, inst: &Instance, at: Addr, ty: &TypeDescriptor, flags: u32) {
    let entry = dispatch::dispatch(ty.hash)
        .unwrap_or_else(|| panic!("no dispatch entry for basic type {}", ty.name));
    (entry.save_number)(out, inst.read(at, ty.size()), flags);
}

fn save_enum(out: &mut WriteBuffer, inst: &Instance, at: Addr, ty: &TypeDescriptor) {
    let Some(enum_desc) = ty.as_enum() else { return };
    let value = inst.get_at::<i32>(at);
    let name = enum_desc
        .constant_by_value(value)
        .map_or(ENUM_SENTINEL, |c| c.name.as_str());
    save_quoted(out, name.as_bytes());
}

fn save_quoted(out: &mut WriteBuffer, bytes: &[u8]) {
    out.write_byte(b'"');
    out.write_bytes(bytes);
    out.write_byte(b'"');
}

fn save_ptr(
    out: &mut WriteBuffer,
    inst: &Instance,
    at: Addr,
    policy: Option<&dyn PointerPolicy>,
    flags: u32,
) {
    let identity = inst.get_at::<u32>(at);
    let identity = policy.map_or(identity, |p| p.save(identity));
    if flags & EMIT_HEX_POINTERS != 0 {
        out.write_str("0x");
        write_hex(out, u64::from(identity));
    } else {
        write_unsigned(out, u64::from(identity));
    }
}

fn save_field_object(
    out: &mut WriteBuffer,
    inst: &mut Instance,
    at: Addr,
    field: &FieldDescriptor,
    policy: Option<&dyn PointerPolicy>,
    flags: &mut u32,
) {
    if field.array_count.is_some() {
        save_field_array(out, inst, at, field, policy, flags);
    } else if field.qualifier == Qualifier::Pointer {
        save_ptr(out, inst, at, policy, *flags);
    } else {
        let ty = field.ty.clone();
        save_object(out, inst, at, Some(field), &ty, policy, flags);
    }
}

fn save_field_array(
    out: &mut WriteBuffer,
    inst: &mut Instance,
    at: Addr,
    field: &FieldDescriptor,
    policy: Option<&dyn PointerPolicy>,
    flags: &mut u32,
) {
    let reader = ReadIter::for_field(at, field);
    if reader.count() == 0 {
        out.write_str("[]");
        return;
    }
    save_container(out, inst, reader, Some(field), policy, flags);
}

fn save_template(
    out: &mut WriteBuffer,
    inst: &mut Instance,
    at: Addr,
    field: Option<&FieldDescriptor>,
    template: &TemplateDescriptor,
    policy: Option<&dyn PointerPolicy>,
    flags: &mut u32,
) {
    let reader = ReadIter::for_template(inst, at, template);
    if reader.count() == 0 {
        out.write_str("[]");
        return;
    }
    save_container(out, inst, reader, field, policy, flags);
}

fn save_container(
    out: &mut WriteBuffer,
    inst: &mut Instance,
    mut reader: ReadIter,
    field: Option<&FieldDescriptor>,
    policy: Option<&dyn PointerPolicy>,
    flags: &mut u32,
) {
    out.write_byte(b'[');

    let mut written = false;
    while reader.remaining() > 0 {
        let at = reader.value_addr();
        if reader.value_is_ptr() {
            // An element the policy refuses is skipped, not placeholdered
            let identity = inst.get_at::<u32>(at);
            if let Some(p) =
                policy.filter(|p| p.can_save(identity, field, reader.value_type()))
            {
                if written {
                    out.write_byte(b',');
                }
                save_ptr(out, inst, at, Some(p), *flags);
                written = true;
            }
        } else {
            if written {
                out.write_byte(b',');
            }
            let ty = reader.value_type().clone();
            save_object(out, inst, at, field, &ty, policy, flags);
            written = true;
        }
        reader.advance();
    }

    out.write_byte(b']');
}

fn save_class(
    out: &mut WriteBuffer,
    inst: &mut Instance,
    at: Addr,
    ty: &Arc<TypeDescriptor>,
    class: &ClassDescriptor,
    policy: Option<&dyn PointerPolicy>,
    flags: &mut u32,
) {
    // A custom save hook replaces generic field iteration with one token
    if class.flag_attributes & FLAG_CUSTOM_SAVE != 0 {
        if let Some(attr) = class.attribute(name_hash(ATTR_CUSTOM_SAVE)) {
            if let HookFn::CustomSave(hook) = attr.hook {
                match hook(inst, at) {
                    HookValue::String(s) => save_quoted(out, s.as_bytes()),
                    HookValue::Integer(v) => write_integer(out, v),
                    HookValue::Decimal(v) => write_decimal(out, v, *flags),
                }
                return;
            }
        }
    }

    if class.flag_attributes & FLAG_PRE_SAVE != 0 {
        if let Some(attr) = class.attribute(name_hash(ATTR_PRE_SAVE)) {
            if let HookFn::Object(hook) = attr.hook {
                hook(inst, at);
            }
        }
    }

    let mut field_written = false;
    open_scope(out, flags);
    save_class_body(out, inst, at, ty, policy, flags, &mut field_written);
    close_scope(out, flags);
}

/// Emit a class's own fields, then recurse into its bases.
fn save_class_body(
    out: &mut WriteBuffer,
    inst: &mut Instance,
    at: Addr,
    ty: &Arc<TypeDescriptor>,
    policy: Option<&dyn PointerPolicy>,
    flags: &mut u32,
    field_written: &mut bool,
) {
    let Some(class) = ty.as_class() else { return };
    save_class_fields(out, inst, at, class, policy, flags, field_written);
    for base in &class.bases {
        save_class_body(out, inst, at, base, policy, flags, field_written);
    }
}

fn save_class_fields(
    out: &mut WriteBuffer,
    inst: &mut Instance,
    at: Addr,
    class: &ClassDescriptor,
    policy: Option<&dyn PointerPolicy>,
    flags: &mut u32,
    field_written: &mut bool,
) {
    if *flags & SORT_FIELDS_BY_OFFSET != 0 {
        // Emit in ascending-offset order via an O(n^2) selection scan; no
        // auxiliary allocation, and the descriptor array stays untouched
        let mut last_offset: Option<usize> = None;
        for _ in 0..class.fields.len() {
            let mut lowest: Option<&FieldDescriptor> = None;
            for field in &class.fields {
                if field.transient {
                    continue;
                }
                if last_offset.map_or(false, |prev| field.offset <= prev) {
                    continue;
                }
                if lowest.map_or(true, |best| field.offset < best.offset) {
                    lowest = Some(field);
                }
            }
            // Transient fields mean not every slot produces output
            if let Some(field) = lowest {
                save_class_field(out, inst, at, field, policy, flags, field_written);
                last_offset = Some(field.offset);
            }
        }
    } else {
        for field in &class.fields {
            if field.transient {
                continue;
            }
            save_class_field(out, inst, at, field, policy, flags, field_written);
        }
    }
}

fn save_class_field(
    out: &mut WriteBuffer,
    inst: &mut Instance,
    at: Addr,
    field: &FieldDescriptor,
    policy: Option<&dyn PointerPolicy>,
    flags: &mut u32,
    field_written: &mut bool,
) {
    if field.qualifier == Qualifier::Pointer && field.array_count.is_none() {
        // A refused pointer omits the whole field, name included
        let identity = inst.get_at::<u32>(at.at(field.offset));
        let allowed = policy.map_or(false, |p| p.can_save(identity, Some(field), &field.ty));
        if !allowed {
            return;
        }
    }

    if *field_written {
        out.write_byte(b',');
        newline(out, *flags);
    }

    save_quoted(out, field.name.as_bytes());
    out.write_byte(b':');
    save_field_object(out, inst, at.at(field.offset), field, policy, flags);
    *field_written = true;
}

fn newline(out: &mut WriteBuffer, flags: u32) {
    if flags & FORMAT_OUTPUT != 0 {
        out.write_byte(b'\n');
        for _ in 0..(flags & INDENT_MASK) {
            out.write_byte(b'\t');
        }
    }
}

fn open_scope(out: &mut WriteBuffer, flags: &mut u32) {
    if *flags & FORMAT_OUTPUT != 0 {
        newline(out, *flags);
        out.write_byte(b'{');
        let indent = (*flags & INDENT_MASK) + 1;
        *flags = (*flags & !INDENT_MASK) | (indent & INDENT_MASK);
        newline(out, *flags);
    } else {
        out.write_byte(b'{');
    }
}

fn close_scope(out: &mut WriteBuffer, flags: &mut u32) {
    if *flags & FORMAT_OUTPUT != 0 {
        let indent = (*flags & INDENT_MASK).wrapping_sub(1);
        *flags = (*flags & !INDENT_MASK) | (indent & INDENT_MASK);
        newline(out, *flags);
        out.write_byte(b'}');
        newline(out, *flags);
    } else {
        out.write_byte(b'}');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{BasicKind, ClassBuilder, EnumBuilder};

    #[test]
    fn test_save_simple_object() {
        let ty = ClassBuilder::new("Pair")
            .field("a", &TypeDescriptor::basic(BasicKind::I32))
            .field("b", &TypeDescriptor::basic(BasicKind::U8))
            .build();
        let mut inst = Instance::new(&ty);
        inst.set_field("a", -5i32).expect("set a");
        inst.set_field("b", 200u8).expect("set b");

        let mut out = WriteBuffer::new();
        save_json(&mut out, &mut inst, None, 0);

        let text = String::from_utf8(out.into_bytes()).expect("utf8");
        assert!(text.starts_with('{') && text.ends_with('}'));
        assert!(text.contains(r#""a":-5"#));
        assert!(text.contains(r#""b":200"#));
    }

    #[test]
    fn test_enum_sentinel_for_unknown_value() {
        let mode = EnumBuilder::new("Mode").constant("Off").constant("On").build();
        let ty = ClassBuilder::new("Device").field("mode", &mode).build();
        let mut inst = Instance::new(&ty);
        inst.set_at(inst.addr_of("mode").expect("addr"), 99i32);

        let mut out = WriteBuffer::new();
        save_json(&mut out, &mut inst, None, 0);
        let text = String::from_utf8(out.into_bytes()).expect("utf8");
        assert!(text.contains(&format!(r#""mode":"{}""#, ENUM_SENTINEL)));
    }

    #[test]
    fn test_format_output_indents() {
        let ty = ClassBuilder::new("One")
            .field("v", &TypeDescriptor::basic(BasicKind::U32))
            .build();
        let mut inst = Instance::new(&ty);
        inst.set_field("v", 3u32).expect("set v");

        let mut out = WriteBuffer::new();
        save_json(&mut out, &mut inst, None, FORMAT_OUTPUT);
        let text = String::from_utf8(out.into_bytes()).expect("utf8");
        assert!(text.contains('\n'));
        assert!(text.contains('\t'));
    }

    #[test]
    fn test_transient_field_omitted() {
        let ty = ClassBuilder::new("Partial")
            .field("keep", &TypeDescriptor::basic(BasicKind::U32))
            .transient_field("drop", &TypeDescriptor::basic(BasicKind::U32))
            .build();
        let mut inst = Instance::new(&ty);
        inst.set_field("keep", 1u32).expect("set keep");
        inst.set_field("drop", 2u32).expect("set drop");

        let mut out = WriteBuffer::new();
        save_json(&mut out, &mut inst, None, 0);
        let text = String::from_utf8(out.into_bytes()).expect("utf8");
        assert!(text.contains("keep"));
        assert!(!text.contains("drop"));
    }
}
