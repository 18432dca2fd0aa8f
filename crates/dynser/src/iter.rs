// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynser contributors

//! Uniform iteration over fixed field arrays and dynamic containers.
//!
//! Iterators are transient address cursors created fresh per traversal;
//! they never own or borrow the instance, so walkers stay free to read and
//! write through it while iterating. A write iterator over a dynamic
//! container is sized up front: the pool is allocated once at the counted
//! size, trading streaming insert for zero reallocation.

use crate::descriptor::{FieldDescriptor, Qualifier, TemplateDescriptor, TypeDescriptor};
use crate::instance::{Addr, Instance, POINTER_SIZE};
use std::sync::Arc;

fn element_stride(value_type: &TypeDescriptor, value_is_ptr: bool) -> usize {
    if value_is_ptr {
        POINTER_SIZE
    } else {
        value_type.size()
    }
}

/// Read cursor over container elements.
#[derive(Debug)]
pub struct ReadIter {
    pool: u32,
    base: usize,
    stride: usize,
    count: usize,
    index: usize,
    value_type: Arc<TypeDescriptor>,
    value_is_ptr: bool,
    fixed: bool,
}

impl ReadIter {
    /// Iterate a fixed field array stored inline at `at`.
    pub fn for_field(at: Addr, field: &FieldDescriptor) -> Self {
        let value_is_ptr = field.qualifier == Qualifier::Pointer;
        Self {
            pool: at.pool,
            base: at.offset,
            stride: element_stride(&field.ty, value_is_ptr),
            count: field.array_count.unwrap_or(0),
            index: 0,
            value_type: field.ty.clone(),
            value_is_ptr,
            fixed: true,
        }
    }

    /// Iterate a dynamic container whose handle slot is at `at`.
    pub fn for_template(inst: &Instance, at: Addr, template: &TemplateDescriptor) -> Self {
        let handle = inst.get_at::<u32>(at);
        Self {
            pool: handle,
            base: 0,
            stride: template.element_size(),
            count: inst.pool_count(handle),
            index: 0,
            value_type: template.value_type.clone(),
            value_is_ptr: template.value_is_ptr,
            fixed: false,
        }
    }

    /// Total element count.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Remaining elements including the current one.
    pub fn remaining(&self) -> usize {
        self.count - self.index
    }

    /// Address of the current element.
    pub fn value_addr(&self) -> Addr {
        Addr {
            pool: self.pool,
            offset: self.base + self.stride * self.index,
        }
    }

    /// Element type.
    pub fn value_type(&self) -> &Arc<TypeDescriptor> {
        &self.value_type
    }

    /// Whether elements are pointer identities.
    pub fn value_is_ptr(&self) -> bool {
        self.value_is_ptr
    }

    /// Whether this iterates a fixed field array.
    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Move to the next element.
    pub fn advance(&mut self) {
        self.index += 1;
    }
}

/// Write cursor over container elements.
#[derive(Debug)]
pub struct WriteIter {
    pool: u32,
    base: usize,
    stride: usize,
    count: usize,
    index: usize,
    value_type: Arc<TypeDescriptor>,
    value_is_ptr: bool,
    fixed: bool,
}

impl WriteIter {
    /// Write into a fixed field array stored inline at `at`. Capacity is the
    /// declared element count; "add empty element" past it is refused.
    pub fn for_field(at: Addr, field: &FieldDescriptor) -> Self {
        let value_is_ptr = field.qualifier == Qualifier::Pointer;
        Self {
            pool: at.pool,
            base: at.offset,
            stride: element_stride(&field.ty, value_is_ptr),
            count: field.array_count.unwrap_or(0),
            index: 0,
            value_type: field.ty.clone(),
            value_is_ptr,
            fixed: true,
        }
    }

    /// Allocate a pool of `count` zeroed elements for the container whose
    /// handle slot is at `at`, and iterate it.
    pub fn for_template(
        inst: &mut Instance,
        at: Addr,
        template: &TemplateDescriptor,
        count: usize,
    ) -> Self {
        let stride = template.element_size();
        let handle = inst.alloc_pool(stride, count);
        inst.set_at::<u32>(at, handle);
        Self {
            pool: handle,
            base: 0,
            stride,
            count,
            index: 0,
            value_type: template.value_type.clone(),
            value_is_ptr: template.value_is_ptr,
            fixed: false,
        }
    }

    /// Claim the next element slot, or None when capacity is exhausted.
    pub fn add_empty(&mut self) -> Option<Addr> {
        if self.index >= self.count {
            return None;
        }
        let at = Addr {
            pool: self.pool,
            offset: self.base + self.stride * self.index,
        };
        self.index += 1;
        Some(at)
    }

    /// Element type.
    pub fn value_type(&self) -> &Arc<TypeDescriptor> {
        &self.value_type
    }

    /// Whether elements are pointer identities.
    pub fn value_is_ptr(&self) -> bool {
        self.value_is_ptr
    }

    /// Whether this writes a fixed field array.
    pub fn is_fixed(&self) -> bool {
        self.fixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{BasicKind, ClassBuilder};

    #[test]
    fn test_read_iter_fixed_array() {
        let ty = ClassBuilder::new("Samples")
            .array_field("xs", &TypeDescriptor::basic(BasicKind::U16), 3)
            .build();
        let mut inst = Instance::new(&ty);
        let at = inst.addr_of("xs").expect("xs addr");
        for (i, v) in [5u16, 6, 7].into_iter().enumerate() {
            inst.set_at(at.at(2 * i), v);
        }

        let field = ty.find_field(crate::hash::name_hash("xs")).expect("field");
        let mut reader = ReadIter::for_field(at, field);
        assert!(reader.is_fixed());
        assert_eq!(reader.count(), 3);
        let mut seen = Vec::new();
        while reader.remaining() > 0 {
            seen.push(inst.get_at::<u16>(reader.value_addr()));
            reader.advance();
        }
        assert_eq!(seen, vec![5, 6, 7]);
    }

    #[test]
    fn test_write_iter_sizes_pool_up_front() {
        let elem = TypeDescriptor::basic(BasicKind::I32);
        let tmpl_ty = TypeDescriptor::template("list<i32>", elem, false);
        let ty = ClassBuilder::new("Holder").field("items", &tmpl_ty).build();
        let mut inst = Instance::new(&ty);
        let at = inst.addr_of("items").expect("items addr");

        let template = tmpl_ty.as_template().expect("template");
        let mut writer = WriteIter::for_template(&mut inst, at, template, 4);
        assert!(!writer.is_fixed());
        let mut slots = 0;
        while let Some(slot) = writer.add_empty() {
            inst.set_at(slot, slots as i32);
            slots += 1;
        }
        assert_eq!(slots, 4);
        assert!(writer.add_empty().is_none());

        let mut reader = ReadIter::for_template(&inst, at, template);
        assert_eq!(reader.count(), 4);
        reader.advance();
        assert_eq!(inst.get_at::<i32>(reader.value_addr()), 1);
    }

    #[test]
    fn test_empty_container_reads_empty() {
        let elem = TypeDescriptor::basic(BasicKind::I32);
        let tmpl_ty = TypeDescriptor::template("list<i32>", elem, false);
        let ty = ClassBuilder::new("Holder").field("items", &tmpl_ty).build();
        let inst = Instance::new(&ty);
        let at = inst.addr_of("items").expect("items addr");

        let reader = ReadIter::for_template(&inst, at, tmpl_ty.as_template().expect("template"));
        assert_eq!(reader.count(), 0);
    }
}
