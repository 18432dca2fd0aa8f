// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynser contributors

//! # dynser — metadata-driven object graph serialization
//!
//! Serializes arbitrary statically-typed object graphs to JSON text and a
//! compact binary form, guided entirely by a type-descriptor graph. Types
//! are described once (classes, fields, enums, containers, qualifiers); the
//! engine walks instances using only that metadata, with no per-type
//! generated code.
//!
//! ## Quick Start
//!
//! ```rust
//! use dynser::{BasicKind, ClassBuilder, Instance, TypeDescriptor, WriteBuffer};
//!
//! // Describe a type once
//! let point = ClassBuilder::new("Point")
//!     .field("x", &TypeDescriptor::basic(BasicKind::I32))
//!     .field("y", &TypeDescriptor::basic(BasicKind::I32))
//!     .build();
//!
//! // Populate an instance and save it
//! let mut inst = Instance::new(&point);
//! inst.set_field("x", 3i32).unwrap();
//! inst.set_field("y", -4i32).unwrap();
//!
//! let mut out = WriteBuffer::new();
//! dynser::save_json(&mut out, &mut inst, None, 0);
//!
//! // Load it back
//! let mut reloaded = Instance::new(&point);
//! dynser::load_json(out.as_bytes(), &mut reloaded).unwrap();
//! assert_eq!(reloaded.get_field::<i32>("x").unwrap(), 3);
//! ```
//!
//! ## Architecture
//!
//! | Component | Responsibility |
//! |-----------|----------------|
//! | [`descriptor`] | Type/field/enum/container metadata, builders, registry |
//! | [`dispatch`] | Perfect-hash lookup from type hash to numeric load/save functions |
//! | [`instance`] | Byte-image instances with bounds-checked typed access |
//! | [`json`] | Lexer, recursive-descent loader, metadata-guided writer |
//! | [`binary`] | Schema-driven compact binary codec |
//! | [`iter`] | Uniform read/write iteration over arrays and containers |
//! | [`ptr`] | Pointer-identity policy consulted per pointer on save |
//!
//! ## Concurrency
//!
//! All load/save calls are single-threaded and synchronous; buffers are
//! caller-owned per call. The dispatch table is process-wide, built once
//! behind an idempotent guard — call [`dispatch::initialize`] at startup to
//! keep the build out of hot paths. Hooks and pointer policies must be
//! reentrant-safe: the walker recurses without bound other than graph depth.

/// Schema-driven compact binary encode/decode.
pub mod binary;
/// Growable output byte buffer owned by the caller per save call.
pub mod buffer;
/// Type descriptors, builders, and the process-wide descriptor registry.
pub mod descriptor;
/// Perfect-hash dispatch from numeric type hashes to load/save functions.
pub mod dispatch;
/// 32-bit FNV-1a name hashing.
pub mod hash;
/// Byte-image object instances with bounds-checked access.
pub mod instance;
/// Read/write iteration over fixed arrays and dynamic containers.
pub mod iter;
/// JSON lexer, loader, and writer.
pub mod json;
/// Binary search over hash-sorted descriptor sets.
pub mod lookup;
/// Pointer-identity policy.
pub mod ptr;

pub use binary::{load_binary, save_binary, BinaryError};
pub use buffer::WriteBuffer;
pub use descriptor::{
    AttributeDescriptor, BasicKind, ClassBuilder, ClassDescriptor, DescriptorRegistry,
    EnumBuilder, EnumConstant, EnumDescriptor, FieldDescriptor, HookFn, HookValue, Qualifier,
    TemplateDescriptor, TypeDescriptor, TypeKind,
};
pub use instance::{Addr, Instance, InstanceError, Scalar};
pub use iter::{ReadIter, WriteIter};
pub use json::{
    load_json, load_json_field, save_json, save_json_field, JsonError, JsonToken,
    EMIT_HEX_FLOATS, EMIT_HEX_POINTERS, FORMAT_OUTPUT, SORT_FIELDS_BY_OFFSET,
};
pub use ptr::{PointerPolicy, SaveAllPointers};
