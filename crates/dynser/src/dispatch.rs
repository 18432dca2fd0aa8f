// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynser contributors

//! Perfect-hash dispatch from numeric type hashes to load/save functions.
//!
//! The built-in numeric type names form a closed set, so a fixed-size table
//! indexed by `hash % DISPATCH_MOD` resolves a type to its function triple
//! in one probe. `DISPATCH_MOD` is the smallest modulus with zero collisions
//! for that set under the name hash; registering two names into one slot is
//! a construction-time integrity violation.
//!
//! The table is process-wide, built once behind a `OnceLock`. Call
//! [`initialize`] during startup to keep first-use out of hot paths.

use crate::buffer::WriteBuffer;
use crate::hash::name_hash;
use crate::json::EMIT_HEX_FLOATS;
use std::fmt::Write as _;
use std::sync::OnceLock;

/// Render a numeric field's bytes as JSON text.
pub type SaveNumberFn = fn(&mut WriteBuffer, &[u8], u32);
/// Store an integer token into a numeric field's bytes, casting to width.
pub type LoadIntegerFn = fn(&mut [u8], i64);
/// Store a decimal token into a numeric field's bytes, casting to width.
pub type LoadDecimalFn = fn(&mut [u8], f64);

/// One dispatch slot: the function triple for a built-in numeric type.
#[derive(Clone, Copy)]
pub struct DispatchEntry {
    pub save_number: SaveNumberFn,
    pub load_integer: LoadIntegerFn,
    pub load_decimal: LoadDecimalFn,
}

/// Smallest modulus giving zero collisions for the built-in name set.
pub const DISPATCH_MOD: usize = 30;

static TABLE: OnceLock<[Option<DispatchEntry>; DISPATCH_MOD]> = OnceLock::new();

/// Build the dispatch table now instead of on first use.
///
/// Idempotent; building twice is equivalent to building once.
pub fn initialize() {
    let _ = TABLE.get_or_init(build_table);
}

/// Resolve a type-name hash to its function triple.
///
/// Defined only for the built-in numeric type names; any other hash lands
/// in an arbitrary slot and yields `None` or an unrelated entry, so callers
/// must not dispatch non-basic kinds.
pub fn dispatch(hash: u32) -> Option<&'static DispatchEntry> {
    TABLE.get_or_init(build_table)[hash as usize % DISPATCH_MOD].as_ref()
}

// ---------------------------------------------------------------------------
// Text rendering (fixed stack buffers, no allocation)
// ---------------------------------------------------------------------------

/// Render a signed integer, radix 10, into a fixed stack buffer.
pub(crate) fn write_integer(out: &mut WriteBuffer, value: i64) {
    let negative = value < 0;
    let mut magnitude = value.unsigned_abs();

    // Enough for 20 digits of u64
    let mut text = [0u8; 20];
    let mut cursor = text.len();
    loop {
        let next = magnitude / 10;
        cursor -= 1;
        text[cursor] = b'0' + (magnitude - next * 10) as u8;
        magnitude = next;
        if magnitude == 0 {
            break;
        }
    }

    if negative {
        out.write_byte(b'-');
    }
    out.write_bytes(&text[cursor..]);
}

/// Render an unsigned integer, radix 10.
pub(crate) fn write_unsigned(out: &mut WriteBuffer, mut value: u64) {
    let mut text = [0u8; 20];
    let mut cursor = text.len();
    loop {
        let next = value / 10;
        cursor -= 1;
        text[cursor] = b'0' + (value - next * 10) as u8;
        value = next;
        if value == 0 {
            break;
        }
    }
    out.write_bytes(&text[cursor..]);
}

/// Render an unsigned integer, radix 16, uppercase.
pub(crate) fn write_hex(out: &mut WriteBuffer, mut value: u64) {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    let mut text = [0u8; 16];
    let mut cursor = text.len();
    loop {
        let next = value / 16;
        cursor -= 1;
        text[cursor] = DIGITS[(value - next * 16) as usize];
        value = next;
        if value == 0 {
            break;
        }
    }
    out.write_bytes(&text[cursor..]);
}

/// Render an f64: shortest round-trip decimal text, or the `0d` raw-bit
/// form when exact bit preservation is requested.
pub(crate) fn write_decimal(out: &mut WriteBuffer, value: f64, flags: u32) {
    if flags & EMIT_HEX_FLOATS != 0 {
        // The 0d prefix tells the lexer to alias the hex digits as a decimal
        out.write_str("0d");
        write_hex(out, value.to_bits());
        return;
    }
    let _ = write!(out, "{}", value);
}

fn write_decimal_f32(out: &mut WriteBuffer, value: f32, flags: u32) {
    if flags & EMIT_HEX_FLOATS != 0 {
        // Promote to f64 bits; f32 -> f64 is exact
        out.write_str("0d");
        write_hex(out, f64::from(value).to_bits());
        return;
    }
    let _ = write!(out, "{}", value);
}

// ---------------------------------------------------------------------------
// Per-width save/load functions
// ---------------------------------------------------------------------------

/// Generate a save function that renders a signed field as decimal text
macro_rules! impl_save_signed {
    ($name:ident, $ty:ty, $size:expr) => {
        fn $name(out: &mut WriteBuffer, src: &[u8], _flags: u32) {
            let mut bytes = [0u8; $size];
            bytes.copy_from_slice(&src[..$size]);
            write_integer(out, <$ty>::from_le_bytes(bytes) as i64);
        }
    };
}

/// Generate a save function that renders an unsigned field as decimal text
macro_rules! impl_save_unsigned {
    ($name:ident, $ty:ty, $size:expr) => {
        fn $name(out: &mut WriteBuffer, src: &[u8], _flags: u32) {
            let mut bytes = [0u8; $size];
            bytes.copy_from_slice(&src[..$size]);
            write_unsigned(out, <$ty>::from_le_bytes(bytes) as u64);
        }
    };
}

/// Generate a load function that casts an integer token to field width
macro_rules! impl_load_integer {
    ($name:ident, $ty:ty, $size:expr) => {
        fn $name(dst: &mut [u8], value: i64) {
            dst[..$size].copy_from_slice(&(value as $ty).to_le_bytes());
        }
    };
}

/// Generate a load function that casts a decimal token to field width
macro_rules! impl_load_decimal {
    ($name:ident, $ty:ty, $size:expr) => {
        fn $name(dst: &mut [u8], value: f64) {
            dst[..$size].copy_from_slice(&(value as $ty).to_le_bytes());
        }
    };
}

impl_save_signed!(save_i8, i8, 1);
impl_save_signed!(save_i16, i16, 2);
impl_save_signed!(save_i32, i32, 4);
impl_save_signed!(save_i64, i64, 8);
impl_save_unsigned!(save_u8, u8, 1);
impl_save_unsigned!(save_u16, u16, 2);
impl_save_unsigned!(save_u32, u32, 4);
impl_save_unsigned!(save_u64, u64, 8);

impl_load_integer!(load_integer_i8, i8, 1);
impl_load_integer!(load_integer_i16, i16, 2);
impl_load_integer!(load_integer_i32, i32, 4);
impl_load_integer!(load_integer_i64, i64, 8);
impl_load_integer!(load_integer_u8, u8, 1);
impl_load_integer!(load_integer_u16, u16, 2);
impl_load_integer!(load_integer_u32, u32, 4);
impl_load_integer!(load_integer_u64, u64, 8);
impl_load_integer!(load_integer_f32, f32, 4);
impl_load_integer!(load_integer_f64, f64, 8);

impl_load_decimal!(load_decimal_i8, i8, 1);
impl_load_decimal!(load_decimal_i16, i16, 2);
impl_load_decimal!(load_decimal_i32, i32, 4);
impl_load_decimal!(load_decimal_i64, i64, 8);
impl_load_decimal!(load_decimal_u8, u8, 1);
impl_load_decimal!(load_decimal_u16, u16, 2);
impl_load_decimal!(load_decimal_u32, u32, 4);
impl_load_decimal!(load_decimal_u64, u64, 8);
impl_load_decimal!(load_decimal_f32, f32, 4);
impl_load_decimal!(load_decimal_f64, f64, 8);

fn save_bool(out: &mut WriteBuffer, src: &[u8], _flags: u32) {
    write_integer(out, i64::from(src[0] != 0));
}

fn load_integer_bool(dst: &mut [u8], value: i64) {
    dst[0] = u8::from(value != 0);
}

fn load_decimal_bool(dst: &mut [u8], value: f64) {
    dst[0] = u8::from(value != 0.0);
}

fn save_f32(out: &mut WriteBuffer, src: &[u8], flags: u32) {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&src[..4]);
    write_decimal_f32(out, f32::from_le_bytes(bytes), flags);
}

fn save_f64(out: &mut WriteBuffer, src: &[u8], flags: u32) {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&src[..8]);
    write_decimal(out, f64::from_le_bytes(bytes), flags);
}

fn build_table() -> [Option<DispatchEntry>; DISPATCH_MOD] {
    let mut table = [None; DISPATCH_MOD];

    let mut add =
        |name: &str, save_number: SaveNumberFn, load_integer: LoadIntegerFn, load_decimal: LoadDecimalFn| {
            let slot = name_hash(name) as usize % DISPATCH_MOD;
            assert!(
                table[slot].is_none(),
                "dispatch table slot collision for {}",
                name
            );
            table[slot] = Some(DispatchEntry {
                save_number,
                load_integer,
                load_decimal,
            });
        };

    add("bool", save_bool, load_integer_bool, load_decimal_bool);
    // Char is a 4-byte unicode scalar; it travels as its numeric value
    add("char", save_u32, load_integer_u32, load_decimal_u32);
    add("u8", save_u8, load_integer_u8, load_decimal_u8);
    add("u16", save_u16, load_integer_u16, load_decimal_u16);
    add("u32", save_u32, load_integer_u32, load_decimal_u32);
    add("u64", save_u64, load_integer_u64, load_decimal_u64);
    add("i8", save_i8, load_integer_i8, load_decimal_i8);
    add("i16", save_i16, load_integer_i16, load_decimal_i16);
    add("i32", save_i32, load_integer_i32, load_decimal_i32);
    add("i64", save_i64, load_integer_i64, load_decimal_i64);
    add("f32", save_f32, load_integer_f32, load_decimal_f32);
    add("f64", save_f64, load_integer_f64, load_decimal_f64);

    table
}
