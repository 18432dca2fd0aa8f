// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 dynser contributors

//! Recursive-descent JSON loader.
//!
//! Token-driven, guided entirely by the destination type's descriptors.
//! Decoded values land directly at field offsets in the instance image.
//! Unknown field names and unknown enum constants are parsed and discarded
//! so old text keeps loading into new layouts; only lexical/structural
//! malformation aborts a load, and then with a single terminal error.

use crate::descriptor::{
    FieldDescriptor, HookFn, Qualifier, TypeDescriptor, ATTR_CUSTOM_LOAD, ATTR_POST_LOAD,
    FLAG_CUSTOM_LOAD, FLAG_POST_LOAD,
};
use crate::dispatch;
use crate::hash::{name_hash, name_hash_bytes};
use crate::instance::{Addr, Instance};
use crate::iter::WriteIter;
use crate::json::lexer::{JsonToken, Lexer};
use crate::json::JsonError;
use std::sync::Arc;

/// Load one JSON-encoded object into an instance of its static type.
///
/// On error the instance may be partially populated.
pub fn load_json(input: &[u8], inst: &mut Instance) -> Result<(), JsonError> {
    dispatch::initialize();
    let ty = inst.ty().clone();
    let mut parser = Parser::new(input, inst)?;
    parser.parse_object(Some((Addr::root(), ty)))
}

/// Load one JSON value into a single field's storage at `at`.
pub fn load_json_field(
    input: &[u8],
    inst: &mut Instance,
    field: &FieldDescriptor,
    at: Addr,
) -> Result<(), JsonError> {
    dispatch::initialize();
    let mut parser = Parser::new(input, inst)?;
    parser.parse_value(Some(ValueDest {
        at,
        ty: field.ty.clone(),
        qualifier: field.qualifier,
        field: Some(field),
    }))
}

/// Destination of the value currently being parsed.
struct ValueDest<'f> {
    at: Addr,
    ty: Arc<TypeDescriptor>,
    qualifier: Qualifier,
    field: Option<&'f FieldDescriptor>,
}

struct Parser<'a, 'i> {
    lexer: Lexer<'a>,
    token: JsonToken<'a>,
    inst: &'i mut Instance,
}

impl<'a, 'i> Parser<'a, 'i> {
    fn new(input: &'a [u8], inst: &'i mut Instance) -> Result<Self, JsonError> {
        let mut lexer = Lexer::new(input);
        let token = lexer.next_token()?;
        Ok(Self { lexer, token, inst })
    }

    fn fail(&self) -> JsonError {
        JsonError::UnexpectedToken {
            offset: self.lexer.pos(),
        }
    }

    /// One token of look-ahead: return the current token, pull the next.
    fn advance(&mut self) -> Result<JsonToken<'a>, JsonError> {
        let current = self.token;
        self.token = self.lexer.next_token()?;
        Ok(current)
    }

    fn expect(&mut self, token: JsonToken<'static>) -> Result<(), JsonError> {
        if self.token == token {
            self.advance()?;
            Ok(())
        } else {
            Err(self.fail())
        }
    }

    fn expect_string(&mut self) -> Result<&'a [u8], JsonError> {
        match self.token {
            JsonToken::String(span) => {
                self.advance()?;
                Ok(span)
            }
            _ => Err(self.fail()),
        }
    }

    fn parse_value(&mut self, dest: Option<ValueDest<'_>>) -> Result<(), JsonError> {
        // A class with a custom load hook consumes one value-shaped token
        // region itself, bypassing the generic handlers
        if let Some(d) = &dest {
            if let Some(class) = d.ty.as_class() {
                if class.flag_attributes & FLAG_CUSTOM_LOAD != 0 {
                    if let Some(attr) = class.attribute(name_hash(ATTR_CUSTOM_LOAD)) {
                        if let HookFn::CustomLoad(hook) = attr.hook {
                            hook(&self.token, self.inst, d.at);
                            self.advance()?;
                            return Ok(());
                        }
                    }
                }
            }
        }

        match self.token {
            JsonToken::String(span) => {
                self.advance()?;
                self.load_string(span, dest.as_ref());
                Ok(())
            }
            JsonToken::Integer(value) => {
                self.advance()?;
                self.load_integer(value, dest.as_ref());
                Ok(())
            }
            JsonToken::Decimal(value) => {
                self.advance()?;
                self.load_decimal(value, dest.as_ref());
                Ok(())
            }
            JsonToken::LBrace => self.parse_object(dest.map(|d| (d.at, d.ty))),
            JsonToken::LBracket => self.parse_array(dest),
            JsonToken::True => {
                self.advance()?;
                self.load_integer(1, dest.as_ref());
                Ok(())
            }
            JsonToken::False | JsonToken::Null => {
                self.advance()?;
                self.load_integer(0, dest.as_ref());
                Ok(())
            }
            _ => Err(self.fail()),
        }
    }

    /// A string value either names an enum constant or is discarded.
    fn load_string(&mut self, span: &[u8], dest: Option<&ValueDest<'_>>) {
        let Some(d) = dest else { return };
        let Some(enum_desc) = d.ty.as_enum() else { return };
        match enum_desc.constant_by_hash(name_hash_bytes(span)) {
            Some(constant) => self.inst.set_at::<i32>(d.at, constant.value),
            None => {
                // Value keeps its prior state; accepted data-loss path
                log::debug!(
                    "[json] no constant named {} in enum {}",
                    String::from_utf8_lossy(span),
                    d.ty.name
                );
            }
        }
    }

    fn load_integer(&mut self, value: i64, dest: Option<&ValueDest<'_>>) {
        let Some(d) = dest else { return };
        if d.qualifier == Qualifier::Pointer {
            // An opaque identity; reconciliation happens outside the parser
            self.inst.set_at::<u32>(d.at, value as u32);
            return;
        }
        if !d.ty.is_basic() {
            return;
        }
        if let Some(entry) = dispatch::dispatch(d.ty.hash) {
            (entry.load_integer)(self.inst.read_mut(d.at, d.ty.size()), value);
        }
    }

    fn load_decimal(&mut self, value: f64, dest: Option<&ValueDest<'_>>) {
        let Some(d) = dest else { return };
        if d.qualifier == Qualifier::Pointer || !d.ty.is_basic() {
            return;
        }
        if let Some(entry) = dispatch::dispatch(d.ty.hash) {
            (entry.load_decimal)(self.inst.read_mut(d.at, d.ty.size()), value);
        }
    }

    fn parse_object(&mut self, dest: Option<(Addr, Arc<TypeDescriptor>)>) -> Result<(), JsonError> {
        self.expect(JsonToken::LBrace)?;

        if self.token != JsonToken::RBrace {
            loop {
                self.parse_pair(dest.as_ref())?;
                if self.token == JsonToken::Comma {
                    self.advance()?;
                } else {
                    break;
                }
            }
        }
        self.expect(JsonToken::RBrace)?;

        if let Some((at, ty)) = &dest {
            if let Some(class) = ty.as_class() {
                if class.flag_attributes & FLAG_POST_LOAD != 0 {
                    if let Some(attr) = class.attribute(name_hash(ATTR_POST_LOAD)) {
                        if let HookFn::Object(hook) = attr.hook {
                            hook(self.inst, *at);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn parse_pair(&mut self, dest: Option<&(Addr, Arc<TypeDescriptor>)>) -> Result<(), JsonError> {
        let name = self.expect_string()?;

        // Resolve the field in the destination class, recursing into bases.
        // An unmatched name still gets its value parsed so the token stream
        // stays synchronized; transient fields are treated as unmatched.
        let mut target: Option<(Addr, &FieldDescriptor)> = None;
        if let Some((at, ty)) = dest {
            if ty.as_class().is_some() {
                match ty.find_field(name_hash_bytes(name)) {
                    Some(field) if !field.transient => target = Some((*at, field)),
                    Some(_) => {}
                    None => log::debug!(
                        "[json] skipping unknown field {} on {}",
                        String::from_utf8_lossy(name),
                        ty.name
                    ),
                }
            }
        }

        self.expect(JsonToken::Colon)?;

        match target {
            Some((base, field)) => self.parse_value(Some(ValueDest {
                at: base.at(field.offset),
                ty: field.ty.clone(),
                qualifier: field.qualifier,
                field: Some(field),
            })),
            None => self.parse_value(None),
        }
    }

    fn parse_array(&mut self, dest: Option<ValueDest<'_>>) -> Result<(), JsonError> {
        self.expect(JsonToken::LBracket)?;

        // Empty array leaves the destination container empty
        if self.token == JsonToken::RBracket {
            self.advance()?;
            return Ok(());
        }

        let mut writer: Option<WriteIter> = None;
        if let Some(d) = &dest {
            if let Some(field) = d.field.filter(|f| f.array_count.is_some()) {
                writer = Some(WriteIter::for_field(d.at, field));
            } else if let Some(template) = d.ty.as_template() {
                // Counting pre-pass so the container is sized once; costs a
                // second parse of the element tokens
                let saved_pos = self.lexer.pos();
                let saved_token = self.token;
                let count = self.parse_elements(None)?;
                self.lexer.set_pos(saved_pos);
                self.token = saved_token;

                writer = Some(WriteIter::for_template(self.inst, d.at, template, count));
            }
        }

        self.parse_elements(writer.as_mut())?;
        self.expect(JsonToken::RBracket)
    }

    fn parse_elements(&mut self, mut writer: Option<&mut WriteIter>) -> Result<usize, JsonError> {
        let mut count = 0;
        loop {
            let dest = writer.as_deref_mut().and_then(|w| {
                let ty = w.value_type().clone();
                let qualifier = if w.value_is_ptr() {
                    Qualifier::Pointer
                } else {
                    Qualifier::Value
                };
                // A full fixed array discards the overflow elements
                w.add_empty().map(|at| ValueDest {
                    at,
                    ty,
                    qualifier,
                    field: None,
                })
            });
            self.parse_value(dest)?;
            count += 1;

            if self.token == JsonToken::Comma {
                self.advance()?;
            } else {
                break;
            }
        }
        Ok(count)
    }
}
