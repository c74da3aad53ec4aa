//! # Typed Stream Writer
//!
//! The write half of the typed binary stream. A `TypedWriter` owns a byte
//! buffer and a physical [`Encoding`]; every `write_*` appends the encoded
//! form of one value. Callers persist the finished buffer however they like
//! (the table core writes it after a zerocopy file header).
//!
//! ## Guarantees
//!
//! - Writing a slice of `n` elements produces bytes identical to `n`
//!   single-element writes (the round-trip law the readers rely on).
//! - Strings are a varint byte length followed by raw UTF-8, no NUL.
//! - Complex numbers are two consecutive reals.
//! - Array containers carry a version tag so future format revisions are
//!   distinguishable; see [`ARRAY_VERSION`](super::ARRAY_VERSION).

use crate::keywords::KeywordSet;
use crate::shape::Shape;
use crate::stream::varint::encode_varint;
use crate::stream::{Encoding, ARRAY_VERSION};
use crate::types::{ArrayData, ArrayValue, Complex32, Complex64, Value};
use eyre::{ensure, Result};

/// Accumulates typed values into an encoded byte buffer.
pub struct TypedWriter {
    buf: Vec<u8>,
    encoding: Encoding,
}

impl TypedWriter {
    pub fn new(encoding: Encoding) -> Self {
        TypedWriter {
            buf: Vec::new(),
            encoding,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_i16(&mut self, v: i16) {
        self.encoding.put_i16(&mut self.buf, v);
    }

    pub fn write_i32(&mut self, v: i32) {
        self.encoding.put_i32(&mut self.buf, v);
    }

    pub fn write_i64(&mut self, v: i64) {
        self.encoding.put_i64(&mut self.buf, v);
    }

    pub fn write_u32(&mut self, v: u32) {
        self.encoding.put_u32(&mut self.buf, v);
    }

    pub fn write_u64(&mut self, v: u64) {
        self.encoding.put_u64(&mut self.buf, v);
    }

    pub fn write_f32(&mut self, v: f32) {
        self.encoding.put_f32(&mut self.buf, v);
    }

    pub fn write_f64(&mut self, v: f64) {
        self.encoding.put_f64(&mut self.buf, v);
    }

    pub fn write_complex32(&mut self, v: Complex32) {
        self.write_f32(v.re);
        self.write_f32(v.im);
    }

    pub fn write_complex64(&mut self, v: Complex64) {
        self.write_f64(v.re);
        self.write_f64(v.im);
    }

    pub fn write_varint(&mut self, v: u64) {
        encode_varint(v, &mut self.buf);
    }

    /// Varint byte length followed by raw UTF-8 bytes.
    pub fn write_str(&mut self, s: &str) {
        self.write_varint(s.len() as u64);
        self.buf.extend(s.as_bytes());
    }

    /// Rank byte followed by one varint extent per dimension.
    pub fn write_shape(&mut self, shape: &Shape) -> Result<()> {
        ensure!(
            shape.ndim() <= u8::MAX as usize,
            "shape rank {} exceeds the storable maximum",
            shape.ndim()
        );
        self.write_u8(shape.ndim() as u8);
        for &d in shape.dims() {
            self.write_varint(d);
        }
        Ok(())
    }

    /// Array container: version tag, element type tag, shape, then the raw
    /// elements (no per-element tags).
    pub fn write_array(&mut self, array: &ArrayValue) -> Result<()> {
        self.write_u8(ARRAY_VERSION);
        self.write_u8(array.element_type() as u8);
        self.write_shape(array.shape())?;
        match array.data() {
            ArrayData::Bool(v) => {
                for &x in v {
                    self.write_bool(x);
                }
            }
            ArrayData::UInt8(v) => {
                for &x in v {
                    self.write_u8(x);
                }
            }
            ArrayData::Int16(v) => {
                for &x in v {
                    self.write_i16(x);
                }
            }
            ArrayData::Int32(v) => {
                for &x in v {
                    self.write_i32(x);
                }
            }
            ArrayData::Int64(v) => {
                for &x in v {
                    self.write_i64(x);
                }
            }
            ArrayData::Float32(v) => {
                for &x in v {
                    self.write_f32(x);
                }
            }
            ArrayData::Float64(v) => {
                for &x in v {
                    self.write_f64(x);
                }
            }
            ArrayData::Complex32(v) => {
                for &x in v {
                    self.write_complex32(x);
                }
            }
            ArrayData::Complex64(v) => {
                for &x in v {
                    self.write_complex64(x);
                }
            }
            ArrayData::Str(v) => {
                for x in v {
                    self.write_str(x);
                }
            }
        }
        Ok(())
    }

    /// Keyword set: varint entry count, then name / type-tagged value pairs
    /// in insertion order.
    pub fn write_record(&mut self, keywords: &KeywordSet) -> Result<()> {
        self.write_varint(keywords.len() as u64);
        for (name, value) in keywords.iter() {
            self.write_str(name);
            self.write_value(value)?;
        }
        Ok(())
    }

    /// Type tag followed by the value payload. Arrays and records recurse.
    pub fn write_value(&mut self, value: &Value) -> Result<()> {
        self.write_u8(value.data_type() as u8);
        match value {
            Value::Bool(v) => self.write_bool(*v),
            Value::UInt8(v) => self.write_u8(*v),
            Value::Int16(v) => self.write_i16(*v),
            Value::Int32(v) => self.write_i32(*v),
            Value::Int64(v) => self.write_i64(*v),
            Value::Float32(v) => self.write_f32(*v),
            Value::Float64(v) => self.write_f64(*v),
            Value::Complex32(v) => self.write_complex32(*v),
            Value::Complex64(v) => self.write_complex64(*v),
            Value::Str(v) => self.write_str(v),
            Value::Array(a) => self.write_array(a)?,
            Value::Record(k) => self.write_record(k)?,
        }
        Ok(())
    }
}
