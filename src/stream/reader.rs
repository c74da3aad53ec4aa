//! # Typed Stream Reader
//!
//! The read half of the typed binary stream. A `TypedReader` borrows an
//! encoded byte slice, tracks a cursor position, and decodes values with
//! the [`Encoding`] the containing file declared.
//!
//! Every read bounds-checks before touching bytes; a short read fails with
//! an "unexpected end of stream" error. After any failure the cursor
//! position is unspecified and the reader must be abandoned; there is no
//! re-synchronization.
//!
//! Array containers are read defensively: the version tag is checked first
//! (unknown versions are rejected rather than misinterpreted), and for
//! fixed-size element types the declared element count is validated against
//! the remaining bytes before any allocation, so a corrupt shape cannot
//! drive an enormous reservation.

use crate::keywords::KeywordSet;
use crate::shape::Shape;
use crate::stream::varint::decode_varint;
use crate::stream::{Encoding, ARRAY_VERSION};
use crate::types::{ArrayData, ArrayValue, Complex32, Complex64, DataType, Value};
use eyre::{bail, ensure, Result};

/// Decodes typed values from an encoded byte slice.
pub struct TypedReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    encoding: Encoding,
}

impl<'a> TypedReader<'a> {
    pub fn new(bytes: &'a [u8], encoding: Encoding) -> Self {
        TypedReader {
            bytes,
            pos: 0,
            encoding,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        // n may come from an untrusted length field; compare against the
        // remainder so a huge value cannot overflow the bound check
        ensure!(
            n <= self.remaining(),
            "unexpected end of stream reading {}",
            what
        );
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.take(1, "bool")?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => bail!("invalid bool byte: {}", other),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1, "u8")?[0])
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let b = self.take(2, "i16")?;
        // INVARIANT: take returned exactly 2 bytes
        Ok(self.encoding.get_i16(b.try_into().unwrap()))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let b = self.take(4, "i32")?;
        Ok(self.encoding.get_i32(b.try_into().unwrap()))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let b = self.take(8, "i64")?;
        Ok(self.encoding.get_i64(b.try_into().unwrap()))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4, "u32")?;
        Ok(self.encoding.get_u32(b.try_into().unwrap()))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let b = self.take(8, "u64")?;
        Ok(self.encoding.get_u64(b.try_into().unwrap()))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let b = self.take(4, "f32")?;
        Ok(self.encoding.get_f32(b.try_into().unwrap()))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let b = self.take(8, "f64")?;
        Ok(self.encoding.get_f64(b.try_into().unwrap()))
    }

    pub fn read_complex32(&mut self) -> Result<Complex32> {
        Ok(Complex32::new(self.read_f32()?, self.read_f32()?))
    }

    pub fn read_complex64(&mut self) -> Result<Complex64> {
        Ok(Complex64::new(self.read_f64()?, self.read_f64()?))
    }

    pub fn read_varint(&mut self) -> Result<u64> {
        let (value, read) = decode_varint(&self.bytes[self.pos..])?;
        self.pos += read;
        Ok(value)
    }

    pub fn read_str(&mut self) -> Result<String> {
        let len = self.read_varint()? as usize;
        let bytes = self.take(len, "string bytes")?;
        Ok(std::str::from_utf8(bytes)
            .map_err(|e| eyre::eyre!("invalid UTF-8 in string: {}", e))?
            .to_string())
    }

    pub fn read_shape(&mut self) -> Result<Shape> {
        let ndim = self.read_u8()? as usize;
        let mut dims = Vec::with_capacity(ndim);
        for _ in 0..ndim {
            dims.push(self.read_varint()?);
        }
        Ok(Shape::new(&dims))
    }

    /// Reads an array container written by
    /// [`TypedWriter::write_array`](super::TypedWriter::write_array).
    pub fn read_array(&mut self) -> Result<ArrayValue> {
        let version = self.read_u8()?;
        ensure!(
            version == ARRAY_VERSION,
            "unsupported array container version: {}",
            version
        );
        let elem = DataType::try_from(self.read_u8()?)?;
        ensure!(
            elem.is_scalar(),
            "array container element tag {:?} is not a scalar type",
            elem
        );
        let shape = self.read_shape()?;
        let count = shape.cell_count();
        ensure!(
            count <= usize::MAX as u64,
            "array shape {} is too large for this platform",
            shape
        );
        let count = count as usize;
        if let Some(size) = elem.fixed_size() {
            ensure!(
                count.saturating_mul(size) <= self.remaining(),
                "unexpected end of stream reading array of {} elements",
                count
            );
        }
        let data = match elem {
            DataType::Bool => {
                let mut v = Vec::with_capacity(count);
                for _ in 0..count {
                    v.push(self.read_bool()?);
                }
                ArrayData::Bool(v)
            }
            DataType::UInt8 => ArrayData::UInt8(self.take(count, "u8 array")?.to_vec()),
            DataType::Int16 => {
                let mut v = Vec::with_capacity(count);
                for _ in 0..count {
                    v.push(self.read_i16()?);
                }
                ArrayData::Int16(v)
            }
            DataType::Int32 => {
                let mut v = Vec::with_capacity(count);
                for _ in 0..count {
                    v.push(self.read_i32()?);
                }
                ArrayData::Int32(v)
            }
            DataType::Int64 => {
                let mut v = Vec::with_capacity(count);
                for _ in 0..count {
                    v.push(self.read_i64()?);
                }
                ArrayData::Int64(v)
            }
            DataType::Float32 => {
                let mut v = Vec::with_capacity(count);
                for _ in 0..count {
                    v.push(self.read_f32()?);
                }
                ArrayData::Float32(v)
            }
            DataType::Float64 => {
                let mut v = Vec::with_capacity(count);
                for _ in 0..count {
                    v.push(self.read_f64()?);
                }
                ArrayData::Float64(v)
            }
            DataType::Complex32 => {
                let mut v = Vec::with_capacity(count);
                for _ in 0..count {
                    v.push(self.read_complex32()?);
                }
                ArrayData::Complex32(v)
            }
            DataType::Complex64 => {
                let mut v = Vec::with_capacity(count);
                for _ in 0..count {
                    v.push(self.read_complex64()?);
                }
                ArrayData::Complex64(v)
            }
            DataType::String => {
                let mut v = Vec::with_capacity(count.min(4096));
                for _ in 0..count {
                    v.push(self.read_str()?);
                }
                ArrayData::Str(v)
            }
            // INVARIANT: is_scalar was checked above
            _ => unreachable!(),
        };
        ArrayValue::new(shape, data)
    }

    /// Reads a keyword set written by
    /// [`TypedWriter::write_record`](super::TypedWriter::write_record).
    pub fn read_record(&mut self) -> Result<KeywordSet> {
        let count = self.read_varint()?;
        let mut keywords = KeywordSet::new();
        for _ in 0..count {
            let name = self.read_str()?;
            let value = self.read_value()?;
            keywords.define(&name, value);
        }
        Ok(keywords)
    }

    /// Reads a type-tagged value written by
    /// [`TypedWriter::write_value`](super::TypedWriter::write_value).
    pub fn read_value(&mut self) -> Result<Value> {
        let tag = DataType::try_from(self.read_u8()?)?;
        Ok(match tag {
            DataType::Bool => Value::Bool(self.read_bool()?),
            DataType::UInt8 => Value::UInt8(self.read_u8()?),
            DataType::Int16 => Value::Int16(self.read_i16()?),
            DataType::Int32 => Value::Int32(self.read_i32()?),
            DataType::Int64 => Value::Int64(self.read_i64()?),
            DataType::Float32 => Value::Float32(self.read_f32()?),
            DataType::Float64 => Value::Float64(self.read_f64()?),
            DataType::Complex32 => Value::Complex32(self.read_complex32()?),
            DataType::Complex64 => Value::Complex64(self.read_complex64()?),
            DataType::String => Value::Str(self.read_str()?),
            DataType::Record => Value::Record(Box::new(self.read_record()?)),
            tag if tag.is_array() => {
                let array = self.read_array()?;
                ensure!(
                    array.data_type() == tag,
                    "array container type {:?} does not match value tag {:?}",
                    array.data_type(),
                    tag
                );
                Value::Array(array)
            }
            other => bail!("value tag {:?} cannot be decoded as a value", other),
        })
    }
}
