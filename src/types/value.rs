//! # Runtime Value Representation
//!
//! `Value` is the owned runtime representation for everything a table cell
//! or a keyword can hold: one variant per scalar type, a typed n-d array,
//! and a nested record (keyword set). Cells live in long-lived stores, not
//! borrowed pages, so values are owned rather than `Cow`-borrowed.
//!
//! ## Value Variants
//!
//! | Variant    | Rust Type       | Description                    |
//! |------------|-----------------|--------------------------------|
//! | Bool       | bool            | boolean flag                   |
//! | UInt8      | u8              | unsigned byte                  |
//! | Int16/32/64| i16/i32/i64     | signed integer widths          |
//! | Float32/64 | f32/f64         | floating point widths          |
//! | Complex32  | Complex32       | single-precision complex       |
//! | Complex64  | Complex64       | double-precision complex       |
//! | Str        | String          | UTF-8 text                     |
//! | Array      | ArrayValue      | shaped, homogeneous array      |
//! | Record     | Box<KeywordSet> | nested name -> value mapping   |
//!
//! ## Arrays
//!
//! `ArrayValue` couples a [`Shape`] with element storage typed per scalar
//! kind (`ArrayData`, one `Vec<T>` per type). The element count always
//! equals `shape.cell_count()`; constructors enforce this so downstream
//! code never re-validates. Elements are stored row-major: the last axis
//! varies fastest, so `[row, col]` of shape `[3, 4]` lives at
//! `row * 4 + col`.

use crate::keywords::KeywordSet;
use crate::shape::{Shape, Slicer};
use crate::types::DataType;
use eyre::{bail, ensure, Result};

/// Single-precision complex number, serialized as two consecutive f32.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex32 {
    pub re: f32,
    pub im: f32,
}

/// Double-precision complex number, serialized as two consecutive f64.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex64 {
    pub re: f64,
    pub im: f64,
}

impl Complex32 {
    pub fn new(re: f32, im: f32) -> Self {
        Complex32 { re, im }
    }
}

impl Complex64 {
    pub fn new(re: f64, im: f64) -> Self {
        Complex64 { re, im }
    }
}

/// Typed element storage for an array cell, one variant per scalar kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Bool(Vec<bool>),
    UInt8(Vec<u8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Complex32(Vec<Complex32>),
    Complex64(Vec<Complex64>),
    Str(Vec<String>),
}

impl ArrayData {
    pub fn len(&self) -> usize {
        match self {
            ArrayData::Bool(v) => v.len(),
            ArrayData::UInt8(v) => v.len(),
            ArrayData::Int16(v) => v.len(),
            ArrayData::Int32(v) => v.len(),
            ArrayData::Int64(v) => v.len(),
            ArrayData::Float32(v) => v.len(),
            ArrayData::Float64(v) => v.len(),
            ArrayData::Complex32(v) => v.len(),
            ArrayData::Complex64(v) => v.len(),
            ArrayData::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scalar type of the stored elements.
    pub fn element_type(&self) -> DataType {
        match self {
            ArrayData::Bool(_) => DataType::Bool,
            ArrayData::UInt8(_) => DataType::UInt8,
            ArrayData::Int16(_) => DataType::Int16,
            ArrayData::Int32(_) => DataType::Int32,
            ArrayData::Int64(_) => DataType::Int64,
            ArrayData::Float32(_) => DataType::Float32,
            ArrayData::Float64(_) => DataType::Float64,
            ArrayData::Complex32(_) => DataType::Complex32,
            ArrayData::Complex64(_) => DataType::Complex64,
            ArrayData::Str(_) => DataType::String,
        }
    }

    /// Builds default-valued storage (zeroes, false, empty strings) of the
    /// given element type and length.
    pub fn default_filled(elem: DataType, n: usize) -> Result<ArrayData> {
        Ok(match elem {
            DataType::Bool => ArrayData::Bool(vec![false; n]),
            DataType::UInt8 => ArrayData::UInt8(vec![0; n]),
            DataType::Int16 => ArrayData::Int16(vec![0; n]),
            DataType::Int32 => ArrayData::Int32(vec![0; n]),
            DataType::Int64 => ArrayData::Int64(vec![0; n]),
            DataType::Float32 => ArrayData::Float32(vec![0.0; n]),
            DataType::Float64 => ArrayData::Float64(vec![0.0; n]),
            DataType::Complex32 => ArrayData::Complex32(vec![Complex32::default(); n]),
            DataType::Complex64 => ArrayData::Complex64(vec![Complex64::default(); n]),
            DataType::String => ArrayData::Str(vec![String::new(); n]),
            other => bail!("{:?} is not a valid array element type", other),
        })
    }

    /// Copies the elements at the given flat indices, in order, into new
    /// storage of the same kind. Indices must be in bounds.
    fn gather(&self, indices: &[usize]) -> ArrayData {
        match self {
            ArrayData::Bool(v) => ArrayData::Bool(indices.iter().map(|&i| v[i]).collect()),
            ArrayData::UInt8(v) => ArrayData::UInt8(indices.iter().map(|&i| v[i]).collect()),
            ArrayData::Int16(v) => ArrayData::Int16(indices.iter().map(|&i| v[i]).collect()),
            ArrayData::Int32(v) => ArrayData::Int32(indices.iter().map(|&i| v[i]).collect()),
            ArrayData::Int64(v) => ArrayData::Int64(indices.iter().map(|&i| v[i]).collect()),
            ArrayData::Float32(v) => ArrayData::Float32(indices.iter().map(|&i| v[i]).collect()),
            ArrayData::Float64(v) => ArrayData::Float64(indices.iter().map(|&i| v[i]).collect()),
            ArrayData::Complex32(v) => {
                ArrayData::Complex32(indices.iter().map(|&i| v[i]).collect())
            }
            ArrayData::Complex64(v) => {
                ArrayData::Complex64(indices.iter().map(|&i| v[i]).collect())
            }
            ArrayData::Str(v) => ArrayData::Str(indices.iter().map(|&i| v[i].clone()).collect()),
        }
    }

    /// Writes `src` element-for-element into the given flat indices.
    /// Indices must be in bounds and match `src.len()`.
    fn scatter(&mut self, indices: &[usize], src: &ArrayData) -> Result<()> {
        ensure!(
            self.element_type() == src.element_type(),
            "cannot write {:?} elements into a {:?} array",
            src.element_type(),
            self.element_type()
        );
        macro_rules! scatter_arm {
            ($dst:expr, $src:expr) => {
                for (&i, x) in indices.iter().zip($src) {
                    $dst[i] = x.clone();
                }
            };
        }
        match (self, src) {
            (ArrayData::Bool(d), ArrayData::Bool(s)) => scatter_arm!(d, s),
            (ArrayData::UInt8(d), ArrayData::UInt8(s)) => scatter_arm!(d, s),
            (ArrayData::Int16(d), ArrayData::Int16(s)) => scatter_arm!(d, s),
            (ArrayData::Int32(d), ArrayData::Int32(s)) => scatter_arm!(d, s),
            (ArrayData::Int64(d), ArrayData::Int64(s)) => scatter_arm!(d, s),
            (ArrayData::Float32(d), ArrayData::Float32(s)) => scatter_arm!(d, s),
            (ArrayData::Float64(d), ArrayData::Float64(s)) => scatter_arm!(d, s),
            (ArrayData::Complex32(d), ArrayData::Complex32(s)) => scatter_arm!(d, s),
            (ArrayData::Complex64(d), ArrayData::Complex64(s)) => scatter_arm!(d, s),
            (ArrayData::Str(d), ArrayData::Str(s)) => scatter_arm!(d, s),
            // INVARIANT: the type check above rules out mixed pairs
            _ => unreachable!(),
        }
        Ok(())
    }
}

/// Flat row-major indices of the elements a slicer selects, in the order
/// they appear in the sliced result.
fn slice_indices(shape: &Shape, slicer: &Slicer) -> Result<Vec<usize>> {
    slicer.check(shape)?;
    let dims = shape.dims();
    // row-major axis strides of the source: last axis is 1
    let mut axis_strides = vec![1u64; dims.len()];
    for axis in (0..dims.len().saturating_sub(1)).rev() {
        axis_strides[axis] = axis_strides[axis + 1] * dims[axis + 1];
    }
    let count = slicer.shape().cell_count() as usize;
    let mut indices = Vec::with_capacity(count);
    if count == 0 {
        return Ok(indices);
    }
    // odometer over the slicer's per-axis counters, last axis fastest
    let mut counters = vec![0u64; dims.len()];
    loop {
        let mut flat = 0u64;
        for (axis, &c) in counters.iter().enumerate() {
            let slice = &slicer.axes()[axis];
            flat += (slice.start() + c * slice.stride()) * axis_strides[axis];
        }
        indices.push(flat as usize);
        let mut axis = dims.len();
        loop {
            if axis == 0 {
                return Ok(indices);
            }
            axis -= 1;
            counters[axis] += 1;
            if counters[axis] < slicer.axes()[axis].length() {
                break;
            }
            counters[axis] = 0;
        }
    }
}

/// A shaped, homogeneous array cell.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    shape: Shape,
    data: ArrayData,
}

impl ArrayValue {
    /// Couples element storage with a shape. The element count must equal
    /// the shape's cell count.
    pub fn new(shape: Shape, data: ArrayData) -> Result<Self> {
        ensure!(
            data.len() as u64 == shape.cell_count(),
            "array of {} elements does not conform to shape {} ({} cells)",
            data.len(),
            shape,
            shape.cell_count()
        );
        Ok(ArrayValue { shape, data })
    }

    /// Default-filled array of the given element type and shape.
    pub fn filled_default(elem: DataType, shape: &Shape) -> Result<Self> {
        let data = ArrayData::default_filled(elem, shape.cell_count() as usize)?;
        ArrayValue::new(shape.clone(), data)
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    /// Scalar type of the elements.
    pub fn element_type(&self) -> DataType {
        self.data.element_type()
    }

    /// Array type tag (the scalar element tag's array counterpart).
    pub fn data_type(&self) -> DataType {
        // INVARIANT: element_type is always a scalar tag
        self.data.element_type().array_of().unwrap()
    }

    pub fn into_data(self) -> ArrayData {
        self.data
    }

    /// Extracts the sub-array a slicer selects, as an owned array of the
    /// slicer's shape.
    pub fn slice(&self, slicer: &Slicer) -> Result<ArrayValue> {
        let indices = slice_indices(&self.shape, slicer)?;
        ArrayValue::new(slicer.shape(), self.data.gather(&indices))
    }

    /// Overwrites the elements a slicer selects with `values`, leaving the
    /// rest of the array untouched. `values` must conform to the slicer's
    /// shape.
    pub fn write_slice(&mut self, slicer: &Slicer, values: &ArrayValue) -> Result<()> {
        let indices = slice_indices(&self.shape, slicer)?;
        ensure!(
            values.shape().conforms(&slicer.shape()),
            "slice values of shape {} do not conform to the selection {}",
            values.shape(),
            slicer.shape()
        );
        self.data.scatter(&indices, &values.data)
    }
}

/// Owned runtime value for a table cell or keyword.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    UInt8(u8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Complex32(Complex32),
    Complex64(Complex64),
    Str(String),
    Array(ArrayValue),
    Record(Box<KeywordSet>),
}

impl Value {
    /// The type tag of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Bool(_) => DataType::Bool,
            Value::UInt8(_) => DataType::UInt8,
            Value::Int16(_) => DataType::Int16,
            Value::Int32(_) => DataType::Int32,
            Value::Int64(_) => DataType::Int64,
            Value::Float32(_) => DataType::Float32,
            Value::Float64(_) => DataType::Float64,
            Value::Complex32(_) => DataType::Complex32,
            Value::Complex64(_) => DataType::Complex64,
            Value::Str(_) => DataType::String,
            Value::Array(a) => a.data_type(),
            Value::Record(_) => DataType::Record,
        }
    }

    /// Default scalar value for a scalar type tag.
    pub fn default_for(dt: DataType) -> Result<Value> {
        Ok(match dt {
            DataType::Bool => Value::Bool(false),
            DataType::UInt8 => Value::UInt8(0),
            DataType::Int16 => Value::Int16(0),
            DataType::Int32 => Value::Int32(0),
            DataType::Int64 => Value::Int64(0),
            DataType::Float32 => Value::Float32(0.0),
            DataType::Float64 => Value::Float64(0.0),
            DataType::Complex32 => Value::Complex32(Complex32::default()),
            DataType::Complex64 => Value::Complex64(Complex64::default()),
            DataType::String => Value::Str(String::new()),
            other => bail!("no default value for type {:?}", other),
        })
    }
}

impl From<ArrayValue> for Value {
    fn from(a: ArrayValue) -> Self {
        Value::Array(a)
    }
}
