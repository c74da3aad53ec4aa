//! # Numeric Type Conversion
//!
//! One generic promote-then-convert algorithm over the closed set of
//! numeric kinds, used when a caller requests a stored value as a different
//! type (e.g. promoting integers to floating point on read).
//!
//! ## Promotion Ladder
//!
//! Numeric kinds are totally ordered by rank:
//!
//! ```text
//! UInt8 < Int16 < Int32 < Int64 < Float32 < Float64 < Complex32 < Complex64
//! ```
//!
//! A source value is first widened to one of three carriers (i64 for
//! integer kinds, f64 for floats, Complex64 for complex) and then narrowed
//! to the target kind. Widening through the matching carrier keeps
//! integer-to-integer conversions exact for the full i64 range.
//!
//! ## Lossy Narrowing Policy
//!
//! Narrowing to a lower-ranked kind is **defined but lossy**, with Rust
//! `as`-cast semantics:
//!
//! - integer -> narrower integer wraps (two's complement truncation)
//! - float -> integer saturates at the target range, NaN becomes 0
//! - float64 -> float32 rounds to nearest
//! - complex -> real drops the imaginary part
//!
//! Callers that need range checking must compare before converting.
//! Conversions involving non-numeric kinds (Bool, String, Record, ...) are
//! rejected with an error.

use crate::types::value::{ArrayData, ArrayValue, Complex32, Complex64, Value};
use crate::types::DataType;
use eyre::{bail, Result};

/// Numeric kinds in promotion order, lowest rank first.
pub const PROMOTION_ORDER: [DataType; 8] = [
    DataType::UInt8,
    DataType::Int16,
    DataType::Int32,
    DataType::Int64,
    DataType::Float32,
    DataType::Float64,
    DataType::Complex32,
    DataType::Complex64,
];

/// Rank of a numeric kind in the promotion ladder, or None for
/// non-numeric kinds.
pub fn promotion_rank(dt: DataType) -> Option<usize> {
    PROMOTION_ORDER.iter().position(|&d| d == dt)
}

/// Widest intermediate a numeric value is promoted through.
#[derive(Debug, Clone, Copy)]
enum Carrier {
    Int(i64),
    Real(f64),
    Complex(Complex64),
}

fn widen(value: &Value) -> Result<Carrier> {
    Ok(match value {
        Value::UInt8(v) => Carrier::Int(*v as i64),
        Value::Int16(v) => Carrier::Int(*v as i64),
        Value::Int32(v) => Carrier::Int(*v as i64),
        Value::Int64(v) => Carrier::Int(*v),
        Value::Float32(v) => Carrier::Real(*v as f64),
        Value::Float64(v) => Carrier::Real(*v),
        Value::Complex32(z) => Carrier::Complex(Complex64::new(z.re as f64, z.im as f64)),
        Value::Complex64(z) => Carrier::Complex(*z),
        other => bail!(
            "cannot convert non-numeric value of type {:?}",
            other.data_type()
        ),
    })
}

impl Carrier {
    fn as_i64(self) -> i64 {
        match self {
            Carrier::Int(i) => i,
            Carrier::Real(f) => f as i64,
            Carrier::Complex(z) => z.re as i64,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Carrier::Int(i) => i as f64,
            Carrier::Real(f) => f,
            Carrier::Complex(z) => z.re,
        }
    }

    fn as_complex64(self) -> Complex64 {
        match self {
            Carrier::Int(i) => Complex64::new(i as f64, 0.0),
            Carrier::Real(f) => Complex64::new(f, 0.0),
            Carrier::Complex(z) => z,
        }
    }
}

fn narrow(c: Carrier, target: DataType) -> Result<Value> {
    Ok(match target {
        DataType::UInt8 => Value::UInt8(match c {
            Carrier::Int(i) => i as u8,
            other => other.as_f64() as u8,
        }),
        DataType::Int16 => Value::Int16(match c {
            Carrier::Int(i) => i as i16,
            other => other.as_f64() as i16,
        }),
        DataType::Int32 => Value::Int32(match c {
            Carrier::Int(i) => i as i32,
            other => other.as_f64() as i32,
        }),
        DataType::Int64 => Value::Int64(c.as_i64()),
        DataType::Float32 => Value::Float32(c.as_f64() as f32),
        DataType::Float64 => Value::Float64(c.as_f64()),
        DataType::Complex32 => {
            let z = c.as_complex64();
            Value::Complex32(Complex32::new(z.re as f32, z.im as f32))
        }
        DataType::Complex64 => Value::Complex64(c.as_complex64()),
        other => bail!("cannot convert to non-numeric type {:?}", other),
    })
}

/// Converts a numeric scalar to the requested numeric kind.
///
/// Identity conversions return a clone; everything else goes through the
/// promote-then-narrow ladder (see module doc for the lossiness policy).
pub fn convert_scalar(value: &Value, target: DataType) -> Result<Value> {
    if value.data_type() == target {
        return Ok(value.clone());
    }
    narrow(widen(value)?, target)
}

/// Converts every element of a numeric array to the requested scalar kind.
///
/// The shape is preserved; only the element storage changes.
pub fn convert_array(array: &ArrayValue, target_elem: DataType) -> Result<ArrayValue> {
    if array.element_type() == target_elem {
        return Ok(array.clone());
    }
    let carriers: Vec<Carrier> = match array.data() {
        ArrayData::UInt8(v) => v.iter().map(|&x| Carrier::Int(x as i64)).collect(),
        ArrayData::Int16(v) => v.iter().map(|&x| Carrier::Int(x as i64)).collect(),
        ArrayData::Int32(v) => v.iter().map(|&x| Carrier::Int(x as i64)).collect(),
        ArrayData::Int64(v) => v.iter().map(|&x| Carrier::Int(x)).collect(),
        ArrayData::Float32(v) => v.iter().map(|&x| Carrier::Real(x as f64)).collect(),
        ArrayData::Float64(v) => v.iter().map(|&x| Carrier::Real(x)).collect(),
        ArrayData::Complex32(v) => v
            .iter()
            .map(|z| Carrier::Complex(Complex64::new(z.re as f64, z.im as f64)))
            .collect(),
        ArrayData::Complex64(v) => v.iter().map(|&z| Carrier::Complex(z)).collect(),
        other => bail!(
            "cannot convert non-numeric array of type {:?}",
            other.element_type()
        ),
    };
    let data = match target_elem {
        DataType::UInt8 => ArrayData::UInt8(
            carriers
                .iter()
                .map(|&c| match c {
                    Carrier::Int(i) => i as u8,
                    other => other.as_f64() as u8,
                })
                .collect(),
        ),
        DataType::Int16 => ArrayData::Int16(
            carriers
                .iter()
                .map(|&c| match c {
                    Carrier::Int(i) => i as i16,
                    other => other.as_f64() as i16,
                })
                .collect(),
        ),
        DataType::Int32 => ArrayData::Int32(
            carriers
                .iter()
                .map(|&c| match c {
                    Carrier::Int(i) => i as i32,
                    other => other.as_f64() as i32,
                })
                .collect(),
        ),
        DataType::Int64 => ArrayData::Int64(carriers.iter().map(|&c| c.as_i64()).collect()),
        DataType::Float32 => {
            ArrayData::Float32(carriers.iter().map(|&c| c.as_f64() as f32).collect())
        }
        DataType::Float64 => ArrayData::Float64(carriers.iter().map(|&c| c.as_f64()).collect()),
        DataType::Complex32 => ArrayData::Complex32(
            carriers
                .iter()
                .map(|&c| {
                    let z = c.as_complex64();
                    Complex32::new(z.re as f32, z.im as f32)
                })
                .collect(),
        ),
        DataType::Complex64 => {
            ArrayData::Complex64(carriers.iter().map(|&c| c.as_complex64()).collect())
        }
        other => bail!("cannot convert array to non-numeric element type {:?}", other),
    };
    ArrayValue::new(array.shape().clone(), data)
}
